//! One-shot handles to work running on the worker pool.

use std::sync::mpsc::{self, Receiver, TryRecvError};

/// Handle to a single background computation.
///
/// The worker writes its result exactly once into a private channel. The
/// owning thread polls with [`TaskHandle::is_ready`] and collects the result
/// with [`TaskHandle::take`], which consumes the handle.
pub struct TaskHandle<T> {
    rx: Receiver<T>,
    /// Result received by a previous poll.
    slot: Option<T>,
    /// The worker went away without sending (it panicked).
    abandoned: bool,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Run `work` on `pool` and return a handle to its result.
    pub fn spawn(pool: &rayon::ThreadPool, work: impl FnOnce() -> T + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        pool.spawn(move || {
            // The receiver may be gone if the loader was dropped meanwhile.
            let _ = tx.send(work());
        });
        Self::from_receiver(rx)
    }
}

impl<T> TaskHandle<T> {
    pub(crate) fn from_receiver(rx: Receiver<T>) -> Self {
        Self {
            rx,
            slot: None,
            abandoned: false,
        }
    }

    /// Non-blocking completion check.
    pub fn is_ready(&mut self) -> bool {
        if self.slot.is_some() || self.abandoned {
            return true;
        }
        match self.rx.try_recv() {
            Ok(value) => {
                self.slot = Some(value);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.abandoned = true;
                true
            }
        }
    }

    /// Consume the handle and return the result.
    ///
    /// Blocks only if the task is not ready yet. Returns `None` if the worker
    /// died without producing a result.
    pub fn take(mut self) -> Option<T> {
        if let Some(value) = self.slot.take() {
            return Some(value);
        }
        if self.abandoned {
            return None;
        }
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::sync_channel;

    #[test]
    fn test_not_ready_until_sent() {
        let (tx, rx) = mpsc::channel();
        let mut handle = TaskHandle::from_receiver(rx);
        assert!(!handle.is_ready());
        assert!(!handle.is_ready());

        tx.send(7).unwrap();
        assert!(handle.is_ready());
        assert!(handle.is_ready());
        assert_eq!(handle.take(), Some(7));
    }

    #[test]
    fn test_dropped_sender_is_ready_and_empty() {
        let (tx, rx) = mpsc::channel::<u32>();
        let mut handle = TaskHandle::from_receiver(rx);
        drop(tx);
        assert!(handle.is_ready());
        assert_eq!(handle.take(), None);
    }

    #[test]
    fn test_spawn_on_pool() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        // Gate the worker so the handle is observed before completion.
        let (gate_tx, gate_rx) = sync_channel::<()>(0);
        let mut handle = TaskHandle::spawn(&pool, move || {
            gate_rx.recv().unwrap();
            "done"
        });
        assert!(!handle.is_ready());
        gate_tx.send(()).unwrap();
        assert_eq!(handle.take(), Some("done"));
    }

    #[test]
    fn test_panicking_worker_is_abandoned() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .panic_handler(|_| {})
            .build()
            .unwrap();
        let handle = TaskHandle::<u32>::spawn(&pool, || panic!("decoder blew up"));
        assert_eq!(handle.take(), None);
    }
}
