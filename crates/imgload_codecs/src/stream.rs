//! Seekable byte sources handed to format detectors and decoders.

use std::io::{self, Read, Seek, SeekFrom};

/// A rewindable byte source.
///
/// Blanket-implemented for every `Read + Seek` type, so files, buffered files
/// and `Cursor`s over in-memory buffers can all be passed as `&mut dyn ImageStream`.
pub trait ImageStream: Read + Seek {}

impl<T: Read + Seek> ImageStream for T {}

/// Read up to `len` bytes from the current position without consuming them.
///
/// The stream position is restored before returning, whatever happened while
/// reading. Any I/O failure yields the bytes read so far (possibly none), which
/// lets detectors stay infallible.
pub fn peek(stream: &mut dyn ImageStream, len: usize) -> Vec<u8> {
    let Ok(start) = stream.stream_position() else {
        return Vec::new();
    };

    let mut buf = Vec::with_capacity(len);
    let read = (&mut *stream).take(len as u64).read_to_end(&mut buf);

    if stream.seek(SeekFrom::Start(start)).is_err() {
        log::warn!("Failed to rewind stream to offset {}", start);
        return Vec::new();
    }

    if let Err(e) = read {
        log::trace!("Short read while peeking {} bytes: {}", len, e);
    }
    buf
}

/// Read everything from the current position to the end of the stream.
pub fn read_remaining(stream: &mut dyn ImageStream) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    stream.read_to_end(&mut data)?;
    Ok(data)
}
