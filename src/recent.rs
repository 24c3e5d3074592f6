//! Bounded most-recently-used list of opened sources.

/// Default number of entries kept.
pub const DEFAULT_RECENT_CAPACITY: usize = 15;

/// Ordered, duplicate-free list of source names; the newest entry is last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentList {
    entries: Vec<String>,
    capacity: usize,
}

impl Default for RecentList {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_CAPACITY)
    }
}

impl RecentList {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Move `name` to the newest position, evicting the oldest beyond capacity.
    pub fn add(&mut self, name: &str) {
        self.entries.retain(|e| e != name);
        self.entries.push(name.to_string());
        self.trim();
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|e| e != name);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the whole list (oldest first), dropping duplicates and overflow.
    pub fn set(&mut self, entries: impl IntoIterator<Item = String>) {
        self.entries.clear();
        for entry in entries {
            self.add(&entry);
        }
    }

    /// Entry by recency: 0 is the newest.
    pub fn newest(&self, index: usize) -> Option<&str> {
        self.entries.iter().rev().nth(index).map(String::as_str)
    }

    /// Entries newest first, long names elided as `head...tail`.
    pub fn shortened(&self, head: usize, tail: usize) -> Vec<String> {
        self.entries
            .iter()
            .rev()
            .map(|name| shorten(name, head, tail))
            .collect()
    }

    fn trim(&mut self) {
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
    }
}

/// Keep the first `head` and last `tail` characters of a long name.
pub fn shorten(name: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() < head + tail + 3 {
        return name.to_string();
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", start, end)
}
