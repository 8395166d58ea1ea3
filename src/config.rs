//! Options controlling how a file is opened and mapped.

use serde::{Deserialize, Serialize};

/// How [`PeContext::open`](crate::context::PeContext::open) acquires a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Open read-write and map the file shared, so writes through
    /// `bytes_mut` reach the file. Otherwise the mapping is private and
    /// read-only.
    pub read_write: bool,
    /// Keep the file handle after mapping, wrapped in a buffered reader.
    pub keep_handle_open: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_write(mut self, read_write: bool) -> Self {
        self.read_write = read_write;
        self
    }

    pub fn keep_handle_open(mut self, keep: bool) -> Self {
        self.keep_handle_open = keep;
        self
    }
}
