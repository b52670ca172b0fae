use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MediaKind {
    Movie,
    Series,
}

/// A file the catalog resolved, with its size at lookup time.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub size: u64,
    pub content_type: &'static str,
}

/// Inclusive byte offsets (`start..=end`) into a file of known size.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ByteWindow {
    pub start: u64,
    pub end: u64,
}

impl ByteWindow {
    pub fn len(self) -> u64 {
        debug_assert!(self.start <= self.end);
        self.end - self.start + 1
    }

    pub fn is_empty(self) -> bool {
        self.start > self.end
    }
}

/// Partial-content headers, derived only from a window and the file size.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RangeHeaders {
    pub content_range: String,
    pub accept_ranges: &'static str,
    pub content_length: u64,
    pub content_type: &'static str,
}

impl RangeHeaders {
    pub fn for_window(window: ByteWindow, size: u64, content_type: &'static str) -> Self {
        RangeHeaders {
            content_range: format!("bytes {}-{}/{}", window.start, window.end, size),
            accept_ranges: "bytes",
            content_length: window.len(),
            content_type,
        }
    }
}
