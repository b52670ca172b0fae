use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("missing Range header")]
    MissingRange,
    #[error("malformed Range header")]
    MalformedRange,
    #[error("range not satisfiable for size {size}")]
    Unsatisfiable { size: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("failed to open media source: {0}")]
    Open(#[source] io::Error),
    #[error("failed to read media source after {bytes_sent} bytes: {source}")]
    Read {
        bytes_sent: u64,
        #[source]
        source: io::Error,
    },
}

impl StreamError {
    /// Body bytes that reached the client before the failure.
    pub fn bytes_sent(&self) -> u64 {
        match self {
            StreamError::Open(_) => 0,
            StreamError::Read { bytes_sent, .. } => *bytes_sent,
        }
    }
}
