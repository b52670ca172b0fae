use crate::application_port::StreamError;
use crate::domain_model::ByteWindow;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

const DEFAULT_READ_BUFFER: usize = 64 * 1024;

/// Opens file-backed byte sources for a resolved window.
#[derive(Debug, Clone, Copy)]
pub struct StreamPump {
    read_buffer: usize,
}

impl Default for StreamPump {
    fn default() -> Self {
        StreamPump {
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }
}

impl StreamPump {
    pub fn with_read_buffer(read_buffer: usize) -> Self {
        StreamPump {
            read_buffer: read_buffer.max(1),
        }
    }

    /// Opens `path` at `window.start` and reads the first chunk before
    /// returning, so that open and first-read failures surface here, while
    /// the response status can still change.
    pub async fn open(&self, path: &Path, window: ByteWindow) -> Result<MediaStream, StreamError> {
        let mut file = File::open(path).await.map_err(StreamError::Open)?;
        if window.start > 0 {
            file.seek(SeekFrom::Start(window.start))
                .await
                .map_err(StreamError::Open)?;
        }

        let expected = window.len();
        let mut inner = ReaderStream::with_capacity(file.take(expected), self.read_buffer);
        let primed = match inner.next().await {
            Some(Ok(chunk)) => Some(chunk),
            Some(Err(source)) => {
                return Err(StreamError::Read {
                    bytes_sent: 0,
                    source,
                });
            }
            None => None,
        };

        let mut stream = MediaStream {
            inner,
            primed,
            path: path.to_path_buf(),
            expected,
            bytes_sent: 0,
            finished: false,
        };
        if stream.primed.is_none() {
            // The file shrank below `window.start` between lookup and open.
            return Err(stream.short_read());
        }
        Ok(stream)
    }
}

/// Body stream for one response. Yields the window's bytes, then ends; any
/// read failure, including the file ending early, is yielded once as an
/// error, after which the stream is finished. Dropping it releases the file.
pub struct MediaStream {
    inner: ReaderStream<Take<File>>,
    primed: Option<Bytes>,
    path: PathBuf,
    expected: u64,
    bytes_sent: u64,
    finished: bool,
}

impl MediaStream {
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    fn short_read(&mut self) -> StreamError {
        self.finished = true;
        StreamError::Read {
            bytes_sent: self.bytes_sent,
            source: io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes", self.expected),
            ),
        }
    }

    fn yield_chunk(&mut self, chunk: Bytes) -> Poll<Option<io::Result<Bytes>>> {
        self.bytes_sent += chunk.len() as u64;
        Poll::Ready(Some(Ok(chunk)))
    }

    fn abort(&mut self, error: StreamError) -> Poll<Option<io::Result<Bytes>>> {
        self.finished = true;
        warn!(path = %self.path.display(), bytes_sent = self.bytes_sent, "aborting media stream: {}", error);
        let source = match error {
            StreamError::Open(source) | StreamError::Read { source, .. } => source,
        };
        Poll::Ready(Some(Err(source)))
    }
}

impl Stream for MediaStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        if let Some(chunk) = this.primed.take() {
            return this.yield_chunk(chunk);
        }

        match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
            Some(Ok(chunk)) => this.yield_chunk(chunk),
            Some(Err(source)) => {
                let error = StreamError::Read {
                    bytes_sent: this.bytes_sent,
                    source,
                };
                this.abort(error)
            }
            None if this.bytes_sent < this.expected => {
                let error = this.short_read();
                this.abort(error)
            }
            None => {
                this.finished = true;
                debug!(path = %this.path.display(), bytes_sent = this.bytes_sent, "media stream complete");
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        if !self.finished {
            debug!(path = %self.path.display(), bytes_sent = self.bytes_sent, "client went away mid-stream");
        }
    }
}
