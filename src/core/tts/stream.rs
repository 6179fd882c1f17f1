//! Read-once stream of encoded audio bytes.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use tokio::runtime::Handle;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Boxed byte stream carried by an [`AudioStream`].
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// An open, sequential source of encoded audio.
///
/// Dropping the stream closes it; [`AudioStream::close`] does the same
/// explicitly and may be called any number of times. Reading from a closed
/// stream is an error.
pub struct AudioStream {
    inner: Option<ByteStream>,
    content_type: Option<String>,
    bytes_read: u64,
}

impl AudioStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Some(Box::pin(stream)),
            content_type: None,
            bytes_read: 0,
        }
    }

    /// Wraps the body of a successful HTTP response without buffering it.
    pub fn from_response(response: reqwest::Response) -> Self {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes_stream().map_err(io::Error::other);

        Self {
            content_type,
            ..Self::new(body)
        }
    }

    /// A stream over an in-memory buffer.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self::new(futures::stream::once(async move { Ok(data) }))
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Bytes handed out through [`AudioStream::next_chunk`] so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Releases the underlying transport. Idempotent.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!(bytes_read = self.bytes_read, "Audio stream closed");
        }
    }

    /// Next chunk of bytes, or `None` at end of stream.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let stream = self.inner.as_mut().ok_or_else(closed_error)?;
        match stream.next().await {
            Some(Ok(chunk)) => {
                self.bytes_read += chunk.len() as u64;
                Ok(Some(chunk))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Converts the stream into a blocking reader for use off the async runtime.
    ///
    /// When `cancel` fires the reader reports end-of-stream and the underlying
    /// transport is dropped, so a pending read never outlives cancellation.
    /// The reader must not be used from a runtime worker thread.
    pub fn into_blocking_reader(
        mut self,
        cancel: CancellationToken,
        handle: Handle,
    ) -> io::Result<AudioReader> {
        let stream = self.inner.take().ok_or_else(closed_error)?;
        let bytes_read = Arc::new(AtomicU64::new(self.bytes_read));
        let counter = bytes_read.clone();
        let stream = stream
            .take_until(cancel.cancelled_owned())
            .inspect_ok(move |chunk| {
                counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
            });
        let reader: Pin<Box<dyn tokio::io::AsyncRead + Send>> = Box::pin(StreamReader::new(stream));

        Ok(AudioReader {
            inner: SyncIoBridge::new_with_handle(reader, handle),
            bytes_read,
        })
    }
}

impl fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioStream")
            .field("closed", &self.is_closed())
            .field("content_type", &self.content_type)
            .field("bytes_read", &self.bytes_read)
            .finish()
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "audio stream is closed")
}

/// Bytes a read gathers before returning, unless the stream ends first.
/// Larger than any MPEG audio frame, so a decoder refill never holds only a
/// fragment of one.
const MIN_READ_LEN: usize = 2048;

/// Blocking [`io::Read`] view of an [`AudioStream`].
///
/// Each read returns at least `MIN_READ_LEN` bytes (or the whole buffer, if
/// smaller) unless the stream ends or is cancelled.
pub struct AudioReader {
    inner: SyncIoBridge<Pin<Box<dyn tokio::io::AsyncRead + Send>>>,
    bytes_read: Arc<AtomicU64>,
}

impl AudioReader {
    /// Shared count of bytes pulled from the network, including any read
    /// through [`AudioStream::next_chunk`] before conversion. Stays valid
    /// after the reader is moved or dropped.
    pub fn byte_counter(&self) -> Arc<AtomicU64> {
        self.bytes_read.clone()
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }
}

impl io::Read for AudioReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let want = buf.len().min(MIN_READ_LEN);
        let mut filled = 0;
        while filled < want {
            match self.inner.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }
}
