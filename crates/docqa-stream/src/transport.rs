//! Pull-based byte sources feeding a session.

use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt as _};
use tracing::debug;

use crate::errors::TransportError;

/// Boxed response body stream, as produced by `reqwest::Response::bytes_stream`.
pub type ByteStream =
    Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static>>;

/// Source of response bytes.
///
/// Exactly one `next_chunk` call is outstanding at a time. `release` is called
/// once when consumption stops for any reason, and must drop whatever keeps
/// the underlying connection alive.
#[async_trait::async_trait]
pub trait ByteSource: Send {
    /// Next chunk, or `None` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError>;

    /// Releases the underlying reader. Further reads return `None`.
    fn release(&mut self) {}
}

/// [`ByteSource`] over any stream of byte chunks.
pub struct StreamSource<St> {
    inner: Option<St>,
}

impl<St> StreamSource<St> {
    pub fn new(stream: St) -> Self {
        Self {
            inner: Some(stream),
        }
    }

    /// True once the reader has been released.
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }
}

impl StreamSource<ByteStream> {
    /// Wraps the body of an HTTP response.
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(Box::pin(response.bytes_stream()))
    }
}

#[async_trait::async_trait]
impl<St, B, E> ByteSource for StreamSource<St>
where
    St: Stream<Item = Result<B, E>> + Send + Unpin,
    B: Into<Bytes> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        let Some(stream) = self.inner.as_mut() else {
            return Ok(None);
        };
        match stream.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk.into())),
            Some(Err(err)) => Err(TransportError::from_source(err)),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        if self.inner.take().is_some() {
            debug!("byte source released");
        }
    }
}

/// Owns a source for the duration of one consumption and releases it on drop,
/// whichever way the consumer exits.
pub(crate) struct SourceGuard<B: ByteSource> {
    source: B,
}

impl<B: ByteSource> SourceGuard<B> {
    pub(crate) fn new(source: B) -> Self {
        Self { source }
    }

    pub(crate) async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        self.source.next_chunk().await
    }
}

impl<B: ByteSource> Drop for SourceGuard<B> {
    fn drop(&mut self) {
        self.source.release();
    }
}
