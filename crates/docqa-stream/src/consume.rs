use tokio::sync::watch;
use tracing::{Instrument as _, debug, info_span};

use crate::completion::{Completion, QueryAnswer, QueryCompletion, UploadCompletion, UploadSummary};
use crate::config::StreamConfig;
use crate::errors::StreamError;
use crate::session::StreamSession;
use crate::sink::EventSink;
use crate::transport::{ByteSource, SourceGuard};

/// Handle used to request cancellation of a running consumption.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The consumer stops reading, releases the source and returns
    /// [`StreamError::Cancelled`]. No sink call or settlement happens after
    /// this returns.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving side of an [`AbortHandle`].
#[derive(Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once an abort is requested; never resolves if every handle is
    /// dropped without aborting.
    pub async fn aborted(&mut self) {
        let sender_gone = self.rx.wait_for(|aborted| *aborted).await.is_err();
        if sender_gone {
            std::future::pending::<()>().await;
        }
    }
}

/// Creates a linked abort handle and signal.
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

/// Builder for consuming one streamed response.
///
/// ```no_run
/// use docqa_stream::prelude::*;
///
/// # async fn demo(response: reqwest::Response) -> Result<(), StreamError> {
/// let sink = FnSink::new().progress(|p| println!("{}% {}", p.percent, p.stage));
/// let summary = StreamConsumer::upload(sink)
///     .run(StreamSource::from_response(response))
///     .await?;
/// println!("added {} chunks", summary.added_count);
/// # Ok(())
/// # }
/// ```
pub struct StreamConsumer<S, C> {
    sink: S,
    completion: C,
    config: StreamConfig,
    abort: Option<AbortSignal>,
    handle: Option<AbortHandle>,
}

impl<S: EventSink> StreamConsumer<S, UploadCompletion> {
    /// Upload-with-progress stream resolving with an [`UploadSummary`].
    pub fn upload(sink: S) -> Self {
        Self::new(sink, UploadCompletion)
    }
}

impl<S: EventSink> StreamConsumer<S, QueryCompletion> {
    /// Answer stream resolving with a [`QueryAnswer`].
    pub fn query(sink: S) -> Self {
        Self::new(sink, QueryCompletion)
    }
}

impl<S: EventSink, C: Completion> StreamConsumer<S, C> {
    pub fn new(sink: S, completion: C) -> Self {
        Self {
            sink,
            completion,
            config: StreamConfig::default(),
            abort: None,
            handle: None,
        }
    }

    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns a handle that cancels this consumption.
    ///
    /// Every call returns a clone of the same handle.
    pub fn abort_handle(&mut self) -> AbortHandle {
        if let Some(handle) = &self.handle {
            return handle.clone();
        }
        let (handle, signal) = abort_pair();
        self.abort = Some(signal);
        self.handle = Some(handle.clone());
        handle
    }

    /// Cancels this consumption when `signal` fires.
    ///
    /// Replaces the link of any handle taken from [`StreamConsumer::abort_handle`].
    pub fn abort_on(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self.handle = None;
        self
    }

    /// Reads `source` to its end and returns the session's settlement.
    ///
    /// The source is released on every exit path, including cancellation and
    /// the returned future being dropped.
    pub async fn run<B: ByteSource>(self, source: B) -> Result<C::Output, StreamError> {
        let mut session = StreamSession::with_config(self.sink, self.completion, &self.config);
        if let Some(signal) = self.abort.clone() {
            session = session.with_abort(signal);
        }
        let span = info_span!("stream_session", session_id = %session.id(), kind = session.kind());
        drive(session, SourceGuard::new(source), self.abort)
            .instrument(span)
            .await
    }
}

async fn drive<B, S, C>(
    mut session: StreamSession<S, C>,
    mut source: SourceGuard<B>,
    mut abort: Option<AbortSignal>,
) -> Result<C::Output, StreamError>
where
    B: ByteSource,
    S: EventSink,
    C: Completion,
{
    let mut chunks = 0_u64;
    while !session.is_settled() {
        let next = tokio::select! {
            biased;
            _ = wait_for_abort(abort.as_mut()) => {
                session.cancel();
                debug!(chunks, "consumption aborted");
                return Err(StreamError::Cancelled);
            }
            next = source.next_chunk() => next,
        };
        if session.is_cancelled() || abort.as_ref().is_some_and(AbortSignal::is_aborted) {
            session.cancel();
            return Err(StreamError::Cancelled);
        }
        match next {
            Ok(Some(chunk)) => {
                chunks += 1;
                debug!(chunks, bytes = chunk.len(), "read chunk");
                session.feed(&chunk);
            }
            Ok(None) => {
                debug!(chunks, "end of stream");
                session.finish();
            }
            Err(err) => session.fail_transport(err),
        }
        if session.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
    }
    drop(source);
    match session.into_outcome() {
        Some(outcome) => outcome,
        None => Err(StreamError::incomplete_stream()),
    }
}

async fn wait_for_abort(signal: Option<&mut AbortSignal>) {
    match signal {
        Some(signal) => signal.aborted().await,
        None => std::future::pending().await,
    }
}

/// Consumes an upload-with-progress stream.
pub async fn consume_upload<B, S>(source: B, sink: S) -> Result<UploadSummary, StreamError>
where
    B: ByteSource,
    S: EventSink,
{
    StreamConsumer::upload(sink).run(source).await
}

/// Consumes an answer stream.
pub async fn consume_query<B, S>(source: B, sink: S) -> Result<QueryAnswer, StreamError>
where
    B: ByteSource,
    S: EventSink,
{
    StreamConsumer::query(sink).run(source).await
}
