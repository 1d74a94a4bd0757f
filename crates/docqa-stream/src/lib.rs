//! Streaming response consumer for the document Q&A service.
//!
//! The service answers uploads and questions with newline-delimited JSON
//! records (`progress`, `start`, `stream`, `complete`, `error`, `done`)
//! delivered over a chunked HTTP body. This crate turns that byte stream into
//! sink callbacks and exactly one final result, whatever the chunk boundaries.
//!
//! # Consuming an answer stream
//!
//! ```no_run
//! use docqa_stream::prelude::*;
//!
//! # async fn demo(response: reqwest::Response) -> Result<(), StreamError> {
//! let sink = FnSink::new()
//!     .start(|start| eprintln!("mode: {}", start.mode))
//!     .delta(|text| print!("{text}"));
//!
//! let answer = StreamConsumer::query(sink)
//!     .run(StreamSource::from_response(response))
//!     .await?;
//!
//! println!("\nsources: {:?}", answer.source_labels());
//! # Ok(())
//! # }
//! ```

/// Line record → typed event classification.
pub mod classifier;
/// Completion mappings and final result types.
pub mod completion;
/// Per-session settings.
pub mod config;
/// Async consumer driving a session from a byte source, with cancellation.
pub mod consume;
/// Error types.
pub mod errors;
/// Wire event types.
pub mod event;
/// Newline framing over chunked bytes.
pub mod framer;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Session reconciler state machine.
pub mod session;
/// Caller-supplied event sinks.
pub mod sink;
/// Byte source abstraction and adapters.
pub mod transport;

pub use completion::{Completion, QueryAnswer, QueryCompletion, Transcript, UploadCompletion, UploadSummary};
pub use config::StreamConfig;
pub use consume::{AbortHandle, AbortSignal, StreamConsumer, abort_pair, consume_query, consume_upload};
pub use errors::{ConfigError, FramingError, StreamError, TransportError};
pub use event::{CompletePayload, Event, Progress, QueryMode, SourceRef, StartInfo};
pub use framer::{LineFramer, LineRecord};
pub use session::{SessionState, StreamSession};
pub use sink::{EventSink, FnSink, NoopSink, RecordingSink};
pub use transport::{ByteSource, ByteStream, StreamSource};
