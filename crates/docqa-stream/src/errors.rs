use std::sync::Arc;

/// A line record that cannot be trusted as a protocol event.
///
/// Any framing error is fatal to its session: once a record boundary is
/// corrupt, later records are not resynchronized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// A completed line was not valid UTF-8.
    #[error("line {line} is not valid UTF-8: {reason}")]
    InvalidUtf8 { line: u64, reason: String },
    /// A line grew past the configured limit before its newline arrived.
    #[error("line {line} exceeds {limit} bytes")]
    LineTooLong { line: u64, limit: usize },
    /// The line is not a JSON object.
    #[error("malformed record: {reason}")]
    Malformed { reason: String },
    /// The record has no string `type` discriminator.
    #[error("record has no `type` discriminator")]
    MissingType,
    /// A recognized event type is missing a required field or has the wrong shape.
    #[error("invalid `{event_type}` record: {reason}")]
    InvalidPayload { event_type: String, reason: String },
}

/// Failure reported by the byte source itself.
///
/// The underlying error (for example a `reqwest::Error`) is kept as the
/// `source()` of this error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl TransportError {
    /// Creates a transport error without an underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying I/O or network error.
    pub fn from_source<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Terminal failure of a stream session (or a cancelled consumption).
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamError {
    /// A line could not be framed or classified.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    /// The stream ended without a completion signal.
    #[error("protocol violation: {message}")]
    ProtocolViolation { message: String },
    /// The byte source failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The far end sent an explicit `error` event; the message is passed through verbatim.
    #[error("{message}")]
    Application { message: String },
    /// The caller aborted consumption. This is not a settlement of the session.
    #[error("stream consumption cancelled")]
    Cancelled,
}

impl StreamError {
    pub(crate) fn incomplete_stream() -> Self {
        Self::ProtocolViolation {
            message: "incomplete stream: no completion signal received".into(),
        }
    }

    /// Human-readable message suitable for surfacing to a user.
    ///
    /// Application errors yield the server's message unchanged.
    pub fn message(&self) -> String {
        match self {
            Self::Application { message } | Self::ProtocolViolation { message } => message.clone(),
            Self::Transport(err) => err.message().to_string(),
            other => other.to_string(),
        }
    }

    /// Returns true when the error came from the caller aborting consumption.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}
