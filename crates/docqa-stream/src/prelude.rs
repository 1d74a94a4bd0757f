//! Common imports for consuming service streams.
pub use crate::{
    AbortHandle, ByteSource, EventSink, FnSink, Progress, QueryAnswer, QueryMode, SourceRef,
    StartInfo, StreamConfig, StreamConsumer, StreamError, StreamSource, UploadSummary,
};
