//! Completion mappings: what a session resolves with.
//!
//! Upload and query streams share one reconciler and differ only in how the
//! success value is assembled from the stream.

use serde::{Deserialize, Serialize};

use crate::event::{CompletePayload, QueryMode, SourceRef, StartInfo};

/// What a session has seen so far, besides its terminal event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    text: String,
    deltas: u64,
    start: Option<StartInfo>,
}

impl Transcript {
    /// Answer text accumulated from deltas.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of non-empty deltas received.
    pub fn delta_count(&self) -> u64 {
        self.deltas
    }

    /// Most recent `start` metadata.
    pub fn start(&self) -> Option<&StartInfo> {
        self.start.as_ref()
    }

    pub(crate) fn push_delta(&mut self, text: &str) {
        self.text.push_str(text);
        self.deltas += 1;
    }

    pub(crate) fn set_start(&mut self, start: StartInfo) {
        self.start = Some(start);
    }
}

/// Maps terminal signals to a session's success value.
pub trait Completion {
    type Output;

    /// Label used in logs (`upload`, `query`).
    fn kind(&self) -> &'static str;

    /// Success value for a `complete` event.
    fn complete(&mut self, payload: CompletePayload, transcript: &Transcript) -> Self::Output;

    /// Success value for a `done` marker, if this stream treats it as terminal.
    fn done(&mut self, _transcript: &Transcript) -> Option<Self::Output> {
        None
    }
}

/// Result of an upload-with-progress stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub added_count: u64,
    pub files: Vec<serde_json::Value>,
    pub errors: Vec<serde_json::Value>,
}

/// Upload streams resolve only on `complete`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UploadCompletion;

impl Completion for UploadCompletion {
    type Output = UploadSummary;

    fn kind(&self) -> &'static str {
        "upload"
    }

    fn complete(&mut self, payload: CompletePayload, _transcript: &Transcript) -> UploadSummary {
        UploadSummary {
            added_count: payload.added_chunks,
            files: payload.files,
            errors: payload.errors,
        }
    }
}

/// Full answer of a query stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub text: String,
    pub mode: Option<QueryMode>,
    /// Backing sources, de-duplicated by label in first-seen order.
    pub sources: Vec<SourceRef>,
}

impl QueryAnswer {
    fn from_transcript(transcript: &Transcript) -> Self {
        let (mode, sources) = match transcript.start() {
            Some(start) => (Some(start.mode.clone()), dedup_sources(&start.sources)),
            None => (None, Vec::new()),
        };
        Self {
            text: transcript.text().to_string(),
            mode,
            sources,
        }
    }

    /// Source labels for display.
    pub fn source_labels(&self) -> Vec<String> {
        self.sources.iter().map(SourceRef::label).collect()
    }
}

/// Query streams resolve on `complete` or on the `done` marker that ends a
/// successful answer.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryCompletion;

impl Completion for QueryCompletion {
    type Output = QueryAnswer;

    fn kind(&self) -> &'static str {
        "query"
    }

    fn complete(&mut self, _payload: CompletePayload, transcript: &Transcript) -> QueryAnswer {
        QueryAnswer::from_transcript(transcript)
    }

    fn done(&mut self, transcript: &Transcript) -> Option<QueryAnswer> {
        Some(QueryAnswer::from_transcript(transcript))
    }
}

fn dedup_sources(sources: &[SourceRef]) -> Vec<SourceRef> {
    let mut seen = std::collections::HashSet::new();
    sources
        .iter()
        .filter(|source| seen.insert(source.label()))
        .cloned()
        .collect()
}
