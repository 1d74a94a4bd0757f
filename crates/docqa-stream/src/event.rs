//! Typed events decoded from the service's newline-delimited JSON stream.
//!
//! Payload structs deserialize straight from the wire record; the `type`
//! discriminator is resolved by [`crate::classifier`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire tag for progress records.
pub const TYPE_PROGRESS: &str = "progress";
/// Wire tag for answer metadata sent before any text.
pub const TYPE_START: &str = "start";
/// Wire tag for incremental answer text.
pub const TYPE_STREAM: &str = "stream";
/// Wire tag for the upload result.
pub const TYPE_COMPLETE: &str = "complete";
/// Wire tag for a server-side failure.
pub const TYPE_ERROR: &str = "error";
/// Wire tag for the end-of-answer marker.
pub const TYPE_DONE: &str = "done";

/// One decoded protocol event.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Progress(Progress),
    Start(StartInfo),
    /// Incremental answer text (`stream` on the wire).
    Delta { text: String },
    Complete(CompletePayload),
    /// Explicit failure reported by the far end.
    Error { message: String },
    Done,
    /// A `type` this client does not know. Ignored by sessions.
    Unknown { kind: String },
}

impl Event {
    /// Short name used in logs.
    pub fn kind(&self) -> &str {
        match self {
            Self::Progress(_) => TYPE_PROGRESS,
            Self::Start(_) => TYPE_START,
            Self::Delta { .. } => TYPE_STREAM,
            Self::Complete(_) => TYPE_COMPLETE,
            Self::Error { .. } => TYPE_ERROR,
            Self::Done => TYPE_DONE,
            Self::Unknown { kind } => kind,
        }
    }

    /// Returns true for events that settle a session on their own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error { .. })
    }
}

/// Progress update for a long-running server operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Percentage as sent by the server. Not clamped or rounded.
    #[serde(rename = "progress")]
    pub percent: f64,
    pub stage: String,
    pub message: Option<String>,
}

/// Answer metadata: how the answer is produced and which documents back it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartInfo {
    pub mode: QueryMode,
    pub sources: Vec<SourceRef>,
}

/// Final payload of an upload stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
    pub added_chunks: u64,
    pub files: Vec<serde_json::Value>,
    pub errors: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
pub(crate) struct DeltaRecord {
    pub data: String,
}

#[derive(Deserialize)]
pub(crate) struct ErrorRecord {
    pub message: String,
}

/// Answer mode reported in `start` records.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueryMode {
    /// Retrieval-augmented answer from the knowledge base.
    Kb,
    /// Direct model answer without retrieval.
    Llm,
    /// Server decides based on retrieval hits.
    Auto,
    Other(String),
}

impl QueryMode {
    /// Wire spelling of the mode.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Kb => "kb",
            Self::Llm => "llm",
            Self::Auto => "auto",
            Self::Other(other) => other,
        }
    }

    /// Display label for a UI; `None` for modes without one.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Kb => Some("Knowledge base"),
            Self::Llm => Some("Direct AI"),
            Self::Auto | Self::Other(_) => None,
        }
    }
}

impl From<String> for QueryMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "kb" => Self::Kb,
            "llm" => Self::Llm,
            "auto" => Self::Auto,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for QueryMode {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<QueryMode> for String {
    fn from(value: QueryMode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys checked, in order, for a source object's display label.
const SOURCE_LABEL_KEYS: [&str; 3] = ["source", "filename", "name"];

/// A document backing an answer: either a bare name or a metadata object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceRef {
    Name(String),
    Record(serde_json::Map<String, serde_json::Value>),
}

impl SourceRef {
    /// Display label: the name itself, or the first of `source`, `filename`,
    /// `name` present on the object, falling back to its JSON text.
    pub fn label(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Record(fields) => SOURCE_LABEL_KEYS
                .iter()
                .find_map(|key| fields.get(*key).and_then(|v| v.as_str()))
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| serde_json::Value::Object(fields.clone()).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_label_prefers_source_then_filename_then_name() {
        let plain: SourceRef = serde_json::from_value(json!("a.pdf")).expect("plain");
        assert_eq!(plain.label(), "a.pdf");

        let by_filename: SourceRef =
            serde_json::from_value(json!({"filename": "b.md", "name": "ignored"})).expect("obj");
        assert_eq!(by_filename.label(), "b.md");

        let by_source: SourceRef =
            serde_json::from_value(json!({"name": "n", "source": "c.txt"})).expect("obj");
        assert_eq!(by_source.label(), "c.txt");

        let unlabeled: SourceRef = serde_json::from_value(json!({"page": 3})).expect("obj");
        assert_eq!(unlabeled.label(), r#"{"page":3}"#);
    }

    #[test]
    fn query_mode_round_trips_unknown_values() {
        assert_eq!(QueryMode::from("kb"), QueryMode::Kb);
        assert_eq!(QueryMode::from("auto").label(), None);
        let mode: QueryMode = serde_json::from_value(json!("hybrid")).expect("mode");
        assert_eq!(mode, QueryMode::Other("hybrid".into()));
        assert_eq!(serde_json::to_value(&mode).expect("ser"), json!("hybrid"));
    }

    #[test]
    fn progress_percent_is_not_rounded() {
        let progress: Progress =
            serde_json::from_value(json!({"progress": 33.75, "stage": "embed"})).expect("progress");
        assert_eq!(progress.percent, 33.75);
        assert_eq!(progress.message, None);
    }
}
