//! Line record → typed [`Event`] classification.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::FramingError;
use crate::event::{
    DeltaRecord, ErrorRecord, Event, TYPE_COMPLETE, TYPE_DONE, TYPE_ERROR, TYPE_PROGRESS,
    TYPE_START, TYPE_STREAM,
};
use crate::framer::LineRecord;

/// Classifies one framed line.
///
/// Blank lines yield `Ok(None)`. Unrecognized `type` values yield
/// [`Event::Unknown`] so newer servers do not break older clients.
pub fn classify(line: &LineRecord) -> Result<Option<Event>, FramingError> {
    classify_str(line.as_str())
}

/// Classifies raw line text (see [`classify`]).
pub fn classify_str(line: &str) -> Result<Option<Event>, FramingError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| FramingError::Malformed {
            reason: e.to_string(),
        })?;
    if !value.is_object() {
        return Err(FramingError::Malformed {
            reason: format!("expected a JSON object, got {}", json_kind(&value)),
        });
    }
    let Some(event_type) = value.get("type").and_then(|v| v.as_str()) else {
        return Err(FramingError::MissingType);
    };
    let event_type = event_type.to_string();

    let event = match event_type.as_str() {
        TYPE_PROGRESS => Event::Progress(payload(&event_type, value)?),
        TYPE_START => Event::Start(payload(&event_type, value)?),
        TYPE_STREAM => {
            let record: DeltaRecord = payload(&event_type, value)?;
            Event::Delta { text: record.data }
        }
        TYPE_COMPLETE => Event::Complete(payload(&event_type, value)?),
        TYPE_ERROR => {
            let record: ErrorRecord = payload(&event_type, value)?;
            Event::Error {
                message: record.message,
            }
        }
        TYPE_DONE => Event::Done,
        _ => {
            debug!(event_type = %event_type, "unrecognized event type");
            Event::Unknown { kind: event_type }
        }
    };
    Ok(Some(event))
}

fn payload<T: DeserializeOwned>(event_type: &str, value: serde_json::Value) -> Result<T, FramingError> {
    serde_json::from_value(value).map_err(|e| FramingError::InvalidPayload {
        event_type: event_type.to_string(),
        reason: e.to_string(),
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{QueryMode, SourceRef};

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(classify_str(""), Ok(None));
        assert_eq!(classify_str("   \t"), Ok(None));
    }

    #[test]
    fn progress_without_message_is_accepted() {
        let event = classify_str(r#"{"type":"progress","progress":10,"stage":"x"}"#)
            .expect("classify")
            .expect("event");
        let Event::Progress(progress) = event else {
            panic!("expected progress");
        };
        assert_eq!(progress.percent, 10.0);
        assert_eq!(progress.stage, "x");
        assert_eq!(progress.message, None);
    }

    #[test]
    fn percent_is_passed_through_out_of_range() {
        let event = classify_str(r#"{"type":"progress","progress":140,"stage":"s","message":"m"}"#)
            .expect("classify")
            .expect("event");
        assert!(matches!(event, Event::Progress(p) if p.percent == 140.0));
    }

    #[test]
    fn start_accepts_mixed_source_shapes() {
        let event = classify_str(
            r#"{"type":"start","mode":"kb","sources":["a.pdf",{"filename":"b.md","score":0.4}]}"#,
        )
        .expect("classify")
        .expect("event");
        let Event::Start(start) = event else {
            panic!("expected start");
        };
        assert_eq!(start.mode, QueryMode::Kb);
        let labels: Vec<String> = start.sources.iter().map(SourceRef::label).collect();
        assert_eq!(labels, vec!["a.pdf", "b.md"]);
    }

    #[test]
    fn stream_maps_to_delta_and_done_needs_no_fields() {
        assert_eq!(
            classify_str(r#"{"type":"stream","data":"hel"}"#),
            Ok(Some(Event::Delta { text: "hel".into() }))
        );
        assert_eq!(classify_str(r#"{"type":"done"}"#), Ok(Some(Event::Done)));
    }

    #[test]
    fn complete_and_error_decode() {
        let event = classify_str(
            r#"{"type":"complete","added_chunks":5,"files":["a.txt"],"errors":[{"error":"x"}]}"#,
        )
        .expect("classify")
        .expect("event");
        assert!(matches!(&event, Event::Complete(p) if p.added_chunks == 5 && p.files.len() == 1));
        assert!(event.is_terminal());

        assert_eq!(
            classify_str(r#"{"type":"error","message":"boom"}"#),
            Ok(Some(Event::Error {
                message: "boom".into()
            }))
        );
    }

    #[test]
    fn unknown_type_is_tolerated() {
        assert_eq!(
            classify_str(r#"{"type":"heartbeat","at":1}"#),
            Ok(Some(Event::Unknown {
                kind: "heartbeat".into()
            }))
        );
    }

    #[test]
    fn malformed_json_is_fatal() {
        assert!(matches!(
            classify_str(r#"{"type":"progress","#),
            Err(FramingError::Malformed { .. })
        ));
        assert!(matches!(
            classify_str("[1,2]"),
            Err(FramingError::Malformed { reason }) if reason.contains("array")
        ));
    }

    #[test]
    fn missing_discriminator_is_fatal() {
        assert_eq!(
            classify_str(r#"{"progress":10}"#),
            Err(FramingError::MissingType)
        );
        assert_eq!(classify_str(r#"{"type":7}"#), Err(FramingError::MissingType));
    }

    #[test]
    fn recognized_type_missing_required_field_is_fatal() {
        let err = classify_str(r#"{"type":"complete","files":[],"errors":[]}"#)
            .expect_err("missing added_chunks");
        assert!(matches!(
            &err,
            FramingError::InvalidPayload { event_type, reason }
                if event_type == "complete" && reason.contains("added_chunks")
        ));
        assert!(classify_str(r#"{"type":"error"}"#).is_err());
        assert!(classify_str(r#"{"type":"stream"}"#).is_err());
        assert!(classify_str(r#"{"type":"progress","stage":"x"}"#).is_err());
    }
}
