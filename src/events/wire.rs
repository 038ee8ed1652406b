//! Wire format for progress events.
//!
//! Every event travels as one JSON object `{type, message?, data?, content?}`.
//! Consumers must ignore types they do not know, so decoding an unknown
//! `type` yields `None` instead of an error.

use super::ProgressEvent;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl WireEvent {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            message: None,
            data: None,
            content: None,
        }
    }

    /// Serialize to a single-line JSON record.
    pub fn to_json(&self) -> String {
        // A struct of strings and JSON values always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Map back to a typed event. Unknown or incomplete records are `None`.
    pub fn into_event(self) -> Option<ProgressEvent> {
        match self.kind.as_str() {
            "runCreated" => {
                let id = self.data?.get("runId")?.as_str()?.to_string();
                Some(ProgressEvent::RunCreated { id })
            }
            "status" => Some(ProgressEvent::Status {
                message: self.message?,
            }),
            "queriesReady" => {
                let queries = serde_json::from_value(self.data?).ok()?;
                Some(ProgressEvent::QueriesReady { queries })
            }
            "searchResult" => Some(ProgressEvent::SearchResult {
                payload: self.data?,
            }),
            "summaryChunk" => Some(ProgressEvent::SummaryChunk {
                text: self.content?,
            }),
            "complete" => Some(ProgressEvent::Complete {
                final_summary: self.content.unwrap_or_default(),
            }),
            "error" => Some(ProgressEvent::Error {
                reason: self.message.unwrap_or_default(),
            }),
            _ => None,
        }
    }

    /// Parse one wire record, ignoring unknown types.
    pub fn parse(line: &str) -> Option<ProgressEvent> {
        serde_json::from_str::<WireEvent>(line).ok()?.into_event()
    }
}

impl From<&ProgressEvent> for WireEvent {
    fn from(event: &ProgressEvent) -> Self {
        let mut wire = WireEvent::new(event.kind());
        match event {
            ProgressEvent::RunCreated { id } => wire.data = Some(json!({ "runId": id })),
            ProgressEvent::Status { message } => wire.message = Some(message.clone()),
            ProgressEvent::QueriesReady { queries } => wire.data = Some(json!(queries)),
            ProgressEvent::SearchResult { payload } => wire.data = Some(payload.clone()),
            ProgressEvent::SummaryChunk { text } => wire.content = Some(text.clone()),
            ProgressEvent::Complete { final_summary } => {
                wire.content = Some(final_summary.clone())
            }
            ProgressEvent::Error { reason } => wire.message = Some(reason.clone()),
        }
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_chunk_uses_content_field() {
        let event = ProgressEvent::SummaryChunk {
            text: "Rust ".to_string(),
        };
        let value: Value = serde_json::from_str(&WireEvent::from(&event).to_json()).unwrap();

        assert_eq!(value["type"], "summaryChunk");
        assert_eq!(value["content"], "Rust ");
        assert!(value.get("message").is_none());
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_run_created_carries_id_in_data() {
        let event = ProgressEvent::RunCreated {
            id: "run-42".to_string(),
        };
        let wire = WireEvent::from(&event);

        assert_eq!(wire.data, Some(json!({ "runId": "run-42" })));
        assert_eq!(wire.into_event(), Some(event));
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        assert_eq!(
            WireEvent::parse(r#"{"type":"heartbeat","message":"hi"}"#),
            None
        );
        assert_eq!(WireEvent::parse("not json"), None);
    }

    #[test]
    fn test_parse_error_and_queries() {
        assert_eq!(
            WireEvent::parse(r#"{"type":"error","message":"search failed"}"#),
            Some(ProgressEvent::error("search failed"))
        );
        assert_eq!(
            WireEvent::parse(r#"{"type":"queriesReady","data":["a","b"]}"#),
            Some(ProgressEvent::QueriesReady {
                queries: vec!["a".to_string(), "b".to_string()]
            })
        );
    }
}
