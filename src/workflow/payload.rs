use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{unwrap_first, ProxyError};

/// Message the webhook sends when it acknowledges instead of waiting for the result.
pub const WORKFLOW_STARTED: &str = "Workflow was started";

/// Fields the transcript workflow may send. Every field is optional and
/// tolerant of its JSON type; see [`WorkflowPayload::normalize`] for the
/// fallback order.
#[derive(Debug, Default, Deserialize)]
pub struct WorkflowPayload {
    #[serde(rename = "videoTitle", default, deserialize_with = "text")]
    pub video_title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub introduction: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub summary: Option<String>,
    #[serde(rename = "mainPoints", default, deserialize_with = "text")]
    pub main_points: Option<String>,
    #[serde(rename = "fullContent", default, deserialize_with = "text")]
    pub full_content: Option<String>,
    #[serde(rename = "fullcontent", default, deserialize_with = "text")]
    pub full_content_lowercase: Option<String>,
    #[serde(default, deserialize_with = "nested_output")]
    pub output: Option<WorkflowOutput>,
}

/// Nested `output` object produced by some workflow versions.
#[derive(Debug, Default, Deserialize)]
pub struct WorkflowOutput {
    #[serde(default, deserialize_with = "text")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub introduction: Option<String>,
}

/// Transcript fields after applying the fallback chain.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizedTranscript {
    pub video_title: Option<String>,
    pub introduction: Option<String>,
    pub summary: Option<String>,
    pub main_points: Option<String>,
    pub full_content: Option<String>,
}

impl WorkflowPayload {
    pub fn normalize(self) -> NormalizedTranscript {
        let (nested_subject, nested_intro) = match self.output {
            Some(o) => (o.subject, o.introduction),
            None => (None, None),
        };
        NormalizedTranscript {
            video_title: self.video_title.or(nested_subject),
            introduction: self.introduction.or(nested_intro),
            summary: self.summary,
            main_points: self.main_points,
            full_content: self.full_content.or(self.full_content_lowercase),
        }
    }
}

/// What a 200 reply from the transcript webhook turned out to be.
#[derive(Debug)]
pub enum WorkflowReply {
    /// Body was not JSON; kept verbatim as free text.
    Unstructured(String),
    Structured(WorkflowPayload),
}

pub fn parse_reply(body: &str) -> Result<WorkflowReply, ProxyError> {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return Ok(WorkflowReply::Unstructured(body.to_string())),
    };

    if value.get("message").and_then(Value::as_str) == Some(WORKFLOW_STARTED) {
        return Err(ProxyError::WorkflowNotCompleted);
    }

    match unwrap_first(value) {
        value @ Value::Object(_) => serde_json::from_value(value)
            .map(WorkflowReply::Structured)
            .map_err(|e| ProxyError::Malformed(e.to_string())),
        Value::Array(_) => Err(ProxyError::Malformed("empty result list".into())),
        _ => Err(ProxyError::Malformed("expected a JSON object".into())),
    }
}

fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(Value::deserialize(deserializer)?))
}

fn nested_output<'de, D>(deserializer: D) -> Result<Option<WorkflowOutput>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => Ok(serde_json::from_value(value).ok()),
        _ => Ok(None),
    }
}

// Empty values count as absent so the fallback field gets a chance.
fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Array(ref a) if a.is_empty() => None,
        Value::Object(ref o) if o.is_empty() => None,
        other => Some(other.to_string()),
    }
}
