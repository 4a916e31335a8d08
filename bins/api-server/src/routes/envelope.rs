use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hook_core::EffectResult;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::normalize::{ArgumentsError, ToolArguments};

const TOOL_CALLS: &str = "tool-calls";

#[derive(Debug, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "toolCalls", default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCall {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub function: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl ToolCall {
    pub fn function_name(&self) -> Option<&str> {
        self.function.as_ref()?.name.as_deref()
    }

    pub fn arguments(self) -> Result<ToolArguments, ArgumentsError> {
        let value = self
            .function
            .and_then(|function| function.arguments)
            .ok_or(ArgumentsError::Missing)?;
        ToolArguments::from_value(value)
    }
}

/// Tool call ids are echoed back as text; numbers keep their digits, `null` becomes empty.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        Some(Value::Bool(id)) => id.to_string(),
        _ => String::new(),
    })
}

/// Failures detected before a tool call id is known.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Invalid message format")]
    InvalidFormat,
    #[error("No tool call found")]
    NoToolCall,
}

impl IntoResponse for EnvelopeError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Validate the event envelope and take the first tool call.
pub fn extract_tool_call(body: &[u8]) -> Result<ToolCall, EnvelopeError> {
    let event: InboundEvent =
        serde_json::from_slice(body).map_err(|_| EnvelopeError::InvalidFormat)?;

    let message = event
        .message
        .filter(|message| message.kind.as_deref() == Some(TOOL_CALLS))
        .ok_or(EnvelopeError::InvalidFormat)?;

    message
        .tool_calls
        .and_then(|calls| calls.into_iter().next())
        .ok_or(EnvelopeError::NoToolCall)
}

/// Failures of a recognised tool call; always answered with a [`ResponseEnvelope`].
#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("Error: {0}")]
    Validation(String),
    #[error("Error: {0}")]
    Configuration(String),
    #[error("{context}: {body}")]
    Remote {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("{context}: {message}")]
    Effect {
        context: &'static str,
        message: String,
    },
}

impl ToolCallError {
    pub fn effect(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Effect {
            context,
            message: err.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Effect { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Remote { status, .. } => *status,
        }
    }
}

impl From<&ToolCallError> for EffectResult {
    fn from(err: &ToolCallError) -> Self {
        EffectResult::failed(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub tool_call_id: String,
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub results: Vec<ToolCallResult>,
}

impl ResponseEnvelope {
    pub fn single(tool_call_id: impl Into<String>, effect: &EffectResult) -> Self {
        Self {
            results: vec![ToolCallResult {
                tool_call_id: tool_call_id.into(),
                result: effect.detail.clone(),
            }],
        }
    }
}

/// Map a dispatch outcome onto the envelope the voice assistant expects.
pub fn respond(tool_call_id: String, outcome: Result<EffectResult, ToolCallError>) -> Response {
    let (status, effect) = match outcome {
        Ok(effect) => (StatusCode::OK, effect),
        Err(err) => (err.status(), EffectResult::from(&err)),
    };

    (status, Json(ResponseEnvelope::single(tool_call_id, &effect))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_json_body() {
        assert_eq!(
            extract_tool_call(b"not json").unwrap_err(),
            EnvelopeError::InvalidFormat
        );
    }

    #[test]
    fn rejects_missing_message_and_wrong_type() {
        assert_eq!(
            extract_tool_call(br#"{}"#).unwrap_err(),
            EnvelopeError::InvalidFormat
        );
        assert_eq!(
            extract_tool_call(br#"{"message":{"type":"status-update","toolCalls":[{"id":"a"}]}}"#)
                .unwrap_err(),
            EnvelopeError::InvalidFormat
        );
    }

    #[test]
    fn rejects_empty_or_absent_tool_calls() {
        assert_eq!(
            extract_tool_call(br#"{"message":{"type":"tool-calls","toolCalls":[]}}"#).unwrap_err(),
            EnvelopeError::NoToolCall
        );
        assert_eq!(
            extract_tool_call(br#"{"message":{"type":"tool-calls"}}"#).unwrap_err(),
            EnvelopeError::NoToolCall
        );
    }

    #[test]
    fn takes_only_the_first_tool_call() {
        let call = extract_tool_call(
            br#"{"message":{"type":"tool-calls","toolCalls":[
                {"id":"first","function":{"name":"createTask","arguments":"{}"}},
                {"id":"second","function":{"arguments":"{}"}}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(call.id, "first");
    }

    #[test]
    fn null_or_numeric_ids_are_accepted_as_text() {
        let call = extract_tool_call(
            br#"{"message":{"type":"tool-calls","toolCalls":[{"id":null,"function":{"arguments":"{}"}}]}}"#,
        )
        .unwrap();
        assert_eq!(call.id, "");

        let call = extract_tool_call(
            br#"{"message":{"type":"tool-calls","toolCalls":[{"id":42,"function":{"arguments":"{}"}}]}}"#,
        )
        .unwrap();
        assert_eq!(call.id, "42");

        let call = extract_tool_call(br#"{"message":{"type":"tool-calls","toolCalls":[{}]}}"#)
            .unwrap();
        assert_eq!(call.id, "");
    }

    #[test]
    fn tool_call_without_arguments_is_an_argument_error() {
        let call = extract_tool_call(br#"{"message":{"type":"tool-calls","toolCalls":[{"id":"x"}]}}"#)
            .unwrap();
        assert!(matches!(call.arguments(), Err(ArgumentsError::Missing)));
    }

    #[test]
    fn error_statuses_follow_taxonomy() {
        assert_eq!(
            ToolCallError::Validation("Name is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ToolCallError::Configuration("missing".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let remote = ToolCallError::Remote {
            context: "Error creating Trello card",
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: "invalid list".into(),
        };
        assert_eq!(remote.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(remote.to_string(), "Error creating Trello card: invalid list");
    }
}
