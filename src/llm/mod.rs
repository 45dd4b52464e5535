pub mod chat;

use crate::history::Transcript;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::error::Error as StdError;

/// Conversational payload for the inference provider. Built fresh for every call
/// and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferenceRequest {
    pub inputs: ConversationInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationInputs {
    pub past_user_inputs: Vec<String>,
    pub generated_responses: Vec<String>,
    pub text: String,
}

impl InferenceRequest {
    /// `transcript` must be the history *before* the new user turn is appended.
    pub fn from_transcript(transcript: &Transcript, text: &str) -> Self {
        Self {
            inputs: ConversationInputs {
                past_user_inputs: transcript.past_user_inputs(),
                generated_responses: transcript.generated_responses(),
                text: text.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    /// Network failure, timeout, non-success status or an unparseable body.
    #[error("{0}")]
    Transport(String),
    /// Success status, but the body carries no usable `generated_text`.
    #[error("unrecognized response shape")]
    UnrecognizedShape,
}

impl InferenceError {
    pub fn transport(err: &(dyn StdError + 'static)) -> Self {
        InferenceError::Transport(describe_error(err))
    }
}

/// Joins an error with its source chain, e.g. `error sending request: operation timed out`.
pub fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let mut description = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !description.contains(&cause_text) {
            description.push_str(": ");
            description.push_str(&cause_text);
        }
        source = cause.source();
    }
    description
}

/// Pulls the reply out of a provider body: either `{"generated_text": ...}` or
/// `[{"generated_text": ...}, ...]`.
pub fn extract_generated_text(body: &JsonValue) -> Result<String, InferenceError> {
    let candidate = match body {
        JsonValue::Object(map) => map.get("generated_text"),
        JsonValue::Array(items) => items.first().and_then(|first| first.get("generated_text")),
        _ => None,
    };
    match candidate {
        Some(JsonValue::String(text)) if !text.is_empty() => Ok(text.clone()),
        _ => Err(InferenceError::UnrecognizedShape),
    }
}
