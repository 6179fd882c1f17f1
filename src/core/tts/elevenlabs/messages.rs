//! ElevenLabs wire types: the request body and the error envelope.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::core::tts::base::{SynthesisError, SynthesisRequest, VoiceSettings};

// =============================================================================
// Request Body
// =============================================================================

/// JSON body of a streaming synthesis request.
#[derive(Debug, Clone, Serialize)]
pub struct StreamRequestBody<'a> {
    pub text: &'a str,
    pub model_id: &'a str,
    pub voice_settings: VoiceSettings,
}

impl<'a> From<&'a SynthesisRequest> for StreamRequestBody<'a> {
    fn from(request: &'a SynthesisRequest) -> Self {
        Self {
            text: &request.text,
            model_id: &request.model_id,
            voice_settings: request.voice_settings,
        }
    }
}

// =============================================================================
// API Error Response
// =============================================================================

/// Error envelope returned on non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    #[serde(default)]
    pub detail: Option<ErrorDetail>,
}

/// The `detail` field comes in several shapes depending on the failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    /// `"detail": "message"`
    Text(String),
    /// `"detail": {"status": "...", "message": "..."}`
    Object {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    /// `"detail": [{"loc": [...], "msg": "...", "type": "..."}]` (validation errors)
    Validation(Vec<ValidationIssue>),
    /// Anything else
    Other(serde_json::Value),
}

/// One entry of a validation error list.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub msg: Option<String>,
}

impl ErrorDetail {
    /// The human readable message, if this shape carries a non-blank one.
    pub fn message(&self) -> Option<&str> {
        let message = match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Object { message, .. } => message.as_deref(),
            Self::Validation(issues) => issues.iter().find_map(|i| i.msg.as_deref()),
            Self::Other(_) => None,
        };
        message.map(str::trim).filter(|m| !m.is_empty())
    }
}

impl ApiErrorEnvelope {
    /// Extracts the message from a raw error body; `None` on any shape mismatch.
    pub fn parse_message(body: &str) -> Option<String> {
        let envelope: ApiErrorEnvelope = serde_json::from_str(body).ok()?;
        envelope.detail?.message().map(str::to_string)
    }
}

/// Message used when the error body carries nothing usable.
pub fn default_error_message(status: StatusCode, body: &str) -> String {
    match status {
        StatusCode::UNAUTHORIZED => "invalid API key".to_string(),
        StatusCode::NOT_FOUND => "voice id not found".to_string(),
        _ if body.trim().is_empty() => format!("API error: {status}"),
        _ => format!("API error: {status} - {}", body.trim()),
    }
}

/// Maps a non-success response to a [`SynthesisError`].
pub fn classify_api_error(status: StatusCode, body: &str) -> SynthesisError {
    let message = ApiErrorEnvelope::parse_message(body)
        .unwrap_or_else(|| default_error_message(status, body));

    match status {
        StatusCode::UNAUTHORIZED => SynthesisError::Unauthorized(message),
        StatusCode::NOT_FOUND => SynthesisError::NotFound(message),
        _ => SynthesisError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
