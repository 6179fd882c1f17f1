//! Base traits and types for streaming speech synthesis.
//!
//! A [`Synthesizer`] turns a [`SynthesisRequest`] into an open [`AudioStream`]
//! or a classified [`SynthesisError`]. Implementations perform exactly one
//! request per call and never retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stream::AudioStream;
use crate::config::PluginSettings;

// =============================================================================
// Constants
// =============================================================================

/// Model used when the request does not name one.
pub const DEFAULT_MODEL_ID: &str = "eleven_turbo_v2_5";

/// Default voice stability.
pub const DEFAULT_STABILITY: f32 = 0.5;

/// Default similarity boost.
pub const DEFAULT_SIMILARITY_BOOST: f32 = 0.75;

/// Maximum characters accepted in a single request.
pub const MAX_TEXT_LENGTH: usize = 5000;

// =============================================================================
// Error Types
// =============================================================================

/// Discriminant of a [`SynthesisError`], useful for matching without the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthesisErrorKind {
    InvalidRequest,
    Unauthorized,
    NotFound,
    Timeout,
    Transport,
    Api,
}

/// Errors produced by a synthesis call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    /// Missing or blank configuration or text; fixable by the caller
    #[error("{0}")]
    InvalidRequest(String),

    /// The API key was rejected (HTTP 401)
    #[error("{0}")]
    Unauthorized(String),

    /// The voice id does not exist (HTTP 404)
    #[error("{0}")]
    NotFound(String),

    /// The server did not answer within the request timeout
    #[error("{0}")]
    Timeout(String),

    /// DNS, connect, TLS or connection reset failures
    #[error("{0}")]
    Transport(String),

    /// Any other non-success HTTP status
    #[error("{message}")]
    Api { status: u16, message: String },
}

impl SynthesisError {
    pub fn kind(&self) -> SynthesisErrorKind {
        match self {
            Self::InvalidRequest(_) => SynthesisErrorKind::InvalidRequest,
            Self::Unauthorized(_) => SynthesisErrorKind::Unauthorized,
            Self::NotFound(_) => SynthesisErrorKind::NotFound,
            Self::Timeout(_) => SynthesisErrorKind::Timeout,
            Self::Transport(_) => SynthesisErrorKind::Transport,
            Self::Api { .. } => SynthesisErrorKind::Api,
        }
    }

    /// Human readable message suitable for display.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest(m)
            | Self::Unauthorized(m)
            | Self::NotFound(m)
            | Self::Timeout(m)
            | Self::Transport(m) => m,
            Self::Api { message, .. } => message,
        }
    }

    /// HTTP status associated with the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for synthesis operations.
pub type SynthesisResult<T> = Result<T, SynthesisError>;

// =============================================================================
// Request Types
// =============================================================================

/// Voice tuning parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Lower values are more expressive, higher values more monotone (0.0-1.0)
    pub stability: f32,
    /// How closely the output should match the original voice (0.0-1.0)
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: DEFAULT_STABILITY,
            similarity_boost: DEFAULT_SIMILARITY_BOOST,
        }
    }
}

impl VoiceSettings {
    pub fn new(stability: f32, similarity_boost: f32) -> Self {
        Self {
            stability,
            similarity_boost,
        }
    }

    /// Both values must lie in `[0, 1]`.
    pub fn validate(&self) -> SynthesisResult<()> {
        if !(0.0..=1.0).contains(&self.stability) {
            return Err(SynthesisError::InvalidRequest(format!(
                "stability must be between 0 and 1 (got {})",
                self.stability
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_boost) {
            return Err(SynthesisError::InvalidRequest(format!(
                "similarity boost must be between 0 and 1 (got {})",
                self.similarity_boost
            )));
        }
        Ok(())
    }
}

/// One text-to-speech call.
///
/// The voice id normally comes from [`PluginSettings`]; `voice_id` overrides it
/// for this request only.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: Option<String>,
    pub model_id: String,
    pub voice_settings: VoiceSettings,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            voice_settings: VoiceSettings::default(),
        }
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_voice_settings(mut self, voice_settings: VoiceSettings) -> Self {
        self.voice_settings = voice_settings;
        self
    }

    /// Voice id that will actually be used for this request.
    pub fn effective_voice_id<'a>(&'a self, settings: &'a PluginSettings) -> &'a str {
        self.voice_id.as_deref().unwrap_or(&settings.voice_id).trim()
    }

    /// Checks the request against the settings before any network activity.
    ///
    /// Order matters: the API key is reported first, then the voice id, then
    /// the text.
    pub fn validate(&self, settings: &PluginSettings) -> SynthesisResult<()> {
        if settings.api_key.trim().is_empty() {
            return Err(SynthesisError::InvalidRequest(
                "API key not configured".to_string(),
            ));
        }
        if self.effective_voice_id(settings).is_empty() {
            return Err(SynthesisError::InvalidRequest(
                "voice id not configured".to_string(),
            ));
        }
        if self.text.trim().is_empty() {
            return Err(SynthesisError::InvalidRequest("text is empty".to_string()));
        }
        if self.text.chars().count() > MAX_TEXT_LENGTH {
            return Err(SynthesisError::InvalidRequest(format!(
                "text exceeds maximum length of {MAX_TEXT_LENGTH} characters"
            )));
        }
        if self.model_id.trim().is_empty() {
            return Err(SynthesisError::InvalidRequest("model id is empty".to_string()));
        }
        self.voice_settings.validate()
    }
}

// =============================================================================
// Synthesizer Trait
// =============================================================================

/// A remote speech synthesis backend.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Issue one streaming synthesis request.
    ///
    /// On success the caller owns the returned stream and is responsible for
    /// closing (or dropping) it.
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        settings: &PluginSettings,
    ) -> SynthesisResult<AudioStream>;
}
