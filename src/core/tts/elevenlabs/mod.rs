//! ElevenLabs streaming TTS client.
//!
//! # API Reference
//!
//! - Streaming synthesis: `POST https://api.elevenlabs.io/v1/text-to-speech/{voice_id}/stream`
//! - Authentication: `xi-api-key` header
//! - Output: MPEG audio (`Accept: audio/mpeg`)
//!
//! # Example
//!
//! ```rust,ignore
//! use waav_speak::config::PluginSettings;
//! use waav_speak::core::tts::{ElevenLabsClient, ElevenLabsConfig, SynthesisRequest, Synthesizer};
//!
//! let client = ElevenLabsClient::new(ElevenLabsConfig::default())?;
//! let settings = PluginSettings::default().with_api_key("your-api-key");
//! let stream = client.synthesize(&SynthesisRequest::new("Hello, world!"), &settings).await?;
//! ```

pub mod client;
pub mod config;
pub mod messages;

pub use client::ElevenLabsClient;
pub use config::ElevenLabsConfig;
pub use messages::{ApiErrorEnvelope, ErrorDetail, StreamRequestBody};

// =============================================================================
// API Constants
// =============================================================================

/// Base URL of the public ElevenLabs API.
pub const ELEVENLABS_API_BASE_URL: &str = "https://api.elevenlabs.io";

/// Authentication header name.
pub const API_KEY_HEADER: &str = "xi-api-key";

/// Content type requested from the streaming endpoint.
pub const AUDIO_MPEG: &str = "audio/mpeg";

/// Default overall request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
