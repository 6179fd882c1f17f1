//! ElevenLabs client configuration.

use std::time::Duration;

use url::Url;

use super::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, ELEVENLABS_API_BASE_URL,
};
use crate::core::tts::base::{SynthesisError, SynthesisResult};

/// Transport-level options for [`super::ElevenLabsClient`].
///
/// Credentials and voice selection live in
/// [`PluginSettings`](crate::config::PluginSettings); this holds only what is
/// fixed for the lifetime of the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevenLabsConfig {
    /// API root, e.g. `https://api.elevenlabs.io`
    pub base_url: String,
    /// Bound on connecting, sending and receiving response headers
    pub request_timeout: Duration,
    /// Bound on establishing the TCP/TLS connection
    pub connect_timeout: Duration,
    /// Optional `output_format` query parameter (e.g. `mp3_44100_128`)
    pub output_format: Option<String>,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            base_url: ELEVENLABS_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            output_format: None,
        }
    }
}

impl ElevenLabsConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    /// Parsed base URL. Only `http` and `https` are accepted.
    pub fn parsed_base_url(&self) -> SynthesisResult<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            SynthesisError::InvalidRequest(format!("invalid base URL '{}': {e}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(SynthesisError::InvalidRequest(format!(
                "unsupported URL scheme '{other}'"
            ))),
        }
    }

    /// Streaming endpoint for `voice_id`, with the voice id encoded as a path segment.
    pub fn stream_url(&self, voice_id: &str) -> SynthesisResult<Url> {
        let mut url = self.parsed_base_url()?;
        url.path_segments_mut()
            .map_err(|_| {
                SynthesisError::InvalidRequest(format!(
                    "base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["v1", "text-to-speech", voice_id, "stream"]);

        if let Some(format) = self.output_format.as_deref().filter(|f| !f.trim().is_empty()) {
            url.query_pairs_mut().append_pair("output_format", format);
        }
        Ok(url)
    }
}
