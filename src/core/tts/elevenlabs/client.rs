//! ElevenLabs streaming synthesis client.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

use super::config::ElevenLabsConfig;
use super::messages::{StreamRequestBody, classify_api_error};
use super::{API_KEY_HEADER, AUDIO_MPEG};
use crate::config::PluginSettings;
use crate::core::tts::base::{SynthesisError, SynthesisRequest, SynthesisResult, Synthesizer};
use crate::core::tts::stream::AudioStream;

const TIMEOUT_MESSAGE: &str = "server response timed out";

/// Streaming client for the ElevenLabs text-to-speech endpoint.
///
/// The underlying `reqwest::Client` is shared across calls. Authentication
/// headers are attached per request, never as client defaults.
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    http: reqwest::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsClient {
    /// Creates a client. Fails only if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: ElevenLabsConfig) -> SynthesisResult<Self> {
        config.parsed_base_url()?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| SynthesisError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }

    /// Builds the HTTP request without sending it.
    ///
    /// An API key that cannot travel in a header (control or non-ASCII
    /// characters) is an [`SynthesisError::InvalidRequest`].
    pub fn build_request(
        &self,
        request: &SynthesisRequest,
        settings: &PluginSettings,
    ) -> SynthesisResult<reqwest::RequestBuilder> {
        let url = self.config.stream_url(request.effective_voice_id(settings))?;

        let mut api_key = HeaderValue::from_str(settings.api_key.trim()).map_err(|_| {
            SynthesisError::InvalidRequest("API key contains invalid characters".to_string())
        })?;
        api_key.set_sensitive(true);

        Ok(self
            .http
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .header(ACCEPT, AUDIO_MPEG)
            .header(CONTENT_TYPE, "application/json")
            .json(&StreamRequestBody::from(request)))
    }

    fn transport_error(e: reqwest::Error) -> SynthesisError {
        if e.is_timeout() {
            SynthesisError::Timeout(TIMEOUT_MESSAGE.to_string())
        } else {
            SynthesisError::Transport(format!("error contacting ElevenLabs API: {e}"))
        }
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsClient {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        settings: &PluginSettings,
    ) -> SynthesisResult<AudioStream> {
        request.validate(settings)?;

        let voice_id = request.effective_voice_id(settings);
        let builder = self.build_request(request, settings)?;
        let deadline = Instant::now() + self.config.request_timeout;

        info!(
            voice_id = %voice_id,
            model_id = %request.model_id,
            text_len = request.text.len(),
            "Requesting ElevenLabs speech stream"
        );

        let response = match timeout_at(deadline, builder.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(voice_id = %voice_id, error = %e, "ElevenLabs request failed");
                return Err(Self::transport_error(e));
            }
            Err(_) => {
                warn!(voice_id = %voice_id, "ElevenLabs request timed out");
                return Err(SynthesisError::Timeout(TIMEOUT_MESSAGE.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = match timeout_at(deadline, response.text()).await {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => {
                    debug!(error = %e, "Failed to read ElevenLabs error body");
                    String::new()
                }
                Err(_) => String::new(),
            };
            let err = classify_api_error(status, &body);
            error!(
                voice_id = %voice_id,
                status = %status,
                message = %err.message(),
                "ElevenLabs API returned error"
            );
            return Err(err);
        }

        let stream = AudioStream::from_response(response);
        debug!(
            voice_id = %voice_id,
            content_type = stream.content_type().unwrap_or("unknown"),
            "ElevenLabs speech stream opened"
        );
        Ok(stream)
    }
}
