//! Speech session: synthesize text and play it, newest request first.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PluginSettings;
use crate::core::playback::{PlaybackEngine, PlaybackOutcome};
use crate::core::tts::{SynthesisRequest, Synthesizer, VoiceSettings};
use crate::errors::{SpeakError, SpeakResult};

struct ActiveSpeech {
    id: u64,
    cancel: CancellationToken,
}

/// Orchestrates synthesis and playback for a host.
///
/// Each [`SynthesisSession::speak_text`] call preempts the one before it: the
/// previous request is cancelled and its playback fully released before the
/// new request starts.
pub struct SynthesisSession {
    synthesizer: Arc<dyn Synthesizer>,
    engine: Arc<PlaybackEngine>,
    settings: RwLock<PluginSettings>,
    model_id: Option<String>,
    voice_settings: VoiceSettings,
    active: Mutex<Option<ActiveSpeech>>,
    next_id: AtomicU64,
}

impl SynthesisSession {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        engine: Arc<PlaybackEngine>,
        settings: PluginSettings,
    ) -> Self {
        Self {
            synthesizer,
            engine,
            settings: RwLock::new(settings),
            model_id: None,
            voice_settings: VoiceSettings::default(),
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Model used for every request; the request default otherwise.
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_voice_settings(mut self, voice_settings: VoiceSettings) -> Self {
        self.voice_settings = voice_settings;
        self
    }

    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    /// A copy of the settings used for new requests.
    pub fn settings(&self) -> PluginSettings {
        self.settings.read().clone()
    }

    /// Replaces the settings. Requests already in flight keep their snapshot.
    pub fn update_settings(&self, settings: PluginSettings) {
        info!(voice_id = %settings.voice_id, "Speech settings updated");
        *self.settings.write() = settings;
    }

    /// Whether a request is synthesizing or playing.
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Cancels the current request, if any. Safe to call at any time.
    pub fn stop(&self) {
        if let Some(active) = self.active.lock().as_ref() {
            debug!(request = active.id, "Stopping speech");
            active.cancel.cancel();
        }
        self.engine.stop();
    }

    /// Synthesizes `text` and plays it to the end.
    ///
    /// Returns [`PlaybackOutcome::Cancelled`] if a newer request or
    /// [`SynthesisSession::stop`] preempted this one.
    pub async fn speak_text(&self, text: &str) -> SpeakResult<PlaybackOutcome> {
        let (id, cancel) = self.begin();
        let _guard = ActiveGuard { session: self, id };

        // The previous request was cancelled in `begin`; wait until its
        // device is released.
        self.engine.wait_idle().await;
        if cancel.is_cancelled() {
            return Ok(PlaybackOutcome::Cancelled);
        }

        let settings = self.settings();
        let mut request = SynthesisRequest::new(text).with_voice_settings(self.voice_settings);
        if let Some(model_id) = &self.model_id {
            request = request.with_model(model_id.clone());
        }

        info!(request = id, text_len = text.len(), "Speaking text");
        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(request = id, "Speech cancelled during synthesis");
                return Ok(PlaybackOutcome::Cancelled);
            }
            result = self.synthesizer.synthesize(&request, &settings) => {
                result.map_err(SpeakError::from)?
            }
        };

        let outcome = self.engine.play(stream, &cancel).await?;
        info!(request = id, outcome = ?outcome, "Speech finished");
        Ok(outcome)
    }

    /// Registers a new request and cancels the one it replaces.
    fn begin(&self) -> (u64, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        let previous = self.active.lock().replace(ActiveSpeech {
            id,
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            debug!(request = id, previous = previous.id, "Preempting previous speech");
            previous.cancel.cancel();
        }
        (id, cancel)
    }
}

/// Clears the active slot on every exit path, unless a newer request owns it.
struct ActiveGuard<'a> {
    session: &'a SynthesisSession,
    id: u64,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.session.active.lock();
        if active.as_ref().is_some_and(|a| a.id == self.id) {
            active.take();
        }
    }
}
