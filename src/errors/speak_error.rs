use thiserror::Error;

use crate::core::playback::PlaybackError;
use crate::core::tts::SynthesisError;

/// Failure of a full speak request, as surfaced to the host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeakError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl SpeakError {
    /// Message suitable for an error dialog.
    pub fn user_message(&self) -> String {
        match self {
            Self::Synthesis(e) => e.message().to_string(),
            Self::Playback(e) => format!("Failed to play audio: {}", e.message()),
        }
    }
}

pub type SpeakResult<T> = Result<T, SpeakError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_and_messages() {
        let err: SpeakError = SynthesisError::InvalidRequest("text is empty".to_string()).into();
        assert_eq!(err.to_string(), "text is empty");
        assert_eq!(err.user_message(), "text is empty");

        let err: SpeakError = PlaybackError::Device("busy".to_string()).into();
        assert_eq!(err.to_string(), "Audio device error: busy");
        assert_eq!(err.user_message(), "Failed to play audio: busy");
    }
}
