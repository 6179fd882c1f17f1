pub mod playback;
pub mod session;
pub mod tts;

// Re-export commonly used types for convenience
pub use playback::{
    AudioFormat, AudioOutput, OutputSink, PlaybackEngine, PlaybackError, PlaybackOutcome,
    PlaybackResult,
};
pub use session::SynthesisSession;
pub use tts::{
    AudioStream, ElevenLabsClient, ElevenLabsConfig, SynthesisError, SynthesisErrorKind,
    SynthesisRequest, SynthesisResult, Synthesizer, VoiceSettings,
};
