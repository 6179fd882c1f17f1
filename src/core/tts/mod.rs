mod base;
pub mod elevenlabs;
mod stream;

pub use base::{
    DEFAULT_MODEL_ID, DEFAULT_SIMILARITY_BOOST, DEFAULT_STABILITY, MAX_TEXT_LENGTH,
    SynthesisError, SynthesisErrorKind, SynthesisRequest, SynthesisResult, Synthesizer,
    VoiceSettings,
};
pub use elevenlabs::{ELEVENLABS_API_BASE_URL, ElevenLabsClient, ElevenLabsConfig};
pub use stream::{AudioReader, AudioStream, ByteStream};
