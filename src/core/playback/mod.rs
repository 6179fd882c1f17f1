//! Streaming MP3 playback.
//!
//! [`PlaybackEngine::play`] decodes an [`AudioStream`](crate::core::tts::AudioStream)
//! incrementally on a blocking worker and pushes PCM to an [`OutputSink`]
//! obtained from an [`AudioOutput`]. A run ends in exactly one of three ways:
//! the stream is exhausted, the run is cancelled, or decoding/output fails.
//! The first of these to be reported wins.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use waav_speak::core::playback::{CpalOutput, PlaybackEngine};
//!
//! let engine = PlaybackEngine::new(Arc::new(CpalOutput::new()));
//! let outcome = engine.play(stream, &CancellationToken::new()).await?;
//! ```

mod base;
mod completion;
#[cfg(feature = "cpal-output")]
mod cpal_output;
mod decoder;
mod engine;

pub use base::{
    AudioFormat, AudioOutput, OutputSink, PlaybackError, PlaybackOutcome, PlaybackResult,
};
pub use completion::Completion;
#[cfg(feature = "cpal-output")]
pub use cpal_output::CpalOutput;
pub use decoder::Mp3Decoder;
pub use engine::PlaybackEngine;
