//! Base traits and types for audio playback.

use std::fmt;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while playing a stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// The stream is not valid MPEG audio, or its header is truncated
    #[error("Audio decode failed: {0}")]
    Decode(String),

    /// The output device is unavailable, busy, or failed mid-stream
    #[error("Audio device error: {0}")]
    Device(String),
}

impl PlaybackError {
    pub fn message(&self) -> &str {
        match self {
            Self::Decode(m) | Self::Device(m) => m,
        }
    }
}

/// Result type for playback operations.
pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Terminal state of a playback run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackOutcome {
    /// The stream was played to the end
    Completed,
    /// Playback was stopped before the end of the stream
    Cancelled,
}

impl PlaybackOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// =============================================================================
// Audio Format
// =============================================================================

/// PCM layout produced by the decoder: interleaved signed 16-bit samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Interleaved samples per second of audio.
    pub const fn samples_per_second(&self) -> usize {
        self.sample_rate as usize * self.channels as usize
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz, {} channel(s)", self.sample_rate, self.channels)
    }
}

// =============================================================================
// Output Device Traits
// =============================================================================

/// Factory for exclusive handles to an audio output device.
pub trait AudioOutput: Send + Sync {
    /// Acquire the device for `format`.
    ///
    /// Called on a blocking worker thread. The returned sink holds the device
    /// until it is dropped.
    fn open(&self, format: AudioFormat) -> PlaybackResult<Box<dyn OutputSink>>;
}

/// An acquired output device.
///
/// Sinks are used and dropped on the thread that opened them. Dropping the
/// sink releases the device.
pub trait OutputSink {
    /// Queue interleaved samples; may block for backpressure.
    ///
    /// Must return promptly once `cancel` fires, possibly without queuing
    /// everything.
    fn write(&mut self, samples: &[i16], cancel: &CancellationToken) -> PlaybackResult<()>;

    /// Block until everything queued has been rendered, or `cancel` fires.
    fn drain(&mut self, cancel: &CancellationToken) -> PlaybackResult<()>;

    /// Stop output immediately, discarding queued samples.
    fn stop(&mut self);
}
