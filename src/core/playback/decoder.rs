//! Incremental MPEG audio decoder.

use std::io::Read;

use tracing::{debug, warn};

use super::base::{AudioFormat, PlaybackError, PlaybackResult};

/// Pulls MP3 frames from a byte source and hands out interleaved PCM.
///
/// The format is fixed by the first frame; later frames that disagree are
/// passed through unchanged and logged once.
pub struct Mp3Decoder<R: Read> {
    inner: minimp3::Decoder<R>,
    format: AudioFormat,
    pending: Option<Vec<i16>>,
    frames: u64,
    format_drift_logged: bool,
}

impl<R: Read> Mp3Decoder<R> {
    /// Reads up to the first audio frame to learn the stream format.
    ///
    /// A stream that ends before a complete frame, or whose bytes are not
    /// MPEG audio, is a [`PlaybackError::Decode`].
    pub fn open(reader: R) -> PlaybackResult<Self> {
        let mut inner = minimp3::Decoder::new(reader);
        let frame = loop {
            match inner.next_frame() {
                Ok(frame) => break frame,
                Err(minimp3::Error::SkippedData) | Err(minimp3::Error::InsufficientData) => {
                    continue;
                }
                Err(minimp3::Error::Eof) => {
                    return Err(PlaybackError::Decode(
                        "stream ended before the first audio frame".to_string(),
                    ));
                }
                Err(minimp3::Error::Io(e)) => {
                    return Err(PlaybackError::Decode(format!(
                        "failed to read audio header: {e}"
                    )));
                }
            }
        };

        let format = frame_format(frame.sample_rate, frame.channels)?;
        debug!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            bitrate = frame.bitrate,
            "MP3 stream opened"
        );

        Ok(Self {
            inner,
            format,
            pending: Some(frame.data),
            frames: 1,
            format_drift_logged: false,
        })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Frames decoded so far, including the one read by [`Mp3Decoder::open`].
    pub fn frames_decoded(&self) -> u64 {
        self.frames
    }

    /// Next block of interleaved samples, `None` once the source is exhausted.
    pub fn next_samples(&mut self) -> PlaybackResult<Option<Vec<i16>>> {
        if let Some(samples) = self.pending.take() {
            return Ok(Some(samples));
        }

        loop {
            match self.inner.next_frame() {
                Ok(frame) => {
                    self.frames += 1;
                    if !self.format_drift_logged
                        && (frame.sample_rate as u32 != self.format.sample_rate
                            || frame.channels as u16 != self.format.channels)
                    {
                        warn!(
                            sample_rate = frame.sample_rate,
                            channels = frame.channels,
                            "MP3 frame format differs from stream format"
                        );
                        self.format_drift_logged = true;
                    }
                    return Ok(Some(frame.data));
                }
                Err(minimp3::Error::SkippedData) | Err(minimp3::Error::InsufficientData) => {
                    continue;
                }
                Err(minimp3::Error::Eof) => return Ok(None),
                Err(minimp3::Error::Io(e)) => {
                    return Err(PlaybackError::Decode(format!("failed to read audio: {e}")));
                }
            }
        }
    }
}

fn frame_format(sample_rate: i32, channels: usize) -> PlaybackResult<AudioFormat> {
    let sample_rate = u32::try_from(sample_rate)
        .ok()
        .filter(|rate| *rate > 0)
        .ok_or_else(|| PlaybackError::Decode(format!("invalid sample rate {sample_rate}")))?;
    let channels = u16::try_from(channels)
        .ok()
        .filter(|c| (1..=2).contains(c))
        .ok_or_else(|| PlaybackError::Decode(format!("invalid channel count {channels}")))?;
    Ok(AudioFormat::new(sample_rate, channels))
}
