//! System audio output through `cpal`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::base::{AudioFormat, AudioOutput, OutputSink, PlaybackError, PlaybackResult};

/// How often blocked writes and drains re-check their state.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Queue depth, in seconds of audio, above which writes block.
const MAX_QUEUED_SECONDS: usize = 1;

/// Time given to the hardware to play out its last buffer after draining.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Opens the host's default output device.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalOutput;

impl CpalOutput {
    pub fn new() -> Self {
        Self
    }
}

struct Shared {
    queue: Mutex<VecDeque<i16>>,
    fault: Mutex<Option<String>>,
}

impl AudioOutput for CpalOutput {
    fn open(&self, format: AudioFormat) -> PlaybackResult<Box<dyn OutputSink>> {
        // Use WASAPI explicitly on Windows for better compatibility
        #[cfg(target_os = "windows")]
        let host = cpal::host_from_id(cpal::HostId::Wasapi).unwrap_or(cpal::default_host());
        #[cfg(not(target_os = "windows"))]
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| PlaybackError::Device("no audio output device available".to_string()))?;

        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::with_capacity(format.samples_per_second())),
            fault: Mutex::new(None),
        });

        // Try f32 first (most widely supported), then fall back to i16.
        let stream = match build_f32_stream(&device, &config, shared.clone()) {
            Ok(stream) => stream,
            Err(e) => {
                debug!(error = %e, "f32 output stream unavailable, trying i16");
                build_i16_stream(&device, &config, shared.clone()).map_err(|e2| {
                    PlaybackError::Device(format!("failed to open output stream for {format}: {e2}"))
                })?
            }
        };
        stream
            .play()
            .map_err(|e| PlaybackError::Device(format!("failed to start output stream: {e}")))?;

        info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            format = %format,
            "Audio output opened"
        );

        Ok(Box::new(CpalSink {
            stream,
            shared,
            max_queued: format.samples_per_second() * MAX_QUEUED_SECONDS,
        }))
    }
}

fn build_f32_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: Arc<Shared>,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    let fault = shared.clone();
    device.build_output_stream(
        config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let mut queue = shared.queue.lock();
            for sample in data.iter_mut() {
                *sample = queue.pop_front().map_or(0.0, |s| s as f32 / 32768.0);
            }
        },
        move |err| {
            error!(error = %err, "Audio output stream error");
            *fault.fault.lock() = Some(err.to_string());
        },
        None,
    )
}

fn build_i16_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: Arc<Shared>,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    let fault = shared.clone();
    device.build_output_stream(
        config,
        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
            let mut queue = shared.queue.lock();
            for sample in data.iter_mut() {
                *sample = queue.pop_front().unwrap_or(0);
            }
        },
        move |err| {
            error!(error = %err, "Audio output stream error");
            *fault.fault.lock() = Some(err.to_string());
        },
        None,
    )
}

struct CpalSink {
    stream: cpal::Stream,
    shared: Arc<Shared>,
    max_queued: usize,
}

impl CpalSink {
    fn check_fault(&self) -> PlaybackResult<()> {
        match self.shared.fault.lock().take() {
            Some(message) => Err(PlaybackError::Device(message)),
            None => Ok(()),
        }
    }

    fn queued(&self) -> usize {
        self.shared.queue.lock().len()
    }
}

impl OutputSink for CpalSink {
    fn write(&mut self, samples: &[i16], cancel: &CancellationToken) -> PlaybackResult<()> {
        while self.queued() >= self.max_queued {
            if cancel.is_cancelled() {
                return Ok(());
            }
            self.check_fault()?;
            std::thread::sleep(POLL_INTERVAL);
        }
        self.check_fault()?;
        self.shared.queue.lock().extend(samples.iter().copied());
        Ok(())
    }

    fn drain(&mut self, cancel: &CancellationToken) -> PlaybackResult<()> {
        while self.queued() > 0 {
            if cancel.is_cancelled() {
                return Ok(());
            }
            self.check_fault()?;
            std::thread::sleep(POLL_INTERVAL);
        }
        std::thread::sleep(DRAIN_GRACE);
        self.check_fault()
    }

    fn stop(&mut self) {
        if let Err(e) = self.stream.pause() {
            debug!(error = %e, "Failed to pause output stream");
        }
        self.shared.queue.lock().clear();
    }
}
