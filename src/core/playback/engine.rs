//! Playback engine: decode an [`AudioStream`] and drive an output device.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::base::{AudioOutput, OutputSink, PlaybackError, PlaybackOutcome, PlaybackResult};
use super::completion::Completion;
use super::decoder::Mp3Decoder;
use crate::core::tts::{AudioReader, AudioStream};

type RunResult = PlaybackResult<PlaybackOutcome>;

/// Permit to use the output device. Owned by the blocking worker, so it is
/// released only after the sink and decoder are dropped.
type DevicePermit = OwnedMutexGuard<()>;

struct ActiveRun {
    id: u64,
    cancel: CancellationToken,
}

/// Plays MPEG audio streams on an [`AudioOutput`], one at a time.
///
/// Runs are serialized by an async mutex standing for the device: a run holds
/// it from before the device is opened until after the device and decoder are
/// dropped, even if the caller stops polling [`PlaybackEngine::play`].
pub struct PlaybackEngine {
    output: Arc<dyn AudioOutput>,
    device: Arc<tokio::sync::Mutex<()>>,
    active: Mutex<Option<ActiveRun>>,
    next_run: AtomicU64,
}

impl PlaybackEngine {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            device: Arc::new(tokio::sync::Mutex::new(())),
            active: Mutex::new(None),
            next_run: AtomicU64::new(1),
        }
    }

    /// Plays `stream` until it ends, `cancel` fires, or [`PlaybackEngine::stop`]
    /// is called.
    ///
    /// Waits for any previous run to release the device first. The stream is
    /// consumed; it is closed when this returns.
    ///
    /// Dropping the returned future cancels the run. The device stays held
    /// until the worker has released it.
    pub async fn play(&self, stream: AudioStream, cancel: &CancellationToken) -> RunResult {
        let permit = self.device.clone().lock_owned().await;
        if cancel.is_cancelled() {
            debug!("Playback cancelled before start");
            return Ok(PlaybackOutcome::Cancelled);
        }

        let id = self.next_run.fetch_add(1, Ordering::Relaxed);
        let run = cancel.child_token();
        *self.active.lock() = Some(ActiveRun {
            id,
            cancel: run.clone(),
        });
        let _guard = RunGuard {
            engine: self,
            id,
            run: run.clone(),
        };

        let result = self.run(stream, run, permit).await;
        match &result {
            Ok(outcome) => info!(outcome = ?outcome, "Playback finished"),
            Err(e) => warn!(error = %e, "Playback failed"),
        }
        result
    }

    async fn run(&self, stream: AudioStream, run: CancellationToken, permit: DevicePermit) -> RunResult {
        let (completion, mut done) = Completion::new();
        let reader = stream
            .into_blocking_reader(run.clone(), Handle::current())
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;

        let worker = {
            let output = self.output.clone();
            let completion = completion.clone();
            let run = run.clone();
            tokio::task::spawn_blocking(move || {
                let result = catch_unwind(AssertUnwindSafe(|| play_blocking(reader, &*output, &run)))
                    .unwrap_or_else(|_| {
                        Err(PlaybackError::Device("playback worker panicked".to_string()))
                    });
                completion.complete(result);
                drop(permit);
            })
        };

        let reported = tokio::select! {
            reported = &mut done => reported,
            _ = run.cancelled() => {
                if completion.complete(Ok(PlaybackOutcome::Cancelled)) {
                    debug!("Playback cancellation reported before worker finished");
                }
                done.await
            }
        };

        // The device and decoder live on the worker; wait for them to drop.
        if let Err(e) = worker.await {
            warn!(error = %e, "Playback worker did not shut down cleanly");
        }

        reported.unwrap_or_else(|_| {
            Err(PlaybackError::Device(
                "playback worker exited without reporting".to_string(),
            ))
        })
    }

    /// Stops the current run, if any. Safe to call from any thread at any time.
    pub fn stop(&self) {
        if let Some(active) = self.active.lock().as_ref() {
            debug!(run = active.id, "Stopping playback");
            active.cancel.cancel();
        }
    }

    /// Whether a run holds the device, including one still shutting down.
    pub fn is_playing(&self) -> bool {
        self.device.try_lock().is_err()
    }

    /// Resolves once no run holds the device.
    pub async fn wait_idle(&self) {
        drop(self.device.lock().await);
    }
}

/// Cancels the run and clears the active slot on every exit from `play`,
/// including when its future is dropped.
struct RunGuard<'a> {
    engine: &'a PlaybackEngine,
    id: u64,
    run: CancellationToken,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.run.cancel();
        let mut active = self.engine.active.lock();
        if active.as_ref().is_some_and(|a| a.id == self.id) {
            active.take();
        }
    }
}

/// Decode-and-output loop, run on a blocking thread.
///
/// Anything that fails after cancellation is reported as cancelled.
fn play_blocking(reader: AudioReader, output: &dyn AudioOutput, cancel: &CancellationToken) -> RunResult {
    let settle = |result: RunResult| match result {
        Err(e) if cancel.is_cancelled() => {
            debug!(error = %e, "Ignoring playback error after cancellation");
            Ok(PlaybackOutcome::Cancelled)
        }
        other => other,
    };

    let bytes_read = reader.byte_counter();
    let mut decoder = match Mp3Decoder::open(reader) {
        Ok(decoder) => decoder,
        Err(e) => return settle(Err(e)),
    };
    if cancel.is_cancelled() {
        return Ok(PlaybackOutcome::Cancelled);
    }

    let format = decoder.format();
    let mut sink = match output.open(format) {
        Ok(sink) => sink,
        Err(e) => return settle(Err(e)),
    };
    info!(
        sample_rate = format.sample_rate,
        channels = format.channels,
        "Playback started"
    );

    let result = pump(&mut decoder, sink.as_mut(), cancel);
    if cancel.is_cancelled() || result.is_err() {
        sink.stop();
    }
    debug!(
        frames = decoder.frames_decoded(),
        bytes_read = bytes_read.load(Ordering::Relaxed),
        "Releasing audio device"
    );
    drop(sink);
    drop(decoder);

    settle(result)
}

fn pump(
    decoder: &mut Mp3Decoder<AudioReader>,
    sink: &mut dyn OutputSink,
    cancel: &CancellationToken,
) -> RunResult {
    loop {
        if cancel.is_cancelled() {
            return Ok(PlaybackOutcome::Cancelled);
        }
        match decoder.next_samples()? {
            Some(samples) => sink.write(&samples, cancel)?,
            None => break,
        }
    }

    // A cancelled read looks like end of stream.
    if cancel.is_cancelled() {
        return Ok(PlaybackOutcome::Cancelled);
    }
    sink.drain(cancel)?;

    if cancel.is_cancelled() {
        Ok(PlaybackOutcome::Cancelled)
    } else {
        Ok(PlaybackOutcome::Completed)
    }
}
