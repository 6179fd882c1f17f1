//! Recording audio output
//!
//! Counts device opens and releases so tests can check that a run holds at
//! most one device and always gives it back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use waav_speak::{AudioFormat, AudioOutput, OutputSink, PlaybackError, PlaybackResult};

#[derive(Default)]
pub struct OutputStats {
    pub opened: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub released: AtomicUsize,
    pub samples: AtomicUsize,
    pub stops: AtomicUsize,
    pub drains: AtomicUsize,
    pub formats: Mutex<Vec<AudioFormat>>,
}

impl OutputStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn drains(&self) -> usize {
        self.drains.load(Ordering::SeqCst)
    }
}

/// An [`AudioOutput`] that records what it is asked to play.
pub struct MockOutput {
    stats: Arc<OutputStats>,
    write_delay: Duration,
    fail_open: AtomicBool,
    fail_write_after: Option<usize>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(OutputStats::default()),
            write_delay: Duration::ZERO,
            fail_open: AtomicBool::new(false),
            fail_write_after: None,
        }
    }

    /// Each write blocks for `delay`, like a device buffer filling up.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Opening the device fails.
    pub fn failing_open(self) -> Self {
        self.fail_open.store(true, Ordering::SeqCst);
        self
    }

    /// Writes fail once `writes` writes have succeeded.
    pub fn failing_write_after(mut self, writes: usize) -> Self {
        self.fail_write_after = Some(writes);
        self
    }

    pub fn stats(&self) -> Arc<OutputStats> {
        self.stats.clone()
    }
}

impl AudioOutput for MockOutput {
    fn open(&self, format: AudioFormat) -> PlaybackResult<Box<dyn OutputSink>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(PlaybackError::Device("no output device available".to_string()));
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(active, Ordering::SeqCst);
        self.stats.formats.lock().push(format);

        Ok(Box::new(MockSink {
            stats: self.stats.clone(),
            write_delay: self.write_delay,
            fail_write_after: self.fail_write_after,
            writes: 0,
        }))
    }
}

struct MockSink {
    stats: Arc<OutputStats>,
    write_delay: Duration,
    fail_write_after: Option<usize>,
    writes: usize,
}

impl OutputSink for MockSink {
    fn write(&mut self, samples: &[i16], cancel: &CancellationToken) -> PlaybackResult<()> {
        if self.fail_write_after.is_some_and(|limit| self.writes >= limit) {
            return Err(PlaybackError::Device("device unplugged".to_string()));
        }
        if !self.write_delay.is_zero() {
            // Sleep in slices so cancellation is noticed promptly.
            let slice = Duration::from_millis(2).min(self.write_delay);
            let mut waited = Duration::ZERO;
            while waited < self.write_delay && !cancel.is_cancelled() {
                thread::sleep(slice);
                waited += slice;
            }
        }
        self.writes += 1;
        self.stats.samples.fetch_add(samples.len(), Ordering::SeqCst);
        Ok(())
    }

    fn drain(&mut self, _cancel: &CancellationToken) -> PlaybackResult<()> {
        self.stats.drains.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for MockSink {
    fn drop(&mut self) {
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}
