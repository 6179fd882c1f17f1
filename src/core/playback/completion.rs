//! Single-shot completion slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// A result slot written at most once.
///
/// Several parties may race to report the end of a run (the worker, the
/// cancellation path); the first call to [`Completion::complete`] wins and
/// every later call is ignored.
pub struct Completion<T> {
    completed: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Completion<T> {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (sender, receiver) = oneshot::channel();
        let completion = Arc::new(Self {
            completed: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
        });
        (completion, receiver)
    }

    /// Reports `value`. Returns `false` if the slot was already written.
    pub fn complete(&self, value: T) -> bool {
        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        if let Some(sender) = self.sender.lock().take() {
            // The receiver may be gone if the caller stopped waiting.
            let _ = sender.send(value);
        }
        true
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_signal_wins() {
        let (completion, receiver) = Completion::new();
        assert!(!completion.is_completed());

        assert!(completion.complete("cancelled"));
        assert!(!completion.complete("completed"));
        assert!(completion.is_completed());

        assert_eq!(tokio_test::block_on(receiver).unwrap(), "cancelled");
    }

    #[test]
    fn test_complete_without_receiver() {
        let (completion, receiver) = Completion::new();
        drop(receiver);
        assert!(completion.complete(1));
        assert!(!completion.complete(2));
    }

    #[test]
    fn test_concurrent_signals_report_once() {
        let (completion, receiver) = Completion::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let completion = completion.clone();
                std::thread::spawn(move || completion.complete(i))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(tokio_test::block_on(receiver).is_ok());
    }
}
