//! Countdown latch synchronizing the driver against source completion.

use std::sync::{Condvar, Mutex};

/// A countdown synchronization object released when its counter reaches
/// zero.
///
/// The driver creates one latch per run, sized to the number of sources
/// that opened successfully, and blocks in [`wait`](Self::wait) after it
/// has submitted every work unit. Each source is counted down exactly
/// once, by whichever thread detects that source's completion — the
/// sources may finish in any order and on any worker thread.
///
/// Shared by handle (`Arc`) between the driver and every
/// [`SourceContext`](crate::SourceContext); the counter and condition
/// share one mutex.
pub struct CompletionLatch {
    remaining: Mutex<usize>,
    all_done: Condvar,
}

impl CompletionLatch {
    /// Create a latch that releases its waiter after `count` countdowns.
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            all_done: Condvar::new(),
        }
    }

    /// Decrement the counter, waking the waiter if it reached zero.
    ///
    /// # Panics
    /// Panics if called more times than the initial count — that means a
    /// source was counted down twice, which the completion protocol is
    /// built to prevent.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        *remaining = remaining
            .checked_sub(1)
            .expect("CompletionLatch counted down below zero");
        log::debug!("completion latch at {remaining}");
        if *remaining == 0 {
            self.all_done.notify_all();
        }
    }

    /// Block until the counter reaches zero. Returns immediately for a
    /// latch created with a count of zero.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        while *remaining > 0 {
            remaining = self.all_done.wait(remaining).unwrap();
        }
    }

    /// Current counter value. Approximate under concurrent countdowns.
    pub fn pending(&self) -> usize {
        *self.remaining.lock().unwrap()
    }
}
