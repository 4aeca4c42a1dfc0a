//! Per-source shared state: counters, streaming statistics, completion.
//!
//! One [`SourceContext`] exists per source. It is shared between the
//! driver (which counts submitted units and marks end-of-source), every
//! worker thread processing that source's units, and — read-only once the
//! source completes — the aggregator.
//!
//! The hot counters (`samples_submitted`, `samples_processed`,
//! `end_of_source`) are lock-free atomics; the statistical fields are
//! guarded by a context-local mutex held only while folding one sample
//! in.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::latch::CompletionLatch;
use crate::stats::{histogram_median, StatsError, HISTOGRAM_BUCKETS};

/// Statistical fields, updated under one lock per recorded sample.
struct StatsInner {
    sum: u64,
    min: Option<u8>,
    max: Option<u8>,
    histogram: [u64; HISTOGRAM_BUCKETS],
}

/// Shared per-source processing state.
///
/// Completion protocol: a source is complete once `end_of_source` is set
/// and every submitted unit has been processed. Workers check after each
/// processed unit; the driver checks once after marking end-of-source
/// (the final unit can finish before the driver gets to set the flag,
/// and a source may legitimately carry zero samples). Whichever check
/// wins the `completed` flag counts the latch down — exactly once, no
/// matter how the checks interleave.
pub struct SourceContext {
    id: String,
    latch: Arc<CompletionLatch>,
    samples_submitted: AtomicU64,
    samples_processed: AtomicU64,
    end_of_source: AtomicBool,
    failed: AtomicBool,
    completed: AtomicBool,
    stats: Mutex<StatsInner>,
}

impl SourceContext {
    /// Create a context bound to the shared completion latch.
    pub fn new(id: impl Into<String>, latch: Arc<CompletionLatch>) -> Self {
        Self {
            id: id.into(),
            latch,
            samples_submitted: AtomicU64::new(0),
            samples_processed: AtomicU64::new(0),
            end_of_source: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            stats: Mutex::new(StatsInner {
                sum: 0,
                min: None,
                max: None,
                histogram: [0; HISTOGRAM_BUCKETS],
            }),
        }
    }

    /// Source identifier, as given at construction.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fold one sample into the running statistics.
    ///
    /// Values are validated, never clamped: anything outside `0..=255`
    /// is a fatal [`StatsError::InvalidValue`].
    pub fn record_sample(&self, value: u32) -> Result<(), StatsError> {
        if value > 255 {
            return Err(StatsError::InvalidValue(value));
        }
        let value = value as u8;

        let mut stats = self.stats.lock().unwrap();
        stats.sum += u64::from(value);
        stats.min = Some(stats.min.map_or(value, |m| m.min(value)));
        stats.max = Some(stats.max.map_or(value, |m| m.max(value)));
        stats.histogram[value as usize] += 1;
        Ok(())
    }

    /// Count one unit as submitted. Driver-only; must not be called once
    /// end-of-source is marked.
    pub fn mark_submitted(&self) -> u64 {
        self.samples_submitted.fetch_add(1, Ordering::Release) + 1
    }

    /// Count one unit as processed, returning the post-increment count.
    pub fn mark_processed(&self) -> u64 {
        self.samples_processed.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Units submitted so far.
    pub fn samples_submitted(&self) -> u64 {
        self.samples_submitted.load(Ordering::Acquire)
    }

    /// Units fully processed so far.
    pub fn samples_processed(&self) -> u64 {
        self.samples_processed.load(Ordering::Acquire)
    }

    /// Mark that the final unit for this source has been submitted.
    /// Driver-only, set exactly once; `samples_submitted` is fixed from
    /// this point on.
    pub fn mark_end_of_source(&self) {
        self.end_of_source.store(true, Ordering::Release);
    }

    /// Whether the driver has submitted the final unit.
    pub fn end_of_source(&self) -> bool {
        self.end_of_source.load(Ordering::Acquire)
    }

    /// Record that this source failed to open. Failed sources never
    /// reach the scheduler and are excluded from aggregation.
    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }

    /// Whether this source is in the terminal failed state.
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Whether completion has been detected for this source.
    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Detect completion and count the latch down if this call is the
    /// one that detected it.
    ///
    /// Called by workers after [`mark_processed`](Self::mark_processed)
    /// for every unit, and by the driver after
    /// [`mark_end_of_source`](Self::mark_end_of_source). The `completed`
    /// swap makes increment-then-compare effectively atomic: concurrent
    /// callers can both observe `processed == submitted`, but only one
    /// wins the swap and touches the latch.
    ///
    /// Returns true iff this call performed the countdown.
    pub fn signal_if_complete(&self) -> bool {
        if !self.end_of_source.load(Ordering::Acquire) {
            return false;
        }
        if self.samples_processed.load(Ordering::Acquire)
            != self.samples_submitted.load(Ordering::Acquire)
        {
            return false;
        }
        if self.completed.swap(true, Ordering::AcqRel) {
            return false;
        }
        log::debug!(
            "source {} complete after {} samples",
            self.id,
            self.samples_processed.load(Ordering::Acquire)
        );
        self.latch.count_down();
        true
    }

    /// Mean luminance (integer floor) over all processed samples.
    pub fn average_luminance(&self) -> Result<u8, StatsError> {
        self.require_eof()?;
        let processed = self.samples_processed();
        if processed == 0 {
            return Err(StatsError::NoData);
        }
        let stats = self.stats.lock().unwrap();
        Ok((stats.sum / processed) as u8)
    }

    /// Smallest luminance observed.
    pub fn min_luminance(&self) -> Result<u8, StatsError> {
        self.require_eof()?;
        self.stats.lock().unwrap().min.ok_or(StatsError::NoData)
    }

    /// Largest luminance observed.
    pub fn max_luminance(&self) -> Result<u8, StatsError> {
        self.require_eof()?;
        self.stats.lock().unwrap().max.ok_or(StatsError::NoData)
    }

    /// Exact median luminance from the bounded histogram.
    pub fn median_luminance(&self) -> Result<u8, StatsError> {
        self.require_eof()?;
        histogram_median(&self.stats.lock().unwrap().histogram)
    }

    /// Running sum of all recorded samples.
    pub fn luminance_sum(&self) -> u64 {
        self.stats.lock().unwrap().sum
    }

    /// Copy of the frequency histogram.
    pub fn histogram(&self) -> [u64; HISTOGRAM_BUCKETS] {
        self.stats.lock().unwrap().histogram
    }

    fn require_eof(&self) -> Result<(), StatsError> {
        if self.end_of_source() {
            Ok(())
        } else {
            Err(StatsError::NotReady)
        }
    }
}
