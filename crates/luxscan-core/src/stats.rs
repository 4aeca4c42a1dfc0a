//! Error taxonomy and exact order-statistic queries over bounded histograms.
//!
//! A luminance histogram is a lossless representation of a multiset over
//! `0..=255`: every statistic derived from it is exact, and two histograms
//! merged bucket-wise describe the exact concatenation of the two sample
//! sets. This is what lets the aggregator compute a true cross-source
//! median without ever materializing the raw samples.

use std::fmt;

/// Number of histogram buckets: one per representable luminance value.
pub const HISTOGRAM_BUCKETS: usize = 256;

/// Errors surfaced by the statistics layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsError {
    /// A sample outside `0..=255` was reported. Fatal precondition
    /// violation; values are never clamped.
    InvalidValue(u32),
    /// A derived statistic was requested before the source reached
    /// end-of-source. Programming error in the caller.
    NotReady,
    /// An aggregate statistic was requested with zero processed samples.
    /// Recoverable; callers present this as an explicit "nothing to
    /// report" outcome.
    NoData,
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(v) => {
                write!(f, "sample value {v} outside the valid range 0..=255")
            }
            Self::NotReady => {
                write!(f, "statistics requested before end-of-source was reached")
            }
            Self::NoData => write!(f, "no successfully processed samples"),
        }
    }
}

impl std::error::Error for StatsError {}

/// Total number of samples recorded in a histogram.
pub fn histogram_total(histogram: &[u64; HISTOGRAM_BUCKETS]) -> u64 {
    histogram.iter().sum()
}

/// Exact median of the multiset described by `histogram`.
///
/// Scans buckets in increasing value order, O(256) time and O(1) space
/// regardless of how many samples the histogram counts.
///
/// Convention for even-sized sets whose two middle order statistics land
/// in different buckets: the integer floor of their average. `{4, 6}`
/// yields `5`, `{3, 4, 6, 8}` yields `5`, `{4, 4, 4, 4, 6, 8}` yields
/// `4` because both middle ranks fall in the `4` bucket.
///
/// Returns [`StatsError::NoData`] for an all-zero histogram.
pub fn histogram_median(histogram: &[u64; HISTOGRAM_BUCKETS]) -> Result<u8, StatsError> {
    let total = histogram_total(histogram);
    if total == 0 {
        return Err(StatsError::NoData);
    }

    // 1-indexed rank of the lower middle order statistic.
    let (rank, need_second) = if total % 2 == 1 {
        ((total + 1) / 2, false)
    } else {
        (total / 2, true)
    };

    let mut remaining = rank;
    let mut index = 0usize;
    while remaining > histogram[index] {
        remaining -= histogram[index];
        index += 1;
    }
    if !need_second {
        return Ok(index as u8);
    }

    // Even total: if rank+1 falls in the same bucket the median is exact.
    if remaining + 1 <= histogram[index] {
        return Ok(index as u8);
    }

    // Otherwise find the bucket holding the next order statistic.
    let lower = index;
    let mut upper = lower + 1;
    while histogram[upper] == 0 {
        upper += 1;
    }
    Ok(((lower + upper) / 2) as u8)
}
