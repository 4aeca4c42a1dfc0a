//! Cross-source statistics over completed source contexts.

use std::sync::Arc;

use crate::context::SourceContext;
use crate::stats::{histogram_median, StatsError, HISTOGRAM_BUCKETS};

/// Combines the statistics of many completed sources.
///
/// Holds no mutable state of its own beyond the registered contexts;
/// every statistic is recomputed on demand from the per-source counters
/// and histograms. Only completed, non-failed contexts belong here —
/// sources that failed to open are excluded entirely.
#[derive(Default)]
pub struct Aggregator {
    sources: Vec<Arc<SourceContext>>,
}

impl Aggregator {
    /// Create an aggregator with no registered sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one completed source.
    pub fn add_source(&mut self, ctx: Arc<SourceContext>) {
        self.sources.push(ctx);
    }

    /// True iff no sources are registered (e.g. every source failed to
    /// open).
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Total samples processed across all registered sources.
    pub fn total_samples(&self) -> u64 {
        self.sources.iter().map(|c| c.samples_processed()).sum()
    }

    /// Global minimum over every source's own minimum.
    pub fn min(&self) -> Result<u8, StatsError> {
        self.fold_extremum(SourceContext::min_luminance, u8::min)
    }

    /// Global maximum over every source's own maximum.
    pub fn max(&self) -> Result<u8, StatsError> {
        self.fold_extremum(SourceContext::max_luminance, u8::max)
    }

    /// Weighted mean across all sources: total luminance sum divided by
    /// total processed samples, floored. Not an average of per-source
    /// means.
    pub fn mean(&self) -> Result<u8, StatsError> {
        let mut total_sum = 0u64;
        let mut total_samples = 0u64;
        for ctx in &self.sources {
            total_sum += ctx.luminance_sum();
            total_samples += ctx.samples_processed();
        }
        if total_samples == 0 {
            return Err(StatsError::NoData);
        }
        Ok((total_sum / total_samples) as u8)
    }

    /// Exact median of the concatenated sample multiset, computed from
    /// the bucket-wise sum of all per-source histograms.
    pub fn median(&self) -> Result<u8, StatsError> {
        let mut merged = [0u64; HISTOGRAM_BUCKETS];
        for ctx in &self.sources {
            let histogram = ctx.histogram();
            for (bucket, count) in merged.iter_mut().zip(histogram.iter()) {
                *bucket += count;
            }
        }
        histogram_median(&merged)
    }

    /// Fold one per-source extremum accessor across all sources,
    /// skipping sources that completed with zero samples.
    fn fold_extremum(
        &self,
        accessor: impl Fn(&SourceContext) -> Result<u8, StatsError>,
        pick: impl Fn(u8, u8) -> u8,
    ) -> Result<u8, StatsError> {
        let mut result: Option<u8> = None;
        for ctx in &self.sources {
            match accessor(ctx) {
                Ok(v) => result = Some(result.map_or(v, |r| pick(r, v))),
                Err(StatsError::NoData) => continue,
                Err(e) => return Err(e),
            }
        }
        result.ok_or(StatsError::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latch::CompletionLatch;

    /// A completed context that processed exactly `samples`.
    fn completed_ctx(id: &str, samples: &[u32]) -> Arc<SourceContext> {
        let ctx = SourceContext::new(id, Arc::new(CompletionLatch::new(1)));
        for &v in samples {
            ctx.mark_submitted();
            ctx.record_sample(v).unwrap();
            ctx.mark_processed();
        }
        ctx.mark_end_of_source();
        assert!(ctx.signal_if_complete());
        Arc::new(ctx)
    }

    #[test]
    fn test_empty_aggregator_reports_no_data() {
        let aggr = Aggregator::new();
        assert!(aggr.is_empty());
        assert_eq!(aggr.min(), Err(StatsError::NoData));
        assert_eq!(aggr.max(), Err(StatsError::NoData));
        assert_eq!(aggr.mean(), Err(StatsError::NoData));
        assert_eq!(aggr.median(), Err(StatsError::NoData));
    }

    #[test]
    fn test_single_source_passthrough() {
        let mut aggr = Aggregator::new();
        aggr.add_source(completed_ctx("a", &[3, 5, 7]));
        assert_eq!(aggr.len(), 1);
        assert_eq!(aggr.min(), Ok(3));
        assert_eq!(aggr.max(), Ok(7));
        assert_eq!(aggr.mean(), Ok(5));
        assert_eq!(aggr.median(), Ok(5));
    }

    #[test]
    fn test_min_max_across_sources() {
        let mut aggr = Aggregator::new();
        aggr.add_source(completed_ctx("a", &[40, 50, 60]));
        aggr.add_source(completed_ctx("b", &[10, 90]));
        aggr.add_source(completed_ctx("c", &[55]));
        assert_eq!(aggr.min(), Ok(10));
        assert_eq!(aggr.max(), Ok(90));
    }

    #[test]
    fn test_mean_is_weighted_not_mean_of_means() {
        // (280 + 48 + 310) / (2 + 3 + 4) = 638 / 9 = 70 floored.
        let mut aggr = Aggregator::new();
        aggr.add_source(completed_ctx("a", &[140, 140]));
        aggr.add_source(completed_ctx("b", &[16, 16, 16]));
        aggr.add_source(completed_ctx("c", &[77, 77, 78, 78]));
        assert_eq!(aggr.mean(), Ok(70));
    }

    #[test]
    fn test_median_invariant_to_partitioning_odd_total() {
        // 1 3 4 4 6 8 9 -> median 4.
        let mut aggr = Aggregator::new();
        aggr.add_source(completed_ctx("a", &[3, 4, 6, 8]));
        aggr.add_source(completed_ctx("b", &[4, 9, 1]));
        assert_eq!(aggr.median(), Ok(4));
    }

    #[test]
    fn test_median_invariant_to_partitioning_even_total() {
        // 1 3 4 4 6 8 8 9 -> median floor((4 + 6) / 2) = 5.
        let mut aggr = Aggregator::new();
        aggr.add_source(completed_ctx("a", &[3, 4, 6, 8]));
        aggr.add_source(completed_ctx("b", &[4, 8, 9, 1]));
        assert_eq!(aggr.median(), Ok(5));
    }

    #[test]
    fn test_zero_sample_source_does_not_poison_extrema() {
        let mut aggr = Aggregator::new();
        aggr.add_source(completed_ctx("empty", &[]));
        aggr.add_source(completed_ctx("a", &[12, 200]));
        assert_eq!(aggr.min(), Ok(12));
        assert_eq!(aggr.max(), Ok(200));
        assert_eq!(aggr.mean(), Ok(106));
        assert_eq!(aggr.median(), Ok(106));
    }

    #[test]
    fn test_unfinished_source_surfaces_not_ready() {
        let mut aggr = Aggregator::new();
        let ctx = SourceContext::new("open", Arc::new(CompletionLatch::new(1)));
        ctx.mark_submitted();
        ctx.record_sample(9).unwrap();
        ctx.mark_processed();
        aggr.add_source(Arc::new(ctx));
        assert_eq!(aggr.min(), Err(StatsError::NotReady));
    }
}
