//! The driver: streams sources through the scheduler and reports.
//!
//! Control flow for one run:
//! 1. Open every source; failures are marked on their context and never
//!    reach the scheduler.
//! 2. Size the completion latch to the successfully opened sources.
//! 3. Stream each source, wrapping every sample into a [`SampleJob`]
//!    bound to that source's context, with the bounded queue providing
//!    backpressure against the worker pool.
//! 4. Mark end-of-source after the final unit is submitted, then run the
//!    driver-side completion check (the final unit may already have been
//!    processed, and a source may carry zero samples).
//! 5. Wait on the latch, shut the scheduler down (queue provably empty),
//!    aggregate, and present.

use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::Aggregator;
use crate::context::SourceContext;
use crate::job::Job;
use crate::latch::CompletionLatch;
use crate::scheduler::{Scheduler, DEFAULT_MAX_OUTSTANDING};
use crate::source::SampleSource;
use crate::stats::StatsError;

/// Tuning knobs for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker threads in the scheduler pool.
    pub threads: usize,
    /// Bounded queue capacity.
    pub max_outstanding: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            max_outstanding: DEFAULT_MAX_OUTSTANDING,
        }
    }
}

/// Final statistics for one completed source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    /// Source identifier.
    pub id: String,
    /// Samples processed.
    pub samples: u64,
    /// Mean luminance (integer floor).
    pub average: u8,
    /// Smallest observed luminance.
    pub min: u8,
    /// Largest observed luminance.
    pub max: u8,
    /// Exact median luminance.
    pub median: u8,
}

/// Statistics merged across every completed source.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    /// Sources that contributed samples.
    pub sources: usize,
    /// Total samples processed.
    pub samples: u64,
    /// Global minimum.
    pub min: u8,
    /// Global maximum.
    pub max: u8,
    /// Weighted mean (integer floor).
    pub mean: u8,
    /// Exact median of the concatenated sample multiset.
    pub median: u8,
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Per-source statistics, in source order.
    pub sources: Vec<SourceReport>,
    /// Identifiers of sources that failed to open.
    pub failed: Vec<String>,
    /// Merged statistics, absent when no source processed any sample.
    pub aggregate: Option<AggregateReport>,
}

/// Receives final computed statistics.
///
/// The engine formats nothing itself; console output, JSON files and the
/// like live behind this trait.
pub trait Presenter {
    /// One source finished with at least one processed sample.
    fn source_finished(&mut self, report: &SourceReport);

    /// One source failed to open and was excluded.
    fn source_failed(&mut self, id: &str);

    /// The run is over. `None` means no source processed any sample.
    fn run_finished(&mut self, aggregate: Option<&AggregateReport>);
}

/// A presenter that discards everything. Useful when only the returned
/// [`RunReport`] matters.
#[derive(Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn source_finished(&mut self, _report: &SourceReport) {}
    fn source_failed(&mut self, _id: &str) {}
    fn run_finished(&mut self, _aggregate: Option<&AggregateReport>) {}
}

/// Work unit carrying one sample bound to its source context.
///
/// The scheduler has no error channel, so the job traps its own failures
/// and records them against the context instead of letting them escape
/// the worker loop.
struct SampleJob {
    value: u8,
    ctx: Arc<SourceContext>,
}

impl Job for SampleJob {
    fn run(&self) {
        if let Err(e) = self.ctx.record_sample(u32::from(self.value)) {
            log::warn!("source {}: sample rejected: {e}", self.ctx.id());
            self.ctx.mark_failed();
        }
        self.ctx.mark_processed();
        self.ctx.signal_if_complete();
    }
}

/// Run the full engine over `sources` and report through `presenter`.
///
/// Blocks until every opened source has been fully processed.
pub fn process_sources(
    sources: Vec<Box<dyn SampleSource>>,
    config: &PipelineConfig,
    presenter: &mut dyn Presenter,
) -> RunReport {
    assert!(config.threads > 0, "pipeline needs at least one worker");

    // Open everything first so the latch can be sized exactly to the
    // sources that will actually be counted down.
    let mut outcomes = Vec::with_capacity(sources.len());
    let mut opened_count = 0usize;
    for mut source in sources {
        match source.open() {
            Ok(()) => {
                opened_count += 1;
                outcomes.push(Ok(source));
            }
            Err(e) => {
                log::warn!("source {}: failed to open: {e}", source.id());
                outcomes.push(Err(source.id().to_string()));
            }
        }
    }

    let latch = Arc::new(CompletionLatch::new(opened_count));
    let mut contexts = Vec::with_capacity(outcomes.len());
    let mut streams = Vec::with_capacity(opened_count);
    let mut failed_ids = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(source) => {
                let ctx = Arc::new(SourceContext::new(source.id(), Arc::clone(&latch)));
                contexts.push(Arc::clone(&ctx));
                streams.push((source, ctx));
            }
            Err(id) => {
                // Terminal failed state; never sees the scheduler and
                // is excluded from aggregation.
                let ctx = Arc::new(SourceContext::new(id.as_str(), Arc::clone(&latch)));
                ctx.mark_failed();
                contexts.push(ctx);
                presenter.source_failed(&id);
                failed_ids.push(id);
            }
        }
    }

    let mut scheduler = Scheduler::new(config.max_outstanding);
    scheduler.start(config.threads);

    for (source, ctx) in &mut streams {
        log::debug!("streaming source {}", source.id());
        while let Some(value) = source.next_sample() {
            ctx.mark_submitted();
            scheduler.submit(Box::new(SampleJob {
                value,
                ctx: Arc::clone(ctx),
            }));
        }
        ctx.mark_end_of_source();
        ctx.signal_if_complete();
    }

    // Every unit is in. Workers finish the tail of the queue; the latch
    // releases once the last source completes, which also means the
    // queue is empty and the non-draining shutdown below loses nothing.
    latch.wait();
    scheduler.shutdown();

    let mut aggregator = Aggregator::new();
    let mut source_reports = Vec::new();
    for ctx in &contexts {
        if ctx.is_failed() {
            continue;
        }
        match build_source_report(ctx) {
            Ok(report) => {
                presenter.source_finished(&report);
                source_reports.push(report);
            }
            Err(StatsError::NoData) => {
                log::info!("source {}: no samples", ctx.id());
            }
            Err(e) => {
                // Unreachable after the latch released; keep the log
                // rather than a panic in case a caller misuses contexts.
                log::error!("source {}: {e}", ctx.id());
            }
        }
        aggregator.add_source(Arc::clone(ctx));
    }

    let aggregate = build_aggregate_report(&aggregator);
    presenter.run_finished(aggregate.as_ref());

    RunReport {
        sources: source_reports,
        failed: failed_ids,
        aggregate,
    }
}

fn build_source_report(ctx: &SourceContext) -> Result<SourceReport, StatsError> {
    Ok(SourceReport {
        id: ctx.id().to_string(),
        samples: ctx.samples_processed(),
        average: ctx.average_luminance()?,
        min: ctx.min_luminance()?,
        max: ctx.max_luminance()?,
        median: ctx.median_luminance()?,
    })
}

fn build_aggregate_report(aggregator: &Aggregator) -> Option<AggregateReport> {
    let mean = match aggregator.mean() {
        Ok(mean) => mean,
        Err(_) => return None,
    };
    // With a non-zero processed total the remaining statistics exist.
    let min = aggregator.min().ok()?;
    let max = aggregator.max().ok()?;
    let median = aggregator.median().ok()?;
    Some(AggregateReport {
        sources: aggregator.len(),
        samples: aggregator.total_samples(),
        min,
        max,
        mean,
        median,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// In-memory producer.
    struct VecSource {
        id: String,
        samples: Vec<u8>,
        cursor: usize,
        opened: bool,
    }

    impl VecSource {
        fn boxed(id: &str, samples: &[u8]) -> Box<dyn SampleSource> {
            Box::new(Self {
                id: id.to_string(),
                samples: samples.to_vec(),
                cursor: 0,
                opened: false,
            })
        }
    }

    impl SampleSource for VecSource {
        fn id(&self) -> &str {
            &self.id
        }
        fn open(&mut self) -> io::Result<()> {
            self.opened = true;
            Ok(())
        }
        fn next_sample(&mut self) -> Option<u8> {
            assert!(self.opened, "next_sample before open");
            let sample = self.samples.get(self.cursor).copied();
            self.cursor += 1;
            sample
        }
    }

    /// A source that never opens.
    struct BrokenSource {
        id: String,
    }

    impl SampleSource for BrokenSource {
        fn id(&self) -> &str {
            &self.id
        }
        fn open(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such medium"))
        }
        fn next_sample(&mut self) -> Option<u8> {
            unreachable!("broken source must never be streamed")
        }
    }

    /// Presenter double recording every callback.
    #[derive(Default)]
    struct RecordingPresenter {
        finished: Vec<SourceReport>,
        failed: Vec<String>,
        aggregate_seen: bool,
        aggregate_present: bool,
    }

    impl Presenter for RecordingPresenter {
        fn source_finished(&mut self, report: &SourceReport) {
            self.finished.push(report.clone());
        }
        fn source_failed(&mut self, id: &str) {
            self.failed.push(id.to_string());
        }
        fn run_finished(&mut self, aggregate: Option<&AggregateReport>) {
            self.aggregate_seen = true;
            self.aggregate_present = aggregate.is_some();
        }
    }

    #[test]
    fn test_single_source_end_to_end() {
        let mut presenter = RecordingPresenter::default();
        let report = process_sources(
            vec![VecSource::boxed("a", &[3, 5, 7])],
            &PipelineConfig::default(),
            &mut presenter,
        );

        assert_eq!(report.sources.len(), 1);
        let src = &report.sources[0];
        assert_eq!(src.id, "a");
        assert_eq!(src.samples, 3);
        assert_eq!(src.average, 5);
        assert_eq!(src.min, 3);
        assert_eq!(src.max, 7);
        assert_eq!(src.median, 5);

        let aggr = report.aggregate.expect("aggregate present");
        assert_eq!(aggr.mean, 5);
        assert_eq!(aggr.median, 5);
        assert!(presenter.aggregate_present);
    }

    #[test]
    fn test_multiple_sources_merge() {
        let mut presenter = RecordingPresenter::default();
        let report = process_sources(
            vec![
                VecSource::boxed("a", &[3, 4, 6, 8]),
                VecSource::boxed("b", &[4, 9, 1]),
            ],
            &PipelineConfig {
                threads: 3,
                max_outstanding: 2,
            },
            &mut presenter,
        );

        assert_eq!(presenter.finished.len(), 2);
        let aggr = report.aggregate.expect("aggregate present");
        assert_eq!(aggr.min, 1);
        assert_eq!(aggr.max, 9);
        assert_eq!(aggr.median, 4);
        assert_eq!(aggr.sources, 2);
    }

    #[test]
    fn test_zero_sample_source_does_not_deadlock() {
        let mut presenter = RecordingPresenter::default();
        let report = process_sources(
            vec![
                VecSource::boxed("empty", &[]),
                VecSource::boxed("a", &[10, 20]),
            ],
            &PipelineConfig::default(),
            &mut presenter,
        );

        // Only the source that carried samples is reported.
        assert_eq!(presenter.finished.len(), 1);
        assert_eq!(presenter.finished[0].id, "a");
        assert!(report.aggregate.is_some());
    }

    #[test]
    fn test_failed_sources_are_excluded() {
        let mut presenter = RecordingPresenter::default();
        let report = process_sources(
            vec![
                Box::new(BrokenSource {
                    id: "bad".to_string(),
                }),
                VecSource::boxed("good", &[100, 110]),
            ],
            &PipelineConfig::default(),
            &mut presenter,
        );

        assert_eq!(presenter.failed, vec!["bad".to_string()]);
        assert_eq!(report.failed, vec!["bad".to_string()]);
        let aggr = report.aggregate.expect("good source still aggregates");
        assert_eq!(aggr.mean, 105);
    }

    #[test]
    fn test_all_sources_failing_yields_no_aggregate() {
        let mut presenter = RecordingPresenter::default();
        let report = process_sources(
            vec![
                Box::new(BrokenSource {
                    id: "x".to_string(),
                }),
                Box::new(BrokenSource {
                    id: "y".to_string(),
                }),
            ],
            &PipelineConfig::default(),
            &mut presenter,
        );

        assert!(report.sources.is_empty());
        assert!(report.aggregate.is_none());
        assert!(presenter.aggregate_seen);
        assert!(!presenter.aggregate_present);
    }

    #[test]
    fn test_no_sources_at_all() {
        let report = process_sources(
            Vec::new(),
            &PipelineConfig::default(),
            &mut NullPresenter,
        );
        assert!(report.aggregate.is_none());
    }

    #[test]
    fn test_large_run_under_tight_queue() {
        // Many samples over a tiny queue exercises backpressure and the
        // completion protocol together.
        let samples: Vec<u8> = (0u8..=255).cycle().take(5000).collect();
        let report = process_sources(
            vec![
                VecSource::boxed("big", &samples),
                VecSource::boxed("small", &[0, 255]),
            ],
            &PipelineConfig {
                threads: 8,
                max_outstanding: 4,
            },
            &mut NullPresenter,
        );
        let aggr = report.aggregate.expect("aggregate present");
        assert_eq!(aggr.min, 0);
        assert_eq!(aggr.max, 255);
        assert_eq!(report.sources[0].samples, 5000);
    }
}
