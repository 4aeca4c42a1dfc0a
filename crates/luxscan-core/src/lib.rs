//! # luxscan-core
//!
//! **Bounded work distribution plus streaming, memory-bounded luminance
//! statistics.**
//!
//! `luxscan-core` decouples a single producer of discrete work units
//! from a fixed pool of worker threads behind a capacity-bounded queue,
//! and incrementally computes min/max/mean/median over per-source
//! luminance samples without ever materializing the raw sample set.
//!
//! ## Quick Start
//!
//! ```no_run
//! use luxscan_core::{process_sources, NullPresenter, PipelineConfig, SampleSource};
//!
//! # fn my_sources() -> Vec<Box<dyn SampleSource>> { Vec::new() }
//! let sources = my_sources();
//! let report = process_sources(sources, &PipelineConfig::default(), &mut NullPresenter);
//!
//! if let Some(aggregate) = &report.aggregate {
//!     println!("median luminance across all sources: {}", aggregate.median);
//! }
//! ```
//!
//! ## Architecture
//!
//! Sources → bounded queue → worker pool → per-source contexts → aggregator
//!
//! - The [`Scheduler`] owns backpressure: [`Scheduler::submit`] blocks
//!   the producer whenever the queue is full, so memory stays bounded no
//!   matter how far the consumers lag.
//! - Each source's samples fold into one shared [`SourceContext`]: a
//!   running sum, min/max, and a 256-bucket frequency histogram. The
//!   histogram is a lossless multiset representation, which makes the
//!   median exact in O(256) time and O(1) extra space.
//! - The [`CompletionLatch`] lets the driver block until every source
//!   has been finished by whichever worker thread happened to process
//!   its last unit.
//! - The [`Aggregator`] merges completed contexts: weighted mean,
//!   global extrema, and a true cross-source median from the bucket-wise
//!   histogram sum.
//!
//! Acquiring samples from a medium is not this crate's business: a
//! [`SampleSource`] yields already-extracted samples in `0..=255`, and a
//! [`Presenter`] receives the finished statistics.

pub mod aggregate;
pub mod context;
pub mod job;
pub mod latch;
pub mod pipeline;
pub mod scheduler;
pub mod source;
pub mod stats;

pub use aggregate::Aggregator;
pub use context::SourceContext;
pub use job::Job;
pub use latch::CompletionLatch;
pub use pipeline::{
    process_sources, AggregateReport, NullPresenter, PipelineConfig, Presenter, RunReport,
    SourceReport,
};
pub use scheduler::{Scheduler, DEFAULT_MAX_OUTSTANDING};
pub use source::SampleSource;
pub use stats::{histogram_median, histogram_total, StatsError, HISTOGRAM_BUCKETS};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
