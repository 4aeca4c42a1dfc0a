//! Console presenter.

use luxscan_core::{AggregateReport, Presenter, SourceReport};

/// Prints per-source lines as they finish and an aggregate block at the
/// end of the run.
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn source_finished(&mut self, report: &SourceReport) {
        println!(
            "{}: {} sample(s) | avg {} min {} max {} median {}",
            report.id, report.samples, report.average, report.min, report.max, report.median
        );
    }

    fn source_failed(&mut self, id: &str) {
        println!("{id} ->> invalid source, skipping");
    }

    fn run_finished(&mut self, aggregate: Option<&AggregateReport>) {
        println!();
        println!("{}", "=".repeat(49));
        match aggregate {
            Some(a) => {
                println!("Aggregated statistics across all processed sources:");
                println!("  sources:          {}", a.sources);
                println!("  samples:          {}", a.samples);
                println!("  min luminance:    {}", a.min);
                println!("  max luminance:    {}", a.max);
                println!("  mean luminance:   {}", a.mean);
                println!("  median luminance: {}", a.median);
            }
            None => println!("No sources were successfully processed"),
        }
    }
}
