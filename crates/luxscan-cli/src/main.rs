//! CLI for luxscan — luminance statistics over every file in a directory.

mod fs_source;
mod present;
mod scan;

use std::path::PathBuf;

use clap::Parser;
use luxscan_core::{process_sources, NullPresenter, PipelineConfig, SampleSource};

use fs_source::FileBlockSource;
use present::ConsolePresenter;

#[derive(Parser)]
#[command(name = "luxscan")]
#[command(about = "luxscan — multithreaded luminance statistics over a directory of sample files")]
#[command(version = luxscan_core::VERSION)]
struct Cli {
    /// Directory to scan for sample files (sub-directories are not entered)
    #[arg(short = 'd', long)]
    dir: PathBuf,

    /// Number of worker threads
    #[arg(short = 't', long, value_parser = clap::value_parser!(u8).range(1..=15))]
    threads: u8,

    /// Maximum number of queued, unprocessed work units
    #[arg(long, default_value_t = luxscan_core::DEFAULT_MAX_OUTSTANDING)]
    queue_limit: usize,

    /// Bytes averaged into one luminance sample
    #[arg(long, default_value_t = fs_source::DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Emit the full run report as JSON instead of console output
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let files = match scan::regular_files(&cli.dir) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Cannot access directory {}: {e}", cli.dir.display());
            return 1;
        }
    };
    if files.is_empty() {
        eprintln!("No files found in {}", cli.dir.display());
        return 1;
    }
    log::info!(
        "processing {} file(s) with {} thread(s)",
        files.len(),
        cli.threads
    );

    let sources: Vec<Box<dyn SampleSource>> = files
        .iter()
        .map(|path| FileBlockSource::boxed(path, cli.block_size))
        .collect();
    let config = PipelineConfig {
        threads: usize::from(cli.threads),
        max_outstanding: cli.queue_limit,
    };

    let aggregate_present = if cli.json {
        let report = process_sources(sources, &config, &mut NullPresenter);
        println!(
            "{}",
            serde_json::to_string_pretty(&report).expect("run report serializes")
        );
        report.aggregate.is_some()
    } else {
        println!("Running with {} thread(s)", cli.threads);
        let mut presenter = ConsolePresenter;
        let report = process_sources(sources, &config, &mut presenter);
        report.aggregate.is_some()
    };

    if aggregate_present {
        0
    } else {
        1
    }
}
