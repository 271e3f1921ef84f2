//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `scan_dispatch` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use scan_dispatch::initialization::init_logger_with;
use scan_dispatch::{run_scan, ScanConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ScanConfig::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run_scan(config).await {
        Ok(report) => {
            println!(
                "Sent {} request{} ({} succeeded, {} failed, {} skipped) in {:.1}s, final error rate {:.1}%",
                report.total_urls,
                if report.total_urls == 1 { "" } else { "s" },
                report.successful,
                report.failed,
                report.skipped,
                report.elapsed_seconds,
                report.error_rate
            );
            if let Some(reason) = report.stop_reason {
                eprintln!("Scan stopped: {reason}");
                process::exit(2);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("scan_dispatch error: {:#}", e);
            process::exit(1);
        }
    }
}
