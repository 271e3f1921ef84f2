//! URL list scanning through a shared dispatcher.
//!
//! Reads URLs from a file or stdin and sends a GET for each, with a bounded
//! number of requests in flight. The worker count is a semaphore that the
//! dispatcher shrinks and grows with the error rate.

mod input;
mod statistics;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{info, warn};
use reqwest::header::HeaderMap;

use crate::config::ScanConfig;
use crate::dispatcher::{Dispatcher, SendOptions};
use crate::initialization::init_semaphore;
use crate::pool_advisor::SemaphorePool;
use crate::transport::{HttpTransport, Transport};

pub use statistics::print_error_statistics;

use input::{normalize_url, open_input};

/// Results of a scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// URLs handed to the dispatcher
    pub total_urls: usize,
    /// URLs that got a response
    pub successful: usize,
    /// URLs that failed after their retries
    pub failed: usize,
    /// URLs not sent because the scan was stopped
    pub skipped: usize,
    /// Why the scan stopped early, if it did
    pub stop_reason: Option<String>,
    /// Error rate of the outcome history at the end, in percent
    pub error_rate: f64,
    /// Elapsed time in seconds
    pub elapsed_seconds: f64,
}

/// Runs a scan with the `reqwest` transport.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the HTTP clients cannot be
/// built or the input cannot be opened.
pub async fn run_scan(config: ScanConfig) -> Result<ScanReport> {
    let engine = config.engine_config();
    let transport = HttpTransport::new(&engine)
        .context("Failed to initialize HTTP transport")?
        .error_for_status(!config.accept_http_errors);
    run_scan_with_transport(config, Arc::new(transport)).await
}

/// Runs a scan over any transport.
///
/// # Errors
///
/// Same as [`run_scan`].
pub async fn run_scan_with_transport(
    config: ScanConfig,
    transport: Arc<dyn Transport>,
) -> Result<ScanReport> {
    let engine = config.engine_config();
    engine.validate().context("Invalid engine configuration")?;

    let workers = config.workers.clamp(engine.min_workers, engine.max_workers);
    let semaphore = init_semaphore(workers);
    let pool = Arc::new(SemaphorePool::new(Arc::clone(&semaphore), workers));

    let dispatcher = Arc::new(
        Dispatcher::builder(engine, transport)
            .worker_pool(pool)
            .build()
            .context("Failed to build dispatcher")?,
    );

    let mut lines = open_input(&config.file).await?;

    let ctrl_c = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping the scan");
                dispatcher.stop().await;
            }
        })
    };

    let start_time = Instant::now();
    let options = SendOptions {
        follow_redirects: config.follow_redirects,
        grep: false,
        ..Default::default()
    };

    let mut tasks = FuturesUnordered::new();
    let mut total_urls = 0usize;
    let mut skipped = 0usize;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read line from input: {e}");
                continue;
            }
        };

        let Some(url) = normalize_url(&line) else {
            continue;
        };

        if dispatcher.stop_error().await.is_some() {
            skipped += 1;
            continue;
        }

        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Semaphore closed, skipping URL: {url}");
                skipped += 1;
                continue;
            }
        };

        total_urls += 1;
        let dispatcher = Arc::clone(&dispatcher);
        let options = options.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = permit;
            let result = dispatcher.get(&url, None, HeaderMap::new(), options).await;
            (url, result)
        }));
    }

    let mut successful = 0usize;
    let mut failed = 0usize;
    while let Some(joined) = tasks.next().await {
        match joined {
            Ok((url, Ok(response))) => {
                successful += 1;
                info!(
                    "{} {} ({:.3}s)",
                    url,
                    response.status(),
                    response.rtt().as_secs_f64()
                );
            }
            Ok((url, Err(e))) => {
                failed += 1;
                if !e.is_scan_fatal() {
                    warn!("Failed to fetch {}: {}", url, e);
                }
            }
            Err(e) => {
                failed += 1;
                warn!("Request task failed: {e}");
            }
        }
    }

    ctrl_c.abort();

    let stop_reason = dispatcher.stop_error().await.map(|e| e.to_string());
    if let Some(reason) = &stop_reason {
        warn!("Scan stopped early: {reason}");
    }
    print_error_statistics(dispatcher.error_stats());

    Ok(ScanReport {
        total_urls,
        successful,
        failed,
        skipped,
        stop_reason,
        error_rate: dispatcher.error_rate().await,
        elapsed_seconds: start_time.elapsed().as_secs_f64(),
    })
}
