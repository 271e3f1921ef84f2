//! Command line configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_WORKERS, DEFAULT_MIN_WORKERS, DEFAULT_USER_AGENT,
    DEFAULT_WORKERS,
};
use super::types::{EngineConfig, LogFormat, LogLevel};

/// Command line options of the `scan_dispatch` binary.
///
/// Sends a GET for every URL of the input through one shared dispatcher, so the
/// whole list benefits from (and is throttled by) the same adaptive engine.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scan_dispatch",
    version,
    about = "Send HTTP requests through an adaptive, self-throttling request engine"
)]
pub struct ScanConfig {
    /// File to read URLs from, one per line ("-" reads stdin)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Initial number of concurrent workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Smallest worker count the engine may shrink to
    #[arg(long, default_value_t = DEFAULT_MIN_WORKERS)]
    pub min_workers: usize,

    /// Largest worker count the engine may grow to
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// Per-request timeout in seconds (0 lets the engine adjust it per host)
    #[arg(long, default_value_t = 0.0)]
    pub timeout_seconds: f64,

    /// Maximum requests per second (0 disables rate limiting)
    #[arg(long, default_value_t = 0)]
    pub max_rps: u32,

    /// Re-sends allowed after a failed attempt
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Extra header sent with every request ("Name: value"), repeatable
    #[arg(long = "header", value_name = "HEADER", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Count HTTP 4xx/5xx responses as answers instead of failed requests
    #[arg(long)]
    pub accept_http_errors: bool,

    /// Follow HTTP redirects
    #[arg(long)]
    pub follow_redirects: bool,
}

impl ScanConfig {
    /// Engine configuration derived from the command line.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            configured_timeout: Duration::from_secs_f64(self.timeout_seconds.max(0.0)),
            max_requests_per_second: self.max_rps,
            max_retries: self.max_retries,
            min_workers: self.min_workers,
            max_workers: self.max_workers,
            user_agent: self.user_agent.clone(),
            default_headers: self.headers.clone(),
            target_domains: Vec::new(),
        }
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got \"{raw}\""))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in \"{raw}\""));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("X-Scan:  yes ").unwrap(),
            ("X-Scan".to_string(), "yes".to_string())
        );
        assert!(parse_header("no colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_defaults_enable_timeout_auto_adjust() {
        let config = ScanConfig::parse_from(["scan_dispatch", "urls.txt"]);
        let engine = config.engine_config();
        assert!(!engine.timeout_is_pinned());
        assert_eq!(engine.max_requests_per_second, 0);
        assert_eq!(config.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_flags_map_to_engine_config() {
        let config = ScanConfig::parse_from([
            "scan_dispatch",
            "urls.txt",
            "--timeout-seconds",
            "2.5",
            "--max-rps",
            "15",
            "--max-retries",
            "0",
            "--header",
            "Cookie: a=b",
        ]);
        let engine = config.engine_config();
        assert_eq!(engine.configured_timeout, Duration::from_millis(2500));
        assert_eq!(engine.max_requests_per_second, 15);
        assert_eq!(engine.max_retries, 0);
        assert_eq!(
            engine.default_headers,
            vec![("Cookie".to_string(), "a=b".to_string())]
        );
    }
}
