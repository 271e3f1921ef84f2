//! scan_dispatch library: a resilient HTTP request engine for web scanners
//!
//! Many concurrent callers send HTTP requests against one target through a
//! shared [`Dispatcher`]. The dispatcher is the only component touching the
//! network. It keeps the scan moving while the target or the network degrades:
//! - Per-host timeouts follow the observed round-trip time
//! - Failed requests are retried a bounded number of times
//! - Senders pause when the error rate climbs and the worker pool shrinks
//! - The scan stops, once, when the target stops answering altogether
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use scan_dispatch::{Dispatcher, EngineConfig, HttpTransport, RequestError, SendOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig {
//!     max_requests_per_second: 20,
//!     ..Default::default()
//! };
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let dispatcher = Arc::new(Dispatcher::builder(config, transport).build()?);
//!
//! match dispatcher
//!     .get("http://target.test/login.php", Some("user=admin"), Default::default(), SendOptions::default())
//!     .await
//! {
//!     Ok(response) => println!("{} in {:?}", response.status(), response.rtt()),
//!     Err(RequestError::ScanMustStop(reason)) => eprintln!("scan over: {reason}"),
//!     Err(e) => eprintln!("request failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod config;
pub mod dispatcher;
mod error_handling;
pub mod history;
pub mod initialization;
pub mod monitor;
pub mod pool_advisor;
mod rate_limiter;
pub mod scan;
pub mod timeout;
pub mod transport;

// Re-export public API
pub use config::{ConfigError, EngineConfig, LogFormat, LogLevel, ScanConfig};
pub use dispatcher::{
    parse_raw_request, Dispatcher, DispatcherBuilder, GrepSink, HttpRequest, HttpResponse,
    RequestModifier, SendOptions,
};
pub use error_handling::{
    categorize_io_error, categorize_reqwest_error, ErrorStats, InitializationError, RequestError, ScanStopError,
    TransportError, TransportErrorKind,
};
pub use pool_advisor::{SemaphorePool, WorkerPool, WorkerPoolAdvisor};
pub use rate_limiter::RateLimiter;
pub use scan::{run_scan, run_scan_with_transport, ScanReport};
pub use transport::{HttpTransport, ReachabilityProbe, Transport, TransportProbe};
