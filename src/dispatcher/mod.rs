//! The request dispatcher.
//!
//! Single entry point for every HTTP request of a scan. A send goes through:
//! 1. The sticky stop check and the user pause
//! 2. The error-rate pause
//! 3. Rate limiting and timeout auto-adjustment (skipped in exploit mode)
//! 4. Request modifiers and correlation id assignment
//! 5. The retry policy, which records outcomes and decides when to stop
//! 6. Worker pool advice, the RTT ledger and the grep sink

mod evasion;
mod grep;
mod raw;
mod request;
mod response;
mod retry;
mod rtt_ledger;
mod state;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::Method;
use url::Url;

use crate::config::{ConfigError, EngineConfig};
use crate::error_handling::{ErrorStats, RequestError};
use crate::history::OutcomeHistory;
use crate::initialization::default_header_map;
use crate::monitor::ErrorRateMonitor;
use crate::pool_advisor::{WorkerPool, WorkerPoolAdvisor};
use crate::rate_limiter::RateLimiter;
use crate::timeout::TimeoutController;
use crate::transport::{ReachabilityProbe, Transport, TransportProbe};

use evasion::{apply_modifiers, sort_by_priority};
use grep::is_grep_target;
use retry::RetryPolicy;
use rtt_ledger::RttLedger;
use state::ScanControl;

pub use evasion::RequestModifier;
pub use grep::GrepSink;
pub use raw::parse_raw_request;
pub use request::{HttpRequest, SendOptions};
pub use response::HttpResponse;
pub use state::ControlState;

/// Builds a [`Dispatcher`].
pub struct DispatcherBuilder {
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    worker_pool: Option<Arc<dyn WorkerPool>>,
    grep_sink: Option<Arc<dyn GrepSink>>,
    modifiers: Vec<Arc<dyn RequestModifier>>,
}

impl DispatcherBuilder {
    /// Overrides the reachability probe (defaults to a [`TransportProbe`] over
    /// the same transport).
    pub fn probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Lets the dispatcher resize an external worker pool.
    pub fn worker_pool(mut self, pool: Arc<dyn WorkerPool>) -> Self {
        self.worker_pool = Some(pool);
        self
    }

    pub fn grep_sink(mut self, sink: Arc<dyn GrepSink>) -> Self {
        self.grep_sink = Some(sink);
        self
    }

    pub fn modifier(mut self, modifier: Arc<dyn RequestModifier>) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration does not validate.
    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        self.config.validate()?;

        let mut default_headers = default_header_map(&self.config.default_headers)?;
        if !default_headers.contains_key(USER_AGENT) {
            let user_agent = self
                .config
                .user_agent
                .parse()
                .map_err(|_| ConfigError::InvalidHeader(format!("User-Agent: {}", self.config.user_agent)))?;
            default_headers.insert(USER_AGENT, user_agent);
        }

        let mut modifiers = self.modifiers;
        sort_by_priority(&mut modifiers);

        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(TransportProbe::new(Arc::clone(&self.transport))));
        let pool_advisor = self.worker_pool.map(|pool| {
            WorkerPoolAdvisor::new(pool, self.config.min_workers, self.config.max_workers)
        });

        Ok(Dispatcher {
            history: OutcomeHistory::new(),
            timeouts: TimeoutController::new(&self.config),
            monitor: ErrorRateMonitor::new(),
            rate_limiter: RateLimiter::new(self.config.max_requests_per_second),
            control: ScanControl::new(),
            rtt_ledger: RttLedger::new(),
            error_stats: ErrorStats::new(),
            total_requests: AtomicUsize::new(0),
            next_debugging_id: AtomicU64::new(1),
            default_headers,
            transport: self.transport,
            probe,
            pool_advisor,
            grep_sink: self.grep_sink,
            modifiers,
            config: self.config,
        })
    }
}

/// Resilient HTTP request dispatcher shared by every caller of a scan.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use scan_dispatch::{Dispatcher, EngineConfig, HttpTransport, SendOptions};
///
/// # async fn run() -> anyhow::Result<()> {
/// let config = EngineConfig::default();
/// let transport = Arc::new(HttpTransport::new(&config)?);
/// let dispatcher = Dispatcher::builder(config, transport).build()?;
///
/// let response = dispatcher
///     .get("http://target.test/", None, Default::default(), SendOptions::default())
///     .await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher {
    config: EngineConfig,
    default_headers: HeaderMap,
    transport: Arc<dyn Transport>,
    probe: Arc<dyn ReachabilityProbe>,
    history: OutcomeHistory,
    timeouts: TimeoutController,
    monitor: ErrorRateMonitor,
    rate_limiter: RateLimiter,
    pool_advisor: Option<WorkerPoolAdvisor>,
    control: ScanControl,
    rtt_ledger: RttLedger,
    modifiers: Vec<Arc<dyn RequestModifier>>,
    grep_sink: Option<Arc<dyn GrepSink>>,
    error_stats: ErrorStats,
    total_requests: AtomicUsize,
    next_debugging_id: AtomicU64,
}

impl Dispatcher {
    pub fn builder(config: EngineConfig, transport: Arc<dyn Transport>) -> DispatcherBuilder {
        DispatcherBuilder {
            config,
            transport,
            probe: None,
            worker_pool: None,
            grep_sink: None,
            modifiers: Vec::new(),
        }
    }

    /// Sends a request with any method.
    ///
    /// # Errors
    ///
    /// - [`RequestError::UnsupportedUrl`] for anything but `http`/`https` URLs
    /// - [`RequestError::Transient`] when the request failed after its retries
    /// - [`RequestError::ScanMustStop`] once the scan was stopped, by the user or
    ///   because the target became unreachable
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        headers: HeaderMap,
        options: SendOptions,
    ) -> Result<HttpResponse, RequestError> {
        let url = check_uri(url)?;
        let request = HttpRequest::new(method, url)
            .with_headers(self.merge_headers(headers))
            .with_body(body.unwrap_or_default())
            .with_options(options);
        self.dispatch(request).await
    }

    /// Sends a GET. `data` becomes the query string when given.
    pub async fn get(
        &self,
        url: &str,
        data: Option<&str>,
        headers: HeaderMap,
        options: SendOptions,
    ) -> Result<HttpResponse, RequestError> {
        let mut url = check_uri(url)?;
        if let Some(data) = data.filter(|d| !d.is_empty()) {
            url.set_query(Some(data));
        }
        self.send(Method::GET, url.as_str(), None, headers, options)
            .await
    }

    /// Sends a POST. POST responses are never served from the cache.
    pub async fn post(
        &self,
        url: &str,
        body: impl Into<Vec<u8>>,
        headers: HeaderMap,
        options: SendOptions,
    ) -> Result<HttpResponse, RequestError> {
        let options = SendOptions {
            cache: false,
            ..options
        };
        self.send(Method::POST, url, Some(body.into()), headers, options)
            .await
    }

    pub async fn head(
        &self,
        url: &str,
        headers: HeaderMap,
        options: SendOptions,
    ) -> Result<HttpResponse, RequestError> {
        self.send(Method::HEAD, url, None, headers, options).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: impl Into<Vec<u8>>,
        headers: HeaderMap,
        options: SendOptions,
    ) -> Result<HttpResponse, RequestError> {
        self.send(Method::PUT, url, Some(body.into()), headers, options)
            .await
    }

    pub async fn delete(
        &self,
        url: &str,
        headers: HeaderMap,
        options: SendOptions,
    ) -> Result<HttpResponse, RequestError> {
        self.send(Method::DELETE, url, None, headers, options).await
    }

    pub async fn options(
        &self,
        url: &str,
        headers: HeaderMap,
        options: SendOptions,
    ) -> Result<HttpResponse, RequestError> {
        self.send(Method::OPTIONS, url, None, headers, options)
            .await
    }

    /// Parses and sends a raw request. Cache and grep are disabled.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidRawRequest`] when the head cannot be
    /// parsed, otherwise the same errors as [`send`](Self::send).
    pub async fn send_raw(
        &self,
        head: &str,
        body: &[u8],
        fix_content_length: bool,
    ) -> Result<HttpResponse, RequestError> {
        let parsed = parse_raw_request(head, body, fix_content_length)?;
        let url = check_uri(parsed.url().as_str())?;

        let options = SendOptions {
            cache: false,
            grep: false,
            ..Default::default()
        };
        let request = HttpRequest::new(parsed.method().clone(), url)
            .with_headers(self.merge_headers(parsed.headers().clone()))
            .with_body(parsed.body().to_vec())
            .with_options(options);
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        self.check_stop().await?;
        if self.control.is_paused() {
            debug!("Scan paused, holding {} {}", request.method(), request.url());
            self.control.wait_while_paused().await;
            self.check_stop().await?;
        }

        // Unique per send, so each check and adjust interval fires exactly once
        let total_requests = self.total_requests.fetch_add(1, Ordering::SeqCst);
        self.monitor
            .should_pause_before_send(total_requests, &self.history)
            .await;

        let host = request.host();
        if !request.options().exploit_mode {
            self.rate_limiter.throttle().await;
            self.timeouts
                .auto_adjust(&host, total_requests, &self.history)
                .await;
        }

        let mut request = apply_modifiers(&self.modifiers, request);
        let debugging_id = match request.options().debugging_id.clone() {
            Some(id) => id,
            None => {
                let id = format!(
                    "dbg-{}",
                    self.next_debugging_id.fetch_add(1, Ordering::SeqCst)
                );
                request.options_mut().debugging_id = Some(id.clone());
                id
            }
        };

        let policy = self.retry_policy();
        debug!(
            "[{}] {} {} (timeout {:.2}s)",
            debugging_id,
            request.method(),
            request.url(),
            policy.effective_timeout(&request).await.as_secs_f64()
        );

        let result = policy.send_with_retry(&request).await;

        if let Some(advisor) = &self.pool_advisor {
            advisor.advise(self.history.error_rate().await).await;
        }

        let mut response = result?;
        response.set_debugging_id(debugging_id.clone());
        self.rtt_ledger.add(&debugging_id, response.rtt()).await;

        if request.options().grep && is_grep_target(&host, &self.config.target_domains) {
            if let Some(sink) = &self.grep_sink {
                sink.submit(&request, &response);
            }
        }

        Ok(response)
    }

    async fn check_stop(&self) -> Result<(), RequestError> {
        match self.control.stop_error().await {
            Some(stop) => Err(RequestError::ScanMustStop(stop)),
            None => Ok(()),
        }
    }

    fn retry_policy(&self) -> RetryPolicy<'_> {
        RetryPolicy {
            transport: self.transport.as_ref(),
            probe: self.probe.as_ref(),
            history: &self.history,
            timeouts: &self.timeouts,
            control: &self.control,
            error_stats: &self.error_stats,
            max_retries: self.config.max_retries,
        }
    }

    /// Default headers overlaid with the per-call ones.
    fn merge_headers(&self, headers: HeaderMap) -> HeaderMap {
        let mut merged = self.default_headers.clone();
        let mut current = None;
        for (name, value) in headers {
            // HeaderMap iteration yields None for repeated values of one name
            if let Some(name) = name {
                merged.remove(&name);
                current = Some(name);
            }
            if let Some(name) = &current {
                merged.append(name.clone(), value);
            }
        }
        merged
    }

    /// Pauses (`true`) or resumes (`false`) every sender.
    pub fn pause(&self, paused: bool) {
        info!("{} the scan", if paused { "Pausing" } else { "Resuming" });
        self.control.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Stops the scan on user request. Every following send fails with
    /// [`ScanStopError::UserRequest`](crate::ScanStopError::UserRequest),
    /// unless another stop error was installed first.
    pub async fn stop(&self) {
        let stop = self.control.request_stop().await;
        info!("Stopping the scan: {}", stop);
    }

    /// The installed stop error, if the scan was stopped.
    pub async fn stop_error(&self) -> Option<Arc<crate::ScanStopError>> {
        self.control.stop_error().await
    }

    /// Clears the pause flag and the stop error.
    pub async fn clear(&self) {
        self.control.clear().await;
    }

    /// Resets every piece of scan state: control flags, outcome history,
    /// per-host timeouts, RTT ledger, counters.
    pub async fn end(&self) {
        self.clear().await;
        self.history.reset().await;
        self.timeouts.clear_all().await;
        self.monitor.reset().await;
        self.rtt_ledger.clear().await;
        self.error_stats.reset();
        self.total_requests.store(0, Ordering::SeqCst);
        debug!("Dispatcher state reset");
    }

    /// Prepares the dispatcher for a new scan.
    pub async fn restart(&self) {
        self.end().await;
    }

    /// Requests counted since the last reset (retries are not counted).
    pub fn total_requests(&self) -> usize {
        self.total_requests.load(Ordering::SeqCst)
    }

    /// Error rate of the outcome history, in percent.
    pub async fn error_rate(&self) -> f64 {
        self.history.error_rate().await
    }

    /// Average RTT of the latest successful requests to `host`.
    pub async fn average_rtt(&self, host: &str) -> Option<Duration> {
        self.history
            .average_rtt(host, crate::config::ADJUST_LIMIT)
            .await
            .0
    }

    /// Timeout currently applied to `host`.
    pub async fn timeout_for(&self, host: &str) -> Duration {
        self.timeouts.get_timeout(host).await
    }

    /// Total RTT of the requests sent with `debugging_id`.
    pub async fn rtt_for(&self, debugging_id: &str) -> Option<Duration> {
        self.rtt_ledger.get(debugging_id).await
    }

    /// Failure counts per transport error kind.
    pub fn error_stats(&self) -> &ErrorStats {
        &self.error_stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Accepts only `http` and `https` URLs.
fn check_uri(url: &str) -> Result<Url, RequestError> {
    let parsed = Url::parse(url).map_err(|_| RequestError::UnsupportedUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(RequestError::UnsupportedUrl(url.to_string())),
    }
}
