//! `reqwest` backed transport.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use lru::LruCache;
use reqwest::{Method, StatusCode};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::Transport;
use crate::config::EngineConfig;
use crate::dispatcher::{HttpRequest, HttpResponse};
use crate::error_handling::{categorize_reqwest_error, InitializationError, TransportError};
use crate::initialization::{init_client, init_redirect_client};

/// Responses kept for requests sent with `cache = true`.
const RESPONSE_CACHE_CAPACITY: usize = 256;

/// Sends requests with a pair of `reqwest` clients, one following redirects
/// and one that does not.
///
/// By default every 4xx/5xx status is reported as an application failure, so
/// a target answering nothing but errors pauses and eventually stops the scan
/// like an unreachable one. With [`error_for_status`](Self::error_for_status)
/// disabled those statuses are plain responses, except `407 Proxy
/// Authentication Required` which is always a proxy failure.
///
/// `GET` and `HEAD` requests sent with the `cache` option are answered from an
/// in-memory LRU cache when the same request was already answered.
pub struct HttpTransport {
    client: Arc<reqwest::Client>,
    no_redirect_client: Arc<reqwest::Client>,
    error_for_status: bool,
    cache: Mutex<LruCache<String, HttpResponse>>,
}

impl HttpTransport {
    /// Builds both clients from the engine configuration.
    ///
    /// # Errors
    ///
    /// Returns an `InitializationError` if a client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self, InitializationError> {
        Ok(Self::from_clients(
            init_client(config)?,
            init_redirect_client(config)?,
        ))
    }

    /// Uses pre-built clients (`client` follows redirects, `no_redirect_client`
    /// must not).
    pub fn from_clients(client: Arc<reqwest::Client>, no_redirect_client: Arc<reqwest::Client>) -> Self {
        let capacity = NonZeroUsize::new(RESPONSE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        HttpTransport {
            client,
            no_redirect_client,
            error_for_status: true,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Reports 4xx/5xx statuses as transport failures (on by default).
    pub fn error_for_status(mut self, enabled: bool) -> Self {
        self.error_for_status = enabled;
        self
    }

    fn status_error(&self, status: StatusCode, url: &url::Url) -> Option<TransportError> {
        let failed = status == StatusCode::PROXY_AUTHENTICATION_REQUIRED
            || (self.error_for_status && (status.is_client_error() || status.is_server_error()));

        failed.then(|| TransportError::http_status(status.as_u16(), format!("{status} for {url}")))
    }
}

/// Cache key for cacheable requests, `None` for the rest.
fn cache_key(request: &HttpRequest) -> Option<String> {
    let cacheable = request.options().cache
        && (*request.method() == Method::GET || *request.method() == Method::HEAD);
    cacheable.then(|| {
        format!(
            "{} {} {}",
            request.method(),
            request.url(),
            request.options().follow_redirects
        )
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn do_request(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let key = cache_key(request);
        if let Some(key) = &key {
            if let Some(hit) = self.cache.lock().await.get(key) {
                debug!("{} {} answered from cache", request.method(), request.url());
                return Ok(hit.clone().cached());
            }
        }

        let client = if request.options().follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        let mut builder = client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone())
            .timeout(timeout);
        if !request.body().is_empty() {
            builder = builder.body(request.body().to_vec());
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;

        let status = response.status();
        let final_url = response.url().clone();
        if let Some(error) = self.status_error(status, &final_url) {
            return Err(error);
        }

        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;
        let rtt = started.elapsed();

        debug!(
            "{} {} returned {} ({} bytes) in {:.3}s",
            request.method(),
            request.url(),
            status,
            body.len(),
            rtt.as_secs_f64()
        );

        let response = HttpResponse::new(status, headers, body.to_vec(), final_url, rtt);
        if let Some(key) = key {
            self.cache.lock().await.put(key, response.clone());
        }
        Ok(response)
    }
}
