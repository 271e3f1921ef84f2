//! Transport seam.
//!
//! The engine never opens sockets itself. Everything goes through a
//! [`Transport`]; [`HttpTransport`] is the `reqwest` backed implementation and
//! tests plug in scripted ones.

mod http;
mod probe;

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::dispatcher::{HttpRequest, HttpResponse};
use crate::error_handling::TransportError;

pub use http::HttpTransport;
pub use probe::TransportProbe;

/// Sends exactly one HTTP request, with no retries of its own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the request, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a categorized [`TransportError`] for network failures, and for
    /// application failures the transport chooses to report (HTTP error
    /// statuses, proxy or authentication failures).
    async fn do_request(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// Checks whether the site root still answers.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns `true` when `base_url` answered within `timeout`.
    async fn is_root_reachable(&self, base_url: &Url, timeout: Duration) -> bool;
}
