//! Response representation.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use url::Url;

/// An HTTP response returned by the transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    url: Url,
    rtt: Duration,
    debugging_id: Option<String>,
    from_cache: bool,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>, url: Url, rtt: Duration) -> Self {
        HttpResponse {
            status,
            headers,
            body,
            url,
            rtt,
            debugging_id: None,
            from_cache: false,
        }
    }

    /// Marks the response as served from the transport cache.
    pub fn cached(mut self) -> Self {
        self.from_cache = true;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Final URL (after redirects, when followed).
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Time between sending the request and receiving the full response.
    pub fn rtt(&self) -> Duration {
        self.rtt
    }

    pub fn debugging_id(&self) -> Option<&str> {
        self.debugging_id.as_deref()
    }

    pub(crate) fn set_debugging_id(&mut self, id: impl Into<String>) {
        self.debugging_id = Some(id.into());
    }

    pub fn from_cache(&self) -> bool {
        self.from_cache
    }
}
