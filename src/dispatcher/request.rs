//! Outbound request representation.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Method;
use url::Url;

/// Per-call send options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    /// Allow the transport to answer from its cache
    pub cache: bool,
    /// Surface the first failure without retrying or recording it
    pub skip_retry: bool,
    /// Per-call timeout override (takes precedence over the per-host value)
    pub timeout: Option<Duration>,
    /// Correlation id; assigned by the dispatcher when missing
    pub debugging_id: Option<String>,
    /// Follow HTTP redirects
    pub follow_redirects: bool,
    /// Bypass rate limiting and timeout auto-adjustment
    pub exploit_mode: bool,
    /// Forward the response to the grep sink
    pub grep: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        SendOptions {
            cache: false,
            skip_retry: false,
            timeout: None,
            debugging_id: None,
            follow_redirects: false,
            exploit_mode: false,
            grep: true,
        }
    }
}

/// An HTTP request as handed to the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Vec<u8>,
    options: SendOptions,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        HttpRequest {
            method,
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
            options: SendOptions::default(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_options(mut self, options: SendOptions) -> Self {
        self.options = options;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn options(&self) -> &SendOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SendOptions {
        &mut self.options
    }

    /// Host name used to key per-host state (timeouts, RTT samples).
    pub fn host(&self) -> String {
        self.url.host_str().unwrap_or_default().to_string()
    }

    /// The site root of the request URL: scheme, host and port with path `/`.
    pub fn base_url(&self) -> Url {
        let mut base = self.url.clone();
        base.set_path("/");
        base.set_query(None);
        base.set_fragment(None);
        base
    }
}
