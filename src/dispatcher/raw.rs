//! Raw HTTP request parsing.
//!
//! Turns a request head as typed by a user (or captured by a proxy) into an
//! [`HttpRequest`]:
//!
//! ```text
//! POST /login.php HTTP/1.1
//! Host: target.test
//! Content-Type: application/x-www-form-urlencoded
//! ```

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, HOST};
use reqwest::Method;
use url::Url;

use super::request::HttpRequest;
use crate::error_handling::RequestError;

/// Parses `head` and attaches `body`.
///
/// The request URI may be absolute, or a path resolved against the `Host`
/// header over plain HTTP. With `fix_content_length` any `Content-Length`
/// header is replaced by the real body length.
///
/// # Errors
///
/// Returns [`RequestError::InvalidRawRequest`] for a malformed request line,
/// header or URI.
pub fn parse_raw_request(
    head: &str,
    body: &[u8],
    fix_content_length: bool,
) -> Result<HttpRequest, RequestError> {
    let mut lines = head.lines().map(str::trim_end).filter(|l| !l.is_empty());

    let request_line = lines
        .next()
        .ok_or_else(|| invalid("empty request head"))?;
    let mut parts = request_line.split_whitespace();
    let (method, uri) = match (parts.next(), parts.next()) {
        (Some(method), Some(uri)) => (method, uri),
        _ => return Err(invalid(format!("malformed request line \"{request_line}\""))),
    };
    if let Some(version) = parts.next() {
        if !version.starts_with("HTTP/") {
            return Err(invalid(format!("unsupported protocol version \"{version}\"")));
        }
    }

    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| invalid(format!("invalid method \"{method}\"")))?;

    let mut headers = HeaderMap::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| invalid(format!("malformed header line \"{line}\"")))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| invalid(format!("invalid header name \"{}\"", name.trim())))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| invalid(format!("invalid value for header \"{name}\"")))?;
        headers.append(name, value);
    }

    let url = resolve_uri(uri, &headers)?;

    if fix_content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    }

    Ok(HttpRequest::new(method, url)
        .with_headers(headers)
        .with_body(body.to_vec()))
}

fn resolve_uri(uri: &str, headers: &HeaderMap) -> Result<Url, RequestError> {
    if let Ok(url) = Url::parse(uri) {
        return Ok(url);
    }

    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| invalid(format!("relative URI \"{uri}\" without a Host header")))?;

    Url::parse(&format!("http://{host}{uri}"))
        .map_err(|e| invalid(format!("invalid URI \"{uri}\": {e}")))
}

fn invalid(message: impl Into<String>) -> RequestError {
    RequestError::InvalidRawRequest(message.into())
}
