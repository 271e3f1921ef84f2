//! HTTP client initialization.
//!
//! This module provides functions to initialize the `reqwest` clients used by
//! [`HttpTransport`](crate::transport::HttpTransport). Timeouts are not set here;
//! the engine passes a per-request timeout on every call.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::ClientBuilder;

use crate::config::{ConfigError, EngineConfig};
use crate::error_handling::InitializationError;

/// Maximum redirect hops followed by the redirect-following client.
const MAX_REDIRECTS: usize = 10;

/// Initializes the HTTP client that follows redirects.
///
/// Creates a `reqwest::Client` configured with:
/// - User-Agent header from the engine configuration
/// - Default headers from the engine configuration
/// - Redirect following enabled (up to 10 hops)
/// - Rustls TLS backend (no native TLS)
///
/// # Errors
///
/// Returns an `InitializationError` if a default header is invalid or the
/// client cannot be built.
pub fn init_client(config: &EngineConfig) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = base_builder(config)?
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()?;
    Ok(Arc::new(client))
}

/// Initializes the HTTP client that never follows redirects.
///
/// Used for requests sent with `follow_redirects = false` so callers see the
/// `3xx` response itself.
///
/// # Errors
///
/// Returns an `InitializationError` if a default header is invalid or the
/// client cannot be built.
pub fn init_redirect_client(
    config: &EngineConfig,
) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = base_builder(config)?
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(Arc::new(client))
}

fn base_builder(config: &EngineConfig) -> Result<ClientBuilder, InitializationError> {
    Ok(ClientBuilder::new()
        .user_agent(config.user_agent.clone())
        .default_headers(default_header_map(&config.default_headers)?))
}

/// Converts configured `(name, value)` pairs into a `HeaderMap`.
pub(crate) fn default_header_map(headers: &[(String, String)]) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(format!("{name}: {value}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| ConfigError::InvalidHeader(format!("{name}: {value}")))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_header_map() {
        let map = default_header_map(&[
            ("Accept-Language".to_string(), "en-US".to_string()),
            ("X-Scan".to_string(), "1".to_string()),
        ])
        .unwrap();
        assert_eq!(map.get("accept-language").unwrap(), "en-US");
        assert_eq!(map.get("x-scan").unwrap(), "1");
    }

    #[test]
    fn test_default_header_map_rejects_invalid_name() {
        let result = default_header_map(&[("Bad Name".to_string(), "v".to_string())]);
        assert!(matches!(result, Err(ConfigError::InvalidHeader(_))));
    }

    #[test]
    fn test_clients_build_from_default_config() {
        let config = EngineConfig::default();
        assert!(init_client(&config).is_ok());
        assert!(init_redirect_client(&config).is_ok());
    }
}
