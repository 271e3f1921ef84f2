//! Default reachability probe.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use url::Url;

use super::{ReachabilityProbe, Transport};
use crate::dispatcher::{HttpRequest, SendOptions};

/// Probes the site root with a single GET through a [`Transport`].
///
/// The probe is neither retried nor recorded as a regular outcome.
pub struct TransportProbe {
    transport: Arc<dyn Transport>,
}

impl TransportProbe {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        TransportProbe { transport }
    }
}

#[async_trait]
impl ReachabilityProbe for TransportProbe {
    async fn is_root_reachable(&self, base_url: &Url, timeout: Duration) -> bool {
        let request = HttpRequest::new(Method::GET, base_url.clone()).with_options(SendOptions {
            skip_retry: true,
            grep: false,
            ..Default::default()
        });

        match self.transport.do_request(&request, timeout).await {
            Ok(response) => {
                debug!(
                    "Reachability probe to {} answered {} in {:.2}s",
                    base_url,
                    response.status(),
                    response.rtt().as_secs_f64()
                );
                true
            }
            Err(e) => {
                debug!("Reachability probe to {} failed: {}", base_url, e);
                false
            }
        }
    }
}
