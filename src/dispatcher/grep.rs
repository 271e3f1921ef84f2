//! Hand-off of responses to passive analysis.

use log::debug;
use tokio::sync::mpsc::UnboundedSender;

use super::request::HttpRequest;
use super::response::HttpResponse;

/// Receives every successful (request, response) pair marked for grepping.
pub trait GrepSink: Send + Sync {
    fn submit(&self, request: &HttpRequest, response: &HttpResponse);
}

impl GrepSink for UnboundedSender<(HttpRequest, HttpResponse)> {
    fn submit(&self, request: &HttpRequest, response: &HttpResponse) {
        if self.send((request.clone(), response.clone())).is_err() {
            debug!("Grep consumer is gone, dropping {}", request.url());
        }
    }
}

/// Whether a response from `domain` goes to the grep sink.
///
/// An empty `target_domains` list accepts every domain.
pub(crate) fn is_grep_target(domain: &str, target_domains: &[String]) -> bool {
    target_domains.is_empty()
        || target_domains
            .iter()
            .any(|target| target.eq_ignore_ascii_case(domain))
}
