//! Request modifiers applied before sending.

use std::sync::Arc;

use log::warn;

use super::request::HttpRequest;

/// Rewrites outgoing requests, e.g. to evade naive filtering.
///
/// Modifiers run in ascending [`priority`](Self::priority) order. A modifier
/// that fails is skipped; the request continues unmodified by it.
pub trait RequestModifier: Send + Sync {
    fn name(&self) -> &str;

    /// Lower values run first.
    fn priority(&self) -> i32;

    /// # Errors
    ///
    /// Returns an error when the modifier cannot handle the request.
    fn modify(&self, request: HttpRequest) -> anyhow::Result<HttpRequest>;
}

/// Sorts modifiers by priority, keeping registration order for ties.
pub(crate) fn sort_by_priority(modifiers: &mut [Arc<dyn RequestModifier>]) {
    modifiers.sort_by_key(|m| m.priority());
}

/// Runs every modifier over `request`.
pub(crate) fn apply_modifiers(
    modifiers: &[Arc<dyn RequestModifier>],
    mut request: HttpRequest,
) -> HttpRequest {
    for modifier in modifiers {
        match modifier.modify(request.clone()) {
            Ok(modified) => request = modified,
            Err(e) => warn!(
                "Request modifier {} failed on {}: {:#}",
                modifier.name(),
                request.url(),
                e
            ),
        }
    }
    request
}
