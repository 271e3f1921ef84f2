//! Scan control state: user pause/stop and the sticky stop error.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::error_handling::ScanStopError;

/// Pause/stop flags published to every waiting sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub paused: bool,
    pub stopped: bool,
}

/// Shared scan control.
///
/// Pause is a `watch` channel: paused senders wait for a state change rather
/// than polling. The stop error is sticky: the first one installed is returned
/// to every caller until [`clear`](Self::clear).
pub struct ScanControl {
    state: watch::Sender<ControlState>,
    stop_error: RwLock<Option<Arc<ScanStopError>>>,
}

impl ScanControl {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ControlState::default());
        ScanControl {
            state,
            stop_error: RwLock::new(None),
        }
    }

    /// The installed stop error, if any.
    pub async fn stop_error(&self) -> Option<Arc<ScanStopError>> {
        self.stop_error.read().await.clone()
    }

    /// Installs `error` unless a stop error is already present.
    ///
    /// Returns whichever error is installed afterwards; the first writer wins.
    pub async fn install_stop(&self, error: ScanStopError) -> Arc<ScanStopError> {
        let mut stop_error = self.stop_error.write().await;
        match stop_error.as_ref() {
            Some(existing) => Arc::clone(existing),
            None => {
                let installed = Arc::new(error);
                *stop_error = Some(Arc::clone(&installed));
                installed
            }
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.send_modify(|state| state.paused = paused);
    }

    pub fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    /// Handles a user stop: installs [`ScanStopError::UserRequest`] and wakes
    /// paused senders so they can observe it.
    pub async fn request_stop(&self) -> Arc<ScanStopError> {
        let installed = self.install_stop(ScanStopError::UserRequest).await;
        self.state.send_modify(|state| state.stopped = true);
        installed
    }

    /// Suspends the calling task while the scan is paused and not stopped.
    pub async fn wait_while_paused(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here
        let _ = receiver
            .wait_for(|state| !state.paused || state.stopped)
            .await;
    }

    /// Drops the stop error and both flags.
    pub async fn clear(&self) {
        *self.stop_error.write().await = None;
        self.state.send_replace(ControlState::default());
    }
}

impl Default for ScanControl {
    fn default() -> Self {
        Self::new()
    }
}
