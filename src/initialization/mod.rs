//! Resource initialization.
//!
//! This module provides functions to initialize shared resources:
//! - HTTP clients for the `reqwest` transport
//! - The logger used by the command line front-end
//! - The semaphore bounding concurrent callers
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

use std::sync::Arc;

use tokio::sync::Semaphore;

// Re-export public API
pub(crate) use client::default_header_map;
pub use client::{init_client, init_redirect_client};
pub use logger::init_logger_with;

/// Initializes a semaphore for controlling concurrency.
///
/// The command line front-end uses it to bound the number of in-flight
/// requests; the worker pool advisor resizes it through
/// [`SemaphorePool`](crate::pool_advisor::SemaphorePool).
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}
