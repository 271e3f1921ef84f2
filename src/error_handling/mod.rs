//! Error handling and failure statistics.
//!
//! This module provides:
//! - Caller facing request errors, including the sticky scan stop error
//! - The transport error taxonomy and its mapping from `reqwest` errors
//! - The resend strategy for failed requests
//! - Failure statistics per transport error kind

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{
    categorize_io_error, categorize_reqwest_error, get_retry_strategy, update_error_stats,
};
pub use stats::ErrorStats;
pub use types::{
    InitializationError, RequestError, ScanStopError, TransportError, TransportErrorKind,
};
