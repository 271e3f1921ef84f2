//! Rolling history of recent request outcomes.
//!
//! Every network attempt made by the engine leaves one record here. The history
//! drives the error rate, the stop-pattern detection and the RTT averages used
//! to tune per-host timeouts. It starts full of synthetic successes so the first
//! checks of a scan behave like those of a healthy one.

mod outcome;
mod window;

pub use outcome::OutcomeRecord;
pub use window::{OutcomeHistory, OutcomeWindow};
