//! End of scan reporting.

use log::info;

use crate::error_handling::ErrorStats;

/// Logs failure counts per transport error kind, most frequent first.
pub fn print_error_statistics(error_stats: &ErrorStats) {
    let total = error_stats.total();
    if total == 0 {
        return;
    }

    info!("Failed attempts ({} total):", total);
    for (kind, count) in error_stats.non_zero() {
        info!("   {}: {}", kind.as_str(), count);
    }
}
