//! Reporting metrics
//!
//! Counters emitted through the `metrics` facade; with no recorder installed
//! they are no-ops.

use metrics::counter;

/// Records a report the sink accepted.
pub fn record_report(exception: &str, redacted: usize) {
    counter!("error_reporting.reports.sent", 1, "exception" => exception.to_string());

    if redacted > 0 {
        counter!("error_reporting.fields.redacted", redacted as u64);
    }
}

/// Records a report the sink refused.
pub fn record_dropped() {
    counter!("error_reporting.reports.dropped", 1);
}

/// Records an administrative switch.
pub fn record_toggle(enabled: bool) {
    let state = if enabled { "on" } else { "off" };
    counter!("error_reporting.toggles", 1, "state" => state);
}
