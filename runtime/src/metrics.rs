//! Metric names and descriptions recorded by the store.
//!
//! The store only emits through the `metrics` facade. Installing a recorder
//! (Prometheus, statsd, ...) is the host application's decision; without one
//! every call below is a no-op.

use metrics::{describe_counter, describe_histogram};

/// Actions processed by a store, labelled `outcome = accepted | rejected`.
pub const STORE_ACTIONS_TOTAL: &str = "store_actions_total";

/// Follow-up actions produced by effects and fed back through the reducer.
pub const STORE_FEEDBACK_ACTIONS_TOTAL: &str = "store_feedback_actions_total";

/// Time spent holding the state lock while reducing, in seconds.
pub const STORE_REDUCE_DURATION_SECONDS: &str = "store_reduce_duration_seconds";

/// Register descriptions for every metric the store records.
///
/// Call once after installing a recorder so exporters can show help text.
pub fn register_metrics() {
    describe_counter!(
        STORE_ACTIONS_TOTAL,
        "Number of actions sent to a store, by outcome"
    );
    describe_counter!(
        STORE_FEEDBACK_ACTIONS_TOTAL,
        "Number of actions produced by effects and fed back into the reducer"
    );
    describe_histogram!(
        STORE_REDUCE_DURATION_SECONDS,
        "Time spent reducing a single action under the state lock"
    );
}

pub(crate) fn record_outcome(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    metrics::counter!(STORE_ACTIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_feedback() {
    metrics::counter!(STORE_FEEDBACK_ACTIONS_TOTAL).increment(1);
}

pub(crate) fn record_reduce_duration(seconds: f64) {
    metrics::histogram!(STORE_REDUCE_DURATION_SECONDS).record(seconds);
}
