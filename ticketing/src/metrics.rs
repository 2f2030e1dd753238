//! Business metrics for the ticket ledger.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `ticketing_events_created_total` - Events created
//! - `ticketing_events_cancelled_total` - Events cancelled
//! - `ticketing_tickets_minted_total` - Tickets sold
//! - `ticketing_revenue_units_total` - Payment units taken into escrow
//! - `ticketing_refunds_total{path}` - Refunds paid, by path (`voluntary`, `cancellation`)
//! - `ticketing_refunded_units_total` - Payment units paid back
//! - `ticketing_commands_rejected_total{operation, kind}` - Rejected commands

use crate::types::Money;
use metrics::describe_counter;

/// Register descriptions for every business metric.
///
/// Call once at startup after installing a recorder.
pub fn register_business_metrics() {
    describe_counter!(
        "ticketing_events_created_total",
        "Total number of events created"
    );
    describe_counter!(
        "ticketing_events_cancelled_total",
        "Total number of events cancelled"
    );
    describe_counter!(
        "ticketing_tickets_minted_total",
        "Total number of tickets minted"
    );
    describe_counter!(
        "ticketing_revenue_units_total",
        "Total payment units received for minted tickets"
    );
    describe_counter!(
        "ticketing_refunds_total",
        "Total number of refunds paid, by path (voluntary, cancellation)"
    );
    describe_counter!(
        "ticketing_refunded_units_total",
        "Total payment units paid back through refunds"
    );
    describe_counter!(
        "ticketing_commands_rejected_total",
        "Total number of rejected commands by operation and error kind"
    );

    tracing::info!("Business metrics registered");
}

/// Saturating conversion for counters, which are `u64`
fn units(amount: Money) -> u64 {
    u64::try_from(amount.units()).unwrap_or(u64::MAX)
}

/// Record an event created
pub fn record_event_created() {
    metrics::counter!("ticketing_events_created_total").increment(1);
}

/// Record an event cancelled
pub fn record_event_cancelled() {
    metrics::counter!("ticketing_events_cancelled_total").increment(1);
}

/// Record a ticket minted at `price`
pub fn record_ticket_minted(price: Money) {
    metrics::counter!("ticketing_tickets_minted_total").increment(1);
    metrics::counter!("ticketing_revenue_units_total").increment(units(price));
    tracing::debug!(%price, "Recorded ticket_minted metric");
}

/// Record a refund of `amount`
///
/// `path` is `voluntary` for refunds before the start and `cancellation` for
/// refunds on cancelled events.
pub fn record_refund(path: &'static str, amount: Money) {
    metrics::counter!("ticketing_refunds_total", "path" => path).increment(1);
    metrics::counter!("ticketing_refunded_units_total").increment(units(amount));
    tracing::debug!(path, %amount, "Recorded refund metric");
}

/// Record a rejected command
pub fn record_rejection(operation: &'static str, kind: &'static str) {
    metrics::counter!(
        "ticketing_commands_rejected_total",
        "operation" => operation,
        "kind" => kind
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_a_recorder_is_a_no_op() {
        register_business_metrics();
        record_event_created();
        record_ticket_minted(Money::from_units(10));
        record_refund("voluntary", Money::from_units(10));
        record_rejection("mint_ticket", "sold_out");
    }

    #[test]
    fn oversized_amounts_saturate() {
        assert_eq!(units(Money::from_units(u128::MAX)), u64::MAX);
        assert_eq!(units(Money::from_units(42)), 42);
    }
}
