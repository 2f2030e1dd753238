//! Rejection reasons returned by every ledger operation.

use crate::types::{EventId, Role, TicketId};
use thiserror::Error;

/// Why an operation was refused.
///
/// Every variant is returned synchronously to the caller and means that the
/// ledger state was left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The caller lacks the required role or does not own the resource
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Unknown event, ticket or waitlist entry
    #[error("not found: {0}")]
    NotFound(String),

    /// Start not strictly in the future, or end not after start
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Zero capacity, or capacity above the configured ceiling
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),

    /// Payment differs from the ticket price
    #[error("incorrect payment amount: expected {expected}, received {received}")]
    IncorrectPayment {
        /// Ticket price
        expected: u128,
        /// What the caller paid
        received: u128,
    },

    /// No slot left for this event
    #[error("event {0} sold out")]
    SoldOut(EventId),

    /// The event has ended or was cancelled
    #[error("event {0} has ended")]
    EventEnded(EventId),

    /// Transfers close when the event starts
    #[error("transfers not allowed after event {0} starts")]
    TransferWindowClosed(EventId),

    /// Refunds close when the event starts, unless it was cancelled
    #[error("refund period for event {0} has ended")]
    RefundWindowClosed(EventId),

    /// Waitlists only open once an event is sold out
    #[error("event {0} is not sold out")]
    NotSoldOut(EventId),

    /// The caller is already queued for this event
    #[error("already on the waitlist for event {0}")]
    AlreadyWaitlisted(EventId),

    /// Transfer recipient is not a usable identity
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The cancelled-event refund path was used on a live event
    #[error("event {0} is not cancelled")]
    EventNotCancelled(EventId),

    /// Cancellation is one-way
    #[error("event {0} is already cancelled")]
    AlreadyCancelled(EventId),

    /// The ledger must keep at least one administrator
    #[error("cannot remove the last holder of {0}")]
    LastAdmin(Role),

    /// The treasury refused to pay; the ticket was not burned
    #[error("payout for ticket {ticket_id} failed: {reason}")]
    PayoutFailed {
        /// Ticket whose refund was attempted
        ticket_id: TicketId,
        /// Treasury's explanation
        reason: String,
    },

    /// A counter or balance would overflow
    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    /// The reducer answered an operation with the wrong kind of output
    #[error("{0} produced an unexpected output")]
    UnexpectedOutput(&'static str),
}

impl LedgerError {
    /// Stable machine-readable name, used as a metric label and log field
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::InvalidSchedule(_) => "invalid_schedule",
            Self::InvalidCapacity(_) => "invalid_capacity",
            Self::IncorrectPayment { .. } => "incorrect_payment",
            Self::SoldOut(_) => "sold_out",
            Self::EventEnded(_) => "event_ended",
            Self::TransferWindowClosed(_) => "transfer_window_closed",
            Self::RefundWindowClosed(_) => "refund_window_closed",
            Self::NotSoldOut(_) => "not_sold_out",
            Self::AlreadyWaitlisted(_) => "already_waitlisted",
            Self::InvalidRecipient(_) => "invalid_recipient",
            Self::EventNotCancelled(_) => "event_not_cancelled",
            Self::AlreadyCancelled(_) => "already_cancelled",
            Self::LastAdmin(_) => "last_admin",
            Self::PayoutFailed { .. } => "payout_failed",
            Self::Overflow(_) => "overflow",
            Self::UnexpectedOutput(_) => "unexpected_output",
        }
    }

    pub(crate) fn event_not_found(event_id: EventId) -> Self {
        Self::NotFound(format!("event {event_id}"))
    }

    pub(crate) fn ticket_not_found(ticket_id: TicketId) -> Self {
        Self::NotFound(format!("ticket {ticket_id}"))
    }
}

/// Result alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
