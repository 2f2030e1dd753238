//! Ledger facts.
//!
//! Every accepted command becomes zero or one [`LedgerEvent`]. Applying the
//! facts in order is the only way ledger state changes, so the fact history
//! doubles as an audit trail that can rebuild the state.

use crate::types::{EventId, Identity, Money, Role, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticket_ledger_core::event::Event;

/// Something that happened to the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A role was granted
    RoleGranted {
        /// Role granted
        role: Role,
        /// New holder
        account: Identity,
        /// Administrator who granted it
        granted_by: Identity,
    },

    /// A role was revoked or renounced
    RoleRevoked {
        /// Role removed
        role: Role,
        /// Former holder
        account: Identity,
        /// Who removed it (the holder itself when renounced)
        revoked_by: Identity,
    },

    /// An event was created
    EventCreated {
        /// New event id
        event_id: EventId,
        /// Creator
        organizer: Identity,
        /// Off-ledger content reference
        metadata_ref: String,
        /// Start of the event
        start_time: DateTime<Utc>,
        /// End of the event
        end_time: DateTime<Utc>,
        /// Price per ticket
        ticket_price: Money,
        /// Capacity
        max_tickets: u32,
        /// When it was created
        created_at: DateTime<Utc>,
    },

    /// Metadata or schedule changed
    EventUpdated {
        /// Event id
        event_id: EventId,
        /// New content reference
        metadata_ref: String,
        /// New start
        start_time: DateTime<Utc>,
        /// New end
        end_time: DateTime<Utc>,
        /// When it changed
        updated_at: DateTime<Utc>,
    },

    /// The organizer cancelled the event
    EventCancelled {
        /// Event id
        event_id: EventId,
        /// When it was cancelled
        cancelled_at: DateTime<Utc>,
    },

    /// A ticket was issued against payment
    TicketMinted {
        /// New ticket id
        ticket_id: TicketId,
        /// Event admitted to
        event_id: EventId,
        /// First holder
        owner: Identity,
        /// Amount escrowed
        price: Money,
        /// When it was minted
        minted_at: DateTime<Utc>,
    },

    /// Ownership moved
    TicketTransferred {
        /// Ticket id
        ticket_id: TicketId,
        /// Previous holder
        from: Identity,
        /// New holder
        to: Identity,
        /// When it moved
        transferred_at: DateTime<Utc>,
    },

    /// The organizer set the used flag
    TicketUsageMarked {
        /// Ticket id
        ticket_id: TicketId,
        /// New flag value
        used: bool,
        /// When it was marked
        marked_at: DateTime<Utc>,
    },

    /// Payment returned and ticket burned
    TicketRefunded {
        /// Burned ticket
        ticket_id: TicketId,
        /// Its event
        event_id: EventId,
        /// Holder who was paid
        owner: Identity,
        /// Amount paid back
        amount: Money,
        /// Treasury receipt, empty for free tickets
        receipt: Option<String>,
        /// When it was refunded
        refunded_at: DateTime<Utc>,
    },

    /// A user queued for a sold-out event
    WaitlistJoined {
        /// Event waited on
        event_id: EventId,
        /// Who joined
        user: Identity,
        /// Join instant
        joined_at: DateTime<Utc>,
    },

    /// A user left a waitlist
    WaitlistLeft {
        /// Event waited on
        event_id: EventId,
        /// Who left
        user: Identity,
        /// When they left
        left_at: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// The event this fact concerns, if any
    #[must_use]
    pub const fn event_id(&self) -> Option<EventId> {
        match self {
            Self::EventCreated { event_id, .. }
            | Self::EventUpdated { event_id, .. }
            | Self::EventCancelled { event_id, .. }
            | Self::TicketMinted { event_id, .. }
            | Self::TicketRefunded { event_id, .. }
            | Self::WaitlistJoined { event_id, .. }
            | Self::WaitlistLeft { event_id, .. } => Some(*event_id),
            Self::RoleGranted { .. }
            | Self::RoleRevoked { .. }
            | Self::TicketTransferred { .. }
            | Self::TicketUsageMarked { .. } => None,
        }
    }

    /// The ticket this fact concerns, if any
    #[must_use]
    pub const fn ticket_id(&self) -> Option<TicketId> {
        match self {
            Self::TicketMinted { ticket_id, .. }
            | Self::TicketTransferred { ticket_id, .. }
            | Self::TicketUsageMarked { ticket_id, .. }
            | Self::TicketRefunded { ticket_id, .. } => Some(*ticket_id),
            _ => None,
        }
    }
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::RoleGranted { .. } => "RoleGranted.v1",
            Self::RoleRevoked { .. } => "RoleRevoked.v1",
            Self::EventCreated { .. } => "EventCreated.v1",
            Self::EventUpdated { .. } => "EventUpdated.v1",
            Self::EventCancelled { .. } => "EventCancelled.v1",
            Self::TicketMinted { .. } => "TicketMinted.v1",
            Self::TicketTransferred { .. } => "TicketTransferred.v1",
            Self::TicketUsageMarked { .. } => "TicketUsageMarked.v1",
            Self::TicketRefunded { .. } => "TicketRefunded.v1",
            Self::WaitlistJoined { .. } => "WaitlistJoined.v1",
            Self::WaitlistLeft { .. } => "WaitlistLeft.v1",
        }
    }
}
