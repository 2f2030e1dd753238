//! Outbound notifications.
//!
//! Consumed by the email and analytics collaborators. Delivery is
//! fire-and-forget: a failed publish is logged and dropped, and never affects
//! the operation that produced it.

use crate::actions::LedgerAction;
use crate::environment::LedgerEnvironment;
use crate::types::{EventId, Identity, Money, TicketId};
use serde::{Deserialize, Serialize};
use ticket_ledger_core::effect::Effect;
use ticket_ledger_core::event::{Event, SerializedEvent};
use ticket_ledger_core::publish_event;

/// A notification for external consumers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// A new event is on sale
    EventCreated {
        /// Event id
        event_id: EventId,
        /// Creator
        organizer: Identity,
    },

    /// A ticket was minted
    TicketMinted {
        /// Event id
        event_id: EventId,
        /// Ticket id
        ticket_id: TicketId,
        /// Holder
        owner: Identity,
        /// Amount paid
        price: Money,
    },

    /// A ticket changed hands
    TicketTransferred {
        /// Event id
        event_id: EventId,
        /// Ticket id
        ticket_id: TicketId,
        /// Previous holder
        from: Identity,
        /// New holder
        to: Identity,
    },

    /// The organizer marked a ticket at the gate
    TicketUsed {
        /// Event id
        event_id: EventId,
        /// Ticket id
        ticket_id: TicketId,
        /// Holder
        holder: Identity,
        /// New flag value
        used: bool,
    },

    /// An event was cancelled; its tickets are refundable
    EventCancelled {
        /// Event id
        event_id: EventId,
        /// Organizer
        organizer: Identity,
        /// Tickets still outstanding
        outstanding_tickets: u32,
    },

    /// A refund was paid and the ticket burned
    RefundIssued {
        /// Event id
        event_id: EventId,
        /// Burned ticket
        ticket_id: TicketId,
        /// Who was paid
        recipient: Identity,
        /// Amount paid
        amount: Money,
    },

    /// Someone queued for a sold-out event
    WaitlistJoined {
        /// Event id
        event_id: EventId,
        /// Who joined
        user: Identity,
        /// 1-based position in the queue
        position: usize,
    },
}

impl Notification {
    /// The event concerned
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::EventCreated { event_id, .. }
            | Self::TicketMinted { event_id, .. }
            | Self::TicketTransferred { event_id, .. }
            | Self::TicketUsed { event_id, .. }
            | Self::EventCancelled { event_id, .. }
            | Self::RefundIssued { event_id, .. }
            | Self::WaitlistJoined { event_id, .. } => *event_id,
        }
    }

    /// The ticket concerned, if any
    #[must_use]
    pub const fn ticket_id(&self) -> Option<TicketId> {
        match self {
            Self::TicketMinted { ticket_id, .. }
            | Self::TicketTransferred { ticket_id, .. }
            | Self::TicketUsed { ticket_id, .. }
            | Self::RefundIssued { ticket_id, .. } => Some(*ticket_id),
            Self::EventCreated { .. }
            | Self::EventCancelled { .. }
            | Self::WaitlistJoined { .. } => None,
        }
    }

    /// Routing metadata carried outside the payload
    #[must_use]
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "event_id": self.event_id().value(),
            "ticket_id": self.ticket_id().map(TicketId::value),
        })
    }

    /// Build the effect that publishes this notification
    ///
    /// Serialization failures are logged and produce no effect.
    #[must_use]
    pub fn publish(&self, env: &LedgerEnvironment) -> Effect<LedgerAction> {
        let event_type = self.event_type();
        match SerializedEvent::from_event(self, Some(self.metadata())) {
            Ok(event) => publish_event! {
                bus: env.event_bus,
                topic: env.notification_topic,
                event: event,
                on_success: || None,
                on_error: |error| {
                    tracing::warn!(%error, notification = event_type, "Notification dropped");
                    None
                }
            },
            Err(error) => {
                tracing::warn!(%error, notification = event_type, "Notification not serializable");
                Effect::None
            },
        }
    }
}

impl Event for Notification {
    fn event_type(&self) -> &'static str {
        match self {
            Self::EventCreated { .. } => "EventCreated.v1",
            Self::TicketMinted { .. } => "TicketMinted.v1",
            Self::TicketTransferred { .. } => "TicketTransferred.v1",
            Self::TicketUsed { .. } => "TicketUsed.v1",
            Self::EventCancelled { .. } => "EventCancelled.v1",
            Self::RefundIssued { .. } => "RefundIssued.v1",
            Self::WaitlistJoined { .. } => "WaitlistJoined.v1",
        }
    }
}
