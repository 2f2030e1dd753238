//! Query/View Layer.
//!
//! Read-only aggregation over the registry, ticket ledger and waitlists.
//! Unknown events and burned tickets answer `NotFound`.

use crate::error::{LedgerError, LedgerResult};
use crate::registry::EventRecord;
use crate::state::LedgerState;
use crate::tickets::{EventInventory, Ticket};
use crate::types::{EventId, EventStatus, Identity, Money, Role, TicketId};
use crate::waitlist::WaitlistEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event joined with its inventory, as seen at one instant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    /// Descriptive fields
    #[serde(flatten)]
    pub record: EventRecord,
    /// Capacity
    pub max_tickets: u32,
    /// Live tickets
    pub tickets_sold: u32,
    /// `max_tickets - tickets_sold`
    pub available_tickets: u32,
    /// Status at the time of the query
    pub status: EventStatus,
}

impl LedgerState {
    /// Event record plus inventory and status at `now`
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown events.
    pub fn get_event(&self, event_id: EventId, now: DateTime<Utc>) -> LedgerResult<EventView> {
        let record = self.registry.require(event_id)?;
        let inventory = self.inventory_of(event_id)?;
        Ok(EventView {
            record: record.clone(),
            max_tickets: inventory.max_tickets,
            tickets_sold: inventory.tickets_sold,
            available_tickets: inventory.available(),
            status: record.status(now),
        })
    }

    /// A live ticket
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown or burned tickets.
    pub fn get_ticket(&self, ticket_id: TicketId) -> LedgerResult<Ticket> {
        self.tickets.require(ticket_id).cloned()
    }

    /// Current holder of a ticket
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown or burned tickets.
    pub fn owner_of(&self, ticket_id: TicketId) -> LedgerResult<Identity> {
        self.tickets
            .require(ticket_id)
            .map(|ticket| ticket.owner.clone())
    }

    /// Whether every slot of the event is taken
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown events.
    pub fn is_sold_out(&self, event_id: EventId) -> LedgerResult<bool> {
        self.inventory_of(event_id)
            .map(EventInventory::is_sold_out)
    }

    /// `max_tickets - tickets_sold`
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown events.
    pub fn available_tickets(&self, event_id: EventId) -> LedgerResult<u32> {
        self.inventory_of(event_id)
            .map(EventInventory::available)
    }

    /// Payments held for the event's live tickets
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown events.
    pub fn escrow_balance(&self, event_id: EventId) -> LedgerResult<Money> {
        self.inventory_of(event_id).map(|inventory| inventory.escrowed)
    }

    /// Status of the event at `now`
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown events.
    pub fn event_status(&self, event_id: EventId, now: DateTime<Utc>) -> LedgerResult<EventStatus> {
        self.registry
            .require(event_id)
            .map(|record| record.status(now))
    }

    /// Live tickets held by `identity`
    #[must_use]
    pub fn tickets_of(&self, identity: &Identity) -> Vec<TicketId> {
        self.tickets.tickets_of(identity)
    }

    /// Events created by `organizer`
    #[must_use]
    pub fn events_of(&self, organizer: &Identity) -> Vec<EventId> {
        self.registry.events_of(organizer)
    }

    /// Waitlist for the event, in join order
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown events.
    pub fn waitlist(&self, event_id: EventId) -> LedgerResult<Vec<WaitlistEntry>> {
        self.registry.require(event_id)?;
        Ok(self.waitlists.entries(event_id).to_vec())
    }

    /// Number of identities waiting on the event
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown events.
    pub fn waitlist_count(&self, event_id: EventId) -> LedgerResult<usize> {
        self.registry.require(event_id)?;
        Ok(self.waitlists.count(event_id))
    }

    /// Whether `identity` holds `role`
    #[must_use]
    pub fn has_role(&self, role: Role, identity: &Identity) -> bool {
        self.roles.has_role(role, identity)
    }

    /// Check `tickets_sold <= max_tickets` for every event and that the
    /// sold counters match the ticket arena
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] naming the first inconsistent event.
    pub fn check_inventory(&self) -> LedgerResult<()> {
        for (event_id, inventory) in &self.inventory {
            let live = self.tickets.for_event(*event_id).count();
            if inventory.tickets_sold > inventory.max_tickets
                || usize::try_from(inventory.tickets_sold).ok() != Some(live)
            {
                return Err(LedgerError::Overflow(format!(
                    "event {event_id}: sold {} of {}, {live} live tickets",
                    inventory.tickets_sold, inventory.max_tickets
                )));
            }
        }
        Ok(())
    }
}
