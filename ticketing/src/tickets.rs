//! Ticket Ledger.
//!
//! Owns the ticket arena, the per-owner index and the per-event inventory.
//! `tickets_sold` is only ever changed through [`EventInventory::reserve_slot`]
//! and [`EventInventory::release_slot`], which the state applies together with
//! the matching ticket insert or burn.

use crate::error::{LedgerError, LedgerResult};
use crate::types::{EventId, Identity, Money, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// An admission token owned by exactly one identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Event this ticket admits to
    pub event_id: EventId,
    /// Current holder
    pub owner: Identity,
    /// Set by the organizer at the gate
    pub used: bool,
    /// When it was minted
    pub minted_at: DateTime<Utc>,
}

/// Capacity and escrow for one event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInventory {
    /// Fixed at creation
    pub max_tickets: u32,
    /// Live tickets; never above `max_tickets`
    pub tickets_sold: u32,
    /// Payments held for refunds or later withdrawal
    pub escrowed: Money,
}

impl EventInventory {
    /// Fresh inventory with nothing sold
    #[must_use]
    pub const fn new(max_tickets: u32) -> Self {
        Self {
            max_tickets,
            tickets_sold: 0,
            escrowed: Money::ZERO,
        }
    }

    /// Slots still available
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.max_tickets.saturating_sub(self.tickets_sold)
    }

    /// Whether every slot is taken
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.tickets_sold >= self.max_tickets
    }

    /// Fail with `SoldOut` when no slot is left
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SoldOut`].
    pub fn ensure_available(&self, event_id: EventId) -> LedgerResult<()> {
        if self.is_sold_out() {
            Err(LedgerError::SoldOut(event_id))
        } else {
            Ok(())
        }
    }

    /// Take one slot and escrow its payment
    ///
    /// Nothing changes unless both the slot and the escrow fit.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SoldOut`] or [`LedgerError::Overflow`].
    pub fn reserve_slot(&mut self, event_id: EventId, payment: Money) -> LedgerResult<()> {
        self.ensure_available(event_id)?;
        let escrowed = self.escrowed.checked_add(payment).ok_or_else(|| {
            LedgerError::Overflow(format!("escrow for event {event_id}"))
        })?;
        self.tickets_sold += 1;
        self.escrowed = escrowed;
        Ok(())
    }

    /// Check that a slot holding `amount` could be released
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] when the counters would underflow.
    pub fn ensure_releasable(&self, event_id: EventId, amount: Money) -> LedgerResult<()> {
        if self.tickets_sold == 0 || self.escrowed.checked_sub(amount).is_none() {
            return Err(LedgerError::Overflow(format!(
                "inventory for event {event_id} cannot release {amount}"
            )));
        }
        Ok(())
    }

    /// Free one slot and take `amount` out of escrow
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] when the counters would underflow.
    pub fn release_slot(&mut self, event_id: EventId, amount: Money) -> LedgerResult<()> {
        self.ensure_releasable(event_id, amount)?;
        self.tickets_sold -= 1;
        self.escrowed = self.escrowed.checked_sub(amount).unwrap_or(Money::ZERO);
        Ok(())
    }
}

/// Ticket arena plus the per-owner index
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketLedger {
    tickets: BTreeMap<TicketId, Ticket>,
    by_owner: HashMap<Identity, BTreeSet<TicketId>>,
}

impl TicketLedger {
    /// Look up a live ticket
    #[must_use]
    pub fn get(&self, ticket_id: TicketId) -> Option<&Ticket> {
        self.tickets.get(&ticket_id)
    }

    /// Look up a live ticket or fail with `NotFound`
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown or burned tickets.
    pub fn require(&self, ticket_id: TicketId) -> LedgerResult<&Ticket> {
        self.get(ticket_id)
            .ok_or_else(|| LedgerError::ticket_not_found(ticket_id))
    }

    /// Look up a ticket held by `caller`
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] or [`LedgerError::Unauthorized`].
    pub fn require_owner(&self, ticket_id: TicketId, caller: &Identity) -> LedgerResult<&Ticket> {
        let ticket = self.require(ticket_id)?;
        if &ticket.owner != caller {
            return Err(LedgerError::Unauthorized(format!(
                "{caller} does not own ticket {ticket_id}"
            )));
        }
        Ok(ticket)
    }

    /// Live tickets held by `owner`, in id order
    #[must_use]
    pub fn tickets_of(&self, owner: &Identity) -> Vec<TicketId> {
        self.by_owner
            .get(owner)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Live tickets for `event_id`
    pub fn for_event(&self, event_id: EventId) -> impl Iterator<Item = &Ticket> {
        self.tickets
            .values()
            .filter(move |ticket| ticket.event_id == event_id)
    }

    /// Number of live tickets across all events
    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Whether no ticket is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub(crate) fn insert(&mut self, ticket: Ticket) {
        self.by_owner
            .entry(ticket.owner.clone())
            .or_default()
            .insert(ticket.id);
        self.tickets.insert(ticket.id, ticket);
    }

    pub(crate) fn reassign(&mut self, ticket_id: TicketId, to: Identity) {
        let Some(ticket) = self.tickets.get_mut(&ticket_id) else {
            return;
        };
        let from = std::mem::replace(&mut ticket.owner, to.clone());
        self.unindex(&from, ticket_id);
        self.by_owner.entry(to).or_default().insert(ticket_id);
    }

    pub(crate) fn set_used(&mut self, ticket_id: TicketId, used: bool) {
        if let Some(ticket) = self.tickets.get_mut(&ticket_id) {
            ticket.used = used;
        }
    }

    pub(crate) fn burn(&mut self, ticket_id: TicketId) -> Option<Ticket> {
        let ticket = self.tickets.remove(&ticket_id)?;
        self.unindex(&ticket.owner, ticket_id);
        Some(ticket)
    }

    fn unindex(&mut self, owner: &Identity, ticket_id: TicketId) {
        if let Some(ids) = self.by_owner.get_mut(owner) {
            ids.remove(&ticket_id);
            if ids.is_empty() {
                self.by_owner.remove(owner);
            }
        }
    }
}
