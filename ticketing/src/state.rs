//! Ledger state and the single fact-application path.

use crate::error::{LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::registry::{EventRecord, EventRegistry};
use crate::roles::AccessControl;
use crate::tickets::{EventInventory, Ticket, TicketLedger};
use crate::types::{EventId, Identity, Role, TicketId};
use crate::waitlist::{WaitlistEntry, Waitlists};
use std::collections::HashMap;

/// Everything the ledger knows.
///
/// Fields are public for reading; mutation goes through [`LedgerState::apply`]
/// so that every index moves together with its primary record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerState {
    /// Access Control Registry
    pub roles: AccessControl,
    /// Event Registry
    pub registry: EventRegistry,
    /// Capacity, sold counter and escrow per event
    pub inventory: HashMap<EventId, EventInventory>,
    /// Ticket arena and owner index
    pub tickets: TicketLedger,
    /// Waitlist queues
    pub waitlists: Waitlists,
    /// Id the next created event receives
    pub next_event_id: EventId,
    /// Id the next minted ticket receives
    pub next_ticket_id: TicketId,
    /// Audit log of applied facts. Grows with every fact and is only
    /// emptied by [`LedgerState::take_history`].
    history: Vec<LedgerEvent>,
}

impl LedgerState {
    /// Facts that bootstrap a ledger administered by `admin`
    #[must_use]
    pub fn genesis_facts(admin: &Identity) -> Vec<LedgerEvent> {
        [Role::Admin, Role::Organizer]
            .into_iter()
            .map(|role| LedgerEvent::RoleGranted {
                role,
                account: admin.clone(),
                granted_by: admin.clone(),
            })
            .collect()
    }

    /// A fresh ledger where `admin` holds both `Admin` and `Organizer`
    #[must_use]
    pub fn genesis(admin: &Identity) -> Self {
        let mut state = Self::default();
        for fact in Self::genesis_facts(admin) {
            if let LedgerEvent::RoleGranted { role, account, .. } = &fact {
                state.roles.grant(*role, account.clone());
            }
            state.history.push(fact);
        }
        state
    }

    /// Rebuild a ledger by applying `facts` in order to an empty state
    ///
    /// # Errors
    ///
    /// Returns the first fact that does not fit the state built so far.
    pub fn replay<'a, I>(facts: I) -> LedgerResult<Self>
    where
        I: IntoIterator<Item = &'a LedgerEvent>,
    {
        let mut state = Self::default();
        for fact in facts {
            state.apply(fact)?;
        }
        Ok(state)
    }

    /// Every fact applied since the last [`LedgerState::take_history`], oldest first
    ///
    /// The log is held in memory and never trimmed on its own.
    #[must_use]
    pub fn history(&self) -> &[LedgerEvent] {
        &self.history
    }

    /// Move the recorded facts out, leaving an empty log
    ///
    /// For hosts that archive facts elsewhere. Registry, tickets and
    /// counters are unaffected.
    pub fn take_history(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.history)
    }

    /// Inventory for `event_id` or `NotFound`
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown events.
    pub fn inventory_of(&self, event_id: EventId) -> LedgerResult<&EventInventory> {
        self.inventory
            .get(&event_id)
            .ok_or_else(|| LedgerError::event_not_found(event_id))
    }

    /// Apply one fact.
    ///
    /// Each fact is checked against the current state before anything is
    /// written, so a rejected fact leaves the state untouched.
    ///
    /// # Errors
    ///
    /// Returns an error when the fact references unknown records, would
    /// oversell an event, or would overflow a counter.
    pub fn apply(&mut self, fact: &LedgerEvent) -> LedgerResult<()> {
        match fact {
            LedgerEvent::RoleGranted { role, account, .. } => {
                self.roles.grant(*role, account.clone());
            },
            LedgerEvent::RoleRevoked { role, account, .. } => {
                self.roles.revoke(*role, account);
            },
            LedgerEvent::EventCreated {
                event_id,
                organizer,
                metadata_ref,
                start_time,
                end_time,
                ticket_price,
                max_tickets,
                created_at,
            } => {
                if self.registry.get(*event_id).is_some() {
                    return Err(LedgerError::Overflow(format!("event id {event_id} reused")));
                }
                let next = event_id
                    .next()
                    .ok_or_else(|| LedgerError::Overflow("event ids exhausted".to_string()))?;
                self.registry.insert(EventRecord {
                    id: *event_id,
                    organizer: organizer.clone(),
                    metadata_ref: metadata_ref.clone(),
                    start_time: *start_time,
                    end_time: *end_time,
                    ticket_price: *ticket_price,
                    active: true,
                    cancelled: false,
                    created_at: *created_at,
                    updated_at: *created_at,
                });
                self.inventory
                    .insert(*event_id, EventInventory::new(*max_tickets));
                self.next_event_id = self.next_event_id.max(next);
            },
            LedgerEvent::EventUpdated {
                event_id,
                metadata_ref,
                start_time,
                end_time,
                updated_at,
            } => {
                let record = self
                    .registry
                    .get_mut(*event_id)
                    .ok_or_else(|| LedgerError::event_not_found(*event_id))?;
                record.metadata_ref.clone_from(metadata_ref);
                record.start_time = *start_time;
                record.end_time = *end_time;
                record.updated_at = *updated_at;
            },
            LedgerEvent::EventCancelled {
                event_id,
                cancelled_at,
            } => {
                let record = self
                    .registry
                    .get_mut(*event_id)
                    .ok_or_else(|| LedgerError::event_not_found(*event_id))?;
                record.cancelled = true;
                record.active = false;
                record.updated_at = *cancelled_at;
            },
            LedgerEvent::TicketMinted {
                ticket_id,
                event_id,
                owner,
                price,
                minted_at,
            } => {
                if self.tickets.get(*ticket_id).is_some() || *ticket_id < self.next_ticket_id {
                    return Err(LedgerError::Overflow(format!("ticket id {ticket_id} reused")));
                }
                let next = ticket_id
                    .next()
                    .ok_or_else(|| LedgerError::Overflow("ticket ids exhausted".to_string()))?;
                self.inventory
                    .get_mut(event_id)
                    .ok_or_else(|| LedgerError::event_not_found(*event_id))?
                    .reserve_slot(*event_id, *price)?;
                self.tickets.insert(Ticket {
                    id: *ticket_id,
                    event_id: *event_id,
                    owner: owner.clone(),
                    used: false,
                    minted_at: *minted_at,
                });
                self.next_ticket_id = next;
            },
            LedgerEvent::TicketTransferred { ticket_id, to, .. } => {
                self.tickets.require(*ticket_id)?;
                self.tickets.reassign(*ticket_id, to.clone());
            },
            LedgerEvent::TicketUsageMarked {
                ticket_id, used, ..
            } => {
                self.tickets.require(*ticket_id)?;
                self.tickets.set_used(*ticket_id, *used);
            },
            LedgerEvent::TicketRefunded {
                ticket_id,
                event_id,
                amount,
                ..
            } => {
                self.tickets.require(*ticket_id)?;
                self.inventory
                    .get_mut(event_id)
                    .ok_or_else(|| LedgerError::event_not_found(*event_id))?
                    .release_slot(*event_id, *amount)?;
                self.tickets.burn(*ticket_id);
            },
            LedgerEvent::WaitlistJoined {
                event_id,
                user,
                joined_at,
            } => {
                self.waitlists.push(WaitlistEntry {
                    event_id: *event_id,
                    user: user.clone(),
                    joined_at: *joined_at,
                });
            },
            LedgerEvent::WaitlistLeft { event_id, user, .. } => {
                self.waitlists.remove(*event_id, user);
            },
        }
        self.history.push(fact.clone());
        Ok(())
    }
}
