//! Application facade over the ledger store.
//!
//! One method per operation, each taking the caller explicitly. Commands go
//! through the [`Store`], which serializes them; queries read a consistent
//! snapshot under the read lock.

use crate::actions::{LedgerAction, LedgerOutput};
use crate::config::Config;
use crate::environment::LedgerEnvironment;
use crate::error::{LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::metrics;
use crate::reducer::LedgerReducer;
use crate::registry::EventRecord;
use crate::state::LedgerState;
use crate::tickets::Ticket;
use crate::treasury::{PayoutReceipt, Treasury};
use crate::types::{EventId, EventStatus, Identity, Money, Role, TicketId};
use crate::views::EventView;
use crate::waitlist::WaitlistEntry;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use ticket_ledger_core::environment::Clock;
use ticket_ledger_core::event_bus::EventBus;
use ticket_ledger_runtime::Store;

/// Store type driving the ledger
pub type LedgerStore = Store<LedgerState, LedgerAction, LedgerEnvironment, LedgerReducer>;

/// Paid refund: amount and the treasury receipt (absent for free tickets)
pub type RefundOutcome = (Money, Option<PayoutReceipt>);

/// The ticket ledger application.
#[derive(Clone)]
pub struct TicketingApp {
    store: LedgerStore,
}

impl TicketingApp {
    /// Start a fresh ledger whose administrator comes from `config`
    #[must_use]
    pub fn new(
        config: &Config,
        clock: Arc<dyn Clock>,
        event_bus: Arc<dyn EventBus>,
        treasury: Arc<dyn Treasury>,
    ) -> Self {
        tracing::info!(
            admin = %config.admin,
            topic = %config.notification_topic,
            "Initializing ticket ledger"
        );
        let environment = LedgerEnvironment::new(clock, event_bus, treasury, config);
        Self::from_parts(LedgerState::genesis(&config.admin), environment)
    }

    /// Run over an existing state, e.g. one rebuilt with [`LedgerState::replay`]
    #[must_use]
    pub fn from_parts(state: LedgerState, environment: LedgerEnvironment) -> Self {
        Self {
            store: Store::new(state, LedgerReducer::new(), environment),
        }
    }

    /// Current time on the injected clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.store.environment().now()
    }

    /// Wait until every notification sent so far has been handed to the bus
    ///
    /// Operations return as soon as their fact is committed; delivery runs in
    /// the background. Call this before shutting down or when a reader needs
    /// the bus to have caught up.
    pub async fn settle(&self) {
        self.store.settle().await;
    }

    async fn dispatch(&self, action: LedgerAction) -> LedgerResult<LedgerOutput> {
        let operation = action.name();
        let result = self.store.send(action).await;
        if let Err(error) = &result {
            metrics::record_rejection(operation, error.kind());
        }
        result
    }

    async fn dispatch_unit(&self, action: LedgerAction) -> LedgerResult<()> {
        let operation = action.name();
        match self.dispatch(action).await? {
            LedgerOutput::Unit => Ok(()),
            _ => Err(LedgerError::UnexpectedOutput(operation)),
        }
    }

    // ========================================================================
    // Access control
    // ========================================================================

    /// Grant `role` to `account`. Admin only; granting a held role is a no-op.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Unauthorized`] when the caller is not an admin.
    pub async fn grant_role(
        &self,
        caller: &Identity,
        role: Role,
        account: &Identity,
    ) -> LedgerResult<()> {
        self.dispatch_unit(LedgerAction::GrantRole {
            caller: caller.clone(),
            role,
            account: account.clone(),
        })
        .await
    }

    /// Remove `role` from `account`. Admin only.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Unauthorized`] for non-admins and
    /// [`LedgerError::LastAdmin`] when removing the only admin.
    pub async fn revoke_role(
        &self,
        caller: &Identity,
        role: Role,
        account: &Identity,
    ) -> LedgerResult<()> {
        self.dispatch_unit(LedgerAction::RevokeRole {
            caller: caller.clone(),
            role,
            account: account.clone(),
        })
        .await
    }

    /// Drop one of the caller's own roles
    ///
    /// # Errors
    ///
    /// [`LedgerError::LastAdmin`] when the caller is the only admin.
    pub async fn renounce_role(&self, caller: &Identity, role: Role) -> LedgerResult<()> {
        self.dispatch_unit(LedgerAction::RenounceRole {
            caller: caller.clone(),
            role,
        })
        .await
    }

    // ========================================================================
    // Event registry
    // ========================================================================

    /// Create an event organized by the caller
    ///
    /// # Errors
    ///
    /// [`LedgerError::Unauthorized`] without the organizer role,
    /// [`LedgerError::InvalidSchedule`] or [`LedgerError::InvalidCapacity`]
    /// for bad parameters.
    pub async fn create_event(
        &self,
        caller: &Identity,
        metadata_ref: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        ticket_price: Money,
        max_tickets: u32,
    ) -> LedgerResult<EventId> {
        let output = self
            .dispatch(LedgerAction::CreateEvent {
                caller: caller.clone(),
                metadata_ref: metadata_ref.into(),
                start_time,
                end_time,
                ticket_price,
                max_tickets,
            })
            .await?;
        match output {
            LedgerOutput::EventCreated(event_id) => {
                metrics::record_event_created();
                Ok(event_id)
            },
            _ => Err(LedgerError::UnexpectedOutput("create_event")),
        }
    }

    /// Change metadata and schedule. Organizer of the event only.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`], [`LedgerError::Unauthorized`] or
    /// [`LedgerError::InvalidSchedule`].
    pub async fn update_event(
        &self,
        caller: &Identity,
        event_id: EventId,
        metadata_ref: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> LedgerResult<()> {
        self.dispatch_unit(LedgerAction::UpdateEvent {
            caller: caller.clone(),
            event_id,
            metadata_ref: metadata_ref.into(),
            start_time,
            end_time,
        })
        .await
    }

    /// Cancel an event before it ends. Organizer of the event only.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AlreadyCancelled`] or [`LedgerError::EventEnded`]
    /// besides the usual lookup and ownership failures.
    pub async fn cancel_event(&self, caller: &Identity, event_id: EventId) -> LedgerResult<()> {
        self.dispatch_unit(LedgerAction::CancelEvent {
            caller: caller.clone(),
            event_id,
        })
        .await?;
        metrics::record_event_cancelled();
        Ok(())
    }

    // ========================================================================
    // Tickets
    // ========================================================================

    /// Buy one ticket for the caller, paying exactly the ticket price
    ///
    /// # Errors
    ///
    /// [`LedgerError::EventEnded`], [`LedgerError::IncorrectPayment`] or
    /// [`LedgerError::SoldOut`].
    pub async fn mint_ticket(
        &self,
        caller: &Identity,
        event_id: EventId,
        payment: Money,
    ) -> LedgerResult<TicketId> {
        let output = self
            .dispatch(LedgerAction::MintTicket {
                caller: caller.clone(),
                event_id,
                payment,
            })
            .await?;
        match output {
            LedgerOutput::TicketMinted(ticket_id) => {
                metrics::record_ticket_minted(payment);
                Ok(ticket_id)
            },
            _ => Err(LedgerError::UnexpectedOutput("mint_ticket")),
        }
    }

    /// Hand a ticket to `to` before the event starts
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidRecipient`] when `to` is blank or the null
    /// address, [`LedgerError::Unauthorized`] when the caller does not hold
    /// the ticket, [`LedgerError::TransferWindowClosed`] once started.
    pub async fn transfer_ticket(
        &self,
        caller: &Identity,
        ticket_id: TicketId,
        to: &str,
    ) -> LedgerResult<()> {
        let to = match Identity::new(to) {
            Ok(to) => to,
            Err(error) => {
                let error = LedgerError::InvalidRecipient(error.to_string());
                metrics::record_rejection("transfer_ticket", error.kind());
                tracing::warn!(%caller, %error, "Command rejected");
                return Err(error);
            },
        };
        self.dispatch_unit(LedgerAction::TransferTicket {
            caller: caller.clone(),
            ticket_id,
            to,
        })
        .await
    }

    /// Set the used flag. Organizer of the ticket's event only.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] or [`LedgerError::Unauthorized`].
    pub async fn mark_used(
        &self,
        caller: &Identity,
        ticket_id: TicketId,
        used: bool,
    ) -> LedgerResult<()> {
        self.dispatch_unit(LedgerAction::MarkUsed {
            caller: caller.clone(),
            ticket_id,
            used,
        })
        .await
    }

    // ========================================================================
    // Refunds
    // ========================================================================

    /// Return a ticket before the event starts
    ///
    /// # Errors
    ///
    /// [`LedgerError::RefundWindowClosed`] once started, or
    /// [`LedgerError::PayoutFailed`] when the treasury refuses.
    pub async fn request_refund(
        &self,
        caller: &Identity,
        ticket_id: TicketId,
    ) -> LedgerResult<RefundOutcome> {
        let output = self
            .dispatch(LedgerAction::RequestRefund {
                caller: caller.clone(),
                ticket_id,
            })
            .await?;
        Self::refunded("voluntary", "request_refund", output)
    }

    /// Return a ticket for a cancelled event, at any time
    ///
    /// # Errors
    ///
    /// [`LedgerError::EventNotCancelled`] when the event is still on, or
    /// [`LedgerError::PayoutFailed`] when the treasury refuses.
    pub async fn refund_ticket(
        &self,
        caller: &Identity,
        ticket_id: TicketId,
    ) -> LedgerResult<RefundOutcome> {
        let output = self
            .dispatch(LedgerAction::RefundTicket {
                caller: caller.clone(),
                ticket_id,
            })
            .await?;
        Self::refunded("cancellation", "refund_ticket", output)
    }

    fn refunded(
        path: &'static str,
        operation: &'static str,
        output: LedgerOutput,
    ) -> LedgerResult<RefundOutcome> {
        match output {
            LedgerOutput::Refunded { amount, receipt, .. } => {
                metrics::record_refund(path, amount);
                Ok((amount, receipt))
            },
            _ => Err(LedgerError::UnexpectedOutput(operation)),
        }
    }

    // ========================================================================
    // Waitlists
    // ========================================================================

    /// Queue for a sold-out event
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotSoldOut`] or [`LedgerError::AlreadyWaitlisted`].
    pub async fn join_waitlist(&self, caller: &Identity, event_id: EventId) -> LedgerResult<()> {
        self.dispatch_unit(LedgerAction::JoinWaitlist {
            caller: caller.clone(),
            event_id,
        })
        .await
    }

    /// Leave a waitlist
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] when the caller is not queued.
    pub async fn leave_waitlist(&self, caller: &Identity, event_id: EventId) -> LedgerResult<()> {
        self.dispatch_unit(LedgerAction::LeaveWaitlist {
            caller: caller.clone(),
            event_id,
        })
        .await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Event record with live counters and status
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] for unknown events.
    pub async fn get_event(&self, event_id: EventId) -> LedgerResult<EventView> {
        let now = self.now();
        self.store.state(|s| s.get_event(event_id, now)).await
    }

    /// The stored event record alone
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] for unknown events.
    pub async fn event_record(&self, event_id: EventId) -> LedgerResult<EventRecord> {
        self.store
            .state(|s| s.registry.require(event_id).cloned())
            .await
    }

    /// A live ticket
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] for unknown or refunded tickets.
    pub async fn get_ticket(&self, ticket_id: TicketId) -> LedgerResult<Ticket> {
        self.store.state(|s| s.get_ticket(ticket_id)).await
    }

    /// Current holder of a ticket
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] for unknown or refunded tickets.
    pub async fn owner_of(&self, ticket_id: TicketId) -> LedgerResult<Identity> {
        self.store.state(|s| s.owner_of(ticket_id)).await
    }

    /// Tickets held by `identity`
    pub async fn tickets_of(&self, identity: &Identity) -> Vec<TicketId> {
        self.store.state(|s| s.tickets_of(identity)).await
    }

    /// Events organized by `organizer`, in creation order
    pub async fn events_of(&self, organizer: &Identity) -> Vec<EventId> {
        self.store.state(|s| s.events_of(organizer)).await
    }

    /// Whether every slot is taken
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] for unknown events.
    pub async fn is_sold_out(&self, event_id: EventId) -> LedgerResult<bool> {
        self.store.state(|s| s.is_sold_out(event_id)).await
    }

    /// Slots left
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] for unknown events.
    pub async fn available_tickets(&self, event_id: EventId) -> LedgerResult<u32> {
        self.store.state(|s| s.available_tickets(event_id)).await
    }

    /// Payments held for an event's live tickets
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] for unknown events.
    pub async fn escrow_balance(&self, event_id: EventId) -> LedgerResult<Money> {
        self.store.state(|s| s.escrow_balance(event_id)).await
    }

    /// Status derived from the clock
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] for unknown events.
    pub async fn event_status(&self, event_id: EventId) -> LedgerResult<EventStatus> {
        let now = self.now();
        self.store.state(|s| s.event_status(event_id, now)).await
    }

    /// Waitlist entries in join order
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] for unknown events.
    pub async fn waitlist(&self, event_id: EventId) -> LedgerResult<Vec<WaitlistEntry>> {
        self.store.state(|s| s.waitlist(event_id)).await
    }

    /// Number of queued users
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] for unknown events.
    pub async fn waitlist_count(&self, event_id: EventId) -> LedgerResult<usize> {
        self.store.state(|s| s.waitlist_count(event_id)).await
    }

    /// Whether `identity` holds `role`
    pub async fn has_role(&self, role: Role, identity: &Identity) -> bool {
        self.store.state(|s| s.has_role(role, identity)).await
    }

    /// Every applied fact, oldest first
    ///
    /// Copies the whole in-memory log; see [`LedgerState::history`].
    pub async fn history(&self) -> Vec<LedgerEvent> {
        self.store.state(|s| s.history().to_vec()).await
    }

    /// Check the counter invariants against the ticket set
    ///
    /// Scans every event and every live ticket.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Overflow`] describing the first broken invariant.
    pub async fn check_inventory(&self) -> LedgerResult<()> {
        self.store.state(LedgerState::check_inventory).await
    }
}

impl std::fmt::Debug for TicketingApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketingApp")
            .field("environment", self.store.environment())
            .finish_non_exhaustive()
    }
}
