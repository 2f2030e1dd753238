//! Commands accepted by the ledger and the values they return.

use crate::treasury::PayoutReceipt;
use crate::types::{EventId, Identity, Money, Role, TicketId};
use chrono::{DateTime, Utc};

/// A command, always on behalf of an explicit caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerAction {
    /// Admin grants `role` to `account`
    GrantRole {
        /// Who asks
        caller: Identity,
        /// Role to grant
        role: Role,
        /// Recipient
        account: Identity,
    },

    /// Admin removes `role` from `account`
    RevokeRole {
        /// Who asks
        caller: Identity,
        /// Role to remove
        role: Role,
        /// Holder
        account: Identity,
    },

    /// Caller drops one of its own roles
    RenounceRole {
        /// Who asks
        caller: Identity,
        /// Role to drop
        role: Role,
    },

    /// Organizer creates an event
    CreateEvent {
        /// Who asks; becomes the organizer
        caller: Identity,
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
    },

    /// Organizer changes metadata or schedule
    UpdateEvent {
        /// Who asks
        caller: Identity,
        /// Event to change
        event_id: EventId,
        /// New content reference
        metadata_ref: String,
        /// New start
        start_time: DateTime<Utc>,
        /// New end
        end_time: DateTime<Utc>,
    },

    /// Organizer cancels an event
    CancelEvent {
        /// Who asks
        caller: Identity,
        /// Event to cancel
        event_id: EventId,
    },

    /// Buy a ticket for the caller
    MintTicket {
        /// Buyer and first holder
        caller: Identity,
        /// Event to attend
        event_id: EventId,
        /// Amount sent; must equal the price
        payment: Money,
    },

    /// Holder hands a ticket to someone else
    TransferTicket {
        /// Current holder
        caller: Identity,
        /// Ticket to move
        ticket_id: TicketId,
        /// New holder
        to: Identity,
    },

    /// Organizer sets the used flag
    MarkUsed {
        /// Who asks
        caller: Identity,
        /// Ticket to mark
        ticket_id: TicketId,
        /// New flag value
        used: bool,
    },

    /// Holder returns a ticket before the event starts
    RequestRefund {
        /// Current holder
        caller: Identity,
        /// Ticket to return
        ticket_id: TicketId,
    },

    /// Holder returns a ticket for a cancelled event
    RefundTicket {
        /// Current holder
        caller: Identity,
        /// Ticket to return
        ticket_id: TicketId,
    },

    /// Queue for a sold-out event
    JoinWaitlist {
        /// Who joins
        caller: Identity,
        /// Event to wait on
        event_id: EventId,
    },

    /// Leave a waitlist
    LeaveWaitlist {
        /// Who leaves
        caller: Identity,
        /// Event waited on
        event_id: EventId,
    },
}

impl LedgerAction {
    /// Identity the command runs as
    #[must_use]
    pub const fn caller(&self) -> &Identity {
        match self {
            Self::GrantRole { caller, .. }
            | Self::RevokeRole { caller, .. }
            | Self::RenounceRole { caller, .. }
            | Self::CreateEvent { caller, .. }
            | Self::UpdateEvent { caller, .. }
            | Self::CancelEvent { caller, .. }
            | Self::MintTicket { caller, .. }
            | Self::TransferTicket { caller, .. }
            | Self::MarkUsed { caller, .. }
            | Self::RequestRefund { caller, .. }
            | Self::RefundTicket { caller, .. }
            | Self::JoinWaitlist { caller, .. }
            | Self::LeaveWaitlist { caller, .. } => caller,
        }
    }

    /// Operation name for logs and metrics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GrantRole { .. } => "grant_role",
            Self::RevokeRole { .. } => "revoke_role",
            Self::RenounceRole { .. } => "renounce_role",
            Self::CreateEvent { .. } => "create_event",
            Self::UpdateEvent { .. } => "update_event",
            Self::CancelEvent { .. } => "cancel_event",
            Self::MintTicket { .. } => "mint_ticket",
            Self::TransferTicket { .. } => "transfer_ticket",
            Self::MarkUsed { .. } => "mark_used",
            Self::RequestRefund { .. } => "request_refund",
            Self::RefundTicket { .. } => "refund_ticket",
            Self::JoinWaitlist { .. } => "join_waitlist",
            Self::LeaveWaitlist { .. } => "leave_waitlist",
        }
    }
}

/// What an accepted command returns
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerOutput {
    /// Nothing beyond success
    Unit,
    /// Id of the created event
    EventCreated(EventId),
    /// Id of the minted ticket
    TicketMinted(TicketId),
    /// A refund was paid and the ticket burned
    Refunded {
        /// Burned ticket
        ticket_id: TicketId,
        /// Amount paid back
        amount: Money,
        /// Treasury receipt; `None` for free tickets
        receipt: Option<PayoutReceipt>,
    },
}
