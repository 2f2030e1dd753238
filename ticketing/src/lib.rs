//! Event ticket ledger.
//!
//! An authoritative ledger for event ticketing: role-gated event creation,
//! fixed-capacity ticket sales with escrowed payments, holder-initiated
//! transfers, refunds that pay out and burn, and per-event waitlists.
//!
//! # Architecture
//!
//! ```text
//!  caller ──► TicketingApp ──► Store ──► LedgerReducer
//!                               │            │ validate
//!                               │            │ pay out (refunds only)
//!                               │            ▼
//!                               │      LedgerState::apply(fact)
//!                               │
//!                               └──► effects: notifications ──► EventBus
//! ```
//!
//! Every command either commits exactly one fact or is rejected with a
//! [`LedgerError`] and leaves the ledger untouched. Commands are serialized by
//! the store, so no two transitions interleave.
//!
//! # Invariants
//!
//! - `tickets_sold <= max_tickets` for every event
//! - `tickets_sold` equals the number of live tickets of the event
//! - the escrow of an event equals the price times its live tickets
//! - each live ticket has exactly one holder, indexed under that holder
//! - ids are issued once and never reused, burned ones included
//!
//! # Usage
//!
//! ```ignore
//! let app = TicketingApp::new(&config, clock, bus, treasury);
//! let event_id = app
//!     .create_event(&admin, "ipfs://concert", start, end, Money::from_units(100), 500)
//!     .await?;
//! let ticket_id = app.mint_ticket(&alice, event_id, Money::from_units(100)).await?;
//! ```

#![forbid(unsafe_code)]

pub mod actions;
pub mod app;
pub mod config;
pub mod environment;
pub mod error;
pub mod events;
pub mod metrics;
pub mod notifications;
pub mod reducer;
pub mod registry;
pub mod roles;
pub mod state;
pub mod tickets;
pub mod treasury;
pub mod types;
pub mod views;
pub mod waitlist;

pub use actions::{LedgerAction, LedgerOutput};
pub use app::{LedgerStore, RefundOutcome, TicketingApp};
pub use config::{Config, ConfigError};
pub use environment::LedgerEnvironment;
pub use error::{LedgerError, LedgerResult};
pub use events::LedgerEvent;
pub use notifications::Notification;
pub use reducer::LedgerReducer;
pub use registry::EventRecord;
pub use state::LedgerState;
pub use tickets::Ticket;
pub use treasury::{InMemoryTreasury, PayoutError, PayoutReceipt, Treasury};
pub use types::{EventId, EventStatus, Identity, IdentityError, Money, Role, TicketId};
pub use views::EventView;
pub use waitlist::WaitlistEntry;
