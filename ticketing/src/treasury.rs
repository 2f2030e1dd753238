//! Treasury for refund payouts.
//!
//! The ledger escrows every payment; refunds are paid back through a
//! [`Treasury`]. The payout runs inside the refund transition, after
//! validation and before the ticket is burned, so a failed payout leaves the
//! ticket and the inventory exactly as they were.
//!
//! [`InMemoryTreasury`] records payouts for development and tests. In
//! production this would be replaced by a settlement integration.

use crate::types::{Identity, Money, TicketId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Why a payout did not happen
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayoutError {
    /// Settlement backend refused the transfer
    #[error("payout rejected: {reason}")]
    Rejected {
        /// Backend explanation
        reason: String,
    },

    /// Settlement backend could not be reached
    #[error("treasury unavailable")]
    Unavailable,
}

/// Proof that a payout was issued
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutReceipt {
    /// Backend reference
    pub reference: String,
    /// Who was paid
    pub recipient: Identity,
    /// Amount paid
    pub amount: Money,
    /// Ticket refunded
    pub ticket_id: TicketId,
}

/// Pays refunds out of escrow
///
/// Implementations must be irreversible once they return `Ok`.
pub trait Treasury: Send + Sync {
    /// Pay `amount` to `recipient` for `ticket_id`
    ///
    /// # Errors
    ///
    /// Returns [`PayoutError`] if nothing was paid.
    fn pay_out(
        &self,
        recipient: &Identity,
        amount: Money,
        ticket_id: TicketId,
    ) -> Result<PayoutReceipt, PayoutError>;
}

/// Treasury that keeps payouts in memory
#[derive(Debug, Default)]
pub struct InMemoryTreasury {
    payouts: Mutex<Vec<PayoutReceipt>>,
    failing: AtomicBool,
    sequence: AtomicU64,
}

impl InMemoryTreasury {
    /// Creates a new in-memory treasury
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make every subsequent payout fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every payout issued, oldest first
    #[must_use]
    pub fn payouts(&self) -> Vec<PayoutReceipt> {
        self.payouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total paid to `recipient`
    #[must_use]
    pub fn paid_to(&self, recipient: &Identity) -> Money {
        self.totals().get(recipient).copied().unwrap_or_default()
    }

    fn totals(&self) -> HashMap<Identity, Money> {
        let mut totals: HashMap<Identity, Money> = HashMap::new();
        for receipt in self.payouts() {
            let total = totals.entry(receipt.recipient).or_default();
            *total = total.checked_add(receipt.amount).unwrap_or(*total);
        }
        totals
    }
}

impl Treasury for InMemoryTreasury {
    fn pay_out(
        &self,
        recipient: &Identity,
        amount: Money,
        ticket_id: TicketId,
    ) -> Result<PayoutReceipt, PayoutError> {
        if self.failing.load(Ordering::SeqCst) {
            tracing::warn!(%recipient, %amount, %ticket_id, "Payout refused");
            return Err(PayoutError::Unavailable);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        let receipt = PayoutReceipt {
            reference: format!("payout-{sequence}"),
            recipient: recipient.clone(),
            amount,
            ticket_id,
        };

        tracing::info!(
            reference = %receipt.reference,
            %recipient,
            %amount,
            %ticket_id,
            "Payout issued"
        );

        self.payouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(receipt.clone());
        Ok(receipt)
    }
}
