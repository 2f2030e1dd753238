//! Injected dependencies for the ledger reducer.

use crate::config::Config;
use crate::treasury::Treasury;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use ticket_ledger_core::environment::Clock;
use ticket_ledger_core::event_bus::EventBus;

/// Environment dependencies for the ledger
#[derive(Clone)]
pub struct LedgerEnvironment {
    /// Time source for every temporal rule
    pub clock: Arc<dyn Clock>,
    /// Where notifications go
    pub event_bus: Arc<dyn EventBus>,
    /// Pays refunds
    pub treasury: Arc<dyn Treasury>,
    /// Topic notifications are published on
    pub notification_topic: String,
    /// Upper bound accepted for an event's capacity
    pub max_tickets_per_event: u32,
}

impl LedgerEnvironment {
    /// Creates a new `LedgerEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        event_bus: Arc<dyn EventBus>,
        treasury: Arc<dyn Treasury>,
        config: &Config,
    ) -> Self {
        Self {
            clock,
            event_bus,
            treasury,
            notification_topic: config.notification_topic.clone(),
            max_tickets_per_event: config.max_tickets_per_event,
        }
    }

    /// Current time according to the injected clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl std::fmt::Debug for LedgerEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEnvironment")
            .field("notification_topic", &self.notification_topic)
            .field("max_tickets_per_event", &self.max_tickets_per_event)
            .finish_non_exhaustive()
    }
}
