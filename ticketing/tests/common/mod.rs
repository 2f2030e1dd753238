//! Shared fixtures for the ticketing integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use ticket_ledger_core::environment::Clock;
use ticket_ledger_testing::{InMemoryEventBus, ManualClock, init_test_tracing, test_clock};
use ticketing::config::DEFAULT_NOTIFICATION_TOPIC;
use ticketing::{Config, EventId, Identity, InMemoryTreasury, Money, TicketingApp};

/// Default ticket price used by the fixtures
pub const PRICE: Money = Money::from_units(250);

/// An app wired to in-memory collaborators the test can drive
pub struct Harness {
    pub app: TicketingApp,
    pub clock: Arc<ManualClock>,
    pub bus: Arc<InMemoryEventBus>,
    pub treasury: Arc<InMemoryTreasury>,
    pub admin: Identity,
}

impl Harness {
    pub fn new() -> Self {
        init_test_tracing();
        let admin = id("0xadmin");
        let clock = Arc::new(ManualClock::starting_at(test_clock().now()));
        let bus = Arc::new(InMemoryEventBus::new());
        let treasury = InMemoryTreasury::shared();
        let app = TicketingApp::new(
            &Config::for_admin(admin.clone()),
            clock.clone(),
            bus.clone(),
            treasury.clone(),
        );
        Self {
            app,
            clock,
            bus,
            treasury,
            admin,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Event starting in one day and lasting two hours
    pub async fn event(&self, max_tickets: u32) -> EventId {
        self.event_priced(PRICE, max_tickets).await
    }

    pub async fn event_priced(&self, price: Money, max_tickets: u32) -> EventId {
        let start = self.now() + Duration::days(1);
        self.app
            .create_event(
                &self.admin,
                "ipfs://event",
                start,
                start + Duration::hours(2),
                price,
                max_tickets,
            )
            .await
            .unwrap()
    }

    /// Move the clock just past the start of an event
    pub async fn pass_start(&self, event_id: EventId) {
        let start = self.app.get_event(event_id).await.unwrap().record.start_time;
        self.clock.set(start + Duration::minutes(1));
    }

    /// Notification types on the bus once every pending delivery has run
    pub async fn notifications(&self) -> Vec<String> {
        self.app.settle().await;
        self.bus.published_types(DEFAULT_NOTIFICATION_TOPIC)
    }
}

pub fn id(value: &str) -> Identity {
    Identity::new(value).unwrap()
}
