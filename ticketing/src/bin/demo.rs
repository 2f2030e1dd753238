//! Ticket Ledger Demo
//!
//! Walks one event through its life with in-memory collaborators:
//! - Event creation by the administrator
//! - Selling out, then queueing on the waitlist
//! - A refund that frees a slot for the first waiter
//! - Cancellation and refunds after the start
//!
//! # Usage
//!
//! ```bash
//! LEDGER_ADMIN=0xadmin cargo run --bin demo
//! ```

use chrono::Duration;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use ticket_ledger_core::environment::{Clock, SystemClock};
use ticket_ledger_core::event::SerializedEvent;
use ticket_ledger_core::event_bus::{EventBus, EventBusError};
use ticketing::{Config, Identity, InMemoryTreasury, Money, TicketingApp};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bus that writes each notification to the log
struct LoggingBus;

impl EventBus for LoggingBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        tracing::info!(topic, event_type = %event.event_type, "Notification published");
        Box::pin(async { Ok(()) })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}; falling back to the demo administrator");
            Config::for_admin(Identity::new("0xadmin")?)
        },
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    ticketing::metrics::register_business_metrics();

    let treasury = InMemoryTreasury::shared();
    let app = TicketingApp::new(
        &config,
        Arc::new(SystemClock),
        Arc::new(LoggingBus),
        treasury.clone(),
    );

    println!("\n============================================");
    println!("   Ticket Ledger - Demo");
    println!("============================================\n");

    let admin = config.admin.clone();
    let alice = Identity::new("0xa11ce")?;
    let bob = Identity::new("0xb0b")?;
    let carol = Identity::new("0xca401")?;
    let price = Money::from_units(50);

    // Step 1: an event with two seats
    let start = SystemClock.now() + Duration::days(7);
    let event_id = app
        .create_event(&admin, "ipfs://summer-festival", start, start + Duration::hours(6), price, 2)
        .await?;
    println!("1. Created event {event_id} with 2 seats at {price}");

    // Step 2: sell out
    let alice_ticket = app.mint_ticket(&alice, event_id, price).await?;
    let bob_ticket = app.mint_ticket(&bob, event_id, price).await?;
    println!(
        "2. Sold tickets {alice_ticket} and {bob_ticket}; sold out: {}",
        app.is_sold_out(event_id).await?
    );

    // Step 3: carol cannot buy and queues instead
    if let Err(error) = app.mint_ticket(&carol, event_id, price).await {
        println!("3. Carol's purchase rejected: {error}");
    }
    app.join_waitlist(&carol, event_id).await?;
    println!("   Carol is waiting ({} in queue)", app.waitlist_count(event_id).await?);

    // Step 4: bob refunds, carol buys the freed seat
    let (amount, receipt) = app.request_refund(&bob, bob_ticket).await?;
    println!(
        "4. Bob refunded {amount} (receipt {})",
        receipt.map_or_else(|| "none".to_string(), |r| r.reference)
    );
    app.leave_waitlist(&carol, event_id).await?;
    let carol_ticket = app.mint_ticket(&carol, event_id, price).await?;
    println!("   Carol bought ticket {carol_ticket}");

    // Step 5: alice gives her ticket to bob
    app.transfer_ticket(&alice, alice_ticket, bob.as_str()).await?;
    println!("5. Ticket {alice_ticket} now held by {}", app.owner_of(alice_ticket).await?);

    // Step 6: the organizer cancels; holders get their money back
    app.cancel_event(&admin, event_id).await?;
    app.refund_ticket(&bob, alice_ticket).await?;
    app.refund_ticket(&carol, carol_ticket).await?;
    println!(
        "6. Event cancelled; escrow left {}, treasury paid {} payouts",
        app.escrow_balance(event_id).await?,
        treasury.payouts().len()
    );

    app.check_inventory().await?;
    app.settle().await;
    println!("\n{} facts recorded\n", app.history().await.len());

    Ok(())
}
