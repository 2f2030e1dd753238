//! Event bus abstraction for outbound notifications.
//!
//! The ledger hands notifications (ticket minted, ticket used, event cancelled,
//! refund issued) to collaborators it does not control: mailers, analytics,
//! gate-check displays. Delivery is fire-and-forget. A failed publish is
//! reported to the effect callback and logged by the caller, but it never
//! rolls back the state transition that produced it.
//!
//! # Topic Naming Convention
//!
//! Topics follow the pattern `{domain}-{kind}`, e.g. `ticketing-notifications`.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticket_ledger_core::event_bus::EventBus;
//! use ticket_ledger_core::event::SerializedEvent;
//!
//! async fn example(event_bus: impl EventBus) {
//!     let event = SerializedEvent::new("TicketMinted.v1".to_string(), vec![1, 2, 3], None);
//!     event_bus.publish("ticketing-notifications", &event).await?;
//! }
//! ```

use crate::event::SerializedEvent;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Topic not found or invalid
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),
}

/// Trait for event bus implementations.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so it can be held as `Arc<dyn EventBus>` inside effect descriptions.
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the publish operation fails,
    /// or [`EventBusError::InvalidTopic`] for an empty topic name.
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;
}

/// An event bus that drops everything it receives.
///
/// Useful when a deployment has no downstream consumers wired up yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn publish(
        &self,
        topic: &str,
        _event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let result = if topic.is_empty() {
            Err(EventBusError::InvalidTopic(String::new()))
        } else {
            Ok(())
        };
        Box::pin(async move { result })
    }
}
