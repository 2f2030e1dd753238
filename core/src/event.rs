//! Event trait and the serialized wire format for facts and notifications.
//!
//! Events are immutable facts about things that already happened. The ledger
//! records its state transitions as events and ships notifications to external
//! consumers in the same [`SerializedEvent`] envelope.
//!
//! Payloads are encoded with `bincode`; the envelope metadata is JSON so that
//! consumers can route on identifiers without decoding the payload.
//!
//! # Example
//!
//! ```
//! use ticket_ledger_core::event::Event;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum DoorEvent {
//!     Opened { door: u32 },
//!     Closed { door: u32 },
//! }
//!
//! impl Event for DoorEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             DoorEvent::Opened { .. } => "DoorOpened.v1",
//!             DoorEvent::Closed { .. } => "DoorClosed.v1",
//!         }
//!     }
//! }
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// A fact that can be serialized, shipped and decoded again.
///
/// `event_type()` must return a stable identifier with a version suffix
/// (`"TicketMinted.v1"`) so consumers can evolve alongside the schema.
pub trait Event: Send + Sync + 'static {
    /// Returns the versioned event type identifier.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// belong to another schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use ticket_ledger_core::event::Event;
    /// # use serde::{Serialize, Deserialize};
    /// # #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    /// # enum DoorEvent {
    /// #     Opened { door: u32 },
    /// # }
    /// # impl Event for DoorEvent {
    /// #     fn event_type(&self) -> &'static str { "DoorOpened.v1" }
    /// # }
    ///
    /// let original = DoorEvent::Opened { door: 3 };
    /// let bytes = original.to_bytes().unwrap();
    /// assert_eq!(DoorEvent::from_bytes(&bytes).unwrap(), original);
    /// ```
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready to be published.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "TicketMinted.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional routing metadata (identifiers, caller).
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Serialize an [`Event`] into the envelope.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }

    /// Decode the payload back into a typed event.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the payload does not match `E`.
    pub fn decode<E: Event + DeserializeOwned>(&self) -> Result<E, EventError> {
        E::from_bytes(&self.data)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}
