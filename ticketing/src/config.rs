//! Configuration management for the ticket ledger.
//!
//! Loads configuration from environment variables (and an optional `.env`
//! file) with sensible defaults.

use crate::types::{Identity, IdentityError};
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Default topic for outbound notifications
pub const DEFAULT_NOTIFICATION_TOPIC: &str = "ticketing-notifications";

/// Default log filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default ceiling on `max_tickets` for a single event
pub const DEFAULT_MAX_TICKETS_PER_EVENT: u32 = 1_000_000;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// The administrator identity is unusable
    #[error("invalid LEDGER_ADMIN: {0}")]
    InvalidAdmin(#[from] IdentityError),

    /// A variable is set but cannot be parsed
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Identity that receives `Admin` and `Organizer` at genesis
    pub admin: Identity,
    /// Topic notifications are published on
    pub notification_topic: String,
    /// Log filter (trace, debug, info, warn, error)
    pub log_level: String,
    /// Upper bound accepted for an event's capacity
    pub max_tickets_per_event: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `LEDGER_ADMIN` is missing or invalid, or
    /// when `LEDGER_MAX_TICKETS_PER_EVENT` is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        let admin = env::var("LEDGER_ADMIN").map_err(|_| ConfigError::Missing("LEDGER_ADMIN"))?;
        let admin = Identity::new(admin)?;

        let max_tickets_per_event = match env::var("LEDGER_MAX_TICKETS_PER_EVENT") {
            Ok(value) => match value.trim().parse::<u32>() {
                Ok(max) if max > 0 => max,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "LEDGER_MAX_TICKETS_PER_EVENT",
                        value,
                    });
                },
            },
            Err(_) => DEFAULT_MAX_TICKETS_PER_EVENT,
        };

        Ok(Self {
            admin,
            notification_topic: env::var("NOTIFICATION_TOPIC")
                .ok()
                .filter(|topic| !topic.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_TOPIC.to_string()),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            max_tickets_per_event,
        })
    }

    /// Defaults around an explicit administrator (tests, embedding)
    #[must_use]
    pub fn for_admin(admin: Identity) -> Self {
        Self {
            admin,
            notification_topic: DEFAULT_NOTIFICATION_TOPIC.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            max_tickets_per_event: DEFAULT_MAX_TICKETS_PER_EVENT,
        }
    }

    /// Override the notification topic
    #[must_use]
    pub fn with_notification_topic(mut self, topic: impl Into<String>) -> Self {
        self.notification_topic = topic.into();
        self
    }

    /// Override the capacity ceiling
    #[must_use]
    pub fn with_max_tickets_per_event(mut self, max: u32) -> Self {
        self.max_tickets_per_event = max;
        self
    }
}
