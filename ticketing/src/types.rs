//! Domain types for the ticket ledger.
//!
//! Identifiers, identities, money and the role/status enums shared by every
//! component of the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Identity
// ============================================================================

/// Why a string was refused as an [`Identity`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Empty or whitespace-only input
    #[error("identity must not be blank")]
    Blank,

    /// The all-zero address, which nobody controls
    #[error("identity {0} is the null address")]
    NullAddress(String),
}

/// A caller or holder: a wallet address or account id.
///
/// Always non-blank and never the null address. Deserialization runs the same
/// validation as [`Identity::new`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Validate and wrap an identity string
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] for blank input or the null address.
    pub fn new(value: impl Into<String>) -> Result<Self, IdentityError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(IdentityError::Blank);
        }
        if is_null_address(&value) {
            return Err(IdentityError::NullAddress(value));
        }
        Ok(Self(value))
    }

    /// The identity as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_null_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c == '0'))
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of an event, assigned from 1 upward and never reused
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(u64);

impl EventId {
    /// The id handed to the first event
    pub const FIRST: Self = Self(1);

    /// Wrap a raw id
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The id after this one, `None` on exhaustion
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a ticket, unique across all events and never reused
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(u64);

impl TicketId {
    /// The id handed to the first ticket
    pub const FIRST: Self = Self(1);

    /// Wrap a raw id
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The id after this one, `None` on exhaustion
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (smallest currency unit, no floating point)
// ============================================================================

/// A non-negative amount in the smallest unit of the settlement currency
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u128);

impl Money {
    /// Nothing
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from base units
    #[must_use]
    pub const fn from_units(units: u128) -> Self {
        Self(units)
    }

    /// Returns the amount in base units
    #[must_use]
    pub const fn units(self) -> u128 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Subtracts two money amounts (returns None if result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(diff) => Some(Self(diff)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Roles and status
// ============================================================================

/// Capabilities held by identities
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Manages the role sets
    Admin,
    /// Creates and manages events
    Organizer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Organizer => write!(f, "ORGANIZER"),
        }
    }
}

/// Lifecycle status of an event, derived from its flags and the clock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    /// Before `start_time`
    Scheduled,
    /// Between `start_time` and `end_time`
    Live,
    /// At or after `end_time`
    Ended,
    /// Cancelled by its organizer
    Cancelled,
}

impl EventStatus {
    /// Derive the status at `now`
    #[must_use]
    pub fn at(
        cancelled: bool,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        if cancelled {
            Self::Cancelled
        } else if now >= end_time {
            Self::Ended
        } else if now >= start_time {
            Self::Live
        } else {
            Self::Scheduled
        }
    }
}
