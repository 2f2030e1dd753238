//! Event Registry.
//!
//! Holds the descriptive side of every event (organizer, schedule, price) and
//! the per-organizer index. Capacity and the sold counter live with the
//! ticket ledger in [`EventInventory`](crate::tickets::EventInventory).

use crate::error::{LedgerError, LedgerResult};
use crate::types::{EventId, EventStatus, Identity, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Descriptive record of one event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier
    pub id: EventId,
    /// Creator; never changes
    pub organizer: Identity,
    /// Opaque reference to off-ledger content
    pub metadata_ref: String,
    /// Admission opens
    pub start_time: DateTime<Utc>,
    /// Admission closes
    pub end_time: DateTime<Utc>,
    /// Fixed at creation
    pub ticket_price: Money,
    /// True from creation
    pub active: bool,
    /// One-way
    pub cancelled: bool,
    /// When the event was created
    pub created_at: DateTime<Utc>,
    /// Last metadata or schedule change
    pub updated_at: DateTime<Utc>,
}

impl EventRecord {
    /// Status at `now`
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> EventStatus {
        EventStatus::at(self.cancelled, self.start_time, self.end_time, now)
    }

    /// Cancelled or past its end: no more minting
    #[must_use]
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.cancelled || now >= self.end_time
    }

    /// Whether the event has started at `now`
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time
    }
}

/// Check a schedule against the creation rules
///
/// # Errors
///
/// Returns [`LedgerError::InvalidSchedule`] unless `now < start < end`.
pub fn validate_schedule(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    if start_time <= now {
        return Err(LedgerError::InvalidSchedule(format!(
            "start time {start_time} must be in the future"
        )));
    }
    if end_time <= start_time {
        return Err(LedgerError::InvalidSchedule(format!(
            "end time {end_time} must be after start time {start_time}"
        )));
    }
    Ok(())
}

/// All events plus the organizer index
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventRegistry {
    events: BTreeMap<EventId, EventRecord>,
    by_organizer: HashMap<Identity, Vec<EventId>>,
}

impl EventRegistry {
    /// Look up an event
    #[must_use]
    pub fn get(&self, event_id: EventId) -> Option<&EventRecord> {
        self.events.get(&event_id)
    }

    /// Look up an event or fail with `NotFound`
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown ids.
    pub fn require(&self, event_id: EventId) -> LedgerResult<&EventRecord> {
        self.get(event_id)
            .ok_or_else(|| LedgerError::event_not_found(event_id))
    }

    /// Look up an event that `caller` organizes
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown ids and
    /// [`LedgerError::Unauthorized`] when `caller` is not the organizer.
    pub fn require_organizer(
        &self,
        event_id: EventId,
        caller: &Identity,
    ) -> LedgerResult<&EventRecord> {
        let record = self.require(event_id)?;
        if &record.organizer != caller {
            return Err(LedgerError::Unauthorized(format!(
                "{caller} is not the organizer of event {event_id}"
            )));
        }
        Ok(record)
    }

    /// Events created by `organizer`, in creation order
    #[must_use]
    pub fn events_of(&self, organizer: &Identity) -> Vec<EventId> {
        self.by_organizer.get(organizer).cloned().unwrap_or_default()
    }

    /// Every event, in id order
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.events.values()
    }

    /// Number of events ever created
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no event was created yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn insert(&mut self, record: EventRecord) {
        self.by_organizer
            .entry(record.organizer.clone())
            .or_default()
            .push(record.id);
        self.events.insert(record.id, record);
    }

    pub(crate) fn get_mut(&mut self, event_id: EventId) -> Option<&mut EventRecord> {
        self.events.get_mut(&event_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_089)
    }

    fn record(id: u64, organizer: &str) -> EventRecord {
        EventRecord {
            id: EventId::new(id),
            organizer: Identity::new(organizer).unwrap(),
            metadata_ref: "ipfs://meta".to_string(),
            start_time: now() + Duration::days(1),
            end_time: now() + Duration::days(2),
            ticket_price: Money::from_units(100),
            active: true,
            cancelled: false,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn schedule_rules() {
        let later = now() + Duration::hours(1);
        assert!(validate_schedule(later, later + Duration::hours(1), now()).is_ok());
        assert!(matches!(
            validate_schedule(now(), later, now()),
            Err(LedgerError::InvalidSchedule(_))
        ));
        assert!(matches!(
            validate_schedule(later, later, now()),
            Err(LedgerError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn organizer_index_keeps_creation_order() {
        let mut registry = EventRegistry::default();
        registry.insert(record(1, "org"));
        registry.insert(record(2, "other"));
        registry.insert(record(3, "org"));

        let org = Identity::new("org").unwrap();
        assert_eq!(registry.events_of(&org), vec![EventId::new(1), EventId::new(3)]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn only_the_organizer_passes() {
        let mut registry = EventRegistry::default();
        registry.insert(record(1, "org"));

        let intruder = Identity::new("mallory").unwrap();
        assert!(matches!(
            registry.require_organizer(EventId::new(1), &intruder),
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(matches!(
            registry.require(EventId::new(9)),
            Err(LedgerError::NotFound(_))
        ));
    }
}
