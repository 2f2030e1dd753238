//! Waitlist Manager.
//!
//! One queue per event, kept in join order. Entries are never promoted to
//! tickets automatically; freed capacity is minted by whoever asks first.

use crate::types::{EventId, Identity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A user waiting for capacity on a sold-out event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    /// Event waited on
    pub event_id: EventId,
    /// Who is waiting
    pub user: Identity,
    /// Join instant; queue order
    pub joined_at: DateTime<Utc>,
}

/// Per-event queues
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Waitlists {
    queues: HashMap<EventId, Vec<WaitlistEntry>>,
}

impl Waitlists {
    /// Entries for `event_id`, oldest first
    #[must_use]
    pub fn entries(&self, event_id: EventId) -> &[WaitlistEntry] {
        self.queues.get(&event_id).map_or(&[], Vec::as_slice)
    }

    /// Number of identities waiting on `event_id`
    #[must_use]
    pub fn count(&self, event_id: EventId) -> usize {
        self.entries(event_id).len()
    }

    /// Whether `user` is queued for `event_id`
    #[must_use]
    pub fn contains(&self, event_id: EventId, user: &Identity) -> bool {
        self.entries(event_id).iter().any(|entry| &entry.user == user)
    }

    /// 1-based queue position of `user`
    #[must_use]
    pub fn position(&self, event_id: EventId, user: &Identity) -> Option<usize> {
        self.entries(event_id)
            .iter()
            .position(|entry| &entry.user == user)
            .map(|index| index + 1)
    }

    pub(crate) fn push(&mut self, entry: WaitlistEntry) {
        self.queues.entry(entry.event_id).or_default().push(entry);
    }

    pub(crate) fn remove(&mut self, event_id: EventId, user: &Identity) -> bool {
        let Some(queue) = self.queues.get_mut(&event_id) else {
            return false;
        };
        let before = queue.len();
        queue.retain(|entry| &entry.user != user);
        let removed = queue.len() != before;
        if queue.is_empty() {
            self.queues.remove(&event_id);
        }
        removed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(user: &str, minutes: i64) -> WaitlistEntry {
        WaitlistEntry {
            event_id: EventId::new(1),
            user: Identity::new(user).unwrap(),
            joined_at: DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(minutes),
        }
    }

    #[test]
    fn keeps_join_order() {
        let mut lists = Waitlists::default();
        lists.push(entry("bob", 1));
        lists.push(entry("carol", 2));
        lists.push(entry("dave", 3));

        let event = EventId::new(1);
        let carol = Identity::new("carol").unwrap();
        assert_eq!(lists.count(event), 3);
        assert_eq!(lists.position(event, &carol), Some(2));

        assert!(lists.remove(event, &carol));
        let users: Vec<_> = lists.entries(event).iter().map(|e| e.user.to_string()).collect();
        assert_eq!(users, vec!["bob", "dave"]);
    }

    #[test]
    fn removing_an_absent_user_reports_false() {
        let mut lists = Waitlists::default();
        let event = EventId::new(7);
        assert!(!lists.remove(event, &Identity::new("nobody").unwrap()));
        assert_eq!(lists.count(event), 0);
    }
}
