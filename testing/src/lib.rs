//! # Ticket Ledger Testing
//!
//! Testing utilities for crates built on the ticket ledger core.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `ManualClock`)
//! - An in-memory event bus that records what was published
//! - The `ReducerTest` given/when/then harness and effect assertions
//!
//! ## Example
//!
//! ```ignore
//! use ticket_ledger_testing::{ManualClock, test_clock};
//!
//! let clock = ManualClock::starting_at(test_clock().now());
//! clock.advance(chrono::Duration::hours(2));
//! ```

use chrono::{DateTime, Utc};
use ticket_ledger_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, PoisonError};
    use ticket_ledger_core::event::SerializedEvent;
    use ticket_ledger_core::event_bus::{EventBus, EventBusError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticket_ledger_testing::mocks::FixedClock;
    /// use ticket_ledger_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// A clock that only moves when told to.
    ///
    /// Lets tests cross start and end times without sleeping.
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`
        #[must_use]
        pub const fn starting_at(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward (or backward, for negative durations)
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute instant
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }

    /// Event bus that keeps every published event in memory.
    ///
    /// Can be switched into a failing mode to check that publish errors are
    /// tolerated by the code under test.
    #[derive(Debug, Default)]
    pub struct InMemoryEventBus {
        published: Mutex<Vec<(String, SerializedEvent)>>,
        failing: AtomicBool,
    }

    impl InMemoryEventBus {
        /// Create an empty bus
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent publish fail (or succeed again)
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Events published to `topic`, oldest first
        #[must_use]
        pub fn published(&self, topic: &str) -> Vec<SerializedEvent> {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|(t, _)| t == topic)
                .map(|(_, event)| event.clone())
                .collect()
        }

        /// Event types published to `topic`, oldest first
        #[must_use]
        pub fn published_types(&self, topic: &str) -> Vec<String> {
            self.published(topic)
                .into_iter()
                .map(|event| event.event_type)
                .collect()
        }

        /// Total number of events published on any topic
        #[must_use]
        pub fn len(&self) -> usize {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Whether nothing has been published yet
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl EventBus for InMemoryEventBus {
        fn publish(
            &self,
            topic: &str,
            event: &SerializedEvent,
        ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
            let result = if self.failing.load(Ordering::SeqCst) {
                Err(EventBusError::PublishFailed {
                    topic: topic.to_string(),
                    reason: "bus configured to fail".to_string(),
                })
            } else {
                self.published
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((topic.to_string(), event.clone()));
                Ok(())
            };
            Box::pin(async move { result })
        }
    }
}

/// Install a `tracing` subscriber that writes to the test harness output.
///
/// Safe to call from many tests; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, InMemoryEventBus, ManualClock, test_clock};
