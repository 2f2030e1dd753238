//! # Ticket Ledger Runtime
//!
//! The [`Store`](store::Store) coordinates reducer execution and effect handling.
//!
//! ## Execution Model
//!
//! - Every `send` takes the state write lock, reduces exactly one action and
//!   releases the lock. Concurrent senders are serialized, so each action is an
//!   indivisible transition with respect to every invariant the reducer checks.
//! - Effects run in a spawned task after the lock is released, so `send`
//!   returns as soon as the action is reduced. Actions they produce are fed
//!   back through the reducer the same way.
//! - [`Store::settle`](store::Store::settle) waits until every spawned effect
//!   task has finished.
//! - A rejected action returns the reducer's error to the sender; the reducer
//!   contract guarantees the state was left untouched.
//!
//! ## Example
//!
//! ```ignore
//! use ticket_ledger_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! let output = store.send(Action::DoSomething).await?;
//! let value = store.state(|s| s.some_field).await;
//! store.settle().await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, RwLock};

/// Metric names recorded by the store
pub mod metrics;

/// Store module - the runtime coordinator
pub mod store {
    use super::{Arc, AtomicUsize, Notify, Ordering, RwLock, metrics};
    use futures::future::{BoxFuture, FutureExt, join_all};
    use std::collections::VecDeque;
    use std::time::Instant;
    use ticket_ledger_core::effect::{Effect, EventBusOperation};
    use ticket_ledger_core::reducer::{Effects, Reduced, Reducer};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        pending_effects: Arc<AtomicUsize>,
        idle: Arc<Notify>,
    }

    /// Decrements the in-flight effect counter on drop, waking `settle` at zero
    ///
    /// Dropped even if the effect task panics.
    struct PendingGuard {
        pending: Arc<AtomicUsize>,
        idle: Arc<Notify>,
    }

    impl Drop for PendingGuard {
        fn drop(&mut self) {
            if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                self.idle.notify_waiters();
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        R::Output: Send,
        R::Error: std::fmt::Display + Send,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                idle: Arc::new(Notify::new()),
            }
        }

        /// The injected environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.environment
        }

        /// Send an action and return the reducer's output
        ///
        /// The action is reduced under the write lock. Effects are spawned
        /// once the lock is released and this call returns without waiting
        /// for them, so a stalled effect never holds up the sender.
        ///
        /// # Errors
        ///
        /// Returns the reducer's error when the action is rejected.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<R::Output, R::Error> {
            let reduced = self.reduce(action).await;
            metrics::record_outcome(reduced.is_ok());

            let Reduced { output, effects } = reduced?;
            if !effects.is_empty() {
                self.spawn_effects(effects);
            }
            Ok(output)
        }

        /// Wait until every spawned effect task, feedback included, has finished
        ///
        /// Returns immediately when nothing is in flight. Effects spawned while
        /// waiting are waited for too.
        pub async fn settle(&self) {
            loop {
                let notified = self.idle.notified();
                let pending = self.pending_effects.load(Ordering::Acquire);
                if pending == 0 {
                    return;
                }
                tracing::trace!(pending_effects = pending, "Waiting for effects to complete");
                notified.await;
            }
        }

        /// Number of effect tasks still running
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Read from the current state
        ///
        /// The closure runs under the read lock and sees a consistent snapshot.
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        async fn reduce(&self, action: A) -> Result<Reduced<R::Output, A>, R::Error> {
            let mut state = self.state.write().await;
            let started = Instant::now();
            let reduced = self.reducer.reduce(&mut state, action, &self.environment);
            metrics::record_reduce_duration(started.elapsed().as_secs_f64());
            reduced
        }

        fn spawn_effects(&self, effects: Effects<A>) {
            self.pending_effects.fetch_add(1, Ordering::AcqRel);
            let guard = PendingGuard {
                pending: Arc::clone(&self.pending_effects),
                idle: Arc::clone(&self.idle),
            };
            let store = self.clone();
            tokio::spawn(async move {
                let _guard = guard;
                store.run_effects(effects).await;
            });
        }

        /// Execute effects, feeding produced actions back in FIFO order
        async fn run_effects(&self, effects: Effects<A>) {
            let mut pending: VecDeque<A> = VecDeque::new();
            for effect in effects {
                pending.extend(Self::execute(effect).await);
            }

            while let Some(action) = pending.pop_front() {
                metrics::record_feedback();
                let effects = match self.reduce(action).await {
                    Ok(reduced) => reduced.effects,
                    Err(error) => {
                        tracing::warn!(%error, "Feedback action rejected by reducer");
                        continue;
                    },
                };
                for effect in effects {
                    pending.extend(Self::execute(effect).await);
                }
            }
        }

        fn execute(effect: Effect<A>) -> BoxFuture<'static, Vec<A>> {
            async move {
                match effect {
                    Effect::None => Vec::new(),
                    Effect::Parallel(effects) => join_all(effects.into_iter().map(Self::execute))
                        .await
                        .into_iter()
                        .flatten()
                        .collect(),
                    Effect::Sequential(effects) => {
                        let mut produced = Vec::new();
                        for effect in effects {
                            produced.extend(Self::execute(effect).await);
                        }
                        produced
                    },
                    Effect::Future(fut) => fut.await.into_iter().collect(),
                    Effect::PublishEvent(EventBusOperation::Publish {
                        event_bus,
                        topic,
                        event,
                        on_success,
                        on_error,
                    }) => {
                        let outcome = event_bus.publish(&topic, &event).await;
                        let next = match outcome {
                            Ok(()) => on_success(()),
                            Err(error) => on_error(error),
                        };
                        next.into_iter().collect()
                    },
                }
            }
            .boxed()
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                pending_effects: Arc::clone(&self.pending_effects),
                idle: Arc::clone(&self.idle),
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::Store;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;
    use ticket_ledger_core::effect::Effect;
    use ticket_ledger_core::event::SerializedEvent;
    use ticket_ledger_core::event_bus::{EventBus, EventBusError};
    use ticket_ledger_core::reducer::{Reduced, Reducer};
    use ticket_ledger_core::{async_effect, publish_event};
    use ticket_ledger_testing::mocks::InMemoryEventBus;

    #[derive(Debug, Default)]
    struct SlotState {
        taken: u32,
        capacity: u32,
        audit: Vec<String>,
    }

    #[derive(Debug, Clone)]
    enum SlotAction {
        Take,
        TakeAndAnnounce,
        TakeThenAudit,
        Audit(String),
    }

    #[derive(Debug, thiserror::Error, PartialEq)]
    enum SlotError {
        #[error("no slots left")]
        Full,
    }

    struct SlotEnv {
        bus: Arc<dyn EventBus>,
    }

    /// Bus whose publish never completes
    struct StalledBus;

    impl EventBus for StalledBus {
        fn publish(
            &self,
            _topic: &str,
            _event: &SerializedEvent,
        ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
            Box::pin(std::future::pending())
        }
    }

    struct SlotReducer;

    impl Reducer for SlotReducer {
        type State = SlotState;
        type Action = SlotAction;
        type Environment = SlotEnv;
        type Output = u32;
        type Error = SlotError;

        fn reduce(
            &self,
            state: &mut SlotState,
            action: SlotAction,
            env: &SlotEnv,
        ) -> Result<Reduced<u32, SlotAction>, SlotError> {
            match action {
                SlotAction::Audit(line) => {
                    state.audit.push(line);
                    Ok(Reduced::new(state.taken))
                },
                SlotAction::Take | SlotAction::TakeAndAnnounce | SlotAction::TakeThenAudit => {
                    if state.taken >= state.capacity {
                        return Err(SlotError::Full);
                    }
                    state.taken += 1;
                    let taken = state.taken;
                    let reduced = Reduced::new(taken);
                    Ok(match action {
                        SlotAction::TakeAndAnnounce => reduced.with_effect(publish_event! {
                            bus: env.bus,
                            topic: "slots",
                            event: SerializedEvent::new("SlotTaken.v1".to_string(), vec![], None),
                            on_success: || None,
                            on_error: |_error| None
                        }),
                        SlotAction::TakeThenAudit => reduced.with_effect(Effect::chain(vec![
                            Effect::None,
                            async_effect! { Some(SlotAction::Audit(format!("took {taken}"))) },
                        ])),
                        _ => reduced,
                    })
                },
            }
        }
    }

    fn store(
        capacity: u32,
        bus: Arc<InMemoryEventBus>,
    ) -> Store<SlotState, SlotAction, SlotEnv, SlotReducer> {
        Store::new(
            SlotState {
                capacity,
                ..SlotState::default()
            },
            SlotReducer,
            SlotEnv { bus },
        )
    }

    #[tokio::test]
    async fn rejected_action_returns_error_and_keeps_state() {
        let store = store(1, Arc::new(InMemoryEventBus::new()));

        assert_eq!(store.send(SlotAction::Take).await, Ok(1));
        assert_eq!(store.send(SlotAction::Take).await, Err(SlotError::Full));
        assert_eq!(store.state(|s| s.taken).await, 1);
    }

    #[tokio::test]
    async fn concurrent_senders_never_exceed_capacity() {
        let store = store(10, Arc::new(InMemoryEventBus::new()));

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.send(SlotAction::Take).await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 10);
        assert_eq!(store.state(|s| s.taken).await, 10);
    }

    #[tokio::test]
    async fn publish_effects_reach_the_bus_once_settled() {
        let bus = Arc::new(InMemoryEventBus::new());
        let store = store(2, Arc::clone(&bus));

        store.send(SlotAction::TakeAndAnnounce).await.unwrap();
        store.settle().await;

        let published = bus.published("slots");
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type, "SlotTaken.v1");
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn feedback_actions_are_reduced() {
        let store = store(2, Arc::new(InMemoryEventBus::new()));

        store.send(SlotAction::TakeThenAudit).await.unwrap();
        store.settle().await;

        let audit = store.state(|s| s.audit.clone()).await;
        assert_eq!(audit, vec!["took 1".to_string()]);
    }

    #[tokio::test]
    async fn settle_returns_at_once_when_nothing_is_in_flight() {
        let store = store(1, Arc::new(InMemoryEventBus::new()));

        store.send(SlotAction::Take).await.unwrap();

        assert_eq!(store.pending_effects(), 0);
        tokio::time::timeout(Duration::from_millis(100), store.settle())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stalled_bus_does_not_hold_up_the_sender() {
        let store = Store::new(
            SlotState {
                capacity: 2,
                ..SlotState::default()
            },
            SlotReducer,
            SlotEnv {
                bus: Arc::new(StalledBus),
            },
        );

        let taken = tokio::time::timeout(
            Duration::from_secs(1),
            store.send(SlotAction::TakeAndAnnounce),
        )
        .await
        .unwrap();

        assert_eq!(taken, Ok(1));
        assert_eq!(store.pending_effects(), 1);
        assert_eq!(store.send(SlotAction::Take).await, Ok(2));
    }
}
