//! # Ticket Ledger Core
//!
//! Core traits and types shared by the ticket ledger crates.
//!
//! The ledger is built on the Reducer pattern: every operation is an action
//! reduced against owned state, and every side effect (notifications, follow-up
//! actions) is returned as a description for the runtime to execute.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state owned by a store
//! - **Action**: All possible inputs to a reducer
//! - **Reducer**: `(State, Action, Environment) → Result<(Output, Effects), Error>`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Transition Contract
//!
//! A reducer either applies an action completely and returns its output, or
//! rejects it and leaves the state untouched. The runtime relies on this to
//! give each action all-or-nothing semantics.
//!
//! ## Example
//!
//! ```ignore
//! use ticket_ledger_core::*;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = CounterEnvironment;
//!     type Output = u64;
//!     type Error = CounterError;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         env: &CounterEnvironment,
//!     ) -> Result<Reduced<u64, CounterAction>, CounterError> {
//!         let next = state.count.checked_add(1).ok_or(CounterError::Overflow)?;
//!         state.count = next;
//!         Ok(Reduced::new(next))
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Event trait and serialized wire format
pub mod event;

/// Event bus abstraction for publishing notifications
pub mod event_bus;

/// Declarative macros for building effects
pub mod effect_macros;

/// Reducer module - The core trait for business logic
///
/// Reducers are deterministic functions: `(State, Action, Environment) → (Output, Effects)`.
/// They contain all business logic and are testable without a runtime.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Effects returned alongside a reducer output.
    pub type Effects<Action> = SmallVec<[Effect<Action>; 4]>;

    /// The result of successfully reducing an action.
    ///
    /// Carries the value returned to the caller and the effects the runtime
    /// must execute once the state transition has been committed.
    #[derive(Debug)]
    pub struct Reduced<Output, Action> {
        /// Value handed back to whoever sent the action
        pub output: Output,
        /// Side effects to execute after the transition
        pub effects: Effects<Action>,
    }

    impl<Output, Action> Reduced<Output, Action> {
        /// An output with no effects
        #[must_use]
        pub fn new(output: Output) -> Self {
            Self {
                output,
                effects: SmallVec::new(),
            }
        }

        /// Append a single effect
        #[must_use]
        pub fn with_effect(mut self, effect: Effect<Action>) -> Self {
            self.effects.push(effect);
            self
        }

        /// Append several effects
        #[must_use]
        pub fn with_effects<I>(mut self, effects: I) -> Self
        where
            I: IntoIterator<Item = Effect<Action>>,
        {
            self.effects.extend(effects);
            self
        }
    }

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    /// - `Output`: The value returned to the sender on success
    /// - `Error`: The rejection reason returned to the sender on failure
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// The value produced for the sender of an accepted action
        type Output;

        /// The reason an action was rejected
        type Error;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations must:
        /// 1. Validate the action completely
        /// 2. Update state in place only once validation passed
        /// 3. Return effect descriptions to be executed
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action is rejected. The state must
        /// be exactly as it was before the call.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Reduced<Self::Output, Self::Action>, Self::Error>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use crate::event::SerializedEvent;
    use crate::event_bus::{EventBus, EventBusError};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    /// Callback invoked with the outcome of an effect, optionally producing a follow-up action.
    pub type Callback<T, Action> = Box<dyn FnOnce(T) -> Option<Action> + Send>;

    /// Event bus operations
    pub enum EventBusOperation<Action> {
        /// Publish a serialized event to a topic
        Publish {
            /// Bus to publish on
            event_bus: Arc<dyn EventBus>,
            /// Destination topic
            topic: String,
            /// Payload
            event: SerializedEvent,
            /// Called when the bus accepted the event
            on_success: Callback<(), Action>,
            /// Called when the bus rejected the event
            on_error: Callback<EventBusError, Action>,
        },
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Publish to an event bus
        PublishEvent(EventBusOperation<Action>),
    }

    // Manual Debug implementation since Future and callbacks don't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::PublishEvent(EventBusOperation::Publish { topic, event, .. }) => f
                    .debug_struct("Effect::PublishEvent")
                    .field("topic", topic)
                    .field("event_type", &event.event_type)
                    .finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// The event type carried by a publish effect, if this is one
        #[must_use]
        pub fn published_event_type(&self) -> Option<&str> {
            match self {
                Effect::PublishEvent(EventBusOperation::Publish { event, .. }) => {
                    Some(event.event_type.as_str())
                },
                _ => None,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Time-gated rules (sale windows, transfer and refund cut-offs) read the
    /// clock on every call instead of caching "ended" flags.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
