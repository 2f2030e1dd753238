//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use ticket_ledger_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for outcome assertion functions
type OutcomeAssertion<O, Err> = Box<dyn FnOnce(&Result<O, Err>)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use ticket_ledger_testing::ReducerTest;
///
/// ReducerTest::new(LedgerReducer)
///     .with_env(test_environment())
///     .given_state(LedgerState::genesis(admin))
///     .when_action(LedgerAction::CancelEvent { caller, event_id })
///     .then_outcome(|outcome| assert!(outcome.is_ok()))
///     .then_state(|state| assert!(state.event(event_id).unwrap().cancelled))
///     .then_effects(|effects| assert_eq!(effects.len(), 1))
///     .run();
/// ```
pub struct ReducerTest<R>
where
    R: Reducer,
{
    reducer: R,
    environment: Option<R::Environment>,
    initial_state: Option<R::State>,
    action: Option<R::Action>,
    state_assertions: Vec<StateAssertion<R::State>>,
    outcome_assertions: Vec<OutcomeAssertion<R::Output, R::Error>>,
    effect_assertions: Vec<EffectAssertion<R::Action>>,
}

impl<R> ReducerTest<R>
where
    R: Reducer,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            action: None,
            state_assertions: Vec::new(),
            outcome_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: R::Environment) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the output or rejection (Then)
    #[must_use]
    pub fn then_outcome<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Result<R::Output, R::Error>) + 'static,
    {
        self.outcome_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    ///
    /// A rejected action is checked against an empty effect list.
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<R::Action>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let (outcome, effects) = match self.reducer.reduce(&mut state, action, &env) {
            Ok(reduced) => (Ok(reduced.output), reduced.effects.into_vec()),
            Err(error) => (Err(error), Vec::new()),
        };

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.outcome_assertions {
            assertion(&outcome);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use ticket_ledger_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.is_empty() || matches!(effects, [Effect::None]),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that the effects publish exactly these event types, in order
    ///
    /// # Panics
    ///
    /// Panics if the published event types differ.
    pub fn assert_published_types<A>(effects: &[Effect<A>], expected: &[&str]) {
        let published: Vec<&str> = effects
            .iter()
            .filter_map(Effect::published_event_type)
            .collect();
        assert_eq!(published, expected, "Unexpected published event types");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticket_ledger_core::effect::Effect;
    use ticket_ledger_core::reducer::{Reduced, Reducer};

    #[derive(Clone, Debug)]
    struct TestState {
        count: u32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Decrement,
    }

    #[derive(Debug, PartialEq)]
    struct Underflow;

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;
        type Output = u32;
        type Error = Underflow;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> Result<Reduced<u32, TestAction>, Underflow> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    Ok(Reduced::new(state.count).with_effect(Effect::None))
                },
                TestAction::Decrement => {
                    state.count = state.count.checked_sub(1).ok_or(Underflow)?;
                    Ok(Reduced::new(state.count))
                },
            }
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_outcome(|outcome| assert_eq!(outcome, &Ok(1)))
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_rejection() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Decrement)
            .then_state(|state| {
                assert_eq!(state.count, 0);
            })
            .then_outcome(|outcome| assert_eq!(outcome, &Err(Underflow)))
            .then_effects(|effects| assertions::assert_effects_count(effects, 0))
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<TestAction>(&[Effect::None]);
        assertions::assert_no_effects::<TestAction>(&[]);
    }

    #[test]
    fn test_assertions_published_types_empty() {
        assertions::assert_published_types::<TestAction>(&[Effect::None], &[]);
    }
}
