//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use helpdesk_core::{effect::Effect, reducer::Reducer};
use std::fmt::Debug;

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion = Box<dyn FnOnce(&[Effect])>;

/// Type alias for error assertion functions
type ErrorAssertion<Err> = Box<dyn FnOnce(&Err)>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// A test either expects the action to be accepted (`then_effects`, the
/// default) or rejected (`then_error`). A rejected action must leave the
/// state exactly as it was given; `run` checks that on its own.
///
/// # Example
///
/// ```ignore
/// use helpdesk_testing::ReducerTest;
///
/// ReducerTest::new(TicketLifecycleReducer::new())
///     .with_env(test_env())
///     .given_state(ticket)
///     .when_action(TicketAction::ChangeStatus { actor, target: TicketStatus::OnPause })
///     .then_state(|ticket| assert_eq!(ticket.status, TicketStatus::OnPause))
///     .then_effects(|effects| assert_eq!(effects.len(), 2))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E, Err>
where
    R: Reducer<State = S, Action = A, Environment = E, Error = Err>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    action: Option<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion>,
    error_assertion: Option<ErrorAssertion<Err>>,
}

impl<R, S, A, E, Err> ReducerTest<R, S, A, E, Err>
where
    R: Reducer<State = S, Action = A, Environment = E, Error = Err>,
    S: Clone + PartialEq + Debug,
    Err: Debug,
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
            effect_assertions: Vec::new(),
            error_assertion: None,
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Expect the action to be rejected and inspect the error (Then)
    #[must_use]
    pub fn then_error<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Err) + 'static,
    {
        self.error_assertion = Some(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set, if the
    /// outcome (accepted or rejected) is not the expected one, or if any
    /// assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let before = state.clone();

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let outcome = self.reducer.reduce(&mut state, action, &env);

        match (outcome, self.error_assertion) {
            (Ok(effects), None) => {
                for assertion in self.effect_assertions {
                    assertion(&effects);
                }
            }
            (Ok(effects), Some(_)) => {
                panic!("Expected the action to be rejected, but it produced {effects:?}")
            }
            (Err(error), None) => panic!("Expected the action to be accepted, got {error:?}"),
            (Err(error), Some(assertion)) => {
                assert_eq!(state, before, "A rejected action must not change state");
                assertion(&error);
            }
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use helpdesk_core::effect::Effect;
    use helpdesk_core::events::TicketEvent;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects(effects: &[Effect]) {
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
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count(effects: &[Effect], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Texts of the conversation entries the effects append, in order.
    #[must_use]
    pub fn appended_texts(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::AppendMessage(message) => Some(message.text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Events the effects announce, in order.
    #[must_use]
    pub fn notified_events(effects: &[Effect]) -> Vec<&TicketEvent> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Notify(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    /// Assert that no effect announces an event
    ///
    /// # Panics
    ///
    /// Panics if a `Notify` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_notification(effects: &[Effect]) {
        assert!(
            !effects.iter().any(|e| matches!(e, Effect::Notify(_))),
            "Expected no Notify effect, but found {effects:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_core::effect::Effect;
    use helpdesk_core::reducer::Reducer;
    use smallvec::{SmallVec, smallvec};

    #[derive(Clone, Debug, PartialEq)]
    struct Gauge {
        level: u8,
    }

    #[derive(Clone, Debug)]
    enum GaugeAction {
        Raise,
        Lower,
    }

    struct GaugeReducer;

    struct NoEnv;

    impl Reducer for GaugeReducer {
        type State = Gauge;
        type Action = GaugeAction;
        type Environment = NoEnv;
        type Error = &'static str;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> Result<SmallVec<[Effect; 4]>, Self::Error> {
            match action {
                GaugeAction::Raise => {
                    state.level = state.level.checked_add(1).ok_or("full")?;
                }
                GaugeAction::Lower => {
                    state.level = state.level.checked_sub(1).ok_or("empty")?;
                }
            }
            Ok(smallvec![Effect::None])
        }
    }

    #[test]
    fn accepted_action_runs_state_and_effect_assertions() {
        ReducerTest::new(GaugeReducer)
            .with_env(NoEnv)
            .given_state(Gauge { level: 0 })
            .when_action(GaugeAction::Raise)
            .then_state(|state| assert_eq!(state.level, 1))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn rejected_action_runs_error_assertion() {
        ReducerTest::new(GaugeReducer)
            .with_env(NoEnv)
            .given_state(Gauge { level: 0 })
            .when_action(GaugeAction::Lower)
            .then_error(|error| assert_eq!(*error, "empty"))
            .then_state(|state| assert_eq!(state.level, 0))
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected the action to be rejected")]
    fn unexpected_acceptance_fails() {
        ReducerTest::new(GaugeReducer)
            .with_env(NoEnv)
            .given_state(Gauge { level: 3 })
            .when_action(GaugeAction::Lower)
            .then_error(|_| {})
            .run();
    }

    #[test]
    fn effect_counting() {
        assertions::assert_effects_count(&[Effect::None], 1);
        assertions::assert_effects_count(&[], 0);
    }
}
