//! The validated, immutable machine graph.

use std::collections::HashMap;

use super::error::MachineError;
use super::state::State;

/// A named, fully validated collection of states with a designated initial
/// state.
///
/// Construction checks the whole graph up front; a machine that exists is a
/// machine that can run. Machines never mutate after construction and are
/// shared read-only (`Arc`) by any number of concurrent interpreters.
#[derive(Debug)]
pub struct Machine<M, U> {
    name: String,
    states: Vec<State<M, U>>,
    index: HashMap<String, usize>,
    initial: usize,
}

impl<M, U> Machine<M, U> {
    /// Validate and build a machine.
    ///
    /// Fails when the name is empty, no states are given, a state name is
    /// empty or duplicated, a response targets an undeclared or empty state
    /// name, or the initial state is not among the declared states.
    pub fn new(
        name: impl Into<String>,
        states: Vec<State<M, U>>,
        initial: &str,
    ) -> Result<Self, MachineError> {
        let name = name.into();
        if name.is_empty() {
            return Err(MachineError::EmptyName);
        }
        if states.is_empty() {
            return Err(MachineError::NoStates(name));
        }

        let mut index = HashMap::with_capacity(states.len());
        for (i, state) in states.iter().enumerate() {
            if state.name().is_empty() {
                return Err(MachineError::EmptyStateName(name));
            }
            if index.insert(state.name().to_string(), i).is_some() {
                return Err(MachineError::DuplicateState {
                    machine: name,
                    state: state.name().to_string(),
                });
            }
        }

        for state in &states {
            for response in state.responses() {
                if let Some(target) = response.target() {
                    if target.is_empty() {
                        return Err(MachineError::EmptyTarget {
                            machine: name,
                            state: state.name().to_string(),
                        });
                    }
                    if !index.contains_key(target) {
                        return Err(MachineError::UnknownTarget {
                            machine: name,
                            state: state.name().to_string(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }

        let initial = match index.get(initial) {
            Some(&i) => i,
            None => {
                return Err(MachineError::UnknownInitial {
                    machine: name,
                    initial: initial.to_string(),
                })
            }
        };

        Ok(Self {
            name,
            states,
            index,
            initial,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a state by name. Returns the identical state object on every
    /// call.
    pub fn state(&self, name: &str) -> Option<&State<M, U>> {
        self.index.get(name).map(|&i| &self.states[i])
    }

    pub fn initial_state(&self) -> &State<M, U> {
        &self.states[self.initial]
    }

    pub fn states(&self) -> &[State<M, U>] {
        &self.states
    }

    pub(crate) fn initial_index(&self) -> usize {
        self.initial
    }

    pub(crate) fn state_at(&self, index: usize) -> &State<M, U> {
        &self.states[index]
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ELSE, TIMEOUT};
    use crate::machine::{Response, Wait};

    fn two_states() -> Vec<State<(), ()>> {
        vec![
            State::new("Start")
                .entry_wait(Wait::Forever)
                .respond(Response::transition(&TIMEOUT, "Done"))
                .respond(Response::transition(&ELSE, "Done")),
            State::new("Done").succeed(),
        ]
    }

    #[test]
    fn valid_machine_builds() {
        let machine = Machine::new("Agreement", two_states(), "Start").unwrap();
        assert_eq!(machine.name(), "Agreement");
        assert_eq!(machine.states().len(), 2);
        assert_eq!(machine.initial_state().name(), "Start");
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            Machine::new("", two_states(), "Start"),
            Err(MachineError::EmptyName)
        ));
    }

    #[test]
    fn no_states_is_rejected() {
        let states: Vec<State<(), ()>> = Vec::new();
        assert!(matches!(
            Machine::new("M", states, "Start"),
            Err(MachineError::NoStates(_))
        ));
    }

    #[test]
    fn empty_state_name_is_rejected() {
        let states: Vec<State<(), ()>> = vec![State::new("")];
        assert!(matches!(
            Machine::new("M", states, ""),
            Err(MachineError::EmptyStateName(_))
        ));
    }

    #[test]
    fn duplicate_state_names_are_rejected() {
        let states: Vec<State<(), ()>> = vec![State::new("S"), State::new("S")];
        let err = Machine::new("M", states, "S").unwrap_err();
        assert!(matches!(err, MachineError::DuplicateState { state, .. } if state == "S"));
    }

    #[test]
    fn unknown_target_is_rejected() {
        let states: Vec<State<(), ()>> =
            vec![State::new("S").respond(Response::transition(&ELSE, "Nowhere"))];
        let err = Machine::new("M", states, "S").unwrap_err();
        assert!(matches!(err, MachineError::UnknownTarget { target, .. } if target == "Nowhere"));
    }

    #[test]
    fn empty_target_is_rejected() {
        let states: Vec<State<(), ()>> =
            vec![State::new("S").respond(Response::transition(&ELSE, ""))];
        assert!(matches!(
            Machine::new("M", states, "S"),
            Err(MachineError::EmptyTarget { .. })
        ));
    }

    #[test]
    fn unknown_initial_is_rejected() {
        let err = Machine::new("M", two_states(), "Elsewhere").unwrap_err();
        assert!(matches!(err, MachineError::UnknownInitial { initial, .. } if initial == "Elsewhere"));
    }

    #[test]
    fn state_lookup_returns_identical_object() {
        let machine = Machine::new("M", two_states(), "Start").unwrap();
        let a = machine.state("Done").unwrap();
        let b = machine.state("Done").unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(machine.state("Missing").is_none());
    }
}
