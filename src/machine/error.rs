//! Machine construction errors.

use thiserror::Error;

/// A malformed machine graph, reported by [`Machine::new`](super::Machine::new).
///
/// Always fatal to the builder; nothing is recovered internally.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("machine name is empty")]
    EmptyName,

    #[error("machine '{0}' has no states")]
    NoStates(String),

    #[error("machine '{0}' contains a state with an empty name")]
    EmptyStateName(String),

    #[error("machine '{machine}' declares state '{state}' more than once")]
    DuplicateState { machine: String, state: String },

    #[error("machine '{machine}': state '{state}' has a response with an empty target")]
    EmptyTarget { machine: String, state: String },

    #[error("machine '{machine}': state '{state}' targets undeclared state '{target}'")]
    UnknownTarget {
        machine: String,
        state: String,
        target: String,
    },

    #[error("machine '{machine}': initial state '{initial}' is not declared")]
    UnknownInitial { machine: String, initial: String },
}
