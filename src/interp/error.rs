//! Run-time dispatch errors.

use thiserror::Error;

use crate::machine::ActionFault;

/// Errors raised while driving an interpreter.
///
/// Dispatch errors (`ChainOverflow`, `ActionFailed`) leave the interpreter's
/// current state unchanged at the point of failure; the interpreter never
/// retries on its own, and retrying the same input against unchanged state
/// deterministically repeats the failure. Usage errors (`AlreadyStarted`,
/// `NotStarted`, `UnknownResumeState`) are raised immediately with no side
/// effects.
#[derive(Debug, Error)]
pub enum InterpError {
    /// `init()` or `resume()` called on an interpreter that already ran one.
    #[error("interpreter already started")]
    AlreadyStarted,

    /// `handle_event()` called before a successful `init()`/`resume()`.
    #[error("interpreter not started")]
    NotStarted,

    /// The chaining loop exceeded the per-call bound without reaching a
    /// wait or final state: a machine-authoring mistake that would
    /// otherwise hang the exchange indefinitely.
    #[error("exceeded {limit} chained events without quiescing, at state '{state}'")]
    ChainOverflow { state: String, limit: usize },

    /// An action handler returned a fault; the original cause is attached
    /// as `source`.
    #[error("action '{action}' failed in state '{state}'")]
    ActionFailed {
        state: String,
        action: &'static str,
        #[source]
        source: ActionFault,
    },

    /// A checkpoint named a state the machine does not declare.
    #[error("checkpoint resume state '{0}' is not declared by the machine")]
    UnknownResumeState(String),
}
