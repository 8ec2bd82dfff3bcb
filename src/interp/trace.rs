//! Observation hook for exact execution-trace verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One step reported through the interpreter's monitor hook.
///
/// Shapes, in the order they occur:
/// - transition: `(from, event, None, Some(to))`, with `from == None` for
///   the initial entry and for resume;
/// - action execution (including waits): `(from, event, Some(action), None)`;
/// - quiescent/no-match: `(from, event, None, None)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceStep {
    /// State the interpreter was in, `None` before the initial entry.
    pub from: Option<String>,
    /// Kind name of the triggering event.
    pub event: &'static str,
    /// Name of the executed action, if this step ran one.
    pub action: Option<&'static str>,
    /// State transitioned into, if this step was a transition.
    pub to: Option<String>,
}

/// Monitor closure receiving every [`TraceStep`].
pub type Monitor = Box<dyn FnMut(&TraceStep) + Send>;

/// One entry of the interpreter's state history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Name of the entered state.
    pub state: String,
    /// When it was entered.
    pub at: DateTime<Utc>,
}
