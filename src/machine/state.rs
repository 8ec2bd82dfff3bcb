//! Named protocol states.

use crate::event::Event;

use super::action::{Action, Wait};
use super::response::Response;

/// A named node in the machine graph: an optional entry action and an
/// ordered response table.
///
/// Built fluently; the ordering of [`respond`](State::respond) calls is
/// significant, because response resolution is a first-match linear scan
/// (see [`get_response`](State::get_response)).
///
/// ```rust
/// use colloquy::event::{ELSE, TIMEOUT};
/// use colloquy::machine::{Response, State, Wait};
///
/// let state: State<(), ()> = State::new("WaitVote")
///     .entry_wait(Wait::Forever)
///     .respond(Response::transition(&TIMEOUT, "GiveUp"))
///     .respond(Response::transition(&ELSE, "Error"));
/// ```
#[derive(Debug)]
pub struct State<M, U> {
    name: String,
    entry: Option<Action<M, U>>,
    responses: Vec<Response<M, U>>,
    succeed: bool,
    fail: bool,
    resumable: bool,
}

impl<M, U> State<M, U> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry: None,
            responses: Vec::new(),
            succeed: false,
            fail: false,
            resumable: false,
        }
    }

    /// Set the entry action, executed immediately when this state becomes
    /// current, before any externally delivered event is considered.
    pub fn entry(mut self, action: Action<M, U>) -> Self {
        self.entry = Some(action);
        self
    }

    /// Shorthand for a wait entry action.
    pub fn entry_wait(self, wait: Wait) -> Self {
        self.entry(Action::wait(wait))
    }

    /// Append a response. Order is the match precedence.
    pub fn respond(mut self, response: Response<M, U>) -> Self {
        self.responses.push(response);
        self
    }

    /// Mark this state as a successful terminal.
    pub fn succeed(mut self) -> Self {
        self.succeed = true;
        self
    }

    /// Mark this state as a failed terminal.
    pub fn fail(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Mark this state as a checkpoint: entering it invokes the
    /// interpreter's checkpointer hook.
    pub fn resumable(mut self) -> Self {
        self.resumable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_action(&self) -> Option<&Action<M, U>> {
        self.entry.as_ref()
    }

    pub fn responses(&self) -> &[Response<M, U>] {
        &self.responses
    }

    /// A state with no responses can never be left: it is final.
    pub fn is_final(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn is_succeed(&self) -> bool {
        self.succeed
    }

    pub fn is_fail(&self) -> bool {
        self.fail
    }

    pub fn is_resumable(&self) -> bool {
        self.resumable
    }

    /// Resolve `event` against the response table: first registered match
    /// wins, with `isa` pattern semantics.
    ///
    /// Registering specific kinds before general ones yields the natural
    /// precedence of leaf subtype over ancestor over the generic
    /// [`MSG`](crate::event::MSG) kind over [`ELSE`](crate::event::ELSE).
    pub fn get_response(&self, event: &Event<M>) -> Option<&Response<M, U>> {
        self.responses.iter().find(|r| r.matches(event))
    }
}
