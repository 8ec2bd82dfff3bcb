//! Responses: what a state does with a matched event.

use crate::event::{Event, EventKind};

use super::action::{Action, Wait};

#[derive(Debug)]
enum Outcome<M, U> {
    Transition(String),
    Action(Action<M, U>),
}

/// Pairs one event pattern with either a transition to a named state or an
/// action to run.
#[derive(Debug)]
pub struct Response<M, U> {
    on: &'static EventKind,
    outcome: Outcome<M, U>,
}

impl<M, U> Response<M, U> {
    /// On `on`, transition to the state named `target`.
    pub fn transition(on: &'static EventKind, target: impl Into<String>) -> Self {
        Self {
            on,
            outcome: Outcome::Transition(target.into()),
        }
    }

    /// On `on`, run `action` in the current state.
    pub fn action(on: &'static EventKind, action: Action<M, U>) -> Self {
        Self {
            on,
            outcome: Outcome::Action(action),
        }
    }

    /// On `on`, arm `wait`. Shorthand for an [`Action::wait`] response.
    pub fn wait(on: &'static EventKind, wait: Wait) -> Self {
        Self::action(on, Action::wait(wait))
    }

    /// The pattern this response is registered for.
    pub fn on(&self) -> &'static EventKind {
        self.on
    }

    /// True if the incoming event's kind satisfies this response's pattern.
    pub fn matches(&self, event: &Event<M>) -> bool {
        event.isa(self.on)
    }

    pub fn is_transition(&self) -> bool {
        matches!(self.outcome, Outcome::Transition(_))
    }

    pub fn is_action(&self) -> bool {
        matches!(self.outcome, Outcome::Action(_))
    }

    /// Target state name for a transition response.
    pub fn target(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Transition(name) => Some(name),
            Outcome::Action(_) => None,
        }
    }

    /// The bound action for an action response.
    pub fn get_action(&self) -> Option<&Action<M, U>> {
        match &self.outcome {
            Outcome::Transition(_) => None,
            Outcome::Action(action) => Some(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventKind, ELSE, MSG, START, TIMEOUT};

    static RCV: EventKind = EventKind::new("Rcv", &MSG);

    #[test]
    fn transition_response_exposes_target() {
        let resp: Response<(), ()> = Response::transition(&TIMEOUT, "GiveUp");
        assert!(resp.is_transition());
        assert!(!resp.is_action());
        assert_eq!(resp.target(), Some("GiveUp"));
        assert!(resp.get_action().is_none());
    }

    #[test]
    fn action_response_exposes_action() {
        let resp: Response<(), ()> =
            Response::action(&RCV, Action::handler("ack", |_, _| Ok(Event::new(&START))));
        assert!(resp.is_action());
        assert_eq!(resp.get_action().map(|a| a.name()), Some("ack"));
        assert!(resp.target().is_none());
    }

    #[test]
    fn wait_response_is_a_wait_action() {
        let resp: Response<(), ()> = Response::wait(&RCV, Wait::Forever);
        assert!(resp.is_action());
        assert!(resp.get_action().unwrap().is_wait());
    }

    #[test]
    fn matches_uses_isa_semantics() {
        let on_msg: Response<(), ()> = Response::transition(&MSG, "Next");
        assert!(on_msg.matches(&Event::msg_as(&RCV, ())));
        assert!(!on_msg.matches(&Event::new(&START)));

        let fallback: Response<(), ()> = Response::transition(&ELSE, "Error");
        assert!(fallback.matches(&Event::new(&START)));
        assert!(fallback.matches(&Event::msg_as(&RCV, ())));
    }
}
