//! Typed events and the message dispatch table.
//!
//! Events are immutable values: the withers ([`Event::with_user_val`],
//! [`Event::with_message`]) return modified copies and never touch the
//! original. The payload type `M` is opaque to the interpreter; it is only
//! stored, cloned by reference count, and handed back to message handlers.

mod kind;
mod msg;

pub use kind::{EventKind, ELSE, EVENT, MSG, RESUME, START, TIMEOUT};
pub use msg::{from_message, Discriminant, MsgKindMap};

use std::fmt;
use std::sync::Arc;

/// An immutable event flowing through an interpreter.
///
/// `M` is the application message type carried by message events; events of
/// non-message kinds simply leave the payload empty.
pub struct Event<M> {
    kind: &'static EventKind,
    user_val: Option<u64>,
    msg: Option<Arc<M>>,
}

impl<M> Event<M> {
    /// A plain event of the given kind, with no user value and no payload.
    pub fn new(kind: &'static EventKind) -> Self {
        Self {
            kind,
            user_val: None,
            msg: None,
        }
    }

    /// The synthetic event `init()` feeds to the initial state.
    pub fn start() -> Self {
        Self::new(&START)
    }

    /// The synthetic event `resume()` feeds to the checkpointed state.
    pub fn resume() -> Self {
        Self::new(&RESUME)
    }

    /// The event delivered when an armed wait times out.
    pub fn timeout() -> Self {
        Self::new(&TIMEOUT)
    }

    /// A message event of the base [`MSG`] kind wrapping `msg`.
    pub fn msg(msg: M) -> Self {
        Self::msg_as(&MSG, msg)
    }

    /// A message event of a specific kind wrapping `msg`.
    ///
    /// `kind` should derive from [`MSG`]; message handlers bound to plain
    /// kinds will otherwise refuse the event at run time.
    pub fn msg_as(kind: &'static EventKind, msg: M) -> Self {
        debug_assert!(kind.isa(&MSG), "message event kind must derive from MSG");
        Self {
            kind,
            user_val: None,
            msg: Some(Arc::new(msg)),
        }
    }

    /// The event's kind.
    pub fn kind(&self) -> &'static EventKind {
        self.kind
    }

    /// True if this event's kind equals or derives from `pattern`.
    pub fn isa(&self, pattern: &'static EventKind) -> bool {
        self.kind.isa(pattern)
    }

    /// The optional integer user value.
    pub fn user_val(&self) -> Option<u64> {
        self.user_val
    }

    /// Copy of this event with the user value set; `self` is unchanged.
    pub fn with_user_val(&self, val: u64) -> Self {
        Self {
            kind: self.kind,
            user_val: Some(val),
            msg: self.msg.clone(),
        }
    }

    /// The carried message, if this is a message event.
    pub fn message(&self) -> Option<&M> {
        self.msg.as_deref()
    }

    /// Copy of this event carrying `msg`; `self` is unchanged.
    pub fn with_message(&self, msg: M) -> Self {
        Self {
            kind: self.kind,
            user_val: self.user_val,
            msg: Some(Arc::new(msg)),
        }
    }
}

impl<M> Clone for Event<M> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            user_val: self.user_val,
            msg: self.msg.clone(),
        }
    }
}

impl<M> fmt::Debug for Event<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Event");
        d.field("kind", &self.kind.name());
        if let Some(val) = self.user_val {
            d.field("user_val", &val);
        }
        if self.msg.is_some() {
            d.field("msg", &"..");
        }
        d.finish()
    }
}

impl<M> fmt::Display for Event<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())
    }
}
