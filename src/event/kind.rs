//! Event kind descriptors and the "is-a" hierarchy.
//!
//! Kinds form a single-inheritance tree rooted at [`EVENT`]. Each kind is a
//! `'static` descriptor; matching walks the parent chain by pointer identity,
//! so no runtime reflection is involved. Declare kinds as `static` items
//! (never `const`, which could duplicate addresses), or use the
//! [`event_kinds!`](crate::event_kinds) macro.

use std::fmt;
use std::ptr;

/// A node in the event type hierarchy.
///
/// The built-in kinds cover the interpreter's own vocabulary:
///
/// - [`EVENT`]: the root; every kind derives from it.
/// - [`ELSE`]: the universal fallback matcher.
/// - [`START`]: synthetic trigger for [`Interp::init`](crate::Interp::init).
/// - [`RESUME`]: synthetic trigger for [`Interp::resume`](crate::Interp::resume).
/// - [`TIMEOUT`]: delivered when an armed wait expires.
/// - [`MSG`]: base kind for message-carrying events.
///
/// Protocol-specific kinds derive from [`MSG`] (or from each other):
///
/// ```rust
/// use colloquy::event::{EventKind, MSG};
///
/// static RCV_VOTE: EventKind = EventKind::new("RcvVote", &MSG);
/// static RCV_VOTE_V1: EventKind = EventKind::new("RcvVoteV1", &RCV_VOTE);
///
/// assert!(RCV_VOTE_V1.isa(&RCV_VOTE));
/// assert!(RCV_VOTE_V1.isa(&MSG));
/// assert!(!RCV_VOTE.isa(&RCV_VOTE_V1));
/// ```
pub struct EventKind {
    name: &'static str,
    parent: Option<&'static EventKind>,
}

/// Root of the kind hierarchy; matches every event when used as a pattern.
pub static EVENT: EventKind = EventKind {
    name: "Event",
    parent: None,
};

/// Universal fallback pattern. Matches every event; registering it last in a
/// state's response list gives that state a catch-all.
pub static ELSE: EventKind = EventKind {
    name: "Else",
    parent: Some(&EVENT),
};

/// Synthetic event kind fed to a machine's initial state by `init()`.
pub static START: EventKind = EventKind {
    name: "Start",
    parent: Some(&EVENT),
};

/// Synthetic event kind fed to the checkpointed state by `resume()`.
pub static RESUME: EventKind = EventKind {
    name: "Resume",
    parent: Some(&EVENT),
};

/// Delivered when the timeout of an armed wait expires.
pub static TIMEOUT: EventKind = EventKind {
    name: "Timeout",
    parent: Some(&EVENT),
};

/// Base kind for events that carry an opaque message payload.
pub static MSG: EventKind = EventKind {
    name: "Msg",
    parent: Some(&EVENT),
};

impl EventKind {
    /// Declare a new kind deriving from `parent`.
    ///
    /// Must be bound to a `static` item so the descriptor has a stable
    /// address for identity checks.
    pub const fn new(name: &'static str, parent: &'static EventKind) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// The kind's display name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The kind this one directly derives from, if any.
    pub fn parent(&self) -> Option<&'static EventKind> {
        self.parent
    }

    /// True if this kind equals or derives from `pattern`, or `pattern` is
    /// one of the universal matchers ([`ELSE`], the root [`EVENT`]).
    pub fn isa(&self, pattern: &'static EventKind) -> bool {
        if ptr::eq(pattern, &ELSE) || ptr::eq(pattern, &EVENT) {
            return true;
        }
        let mut kind: &EventKind = self;
        loop {
            if ptr::eq(kind, pattern) {
                return true;
            }
            match kind.parent {
                Some(parent) => kind = parent,
                None => return false,
            }
        }
    }
}

impl PartialEq for EventKind {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for EventKind {}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Declare static event kinds with their parents.
///
/// # Example
///
/// ```rust
/// use colloquy::event::MSG;
///
/// colloquy::event_kinds! {
///     pub static RCV_POLL = "RcvPoll" < MSG;
///     pub static RCV_POLL_ACK = "RcvPollAck" < RCV_POLL;
/// }
///
/// assert!(RCV_POLL_ACK.isa(&RCV_POLL));
/// ```
#[macro_export]
macro_rules! event_kinds {
    (
        $(
            $(#[$meta:meta])*
            $vis:vis static $name:ident = $label:literal < $parent:path;
        )*
    ) => {
        $(
            $(#[$meta])*
            $vis static $name: $crate::event::EventKind =
                $crate::event::EventKind::new($label, &$parent);
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    static A: EventKind = EventKind::new("A", &MSG);
    static A1: EventKind = EventKind::new("A1", &A);
    static B: EventKind = EventKind::new("B", &MSG);

    #[test]
    fn isa_is_reflexive() {
        assert!(A.isa(&A));
        assert!(MSG.isa(&MSG));
        assert!(EVENT.isa(&EVENT));
    }

    #[test]
    fn isa_walks_ancestor_chain() {
        assert!(A1.isa(&A));
        assert!(A1.isa(&MSG));
        assert!(A1.isa(&EVENT));
        assert!(A.isa(&MSG));
    }

    #[test]
    fn isa_rejects_descendants_and_siblings() {
        assert!(!A.isa(&A1));
        assert!(!A.isa(&B));
        assert!(!B.isa(&A));
        assert!(!MSG.isa(&A));
    }

    #[test]
    fn else_and_root_match_everything() {
        assert!(START.isa(&ELSE));
        assert!(A1.isa(&ELSE));
        assert!(TIMEOUT.isa(&EVENT));
        assert!(ELSE.isa(&EVENT));
    }

    #[test]
    fn non_msg_kinds_are_not_messages() {
        assert!(!START.isa(&MSG));
        assert!(!TIMEOUT.isa(&MSG));
        assert!(!RESUME.isa(&MSG));
    }

    #[test]
    fn kind_equality_is_identity() {
        assert_eq!(A, A);
        assert_ne!(A, B);
        assert_ne!(A, A1);
    }

    #[test]
    fn macro_declares_kinds() {
        event_kinds! {
            static M_ONE = "MOne" < MSG;
            static M_TWO = "MTwo" < M_ONE;
        }
        assert_eq!(M_ONE.name(), "MOne");
        assert!(M_TWO.isa(&M_ONE));
        assert!(M_TWO.isa(&MSG));
    }
}
