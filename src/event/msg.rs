//! Mapping incoming messages to prototype event kinds.
//!
//! The transport layer decodes a peer message and calls [`from_message`] to
//! classify it: the message's discriminant is looked up in a caller-supplied
//! [`MsgKindMap`], and the resulting event gets the mapped kind, or the base
//! [`MSG`] kind when no entry matches.

use std::collections::HashMap;
use std::hash::Hash;

use super::kind::{EventKind, MSG};
use super::Event;

/// Message payloads that expose a discriminant for event classification.
///
/// Typically the message's opcode or variant tag.
pub trait Discriminant {
    type Key: Eq + Hash;

    fn discriminant(&self) -> Self::Key;
}

/// Dispatch table from message discriminants to prototype event kinds.
pub struct MsgKindMap<K> {
    map: HashMap<K, &'static EventKind>,
}

impl<K: Eq + Hash> MsgKindMap<K> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Map `key` to `kind`; later insertions for the same key win.
    pub fn insert(&mut self, key: K, kind: &'static EventKind) -> &mut Self {
        self.map.insert(key, kind);
        self
    }

    /// The kind registered for `key`, if any.
    pub fn kind_for(&self, key: &K) -> Option<&'static EventKind> {
        self.map.get(key).copied()
    }
}

impl<K: Eq + Hash> Default for MsgKindMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> FromIterator<(K, &'static EventKind)> for MsgKindMap<K> {
    fn from_iter<I: IntoIterator<Item = (K, &'static EventKind)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// Wrap `msg` in an event whose kind is chosen by the message's discriminant.
///
/// Falls back to the base [`MSG`] kind when the table has no entry.
///
/// # Example
///
/// ```rust
/// use colloquy::event::{from_message, Discriminant, EventKind, MsgKindMap, MSG};
///
/// static RCV_POLL: EventKind = EventKind::new("RcvPoll", &MSG);
///
/// struct PeerMsg {
///     opcode: u8,
/// }
///
/// impl Discriminant for PeerMsg {
///     type Key = u8;
///     fn discriminant(&self) -> u8 {
///         self.opcode
///     }
/// }
///
/// let table: MsgKindMap<u8> = [(1u8, &RCV_POLL)].into_iter().collect();
///
/// let known = from_message(PeerMsg { opcode: 1 }, &table);
/// assert_eq!(known.kind().name(), "RcvPoll");
///
/// let unknown = from_message(PeerMsg { opcode: 9 }, &table);
/// assert_eq!(unknown.kind(), &MSG);
/// ```
pub fn from_message<M: Discriminant>(msg: M, table: &MsgKindMap<M::Key>) -> Event<M> {
    let kind = table.kind_for(&msg.discriminant()).unwrap_or(&MSG);
    Event::msg_as(kind, msg)
}
