//! Colloquy: a protocol state machine interpreter for asynchronous peer
//! message exchanges.
//!
//! A distributed content-preservation network runs many concurrent
//! peer-agreement exchanges — solicit a vote, wait for the reply or a
//! deadline, tally, move on. Colloquy factors the machinery out of the
//! protocols: you describe an exchange once as an immutable [`Machine`] of
//! named states, event-pattern responses, and entry actions, then drive one
//! [`Interp`] per live exchange.
//!
//! # Core concepts
//!
//! - **Events** ([`event`]): immutable values in a single-inheritance kind
//!   hierarchy with `isa` matching, plus the built-in sentinels (`START`,
//!   `TIMEOUT`, the `ELSE` fallback) and message-carrying kinds derived
//!   from `MSG`.
//! - **Machines** ([`machine`]): states pair event patterns with transitions
//!   or actions; the whole graph is validated at construction and shared
//!   read-only by any number of interpreters.
//! - **Interpreters** ([`interp`]): per-exchange runtimes. `init()` chains
//!   to the first wait point or final state; each `handle_event()` picks up
//!   from there. Dispatch is synchronous, traced through an observation
//!   hook, and guarded against runaway chains.
//! - **Waits and timers** ([`timer`]): waits arm an externally scheduled
//!   timeout; the [`InterpRunner`] reconciles them with a [`TimerService`]
//!   and feeds firings back in, dropping stale ones.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use colloquy::event::{Event, ELSE, EVENT, MSG};
//! use colloquy::machine::{Action, Machine, Response, State, Wait};
//! use colloquy::Interp;
//!
//! colloquy::event_kinds! {
//!     static SENT = "Sent" < EVENT;
//!     static RCV_VOTE = "RcvVote" < MSG;
//! }
//!
//! let states = vec![
//!     State::new("Solicit")
//!         .entry(Action::handler("send", |_ev, sent: &mut u32| {
//!             *sent += 1;
//!             Ok(Event::new(&SENT))
//!         }))
//!         .respond(Response::wait(&SENT, Wait::Forever))
//!         .respond(Response::transition(&RCV_VOTE, "Tally"))
//!         .respond(Response::transition(&ELSE, "Error")),
//!     State::new("Tally").succeed(),
//!     State::new("Error").fail(),
//! ];
//! let machine = Arc::new(Machine::new("Vote", states, "Solicit")?);
//!
//! let mut interp = Interp::new(machine, 0u32);
//! interp.init()?;
//! interp.handle_event(Event::msg_as(&RCV_VOTE, "ballot"))?;
//!
//! assert!(interp.is_final_state());
//! assert!(interp.final_state().unwrap().is_succeed());
//! assert_eq!(*interp.user_data(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Concurrency
//!
//! A [`Machine`] is freely shareable. A bare [`Interp`] takes `&mut self`,
//! so the single-owner-per-exchange contract is enforced by the compiler;
//! wrap it in an [`InterpRunner`] to drive one exchange from several
//! threads through a command channel.

pub mod event;
pub mod interp;
pub mod machine;
pub mod timer;

// Re-export the types most callers touch.
pub use event::{Event, EventKind};
pub use interp::runner::{Completion, ErrorHandler, InterpRunner, RunnerHandle};
pub use interp::{Checkpoint, CheckpointError, Interp, InterpError, TraceStep};
pub use machine::{Action, ActionFault, Machine, MachineError, Response, State, Wait, WaitTimeout};
pub use timer::{TimerHandle, TimerQueue, TimerService};
