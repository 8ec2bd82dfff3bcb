//! Actions: the units of computation bound to states and responses.
//!
//! Every action other than a wait runs synchronously and returns exactly one
//! event, which the interpreter resolves next. The original system validated
//! externally supplied handler methods reflectively at bind time; here the
//! handler signature is a compile-time contract, so an ill-typed handler
//! cannot be constructed at all.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::event::Event;

/// Error type handlers use to signal a run-time fault.
///
/// The interpreter wraps it as
/// [`InterpError::ActionFailed`](crate::interp::InterpError::ActionFailed)
/// with the fault as `source`.
pub type ActionFault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A plain handler: triggering event and user data in, one event out.
pub type HandlerFn<M, U> =
    Arc<dyn Fn(&Event<M>, &mut U) -> Result<Event<M>, ActionFault> + Send + Sync>;

/// A message handler: additionally receives the carried message.
pub type MsgHandlerFn<M, U> =
    Arc<dyn Fn(&M, &Event<M>, &mut U) -> Result<Event<M>, ActionFault> + Send + Sync>;

/// How long a wait may pend before the interpreter is fed a
/// [`TIMEOUT`](crate::event::TIMEOUT) event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitTimeout {
    /// Only an external event can advance the exchange.
    Forever,
    /// A deadline this far in the future.
    In(Duration),
}

/// Wait specification attached to a state entry or a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wait {
    /// Wait with no deadline.
    Forever,
    /// Wait with a fixed deadline.
    For(Duration),
    /// Wait with the deadline carried by the triggering event's user value,
    /// in milliseconds. Zero or absent means no deadline, letting one wait
    /// definition honor a caller-supplied per-exchange timeout.
    FromTrigger,
}

impl Wait {
    pub(crate) fn resolve<M>(&self, trigger: &Event<M>) -> WaitTimeout {
        match self {
            Wait::Forever => WaitTimeout::Forever,
            Wait::For(d) => WaitTimeout::In(*d),
            Wait::FromTrigger => match trigger.user_val() {
                Some(ms) if ms > 0 => WaitTimeout::In(Duration::from_millis(ms)),
                _ => WaitTimeout::Forever,
            },
        }
    }
}

pub(crate) enum ActionBody<M, U> {
    Wait(Wait),
    Handler(HandlerFn<M, U>),
    MsgHandler(MsgHandlerFn<M, U>),
}

/// A named unit of computation bound to a state entry or a response.
pub struct Action<M, U> {
    name: &'static str,
    body: ActionBody<M, U>,
}

impl<M, U> Action<M, U> {
    /// A wait action.
    pub fn wait(wait: Wait) -> Self {
        Self {
            name: "wait",
            body: ActionBody::Wait(wait),
        }
    }

    /// A named handler. The signature is the full binding contract: if it
    /// compiles, it can be dispatched.
    pub fn handler<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&Event<M>, &mut U) -> Result<Event<M>, ActionFault> + Send + Sync + 'static,
    {
        Self {
            name,
            body: ActionBody::Handler(Arc::new(f)),
        }
    }

    /// A named message handler; refuses non-message events at run time.
    pub fn msg_handler<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&M, &Event<M>, &mut U) -> Result<Event<M>, ActionFault> + Send + Sync + 'static,
    {
        Self {
            name,
            body: ActionBody::MsgHandler(Arc::new(f)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True for wait actions; the interpreter arms a timer instead of
    /// running anything.
    pub fn is_wait(&self) -> bool {
        matches!(self.body, ActionBody::Wait(_))
    }

    pub(crate) fn body(&self) -> &ActionBody<M, U> {
        &self.body
    }
}

impl<M, U> Clone for Action<M, U> {
    fn clone(&self) -> Self {
        let body = match &self.body {
            ActionBody::Wait(w) => ActionBody::Wait(*w),
            ActionBody::Handler(f) => ActionBody::Handler(Arc::clone(f)),
            ActionBody::MsgHandler(f) => ActionBody::MsgHandler(Arc::clone(f)),
        };
        Self {
            name: self.name,
            body,
        }
    }
}

impl<M, U> fmt::Debug for Action<M, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({})", self.name)
    }
}
