//! The per-exchange interpreter: a mutable runtime driving one machine.
//!
//! Callers build one [`Machine`](crate::machine::Machine), then create one
//! `Interp` per concurrent exchange, call [`init`](Interp::init) to drive to
//! the first quiescent state, and deliver external events (received peer
//! messages, timer firings) via [`handle_event`](Interp::handle_event).
//! Each call chains internally generated transitions until the machine
//! reaches a wait point or a final state.
//!
//! An interpreter is single-owner: the entry points take `&mut self`, so the
//! serialize-your-calls contract of the original is enforced by the borrow
//! checker. To drive one exchange from several threads (a network thread
//! and a timer thread, say), wrap it in an
//! [`InterpRunner`](runner::InterpRunner).

mod checkpoint;
mod error;
pub mod runner;
mod trace;

pub use checkpoint::{Checkpoint, CheckpointError, CHECKPOINT_VERSION};
pub use error::InterpError;
pub use trace::{HistoryEntry, Monitor, TraceStep};

use std::sync::Arc;

use chrono::Utc;
use log::{debug, trace, warn};
use uuid::Uuid;

use crate::event::Event;
use crate::machine::{ActionBody, Machine, State, WaitTimeout};

/// Default bound on internally generated steps per `init()`/`handle_event()`
/// call. A safety valve against authoring mistakes that would otherwise
/// hang an exchange indefinitely; far above any legitimate protocol chain.
pub const DEFAULT_MAX_CHAINED_EVENTS: usize = 100;

/// A pending wait: the resolved timeout plus a generation number that
/// identifies this particular arming.
///
/// Whoever schedules timeouts (typically the runner) reads this after each
/// drive and must discard timer firings whose generation is no longer
/// current — they are stale echoes of an abandoned wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArmedWait {
    pub generation: u64,
    pub timeout: WaitTimeout,
}

/// Hook invoked with a [`Checkpoint`] whenever a resumable state is entered.
pub type Checkpointer = Box<dyn FnMut(&Checkpoint) + Send>;

/// A per-exchange interpreter over a shared machine.
pub struct Interp<M, U> {
    id: Uuid,
    machine: Arc<Machine<M, U>>,
    user: U,
    current: Option<usize>,
    started: bool,
    max_chained: usize,
    history: Vec<HistoryEntry>,
    monitor: Option<Monitor>,
    checkpointer: Option<Checkpointer>,
    armed: Option<ArmedWait>,
    wait_generation: u64,
}

impl<M, U> Interp<M, U> {
    /// Create an interpreter for one exchange, with opaque user data the
    /// actions can read and mutate.
    pub fn new(machine: Arc<Machine<M, U>>, user: U) -> Self {
        Self {
            id: Uuid::new_v4(),
            machine,
            user,
            current: None,
            started: false,
            max_chained: DEFAULT_MAX_CHAINED_EVENTS,
            history: Vec::new(),
            monitor: None,
            checkpointer: None,
            armed: None,
            wait_generation: 0,
        }
    }

    /// This exchange's unique id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Install the observation hook. Every transition, action execution,
    /// and quiescent step is reported; see [`TraceStep`] for the shapes.
    pub fn set_monitor(&mut self, monitor: Monitor) {
        self.monitor = Some(monitor);
    }

    /// Install the checkpointer hook invoked on entry to resumable states.
    pub fn set_checkpointer(&mut self, checkpointer: Checkpointer) {
        self.checkpointer = Some(checkpointer);
    }

    /// Override the per-call chain bound. Must be called before `init()`.
    pub fn set_max_chained_events(&mut self, max: usize) {
        self.max_chained = max;
    }

    /// Drive the machine from its initial state with a synthetic
    /// [`START`](crate::event::START) event, chaining until the first wait
    /// point or final state.
    pub fn init(&mut self) -> Result<(), InterpError> {
        if self.started {
            return Err(InterpError::AlreadyStarted);
        }
        self.started = true;

        let machine = Arc::clone(&self.machine);
        let initial = machine.initial_index();
        debug!(
            target: "interp",
            "{}: exchange {} starting at '{}'",
            machine.name(),
            self.id,
            machine.state_at(initial).name()
        );

        let event: Event<M> = Event::start();
        self.emit(None, &event, None, Some(machine.state_at(initial).name()));
        self.enter_state(initial);
        self.drive(event, true)
    }

    /// Pick an exchange up from a checkpoint, entering the recorded state
    /// with a synthetic [`RESUME`](crate::event::RESUME) event.
    ///
    /// An alternative to `init()`; the same once-only rule applies.
    pub fn resume(&mut self, checkpoint: &Checkpoint) -> Result<(), InterpError> {
        if self.started {
            return Err(InterpError::AlreadyStarted);
        }
        let machine = Arc::clone(&self.machine);
        let index = machine
            .index_of(&checkpoint.resume_state)
            .ok_or_else(|| InterpError::UnknownResumeState(checkpoint.resume_state.clone()))?;
        self.started = true;

        debug!(
            target: "interp",
            "{}: exchange {} resuming at '{}'",
            machine.name(),
            self.id,
            checkpoint.resume_state
        );

        let event: Event<M> = Event::resume();
        self.emit(None, &event, None, Some(machine.state_at(index).name()));
        self.enter_state(index);
        self.drive(event, true)
    }

    /// Deliver an externally generated event (received message, timer
    /// firing) and chain until the next wait point or final state.
    pub fn handle_event(&mut self, event: Event<M>) -> Result<(), InterpError> {
        if !self.started {
            return Err(InterpError::NotStarted);
        }
        self.drive(event, false)
    }

    /// True once the current state has no responses.
    pub fn is_final_state(&self) -> bool {
        self.current_state().is_some_and(State::is_final)
    }

    /// The final state, once reached.
    pub fn final_state(&self) -> Option<&State<M, U>> {
        self.current_state().filter(|s| s.is_final())
    }

    /// The current state, once started.
    pub fn current_state(&self) -> Option<&State<M, U>> {
        self.current.map(|i| self.machine.state_at(i))
    }

    pub fn user_data(&self) -> &U {
        &self.user
    }

    pub fn user_data_mut(&mut self) -> &mut U {
        &mut self.user
    }

    /// Consume the interpreter and take the user data back.
    pub fn into_user_data(self) -> U {
        self.user
    }

    pub fn machine(&self) -> &Arc<Machine<M, U>> {
        &self.machine
    }

    /// Ordered (state, timestamp) history of every state entered.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// The history reduced to state names, for diagnostics and tests.
    pub fn state_names(&self) -> Vec<&str> {
        self.history.iter().map(|h| h.state.as_str()).collect()
    }

    /// The currently armed wait, if the exchange is pending one.
    pub fn armed_wait(&self) -> Option<&ArmedWait> {
        self.armed.as_ref()
    }

    /// The chaining loop shared by `init`, `resume`, and `handle_event`.
    ///
    /// `entering` is true when the current state was just entered and its
    /// entry action has not run yet.
    fn drive(&mut self, seed: Event<M>, mut entering: bool) -> Result<(), InterpError> {
        let machine = Arc::clone(&self.machine);
        let mut event = seed;
        let mut chained = 0usize;

        loop {
            let index = self
                .current
                .expect("started interpreter always has a current state");
            let state = machine.state_at(index);

            if entering {
                entering = false;
                if let Some(action) = state.entry_action() {
                    self.emit(Some(state.name()), &event, Some(action.name()), None);
                    match action.body() {
                        ActionBody::Wait(wait) => {
                            self.arm(wait.resolve(&event), state.name());
                            return Ok(());
                        }
                        ActionBody::Handler(f) => {
                            let f = Arc::clone(f);
                            event = f(&event, &mut self.user).map_err(|source| {
                                self.action_error(state.name(), action.name(), source)
                            })?;
                        }
                        ActionBody::MsgHandler(f) => {
                            let f = Arc::clone(f);
                            let out = match event.message() {
                                Some(msg) => f(msg, &event, &mut self.user),
                                None => Err("message handler triggered by an event with no message".into()),
                            };
                            event = out.map_err(|source| {
                                self.action_error(state.name(), action.name(), source)
                            })?;
                        }
                    }
                    chained += 1;
                    self.check_chain(chained, state.name())?;
                    continue;
                }
            }

            let response = match state.get_response(&event) {
                Some(r) => r,
                None => {
                    // Quiescent: nothing internally resolvable, control
                    // returns to the caller.
                    trace!(
                        target: "interp",
                        "{}: '{}' has no response for {}, quiescing",
                        machine.name(),
                        state.name(),
                        event
                    );
                    self.emit(Some(state.name()), &event, None, None);
                    return Ok(());
                }
            };

            // A matched response advances the exchange; any wait armed for
            // the state being left behind is abandoned here, which is what
            // makes later firings of its timer stale.
            self.armed = None;

            if let Some(target) = response.target() {
                trace!(
                    target: "interp",
                    "{}: '{}' --{}--> '{}'",
                    machine.name(),
                    state.name(),
                    event,
                    target
                );
                self.emit(Some(state.name()), &event, None, Some(target));
                let target_index = machine
                    .index_of(target)
                    .expect("transition targets are validated at machine construction");
                self.enter_state(target_index);
                entering = true;
                chained += 1;
                self.check_chain(chained, target)?;
                continue;
            }

            let action = response
                .get_action()
                .expect("a response is either a transition or an action");
            self.emit(Some(state.name()), &event, Some(action.name()), None);
            match action.body() {
                ActionBody::Wait(wait) => {
                    self.arm(wait.resolve(&event), state.name());
                    return Ok(());
                }
                ActionBody::Handler(f) => {
                    let f = Arc::clone(f);
                    event = f(&event, &mut self.user)
                        .map_err(|source| self.action_error(state.name(), action.name(), source))?;
                }
                ActionBody::MsgHandler(f) => {
                    let f = Arc::clone(f);
                    let out = match event.message() {
                        Some(msg) => f(msg, &event, &mut self.user),
                        None => Err("message handler triggered by an event with no message".into()),
                    };
                    event = out
                        .map_err(|source| self.action_error(state.name(), action.name(), source))?;
                }
            }
            chained += 1;
            self.check_chain(chained, state.name())?;
        }
    }

    fn enter_state(&mut self, index: usize) {
        self.current = Some(index);
        let machine = Arc::clone(&self.machine);
        let state = machine.state_at(index);
        self.history.push(HistoryEntry {
            state: state.name().to_string(),
            at: Utc::now(),
        });
        if state.is_resumable() {
            if let Some(checkpointer) = self.checkpointer.as_mut() {
                let bean = Checkpoint::new(machine.name(), state.name());
                checkpointer(&bean);
            }
        }
    }

    fn arm(&mut self, timeout: WaitTimeout, state_name: &str) {
        self.wait_generation += 1;
        trace!(
            target: "interp",
            "{}: '{}' waiting ({:?}, generation {})",
            self.machine.name(),
            state_name,
            timeout,
            self.wait_generation
        );
        self.armed = Some(ArmedWait {
            generation: self.wait_generation,
            timeout,
        });
    }

    fn check_chain(&self, chained: usize, state_name: &str) -> Result<(), InterpError> {
        if chained > self.max_chained {
            warn!(
                target: "interp",
                "{}: exceeded {} chained events at '{}'",
                self.machine.name(),
                self.max_chained,
                state_name
            );
            return Err(InterpError::ChainOverflow {
                state: state_name.to_string(),
                limit: self.max_chained,
            });
        }
        Ok(())
    }

    fn action_error(
        &self,
        state: &str,
        action: &'static str,
        source: crate::machine::ActionFault,
    ) -> InterpError {
        warn!(
            target: "interp",
            "{}: action '{}' failed in '{}': {}",
            self.machine.name(),
            action,
            state,
            source
        );
        InterpError::ActionFailed {
            state: state.to_string(),
            action,
            source,
        }
    }

    fn emit(
        &mut self,
        from: Option<&str>,
        event: &Event<M>,
        action: Option<&'static str>,
        to: Option<&str>,
    ) {
        if let Some(monitor) = self.monitor.as_mut() {
            let step = TraceStep {
                from: from.map(str::to_string),
                event: event.kind().name(),
                action,
                to: to.map(str::to_string),
            };
            monitor(&step);
        }
    }
}
