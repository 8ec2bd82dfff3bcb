//! Channel-fed driver enforcing the single-owner contract.
//!
//! A bare [`Interp`] must be driven from one place at a time. Real
//! exchanges are driven from several: a network thread delivering peer
//! messages, a timer thread delivering timeouts, the thread that started
//! the exchange. `InterpRunner` moves the interpreter onto a dedicated
//! worker fed by a command channel, so every caller just enqueues and the
//! worker serializes.
//!
//! The runner also owns wait scheduling: after each drive it reconciles the
//! interpreter's armed wait against the [`TimerService`], cancelling
//! superseded handles, and re-injects timer firings as
//! [`TIMEOUT`](crate::event::TIMEOUT) events. Firings whose wait generation
//! is no longer current are stale and dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel as chan;
use log::{trace, warn};

use crate::event::Event;
use crate::interp::{Checkpoint, Interp, InterpError};
use crate::machine::WaitTimeout;
use crate::timer::{TimerHandle, TimerService};

/// Per-command error callback: dispatch errors surface here, and the worker
/// keeps serving subsequent commands.
pub type ErrorHandler = Box<dyn FnOnce(InterpError) + Send>;

/// Optional per-command completion callback, run after the command's drive.
pub type Completion = Box<dyn FnOnce() + Send>;

enum Cmd<M> {
    Start(ErrorHandler),
    Resume(Checkpoint, ErrorHandler),
    Event(Event<M>, ErrorHandler, Option<Completion>),
    TimerFired(u64),
    Shutdown,
}

struct Progress {
    pending: usize,
    final_state: bool,
}

struct Shared {
    started: AtomicBool,
    progress: Mutex<Progress>,
    cond: Condvar,
}

impl Shared {
    fn add_pending(&self) {
        self.progress.lock().unwrap().pending += 1;
    }

    fn abandon(&self) {
        let mut progress = self.progress.lock().unwrap();
        progress.pending = progress.pending.saturating_sub(1);
        drop(progress);
        self.cond.notify_all();
    }

    fn settle(&self, final_state: bool) {
        let mut progress = self.progress.lock().unwrap();
        progress.pending = progress.pending.saturating_sub(1);
        progress.final_state = final_state;
        drop(progress);
        self.cond.notify_all();
    }

    fn wait_until<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&Progress) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut progress = self.progress.lock().unwrap();
        loop {
            if pred(&progress) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.cond.wait_timeout(progress, deadline - now).unwrap();
            progress = guard;
        }
    }
}

/// Cheap clone for enqueueing events from other threads — the way an action
/// that delegated long-running work reports its completion back into the
/// same exchange.
pub struct RunnerHandle<M> {
    tx: chan::Sender<Cmd<M>>,
    shared: Arc<Shared>,
}

impl<M> Clone for RunnerHandle<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M> RunnerHandle<M> {
    /// Enqueue an external event. Fails with
    /// [`InterpError::NotStarted`] until a start or resume was enqueued.
    pub fn enqueue_event(&self, event: Event<M>, on_err: ErrorHandler) -> Result<(), InterpError> {
        self.enqueue_event_then(event, on_err, None)
    }

    fn enqueue_event_then(
        &self,
        event: Event<M>,
        on_err: ErrorHandler,
        completion: Option<Completion>,
    ) -> Result<(), InterpError> {
        if !self.shared.started.load(Ordering::SeqCst) {
            return Err(InterpError::NotStarted);
        }
        self.shared.add_pending();
        if self.tx.send(Cmd::Event(event, on_err, completion)).is_err() {
            self.shared.abandon();
        }
        Ok(())
    }
}

/// Owns one [`Interp`] on a worker thread and serializes all entry points
/// through a command channel.
pub struct InterpRunner<M, U> {
    handle: RunnerHandle<M>,
    worker: Option<JoinHandle<Interp<M, U>>>,
}

impl<M, U> InterpRunner<M, U>
where
    M: Send + Sync + 'static,
    U: Send + 'static,
{
    /// Move `interp` onto a worker thread. `timers` schedules the timeouts
    /// of timed waits.
    pub fn spawn(interp: Interp<M, U>, timers: Arc<dyn TimerService>) -> Self {
        let (tx, rx) = chan::unbounded();
        let shared = Arc::new(Shared {
            started: AtomicBool::new(false),
            progress: Mutex::new(Progress {
                pending: 0,
                final_state: false,
            }),
            cond: Condvar::new(),
        });
        let worker = {
            let worker = Worker {
                interp,
                rx,
                tx: tx.clone(),
                shared: Arc::clone(&shared),
                timers,
                timer: None,
                scheduled_generation: 0,
            };
            thread::Builder::new()
                .name("interp-runner".into())
                .spawn(move || worker.run())
                .expect("failed to spawn interp-runner thread")
        };
        Self {
            handle: RunnerHandle { tx, shared },
            worker: Some(worker),
        }
    }

    /// Enqueue the initial drive. Rejects a second start (or a start after
    /// resume) synchronously, with no side effects.
    pub fn enqueue_start(&self, on_err: ErrorHandler) -> Result<(), InterpError> {
        if self.handle.shared.started.swap(true, Ordering::SeqCst) {
            return Err(InterpError::AlreadyStarted);
        }
        self.handle.shared.add_pending();
        if self.handle.tx.send(Cmd::Start(on_err)).is_err() {
            self.handle.shared.abandon();
        }
        Ok(())
    }

    /// Enqueue a resume from a checkpoint; same once-only rule as start.
    pub fn enqueue_resume(
        &self,
        checkpoint: Checkpoint,
        on_err: ErrorHandler,
    ) -> Result<(), InterpError> {
        if self.handle.shared.started.swap(true, Ordering::SeqCst) {
            return Err(InterpError::AlreadyStarted);
        }
        self.handle.shared.add_pending();
        if self
            .handle
            .tx
            .send(Cmd::Resume(checkpoint, on_err))
            .is_err()
        {
            self.handle.shared.abandon();
        }
        Ok(())
    }

    /// Enqueue an external event.
    pub fn enqueue_event(&self, event: Event<M>, on_err: ErrorHandler) -> Result<(), InterpError> {
        self.handle.enqueue_event(event, on_err)
    }

    /// Enqueue an external event with a completion callback run after the
    /// drive settles.
    pub fn enqueue_event_then(
        &self,
        event: Event<M>,
        on_err: ErrorHandler,
        completion: Completion,
    ) -> Result<(), InterpError> {
        self.handle.enqueue_event_then(event, on_err, Some(completion))
    }

    /// A cloneable handle for cross-thread completions.
    pub fn handle(&self) -> RunnerHandle<M> {
        self.handle.clone()
    }

    /// Block until every enqueued command has been processed, or `timeout`
    /// elapses. True on idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.handle
            .shared
            .wait_until(timeout, |p| p.pending == 0)
    }

    /// Block until the interpreter reaches a final state, or `timeout`
    /// elapses. True on final.
    pub fn wait_final(&self, timeout: Duration) -> bool {
        self.handle.shared.wait_until(timeout, |p| p.final_state)
    }

    /// True once the interpreter has settled in a final state.
    pub fn is_final(&self) -> bool {
        self.handle
            .shared
            .progress
            .lock()
            .unwrap()
            .final_state
    }

    /// Stop the worker and take the interpreter back.
    pub fn join(mut self) -> Interp<M, U> {
        let _ = self.handle.tx.send(Cmd::Shutdown);
        let worker = self
            .worker
            .take()
            .expect("worker present until joined or dropped");
        worker.join().expect("interp-runner thread panicked")
    }
}

impl<M, U> Drop for InterpRunner<M, U> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.handle.tx.send(Cmd::Shutdown);
            let _ = worker.join();
        }
    }
}

struct Worker<M, U> {
    interp: Interp<M, U>,
    rx: chan::Receiver<Cmd<M>>,
    tx: chan::Sender<Cmd<M>>,
    shared: Arc<Shared>,
    timers: Arc<dyn TimerService>,
    timer: Option<TimerHandle>,
    scheduled_generation: u64,
}

impl<M, U> Worker<M, U>
where
    M: Send + Sync + 'static,
{
    fn run(mut self) -> Interp<M, U> {
        while let Ok(cmd) = self.rx.recv() {
            match cmd {
                Cmd::Shutdown => break,
                Cmd::Start(on_err) => {
                    if let Err(e) = self.interp.init() {
                        on_err(e);
                    }
                    self.finish();
                }
                Cmd::Resume(checkpoint, on_err) => {
                    if let Err(e) = self.interp.resume(&checkpoint) {
                        on_err(e);
                    }
                    self.finish();
                }
                Cmd::Event(event, on_err, completion) => {
                    if let Err(e) = self.interp.handle_event(event) {
                        on_err(e);
                    }
                    if let Some(completion) = completion {
                        completion();
                    }
                    self.finish();
                }
                Cmd::TimerFired(generation) => {
                    let current = self.interp.armed_wait().map(|a| a.generation);
                    if current == Some(generation) {
                        if let Err(e) = self.interp.handle_event(Event::timeout()) {
                            warn!(target: "interp", "timeout dispatch failed: {e}");
                        }
                    } else {
                        trace!(
                            target: "interp",
                            "dropping stale timer firing (generation {generation})"
                        );
                    }
                    self.finish();
                }
            }
        }
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.interp
    }

    fn finish(&mut self) {
        self.rearm();
        self.shared.settle(self.interp.is_final_state());
    }

    /// Bring the scheduled timer in line with the interpreter's armed wait.
    fn rearm(&mut self) {
        match self.interp.armed_wait().copied() {
            Some(armed) if armed.generation != self.scheduled_generation => {
                if let Some(timer) = self.timer.take() {
                    timer.cancel();
                }
                self.scheduled_generation = armed.generation;
                if let WaitTimeout::In(after) = armed.timeout {
                    let tx = self.tx.clone();
                    let shared = Arc::clone(&self.shared);
                    let generation = armed.generation;
                    self.timer = Some(self.timers.schedule(
                        after,
                        Box::new(move || {
                            shared.add_pending();
                            if tx.send(Cmd::TimerFired(generation)).is_err() {
                                shared.abandon();
                            }
                        }),
                    ));
                }
            }
            Some(_) => {}
            None => {
                if let Some(timer) = self.timer.take() {
                    timer.cancel();
                }
            }
        }
    }
}
