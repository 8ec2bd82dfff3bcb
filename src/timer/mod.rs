//! Timer scheduling for wait timeouts.
//!
//! The interpreter never schedules timers itself: whoever drives it (the
//! [`InterpRunner`](crate::interp::runner::InterpRunner), typically) hands a
//! deadline and a callback to a [`TimerService`] and keeps the returned
//! [`TimerHandle`] to cancel a superseded wait. [`TimerQueue`] is the
//! provided implementation: one thread draining a deadline-ordered queue.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::trace;

/// Callback run when a scheduled deadline passes.
///
/// Runs on the timer thread; keep it short (send a message, flip a flag).
pub type TimerCallback = Box<dyn FnOnce() + Send>;

/// Something that can run a callback after a delay.
pub trait TimerService: Send + Sync {
    /// Schedule `callback` to run once, `after` from now. The returned
    /// handle cancels the callback if it has not fired yet.
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle;
}

/// Cancellation handle for one scheduled callback.
///
/// Cancelling is idempotent and racing a concurrent firing is safe: the
/// callback runs at most once, and not at all if `cancel` wins.
#[derive(Clone, Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct Entry {
    due: Instant,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    callback: TimerCallback,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // BinaryHeap is a max-heap; invert so the earliest deadline is on top,
    // ties broken by insertion order.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueState {
    entries: BinaryHeap<Entry>,
    shutdown: bool,
}

struct QueueInner {
    state: Mutex<QueueState>,
    cond: Condvar,
    seq: AtomicU64,
}

/// A dedicated-thread timer queue.
///
/// Dropping the queue stops the thread; entries still pending at that point
/// never fire.
pub struct TimerQueue {
    inner: Arc<QueueInner>,
    worker: Option<JoinHandle<()>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        let inner = Arc::new(QueueInner {
            state: Mutex::new(QueueState {
                entries: BinaryHeap::new(),
                shutdown: false,
            }),
            cond: Condvar::new(),
            seq: AtomicU64::new(0),
        });
        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("timer-queue".into())
            .spawn(move || Self::run(worker_inner))
            .expect("failed to spawn timer-queue thread");
        Self {
            inner,
            worker: Some(worker),
        }
    }

    fn run(inner: Arc<QueueInner>) {
        let mut state = inner.state.lock().unwrap();
        loop {
            if state.shutdown {
                break;
            }
            let now = Instant::now();
            let next_due = state.entries.peek().map(|e| e.due);
            match next_due {
                Some(due) if due <= now => {
                    if let Some(entry) = state.entries.pop() {
                        // Run the callback unlocked so it can reschedule.
                        drop(state);
                        if entry.cancelled.load(Ordering::SeqCst) {
                            trace!(target: "timer", "dropping cancelled timer {}", entry.seq);
                        } else {
                            trace!(target: "timer", "firing timer {}", entry.seq);
                            (entry.callback)();
                        }
                        state = inner.state.lock().unwrap();
                    }
                }
                Some(due) => {
                    let (guard, _) = inner.cond.wait_timeout(state, due - now).unwrap();
                    state = guard;
                }
                None => {
                    state = inner.cond.wait(state).unwrap();
                }
            }
        }
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerService for TimerQueue {
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let entry = Entry {
            due: Instant::now() + after,
            seq: self.inner.seq.fetch_add(1, Ordering::Relaxed),
            cancelled: Arc::clone(&cancelled),
            callback,
        };
        let mut state = self.inner.state.lock().unwrap();
        state.entries.push(entry);
        drop(state);
        self.inner.cond.notify_one();
        TimerHandle { cancelled }
    }
}

impl Drop for TimerQueue {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.shutdown = true;
        }
        self.inner.cond.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
