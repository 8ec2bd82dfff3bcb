//! End-to-end exchange tests: machines driven through the runner with real
//! timers, racing async completions against wait deadlines.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use colloquy::event::{Event, ELSE, EVENT, TIMEOUT};
use colloquy::machine::{Action, Machine, Response, State, Wait};
use colloquy::{Interp, InterpError, InterpRunner, RunnerHandle, TimerQueue, TimerService};

colloquy::event_kinds! {
    static SCHED = "Sched" < EVENT;
    static NOT_SCHED = "NotSched" < EVENT;
    static TASK_COMPLETE = "TaskComplete" < EVENT;
    static OK = "Ok" < EVENT;
}

const SHOULD_SETTLE: Duration = Duration::from_secs(10);

type Msg = &'static str;

fn panic_on_err() -> colloquy::interp::runner::ErrorHandler {
    Box::new(|e| panic!("unexpected dispatch error: {e}"))
}

/// Tracks user-visible progress of one exchange across threads.
struct TestObj {
    /// How long the fake computation runs, in ms; zero means scheduling
    /// fails and the machine takes the error path.
    compute_ms: u64,
    /// Wait deadline threaded through the Sched event's user value; zero
    /// means wait forever.
    timeout_ms: u64,
    /// Artificial sleep inside the scheduling action, to force the
    /// completion to land before the action itself returns.
    delay_ms: u64,
    events: Arc<Mutex<Vec<&'static str>>>,
    timers: Arc<TimerQueue>,
    /// Filled in after the runner is spawned, before start is enqueued.
    handle: Arc<Mutex<Option<RunnerHandle<Msg>>>>,
}

/// Schedule-a-computation machine: Start schedules async work and waits for
/// its completion or a deadline, mirroring one leg of a peer agreement
/// exchange.
fn compute_machine() -> Arc<Machine<Msg, TestObj>> {
    let sched = Action::handler("sched", |_ev, obj: &mut TestObj| {
        if obj.compute_ms == 0 {
            obj.events.lock().unwrap().push("notsched");
            return Ok(Event::new(&NOT_SCHED));
        }
        let events = Arc::clone(&obj.events);
        let handle = obj
            .handle
            .lock()
            .unwrap()
            .clone()
            .ok_or("runner handle not installed")?;
        obj.timers.schedule(
            Duration::from_millis(obj.compute_ms),
            Box::new(move || {
                events.lock().unwrap().push("taskcomplete");
                let _ = handle.enqueue_event(Event::new(&TASK_COMPLETE), Box::new(|_| {}));
            }),
        );
        if obj.delay_ms != 0 {
            // Let the fake computation finish before this action returns,
            // forcing the user events into the surprising order.
            std::thread::sleep(Duration::from_millis(obj.delay_ms));
        }
        obj.events.lock().unwrap().push("sched");
        if obj.timeout_ms != 0 {
            Ok(Event::new(&SCHED).with_user_val(obj.timeout_ms))
        } else {
            Ok(Event::new(&SCHED))
        }
    });

    let done = Action::handler("done", |_ev, obj: &mut TestObj| {
        obj.events.lock().unwrap().push("done");
        Ok(Event::new(&OK))
    });

    let states = vec![
        State::new("Start")
            .entry(sched)
            .respond(Response::transition(&SCHED, "WaitCompute"))
            .respond(Response::transition(&ELSE, "Error")),
        State::new("WaitCompute")
            .entry_wait(Wait::FromTrigger)
            .respond(Response::transition(&TASK_COMPLETE, "AlmostDone"))
            .respond(Response::transition(&TIMEOUT, "GiveUp"))
            .respond(Response::transition(&ELSE, "Error")),
        State::new("AlmostDone")
            .entry(done)
            .respond(Response::transition(&ELSE, "Done")),
        State::new("Done").succeed(),
        State::new("Error").fail(),
        State::new("GiveUp").fail(),
    ];
    Arc::new(Machine::new("Compute", states, "Start").unwrap())
}

struct Outcome {
    states: Vec<String>,
    events: Vec<&'static str>,
    succeeded: bool,
    failed: bool,
}

fn run_exchange(timeout_ms: u64, compute_ms: u64, delay_ms: u64) -> Outcome {
    let timers = Arc::new(TimerQueue::new());
    let events = Arc::new(Mutex::new(Vec::new()));
    let slot = Arc::new(Mutex::new(None));
    let obj = TestObj {
        compute_ms,
        timeout_ms,
        delay_ms,
        events: Arc::clone(&events),
        timers: Arc::clone(&timers),
        handle: Arc::clone(&slot),
    };

    let interp = Interp::new(compute_machine(), obj);
    let runner = InterpRunner::spawn(interp, timers);
    *slot.lock().unwrap() = Some(runner.handle());

    runner.enqueue_start(panic_on_err()).unwrap();
    assert!(
        runner.wait_final(SHOULD_SETTLE),
        "exchange did not reach a final state"
    );

    let interp = runner.join();
    let final_state = interp.final_state().unwrap();
    let events = events.lock().unwrap().clone();
    Outcome {
        states: interp.state_names().iter().map(|s| s.to_string()).collect(),
        events,
        succeeded: final_state.is_succeed(),
        failed: final_state.is_fail(),
    }
}

#[test]
fn completion_wins_regardless_of_notification_order() {
    // (compute, delay): normal, quick, completion-after-return forced,
    // completion-before-return forced.
    for (compute_ms, delay_ms) in [(100, 0), (1, 0), (100, 10), (1, 10)] {
        let outcome = run_exchange(0, compute_ms, delay_ms);
        assert_eq!(
            outcome.states,
            vec!["Start", "WaitCompute", "AlmostDone", "Done"],
            "compute={compute_ms} delay={delay_ms}"
        );
        assert!(outcome.succeeded);
        assert!(!outcome.failed);
        let sched_then = vec!["sched", "taskcomplete", "done"];
        let complete_then = vec!["taskcomplete", "sched", "done"];
        assert!(
            outcome.events == sched_then || outcome.events == complete_then,
            "unexpected user event order: {:?}",
            outcome.events
        );
    }
}

#[test]
fn deadline_beats_slow_computation() {
    for (timeout_ms, compute_ms, delay_ms) in [(50, 5000, 0), (1, 5000, 10)] {
        let outcome = run_exchange(timeout_ms, compute_ms, delay_ms);
        assert_eq!(
            outcome.states,
            vec!["Start", "WaitCompute", "GiveUp"],
            "timeout={timeout_ms} compute={compute_ms}"
        );
        assert!(outcome.failed);
        assert!(!outcome.succeeded);
        // The slow computation may or may not have been observed yet.
        assert!(outcome.events == vec!["sched"] || outcome.events == vec!["sched", "taskcomplete"]);
    }
}

#[test]
fn generous_deadline_does_not_fire() {
    for (compute_ms, delay_ms) in [(10, 0), (1, 10)] {
        let outcome = run_exchange(5000, compute_ms, delay_ms);
        assert_eq!(
            outcome.states,
            vec!["Start", "WaitCompute", "AlmostDone", "Done"]
        );
        assert!(outcome.succeeded);
    }
}

#[test]
fn failed_scheduling_takes_the_error_path() {
    let outcome = run_exchange(0, 0, 0);
    assert_eq!(outcome.states, vec!["Start", "Error"]);
    assert!(outcome.failed);
    assert_eq!(outcome.events, vec!["notsched"]);
}

#[test]
fn fixed_wait_times_out_into_succeed_state() {
    let states: Vec<State<Msg, ()>> = vec![
        State::new("Start")
            .entry_wait(Wait::For(Duration::from_millis(100)))
            .respond(Response::transition(&TIMEOUT, "Time"))
            .respond(Response::transition(&ELSE, "Error")),
        State::new("Time").succeed(),
        State::new("Error").fail(),
    ];
    let machine = Arc::new(Machine::new("SimpleTimeout", states, "Start").unwrap());
    let interp = Interp::new(machine, ());
    let runner = InterpRunner::spawn(interp, Arc::new(TimerQueue::new()));

    runner.enqueue_start(panic_on_err()).unwrap();
    assert!(runner.wait_final(SHOULD_SETTLE));

    let interp = runner.join();
    assert_eq!(interp.state_names(), vec!["Start", "Time"]);
    assert_eq!(interp.final_state().unwrap().name(), "Time");

    // The timeout must not have fired early.
    let history = interp.history();
    let elapsed = history[1]
        .at
        .signed_duration_since(history[0].at)
        .num_milliseconds();
    assert!(elapsed >= 100, "timeout fired early after {elapsed}ms");
}

#[test]
fn checkpointed_exchange_resumes_in_a_fresh_interpreter() {
    let states: Vec<State<Msg, ()>> = vec![
        State::new("Start")
            .entry_wait(Wait::Forever)
            .respond(Response::transition(&SCHED, "WaitVote")),
        State::new("WaitVote")
            .entry_wait(Wait::Forever)
            .resumable()
            .respond(Response::transition(&OK, "Done")),
        State::new("Done").succeed(),
    ];
    let machine = Arc::new(Machine::new("Resumable", states, "Start").unwrap());

    let beans = Arc::new(Mutex::new(Vec::new()));
    let mut interp = Interp::new(Arc::clone(&machine), ());
    let sink = Arc::clone(&beans);
    interp.set_checkpointer(Box::new(move |cp| sink.lock().unwrap().push(cp.clone())));
    interp.init().unwrap();
    interp.handle_event(Event::new(&SCHED)).unwrap();

    let bean = beans.lock().unwrap().pop().expect("checkpoint taken");
    // Round-trip through the wire form, as a store-and-restart would.
    let bean = colloquy::Checkpoint::from_bytes(&bean.to_bytes().unwrap()).unwrap();

    let mut restored = Interp::new(machine, ());
    restored.resume(&bean).unwrap();
    assert_eq!(restored.state_names(), vec!["WaitVote"]);

    restored.handle_event(Event::new(&OK)).unwrap();
    assert!(restored.is_final_state());
    assert!(restored.final_state().unwrap().is_succeed());
}

#[test]
fn runner_resume_follows_the_same_once_only_rule() {
    // Capture a bean from a synchronous interpreter first.
    let capture_states: Vec<State<Msg, ()>> = vec![State::new("Start")
        .entry_wait(Wait::Forever)
        .resumable()
        .respond(Response::transition(&OK, "Start"))];
    let capture_machine = Arc::new(Machine::new("M", capture_states, "Start").unwrap());
    let beans = Arc::new(Mutex::new(Vec::new()));
    let mut source = Interp::new(capture_machine, ());
    let sink = Arc::clone(&beans);
    source.set_checkpointer(Box::new(move |cp| sink.lock().unwrap().push(cp.clone())));
    source.init().unwrap();
    let bean = beans.lock().unwrap().pop().expect("checkpoint taken");

    let states: Vec<State<Msg, ()>> = vec![
        State::new("Start")
            .entry_wait(Wait::Forever)
            .respond(Response::transition(&OK, "Done")),
        State::new("Done").succeed(),
    ];
    let machine = Arc::new(Machine::new("M", states, "Start").unwrap());
    let runner = InterpRunner::spawn(Interp::new(machine, ()), Arc::new(TimerQueue::new()));

    runner.enqueue_resume(bean.clone(), panic_on_err()).unwrap();
    assert!(runner.wait_idle(SHOULD_SETTLE));
    assert!(matches!(
        runner.enqueue_resume(bean, panic_on_err()),
        Err(InterpError::AlreadyStarted)
    ));
}
