//! A vote-solicitation exchange driven through the runner, with a real
//! timer racing the peer's reply.
//!
//! Run with: `cargo run --example agreement_exchange`

use std::sync::Arc;
use std::time::Duration;

use colloquy::event::{Event, ELSE, EVENT, MSG, TIMEOUT};
use colloquy::machine::{Action, Machine, Response, State, Wait};
use colloquy::{Interp, InterpRunner, TimerQueue};

colloquy::event_kinds! {
    static RCV_VOTE = "RcvVote" < MSG;
    static TALLIED = "Tallied" < EVENT;
}

#[derive(Default)]
struct Tally {
    votes: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let states = vec![
        State::new("Solicit")
            .entry_wait(Wait::For(Duration::from_millis(300)))
            .respond(Response::action(
                &RCV_VOTE,
                Action::msg_handler("tally", |ballot: &String, _ev, tally: &mut Tally| {
                    tally.votes += 1;
                    println!("<- ballot {ballot:?} (vote #{})", tally.votes);
                    Ok(Event::new(&TALLIED))
                }),
            ))
            // Each tallied vote re-arms the deadline.
            .respond(Response::wait(&TALLIED, Wait::For(Duration::from_millis(300))))
            .respond(Response::transition(&TIMEOUT, "Expired"))
            .respond(Response::transition(&ELSE, "Error")),
        State::new("Expired").succeed(),
        State::new("Error").fail(),
    ];
    let machine = Arc::new(Machine::new("Agreement", states, "Solicit")?);

    let interp = Interp::new(machine, Tally::default());
    let runner = InterpRunner::spawn(interp, Arc::new(TimerQueue::new()));

    runner.enqueue_start(Box::new(|e| eprintln!("start failed: {e}")))?;

    // Two peers reply before the deadline expires the solicitation.
    for peer in ["alice", "bob"] {
        runner.enqueue_event(
            Event::msg_as(&RCV_VOTE, format!("ballot-of-{peer}")),
            Box::new(|e| eprintln!("dispatch failed: {e}")),
        )?;
    }

    assert!(runner.wait_final(Duration::from_secs(5)));
    let interp = runner.join();
    println!(
        "exchange over: states {:?}, {} vote(s) tallied",
        interp.state_names(),
        interp.user_data().votes,
    );
    Ok(())
}
