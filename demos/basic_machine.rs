//! Minimal synchronous exchange: build a machine, drive it by hand.
//!
//! Run with: `cargo run --example basic_machine`

use std::sync::Arc;

use colloquy::event::{Event, ELSE, EVENT, MSG};
use colloquy::machine::{Action, Machine, Response, State, Wait};
use colloquy::Interp;

colloquy::event_kinds! {
    static SENT = "Sent" < EVENT;
    static RCV_ACK = "RcvAck" < MSG;
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let states = vec![
        State::new("Greet")
            .entry(Action::handler("send-hello", |_ev, sent: &mut u32| {
                *sent += 1;
                println!("-> hello");
                Ok(Event::new(&SENT))
            }))
            .respond(Response::wait(&SENT, Wait::Forever))
            .respond(Response::transition(&RCV_ACK, "Happy"))
            .respond(Response::transition(&ELSE, "Confused")),
        State::new("Happy").succeed(),
        State::new("Confused").fail(),
    ];
    let machine = Arc::new(Machine::new("Greeting", states, "Greet")?);

    let mut interp = Interp::new(machine, 0u32);
    interp.set_monitor(Box::new(|step| println!("   {step:?}")));

    interp.init()?;
    interp.handle_event(Event::msg_as(&RCV_ACK, "ack from peer"))?;

    println!(
        "exchange over: states {:?}, sent {} message(s), succeeded: {}",
        interp.state_names(),
        interp.user_data(),
        interp.final_state().map(|s| s.is_succeed()).unwrap_or(false),
    );
    Ok(())
}
