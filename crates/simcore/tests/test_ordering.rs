use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use simcore::{cast, Event, EventHandler, Id, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct Message {
    label: String,
}

struct Recorder {
    received: Vec<(f64, String)>,
    ctx: SimulationContext,
}

impl EventHandler for Recorder {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Message { label } => {
                self.received.push((self.ctx.time(), label));
            }
        })
    }
}

fn setup() -> (Simulation, SimulationContext, Rc<RefCell<Recorder>>, Id) {
    let mut sim = Simulation::new(123);
    let client = sim.create_context("client");
    let recorder = Rc::new(RefCell::new(Recorder {
        received: Vec::new(),
        ctx: sim.create_context("recorder"),
    }));
    let recorder_id = sim.add_handler("recorder", recorder.clone());
    (sim, client, recorder, recorder_id)
}

fn msg(label: &str) -> Message {
    Message { label: label.to_string() }
}

fn labels(recorder: &Rc<RefCell<Recorder>>) -> Vec<String> {
    recorder.borrow().received.iter().map(|(_, l)| l.clone()).collect()
}

#[test]
fn test_events_are_delivered_in_time_order() {
    let (mut sim, mut client, recorder, id) = setup();
    client.emit(msg("c"), id, 3.);
    client.emit(msg("a"), id, 1.);
    client.emit(msg("b"), id, 2.);
    sim.step_until_no_events();
    assert_eq!(labels(&recorder), vec!["a", "b", "c"]);
    assert_eq!(sim.time(), 3.);
}

#[test]
fn test_same_time_events_keep_scheduling_order() {
    let (mut sim, mut client, recorder, id) = setup();
    for label in ["first", "second", "third", "fourth"] {
        client.emit(msg(label), id, 5.);
    }
    client.emit(msg("early"), id, 4.);
    sim.step_until_no_events();
    assert_eq!(labels(&recorder), vec!["early", "first", "second", "third", "fourth"]);
}

#[test]
fn test_negative_delay_is_clamped_to_now() {
    let (mut sim, mut client, recorder, id) = setup();
    client.emit(msg("x"), id, 2.);
    sim.step();
    client.emit(msg("late"), id, 1.);
    client.emit(msg("past"), id, -5.);
    client.emit(msg("nan"), id, f64::NAN);
    sim.step_until_no_events();
    assert_eq!(labels(&recorder), vec!["x", "past", "nan", "late"]);
    let times: Vec<f64> = recorder.borrow().received.iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![2., 2., 2., 3.]);
}

#[test]
fn test_advance_processes_all_events_at_next_time() {
    let (mut sim, mut client, recorder, id) = setup();
    client.emit(msg("a"), id, 1.);
    client.emit(msg("b"), id, 1.);
    client.emit(msg("c"), id, 1.5);
    assert_eq!(sim.advance(), 2);
    assert_eq!(sim.time(), 1.);
    assert_eq!(labels(&recorder), vec!["a", "b"]);
    assert_eq!(sim.advance(), 1);
    assert_eq!(sim.time(), 1.5);
    assert_eq!(sim.advance(), 0);
}

#[test]
fn test_step_for_duration() {
    let (mut sim, mut client, _recorder, id) = setup();
    client.emit(msg("a"), id, 1.);
    client.emit(msg("b"), id, 2.);
    client.emit(msg("c"), id, 3.5);
    assert!(sim.step_for_duration(1.5));
    assert_eq!(sim.time(), 1.);
    assert!(sim.step_for_duration(0.1));
    assert_eq!(sim.time(), 1.);
    assert!(!sim.step_for_duration(3.));
    assert_eq!(sim.time(), 3.5);
}

#[test]
fn test_same_seed_gives_same_random_sequence() {
    let mut sim1 = Simulation::new(42);
    let mut sim2 = Simulation::new(42);
    let mut ctx1 = sim1.create_context("comp");
    let mut ctx2 = sim2.create_context("comp");
    for _ in 0..10 {
        assert_eq!(ctx1.rand(), ctx2.rand());
    }
    let x: u32 = sim1.gen_range(0..1000);
    let y: u32 = sim2.gen_range(0..1000);
    assert_eq!(x, y);
}
