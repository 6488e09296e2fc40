//! End-to-end runs of the transformer preset: fold the robot into a truck,
//! back the trailer into it and check the docking gate.

use nalgebra::Vector3;
use rig3d_core::{presets, AnimatorState, Simulation, TickReport};

const FRAME: f32 = 0.05;

fn trailer_position(sim: &Simulation) -> Vector3<f32> {
    let trailer = sim.payload().unwrap();
    trailer.part_offset(trailer.root()).unwrap()
}

/// Tick until `done` accepts a report, giving up after `limit` frames.
fn run_until(sim: &mut Simulation, limit: usize, done: impl Fn(&TickReport) -> bool) -> bool {
    (0..limit).any(|_| done(&sim.tick(FRAME).unwrap()))
}

fn closed_transformer() -> Simulation {
    let mut sim = presets::transformer().unwrap();
    assert!(sim.press("transform-close").unwrap());
    assert!(run_until(&mut sim, 30, TickReport::animation_complete));
    assert!(sim.is_in_pose("closed").unwrap());
    sim
}

#[test]
fn closed_truck_docks_trailer_once() {
    let mut sim = closed_transformer();

    sim.press("trailer-back").unwrap();
    assert!(run_until(&mut sim, 60, TickReport::docking_started));
    assert!(matches!(sim.animator().state(), AnimatorState::Docking(_)));

    assert!(run_until(&mut sim, 60, TickReport::docking_complete));
    assert_eq!(trailer_position(&sim), Vector3::new(0.0, 0.6, -1.7));
    assert!(sim.animator().is_idle());

    // Still touching: the gate stays closed until the bodies separate.
    sim.release("trailer-back");
    let report = sim.tick(FRAME).unwrap();
    assert!(report.colliding);
    assert!(!report.docking_started());
    assert!(!sim.animator().is_armed());

    sim.press("trailer-forward").unwrap();
    assert!(run_until(&mut sim, 60, |r| !r.colliding));
    assert!(sim.animator().is_armed());
}

#[test]
fn open_robot_never_docks() {
    let mut sim = presets::transformer().unwrap();
    sim.press("trailer-back").unwrap();

    let mut touched = false;
    for _ in 0..40 {
        let report = sim.tick(FRAME).unwrap();
        touched |= report.colliding;
        assert!(!report.docking_started());
    }
    assert!(touched);
    assert!(sim.animator().is_idle());
}

#[test]
fn docking_ignores_other_inputs() {
    let mut sim = closed_transformer();
    sim.press("trailer-back").unwrap();
    assert!(run_until(&mut sim, 60, TickReport::docking_started));

    assert!(!sim.trigger_transform("open").unwrap());
    sim.press("rotate-head-ccw").unwrap();
    sim.press("trailer-right").unwrap();
    sim.tick(FRAME).unwrap();

    assert!(sim.is_in_pose("closed").unwrap());
    assert_eq!(trailer_position(&sim).x, 0.0);
}

#[test]
fn reopen_after_docking() {
    let mut sim = closed_transformer();
    sim.press("trailer-back").unwrap();
    assert!(run_until(&mut sim, 60, TickReport::docking_complete));
    sim.release_all();

    assert!(sim.press("transform-open").unwrap());
    assert!(run_until(&mut sim, 30, TickReport::animation_complete));
    assert!(sim.is_in_pose("open").unwrap());
    assert_eq!(trailer_position(&sim), Vector3::new(0.0, 0.6, -1.7));
}
