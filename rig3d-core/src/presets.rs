//! Ready-made rigs: a truck-to-robot transformer with a dockable trailer and
//! a tower crane with a four-finger claw.

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Vector3};

use crate::animator::DockingConfig;
use crate::bounds::Aabb;
use crate::error::{Result, RigError};
use crate::input::{Command, InputMap};
use crate::joint::{JointLimits, JointSpec};
use crate::pose::{Pose, PoseLibrary};
use crate::rig::{PartId, Rig, RigBuilder};
use crate::simulation::{SimConfig, Simulation};
use crate::symmetry::SymmetryTable;
use crate::transform::RotationState;

/// Robot joint jog rate in radians per second.
pub const JOG_RATE: f32 = 1.5;
/// Arm slide rate in units per second.
pub const ARM_RATE: f32 = 0.4;

const ARM_OUT: f32 = -0.375;
const ARM_IN: f32 = -0.225;

/// Uniform scale applied to the crane's dimensions.
const CRANE_SCALE: f32 = 3.0;
/// Claw fingers swing at most this far either way, in radians.
const FINGER_LIMIT: f32 = 0.6;

fn add_box(b: &mut RigBuilder, part: PartId, center: [f32; 3], size: [f32; 3]) -> Result<()> {
    b.add_shape(
        part,
        Aabb::from_center_size(Point3::from(center), Vector3::from(size)),
    )
}

/// Wheels are cylinders of radius 0.15 lying along X.
fn add_wheel(b: &mut RigBuilder, part: PartId, center: [f32; 3]) -> Result<()> {
    add_box(b, part, center, [0.1, 0.3, 0.3])
}

fn build_robot() -> Result<Rig> {
    let mut b = RigBuilder::new("robot");

    let body = b.add_part("body", None, Vector3::zeros())?;
    add_box(&mut b, body, [0.0, 0.0, 0.0], [0.4, 0.2, 0.3])?;
    add_wheel(&mut b, body, [-0.25, -0.05, 0.0])?;
    add_wheel(&mut b, body, [0.25, -0.05, 0.0])?;
    add_box(&mut b, body, [0.0, 0.175, 0.0], [0.3, 0.15, 0.3])?;
    add_box(&mut b, body, [0.0, 0.425, 0.0], [0.6, 0.35, 0.45])?;

    let head = b.add_part("head", Some(body), Vector3::new(0.0, 0.6, 0.0))?;
    add_box(&mut b, head, [0.0, 0.105, 0.0], [0.2, 0.2, 0.2])?;
    add_box(&mut b, head, [-0.05, 0.21, 0.0], [0.02, 0.05, 0.02])?;
    add_box(&mut b, head, [0.05, 0.21, 0.0], [0.02, 0.05, 0.02])?;
    b.add_joint(
        head,
        JointSpec::rotation("head", Vector3::x()).limits(JointLimits::new(-PI, 0.0)?),
    )?;

    for (side, sign) in [("left", -1.0f32), ("right", 1.0)] {
        let arm = b.add_part(
            format!("{side}-arm"),
            Some(body),
            Vector3::new(0.0, 0.35, -0.3),
        )?;
        add_box(&mut b, arm, [0.0, 0.0, 0.0], [0.15, 0.5, 0.15])?;
        add_box(&mut b, arm, [0.0, 0.1, -0.095], [0.04, 0.7, 0.04])?;
        add_box(&mut b, arm, [0.0, -0.175, 0.30], [0.15, 0.15, 0.452])?;
        b.add_joint(
            arm,
            JointSpec::translation(format!("{side}-arm"), Vector3::x())
                .initial(-sign * ARM_OUT)
                .limits(JointLimits::new(
                    (-sign * ARM_OUT).min(-sign * ARM_IN),
                    (-sign * ARM_OUT).max(-sign * ARM_IN),
                )?),
        )?;

        let x = 0.125 * sign;
        let leg = b.add_part(format!("{side}-leg"), Some(body), Vector3::new(0.0, -0.05, 0.0))?;
        add_box(&mut b, leg, [x, -0.2, 0.0], [0.1, 0.3, 0.15])?;
        add_box(&mut b, leg, [x, -0.8, 0.0], [0.15, 0.9, 0.25])?;
        add_wheel(&mut b, leg, [2.0 * x, -0.75, 0.0])?;
        add_wheel(&mut b, leg, [2.0 * x, -1.1, 0.0])?;
        b.add_joint(
            leg,
            JointSpec::rotation(format!("{side}-leg"), Vector3::x())
                .limits(JointLimits::new(0.0, FRAC_PI_2)?),
        )?;

        let foot = b.add_part(format!("{side}-foot"), Some(leg), Vector3::new(x, -1.125, 0.0))?;
        add_box(&mut b, foot, [0.0, 0.0, 0.225], [0.15, 0.25, 0.2])?;
        b.add_joint(
            foot,
            JointSpec::rotation(format!("{side}-foot"), Vector3::x())
                .limits(JointLimits::new(0.0, FRAC_PI_2)?),
        )?;
    }

    b.build()
}

fn build_trailer() -> Result<Rig> {
    let mut b = RigBuilder::new("trailer");
    let trailer = b.add_part("trailer", None, Vector3::new(0.0, 0.6, -3.0))?;
    add_box(&mut b, trailer, [0.0, 0.0, 0.0], [0.7, 1.0, 2.5])?;
    for x in [-0.25, 0.25] {
        add_wheel(&mut b, trailer, [x, -0.65, -1.0])?;
        add_wheel(&mut b, trailer, [x, -0.65, -0.65])?;
    }
    add_box(&mut b, trailer, [0.0, -0.55, 0.75], [0.1, 0.1, 0.1])?;
    b.build()
}

/// Robot that folds into a truck, plus a trailer that hitches onto the truck
/// when pushed into it while the robot is closed.
pub fn transformer() -> Result<Simulation> {
    let robot = build_robot()?;
    let head = robot.joint_id("head")?;
    let left_arm = robot.joint_id("left-arm")?;
    let left_leg = robot.joint_id("left-leg")?;
    let left_foot = robot.joint_id("left-foot")?;

    let mut symmetry = SymmetryTable::new();
    symmetry.add(left_arm, robot.joint_id("right-arm")?, -1.0)?;
    symmetry.add(left_leg, robot.joint_id("right-leg")?, 1.0)?;
    symmetry.add(left_foot, robot.joint_id("right-foot")?, 1.0)?;

    let mut poses = PoseLibrary::new();
    poses.insert(
        &robot,
        "open",
        Pose::new()
            .with(left_arm, ARM_OUT)
            .with(head, 0.0)
            .with(left_leg, 0.0)
            .with(left_foot, 0.0),
    )?;
    poses.insert(
        &robot,
        "closed",
        Pose::new()
            .with(left_arm, ARM_IN)
            .with(head, -PI)
            .with(left_leg, FRAC_PI_2)
            .with(left_foot, FRAC_PI_2),
    )?;

    let jog = |joint, rate| Command::Jog { joint, rate };
    let mut inputs = InputMap::new();
    inputs
        .bind("rotate-head-cw", jog(head, -JOG_RATE))
        .bind("rotate-head-ccw", jog(head, JOG_RATE))
        .bind("arms-out", jog(left_arm, -ARM_RATE))
        .bind("arms-in", jog(left_arm, ARM_RATE))
        .bind("legs-forward", jog(left_leg, JOG_RATE))
        .bind("legs-back", jog(left_leg, -JOG_RATE))
        .bind("feet-out", jog(left_foot, JOG_RATE))
        .bind("feet-in", jog(left_foot, -JOG_RATE))
        .bind("transform-close", Command::Transform { pose: "closed".into() })
        .bind("transform-open", Command::Transform { pose: "open".into() })
        .bind("trailer-forward", Command::MoveBody { direction: -Vector3::z() })
        .bind("trailer-back", Command::MoveBody { direction: Vector3::z() })
        .bind("trailer-left", Command::MoveBody { direction: -Vector3::x() })
        .bind("trailer-right", Command::MoveBody { direction: Vector3::x() });

    let config = SimConfig::default();
    let docking = DockingConfig {
        target: Point3::new(0.0, 0.6, -1.7),
        speed: config.body_speed,
        qualifying_pose: "closed".into(),
        tolerance: config.pose_tolerance,
    };

    Simulation::new(robot, poses, symmetry, inputs, config)?.with_payload(build_trailer()?, docking)
}

fn build_crane() -> Result<Rig> {
    let s = |v: [f32; 3]| [v[0] * CRANE_SCALE, v[1] * CRANE_SCALE, v[2] * CRANE_SCALE];
    let mut b = RigBuilder::new("tower-crane");

    let base = b.add_part("base", None, Vector3::zeros())?;
    add_box(&mut b, base, s([0.0, 1.0, 0.0]), s([8.0, 2.0, 8.0]))?;
    add_box(&mut b, base, s([0.0, 10.0, 0.0]), s([2.0, 16.0, 2.0]))?;

    let turntable = b.add_part(
        "turntable",
        Some(base),
        Vector3::from(s([0.0, 18.5, 0.0])),
    )?;
    add_box(&mut b, turntable, [0.0; 3], s([2.0, 1.0, 2.0]))?;
    b.add_joint(turntable, JointSpec::rotation("slew", Vector3::y()))?;

    let jib = b.add_part("jib", Some(turntable), Vector3::from(s([0.0, 1.0, 0.0])))?;
    add_box(&mut b, jib, s([4.0, 0.0, 0.0]), s([22.0, 1.0, 2.0]))?;
    add_box(&mut b, jib, s([0.0, 3.5, 0.0]), s([2.0, 6.0, 2.0]))?;
    add_box(&mut b, jib, s([2.0, -2.0, 0.0]), s([2.0, 2.0, 2.0]))?;
    add_box(&mut b, jib, s([-5.5, -1.5, 0.0]), s([3.0, 2.0, 2.0]))?;

    let trolley = b.add_part("trolley", Some(jib), Vector3::from(s([9.0, -1.0, 0.0])))?;
    add_box(&mut b, trolley, [0.0; 3], s([2.0, 1.0, 2.0]))?;
    b.add_joint(
        trolley,
        JointSpec::translation("trolley", Vector3::x()).limits(JointLimits::new(-4.0, 14.0)?),
    )?;

    let cable = b.add_part("cable", Some(trolley), Vector3::from(s([0.0, -3.5, 0.0])))?;
    add_box(&mut b, cable, [0.0; 3], s([0.2, 7.0, 0.2]))?;
    b.add_joint(
        cable,
        JointSpec::translation("cable", Vector3::y()).limits(JointLimits::new(-10.0, 9.25)?),
    )?;

    let hook = b.add_part("hook", Some(trolley), Vector3::from(s([0.0, -7.5, 0.0])))?;
    add_box(&mut b, hook, [0.0; 3], s([2.0, 1.0, 2.0]))?;
    b.add_joint(
        hook,
        JointSpec::translation("hook", Vector3::y()).limits(JointLimits::new(-20.0, 18.5)?),
    )?;

    let mounts = [
        [-1.0, -0.5, 0.0],
        [1.0, -0.5, 0.0],
        [0.0, -0.5, 1.0],
        [0.0, -0.5, -1.0],
    ];
    for (i, mount) in mounts.into_iter().enumerate() {
        let finger = b.add_part(format!("finger-{}", i + 1), Some(hook), Vector3::from(s(mount)))?;
        // Fingers on the z axis are turned a quarter so they close toward the hook.
        if mount[2] != 0.0 {
            b.set_base_rotation(finger, RotationState::new(0.0, FRAC_PI_2, 0.0))?;
        }
        add_box(&mut b, finger, [0.0, -4.0, 0.0], [1.0, 8.0, 1.0])?;
        // Followers mirror with factor -1, so the range must be symmetric.
        b.add_joint(
            finger,
            JointSpec::rotation(format!("finger-{}", i + 1), Vector3::z())
                .limits(JointLimits::new(-FINGER_LIMIT, FINGER_LIMIT)?),
        )?;
    }

    b.build()
}

/// Tower crane driven by discrete per-press steps.
pub fn tower_crane() -> Result<Simulation> {
    let crane = build_crane()?;
    let slew = crane.joint_id("slew")?;
    let trolley = crane.joint_id("trolley")?;
    let hook = crane.joint_id("hook")?;
    let finger = crane.joint_id("finger-1")?;

    let mut symmetry = SymmetryTable::new();
    symmetry.add(hook, crane.joint_id("cable")?, 0.5)?;
    symmetry.add(finger, crane.joint_id("finger-2")?, -1.0)?;
    symmetry.add(finger, crane.joint_id("finger-3")?, 1.0)?;
    symmetry.add(finger, crane.joint_id("finger-4")?, -1.0)?;

    let mut poses = PoseLibrary::new();
    poses.insert(&crane, "open", Pose::new().with(finger, 0.0))?;
    poses.insert(&crane, "closed", Pose::new().with(finger, 0.3))?;

    let nudge = |joint, delta| Command::Nudge { joint, delta };
    let mut inputs = InputMap::new();
    inputs
        .bind("slew-left", nudge(slew, PI * 0.05))
        .bind("slew-right", nudge(slew, -PI * 0.05))
        .bind("trolley-out", nudge(trolley, 2.0))
        .bind("trolley-in", nudge(trolley, -2.0))
        .bind("hook-up", nudge(hook, 0.5))
        .bind("hook-down", nudge(hook, -0.5))
        .bind("claw-close", nudge(finger, PI * 0.01))
        .bind("claw-open", nudge(finger, -PI * 0.01))
        .bind("claw-grab", Command::Transform { pose: "closed".into() })
        .bind("claw-release", Command::Transform { pose: "open".into() });

    let config = SimConfig {
        transform_speed: 1.0,
        ..SimConfig::default()
    };
    Simulation::new(crane, poses, symmetry, inputs, config)
}

/// The built-in rigs, addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Transformer,
    TowerCrane,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::Transformer, Preset::TowerCrane];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Transformer => "transformer",
            Preset::TowerCrane => "tower-crane",
        }
    }

    /// Part the follow camera rides on, if the rig has one.
    pub fn follow_part(self) -> Option<&'static str> {
        match self {
            Preset::Transformer => None,
            Preset::TowerCrane => Some("hook"),
        }
    }

    pub fn build(self) -> Result<Simulation> {
        match self {
            Preset::Transformer => transformer(),
            Preset::TowerCrane => tower_crane(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| RigError::not_found(format!("preset '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn value(sim: &Simulation, joint: &str) -> f32 {
        let rig = sim.rig();
        rig.joint_value(rig.joint_id(joint).unwrap()).unwrap()
    }

    #[test]
    fn test_transformer_starts_open_and_apart() {
        let sim = transformer().unwrap();
        assert!(sim.is_in_pose("open").unwrap());
        assert!(!sim.is_in_pose("closed").unwrap());
        assert!(!sim.colliding().unwrap());
        assert_eq!(value(&sim, "right-arm"), 0.375);

        let trailer = sim.payload().unwrap();
        assert_eq!(
            trailer.part_offset(trailer.root()).unwrap(),
            Vector3::new(0.0, 0.6, -3.0)
        );
    }

    #[test]
    fn test_transformer_closes_into_truck() {
        let mut sim = transformer().unwrap();
        assert!(sim.press("transform-close").unwrap());
        let report = sim.tick(0.5).unwrap();
        assert!(report.animation_complete());
        assert!(sim.is_in_pose("closed").unwrap());
        assert_eq!(value(&sim, "right-arm"), 0.225);
        assert_eq!(value(&sim, "right-leg"), FRAC_PI_2);
        assert_eq!(value(&sim, "right-foot"), FRAC_PI_2);

        let rig = sim.rig();
        let volume = rig.compute_bounding_volume(rig.root()).unwrap();
        assert_relative_eq!(volume.min.z, -1.45, epsilon = 1e-4);
        assert_relative_eq!(volume.max.z, 0.226, epsilon = 1e-4);
    }

    #[test]
    fn test_transformer_jogs_mirror() {
        let mut sim = transformer().unwrap();
        sim.press("arms-in").unwrap();
        sim.tick(0.25).unwrap();
        assert_relative_eq!(value(&sim, "left-arm"), -0.275, epsilon = 1e-6);
        assert_relative_eq!(value(&sim, "right-arm"), 0.275, epsilon = 1e-6);
    }

    #[test]
    fn test_trailer_moves_with_arrows() {
        let mut sim = transformer().unwrap();
        sim.press("trailer-right").unwrap();
        sim.press("trailer-back").unwrap();
        sim.tick(0.1).unwrap();
        let trailer = sim.payload().unwrap();
        let offset = trailer.part_offset(trailer.root()).unwrap();
        assert_relative_eq!(offset.x, 0.2, epsilon = 1e-6);
        assert_relative_eq!(offset.z, -2.8, epsilon = 1e-6);
    }

    #[test]
    fn test_crane_nudges_and_links() {
        let mut sim = tower_crane().unwrap();
        assert!(sim.press("hook-down").unwrap());
        assert_eq!(value(&sim, "hook"), -0.5);
        assert_eq!(value(&sim, "cable"), -0.25);

        sim.press("claw-close").unwrap();
        let step = PI * 0.01;
        assert_relative_eq!(value(&sim, "finger-2"), -step);
        assert_relative_eq!(value(&sim, "finger-3"), step);
        assert_relative_eq!(value(&sim, "finger-4"), -step);

        for _ in 0..20 {
            sim.press("trolley-out").unwrap();
        }
        assert_eq!(value(&sim, "trolley"), 14.0);
        assert!(sim.payload().is_none());
    }

    #[test]
    fn test_claw_stays_mirrored_past_closed() {
        let mut sim = tower_crane().unwrap();
        for _ in 0..15 {
            sim.press("claw-close").unwrap();
        }
        let lead = value(&sim, "finger-1");
        assert!(lead > 0.3);
        assert_relative_eq!(value(&sim, "finger-2"), -lead);
        assert_relative_eq!(value(&sim, "finger-3"), lead);
        assert_relative_eq!(value(&sim, "finger-4"), -lead);

        for _ in 0..40 {
            sim.press("claw-close").unwrap();
        }
        assert_relative_eq!(value(&sim, "finger-1"), FINGER_LIMIT);
        assert_relative_eq!(value(&sim, "finger-2"), -FINGER_LIMIT);
        assert_relative_eq!(value(&sim, "finger-4"), -FINGER_LIMIT);
    }

    #[test]
    fn test_claw_fingers_close_inward() {
        let mut sim = tower_crane().unwrap();
        let tip = Point3::new(0.0, -4.0, 0.0);
        let tip_of = |sim: &Simulation, name: &str| {
            let rig = sim.rig();
            rig.world_transform(rig.part_id(name).unwrap())
                .unwrap()
                .transform_point(&tip)
        };
        let open: Vec<_> = (1..=4).map(|i| tip_of(&sim, &format!("finger-{i}"))).collect();
        assert_relative_eq!(open[2].z, 3.0, epsilon = 1e-4);
        assert_relative_eq!(open[3].z, -3.0, epsilon = 1e-4);

        sim.press("claw-close").unwrap();
        let closed: Vec<_> = (1..=4).map(|i| tip_of(&sim, &format!("finger-{i}"))).collect();
        assert!(closed[0].x > open[0].x);
        assert!(closed[1].x < open[1].x);
        assert!(closed[2].z < 3.0);
        assert!(closed[3].z > -3.0);
        // Quarter-turned fingers swing in their own plane only.
        assert_relative_eq!(closed[2].x, open[2].x, epsilon = 1e-4);
        assert_relative_eq!(closed[3].x, open[3].x, epsilon = 1e-4);
    }

    #[test]
    fn test_preset_names() {
        for preset in Preset::ALL {
            assert_eq!(preset.name().parse::<Preset>().unwrap(), preset);
            let sim = preset.build().unwrap();
            if let Some(part) = preset.follow_part() {
                assert!(sim.rig().part_id(part).is_ok());
            }
        }
        assert!(matches!("forklift".parse::<Preset>(), Err(RigError::NotFound(_))));
    }
}
