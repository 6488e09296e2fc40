//! Frame-driven simulation loop tying the rig, inputs and animator together.
//!
//! One [`Simulation::tick`] runs per rendered frame. Within a tick:
//!
//! 1. an active pose transition advances, or held jog inputs move joints
//!    when the animator is idle;
//! 2. an active docking move advances, or held body inputs move the payload;
//! 3. the rig and payload volumes are recomputed from their post-movement
//!    state and fed through the docking gate.

use nalgebra::{Point3, Vector3};

use crate::animator::{AnimatorEvent, AnimatorState, DockingConfig, TransformAnimator};
use crate::error::{Result, RigError};
use crate::input::{Command, HeldInputs, InputMap};
use crate::pose::PoseLibrary;
use crate::rig::{PartId, Rig};
use crate::symmetry::SymmetryTable;

/// Tunables shared by a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Free-body speed in units per second.
    pub body_speed: f32,
    /// Pose transition progress per second.
    pub transform_speed: f32,
    /// Per-joint tolerance for pose predicates.
    pub pose_tolerance: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            body_speed: 2.0,
            transform_speed: 2.0,
            pose_tolerance: 1e-3,
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub events: Vec<AnimatorEvent>,
    pub colliding: bool,
}

impl TickReport {
    pub fn animation_complete(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, AnimatorEvent::AnimationComplete { .. }))
    }

    pub fn docking_complete(&self) -> bool {
        self.events.contains(&AnimatorEvent::DockingComplete)
    }

    pub fn docking_started(&self) -> bool {
        self.events.contains(&AnimatorEvent::DockingStarted)
    }
}

/// Parts whose local transforms changed since the last call to
/// [`Simulation::take_dirty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirtyParts {
    pub rig: Vec<PartId>,
    pub payload: Vec<PartId>,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    rig: Rig,
    payload: Option<Rig>,
    poses: PoseLibrary,
    symmetry: SymmetryTable,
    inputs: InputMap,
    held: HeldInputs,
    animator: TransformAnimator,
    docking: Option<DockingConfig>,
}

impl Simulation {
    pub fn new(
        rig: Rig,
        poses: PoseLibrary,
        symmetry: SymmetryTable,
        inputs: InputMap,
        config: SimConfig,
    ) -> Result<Self> {
        let animator = TransformAnimator::new(config.transform_speed)?;
        Ok(Self {
            config,
            rig,
            payload: None,
            poses,
            symmetry,
            inputs,
            held: HeldInputs::default(),
            animator,
            docking: None,
        })
    }

    /// Attach a free body that docks with the rig when they collide.
    pub fn with_payload(mut self, payload: Rig, docking: DockingConfig) -> Result<Self> {
        self.poses.get(&docking.qualifying_pose)?;
        if !(docking.speed > 0.0 && docking.speed.is_finite()) {
            return Err(RigError::invalid_config(format!(
                "docking speed must be positive, got {}",
                docking.speed
            )));
        }
        self.payload = Some(payload);
        self.docking = Some(docking);
        Ok(self)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn rig(&self) -> &Rig {
        &self.rig
    }

    pub fn payload(&self) -> Option<&Rig> {
        self.payload.as_ref()
    }

    pub fn poses(&self) -> &PoseLibrary {
        &self.poses
    }

    pub fn symmetry(&self) -> &SymmetryTable {
        &self.symmetry
    }

    pub fn inputs(&self) -> &InputMap {
        &self.inputs
    }

    pub fn held(&self) -> &HeldInputs {
        &self.held
    }

    pub fn animator(&self) -> &TransformAnimator {
        &self.animator
    }

    pub fn docking(&self) -> Option<&DockingConfig> {
        self.docking.as_ref()
    }

    /// Write a joint and its mirrored followers, as a jog or nudge would.
    pub fn set_joint(&mut self, name: &str, value: f32) -> Result<f32> {
        let joint = self.rig.joint_id(name)?;
        let applied = self.rig.set_joint_value(joint, value)?;
        self.symmetry.propagate(&mut self.rig, joint)?;
        Ok(applied)
    }

    /// Handle a key-down style event. Returns whether it had an effect.
    pub fn press(&mut self, event: &str) -> Result<bool> {
        let Some(command) = self.inputs.command(event).cloned() else {
            tracing::trace!(event, "unbound input event");
            return Ok(false);
        };

        match command {
            Command::Jog { .. } | Command::MoveBody { .. } => Ok(self.held.press(event)),
            Command::Nudge { joint, delta } => {
                if !self.animator.is_idle() {
                    return Ok(false);
                }
                let value = self.rig.joint_value(joint)?;
                self.rig.set_joint_value(joint, value + delta)?;
                self.symmetry.propagate(&mut self.rig, joint)?;
                Ok(true)
            }
            Command::Transform { pose } => self.trigger_transform(&pose),
        }
    }

    pub fn release(&mut self, event: &str) -> bool {
        self.held.release(event)
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }

    /// Start a transition to a named pose. `Ok(false)` while busy.
    pub fn trigger_transform(&mut self, pose: &str) -> Result<bool> {
        let end = self.poses.get(pose)?;
        self.animator.trigger_transform(&self.rig, pose, end)
    }

    pub fn is_in_pose(&self, pose: &str) -> Result<bool> {
        Ok(self
            .poses
            .get(pose)?
            .matches(&self.rig, self.config.pose_tolerance))
    }

    /// Current overlap between the rig and the payload, if there is one.
    pub fn colliding(&self) -> Result<bool> {
        match &self.payload {
            Some(payload) => {
                let a = self.rig.compute_bounding_volume(self.rig.root())?;
                let b = payload.compute_bounding_volume(payload.root())?;
                Ok(a.intersects(&b))
            }
            None => Ok(false),
        }
    }

    /// Advance by the measured frame time.
    pub fn tick(&mut self, elapsed_seconds: f32) -> Result<TickReport> {
        let dt = if elapsed_seconds.is_finite() && elapsed_seconds >= 0.0 {
            elapsed_seconds
        } else {
            tracing::warn!(elapsed_seconds, "ignoring invalid frame time");
            0.0
        };
        let mut report = TickReport::default();

        if matches!(self.animator.state(), AnimatorState::Animating(_)) {
            if let Some(event) = self
                .animator
                .update(dt, &mut self.rig, &self.symmetry, None)?
            {
                report.events.push(event);
            }
        } else if self.animator.is_idle() {
            self.apply_jogs(dt)?;
        }

        if matches!(self.animator.state(), AnimatorState::Docking(_)) {
            if let Some(event) = self.animator.update(
                dt,
                &mut self.rig,
                &self.symmetry,
                self.payload.as_mut(),
            )? {
                report.events.push(event);
            }
        } else {
            self.apply_body_moves(dt)?;
        }

        report.colliding = self.colliding()?;
        if let (Some(payload), Some(docking)) = (&self.payload, &self.docking) {
            let qualifies = self
                .poses
                .get(&docking.qualifying_pose)?
                .matches(&self.rig, docking.tolerance);
            let body = payload.root();
            let position = Point3::from(payload.part_offset(body)?);
            if let Some(event) =
                self.animator
                    .observe_collision(report.colliding, qualifies, body, position, docking)
            {
                report.events.push(event);
            }
        }

        Ok(report)
    }

    fn apply_jogs(&mut self, dt: f32) -> Result<()> {
        for event in self.held.iter() {
            if let Some(&Command::Jog { joint, rate }) = self.inputs.command(event) {
                let value = self.rig.joint_value(joint)?;
                self.rig.set_joint_value(joint, value + rate * dt)?;
                self.symmetry.propagate(&mut self.rig, joint)?;
            }
        }
        Ok(())
    }

    fn apply_body_moves(&mut self, dt: f32) -> Result<()> {
        let Some(payload) = self.payload.as_mut() else {
            return Ok(());
        };

        let mut direction = Vector3::zeros();
        for event in self.held.iter() {
            if let Some(Command::MoveBody { direction: d }) = self.inputs.command(event) {
                direction += d;
            }
        }
        if direction == Vector3::zeros() {
            return Ok(());
        }

        let root = payload.root();
        let offset = payload.part_offset(root)?;
        payload.set_part_offset(root, offset + direction * self.config.body_speed * dt)
    }

    pub fn take_dirty(&mut self) -> DirtyParts {
        DirtyParts {
            rig: self.rig.take_dirty(),
            payload: self
                .payload
                .as_mut()
                .map(Rig::take_dirty)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::{JointLimits, JointSpec};
    use crate::pose::Pose;
    use crate::rig::RigBuilder;
    use approx::assert_relative_eq;

    fn crane() -> Simulation {
        crane_with(SimConfig::default()).unwrap()
    }

    fn crane_with(config: SimConfig) -> Result<Simulation> {
        let mut b = RigBuilder::new("mini-crane");
        let base = b.add_part("base", None, Vector3::zeros()).unwrap();
        let trolley = b.add_part("trolley", Some(base), Vector3::new(0.0, 5.0, 0.0)).unwrap();
        let left = b.add_part("left", Some(trolley), Vector3::zeros()).unwrap();
        let right = b.add_part("right", Some(trolley), Vector3::zeros()).unwrap();
        let slide = b
            .add_joint(
                trolley,
                JointSpec::translation("slide", Vector3::x()).limits(JointLimits::new(-1.0, 1.0).unwrap()),
            )
            .unwrap();
        let l = b
            .add_joint(
                left,
                JointSpec::rotation("left", Vector3::z()).limits(JointLimits::new(-1.0, 1.0).unwrap()),
            )
            .unwrap();
        let r = b
            .add_joint(
                right,
                JointSpec::rotation("right", Vector3::z()).limits(JointLimits::new(-1.0, 1.0).unwrap()),
            )
            .unwrap();
        let rig = b.build().unwrap();

        let mut symmetry = SymmetryTable::new();
        symmetry.add(l, r, -1.0).unwrap();

        let mut poses = PoseLibrary::new();
        poses
            .insert(&rig, "closed", Pose::new().with(l, 0.5))
            .unwrap();

        let mut inputs = InputMap::new();
        inputs
            .bind("slide-out", Command::Jog { joint: slide, rate: 0.5 })
            .bind("claw-close", Command::Nudge { joint: l, delta: 0.25 })
            .bind("close", Command::Transform { pose: "closed".into() });

        Simulation::new(rig, poses, symmetry, inputs, config)
    }

    #[test]
    fn test_jog_moves_while_held_and_clamps() {
        let mut sim = crane();
        assert!(sim.press("slide-out").unwrap());
        sim.tick(1.0).unwrap();
        assert_relative_eq!(sim.rig().joint_value(sim.rig().joint_id("slide").unwrap()).unwrap(), 0.5);
        sim.tick(10.0).unwrap();
        assert_eq!(sim.rig().joint_value(sim.rig().joint_id("slide").unwrap()).unwrap(), 1.0);

        assert!(sim.release("slide-out"));
        sim.set_joint("slide", 0.0).unwrap();
        sim.tick(1.0).unwrap();
        assert_eq!(sim.rig().joint_value(sim.rig().joint_id("slide").unwrap()).unwrap(), 0.0);
    }

    #[test]
    fn test_nudge_mirrors_followers() {
        let mut sim = crane();
        assert!(sim.press("claw-close").unwrap());
        let rig = sim.rig();
        assert_eq!(rig.joint_value(rig.joint_id("left").unwrap()).unwrap(), 0.25);
        assert_eq!(rig.joint_value(rig.joint_id("right").unwrap()).unwrap(), -0.25);
    }

    #[test]
    fn test_inputs_ignored_while_animating() {
        let mut sim = crane();
        assert!(sim.press("close").unwrap());
        assert!(!sim.press("close").unwrap());
        assert!(!sim.press("claw-close").unwrap());

        sim.press("slide-out").unwrap();
        sim.tick(0.1).unwrap();
        let rig = sim.rig();
        assert_eq!(rig.joint_value(rig.joint_id("slide").unwrap()).unwrap(), 0.0);
    }

    #[test]
    fn test_transform_completes_and_reports() {
        let mut sim = crane();
        sim.trigger_transform("closed").unwrap();
        let first = sim.tick(0.25).unwrap();
        assert!(!first.animation_complete());
        let second = sim.tick(0.25).unwrap();
        assert!(second.animation_complete());
        assert!(sim.is_in_pose("closed").unwrap());
        assert!(matches!(sim.trigger_transform("missing"), Err(RigError::NotFound(_))));
    }

    #[test]
    fn test_unbound_event_and_bad_frame_time() {
        let mut sim = crane();
        assert!(!sim.press("nothing").unwrap());
        let report = sim.tick(-1.0).unwrap();
        assert!(report.events.is_empty());
        assert!(!report.colliding);
        let report = sim.tick(f32::NAN).unwrap();
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_take_dirty_after_nudge() {
        let mut sim = crane();
        sim.take_dirty();
        sim.press("claw-close").unwrap();
        let dirty = sim.take_dirty();
        assert_eq!(dirty.rig.len(), 2);
        assert!(dirty.payload.is_empty());
    }

    #[test]
    fn test_rejects_stalled_transform_speed() {
        for transform_speed in [-1.0, 0.0, f32::NAN, f32::INFINITY] {
            let config = SimConfig {
                transform_speed,
                ..SimConfig::default()
            };
            assert!(matches!(crane_with(config), Err(RigError::InvalidConfig(_))));
        }
        let slow = SimConfig {
            transform_speed: 0.5,
            ..SimConfig::default()
        };
        let mut sim = crane_with(slow).unwrap();
        sim.trigger_transform("closed").unwrap();
        assert!(!sim.tick(1.0).unwrap().animation_complete());
        assert!(sim.tick(1.0).unwrap().animation_complete());
    }
}
