/// Named joint configurations
use std::collections::BTreeMap;

use crate::error::{Result, RigError};
use crate::joint::JointId;
use crate::rig::Rig;

/// Target values for a subset of a rig's joints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    targets: BTreeMap<JointId, f32>,
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pose from joint names, failing with `InvalidPose` on any name
    /// the rig does not know.
    pub fn from_named(rig: &Rig, targets: &[(&str, f32)]) -> Result<Self> {
        let mut pose = Self::new();
        for &(name, value) in targets {
            let id = rig.joint_id(name).map_err(|_| {
                RigError::invalid_pose(format!("joint '{name}' is not part of rig '{}'", rig.name()))
            })?;
            pose.set(id, value);
        }
        Ok(pose)
    }

    /// Snapshot the current values of `joints`.
    pub fn capture(rig: &Rig, joints: impl IntoIterator<Item = JointId>) -> Result<Self> {
        let mut pose = Self::new();
        for id in joints {
            let value = rig
                .joint_value(id)
                .map_err(|e| RigError::invalid_pose(e.to_string()))?;
            pose.set(id, value);
        }
        Ok(pose)
    }

    pub fn set(&mut self, joint: JointId, value: f32) {
        self.targets.insert(joint, value);
    }

    pub fn with(mut self, joint: JointId, value: f32) -> Self {
        self.set(joint, value);
        self
    }

    pub fn get(&self, joint: JointId) -> Option<f32> {
        self.targets.get(&joint).copied()
    }

    pub fn joints(&self) -> impl Iterator<Item = JointId> + '_ {
        self.targets.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointId, f32)> + '_ {
        self.targets.iter().map(|(&id, &v)| (id, v))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Every referenced joint must exist on `rig`.
    pub fn validate(&self, rig: &Rig) -> Result<()> {
        for (id, value) in self.iter() {
            if rig.joint(id).is_err() {
                return Err(RigError::invalid_pose(format!(
                    "joint #{} is not part of rig '{}'",
                    id.index(),
                    rig.name()
                )));
            }
            if !value.is_finite() {
                return Err(RigError::invalid_pose(format!(
                    "non-finite target for joint #{}",
                    id.index()
                )));
            }
        }
        Ok(())
    }

    /// True when every joint of the pose is within `tolerance` of its target.
    pub fn matches(&self, rig: &Rig, tolerance: f32) -> bool {
        self.iter().all(|(id, target)| {
            rig.joint_value(id)
                .map(|v| (v - target).abs() <= tolerance)
                .unwrap_or(false)
        })
    }
}

/// Poses addressed by name ("open", "closed", ...).
#[derive(Debug, Clone, Default)]
pub struct PoseLibrary {
    poses: BTreeMap<String, Pose>,
}

impl PoseLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `pose` against `rig` and store it under `name`.
    pub fn insert(&mut self, rig: &Rig, name: impl Into<String>, pose: Pose) -> Result<()> {
        pose.validate(rig)?;
        self.poses.insert(name.into(), pose);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Pose> {
        self.poses
            .get(name)
            .ok_or_else(|| RigError::not_found(format!("pose '{name}'")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.poses.keys().map(String::as_str)
    }
}
