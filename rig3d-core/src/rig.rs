//! Articulated rig model.
//!
//! A [`Rig`] is an arena of named [`RigPart`]s. Each part stores a
//! parent-relative transform made of a fixed offset, a fixed base rotation and
//! the contribution of at most one [`Joint`]. Parents own their children; the
//! only back-reference is the non-owning `parent` index used for traversal.
//!
//! Parts are always stored after their parent, so a single forward pass over
//! the arena visits the hierarchy top-down.
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use rig3d_core::{Aabb, JointLimits, JointSpec, RigBuilder};
//!
//! let mut builder = RigBuilder::new("arm");
//! let base = builder.add_part("base", None, Vector3::zeros()).unwrap();
//! let boom = builder.add_part("boom", Some(base), Vector3::new(0.0, 1.0, 0.0)).unwrap();
//! builder
//!     .add_shape(boom, Aabb::new(Point3::new(-0.1, 0.0, -0.1), Point3::new(0.1, 2.0, 0.1)))
//!     .unwrap();
//! let lift = builder
//!     .add_joint(
//!         boom,
//!         JointSpec::rotation("lift", Vector3::x()).limits(JointLimits::new(0.0, 1.5).unwrap()),
//!     )
//!     .unwrap();
//! let mut rig = builder.build().unwrap();
//!
//! assert_eq!(rig.set_joint_value(lift, 4.0).unwrap(), 1.5);
//! assert!(rig.compute_bounding_volume(base).is_ok());
//! ```

use std::collections::HashMap;

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::bounds::Aabb;
use crate::error::{Result, RigError};
use crate::joint::{Joint, JointId, JointSpec};
use crate::transform::{RotationState, Transform};

/// Index of a part inside its rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartId(pub(crate) usize);

impl PartId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node of the articulated hierarchy.
#[derive(Debug, Clone)]
pub struct RigPart {
    name: String,
    parent: Option<PartId>,
    children: Vec<PartId>,
    offset: Vector3<f32>,
    rotation: UnitQuaternion<f32>,
    joint: Option<JointId>,
    shapes: Vec<Aabb>,
}

impl RigPart {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<PartId> {
        self.parent
    }

    pub fn children(&self) -> &[PartId] {
        &self.children
    }

    pub fn offset(&self) -> Vector3<f32> {
        self.offset
    }

    pub fn base_rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    pub fn joint(&self) -> Option<JointId> {
        self.joint
    }

    /// Part-local boxes describing the part's geometry.
    pub fn shapes(&self) -> &[Aabb] {
        &self.shapes
    }
}

/// Incremental constructor for a [`Rig`].
#[derive(Debug)]
pub struct RigBuilder {
    rig: Rig,
}

impl RigBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            rig: Rig {
                name: name.into(),
                parts: Vec::new(),
                joints: Vec::new(),
                part_index: HashMap::new(),
                joint_index: HashMap::new(),
                dirty: Vec::new(),
            },
        }
    }

    pub fn add_part(
        &mut self,
        name: impl Into<String>,
        parent: Option<PartId>,
        offset: Vector3<f32>,
    ) -> Result<PartId> {
        let name = name.into();
        if self.rig.part_index.contains_key(&name) {
            return Err(RigError::DuplicateId(format!("part '{name}'")));
        }
        if let Some(parent) = parent {
            self.rig.part(parent)?;
        }

        let id = PartId(self.rig.parts.len());
        self.rig.parts.push(RigPart {
            name: name.clone(),
            parent,
            children: Vec::new(),
            offset,
            rotation: UnitQuaternion::identity(),
            joint: None,
            shapes: Vec::new(),
        });
        self.rig.dirty.push(true);
        if let Some(parent) = parent {
            self.rig.parts[parent.0].children.push(id);
        }
        self.rig.part_index.insert(name, id);
        Ok(id)
    }

    pub fn set_base_rotation(&mut self, part: PartId, rotation: RotationState) -> Result<()> {
        self.rig.part_mut(part)?.rotation = rotation.to_quaternion();
        Ok(())
    }

    pub fn add_shape(&mut self, part: PartId, shape: Aabb) -> Result<()> {
        self.rig.part_mut(part)?.shapes.push(shape);
        Ok(())
    }

    pub fn add_joint(&mut self, part: PartId, spec: JointSpec) -> Result<JointId> {
        if self.rig.joint_index.contains_key(&spec.name) {
            return Err(RigError::DuplicateId(format!("joint '{}'", spec.name)));
        }
        let owner = self.rig.part(part)?;
        if owner.joint.is_some() {
            return Err(RigError::invalid_config(format!(
                "part '{}' already has a joint",
                owner.name
            )));
        }

        let joint = Joint::from_spec(spec, part)?;
        let id = JointId(self.rig.joints.len());
        self.rig.joint_index.insert(joint.name.clone(), id);
        self.rig.joints.push(joint);
        self.rig.parts[part.0].joint = Some(id);
        Ok(id)
    }

    pub fn build(self) -> Result<Rig> {
        if self.rig.parts.is_empty() {
            return Err(RigError::invalid_config(format!(
                "rig '{}' has no parts",
                self.rig.name
            )));
        }
        tracing::debug!(
            rig = %self.rig.name,
            parts = self.rig.parts.len(),
            joints = self.rig.joints.len(),
            "built rig"
        );
        Ok(self.rig)
    }
}

/// Arena of rig parts and joints, addressed by stable ids.
#[derive(Debug, Clone)]
pub struct Rig {
    name: String,
    parts: Vec<RigPart>,
    joints: Vec<Joint>,
    part_index: HashMap<String, PartId>,
    joint_index: HashMap<String, JointId>,
    dirty: Vec<bool>,
}

impl Rig {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The first part added; every rig has one.
    pub fn root(&self) -> PartId {
        PartId(0)
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn parts(&self) -> impl Iterator<Item = (PartId, &RigPart)> + '_ {
        self.parts.iter().enumerate().map(|(i, p)| (PartId(i), p))
    }

    pub fn joints(&self) -> impl Iterator<Item = (JointId, &Joint)> + '_ {
        self.joints.iter().enumerate().map(|(i, j)| (JointId(i), j))
    }

    pub fn part_id(&self, name: &str) -> Result<PartId> {
        self.part_index
            .get(name)
            .copied()
            .ok_or_else(|| RigError::not_found(format!("part '{name}' in rig '{}'", self.name)))
    }

    pub fn joint_id(&self, name: &str) -> Result<JointId> {
        self.joint_index
            .get(name)
            .copied()
            .ok_or_else(|| RigError::not_found(format!("joint '{name}' in rig '{}'", self.name)))
    }

    pub fn part(&self, id: PartId) -> Result<&RigPart> {
        self.parts
            .get(id.0)
            .ok_or_else(|| RigError::not_found(format!("part #{} in rig '{}'", id.0, self.name)))
    }

    fn part_mut(&mut self, id: PartId) -> Result<&mut RigPart> {
        let name = &self.name;
        self.parts
            .get_mut(id.0)
            .ok_or_else(|| RigError::not_found(format!("part #{} in rig '{name}'", id.0)))
    }

    pub fn joint(&self, id: JointId) -> Result<&Joint> {
        self.joints
            .get(id.0)
            .ok_or_else(|| RigError::not_found(format!("joint #{} in rig '{}'", id.0, self.name)))
    }

    pub fn joint_value(&self, id: JointId) -> Result<f32> {
        Ok(self.joint(id)?.value)
    }

    /// Write a joint value, clamped to the joint's limits.
    ///
    /// Returns the value actually stored. Only this joint changes; mirrored
    /// joints are left to the caller (see [`SymmetryTable`](crate::SymmetryTable)).
    pub fn set_joint_value(&mut self, id: JointId, value: f32) -> Result<f32> {
        if !value.is_finite() {
            return Err(RigError::invalid_config(format!(
                "non-finite value for joint #{}",
                id.0
            )));
        }
        let rig_name = &self.name;
        let joint = self
            .joints
            .get_mut(id.0)
            .ok_or_else(|| RigError::not_found(format!("joint #{} in rig '{rig_name}'", id.0)))?;
        let applied = joint.constrain(value);
        joint.value = applied;
        self.dirty[joint.part.0] = true;
        Ok(applied)
    }

    pub fn part_offset(&self, id: PartId) -> Result<Vector3<f32>> {
        Ok(self.part(id)?.offset)
    }

    /// Rigidly place a part relative to its parent (free bodies move this way).
    pub fn set_part_offset(&mut self, id: PartId, offset: Vector3<f32>) -> Result<()> {
        self.part_mut(id)?.offset = offset;
        self.dirty[id.0] = true;
        Ok(())
    }

    pub fn local_transform(&self, id: PartId) -> Result<Transform> {
        let part = self.part(id)?;
        Ok(self.local_of(part))
    }

    fn local_of(&self, part: &RigPart) -> Transform {
        let base = Transform::new(part.offset, part.rotation);
        match part.joint {
            Some(joint) => base.compose(&self.joints[joint.0].transform()),
            None => base,
        }
    }

    /// Compose parent-relative transforms from the root down to `id`.
    pub fn world_transform(&self, id: PartId) -> Result<Transform> {
        let mut chain = vec![self.part(id)?];
        let mut cursor = chain[0].parent;
        while let Some(parent) = cursor {
            let part = &self.parts[parent.0];
            chain.push(part);
            cursor = part.parent;
        }

        Ok(chain
            .iter()
            .rev()
            .fold(Transform::identity(), |acc, part| acc.compose(&self.local_of(part))))
    }

    /// World transform of every part, indexed like the arena.
    pub fn world_transforms(&self) -> Vec<Transform> {
        let mut out: Vec<Transform> = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let local = self.local_of(part);
            let world = match part.parent {
                Some(parent) => out[parent.0].compose(&local),
                None => local,
            };
            out.push(world);
        }
        out
    }

    /// Part ids of `id` and everything below it.
    pub fn subtree(&self, id: PartId) -> Result<Vec<PartId>> {
        self.part(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.parts[next.0].children.iter().rev().copied());
        }
        Ok(out)
    }

    /// World-space box enclosing the shapes of `id` and all its descendants.
    ///
    /// Recomputed on every call from the live joint values. A subtree without
    /// any shapes yields a zero-size box at the part's world origin.
    pub fn compute_bounding_volume(&self, id: PartId) -> Result<Aabb> {
        let subtree = self.subtree(id)?;
        let world = self.world_transforms();

        let mut volume: Option<Aabb> = None;
        for part in subtree {
            for shape in &self.parts[part.0].shapes {
                let placed = shape.transformed(&world[part.0]);
                volume = Some(match volume {
                    Some(v) => v.union(&placed),
                    None => placed,
                });
            }
        }

        Ok(volume.unwrap_or_else(|| Aabb::point(Point3::from(world[id.0].translation))))
    }

    /// Parts whose local transform changed since the previous call.
    pub fn take_dirty(&mut self) -> Vec<PartId> {
        let mut out = Vec::new();
        for (i, flag) in self.dirty.iter_mut().enumerate() {
            if *flag {
                out.push(PartId(i));
                *flag = false;
            }
        }
        out
    }
}
