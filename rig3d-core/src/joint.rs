/// Single-axis joints and their limits
use nalgebra::{Unit, UnitQuaternion, Vector3};

use crate::error::{Result, RigError};
use crate::rig::PartId;
use crate::transform::Transform;

/// Index of a joint inside its rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JointId(pub(crate) usize);

impl JointId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a joint's value drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    /// Value is an angle in radians about the axis.
    Rotation,
    /// Value is a distance along the axis.
    Translation,
}

/// Inclusive bounds on a joint value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    pub min: f32,
    pub max: f32,
}

impl JointLimits {
    pub fn new(min: f32, max: f32) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(RigError::invalid_config(format!(
                "joint limits [{min}, {max}] are not an ordered finite range"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Returns the value unchanged when it is inside the limits.
    pub fn check(&self, joint: &str, value: f32) -> Result<f32> {
        if value < self.min || value > self.max {
            return Err(RigError::OutOfRange {
                joint: joint.to_string(),
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }
}

/// Declaration used by [`RigBuilder::add_joint`](crate::RigBuilder::add_joint).
#[derive(Debug, Clone)]
pub struct JointSpec {
    pub name: String,
    pub axis: Vector3<f32>,
    pub kind: JointKind,
    pub initial: f32,
    pub limits: Option<JointLimits>,
}

impl JointSpec {
    pub fn rotation(name: impl Into<String>, axis: Vector3<f32>) -> Self {
        Self {
            name: name.into(),
            axis,
            kind: JointKind::Rotation,
            initial: 0.0,
            limits: None,
        }
    }

    pub fn translation(name: impl Into<String>, axis: Vector3<f32>) -> Self {
        Self {
            name: name.into(),
            axis,
            kind: JointKind::Translation,
            initial: 0.0,
            limits: None,
        }
    }

    pub fn initial(mut self, value: f32) -> Self {
        self.initial = value;
        self
    }

    pub fn limits(mut self, limits: JointLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// One animatable degree of freedom on a rig part.
#[derive(Debug, Clone)]
pub struct Joint {
    pub(crate) name: String,
    pub(crate) part: PartId,
    pub(crate) axis: Unit<Vector3<f32>>,
    pub(crate) kind: JointKind,
    pub(crate) value: f32,
    pub(crate) limits: Option<JointLimits>,
}

impl Joint {
    pub(crate) fn from_spec(spec: JointSpec, part: PartId) -> Result<Self> {
        let axis = Unit::try_new(spec.axis, 1e-6).ok_or_else(|| {
            RigError::invalid_config(format!("joint '{}' has a zero-length axis", spec.name))
        })?;
        if !spec.initial.is_finite() {
            return Err(RigError::invalid_config(format!(
                "joint '{}' has a non-finite initial value",
                spec.name
            )));
        }
        let value = match spec.limits {
            Some(limits) => limits.clamp(spec.initial),
            None => spec.initial,
        };
        Ok(Self {
            name: spec.name,
            part,
            axis,
            kind: spec.kind,
            value,
            limits: spec.limits,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn part(&self) -> PartId {
        self.part
    }

    pub fn axis(&self) -> &Unit<Vector3<f32>> {
        &self.axis
    }

    pub fn kind(&self) -> JointKind {
        self.kind
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn limits(&self) -> Option<JointLimits> {
        self.limits
    }

    /// Clamp `value` into the limits, reporting when clamping happened.
    pub(crate) fn constrain(&self, value: f32) -> f32 {
        match self.limits {
            Some(limits) => match limits.check(&self.name, value) {
                Ok(v) => v,
                Err(err) => {
                    tracing::trace!(%err, "clamping joint write");
                    limits.clamp(value)
                }
            },
            None => value,
        }
    }

    /// The joint's contribution to its part's local transform.
    pub fn transform(&self) -> Transform {
        match self.kind {
            JointKind::Rotation => {
                Transform::from_rotation(UnitQuaternion::from_axis_angle(&self.axis, self.value))
            }
            JointKind::Translation => Transform::from_translation(self.axis.into_inner() * self.value),
        }
    }
}
