/// Error types for rig construction, joint writes and animation
use thiserror::Error;

/// Errors raised by the rig model and the animator.
///
/// All of these are local and recoverable; none of them should take the
/// owning frame loop down.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    /// Unknown part, joint or pose.
    #[error("not found: {0}")]
    NotFound(String),

    /// A pose references a joint the rig does not have.
    #[error("invalid pose: {0}")]
    InvalidPose(String),

    /// A joint target fell outside its limits. Writes clamp instead of failing,
    /// so this only shows up in logs and in [`JointLimits::check`](crate::JointLimits::check).
    #[error("value {value} for joint '{joint}' is outside [{min}, {max}]")]
    OutOfRange {
        joint: String,
        value: f32,
        min: f32,
        max: f32,
    },

    /// Two parts or two joints share a name.
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// Malformed rig, limits, symmetry table or non-finite input.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RigError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_pose(msg: impl Into<String>) -> Self {
        Self::InvalidPose(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RigError>;
