/// rig3d Core Library - articulated rigs and their animation
///
/// This library holds the renderer-independent state of the interactive rig
/// demos: part hierarchies with constrained joints, named poses, mirrored
/// joints, the transform/docking animator and a frame-driven simulation loop.
/// Camera and mesh helpers are shared by the terminal and web front ends.

pub mod animator;
pub mod bounds;
pub mod error;
pub mod geometry;
pub mod input;
pub mod joint;
pub mod pose;
pub mod presets;
pub mod projection;
pub mod rig;
pub mod simulation;
pub mod symmetry;
pub mod transform;

// Re-export commonly used types
pub use animator::{
    lerp, step_toward, AnimationRequest, AnimatorEvent, AnimatorState, DockingConfig,
    DockingRequest, TransformAnimator,
};
pub use bounds::Aabb;
pub use error::{Result, RigError};
pub use geometry::{Mesh, Triangle, Vertex};
pub use input::{Command, HeldInputs, InputMap};
pub use joint::{Joint, JointId, JointKind, JointLimits, JointSpec};
pub use pose::{Pose, PoseLibrary};
pub use presets::Preset;
pub use projection::{Camera, CameraView, ProjectionMode};
pub use rig::{PartId, Rig, RigBuilder, RigPart};
pub use simulation::{DirtyParts, SimConfig, Simulation, TickReport};
pub use symmetry::{Mirror, SymmetryTable};
pub use transform::{RotationState, Transform};
