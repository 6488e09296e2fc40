//! Pose-to-pose interpolation and the collision-gated docking state machine.
//!
//! The animator is driven once per frame with the measured frame time, so
//! motion speed is wall-clock based rather than frame-count based:
//!
//! - `Idle → Animating` on an explicit transform request.
//! - `Idle → Docking` when the two bodies overlap, the rig matches the
//!   qualifying pose and the gate is armed. The gate disarms when docking
//!   starts and re-arms only once the bodies separate.
//! - `Animating | Docking → Idle` once the request finishes. Joint values and
//!   body positions are snapped to their exact targets on completion.
//!
//! Requests cannot be cancelled; a request in flight always runs to the end,
//! and transform requests arriving meanwhile are dropped.

use nalgebra::{Point3, Vector3};

use crate::error::{Result, RigError};
use crate::pose::Pose;
use crate::rig::{PartId, Rig};
use crate::symmetry::SymmetryTable;

/// Linear interpolation, `start + t * (end - start)`.
pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    start + t * (end - start)
}

/// Move `current` toward `target` by at most `travel`.
///
/// The direction is recomputed from `current` on every call. When the
/// remaining distance is within `travel` the result is exactly `target` and
/// the flag is `true`, so the motion cannot overshoot whatever the step size.
pub fn step_toward(current: &Point3<f32>, target: &Point3<f32>, travel: f32) -> (Point3<f32>, bool) {
    let delta: Vector3<f32> = target - current;
    let distance = delta.norm();
    if distance <= travel {
        return (*target, true);
    }
    (current + delta * (travel / distance), false)
}

/// An in-flight interpolation between two poses.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationRequest {
    pose: String,
    start: Pose,
    end: Pose,
    speed: f32,
    progress: f32,
}

impl AnimationRequest {
    /// `speed` is progress per second (1.0 means a one second transition).
    pub fn new(pose: impl Into<String>, start: Pose, end: Pose, speed: f32) -> Self {
        Self {
            pose: pose.into(),
            start,
            end,
            speed,
            progress: 0.0,
        }
    }

    /// A non-positive duration finishes on the next update.
    pub fn with_duration(pose: impl Into<String>, start: Pose, end: Pose, duration: f32) -> Self {
        let speed = if duration > 0.0 { 1.0 / duration } else { f32::INFINITY };
        Self::new(pose, start, end, speed)
    }

    pub fn pose(&self) -> &str {
        &self.pose
    }

    pub fn start(&self) -> &Pose {
        &self.start
    }

    pub fn end(&self) -> &Pose {
        &self.end
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    fn advance(&mut self, dt: f32) -> f32 {
        // Anything but a finite positive rate finishes at once.
        self.progress = if self.speed > 0.0 && self.speed.is_finite() {
            (self.progress + dt * self.speed).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.progress
    }

    /// Interpolated value of `joint` at the current progress.
    pub fn value_at(&self, joint: crate::JointId) -> Option<f32> {
        let end = self.end.get(joint)?;
        let start = self.start.get(joint).unwrap_or(end);
        Some(lerp(start, end, self.progress))
    }
}

/// Where a docking body goes and how fast.
#[derive(Debug, Clone, PartialEq)]
pub struct DockingConfig {
    /// Target offset of the docking body's root, in its parent's frame.
    pub target: Point3<f32>,
    /// Units per second.
    pub speed: f32,
    /// Pose the rig must be in for a collision to start docking.
    pub qualifying_pose: String,
    /// Per-joint tolerance when matching the qualifying pose.
    pub tolerance: f32,
}

/// An in-flight docking move.
#[derive(Debug, Clone, PartialEq)]
pub struct DockingRequest {
    body: PartId,
    start: Point3<f32>,
    position: Point3<f32>,
    target: Point3<f32>,
    speed: f32,
}

impl DockingRequest {
    pub fn new(body: PartId, start: Point3<f32>, target: Point3<f32>, speed: f32) -> Self {
        Self {
            body,
            start,
            position: start,
            target,
            speed,
        }
    }

    pub fn body(&self) -> PartId {
        self.body
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    /// Fraction of the initial distance already covered.
    pub fn progress(&self) -> f32 {
        let total = (self.target - self.start).norm();
        if total <= f32::EPSILON {
            return 1.0;
        }
        (1.0 - (self.target - self.position).norm() / total).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AnimatorState {
    #[default]
    Idle,
    Animating(AnimationRequest),
    Docking(DockingRequest),
}

impl AnimatorState {
    pub fn label(&self) -> &'static str {
        match self {
            AnimatorState::Idle => "idle",
            AnimatorState::Animating(_) => "animating",
            AnimatorState::Docking(_) => "docking",
        }
    }
}

/// Things a renderer may want to react to (UI feedback, sounds).
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatorEvent {
    AnimationComplete { pose: String },
    DockingStarted,
    DockingComplete,
}

/// Drives pose transitions and docking moves for one rig.
#[derive(Debug, Clone)]
pub struct TransformAnimator {
    state: AnimatorState,
    transform_speed: f32,
    armed: bool,
}

impl TransformAnimator {
    /// `transform_speed` is the progress rate used for pose transitions and
    /// must be finite and positive.
    pub fn new(transform_speed: f32) -> Result<Self> {
        if !(transform_speed > 0.0 && transform_speed.is_finite()) {
            return Err(RigError::invalid_config(format!(
                "transform speed must be positive, got {transform_speed}"
            )));
        }
        Ok(Self {
            state: AnimatorState::Idle,
            transform_speed,
            armed: true,
        })
    }

    pub fn state(&self) -> &AnimatorState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, AnimatorState::Idle)
    }

    /// Whether the next qualifying collision may start docking.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn progress(&self) -> Option<f32> {
        match &self.state {
            AnimatorState::Idle => None,
            AnimatorState::Animating(request) => Some(request.progress()),
            AnimatorState::Docking(request) => Some(request.progress()),
        }
    }

    /// Start interpolating toward `end`. Returns `false` without touching
    /// anything when a request is already in flight.
    pub fn trigger_transform(&mut self, rig: &Rig, pose_name: &str, end: &Pose) -> Result<bool> {
        if !self.is_idle() {
            tracing::debug!(pose = pose_name, state = self.state.label(), "transform ignored");
            return Ok(false);
        }
        end.validate(rig)?;
        let start = Pose::capture(rig, end.joints())?;
        self.state = AnimatorState::Animating(AnimationRequest::new(
            pose_name,
            start,
            end.clone(),
            self.transform_speed,
        ));
        tracing::debug!(pose = pose_name, "transform started");
        Ok(true)
    }

    /// Feed this tick's collision result through the docking gate.
    ///
    /// `position` is the current offset of `body`. Returns `DockingStarted`
    /// on the tick the gate fires.
    pub fn observe_collision(
        &mut self,
        colliding: bool,
        qualifies: bool,
        body: PartId,
        position: Point3<f32>,
        docking: &DockingConfig,
    ) -> Option<AnimatorEvent> {
        if !colliding {
            if !self.armed {
                tracing::trace!("bodies separated, docking re-armed");
            }
            self.armed = true;
            return None;
        }
        if !(self.armed && qualifies && self.is_idle()) {
            return None;
        }

        self.armed = false;
        self.state = AnimatorState::Docking(DockingRequest::new(
            body,
            position,
            docking.target,
            docking.speed,
        ));
        tracing::info!(dock_target = ?docking.target, "docking started");
        Some(AnimatorEvent::DockingStarted)
    }

    /// Advance the active request by `dt` seconds.
    ///
    /// Pose transitions write the rig's joints and propagate mirrored joints
    /// at every step; docking moves the `payload` body.
    pub fn update(
        &mut self,
        dt: f32,
        rig: &mut Rig,
        symmetry: &SymmetryTable,
        payload: Option<&mut Rig>,
    ) -> Result<Option<AnimatorEvent>> {
        let event = match &mut self.state {
            AnimatorState::Idle => None,
            AnimatorState::Animating(request) => {
                let progress = request.advance(dt);
                if progress >= 1.0 {
                    for (joint, value) in request.end.iter() {
                        rig.set_joint_value(joint, value)?;
                        symmetry.propagate(rig, joint)?;
                    }
                    tracing::debug!(pose = %request.pose, "transform complete");
                    Some(AnimatorEvent::AnimationComplete {
                        pose: request.pose.clone(),
                    })
                } else {
                    for joint in request.end.joints() {
                        if let Some(value) = request.value_at(joint) {
                            rig.set_joint_value(joint, value)?;
                            symmetry.propagate(rig, joint)?;
                        }
                    }
                    None
                }
            }
            AnimatorState::Docking(request) => {
                let body_rig =
                    payload.ok_or_else(|| RigError::not_found("docking body rig"))?;
                let current = Point3::from(body_rig.part_offset(request.body)?);
                let (next, arrived) = step_toward(&current, &request.target, request.speed * dt);
                body_rig.set_part_offset(request.body, next.coords)?;
                request.position = next;
                if arrived {
                    tracing::info!("docking complete");
                    Some(AnimatorEvent::DockingComplete)
                } else {
                    None
                }
            }
        };

        if event.is_some() {
            self.state = AnimatorState::Idle;
        }
        Ok(event)
    }
}
