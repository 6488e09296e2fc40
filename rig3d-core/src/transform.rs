/// Rigid transforms for rig parts and matrix helpers for renderers
use nalgebra::{Matrix4, Point3, Translation3, UnitQuaternion, Vector3};

/// Euler rotation around three axes (in radians)
///
/// Used to declare a part's fixed base orientation. Angles are applied in
/// the order X, then Y, then Z (the matrix product is `Rz * Ry * Rx`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    pub fn to_quaternion(&self) -> UnitQuaternion<f32> {
        let rx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.x);
        let ry = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.y);
        let rz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.z);
        rz * ry * rx
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Translation plus rotation, the unit every part hands to a renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Transform {
    pub fn new(translation: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity())
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self::new(translation, UnitQuaternion::identity())
    }

    pub fn from_rotation(rotation: UnitQuaternion<f32>) -> Self {
        Self::new(Vector3::zeros(), rotation)
    }

    /// Apply `child` in the frame of `self` (parent · child).
    pub fn compose(&self, child: &Transform) -> Transform {
        Transform {
            translation: self.translation + self.rotation * child.translation,
            rotation: self.rotation * child.rotation,
        }
    }

    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        Point3::from(self.rotation * point.coords + self.translation)
    }

    pub fn transform_vector(&self, vector: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * vector
    }

    /// Homogeneous model matrix (`T * R`).
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Translation3::from(self.translation).to_homogeneous() * self.rotation.to_homogeneous()
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
