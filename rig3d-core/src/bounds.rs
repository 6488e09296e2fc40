//! Axis-aligned bounding volumes used for collision gating.

use nalgebra::{Point3, Vector3};

use crate::transform::Transform;

/// An axis-aligned box. Corners are reordered on construction so `min`
/// is always component-wise below `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(a: Point3<f32>, b: Point3<f32>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Box centered at `center` with the given full size.
    pub fn from_center_size(center: Point3<f32>, size: Vector3<f32>) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Zero-volume box at a single point.
    pub fn point(p: Point3<f32>) -> Self {
        Self { min: p, max: p }
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn half_extents(&self) -> Vector3<f32> {
        self.size() * 0.5
    }

    /// Points on the boundary are inside.
    pub fn contains(&self, p: &Point3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Overlap test. Touching faces count as a hit; the test is symmetric.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn expand_to(&mut self, p: &Point3<f32>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn translated(&self, offset: &Vector3<f32>) -> Aabb {
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// World-space box enclosing this box after a rigid transform.
    pub fn transformed(&self, transform: &Transform) -> Aabb {
        let corners = self.corners();
        let first = transform.transform_point(&corners[0]);
        let mut out = Aabb::point(first);
        for corner in &corners[1..] {
            out.expand_to(&transform.transform_point(corner));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use std::f32::consts::FRAC_PI_2;

    fn unit_cube() -> Aabb {
        Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_corners_reordered() {
        let aabb = Aabb::new(Point3::new(2.0, -1.0, 3.0), Point3::new(0.0, 1.0, -3.0));
        assert_eq!(aabb.min, Point3::new(0.0, -1.0, -3.0));
        assert_eq!(aabb.max, Point3::new(2.0, 1.0, 3.0));
    }

    #[test]
    fn test_overlap_when_shifted_half_unit() {
        let a = unit_cube();
        let b = unit_cube().translated(&Vector3::new(0.5, 0.0, 0.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_no_overlap_when_shifted_three_units() {
        let a = unit_cube();
        let b = unit_cube().translated(&Vector3::new(3.0, 0.0, 0.0));
        assert!(!a.intersects(&b));
        assert!(!b.intersects(&a));
    }

    #[test]
    fn test_touching_faces_overlap() {
        let a = unit_cube();
        let b = unit_cube().translated(&Vector3::new(2.0, 0.0, 0.0));
        assert!(a.intersects(&b));
    }

    #[test]
    fn test_union_and_contains() {
        let a = unit_cube();
        let b = unit_cube().translated(&Vector3::new(4.0, 0.0, 0.0));
        let u = a.union(&b);
        assert!(u.contains(&Point3::new(2.0, 0.0, 0.0)));
        assert_eq!(u.max.x, 5.0);
        assert_eq!(u.min.x, -1.0);
    }

    #[test]
    fn test_transformed_quarter_turn() {
        // A long box along z, turned a quarter around x, lies along y.
        let slab = Aabb::new(Point3::new(-0.1, -0.1, 0.0), Point3::new(0.1, 0.1, 2.0));
        let turn = Transform::from_rotation(UnitQuaternion::from_axis_angle(
            &Vector3::x_axis(),
            FRAC_PI_2,
        ));
        let out = slab.transformed(&turn);
        assert_relative_eq!(out.min.y, -2.0, epsilon = 1e-5);
        assert_relative_eq!(out.max.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(out.max.z, 0.1, epsilon = 1e-5);
    }
}
