/// Triangle meshes for drawing rig part shapes
use nalgebra::{Matrix4, Point3, Vector3};

use crate::bounds::Aabb;

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding order. Zero for degenerate faces.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let [v0, v1, v2] = self.vertices.map(|v| v.position);
        (v1 - v0)
            .cross(&(v2 - v0))
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Normal after `model` is applied, for shading in world space.
    pub fn world_normal(&self, model: &Matrix4<f32>) -> Vector3<f32> {
        let [v0, v1, v2] = self.vertices.map(|v| model.transform_point(&v.position));
        (v1 - v0)
            .cross(&(v2 - v0))
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Add a quad as two triangles sharing the `a`-`c` diagonal.
    fn add_quad(&mut self, corners: [Point3<f32>; 4], normal: Vector3<f32>) {
        let [a, b, c, d] = corners.map(|p| Vertex::new(p, normal));
        self.add_triangle(Triangle::new(a, b, c));
        self.add_triangle(Triangle::new(a, c, d));
    }

    /// Twelve outward-wound triangles covering the faces of `aabb`.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        let [c000, c100, c010, c110, c001, c101, c011, c111] = aabb.corners();
        let mut mesh = Self::with_capacity(12);

        mesh.add_quad([c001, c101, c111, c011], Vector3::z());
        mesh.add_quad([c000, c010, c110, c100], -Vector3::z());
        mesh.add_quad([c010, c011, c111, c110], Vector3::y());
        mesh.add_quad([c000, c100, c101, c001], -Vector3::y());
        mesh.add_quad([c100, c110, c111, c101], Vector3::x());
        mesh.add_quad([c000, c001, c011, c010], -Vector3::x());

        mesh
    }

    /// Append every triangle of `other`.
    pub fn extend(&mut self, other: Mesh) {
        self.triangles.extend(other.triangles);
    }
}
