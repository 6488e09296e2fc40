/// ASCII rasterizer for terminal rendering
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Point3, Vector3};
use rig3d_core::{Aabb, Camera, Mesh, ProjectionMode, Triangle};
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// ASCII renderer that converts rig part boxes to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::Reset; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::Reset);
    }

    /// Character at a cell, mostly for tests.
    pub fn cell(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    /// Draw one part shape placed by `model`, filled or as its twelve edges.
    pub fn render_box(
        &mut self,
        shape: &Aabb,
        model: &Matrix4<f32>,
        camera: &Camera,
        color: Color,
        wireframe: bool,
    ) {
        if wireframe {
            self.render_edges(shape, model, camera, color);
        } else {
            self.render_mesh(&Mesh::from_aabb(shape), model, camera, color);
        }
    }

    pub fn render_mesh(&mut self, mesh: &Mesh, model: &Matrix4<f32>, camera: &Camera, color: Color) {
        let mvp = camera.projection_matrix() * camera.view_matrix() * model;
        for triangle in &mesh.triangles {
            self.render_triangle(triangle, model, &mvp, camera, color);
        }
    }

    fn render_triangle(
        &mut self,
        triangle: &Triangle,
        model: &Matrix4<f32>,
        mvp: &Matrix4<f32>,
        camera: &Camera,
        color: Color,
    ) {
        // Project vertices to screen space
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            match camera.project_with(mvp, &vertex.position, self.width as u32, self.height as u32) {
                Some(coords) => *slot = coords,
                None => return, // Triangle is clipped
            }
        }

        // Cull faces pointing away from the eye and shade the rest
        let normal = triangle.world_normal(model);
        let centroid = triangle
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + model.transform_point(&v.position).coords)
            / 3.0;
        let to_eye = eye_direction(camera, &Point3::from(centroid));
        let brightness = normal.dot(&to_eye);
        if brightness <= 0.0 {
            return;
        }

        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
        let character = LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)];

        self.rasterize_triangle(&screen_coords, character, color);
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char, color: Color) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box, clipped to screen bounds
        let min_x = (v0.0.min(v1.0).min(v2.0).floor() as i32).max(0);
        let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i32).min(self.width as i32 - 1);
        let min_y = (v0.1.min(v1.1).min(v2.1).floor() as i32).max(0);
        let max_y = (v0.1.max(v1.1).max(v2.1).ceil() as i32).min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                if let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                        self.plot(x, y, depth, character, color);
                    }
                }
            }
        }
    }

    fn render_edges(&mut self, shape: &Aabb, model: &Matrix4<f32>, camera: &Camera, color: Color) {
        let mvp = camera.projection_matrix() * camera.view_matrix() * model;
        let corners = shape.corners();
        let projected: Vec<_> = corners
            .iter()
            .map(|c| camera.project_with(&mvp, c, self.width as u32, self.height as u32))
            .collect();

        // Corner index bits are (x, y, z); edges join corners one bit apart.
        for i in 0..8usize {
            for bit in [1usize, 2, 4] {
                if i & bit != 0 {
                    continue;
                }
                if let (Some(a), Some(b)) = (projected[i], projected[i | bit]) {
                    self.draw_line(a, b, color);
                }
            }
        }
    }

    fn draw_line(&mut self, a: (f32, f32, f32), b: (f32, f32, f32), color: Color) {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let character = if dx.abs() > 2.0 * dy.abs() {
            '-'
        } else if dy.abs() > 2.0 * dx.abs() {
            '|'
        } else if dx * dy > 0.0 {
            '\\'
        } else {
            '/'
        };

        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let x = (a.0 + dx * t).floor() as i32;
            let y = (a.1 + dy * t).floor() as i32;
            // Edges are drawn over everything.
            self.plot(x, y, f32::NEG_INFINITY, character, color);
        }
    }

    fn plot(&mut self, x: i32, y: i32, depth: f32, character: char, color: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if depth <= self.depth_buffer[idx] {
            self.depth_buffer[idx] = depth;
            self.char_buffer[idx] = character;
            self.color_buffer[idx] = color;
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            writer.queue(cursor::MoveTo(0, y as u16))?;
            let mut current = None;
            for x in 0..self.width {
                let idx = y * self.width + x;
                let color = self.color_buffer[idx];
                if current != Some(color) {
                    writer.queue(SetForegroundColor(color))?;
                    current = Some(color);
                }
                writer.queue(Print(self.char_buffer[idx]))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Unit vector from `point` toward the eye.
fn eye_direction(camera: &Camera, point: &Point3<f32>) -> Vector3<f32> {
    let to_eye = match camera.mode {
        ProjectionMode::Orthographic => camera.position - camera.target,
        ProjectionMode::Perspective => camera.position - point,
    };
    to_eye.try_normalize(1e-6).unwrap_or_else(Vector3::z)
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
