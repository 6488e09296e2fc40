/// Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3};

use crate::bounds::Aabb;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Named viewpoints: three axis-aligned orthographic views, an orthographic
/// and a perspective overview from the (+x, +y, +z) octant, and a follow
/// view that looks straight down from a moving part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraView {
    Frontal,
    Lateral,
    Top,
    Isometric,
    Perspective,
    /// Placed with [`Camera::following`] each frame; [`Camera::framing`]
    /// gives a top-down perspective fallback.
    Follow,
}

impl CameraView {
    pub const ALL: [CameraView; 6] = [
        CameraView::Frontal,
        CameraView::Lateral,
        CameraView::Top,
        CameraView::Isometric,
        CameraView::Perspective,
        CameraView::Follow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CameraView::Frontal => "frontal",
            CameraView::Lateral => "lateral",
            CameraView::Top => "top",
            CameraView::Isometric => "isometric",
            CameraView::Perspective => "perspective",
            CameraView::Follow => "follow",
        }
    }

    pub fn from_label(label: &str) -> Option<CameraView> {
        CameraView::ALL.into_iter().find(|view| view.label() == label)
    }

    pub fn mode(self) -> ProjectionMode {
        match self {
            CameraView::Perspective | CameraView::Follow => ProjectionMode::Perspective,
            _ => ProjectionMode::Orthographic,
        }
    }

    /// Unit direction from the scene center to the eye.
    fn eye_direction(self) -> Vector3<f32> {
        match self {
            CameraView::Frontal => Vector3::z(),
            CameraView::Lateral => Vector3::x(),
            CameraView::Top | CameraView::Follow => Vector3::y(),
            CameraView::Isometric | CameraView::Perspective => {
                Vector3::new(1.0, 1.0, 1.0).normalize()
            }
        }
    }

    fn up(self) -> Vector3<f32> {
        match self {
            CameraView::Top | CameraView::Follow => -Vector3::z(),
            _ => Vector3::y(),
        }
    }
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
    /// Visible height of the orthographic volume.
    pub ortho_height: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            aspect: aspect_ratio(width, height),
            near: 0.1,
            far: 100.0,
            mode: ProjectionMode::Perspective,
            ortho_height: 5.0,
        }
    }

    /// Place a camera for `view` so that `bounds` fills the frame.
    pub fn framing(view: CameraView, bounds: &Aabb, width: u32, height: u32) -> Self {
        let center = bounds.center();
        let radius = (bounds.size().norm() * 0.5).max(0.5);
        let mut camera = Self::new(width, height);
        camera.target = center;
        camera.up = view.up();

        match view.mode() {
            ProjectionMode::Perspective => {
                let half_vertical = camera.fov * 0.5;
                let half_horizontal = (half_vertical.tan() * camera.aspect).atan();
                let distance = 1.1 * radius / half_vertical.min(half_horizontal).sin();
                camera.position = center + view.eye_direction() * distance;
                camera.mode = ProjectionMode::Perspective;
                camera.far = distance + radius * 2.0;
            }
            ProjectionMode::Orthographic => {
                camera.position = center + view.eye_direction() * (radius * 2.0);
                camera.far = radius * 4.0;
                camera.mode = ProjectionMode::Orthographic;
                let half = bounds.half_extents();
                let (across, vertical) = match view {
                    CameraView::Frontal => (half.x, half.y),
                    CameraView::Lateral => (half.z, half.y),
                    CameraView::Top => (half.x, half.z),
                    // Oblique views only know the bounding sphere.
                    _ => (radius, radius),
                };
                let needed = (vertical * 2.0).max(across * 2.0 / camera.aspect);
                camera.ortho_height = (needed * 1.1).max(0.1);
            }
        }

        camera.near = 0.01;
        camera
    }

    /// Perspective camera sitting at `focus` and looking straight down,
    /// seeing `reach` units below it.
    pub fn following(focus: Point3<f32>, reach: f32, width: u32, height: u32) -> Self {
        let view = CameraView::Follow;
        let mut camera = Self::new(width, height);
        camera.position = focus;
        camera.target = focus - view.eye_direction();
        camera.up = view.up();
        camera.mode = ProjectionMode::Perspective;
        camera.near = 0.01;
        camera.far = reach.max(1.0);
        camera
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = self.ortho_height;
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Project a model-space point to screen pixels plus NDC depth.
    ///
    /// Returns `None` outside the view volume.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = self.projection_matrix() * self.view_matrix() * model_matrix;
        self.project_with(&mvp, point, width, height)
    }

    /// Same as [`Camera::project_to_screen`] with a precomputed MVP matrix.
    pub fn project_with(
        &self,
        mvp: &Matrix4<f32>,
        point: &Point3<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let clip = mvp * point.to_homogeneous();
        if clip.w.abs() < 1e-6 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;

        if !(-1.0..=1.0).contains(&ndc.z) {
            return None;
        }
        if !(-1.0..=1.0).contains(&ndc.x) || !(-1.0..=1.0).contains(&ndc.y) {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;
        Some((screen_x, screen_y, ndc.z))
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert_eq!(Camera::new(10, 0).aspect, 10.0);
    }

    #[test]
    fn test_target_projects_to_center() {
        let camera = Camera::new(800, 600);
        let (x, y, z) = camera
            .project_to_screen(&Point3::origin(), &Matrix4::identity(), 800, 600)
            .unwrap();
        assert_relative_eq!(x, 400.0, epsilon = 1e-3);
        assert_relative_eq!(y, 300.0, epsilon = 1e-3);
        assert!(z > -1.0 && z < 1.0);
    }

    #[test]
    fn test_point_behind_camera_is_clipped() {
        let camera = Camera::new(800, 600);
        let behind = Point3::new(0.0, 0.0, 10.0);
        assert!(camera
            .project_to_screen(&behind, &Matrix4::identity(), 800, 600)
            .is_none());
    }

    #[test]
    fn test_framing_keeps_bounds_on_screen() {
        let bounds = Aabb::new(Point3::new(-0.3, -1.3, -1.45), Point3::new(0.3, 0.8, 0.23));
        for view in CameraView::ALL {
            let camera = Camera::framing(view, &bounds, 120, 40);
            for corner in bounds.corners() {
                assert!(
                    camera
                        .project_to_screen(&corner, &Matrix4::identity(), 120, 40)
                        .is_some(),
                    "{} view clipped {corner:?}",
                    view.label()
                );
            }
        }
    }

    #[test]
    fn test_top_view_looks_down() {
        let bounds = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let camera = Camera::framing(CameraView::Top, &bounds, 100, 100);
        assert_eq!(camera.mode, ProjectionMode::Orthographic);
        assert!(camera.position.y > camera.target.y);

        // -z is up on screen in the top view.
        let (_, far_y, _) = camera
            .project_to_screen(&Point3::new(0.0, 0.0, -0.5), &Matrix4::identity(), 100, 100)
            .unwrap();
        let (_, near_y, _) = camera
            .project_to_screen(&Point3::new(0.0, 0.0, 0.5), &Matrix4::identity(), 100, 100)
            .unwrap();
        assert!(far_y < near_y);
    }

    #[test]
    fn test_view_labels_round_trip() {
        for view in CameraView::ALL {
            assert_eq!(CameraView::from_label(view.label()), Some(view));
        }
        assert_eq!(CameraView::from_label("fisheye"), None);
        assert_eq!(CameraView::Isometric.mode(), ProjectionMode::Orthographic);
        assert_eq!(CameraView::Follow.mode(), ProjectionMode::Perspective);
    }

    #[test]
    fn test_following_camera_sees_below_focus() {
        let focus = Point3::new(27.0, 33.0, 0.0);
        let camera = Camera::following(focus, 60.0, 100, 100);
        assert_eq!(camera.position, focus);

        let below = Point3::new(27.0, 10.0, 0.0);
        let (x, y, _) = camera
            .project_to_screen(&below, &Matrix4::identity(), 100, 100)
            .unwrap();
        assert_relative_eq!(x, 50.0, epsilon = 1e-3);
        assert_relative_eq!(y, 50.0, epsilon = 1e-3);

        let above = Point3::new(27.0, 40.0, 0.0);
        assert!(camera
            .project_to_screen(&above, &Matrix4::identity(), 100, 100)
            .is_none());
        // Out of reach.
        let deep = Point3::new(27.0, -40.0, 0.0);
        assert!(camera
            .project_to_screen(&deep, &Matrix4::identity(), 100, 100)
            .is_none());
    }
}
