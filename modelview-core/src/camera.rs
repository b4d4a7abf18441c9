/// Perspective camera and drawable surface sizes
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::config::CameraConfig;

/// Pixel dimensions of a container or drawable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `width / height`, or `None` when either side is zero
    pub fn aspect(&self) -> Option<f32> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(self.width as f32 / self.height as f32)
        }
    }

    /// Scale by a device pixel ratio, rounding to whole pixels
    pub fn scaled(&self, ratio: f32) -> Self {
        Self {
            width: (self.width as f32 * ratio).round() as u32,
            height: (self.height as f32 * ratio).round() as u32,
        }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Point projected onto a surface: pixel coordinates plus NDC depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
}

/// Perspective projection camera looking at `target`.
///
/// The projection matrix is cached; after changing `fov`, `aspect`, `near`
/// or `far` call [`PerspectiveCamera::update_projection_matrix`].
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Matrix4<f32>,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Point3::origin(),
            target: Point3::origin(),
            up: Vector3::y(),
            fov,
            aspect,
            near,
            far,
            projection: Matrix4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// Camera placed `config.distance` along +Z, looking at the origin
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::new(config.fov, aspect, config.near, config.far);
        camera.position = Point3::new(0.0, 0.0, config.distance);
        camera
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Matrix4::new_perspective(self.aspect, self.fov.to_radians(), self.near, self.far);
    }

    pub fn projection_matrix(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view_matrix()
    }

    /// Project a point through `mvp` onto a surface of `size` pixels.
    ///
    /// Returns `None` for points on or behind the camera plane.
    pub fn project_to_screen(
        mvp: &Matrix4<f32>,
        point: &Point3<f32>,
        size: SurfaceSize,
    ) -> Option<ScreenPoint> {
        let clip = mvp * Vector4::new(point.x, point.y, point.z, 1.0);
        if clip.w <= 1e-6 {
            return None;
        }

        let ndc = clip.xyz() / clip.w;
        Some(ScreenPoint {
            x: (ndc.x + 1.0) * 0.5 * size.width as f32,
            y: (1.0 - ndc.y) * 0.5 * size.height as f32,
            depth: ndc.z,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_from_size() {
        assert!((SurfaceSize::new(800, 600).aspect().unwrap() - 1.3333).abs() < 1e-4);
        assert_eq!(SurfaceSize::new(400, 400).aspect(), Some(1.0));
        assert_eq!(SurfaceSize::new(400, 0).aspect(), None);
        assert_eq!(SurfaceSize::new(0, 400).aspect(), None);
    }

    #[test]
    fn test_scaled_rounds() {
        assert_eq!(SurfaceSize::new(101, 50).scaled(1.5), SurfaceSize::new(152, 75));
    }

    #[test]
    fn test_camera_from_config() {
        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 2.0);
        assert_eq!(camera.position, Point3::new(0.0, 0.0, 10.0));
        assert_eq!(camera.aspect, 2.0);
        assert_eq!(camera.fov, 0.5);
    }

    #[test]
    fn test_projection_cached_until_update() {
        let mut camera = PerspectiveCamera::new(45.0, 1.0, 0.1, 100.0);
        let before = *camera.projection_matrix();
        camera.aspect = 2.0;
        assert_eq!(*camera.projection_matrix(), before);
        camera.update_projection_matrix();
        assert!((camera.projection_matrix()[(0, 0)] * 2.0 - before[(0, 0)]).abs() < 1e-6);
    }

    #[test]
    fn test_target_projects_to_center() {
        let mut camera = PerspectiveCamera::new(45.0, 1.0, 0.1, 100.0);
        camera.position = Point3::new(0.0, 0.0, 5.0);
        let size = SurfaceSize::new(200, 100);
        let mvp = camera.view_projection();
        let p = PerspectiveCamera::project_to_screen(&mvp, &Point3::origin(), size).unwrap();
        assert!((p.x - 100.0).abs() < 1e-3);
        assert!((p.y - 50.0).abs() < 1e-3);

        let behind = Point3::new(0.0, 0.0, 10.0);
        assert!(PerspectiveCamera::project_to_screen(&mvp, &behind, size).is_none());
    }
}
