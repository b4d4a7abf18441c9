//! Orbit-style camera controls.
//!
//! Pointer drags orbit the camera around its target, the wheel dollies it
//! in and out, and a secondary drag pans. Input only accumulates deltas;
//! [`OrbitControls::update`] applies them to the camera once per frame and,
//! with damping enabled, lets the remaining motion decay over later frames.

use std::f32::consts::PI;

use nalgebra::{Point3, Vector3};

use crate::camera::{PerspectiveCamera, SurfaceSize};
use crate::config::ControlsConfig;

const EPS: f32 = 1e-6;

/// Pointer buttons the controls react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Input forwarded by a host, in surface pixels where positional
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    PointerDown { button: PointerButton, x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    Wheel { delta_y: f32 },
    /// Orbit by explicit angles in radians
    Rotate { left: f32, up: f32 },
    /// Multiply the camera distance by `factor`
    Dolly { factor: f32 },
    Pan { dx: f32, dy: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Idle,
    Rotate { x: f32, y: f32 },
    Pan { x: f32, y: f32 },
}

/// Spherical coordinates around the target, Y up
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// Azimuth around Y, measured from +Z
    theta: f32,
    /// Polar angle from +Y
    phi: f32,
}

impl Spherical {
    fn from_offset(offset: &Vector3<f32>) -> Self {
        let radius = offset.norm();
        if radius < EPS {
            return Self {
                radius: 0.0,
                theta: 0.0,
                phi: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi = self.phi.sin();
        Vector3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    surface: SurfaceSize,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vector3<f32>,
    drag: Drag,
}

impl OrbitControls {
    /// Controls bound to a drawable surface of `surface` CSS pixels
    pub fn new(config: &ControlsConfig, surface: SurfaceSize) -> Self {
        Self {
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            surface,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vector3::zeros(),
            drag: Drag::Idle,
        }
    }

    pub fn set_surface(&mut self, surface: SurfaceSize) {
        self.surface = surface;
    }

    /// Drag distances are normalized by the surface height
    fn surface_height(&self) -> f32 {
        self.surface.height.max(1) as f32
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Move the camera towards the target by `factor` (< 1 zooms in)
    pub fn dolly_in(&mut self, factor: f32) {
        self.scale *= factor;
    }

    pub fn dolly_out(&mut self, factor: f32) {
        self.scale /= factor;
    }

    fn zoom_factor(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    /// Pan by a pointer delta in surface pixels, screen-space
    pub fn pan(&mut self, dx: f32, dy: f32, camera: &PerspectiveCamera) {
        let offset = camera.position - camera.target;
        let target_distance = offset.norm() * (camera.fov.to_radians() / 2.0).tan();
        let height = self.surface_height();

        let forward = (camera.target - camera.position)
            .try_normalize(EPS)
            .unwrap_or_else(|| -Vector3::z());
        let right = forward
            .cross(&camera.up)
            .try_normalize(EPS)
            .unwrap_or_else(Vector3::x);
        let up = right.cross(&forward);

        let left = -right * (2.0 * dx * target_distance / height);
        let upward = up * (2.0 * dy * target_distance / height);
        self.pan_offset += (left + upward) * self.pan_speed;
    }

    pub fn pointer_down(&mut self, button: PointerButton, x: f32, y: f32) {
        self.drag = match button {
            PointerButton::Primary => Drag::Rotate { x, y },
            PointerButton::Secondary | PointerButton::Middle => Drag::Pan { x, y },
        };
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, camera: &PerspectiveCamera) {
        match self.drag {
            Drag::Idle => {}
            Drag::Rotate { x: x0, y: y0 } => {
                let height = self.surface_height();
                let scale = 2.0 * PI * self.rotate_speed / height;
                self.rotate_left((x - x0) * scale);
                self.rotate_up((y - y0) * scale);
                self.drag = Drag::Rotate { x, y };
            }
            Drag::Pan { x: x0, y: y0 } => {
                self.pan(x - x0, y - y0, camera);
                self.drag = Drag::Pan { x, y };
            }
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = Drag::Idle;
    }

    /// Wheel with DOM sign convention: negative `delta_y` zooms in
    pub fn wheel(&mut self, delta_y: f32) {
        if delta_y < 0.0 {
            self.dolly_in(self.zoom_factor());
        } else if delta_y > 0.0 {
            self.dolly_out(self.zoom_factor());
        }
    }

    pub fn handle(&mut self, input: ControlInput, camera: &PerspectiveCamera) {
        match input {
            ControlInput::PointerDown { button, x, y } => self.pointer_down(button, x, y),
            ControlInput::PointerMove { x, y } => self.pointer_move(x, y, camera),
            ControlInput::PointerUp => self.pointer_up(),
            ControlInput::Wheel { delta_y } => self.wheel(delta_y),
            ControlInput::Rotate { left, up } => {
                self.rotate_left(left);
                self.rotate_up(up);
            }
            ControlInput::Dolly { factor } => self.dolly_in(factor),
            ControlInput::Pan { dx, dy } => self.pan(dx, dy, camera),
        }
    }

    /// Apply pending motion to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - camera.target;
        let mut spherical = Spherical::from_offset(&offset);

        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        spherical.theta += self.delta_theta * factor;
        spherical.phi = (spherical.phi + self.delta_phi * factor).clamp(EPS, PI - EPS);
        spherical.radius =
            (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        let target: Point3<f32> = camera.target + self.pan_offset * factor;
        let position = target + spherical.to_offset();

        let moved = (position - camera.position).norm_squared() > EPS
            || (target - camera.target).norm_squared() > EPS;
        camera.target = target;
        camera.position = position;

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vector3::zeros();
        }
        self.scale = 1.0;

        moved
    }
}
