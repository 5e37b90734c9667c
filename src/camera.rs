//! Camera, projection and orbit controls.
//!
//! The camera is a position looking at a target. [`OrbitController`] turns
//! pointer input into orbit (left drag), pan (right drag) and zoom (wheel)
//! around that target. Input is only accumulated while events arrive; it is
//! applied to the camera once per frame by [`OrbitController::update`].

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

// Keeps the polar angle away from the poles where look_at degenerates.
const POLAR_EPSILON: f32 = 1e-3;

// Zooming never gets closer than this, so the camera can always zoom back out.
const MIN_ORBIT_DISTANCE: f32 = 1e-3;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }
}

/// Perspective projection parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: aspect_ratio(width, height),
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width as f32 / height.max(1) as f32
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of the camera: the uniform and what binds it.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    None,
    Rotate,
    Pan,
}

/// Translates pointer drags and wheel input into camera pose changes.
#[derive(Clone, Debug)]
pub struct OrbitController {
    drag: Drag,
    cursor: Option<(f64, f64)>,
    rotate_delta: (f32, f32),
    pan_delta: (f32, f32),
    zoom_delta: f32,
    rotate_speed: f32,
    pan_speed: f32,
    zoom_speed: f32,
    min_distance: f32,
    max_distance: f32,
}

impl OrbitController {
    /// `rotate_speed` is radians per pixel dragged; `zoom_speed` is the
    /// fraction of the distance covered by one wheel line.
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            drag: Drag::None,
            cursor: None,
            rotate_delta: (0.0, 0.0),
            pan_delta: (0.0, 0.0),
            zoom_delta: 0.0,
            rotate_speed,
            pan_speed: 0.002,
            zoom_speed,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }

    pub fn with_limits(mut self, min_distance: Option<f32>, max_distance: Option<f32>) -> Self {
        self.min_distance = min_distance.unwrap_or(0.0);
        self.max_distance = max_distance.unwrap_or(f32::INFINITY);
        self
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != Drag::None
    }

    pub fn has_pending_input(&self) -> bool {
        self.rotate_delta != (0.0, 0.0) || self.pan_delta != (0.0, 0.0) || self.zoom_delta != 0.0
    }

    /// Feeds a pointer movement in pixels, as if dragged with the current button.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        match self.drag {
            Drag::Rotate => {
                self.rotate_delta.0 += dx as f32;
                self.rotate_delta.1 += dy as f32;
            }
            Drag::Pan => {
                self.pan_delta.0 += dx as f32;
                self.pan_delta.1 += dy as f32;
            }
            Drag::None => (),
        }
    }

    /// Positive values zoom in.
    pub fn handle_scroll(&mut self, lines: f32) {
        self.zoom_delta += lines;
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => Drag::Rotate,
                    (ElementState::Pressed, MouseButton::Right) => Drag::Pan,
                    (ElementState::Released, _) => Drag::None,
                    _ => self.drag,
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = (position.x, position.y);
                if let Some((x, y)) = self.cursor {
                    self.handle_mouse(current.0 - x, current.1 - y);
                }
                self.cursor = Some(current);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = Drag::None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.handle_scroll(lines);
            }
            _ => (),
        }
    }

    /// Applies all accumulated input to `camera` and clears it.
    ///
    /// Returns whether the camera moved. Without pending input the camera is
    /// left untouched.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        if !self.has_pending_input() {
            return false;
        }

        let offset = camera.position - camera.target;
        let mut radius = offset.magnitude();
        if radius <= f32::EPSILON {
            self.clear();
            return false;
        }
        // Spherical coordinates around the target, y up.
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        azimuth -= self.rotate_delta.0 * self.rotate_speed;
        polar -= self.rotate_delta.1 * self.rotate_speed;
        polar = polar.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        if self.zoom_delta != 0.0 {
            radius *= (1.0 - self.zoom_speed).powf(self.zoom_delta);
        }
        let floor = self.min_distance.max(MIN_ORBIT_DISTANCE);
        radius = radius.min(self.max_distance).max(floor);

        if self.pan_delta != (0.0, 0.0) {
            let forward = (camera.target - camera.position).normalize();
            let right = forward.cross(Vector3::unit_y()).normalize();
            let up = right.cross(forward);
            let scale = self.pan_speed * radius;
            camera.target +=
                right * (-self.pan_delta.0 * scale) + up * (self.pan_delta.1 * scale);
        }

        let direction = Vector3::new(
            polar.sin() * azimuth.sin(),
            polar.cos(),
            polar.sin() * azimuth.cos(),
        );
        camera.position = camera.target + direction * radius;
        self.clear();
        true
    }

    fn clear(&mut self) {
        self.rotate_delta = (0.0, 0.0);
        self.pan_delta = (0.0, 0.0);
        self.zoom_delta = 0.0;
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(0.005, 0.05)
    }
}
