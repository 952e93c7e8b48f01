// src/gfx/camera/orbit_camera.rs
use cgmath::*;

use super::camera_utils::Camera;

/// Perspective camera orbiting a target point
///
/// The eye is derived from `distance`, `pitch` and `yaw` around `target`, or
/// placed directly with [`look_at`](Self::look_at).
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

/// The engine's 3D camera
pub type Camera3D = OrbitCamera;

impl Camera for OrbitCamera {
    fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(Point3::from_vec(self.eye), Point3::from_vec(self.target), self.up)
    }

    fn projection(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    fn world_position(&self) -> Option<Point3<f32>> {
        Some(Point3::from_vec(self.eye))
    }
}

impl OrbitCamera {
    pub fn new(distance: f32, pitch: f32, yaw: f32, target: Vector3<f32>, aspect: f32) -> Self {
        let mut camera = Self {
            distance,
            pitch,
            yaw,
            eye: Vector3::zero(),
            target,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy: Rad(std::f32::consts::PI / 4.0),
            znear: 0.1,
            zfar: 1000.0,
        };
        camera.update();
        camera
    }

    /// Places the eye explicitly; the orbit parameters are derived from it
    pub fn look_at(eye: Point3<f32>, target: Point3<f32>, up: Vector3<f32>, aspect: f32) -> Self {
        let offset = eye - target;
        let distance = offset.magnitude();
        let (pitch, yaw) = if distance > f32::EPSILON {
            ((offset.y / distance).asin(), offset.x.atan2(offset.z))
        } else {
            (0.0, 0.0)
        };
        Self {
            distance,
            pitch,
            yaw,
            eye: eye.to_vec(),
            target: target.to_vec(),
            up,
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy: Rad(std::f32::consts::PI / 4.0),
            znear: 0.1,
            zfar: 1000.0,
        }
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update();
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.set_pitch(self.pitch + delta);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        let mut bounded_yaw = yaw;
        if let Some(min_yaw) = self.bounds.min_yaw {
            bounded_yaw = bounded_yaw.max(min_yaw);
        }
        if let Some(max_yaw) = self.bounds.max_yaw {
            bounded_yaw = bounded_yaw.min(max_yaw);
        }
        self.yaw = bounded_yaw;
        self.update();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.set_yaw(self.yaw + delta);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Recomputes the eye after changing `distance`, `pitch` or `yaw`
    fn update(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_yaw: Option<f32>,
    pub max_yaw: Option<f32>,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: None,
            max_distance: None,
            min_pitch: -std::f32::consts::FRAC_PI_2 + f32::EPSILON,
            max_pitch: std::f32::consts::FRAC_PI_2 - f32::EPSILON,
            min_yaw: None,
            max_yaw: None,
        }
    }
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-4
    }

    #[test]
    fn test_orbit_eye_position() {
        let camera = OrbitCamera::new(5.0, 0.0, 0.0, Vector3::zero(), 1.0);
        assert!(close(camera.eye, Vector3::new(0.0, 0.0, 5.0)));
        assert_eq!(camera.world_position(), Some(Point3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_look_at_round_trips_orbit() {
        let eye = Point3::new(3.0, 2.0, 4.0);
        let mut camera = OrbitCamera::look_at(eye, Point3::origin(), Vector3::unit_y(), 1.5);
        camera.set_distance(camera.distance);
        assert!(close(camera.eye, eye.to_vec()));
    }

    #[test]
    fn test_view_moves_eye_to_origin() {
        let camera = OrbitCamera::new(5.0, 0.3, 1.1, Vector3::new(1.0, 0.0, 0.0), 1.0);
        let eye = camera.view() * camera.eye.extend(1.0);
        assert!(eye.truncate().magnitude() < 1e-4);
    }
}
