// src/gfx/camera/ortho_camera.rs
use cgmath::{ortho, Matrix4, SquareMatrix};

use super::camera_utils::Camera;

/// Orthographic 2D camera
///
/// Has no world position, so it never feeds the `CameraPosition` block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera2D {
    pub fn new(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
            znear: -1.0,
            zfar: 1.0,
        }
    }

    /// Pixel-space camera with the origin at the bottom-left corner
    pub fn screen(width: u32, height: u32) -> Self {
        Self::new(0.0, width as f32, 0.0, height as f32)
    }
}

impl Camera for Camera2D {
    fn view(&self) -> Matrix4<f32> {
        Matrix4::identity()
    }

    fn projection(&self) -> Matrix4<f32> {
        ortho(self.left, self.right, self.bottom, self.top, self.znear, self.zfar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    #[test]
    fn test_screen_corners_map_to_ndc() {
        let camera = Camera2D::screen(800, 600);
        let corner = camera.projection() * Vector4::new(800.0, 600.0, 0.0, 1.0);
        assert!((corner.x - 1.0).abs() < 1e-6);
        assert!((corner.y - 1.0).abs() < 1e-6);
        assert_eq!(camera.world_position(), None);
    }
}
