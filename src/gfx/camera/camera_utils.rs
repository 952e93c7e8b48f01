// src/gfx/camera/camera_utils.rs
use cgmath::{Matrix4, Point3, SquareMatrix};

/// Anything that can drive the engine camera blocks
pub trait Camera {
    fn view(&self) -> Matrix4<f32>;
    fn projection(&self) -> Matrix4<f32>;

    /// Eye position in world space; `None` for cameras without one (2D)
    fn world_position(&self) -> Option<Point3<f32>> {
        None
    }

    fn view_projection(&self) -> Matrix4<f32> {
        self.projection() * self.view()
    }
}

/// std140 image of the `CameraMatrices` block
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraMatricesBlock {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}
// 2 * 64 = 128 bytes

impl CameraMatricesBlock {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>) -> Self {
        Self {
            view: view.into(),
            projection: projection.into(),
        }
    }

    pub fn from_camera(camera: &dyn Camera) -> Self {
        Self::new(camera.view(), camera.projection())
    }
}

impl Default for CameraMatricesBlock {
    fn default() -> Self {
        Self::new(Matrix4::identity(), Matrix4::identity())
    }
}

/// std140 image of the `CameraPosition` block
///
/// The position is homogeneous (`w = 1`) to fill the 16-byte slot.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraPositionBlock {
    pub world_position: [f32; 4],
}

impl CameraPositionBlock {
    pub fn new(position: Point3<f32>) -> Self {
        Self {
            world_position: [position.x, position.y, position.z, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    #[test]
    fn test_block_sizes() {
        assert_eq!(std::mem::size_of::<CameraMatricesBlock>(), 128);
        assert_eq!(std::mem::size_of::<CameraPositionBlock>(), 16);
    }

    #[test]
    fn test_matrices_are_column_major() {
        let view = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        let block = CameraMatricesBlock::new(view, Matrix4::identity());
        assert_eq!(block.view[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
