// src/gfx/scene/components/clip_plane.rs
use std::cell::{Cell, RefCell};

use cgmath::{Matrix, SquareMatrix, Vector4};
use log::warn;

use crate::backend::Capability;
use crate::config::EngineConfig;
use crate::error::{GfxError, Result};
use crate::gfx::context::RenderContext;
use crate::gfx::scene::component::{priority, Component};
use crate::gfx::uniform::UniformValue;

/// Uniform receiving the view-space planes
pub const CLIP_PLANES_UNIFORM: &str = "u_clipPlanes";

/// User clip planes for the node's subtree
///
/// Planes are given in the node's local space as `(a, b, c, d)` with
/// `ax + by + cz + d >= 0` kept. On apply they are moved to view space with
/// the inverse transpose of the model-view matrix and clip distances
/// `0..n` are enabled; unapply disables exactly those.
#[derive(Debug)]
pub struct ClipPlaneComponent {
    planes: Vec<Vector4<f32>>,
    transformed: RefCell<Vec<Vector4<f32>>>,
    enabled: Cell<u32>,
}

impl ClipPlaneComponent {
    pub fn new(config: &EngineConfig, planes: Vec<Vector4<f32>>) -> Result<Self> {
        if planes.is_empty() {
            return Err(GfxError::InvalidArgument(
                "a clip-plane component needs at least one plane".to_string(),
            ));
        }
        if planes.len() > config.max_clip_distances as usize {
            return Err(GfxError::InvalidArgument(format!(
                "{} clip planes requested, at most {} are available",
                planes.len(),
                config.max_clip_distances
            )));
        }
        Ok(Self {
            planes,
            transformed: RefCell::new(Vec::new()),
            enabled: Cell::new(0),
        })
    }

    pub fn planes(&self) -> &[Vector4<f32>] {
        &self.planes
    }

    /// Planes as uploaded by the last apply
    pub fn transformed_planes(&self) -> Vec<Vector4<f32>> {
        self.transformed.borrow().clone()
    }

    /// Clip distances currently enabled by this component
    pub fn enabled(&self) -> u32 {
        self.enabled.get()
    }
}

impl Component for ClipPlaneComponent {
    fn name(&self) -> &str {
        "clip planes"
    }

    fn priority(&self) -> i32 {
        priority::CLIP_PLANE
    }

    fn apply(&self, ctx: &mut RenderContext) {
        let model_view = ctx.camera.view() * ctx.transforms.top();
        let Some(inverse) = model_view.invert() else {
            warn!("clip planes skipped: model-view matrix is singular");
            return;
        };
        let mit = inverse.transpose();

        let planes: Vec<Vector4<f32>> = self.planes.iter().map(|&p| mit * p).collect();
        ctx.shaders
            .peek()
            .set_uniform(CLIP_PLANES_UNIFORM, UniformValue::Vec4Array(planes.clone()));
        *self.transformed.borrow_mut() = planes;

        let count = self.planes.len() as u32;
        let api = ctx.gpu.api();
        for i in 0..count {
            api.enable(Capability::ClipDistance(i));
        }
        self.enabled.set(count);
    }

    fn unapply(&self, ctx: &mut RenderContext) {
        let api = ctx.gpu.api();
        for i in 0..self.enabled.replace(0) {
            api.disable(Capability::ClipDistance(i));
        }
    }
}
