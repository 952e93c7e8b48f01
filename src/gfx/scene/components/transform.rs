// src/gfx/scene/components/transform.rs
use std::cell::Cell;

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::gfx::context::RenderContext;
use crate::gfx::scene::component::{priority, Component};

/// Local-to-parent matrix of a node
#[derive(Debug)]
pub struct TransformComponent {
    matrix: Cell<Matrix4<f32>>,
}

impl TransformComponent {
    pub fn new(matrix: Matrix4<f32>) -> Self {
        Self {
            matrix: Cell::new(matrix),
        }
    }

    pub fn identity() -> Self {
        Self::new(Matrix4::identity())
    }

    pub fn from_translation(offset: Vector3<f32>) -> Self {
        Self::new(Matrix4::from_translation(offset))
    }

    pub fn from_scale(scale: f32) -> Self {
        Self::new(Matrix4::from_scale(scale))
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        self.matrix.get()
    }

    pub fn set_matrix(&self, matrix: Matrix4<f32>) {
        self.matrix.set(matrix);
    }
}

impl Component for TransformComponent {
    fn name(&self) -> &str {
        "transform"
    }

    fn priority(&self) -> i32 {
        priority::TRANSFORM
    }

    fn apply(&self, ctx: &mut RenderContext) {
        ctx.transforms.push(self.matrix.get());
    }

    fn unapply(&self, ctx: &mut RenderContext) {
        ctx.transforms.pop();
    }

    fn local_transform(&self) -> Option<Matrix4<f32>> {
        Some(self.matrix.get())
    }
}
