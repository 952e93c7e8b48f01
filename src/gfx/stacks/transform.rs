// src/gfx/stacks/transform.rs
use cgmath::{Matrix4, SquareMatrix};
use log::warn;

use crate::error::GfxError;

/// Accumulated model matrices
///
/// The base is the identity. `push(m)` pushes `top * m`, so the top is always
/// the full model matrix of the node being visited.
#[derive(Debug, Clone)]
pub struct TransformStack {
    matrices: Vec<Matrix4<f32>>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStack {
    pub fn new() -> Self {
        Self {
            matrices: vec![Matrix4::identity()],
        }
    }

    pub fn push(&mut self, local: Matrix4<f32>) {
        let top = self.top();
        self.matrices.push(top * local);
    }

    /// Removes the top matrix; popping the base is ignored
    pub fn pop(&mut self) -> Option<Matrix4<f32>> {
        if self.matrices.len() == 1 {
            warn!("{}", GfxError::StackUnderflow { stack: "transform" });
            return None;
        }
        self.matrices.pop()
    }

    pub fn top(&self) -> Matrix4<f32> {
        self.matrices
            .last()
            .copied()
            .unwrap_or_else(Matrix4::identity)
    }

    /// Number of matrices, base included
    pub fn depth(&self) -> usize {
        self.matrices.len()
    }
}
