// src/gfx/stacks/mod.rs
//! Traversal-time state stacks
//!
//! Components push on enter and pop on leave, so after a balanced traversal
//! every stack is back at its base.

mod texture;
mod transform;

pub use texture::TextureStack;
pub use transform::TransformStack;
