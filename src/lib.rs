// src/lib.rs
//! Tartan 3D Engine core
//!
//! A scene-graph rendering core for OpenGL-style backends: typed uniform
//! dispatch with deferred writes, named uniform and storage blocks kept in
//! sync with CPU providers, and traversal-time transform, shader and texture
//! stacks.

pub mod backend;
pub mod config;
pub mod error;
pub mod gfx;
pub mod logging;
pub mod prelude;

// Re-export main types for convenience
pub use error::{GfxError, Result};
pub use gfx::RenderContext;
