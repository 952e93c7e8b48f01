// src/gfx/shader/mod.rs
//! # Shader Programs
//!
//! - [`ShaderProgram`] - compile/link, configured uniforms, deferred writes, validation
//! - [`ShaderStack`] - programs active during traversal, switched lazily
//! - [`ShaderSource`] - path-or-inline source discrimination
//! - [`builtin`] - sources of the always-present base program and the skybox

pub mod builtin;
mod program;
mod source;
mod stack;

pub use program::{ShaderProgram, UniformWrite};
pub use source::ShaderSource;
pub use stack::ShaderStack;
