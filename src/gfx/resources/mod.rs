// src/gfx/resources/mod.rs
//! # GPU Block Resources
//!
//! Named buffers backing uniform blocks and shader storage blocks, and the
//! manager that uploads them and wires them into programs.
//!
//! - [`BlockResource`] - the untyped record: buffer, name, binding, update mode
//! - [`StructResource`] - one fixed `T` fed by a full or partial provider
//! - [`ArraySsbo`] - runtime-sized `T[]` storage buffer
//! - [`ResourceManager`] - name registry, per-frame and on-demand uploads,
//!   block binding of programs

mod block;
mod manager;
mod typed_buffer;

pub use crate::backend::StorageClass;
pub use block::{BlockResource, DirtyRegion, ProviderKind, ResourceId, UpdateMode};
pub use manager::ResourceManager;
pub use typed_buffer::{ArraySsbo, StructResource};
