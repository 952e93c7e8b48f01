// src/gfx/mod.rs
//! # Graphics Module
//!
//! The GPU resource and uniform pipeline of the Tartan engine, and the scene
//! graph that drives it.
//!
//! ## Architecture Overview
//!
//! - **Uniforms** ([`uniform`]) - typed uniform slots and deferred writes
//! - **Shaders** ([`shader`]) - programs and the shader stack
//! - **Resources** ([`resources`]) - named uniform/storage blocks and their manager
//! - **Stacks** ([`stacks`]) - transform and texture-unit stacks
//! - **Camera System** ([`camera`]) - cameras and the camera block publisher
//! - **Lights** ([`lights`]) - light packing into the scene lights block
//! - **Scene Management** ([`scene`]) - nodes, components and traversal
//!
//! Everything that mirrors GPU context state lives in one [`RenderContext`].
//!
//! ## Usage
//!
//! ```no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use tartan::backend::{GpuContext, HeadlessApi};
//! use tartan::config::EngineConfig;
//! use tartan::gfx::camera::{Camera3D, SharedCamera};
//! use tartan::gfx::scene::Scene;
//! use tartan::gfx::RenderContext;
//!
//! let gpu = GpuContext::new(HeadlessApi::new());
//! let mut ctx = RenderContext::new(&gpu, EngineConfig::default()).unwrap();
//!
//! let mut scene = Scene::new();
//! let camera: SharedCamera = Rc::new(RefCell::new(Camera3D::new(
//!     8.0, 0.4, 0.2, cgmath::Vector3::new(0.0, 0.0, 0.0), 16.0 / 9.0,
//! )));
//! scene.set_camera(&mut ctx, camera);
//! scene.render_frame(&mut ctx);
//! ```

pub mod camera;
pub mod context;
pub mod lights;
pub mod resources;
pub mod scene;
pub mod shader;
pub mod stacks;
pub mod uniform;

#[cfg(test)]
mod test_scenarios;

// Re-export commonly used types
pub use camera::OrbitCamera;
pub use context::RenderContext;
