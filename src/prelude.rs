// src/prelude.rs
//! # Tartan Prelude
//!
//! Commonly used types and traits, to reduce boilerplate imports:
//!
//! ```rust
//! use tartan::prelude::*;
//! ```

// Backend and context
pub use crate::backend::{GlowApi, Gpu, GpuContext, GraphicsApi, HeadlessApi, ShaderStage};
pub use crate::config::{EngineConfig, MAX_SCENE_LIGHTS};
pub use crate::error::{GfxError, Result};
pub use crate::gfx::RenderContext;

// Shaders, uniforms and resources
pub use crate::gfx::resources::{
    ArraySsbo, DirtyRegion, ResourceManager, StorageClass, StructResource, UpdateMode,
};
pub use crate::gfx::shader::{ShaderProgram, ShaderSource};
pub use crate::gfx::uniform::{TextureUnit, UniformValue};

// Cameras and lights
pub use crate::gfx::camera::{Camera, Camera2D, Camera3D, SharedCamera};
pub use crate::gfx::lights::{Attenuation, Light, LightColors};

// Scene graph
pub use crate::gfx::scene::components::{
    ArrayMesh, ClipPlaneComponent, Drawable, LightComponent, MeshComponent, ShaderComponent,
    SkyboxComponent, TextureComponent, TransformComponent, VariableComponent,
};
pub use crate::gfx::scene::{Component, Node, NodeRef, Scene};
