// src/gfx/scene/components/mod.rs
//! Built-in scene components
//!
//! | Component | Priority | Enter | Leave |
//! |---|---|---|---|
//! | [`TransformComponent`] | 100 | push model matrix | pop |
//! | [`SkyboxComponent`] | 200 | draw background, restore depth state | - |
//! | [`ShaderComponent`] | 300 | push program | pop |
//! | [`ClipPlaneComponent`] | 310 | upload planes, enable clip distances | disable them |
//! | [`TextureComponent`] | 350 | bind texture, set sampler | unbind |
//! | [`VariableComponent`] | 400 | write node uniforms | - |
//! | [`LightComponent`] | 450 | - | - |
//! | [`MeshComponent`] | 500 | draw | - |

mod clip_plane;
mod light;
mod mesh;
mod shader;
mod skybox;
mod texture;
mod transform;
mod variable;

pub use clip_plane::{ClipPlaneComponent, CLIP_PLANES_UNIFORM};
pub use light::LightComponent;
pub use mesh::{ArrayMesh, Drawable, MeshComponent, MODEL_UNIFORM};
pub use shader::ShaderComponent;
pub use skybox::{SkyboxComponent, SKYBOX_UNIFORM, VIEW_PROJECTION_UNIFORM};
pub use texture::TextureComponent;
pub use transform::TransformComponent;
pub use variable::VariableComponent;
