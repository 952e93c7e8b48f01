// src/gfx/shader/builtin.rs
//! Built-in programs
//!
//! The base program sits at the bottom of every shader stack; it shades with
//! a flat colour and reads the engine camera block. The skybox program samples
//! a cube map with the translation-free view-projection.

use std::rc::Rc;

use crate::backend::Gpu;
use crate::error::Result;

use super::ShaderProgram;

pub const BASE_VERTEX: &str = r#"#version 430
layout(location = 0) in vec3 a_position;

layout(std140, binding = 0) uniform CameraMatrices {
    mat4 view;
    mat4 projection;
};

uniform mat4 u_model;

void main() {
    gl_Position = projection * view * u_model * vec4(a_position, 1.0);
}
"#;

pub const BASE_FRAGMENT: &str = r#"#version 430
uniform vec4 u_color;

out vec4 frag_color;

void main() {
    frag_color = u_color;
}
"#;

pub const SKYBOX_VERTEX: &str = r#"#version 430
layout(location = 0) in vec3 a_position;

uniform mat4 u_viewProjection;

out vec3 v_direction;

void main() {
    v_direction = a_position;
    vec4 clip = u_viewProjection * vec4(a_position, 1.0);
    gl_Position = clip.xyww;
}
"#;

pub const SKYBOX_FRAGMENT: &str = r#"#version 430
in vec3 v_direction;

uniform samplerCube u_skybox;

out vec4 frag_color;

void main() {
    frag_color = texture(u_skybox, v_direction);
}
"#;

/// Links the base program
///
/// `u_model` is written per draw and `u_color` falls back to its default, so
/// neither is reported as unconfigured.
pub fn base_program(gpu: &Gpu) -> Result<Rc<ShaderProgram>> {
    let program = ShaderProgram::from_sources(gpu, "base", BASE_VERTEX, BASE_FRAGMENT)?;
    program.silence("u_model");
    program.silence("u_color");
    Ok(program)
}

/// Links the skybox program; its uniforms are written by the skybox component
pub fn skybox_program(gpu: &Gpu) -> Result<Rc<ShaderProgram>> {
    let program = ShaderProgram::from_sources(gpu, "skybox", SKYBOX_VERTEX, SKYBOX_FRAGMENT)?;
    program.silence("u_viewProjection");
    program.silence("u_skybox");
    Ok(program)
}
