// src/gfx/scene/components/skybox.rs
use std::rc::Rc;

use cgmath::{Matrix3, Matrix4};
use log::warn;

use crate::backend::{DepthFunc, TextureHandle, TextureTarget};
use crate::gfx::context::RenderContext;
use crate::gfx::scene::component::{priority, Component};
use crate::gfx::shader::ShaderProgram;

use super::mesh::Drawable;

pub const VIEW_PROJECTION_UNIFORM: &str = "u_viewProjection";
pub const SKYBOX_UNIFORM: &str = "u_skybox";

/// Draws a cube-mapped background around the camera
///
/// Runs entirely inside `apply`: it renders with its own program and restores
/// the depth state it changed before returning.
pub struct SkyboxComponent {
    program: Rc<ShaderProgram>,
    cubemap: TextureHandle,
    cube: Rc<dyn Drawable>,
}

impl SkyboxComponent {
    pub fn new(program: Rc<ShaderProgram>, cubemap: TextureHandle, cube: Rc<dyn Drawable>) -> Self {
        Self {
            program,
            cubemap,
            cube,
        }
    }

    /// `projection * view` with the translation of `view` removed
    pub fn view_projection(view: Matrix4<f32>, projection: Matrix4<f32>) -> Matrix4<f32> {
        let rotation = Matrix3::from_cols(view.x.truncate(), view.y.truncate(), view.z.truncate());
        projection * Matrix4::from(rotation)
    }
}

impl Component for SkyboxComponent {
    fn name(&self) -> &str {
        "skybox"
    }

    fn priority(&self) -> i32 {
        priority::SKYBOX
    }

    fn apply(&self, ctx: &mut RenderContext) {
        let api = ctx.gpu.api();
        let depth_write = api.depth_write_mask();
        let depth_func = api.current_depth_func();
        api.depth_mask(false);
        api.depth_func(DepthFunc::LessEqual);

        let view_projection = Self::view_projection(ctx.camera.view(), ctx.camera.projection());

        ctx.shaders.push(Rc::clone(&self.program));
        let program = Rc::clone(ctx.shaders.top());
        program.set_uniform(VIEW_PROJECTION_UNIFORM, view_projection);

        match ctx.textures.push(TextureTarget::CubeMap, self.cubemap) {
            Ok(unit) => {
                program.set_uniform(SKYBOX_UNIFORM, unit);
                self.cube.draw(&ctx.gpu);
                ctx.textures.pop();
            }
            Err(err) => warn!("skybox not drawn: {}", err),
        }

        ctx.shaders.pop();
        let api = ctx.gpu.api();
        api.depth_mask(depth_write);
        api.depth_func(depth_func);
    }
}

impl std::fmt::Debug for SkyboxComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkyboxComponent")
            .field("program", &self.program.label())
            .field("cubemap", &self.cubemap)
            .finish_non_exhaustive()
    }
}
