// src/gfx/scene/components/mesh.rs
use std::rc::Rc;

use crate::backend::{GpuContext, PrimitiveMode, VertexArrayHandle};
use crate::gfx::context::RenderContext;
use crate::gfx::scene::component::{priority, Component};

/// Uniform receiving the accumulated model matrix
pub const MODEL_UNIFORM: &str = "u_model";

/// Geometry that can issue its own draw call
pub trait Drawable {
    fn draw(&self, gpu: &GpuContext);
}

/// A vertex array drawn with `draw_arrays`
#[derive(Debug, Clone, Copy)]
pub struct ArrayMesh {
    pub vertex_array: VertexArrayHandle,
    pub mode: PrimitiveMode,
    pub first: i32,
    pub count: i32,
}

impl ArrayMesh {
    pub fn triangles(vertex_array: VertexArrayHandle, count: i32) -> Self {
        Self {
            vertex_array,
            mode: PrimitiveMode::Triangles,
            first: 0,
            count,
        }
    }
}

impl Drawable for ArrayMesh {
    fn draw(&self, gpu: &GpuContext) {
        let api = gpu.api();
        api.bind_vertex_array(Some(self.vertex_array));
        api.draw_arrays(self.mode, self.first, self.count);
        api.bind_vertex_array(None);
    }
}

/// Draws geometry with the program on top of the shader stack
pub struct MeshComponent {
    drawable: Rc<dyn Drawable>,
}

impl MeshComponent {
    pub fn new(drawable: Rc<dyn Drawable>) -> Self {
        Self { drawable }
    }
}

impl Component for MeshComponent {
    fn name(&self) -> &str {
        "mesh"
    }

    fn priority(&self) -> i32 {
        priority::MESH
    }

    fn apply(&self, ctx: &mut RenderContext) {
        let was_current = ctx.shaders.peek().is_current();
        let program = Rc::clone(ctx.shaders.top());
        if was_current {
            program.apply_uniforms();
        }
        if program.declared_kind(MODEL_UNIFORM).is_some() {
            program.set_uniform(MODEL_UNIFORM, ctx.transforms.top());
        }
        self.drawable.draw(&ctx.gpu);
    }
}

impl std::fmt::Debug for MeshComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshComponent").finish_non_exhaustive()
    }
}
