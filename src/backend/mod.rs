// src/backend/mod.rs
//! # Graphics Backend
//!
//! The GPU API seam of the engine. Everything above this module talks to the
//! GPU through [`GraphicsApi`], an OpenGL-shaped trait: programs with uniform
//! locations, uniform and shader-storage blocks bound to numbered binding
//! points, buffers, a handful of fixed-function capabilities and depth state.
//!
//! Two implementations ship with the crate:
//!
//! - [`GlowApi`] - a thin layer over a [`glow::Context`]
//! - [`HeadlessApi`] - a software model of the GL state machine used by the
//!   test-suite and by tools that run the pipeline without a window
//!
//! [`GpuContext`] wraps a backend and caches the bound program, so the shader
//! layer can decide between immediate and deferred uniform writes without a
//! driver round-trip.

mod glow_api;
pub mod glsl;
mod headless;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::gfx::uniform::{UniformKind, UniformValue};

pub use glow_api::GlowApi;
pub use headless::{GlEvent, HeadlessApi};

/// Backend program object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Backend shader (single stage) object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Backend buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Backend texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Backend vertex array object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub u32);

/// Location of a uniform inside one linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Compute => "compute",
        };
        f.write_str(name)
    }
}

/// Block namespace a buffer is bound into
///
/// Uniform blocks (std140) and shader storage blocks (std430) have separate
/// binding-point tables, so binding 0 of one never aliases binding 0 of the
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Uniform,
    ShaderStorage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    StaticDraw,
    #[default]
    DynamicDraw,
    StreamDraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
    Blend,
    /// `GL_CLIP_DISTANCE0 + i`
    ClipDistance(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthFunc {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    Points,
    Lines,
    Triangles,
    TriangleStrip,
}

/// One active uniform reported by a linked program
///
/// Array uniforms are reported under their base name (`planes`, not
/// `planes[0]`) with `size` holding the element count.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUniform {
    pub name: String,
    /// `None` for types the engine does not dispatch (e.g. `bool`, `uvec3`)
    pub kind: Option<UniformKind>,
    pub size: i32,
}

/// OpenGL-shaped GPU API
///
/// Methods take `&self`: the context is an implicit, single-threaded state
/// machine, exactly like the driver underneath. Object creation reports the
/// backend's message on failure; compile and link failures return the info log.
pub trait GraphicsApi {
    /// Creates and compiles one shader stage
    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String>;
    fn delete_shader(&self, shader: ShaderHandle);

    fn create_program(&self) -> Result<ProgramHandle, String>;
    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle);
    fn link_program(&self, program: ProgramHandle) -> Result<(), String>;
    fn delete_program(&self, program: ProgramHandle);
    fn use_program(&self, program: Option<ProgramHandle>);

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;
    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveUniform>;
    /// Writes `value` to `location` of the currently bound program
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue);

    fn block_index(&self, program: ProgramHandle, storage: StorageClass, name: &str)
        -> Option<u32>;
    fn block_binding(
        &self,
        program: ProgramHandle,
        storage: StorageClass,
        block_index: u32,
        binding_point: u32,
    );

    fn create_buffer(&self) -> Result<BufferHandle, String>;
    fn bind_buffer_base(&self, storage: StorageClass, binding_point: u32, buffer: BufferHandle);
    /// Re-specifies the storage of `buffer`, optionally with initial contents
    fn buffer_data(
        &self,
        storage: StorageClass,
        buffer: BufferHandle,
        size: usize,
        data: Option<&[u8]>,
        usage: BufferUsage,
    );
    fn buffer_sub_data(
        &self,
        storage: StorageClass,
        buffer: BufferHandle,
        offset: usize,
        data: &[u8],
    );
    fn delete_buffer(&self, buffer: BufferHandle);

    fn create_texture(&self) -> Result<TextureHandle, String>;
    fn delete_texture(&self, texture: TextureHandle);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>);

    fn create_vertex_array(&self) -> Result<VertexArrayHandle, String>;
    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle);
    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>);
    fn draw_arrays(&self, mode: PrimitiveMode, first: i32, count: i32);

    fn enable(&self, capability: Capability);
    fn disable(&self, capability: Capability);
    fn is_enabled(&self, capability: Capability) -> bool;

    fn depth_mask(&self, write: bool);
    fn depth_write_mask(&self) -> bool;
    fn depth_func(&self, func: DepthFunc);
    fn current_depth_func(&self) -> DepthFunc;
}

/// Shared handle to the GPU context
pub type Gpu = Rc<GpuContext>;

/// A graphics backend plus the little state the engine mirrors on the CPU
pub struct GpuContext {
    api: Box<dyn GraphicsApi>,
    bound_program: Cell<Option<ProgramHandle>>,
    /// Deletions seen per program name; GL recycles names
    generations: RefCell<HashMap<ProgramHandle, u64>>,
}

impl GpuContext {
    pub fn new(api: impl GraphicsApi + 'static) -> Gpu {
        Rc::new(Self {
            api: Box::new(api),
            bound_program: Cell::new(None),
            generations: RefCell::new(HashMap::new()),
        })
    }

    /// The underlying backend
    pub fn api(&self) -> &dyn GraphicsApi {
        self.api.as_ref()
    }

    /// Makes `program` current, skipping the driver call when it already is
    pub fn bind_program(&self, program: Option<ProgramHandle>) {
        if self.bound_program.get() != program {
            self.api.use_program(program);
            self.bound_program.set(program);
        }
    }

    /// Program targeted by immediate uniform writes
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.bound_program.get()
    }

    /// Drops the cached binding of `program`
    pub(crate) fn forget_program(&self, program: ProgramHandle) {
        if self.bound_program.get() == Some(program) {
            self.bound_program.set(None);
        }
    }

    /// Generation of a program name; bumped each time a program with that name is deleted
    pub fn program_generation(&self, program: ProgramHandle) -> u64 {
        self.generations
            .borrow()
            .get(&program)
            .copied()
            .unwrap_or(0)
    }

    /// Marks a program as deleted, invalidating locations memoized against its name
    pub(crate) fn retire_program(&self, program: ProgramHandle) {
        self.forget_program(program);
        *self.generations.borrow_mut().entry(program).or_insert(0) += 1;
    }
}

impl fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext")
            .field("bound_program", &self.bound_program.get())
            .finish_non_exhaustive()
    }
}
