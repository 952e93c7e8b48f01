// src/backend/glow_api.rs
//! OpenGL backend on top of `glow`
//!
//! The context itself is created by the host application (window and context
//! bootstrap are not the engine's business); [`GlowApi`] only translates
//! engine calls into GL calls. Requires a GL 4.3+ context for shader storage
//! blocks.

use std::num::NonZeroU32;

use glow::HasContext;
use log::error;

use super::{
    ActiveUniform, BufferHandle, BufferUsage, Capability, DepthFunc, GraphicsApi, PrimitiveMode,
    ProgramHandle, ShaderHandle, ShaderStage, StorageClass, TextureHandle, TextureTarget,
    UniformLocation, VertexArrayHandle,
};
use crate::gfx::uniform::{UniformKind, UniformValue};

/// [`GraphicsApi`] implementation driving a live OpenGL context
pub struct GlowApi {
    gl: glow::Context,
}

impl GlowApi {
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// The wrapped context, for draw code outside the engine core
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn program(handle: ProgramHandle) -> Option<glow::NativeProgram> {
    NonZeroU32::new(handle.0).map(glow::NativeProgram)
}

fn shader(handle: ShaderHandle) -> Option<glow::NativeShader> {
    NonZeroU32::new(handle.0).map(glow::NativeShader)
}

fn buffer(handle: BufferHandle) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(handle.0).map(glow::NativeBuffer)
}

fn texture(handle: TextureHandle) -> Option<glow::NativeTexture> {
    NonZeroU32::new(handle.0).map(glow::NativeTexture)
}

fn vertex_array(handle: VertexArrayHandle) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(handle.0).map(glow::NativeVertexArray)
}

fn stage_enum(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        ShaderStage::Compute => glow::COMPUTE_SHADER,
    }
}

fn buffer_target(storage: StorageClass) -> u32 {
    match storage {
        StorageClass::Uniform => glow::UNIFORM_BUFFER,
        StorageClass::ShaderStorage => glow::SHADER_STORAGE_BUFFER,
    }
}

fn usage_enum(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::StaticDraw => glow::STATIC_DRAW,
        BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferUsage::StreamDraw => glow::STREAM_DRAW,
    }
}

fn capability_enum(capability: Capability) -> u32 {
    match capability {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
        Capability::Blend => glow::BLEND,
        Capability::ClipDistance(i) => glow::CLIP_DISTANCE0 + i,
    }
}

fn depth_func_enum(func: DepthFunc) -> u32 {
    match func {
        DepthFunc::Never => glow::NEVER,
        DepthFunc::Less => glow::LESS,
        DepthFunc::Equal => glow::EQUAL,
        DepthFunc::LessEqual => glow::LEQUAL,
        DepthFunc::Greater => glow::GREATER,
        DepthFunc::NotEqual => glow::NOTEQUAL,
        DepthFunc::GreaterEqual => glow::GEQUAL,
        DepthFunc::Always => glow::ALWAYS,
    }
}

fn depth_func_from_enum(value: u32) -> DepthFunc {
    match value {
        glow::NEVER => DepthFunc::Never,
        glow::EQUAL => DepthFunc::Equal,
        glow::LEQUAL => DepthFunc::LessEqual,
        glow::GREATER => DepthFunc::Greater,
        glow::NOTEQUAL => DepthFunc::NotEqual,
        glow::GEQUAL => DepthFunc::GreaterEqual,
        glow::ALWAYS => DepthFunc::Always,
        _ => DepthFunc::Less,
    }
}

fn texture_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2D => glow::TEXTURE_2D,
        TextureTarget::CubeMap => glow::TEXTURE_CUBE_MAP,
    }
}

fn primitive_enum(mode: PrimitiveMode) -> u32 {
    match mode {
        PrimitiveMode::Points => glow::POINTS,
        PrimitiveMode::Lines => glow::LINES,
        PrimitiveMode::Triangles => glow::TRIANGLES,
        PrimitiveMode::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

fn uniform_kind(utype: u32) -> Option<UniformKind> {
    match utype {
        glow::INT => Some(UniformKind::Int),
        glow::FLOAT => Some(UniformKind::Float),
        glow::FLOAT_VEC2 => Some(UniformKind::Vec2),
        glow::FLOAT_VEC3 => Some(UniformKind::Vec3),
        glow::FLOAT_VEC4 => Some(UniformKind::Vec4),
        glow::FLOAT_MAT3 => Some(UniformKind::Mat3),
        glow::FLOAT_MAT4 => Some(UniformKind::Mat4),
        glow::SAMPLER_2D
        | glow::SAMPLER_3D
        | glow::SAMPLER_CUBE
        | glow::SAMPLER_2D_ARRAY
        | glow::SAMPLER_2D_SHADOW
        | glow::INT_SAMPLER_2D
        | glow::UNSIGNED_INT_SAMPLER_2D => Some(UniformKind::Sampler),
        _ => None,
    }
}

impl GraphicsApi for GlowApi {
    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        unsafe {
            let shader = self.gl.create_shader(stage_enum(stage))?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(log);
            }
            Ok(ShaderHandle(shader.0.get()))
        }
    }

    fn delete_shader(&self, handle: ShaderHandle) {
        if let Some(shader) = shader(handle) {
            unsafe { self.gl.delete_shader(shader) }
        }
    }

    fn create_program(&self) -> Result<ProgramHandle, String> {
        unsafe {
            let program = self.gl.create_program()?;
            Ok(ProgramHandle(program.0.get()))
        }
    }

    fn attach_shader(&self, handle: ProgramHandle, shader_handle: ShaderHandle) {
        if let (Some(p), Some(s)) = (program(handle), shader(shader_handle)) {
            unsafe { self.gl.attach_shader(p, s) }
        }
    }

    fn link_program(&self, handle: ProgramHandle) -> Result<(), String> {
        let p = program(handle).ok_or_else(|| "null program".to_string())?;
        unsafe {
            self.gl.link_program(p);
            if !self.gl.get_program_link_status(p) {
                return Err(self.gl.get_program_info_log(p));
            }
        }
        Ok(())
    }

    fn delete_program(&self, handle: ProgramHandle) {
        if let Some(p) = program(handle) {
            unsafe { self.gl.delete_program(p) }
        }
    }

    fn use_program(&self, handle: Option<ProgramHandle>) {
        unsafe { self.gl.use_program(handle.and_then(program)) }
    }

    fn uniform_location(&self, handle: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let p = program(handle)?;
        unsafe { self.gl.get_uniform_location(p, name) }.map(|l| UniformLocation(l.0))
    }

    fn active_uniforms(&self, handle: ProgramHandle) -> Vec<ActiveUniform> {
        let Some(p) = program(handle) else {
            return Vec::new();
        };
        unsafe {
            let count = self.gl.get_active_uniforms(p);
            (0..count)
                .filter_map(|index| self.gl.get_active_uniform(p, index))
                // Block members report no location
                .filter(|u| self.gl.get_uniform_location(p, &u.name).is_some())
                .map(|u| ActiveUniform {
                    name: u
                        .name
                        .strip_suffix("[0]")
                        .unwrap_or(&u.name)
                        .to_string(),
                    kind: uniform_kind(u.utype),
                    size: u.size,
                })
                .collect()
        }
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let location = glow::NativeUniformLocation(location.0);
        let loc = Some(&location);
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(loc, *v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(loc, *v),
                UniformValue::Vec2(v) => self.gl.uniform_2_f32(loc, v.x, v.y),
                UniformValue::Vec3(v) => self.gl.uniform_3_f32(loc, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.gl.uniform_4_f32(loc, v.x, v.y, v.z, v.w),
                UniformValue::Mat3(m) => {
                    let columns: &[f32; 9] = m.as_ref();
                    self.gl.uniform_matrix_3_f32_slice(loc, false, columns)
                }
                UniformValue::Mat4(m) => {
                    let columns: &[f32; 16] = m.as_ref();
                    self.gl.uniform_matrix_4_f32_slice(loc, false, columns)
                }
                UniformValue::Sampler(unit) => self.gl.uniform_1_i32(loc, unit.0 as i32),
                UniformValue::Vec4Array(values) => {
                    let flat: Vec<f32> = values.iter().flat_map(|v| [v.x, v.y, v.z, v.w]).collect();
                    self.gl.uniform_4_f32_slice(loc, &flat)
                }
            }
        }
    }

    fn block_index(
        &self,
        handle: ProgramHandle,
        storage: StorageClass,
        name: &str,
    ) -> Option<u32> {
        let p = program(handle)?;
        unsafe {
            match storage {
                StorageClass::Uniform => self.gl.get_uniform_block_index(p, name),
                StorageClass::ShaderStorage => self.gl.get_shader_storage_block_index(p, name),
            }
        }
    }

    fn block_binding(
        &self,
        handle: ProgramHandle,
        storage: StorageClass,
        block_index: u32,
        binding_point: u32,
    ) {
        let Some(p) = program(handle) else {
            return;
        };
        unsafe {
            match storage {
                StorageClass::Uniform => {
                    self.gl.uniform_block_binding(p, block_index, binding_point)
                }
                StorageClass::ShaderStorage => {
                    self.gl
                        .shader_storage_block_binding(p, block_index, binding_point)
                }
            }
        }
    }

    fn create_buffer(&self) -> Result<BufferHandle, String> {
        unsafe { self.gl.create_buffer() }.map(|b| BufferHandle(b.0.get()))
    }

    fn bind_buffer_base(&self, storage: StorageClass, binding_point: u32, handle: BufferHandle) {
        unsafe {
            self.gl
                .bind_buffer_base(buffer_target(storage), binding_point, buffer(handle))
        }
    }

    fn buffer_data(
        &self,
        storage: StorageClass,
        handle: BufferHandle,
        size: usize,
        data: Option<&[u8]>,
        usage: BufferUsage,
    ) {
        let target = buffer_target(storage);
        unsafe {
            self.gl.bind_buffer(target, buffer(handle));
            match data {
                Some(bytes) => self.gl.buffer_data_u8_slice(target, bytes, usage_enum(usage)),
                None => {
                    if let Some(size) = gl_size(size, "buffer size") {
                        self.gl.buffer_data_size(target, size, usage_enum(usage));
                    }
                }
            }
        }
    }

    fn buffer_sub_data(
        &self,
        storage: StorageClass,
        handle: BufferHandle,
        offset: usize,
        data: &[u8],
    ) {
        let target = buffer_target(storage);
        let Some(offset) = gl_size(offset, "buffer offset") else {
            return;
        };
        unsafe {
            self.gl.bind_buffer(target, buffer(handle));
            self.gl.buffer_sub_data_u8_slice(target, offset, data);
        }
    }

    fn delete_buffer(&self, handle: BufferHandle) {
        if let Some(b) = buffer(handle) {
            unsafe { self.gl.delete_buffer(b) }
        }
    }

    fn create_texture(&self) -> Result<TextureHandle, String> {
        unsafe { self.gl.create_texture() }.map(|t| TextureHandle(t.0.get()))
    }

    fn delete_texture(&self, handle: TextureHandle) {
        if let Some(t) = texture(handle) {
            unsafe { self.gl.delete_texture(t) }
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, target: TextureTarget, handle: Option<TextureHandle>) {
        unsafe {
            self.gl
                .bind_texture(texture_target(target), handle.and_then(texture))
        }
    }

    fn create_vertex_array(&self) -> Result<VertexArrayHandle, String> {
        unsafe { self.gl.create_vertex_array() }.map(|v| VertexArrayHandle(v.0.get()))
    }

    fn delete_vertex_array(&self, handle: VertexArrayHandle) {
        if let Some(v) = vertex_array(handle) {
            unsafe { self.gl.delete_vertex_array(v) }
        }
    }

    fn bind_vertex_array(&self, handle: Option<VertexArrayHandle>) {
        unsafe { self.gl.bind_vertex_array(handle.and_then(vertex_array)) }
    }

    fn draw_arrays(&self, mode: PrimitiveMode, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(primitive_enum(mode), first, count) }
    }

    fn enable(&self, capability: Capability) {
        unsafe { self.gl.enable(capability_enum(capability)) }
    }

    fn disable(&self, capability: Capability) {
        unsafe { self.gl.disable(capability_enum(capability)) }
    }

    fn is_enabled(&self, capability: Capability) -> bool {
        unsafe { self.gl.is_enabled(capability_enum(capability)) }
    }

    fn depth_mask(&self, write: bool) {
        unsafe { self.gl.depth_mask(write) }
    }

    fn depth_write_mask(&self) -> bool {
        unsafe { self.gl.get_parameter_i32(glow::DEPTH_WRITEMASK) != 0 }
    }

    fn depth_func(&self, func: DepthFunc) {
        unsafe { self.gl.depth_func(depth_func_enum(func)) }
    }

    fn current_depth_func(&self) -> DepthFunc {
        depth_func_from_enum(unsafe { self.gl.get_parameter_i32(glow::DEPTH_FUNC) } as u32)
    }
}

/// Converts a byte count to the `GLsizei`/`GLintptr` range glow takes
fn gl_size(value: usize, what: &str) -> Option<i32> {
    match i32::try_from(value) {
        Ok(value) => Some(value),
        Err(_) => {
            error!("{} {} exceeds the GL range, call skipped", what, value);
            None
        }
    }
}
