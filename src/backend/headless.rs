// src/backend/headless.rs
//! Headless reference backend
//!
//! A software model of the parts of the GL state machine the engine drives.
//! Programs report the uniforms and blocks their sources declare (see
//! [`glsl`](super::glsl)), buffers keep their bytes, and every state change is
//! appended to an event log that tests and tools can inspect.
//!
//! Misuse that a real driver would flag with `glGetError` (a uniform write with
//! no program bound, a write of the wrong type, an out-of-range sub-data
//! upload) is counted in [`HeadlessApi::error_count`] instead of panicking.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::glsl::{self, DeclaredBlock};
use super::{
    ActiveUniform, BufferHandle, BufferUsage, Capability, DepthFunc, GraphicsApi, PrimitiveMode,
    ProgramHandle, ShaderHandle, ShaderStage, StorageClass, TextureHandle, TextureTarget,
    UniformLocation, VertexArrayHandle,
};
use crate::gfx::uniform::{UniformKind, UniformValue};

/// One observable state change
#[derive(Debug, Clone, PartialEq)]
pub enum GlEvent {
    UseProgram(Option<ProgramHandle>),
    Uniform {
        program: ProgramHandle,
        name: String,
        value: UniformValue,
    },
    BlockBinding {
        program: ProgramHandle,
        storage: StorageClass,
        block: String,
        binding_point: u32,
    },
    BufferData {
        buffer: BufferHandle,
        size: usize,
    },
    BufferSubData {
        buffer: BufferHandle,
        offset: usize,
        len: usize,
    },
    BindTexture {
        unit: u32,
        target: TextureTarget,
        texture: Option<TextureHandle>,
    },
    Enable(Capability),
    Disable(Capability),
    Draw {
        program: Option<ProgramHandle>,
        mode: PrimitiveMode,
        count: i32,
    },
}

struct ShaderObject {
    stage: ShaderStage,
    source: String,
}

struct LinkedUniform {
    name: String,
    type_name: String,
    size: i32,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<u32>,
    linked: bool,
    uniforms: Vec<LinkedUniform>,
    blocks: Vec<DeclaredBlock>,
    values: HashMap<u32, UniformValue>,
    block_bindings: HashMap<(StorageClass, u32), u32>,
}

struct State {
    next_id: u32,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    buffers: HashMap<u32, Vec<u8>>,
    textures: HashSet<u32>,
    vertex_arrays: HashSet<u32>,
    current_program: Option<u32>,
    bound_bases: HashMap<(StorageClass, u32), u32>,
    enabled: HashSet<Capability>,
    depth_mask: bool,
    depth_func: DepthFunc,
    active_unit: u32,
    texture_units: HashMap<(u32, TextureTarget), u32>,
    vertex_array: Option<u32>,
    events: Vec<GlEvent>,
    errors: u32,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashSet::new(),
            vertex_arrays: HashSet::new(),
            current_program: None,
            bound_bases: HashMap::new(),
            enabled: HashSet::new(),
            depth_mask: true,
            depth_func: DepthFunc::Less,
            active_unit: 0,
            texture_units: HashMap::new(),
            vertex_array: None,
            events: Vec::new(),
            errors: 0,
        }
    }
}

impl State {
    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn linked_program(&self, program: ProgramHandle) -> Option<&ProgramObject> {
        self.programs.get(&program.0).filter(|p| p.linked)
    }
}

/// Software GL state machine; clones share the same state
#[derive(Clone, Default)]
pub struct HeadlessApi {
    state: Rc<RefCell<State>>,
}

impl HeadlessApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the event log
    pub fn events(&self) -> Vec<GlEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Number of calls a real driver would have rejected
    pub fn error_count(&self) -> u32 {
        self.state.borrow().errors
    }

    /// Last value written to the uniform `name` of `program`
    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        let state = self.state.borrow();
        let object = state.linked_program(program)?;
        let location = find_uniform(object, name)?;
        object.values.get(&location).cloned()
    }

    /// Current contents of a buffer
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer.0).cloned()
    }

    pub fn is_buffer(&self, buffer: BufferHandle) -> bool {
        self.state.borrow().buffers.contains_key(&buffer.0)
    }

    /// Buffer bound to `binding_point` of a block namespace
    pub fn bound_buffer(&self, storage: StorageClass, binding_point: u32) -> Option<BufferHandle> {
        self.state
            .borrow()
            .bound_bases
            .get(&(storage, binding_point))
            .copied()
            .map(BufferHandle)
    }

    /// Binding point assigned to the block `name` of `program`
    pub fn block_binding_of(
        &self,
        program: ProgramHandle,
        storage: StorageClass,
        name: &str,
    ) -> Option<u32> {
        let state = self.state.borrow();
        let object = state.linked_program(program)?;
        let index = block_position(object, storage, name)?;
        object.block_bindings.get(&(storage, index)).copied()
    }

    pub fn texture_bound(&self, unit: u32, target: TextureTarget) -> Option<TextureHandle> {
        self.state
            .borrow()
            .texture_units
            .get(&(unit, target))
            .copied()
            .map(TextureHandle)
    }

    /// Clip distances currently enabled, ascending
    pub fn enabled_clip_distances(&self) -> Vec<u32> {
        let mut distances: Vec<u32> = self
            .state
            .borrow()
            .enabled
            .iter()
            .filter_map(|cap| match cap {
                Capability::ClipDistance(i) => Some(*i),
                _ => None,
            })
            .collect();
        distances.sort_unstable();
        distances
    }

    pub fn draw_count(&self) -> usize {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|e| matches!(e, GlEvent::Draw { .. }))
            .count()
    }
}

fn find_uniform(object: &ProgramObject, name: &str) -> Option<u32> {
    let base = name.strip_suffix("[0]").unwrap_or(name);
    object
        .uniforms
        .iter()
        .position(|u| u.name == base)
        .map(|i| i as u32)
}

fn block_position(object: &ProgramObject, storage: StorageClass, name: &str) -> Option<u32> {
    object
        .blocks
        .iter()
        .filter(|b| b.storage == storage)
        .position(|b| b.name == name)
        .map(|i| i as u32)
}

fn kinds_compatible(declared: Option<UniformKind>, written: UniformKind) -> bool {
    declared.is_some_and(|declared| declared.accepts(written))
}

fn compile_log(source: &str) -> Option<String> {
    for (line_no, line) in source.lines().enumerate() {
        if let Some(message) = line.trim_start().strip_prefix("#error") {
            return Some(format!("0:{}: '#error' : {}", line_no + 1, message.trim()));
        }
    }
    if !source.contains("main") {
        return Some("0:1: error: missing entry point 'main'".to_string());
    }
    None
}

impl GraphicsApi for HeadlessApi {
    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        if let Some(log) = compile_log(source) {
            return Err(log);
        }
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.shaders.insert(
            id,
            ShaderObject {
                stage,
                source: source.to_string(),
            },
        );
        Ok(ShaderHandle(id))
    }

    fn delete_shader(&self, shader: ShaderHandle) {
        self.state.borrow_mut().shaders.remove(&shader.0);
    }

    fn create_program(&self) -> Result<ProgramHandle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.programs.insert(id, ProgramObject::default());
        Ok(ProgramHandle(id))
    }

    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        let mut state = self.state.borrow_mut();
        match state.programs.get_mut(&program.0) {
            Some(object) => object.attached.push(shader.0),
            None => state.errors += 1,
        }
    }

    fn link_program(&self, program: ProgramHandle) -> Result<(), String> {
        let mut state = self.state.borrow_mut();
        let attached = match state.programs.get(&program.0) {
            Some(object) => object.attached.clone(),
            None => return Err(format!("error: {} is not a program object", program.0)),
        };

        let mut stages = HashSet::new();
        let mut uniforms: Vec<LinkedUniform> = Vec::new();
        let mut blocks: Vec<DeclaredBlock> = Vec::new();
        for id in &attached {
            let Some(shader) = state.shaders.get(id) else {
                return Err(format!("error: attached shader {} was deleted", id));
            };
            stages.insert(shader.stage);
            let decls = glsl::scan(&shader.source);
            for uniform in decls.uniforms {
                if let Some(existing) = uniforms.iter().find(|u| u.name == uniform.name) {
                    if existing.type_name != uniform.type_name {
                        return Err(format!(
                            "error: uniform '{}' declared as '{}' and '{}'",
                            uniform.name, existing.type_name, uniform.type_name
                        ));
                    }
                    continue;
                }
                uniforms.push(LinkedUniform {
                    name: uniform.name,
                    type_name: uniform.type_name,
                    size: uniform.array_len.unwrap_or(1) as i32,
                });
            }
            for block in decls.blocks {
                if !blocks.contains(&block) {
                    blocks.push(block);
                }
            }
        }

        let compute_only = stages.len() == 1 && stages.contains(&ShaderStage::Compute);
        if !compute_only {
            for required in [ShaderStage::Vertex, ShaderStage::Fragment] {
                if !stages.contains(&required) {
                    return Err(format!("error: program has no {} stage", required));
                }
            }
        }

        let Some(object) = state.programs.get_mut(&program.0) else {
            return Err(format!("error: {} is not a program object", program.0));
        };
        object.linked = true;
        object.uniforms = uniforms;
        object.blocks = blocks;
        object.values.clear();
        object.block_bindings.clear();
        Ok(())
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program.0);
        if state.current_program == Some(program.0) {
            state.current_program = None;
        }
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        let mut state = self.state.borrow_mut();
        if let Some(p) = program {
            if state.linked_program(p).is_none() {
                state.errors += 1;
                return;
            }
        }
        state.current_program = program.map(|p| p.0);
        state.events.push(GlEvent::UseProgram(program));
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let state = self.state.borrow();
        let object = state.linked_program(program)?;
        find_uniform(object, name).map(UniformLocation)
    }

    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveUniform> {
        let state = self.state.borrow();
        let Some(object) = state.linked_program(program) else {
            return Vec::new();
        };
        object
            .uniforms
            .iter()
            .map(|u| ActiveUniform {
                name: u.name.clone(),
                kind: glsl::uniform_kind(&u.type_name),
                size: u.size,
            })
            .collect()
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let Some(current) = state.current_program else {
            state.errors += 1;
            return;
        };
        let Some(object) = state.programs.get_mut(&current) else {
            state.errors += 1;
            return;
        };
        let Some(declared) = object.uniforms.get(location.0 as usize) else {
            state.errors += 1;
            return;
        };
        if !kinds_compatible(glsl::uniform_kind(&declared.type_name), value.kind()) {
            state.errors += 1;
            return;
        }
        let name = declared.name.clone();
        object.values.insert(location.0, value.clone());
        state.events.push(GlEvent::Uniform {
            program: ProgramHandle(current),
            name,
            value: value.clone(),
        });
    }

    fn block_index(
        &self,
        program: ProgramHandle,
        storage: StorageClass,
        name: &str,
    ) -> Option<u32> {
        let state = self.state.borrow();
        block_position(state.linked_program(program)?, storage, name)
    }

    fn block_binding(
        &self,
        program: ProgramHandle,
        storage: StorageClass,
        block_index: u32,
        binding_point: u32,
    ) {
        let mut state = self.state.borrow_mut();
        let block = state
            .linked_program(program)
            .and_then(|object| {
                object
                    .blocks
                    .iter()
                    .filter(|b| b.storage == storage)
                    .nth(block_index as usize)
            })
            .map(|b| b.name.clone());
        let Some(block) = block else {
            state.errors += 1;
            return;
        };
        if let Some(object) = state.programs.get_mut(&program.0) {
            object
                .block_bindings
                .insert((storage, block_index), binding_point);
        }
        state.events.push(GlEvent::BlockBinding {
            program,
            storage,
            block,
            binding_point,
        });
    }

    fn create_buffer(&self) -> Result<BufferHandle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.buffers.insert(id, Vec::new());
        Ok(BufferHandle(id))
    }

    fn bind_buffer_base(&self, storage: StorageClass, binding_point: u32, buffer: BufferHandle) {
        let mut state = self.state.borrow_mut();
        if !state.buffers.contains_key(&buffer.0) {
            state.errors += 1;
            return;
        }
        state.bound_bases.insert((storage, binding_point), buffer.0);
    }

    fn buffer_data(
        &self,
        _storage: StorageClass,
        buffer: BufferHandle,
        size: usize,
        data: Option<&[u8]>,
        _usage: BufferUsage,
    ) {
        let mut state = self.state.borrow_mut();
        let contents = match data {
            Some(bytes) if bytes.len() == size => bytes.to_vec(),
            Some(_) => {
                state.errors += 1;
                return;
            }
            None => vec![0; size],
        };
        match state.buffers.get_mut(&buffer.0) {
            Some(storage) => *storage = contents,
            None => {
                state.errors += 1;
                return;
            }
        }
        state.events.push(GlEvent::BufferData { buffer, size });
    }

    fn buffer_sub_data(
        &self,
        _storage: StorageClass,
        buffer: BufferHandle,
        offset: usize,
        data: &[u8],
    ) {
        let mut state = self.state.borrow_mut();
        let in_range = match state.buffers.get_mut(&buffer.0) {
            Some(storage) if offset + data.len() <= storage.len() => {
                storage[offset..offset + data.len()].copy_from_slice(data);
                true
            }
            _ => false,
        };
        if !in_range {
            state.errors += 1;
            return;
        }
        state.events.push(GlEvent::BufferSubData {
            buffer,
            offset,
            len: data.len(),
        });
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&buffer.0);
        state.bound_bases.retain(|_, id| *id != buffer.0);
    }

    fn create_texture(&self) -> Result<TextureHandle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.textures.insert(id);
        Ok(TextureHandle(id))
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&texture.0);
        state.texture_units.retain(|_, id| *id != texture.0);
    }

    fn active_texture(&self, unit: u32) {
        self.state.borrow_mut().active_unit = unit;
    }

    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>) {
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;
        match texture {
            Some(t) if !state.textures.contains(&t.0) => {
                state.errors += 1;
                return;
            }
            Some(t) => {
                state.texture_units.insert((unit, target), t.0);
            }
            None => {
                state.texture_units.remove(&(unit, target));
            }
        }
        state.events.push(GlEvent::BindTexture {
            unit,
            target,
            texture,
        });
    }

    fn create_vertex_array(&self) -> Result<VertexArrayHandle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.vertex_arrays.insert(id);
        Ok(VertexArrayHandle(id))
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        let mut state = self.state.borrow_mut();
        state.vertex_arrays.remove(&vertex_array.0);
        if state.vertex_array == Some(vertex_array.0) {
            state.vertex_array = None;
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>) {
        let mut state = self.state.borrow_mut();
        match vertex_array {
            Some(v) if !state.vertex_arrays.contains(&v.0) => state.errors += 1,
            _ => state.vertex_array = vertex_array.map(|v| v.0),
        }
    }

    fn draw_arrays(&self, mode: PrimitiveMode, _first: i32, count: i32) {
        let mut state = self.state.borrow_mut();
        let program = state.current_program.map(ProgramHandle);
        state.events.push(GlEvent::Draw {
            program,
            mode,
            count,
        });
    }

    fn enable(&self, capability: Capability) {
        let mut state = self.state.borrow_mut();
        state.enabled.insert(capability);
        state.events.push(GlEvent::Enable(capability));
    }

    fn disable(&self, capability: Capability) {
        let mut state = self.state.borrow_mut();
        state.enabled.remove(&capability);
        state.events.push(GlEvent::Disable(capability));
    }

    fn is_enabled(&self, capability: Capability) -> bool {
        self.state.borrow().enabled.contains(&capability)
    }

    fn depth_mask(&self, write: bool) {
        self.state.borrow_mut().depth_mask = write;
    }

    fn depth_write_mask(&self) -> bool {
        self.state.borrow().depth_mask
    }

    fn depth_func(&self, func: DepthFunc) {
        self.state.borrow_mut().depth_func = func;
    }

    fn current_depth_func(&self) -> DepthFunc {
        self.state.borrow().depth_func
    }
}
