// src/gfx/shader/program.rs
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::{debug, warn};

use crate::backend::{
    ActiveUniform, Gpu, ProgramHandle, ShaderHandle, ShaderStage, StorageClass, UniformLocation,
};
use crate::error::{GfxError, Result};
use crate::gfx::uniform::{
    PendingQueue, SlotBinding, UniformKind, UniformSlot, UniformType, UniformValue,
};

use super::ShaderSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Unlinked,
    Linked,
    /// Compile or link failed; the program stays unusable
    Failed,
}

/// What [`ShaderProgram::set_uniform`] did with a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformWrite {
    /// Issued to the GPU right away
    Immediate,
    /// Queued until the program is next activated
    Deferred,
    /// The program is current but the write could not be resolved
    Dropped,
}

/// A linked GPU program plus its configured uniforms and deferred writes
///
/// Programs are shared as `Rc<ShaderProgram>` between the shader stack and the
/// components that push them, so every mutating operation goes through
/// interior mutability.
pub struct ShaderProgram {
    gpu: Gpu,
    label: String,
    handle: ProgramHandle,
    state: Cell<LinkState>,
    stages: RefCell<Vec<(ShaderStage, String)>>,
    slots: RefCell<Vec<UniformSlot>>,
    active: RefCell<HashMap<String, ActiveUniform>>,
    locations: RefCell<HashMap<String, Option<UniformLocation>>>,
    pending: RefCell<PendingQueue>,
    silenced: RefCell<HashSet<String>>,
    warned: RefCell<HashSet<String>>,
    validated: Cell<bool>,
    validation_warnings: Cell<usize>,
}

impl ShaderProgram {
    pub fn new(gpu: &Gpu, label: impl Into<String>) -> Result<Self> {
        let handle = gpu.api().create_program().map_err(GfxError::Backend)?;
        Ok(Self {
            gpu: Rc::clone(gpu),
            label: label.into(),
            handle,
            state: Cell::new(LinkState::Unlinked),
            stages: RefCell::new(Vec::new()),
            slots: RefCell::new(Vec::new()),
            active: RefCell::new(HashMap::new()),
            locations: RefCell::new(HashMap::new()),
            pending: RefCell::new(PendingQueue::new()),
            silenced: RefCell::new(HashSet::new()),
            warned: RefCell::new(HashSet::new()),
            validated: Cell::new(false),
            validation_warnings: Cell::new(0),
        })
    }

    /// Builds and links a vertex + fragment program
    pub fn from_sources(
        gpu: &Gpu,
        label: impl Into<String>,
        vertex: impl Into<ShaderSource>,
        fragment: impl Into<ShaderSource>,
    ) -> Result<Rc<Self>> {
        let program = Self::new(gpu, label)?;
        program.attach(ShaderStage::Vertex, vertex)?;
        program.attach(ShaderStage::Fragment, fragment)?;
        program.link()?;
        Ok(Rc::new(program))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn is_linked(&self) -> bool {
        self.state.get() == LinkState::Linked
    }

    /// Whether this program is the one the GPU context currently uses
    pub fn is_current(&self) -> bool {
        self.gpu.current_program() == Some(self.handle)
    }

    /// Stops treating this program as current until it is activated again
    pub(crate) fn release(&self) {
        self.gpu.forget_program(self.handle);
    }

    pub fn is_validated(&self) -> bool {
        self.validated.get()
    }

    /// Warnings emitted by first-activation validation
    pub fn validation_warnings(&self) -> usize {
        self.validation_warnings.get()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Stages a shader stage from a path or inline source
    ///
    /// Sources are compiled by [`link`](Self::link).
    pub fn attach(&self, stage: ShaderStage, source: impl Into<ShaderSource>) -> Result<()> {
        if self.state.get() != LinkState::Unlinked {
            return Err(GfxError::InvalidArgument(format!(
                "cannot attach a {} stage to program '{}' after linking",
                stage, self.label
            )));
        }
        let text = source.into().load()?;
        self.stages.borrow_mut().push((stage, text));
        Ok(())
    }

    /// Compiles the staged sources and links the program
    ///
    /// Idempotent after success. A compile or link failure leaves the program
    /// permanently unusable.
    pub fn link(&self) -> Result<()> {
        match self.state.get() {
            LinkState::Linked => return Ok(()),
            LinkState::Failed => return Err(GfxError::ProgramNotLinked(self.label.clone())),
            LinkState::Unlinked => {}
        }

        let api = self.gpu.api();
        let mut compiled: Vec<ShaderHandle> = Vec::new();
        let result = (|| {
            for (stage, source) in self.stages.borrow().iter() {
                let shader = api
                    .create_shader(*stage, source)
                    .map_err(|log| GfxError::Compile {
                        program: self.label.clone(),
                        stage: *stage,
                        log,
                    })?;
                compiled.push(shader);
                api.attach_shader(self.handle, shader);
            }
            api.link_program(self.handle).map_err(|log| GfxError::Link {
                program: self.label.clone(),
                log,
            })
        })();

        for shader in compiled {
            api.delete_shader(shader);
        }

        if let Err(err) = result {
            self.state.set(LinkState::Failed);
            return Err(err);
        }

        self.state.set(LinkState::Linked);
        self.stages.borrow_mut().clear();
        *self.active.borrow_mut() = api
            .active_uniforms(self.handle)
            .into_iter()
            .map(|u| (u.name.clone(), u))
            .collect();
        self.locations.borrow_mut().clear();

        let names: Vec<String> = self.slots.borrow().iter().map(|s| s.name().to_string()).collect();
        for name in names {
            self.resolve_slot(&name);
        }

        debug!(
            "linked program '{}' ({} active uniforms)",
            self.label,
            self.active.borrow().len()
        );
        Ok(())
    }

    /// Type the linked program declares for `name`, if it is active
    pub fn declared_kind(&self, name: &str) -> Option<UniformKind> {
        self.active.borrow().get(name).and_then(|u| u.kind)
    }

    /// Creates or updates the slot `name` and resolves it against this program
    pub fn configure_uniform<T: UniformType>(
        &self,
        name: &str,
        provider: impl Fn() -> T + 'static,
    ) -> SlotBinding {
        {
            let mut slots = self.slots.borrow_mut();
            match slots.iter_mut().find(|s| s.name() == name) {
                Some(slot) => slot.set_provider(provider),
                None => slots.push(UniformSlot::new(name, provider)),
            }
        }
        if self.is_linked() {
            self.resolve_slot(name)
        } else {
            SlotBinding::Unbound
        }
    }

    /// Resolves an externally owned slot against this program
    pub fn bind_slot(&self, slot: &mut UniformSlot) -> SlotBinding {
        if !self.is_linked() {
            return SlotBinding::Unbound;
        }
        let binding = slot.bind(&self.gpu, self.handle, self.declared_kind(slot.name()));
        self.report_binding(slot.name(), slot.kind(), binding);
        binding
    }

    fn resolve_slot(&self, name: &str) -> SlotBinding {
        let declared = self.declared_kind(name);
        let mut slots = self.slots.borrow_mut();
        let Some(slot) = slots.iter_mut().find(|s| s.name() == name) else {
            return SlotBinding::Unbound;
        };
        slot.invalidate();
        let binding = slot.bind(&self.gpu, self.handle, declared);
        self.report_binding(name, slot.kind(), binding);
        binding
    }

    fn report_binding(&self, name: &str, kind: UniformKind, binding: SlotBinding) {
        let err = match binding {
            SlotBinding::Missing { .. } => GfxError::UniformNotFound {
                program: self.label.clone(),
                name: name.to_string(),
            },
            SlotBinding::Mismatched { declared, .. } => GfxError::UniformTypeMismatch {
                program: self.label.clone(),
                name: name.to_string(),
                expected: declared,
                found: kind,
            },
            SlotBinding::Unbound | SlotBinding::Resolved { .. } => return,
        };
        self.warn_once(name, &err);
    }

    fn warn_once(&self, name: &str, err: &GfxError) {
        if self.warned.borrow_mut().insert(name.to_string()) {
            warn!("{}", err);
        }
    }

    /// Suppresses the declared-but-not-configured warning for `name`
    pub fn silence(&self, name: &str) {
        self.silenced.borrow_mut().insert(name.to_string());
    }

    /// Writes `value` now when this program is current, otherwise defers it
    pub fn set_uniform(&self, name: &str, value: impl Into<UniformValue>) -> UniformWrite {
        let value = value.into();
        if !self.is_current() {
            self.pending.borrow_mut().enqueue(name, value);
            return UniformWrite::Deferred;
        }
        match self.resolve(name, &value) {
            Ok(location) => {
                self.gpu.api().set_uniform(location, &value);
                UniformWrite::Immediate
            }
            Err(err) => {
                self.warn_once(name, &err);
                UniformWrite::Dropped
            }
        }
    }

    /// Looks up the location of `name` for a write of `value`
    fn resolve(&self, name: &str, value: &UniformValue) -> Result<UniformLocation> {
        if !self.is_linked() {
            return Err(GfxError::ProgramNotLinked(self.label.clone()));
        }
        let location = *self
            .locations
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(|| self.gpu.api().uniform_location(self.handle, name));
        let Some(location) = location else {
            return Err(GfxError::UniformNotFound {
                program: self.label.clone(),
                name: name.to_string(),
            });
        };
        let base = name.strip_suffix("[0]").unwrap_or(name);
        if let Some(declared) = self.declared_kind(base) {
            if !declared.accepts(value.kind()) {
                return Err(GfxError::UniformTypeMismatch {
                    program: self.label.clone(),
                    name: name.to_string(),
                    expected: declared,
                    found: value.kind(),
                });
            }
        }
        Ok(location)
    }

    /// Makes this the GPU program
    ///
    /// Flushes the deferred writes in order, validates the active uniforms on
    /// the first activation, then re-applies every configured uniform.
    pub fn activate(&self) -> Result<()> {
        if !self.is_linked() {
            return Err(GfxError::ProgramNotLinked(self.label.clone()));
        }
        self.gpu.bind_program(Some(self.handle));

        let flushed = self
            .pending
            .borrow_mut()
            .flush(&self.gpu, |name, value| self.resolve(name, value));
        if flushed > 0 {
            debug!("program '{}' flushed {} deferred writes", self.label, flushed);
        }

        if !self.validated.get() {
            self.validate();
        }
        self.apply_uniforms();
        Ok(())
    }

    /// Warns about active uniforms nothing will ever write
    fn validate(&self) {
        let slots = self.slots.borrow();
        let silenced = self.silenced.borrow();
        let active = self.active.borrow();
        let mut unconfigured: Vec<&str> = active
            .keys()
            .map(String::as_str)
            .filter(|name| !name.starts_with("gl_"))
            .filter(|name| !slots.iter().any(|s| s.name() == *name))
            .filter(|name| !silenced.contains(*name))
            .collect();
        unconfigured.sort_unstable();

        for name in &unconfigured {
            warn!(
                "program '{}': active uniform '{}' is not configured",
                self.label, name
            );
        }
        self.validation_warnings.set(unconfigured.len());
        self.validated.set(true);
    }

    /// Pulls every configured provider and writes the values
    ///
    /// Only issues writes while this program is current. Returns the number of
    /// writes.
    pub fn apply_uniforms(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|slot| slot.apply(&self.gpu))
            .count()
    }

    /// Index of the block `name` in the given namespace
    pub fn block_index(&self, name: &str, storage: StorageClass) -> Result<u32> {
        self.gpu
            .api()
            .block_index(self.handle, storage, name)
            .ok_or_else(|| GfxError::BlockIndexNotFound {
                program: self.label.clone(),
                name: name.to_string(),
            })
    }

    /// Points the block `name` at `binding_point`; returns whether the program declares it
    pub fn bind_block(&self, name: &str, storage: StorageClass, binding_point: u32) -> bool {
        match self.block_index(name, storage) {
            Ok(index) => {
                self.gpu
                    .api()
                    .block_binding(self.handle, storage, index, binding_point);
                true
            }
            Err(_) => false,
        }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.gpu.retire_program(self.handle);
        self.gpu.api().delete_program(self.handle);
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("label", &self.label)
            .field("handle", &self.handle)
            .field("state", &self.state.get())
            .field("pending", &self.pending_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GpuContext, HeadlessApi};

    const VERTEX: &str = "#version 430\nvoid main(){gl_Position=vec4(0);}";
    const FRAGMENT: &str = "#version 430\nuniform float k;\nuniform vec4 tint;\nout vec4 c;\nvoid main(){c=tint*k;}";

    fn setup() -> (HeadlessApi, Gpu) {
        let _ = env_logger::builder().is_test(true).try_init();
        let api = HeadlessApi::new();
        let gpu = GpuContext::new(api.clone());
        (api, gpu)
    }

    #[test]
    fn test_configured_uniform_applied_on_activation() {
        let (api, gpu) = setup();
        let program = ShaderProgram::from_sources(&gpu, "lit", VERTEX, FRAGMENT).unwrap();
        program.configure_uniform("k", || 0.25f32);
        program.silence("tint");

        program.activate().unwrap();

        assert_eq!(
            api.uniform_value(program.handle(), "k"),
            Some(UniformValue::Float(0.25))
        );
        assert_eq!(program.validation_warnings(), 0);
        assert!(program.is_validated());
    }

    #[test]
    fn test_unconfigured_uniform_counts_once() {
        let (_api, gpu) = setup();
        let program = ShaderProgram::from_sources(&gpu, "lit", VERTEX, FRAGMENT).unwrap();
        program.configure_uniform("k", || 1.0f32);

        program.activate().unwrap();
        assert_eq!(program.validation_warnings(), 1);

        gpu.bind_program(None);
        program.activate().unwrap();
        assert_eq!(program.validation_warnings(), 1);
    }

    #[test]
    fn test_compile_error_is_sticky() {
        let (_api, gpu) = setup();
        let program = ShaderProgram::new(&gpu, "broken").unwrap();
        program.attach(ShaderStage::Vertex, VERTEX).unwrap();
        program
            .attach(ShaderStage::Fragment, "#version 430\n#error nope\nvoid main(){}")
            .unwrap();

        match program.link() {
            Err(GfxError::Compile { stage, log, .. }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("nope"));
            }
            other => panic!("expected compile error, got {:?}", other),
        }
        assert!(matches!(program.link(), Err(GfxError::ProgramNotLinked(_))));
        assert!(matches!(program.activate(), Err(GfxError::ProgramNotLinked(_))));
    }

    #[test]
    fn test_link_error_carries_log() {
        let (_api, gpu) = setup();
        let program = ShaderProgram::new(&gpu, "vertex-only").unwrap();
        program.attach(ShaderStage::Vertex, VERTEX).unwrap();
        let err = program.link().unwrap_err();
        assert!(matches!(err, GfxError::Link { ref log, .. } if log.contains("fragment")));
    }

    #[test]
    fn test_link_is_idempotent() {
        let (_api, gpu) = setup();
        let program = ShaderProgram::from_sources(&gpu, "lit", VERTEX, FRAGMENT).unwrap();
        assert!(program.link().is_ok());
        assert!(program.attach(ShaderStage::Geometry, "void main(){}").is_err());
    }

    #[test]
    fn test_set_uniform_defers_when_not_current() {
        let (api, gpu) = setup();
        let program = ShaderProgram::from_sources(&gpu, "lit", VERTEX, FRAGMENT).unwrap();

        assert_eq!(program.set_uniform("k", 1.0f32), UniformWrite::Deferred);
        assert_eq!(program.set_uniform("k", 2.0f32), UniformWrite::Deferred);
        assert_eq!(program.pending_len(), 2);
        assert_eq!(api.uniform_value(program.handle(), "k"), None);

        program.activate().unwrap();
        assert_eq!(program.pending_len(), 0);
        assert_eq!(
            api.uniform_value(program.handle(), "k"),
            Some(UniformValue::Float(2.0))
        );

        assert_eq!(program.set_uniform("k", 3.0f32), UniformWrite::Immediate);
        assert_eq!(program.pending_len(), 0);
    }

    #[test]
    fn test_mismatched_slot_never_writes() {
        let (api, gpu) = setup();
        let program = ShaderProgram::from_sources(&gpu, "lit", VERTEX, FRAGMENT).unwrap();
        let binding = program.configure_uniform("k", || 3i32);
        assert!(matches!(binding, SlotBinding::Mismatched { declared: UniformKind::Float, .. }));

        program.activate().unwrap();
        assert_eq!(api.uniform_value(program.handle(), "k"), None);
        assert_eq!(api.error_count(), 0);
    }

    #[test]
    fn test_missing_uniform_write_is_dropped() {
        let (_api, gpu) = setup();
        let program = ShaderProgram::from_sources(&gpu, "lit", VERTEX, FRAGMENT).unwrap();
        program.activate().unwrap();
        assert_eq!(program.set_uniform("absent", 1.0f32), UniformWrite::Dropped);
    }

    #[test]
    fn test_failed_writes_warn_once_per_name() {
        let (api, gpu) = setup();
        let program = ShaderProgram::from_sources(&gpu, "lit", VERTEX, FRAGMENT).unwrap();
        program.activate().unwrap();

        assert_eq!(program.set_uniform("absent", 1.0f32), UniformWrite::Dropped);
        assert_eq!(program.set_uniform("absent", 2.0f32), UniformWrite::Dropped);
        assert_eq!(program.set_uniform("k", 1i32), UniformWrite::Dropped);
        assert_eq!(program.set_uniform("k", 2i32), UniformWrite::Dropped);

        let warned = program.warned.borrow();
        assert_eq!(warned.len(), 2);
        assert!(warned.contains("absent"));
        assert!(warned.contains("k"));
        assert_eq!(api.uniform_value(program.handle(), "k"), None);
        assert_eq!(api.error_count(), 0);
    }

    #[test]
    fn test_warnings_are_tracked_per_program() {
        let (_api, gpu) = setup();
        let a = ShaderProgram::from_sources(&gpu, "a", VERTEX, FRAGMENT).unwrap();
        let b = ShaderProgram::from_sources(&gpu, "b", VERTEX, FRAGMENT).unwrap();

        a.activate().unwrap();
        a.set_uniform("absent", 1.0f32);
        b.activate().unwrap();
        b.set_uniform("absent", 1.0f32);

        assert_eq!(a.warned.borrow().len(), 1);
        assert_eq!(b.warned.borrow().len(), 1);
    }

    #[test]
    fn test_validation_skips_builtin_prefix() {
        let (_api, gpu) = setup();
        let fragment = "#version 430\nuniform float gl_DepthBias;\nuniform float k;\nout vec4 c;\nvoid main(){c=vec4(k);}";
        let program = ShaderProgram::from_sources(&gpu, "builtin", VERTEX, fragment).unwrap();
        assert_eq!(program.declared_kind("gl_DepthBias"), Some(UniformKind::Float));

        program.configure_uniform("k", || 1.0f32);
        program.activate().unwrap();
        assert_eq!(program.validation_warnings(), 0);
    }

    #[test]
    fn test_block_binding() {
        let (api, gpu) = setup();
        let fragment = "#version 430\nlayout(std140) uniform CameraMatrices { mat4 view; mat4 projection; };\nout vec4 c;\nvoid main(){c=vec4(1);}";
        let program = ShaderProgram::from_sources(&gpu, "cam", VERTEX, fragment).unwrap();

        assert!(program.bind_block("CameraMatrices", StorageClass::Uniform, 3));
        assert!(!program.bind_block("CameraMatrices", StorageClass::ShaderStorage, 3));
        assert_eq!(
            api.block_binding_of(program.handle(), StorageClass::Uniform, "CameraMatrices"),
            Some(3)
        );
    }
}
