// src/gfx/resources/manager.rs
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, warn};

use crate::backend::{Gpu, StorageClass};
use crate::gfx::shader::ShaderProgram;

use super::{BlockResource, ResourceId, UpdateMode};

struct Entry {
    id: ResourceId,
    name: String,
    binding_point: u32,
    storage: StorageClass,
    update_mode: UpdateMode,
    resource: Weak<RefCell<BlockResource>>,
}

/// Registry of the named blocks the engine keeps in sync with the GPU
///
/// The manager observes resources without owning them: the handles returned by
/// the resource constructors own the buffers, and a resource whose handle is
/// dropped disappears from the registry. Entries keep registration order, which
/// is the order per-frame resources are uploaded in.
pub struct ResourceManager {
    gpu: Gpu,
    entries: RefCell<Vec<Entry>>,
    /// Bumped on every change to the set of registered blocks
    revision: Cell<u64>,
}

impl ResourceManager {
    pub fn new(gpu: &Gpu) -> Rc<Self> {
        Rc::new(Self {
            gpu: Rc::clone(gpu),
            entries: RefCell::new(Vec::new()),
            revision: Cell::new(0),
        })
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    /// Changes whenever a block is registered or removed
    ///
    /// Programs compare it against the revision they last bound at to pick up
    /// blocks registered after them.
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    fn bump(&self) {
        self.revision.set(self.revision.get() + 1);
    }

    /// Registers `resource` under its name
    ///
    /// A resource already registered under that name is detached from the
    /// manager but left alive; its owner still holds it.
    pub fn register(&self, resource: &Rc<RefCell<BlockResource>>) {
        let block = resource.borrow();
        let mut entries = self.entries.borrow_mut();
        if let Some(pos) = entries.iter().position(|e| e.name == block.name()) {
            let old = entries.remove(pos);
            debug!(
                "block '{}' replaced (resource {:?} detached)",
                old.name, old.id
            );
        }
        entries.push(Entry {
            id: block.id(),
            name: block.name().to_string(),
            binding_point: block.binding_point(),
            storage: block.storage(),
            update_mode: block.update_mode(),
            resource: Rc::downgrade(resource),
        });
        self.bump();
        debug!(
            "registered block '{}' at {:?} binding {} ({:?})",
            block.name(),
            block.storage(),
            block.binding_point(),
            block.update_mode()
        );
    }

    /// Removes the resource registered as `name`; returns whether there was one
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|e| e.name == name) {
            Some(pos) => {
                entries.remove(pos);
                self.bump();
                true
            }
            None => {
                warn!("unregister of unknown block '{}'", name);
                false
            }
        }
    }

    /// Drops the entry of a resource being destroyed, if it is still registered
    pub(crate) fn detach(&self, id: ResourceId) {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() != before {
            self.bump();
        }
    }

    /// Applies every per-frame resource in registration order
    ///
    /// Returns the number of resources that uploaded.
    pub fn apply_per_frame(&self) -> usize {
        let live: Vec<Rc<RefCell<BlockResource>>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|e| e.resource.strong_count() > 0);
            entries
                .iter()
                .filter(|e| e.update_mode == UpdateMode::PerFrame)
                .filter_map(|e| e.resource.upgrade())
                .collect()
        };
        live.iter()
            .filter(|resource| resource.borrow_mut().apply())
            .count()
    }

    /// Applies the resource registered as `name`; returns whether it uploaded
    pub fn apply_on_demand(&self, name: &str) -> bool {
        match self.get(name) {
            Some(resource) => resource.borrow_mut().apply(),
            None => {
                warn!("on-demand apply of unknown block '{}'", name);
                false
            }
        }
    }

    /// Points the block `name` of `program` at the resource's binding point
    ///
    /// Programs that do not declare the block are skipped silently. Returns
    /// whether a binding was made.
    pub fn bind_to_shader(&self, program: &ShaderProgram, name: &str) -> bool {
        let target = self
            .entries
            .borrow()
            .iter()
            .find(|e| e.name == name)
            .map(|e| (e.storage, e.binding_point));
        match target {
            Some((storage, binding_point)) => program.bind_block(name, storage, binding_point),
            None => false,
        }
    }

    /// Binds every registered block the program declares; returns how many
    pub fn bind_all(&self, program: &ShaderProgram) -> usize {
        self.names()
            .iter()
            .filter(|name| self.bind_to_shader(program, name))
            .count()
    }

    pub fn get(&self, name: &str) -> Option<Rc<RefCell<BlockResource>>> {
        self.entries
            .borrow()
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.resource.upgrade())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.resource.strong_count() > 0)
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("names", &self.names())
            .finish()
    }
}
