// src/gfx/resources/block.rs
//! Named GPU block buffers
//!
//! [`BlockResource`] is the untyped record shared by every block: a buffer
//! bound to a binding point in one of the two block namespaces, plus an
//! optional uploader the manager drives. The payload type only exists inside
//! the uploader closure installed by the typed wrappers.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::backend::{BufferHandle, BufferUsage, Gpu, StorageClass};
use crate::config::BlockBinding;
use crate::error::{GfxError, Result};

use super::ResourceManager;

/// When the manager uploads a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateMode {
    /// Every frame, before traversal
    PerFrame,
    /// Only when explicitly triggered by name
    OnDemand,
}

/// Byte range of a block written by a partial provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyRegion {
    pub offset: usize,
    pub size: usize,
}

impl DirtyRegion {
    pub fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }

    /// The whole of `T`
    pub fn full<T>() -> Self {
        Self {
            offset: 0,
            size: std::mem::size_of::<T>(),
        }
    }

    /// Nothing changed
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Process-unique identity of a resource, stable across renames in the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ResourceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which provider feeds a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    None,
    Full,
    Partial,
}

/// Called with a sink that writes `(offset, bytes)` ranges into the buffer
type Uploader = Box<dyn FnMut(&mut dyn FnMut(usize, &[u8]))>;

/// A named buffer bound to one binding point
///
/// Shared as `Rc<RefCell<BlockResource>>`; the manager only observes it.
/// Dropping the last handle releases the buffer and detaches the resource
/// from the manager.
pub struct BlockResource {
    id: ResourceId,
    name: String,
    binding: BlockBinding,
    gpu: Gpu,
    buffer: BufferHandle,
    size: usize,
    uploader: Option<Uploader>,
    provider: ProviderKind,
    manager: Weak<ResourceManager>,
}

impl BlockResource {
    /// Allocates a buffer of `size` bytes, binds it and registers it with `manager`
    pub fn create(
        manager: &Rc<ResourceManager>,
        name: impl Into<String>,
        binding: BlockBinding,
        size: usize,
    ) -> Result<Rc<RefCell<Self>>> {
        let gpu = Rc::clone(manager.gpu());
        let api = gpu.api();
        let buffer = api.create_buffer().map_err(GfxError::Backend)?;
        api.bind_buffer_base(binding.storage, binding.binding_point, buffer);
        api.buffer_data(binding.storage, buffer, size, None, BufferUsage::DynamicDraw);

        let resource = Rc::new(RefCell::new(Self {
            id: ResourceId::next(),
            name: name.into(),
            binding,
            gpu,
            buffer,
            size,
            uploader: None,
            provider: ProviderKind::None,
            manager: Rc::downgrade(manager),
        }));
        manager.register(&resource);
        Ok(resource)
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> BlockBinding {
        self.binding
    }

    pub fn binding_point(&self) -> u32 {
        self.binding.binding_point
    }

    pub fn storage(&self) -> StorageClass {
        self.binding.storage
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.binding.update_mode
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// Current storage size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub(crate) fn set_uploader(&mut self, provider: ProviderKind, uploader: Option<Uploader>) {
        self.provider = provider;
        self.uploader = uploader;
    }

    /// Re-specifies the buffer storage, discarding its contents
    pub(crate) fn respecify(&mut self, size: usize, data: Option<&[u8]>, usage: BufferUsage) {
        self.gpu
            .api()
            .buffer_data(self.binding.storage, self.buffer, size, data, usage);
        self.size = size;
    }

    /// Runs the provider and uploads what it produced
    ///
    /// Returns `false` when no provider is installed.
    pub fn apply(&mut self) -> bool {
        let Some(uploader) = self.uploader.as_mut() else {
            return false;
        };
        let api = self.gpu.api();
        let (storage, buffer) = (self.binding.storage, self.buffer);
        uploader(&mut |offset: usize, bytes: &[u8]| {
            api.buffer_sub_data(storage, buffer, offset, bytes)
        });
        true
    }
}

impl Drop for BlockResource {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.detach(self.id);
        }
        self.gpu.api().delete_buffer(self.buffer);
        debug!("released block resource '{}'", self.name);
    }
}

impl std::fmt::Debug for BlockResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockResource")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("binding", &self.binding)
            .field("buffer", &self.buffer)
            .field("size", &self.size)
            .field("provider", &self.provider)
            .finish()
    }
}
