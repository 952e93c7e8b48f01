// src/gfx/resources/typed_buffer.rs
//! Typed wrappers over [`BlockResource`]
//!
//! - [`StructResource<T>`]: one fixed `T` per buffer (UBO or fixed SSBO)
//! - [`ArraySsbo<T>`]: a runtime-sized `T[]` storage buffer

use std::cell::{Cell, Ref, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use bytemuck::Pod;
use log::debug;

use crate::backend::{BufferHandle, BufferUsage, StorageClass};
use crate::config::BlockBinding;
use crate::error::Result;

use super::{BlockResource, DirtyRegion, ProviderKind, ResourceManager, UpdateMode};

fn type_label<T>() -> &'static str {
    let type_name = std::any::type_name::<T>();
    let pos = type_name.rfind(':').unwrap_or(0);
    if pos > 0 {
        &type_name[(pos + 1)..]
    } else {
        type_name
    }
}

/// A block holding exactly one `T`
///
/// `T` must match the GPU-side block layout byte for byte (std140 for uniform
/// blocks, std430 for storage blocks). One provider feeds the block: a full
/// provider returns the whole value, a partial provider writes into a scratch
/// value and reports which bytes it touched. Installing one replaces the other.
pub struct StructResource<T: Pod> {
    block: Rc<RefCell<BlockResource>>,
    content_type: PhantomData<T>,
}

impl<T: Pod> StructResource<T> {
    /// Allocates `size_of::<T>()` bytes at `binding` and registers the block
    pub fn new(
        manager: &Rc<ResourceManager>,
        name: impl Into<String>,
        binding: BlockBinding,
    ) -> Result<Self> {
        let name = name.into();
        debug!(
            "creating {:?} block '{}' for {} ({} bytes)",
            binding.storage,
            name,
            type_label::<T>(),
            std::mem::size_of::<T>()
        );
        let block = BlockResource::create(manager, name, binding, std::mem::size_of::<T>())?;
        Ok(Self {
            block,
            content_type: PhantomData,
        })
    }

    /// A std140 uniform block
    pub fn uniform_block(
        manager: &Rc<ResourceManager>,
        name: impl Into<String>,
        binding_point: u32,
        mode: UpdateMode,
    ) -> Result<Self> {
        Self::new(
            manager,
            name,
            BlockBinding::new(binding_point, StorageClass::Uniform, mode),
        )
    }

    /// A fixed-size std430 storage block
    pub fn storage_block(
        manager: &Rc<ResourceManager>,
        name: impl Into<String>,
        binding_point: u32,
        mode: UpdateMode,
    ) -> Result<Self> {
        Self::new(
            manager,
            name,
            BlockBinding::new(binding_point, StorageClass::ShaderStorage, mode),
        )
    }

    /// Feeds the block with a provider returning the whole value
    pub fn set_full_provider(&self, mut provider: impl FnMut() -> T + 'static) {
        self.block.borrow_mut().set_uploader(
            ProviderKind::Full,
            Some(Box::new(move |upload: &mut dyn FnMut(usize, &[u8])| {
                let value = provider();
                upload(0, bytemuck::bytes_of(&value));
            })),
        );
    }

    /// Feeds the block with a provider that writes part of a scratch value
    ///
    /// The scratch value starts zeroed on every apply. Only the returned
    /// region is uploaded.
    ///
    /// # Panics
    ///
    /// On apply, if the region returned by the provider extends past `T`.
    pub fn set_partial_provider(&self, mut provider: impl FnMut(&mut T) -> DirtyRegion + 'static) {
        self.block.borrow_mut().set_uploader(
            ProviderKind::Partial,
            Some(Box::new(move |upload: &mut dyn FnMut(usize, &[u8])| {
                let mut scratch: T = bytemuck::Zeroable::zeroed();
                let region = provider(&mut scratch);
                if region.is_empty() {
                    return;
                }
                let size = std::mem::size_of::<T>();
                assert!(
                    region.end() <= size,
                    "dirty region {}..{} exceeds {} bytes of {}",
                    region.offset,
                    region.end(),
                    size,
                    type_label::<T>()
                );
                upload(
                    region.offset,
                    &bytemuck::bytes_of(&scratch)[region.offset..region.end()],
                );
            })),
        );
    }

    pub fn clear_provider(&self) {
        self.block
            .borrow_mut()
            .set_uploader(ProviderKind::None, None);
    }

    /// Uploads from the installed provider; `false` when there is none
    pub fn apply(&self) -> bool {
        self.block.borrow_mut().apply()
    }

    pub fn block(&self) -> &Rc<RefCell<BlockResource>> {
        &self.block
    }

    pub fn provider(&self) -> ProviderKind {
        self.block.borrow().provider()
    }

    pub fn buffer(&self) -> BufferHandle {
        self.block.borrow().buffer()
    }

    pub fn name(&self) -> String {
        self.block.borrow().name().to_string()
    }
}

impl<T: Pod> std::fmt::Debug for StructResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructResource")
            .field("content", &type_label::<T>())
            .field("block", &self.block.borrow())
            .finish()
    }
}

/// A shader storage buffer holding a runtime-sized `T[]`
///
/// The contents are set explicitly; applying it through the manager does
/// nothing.
pub struct ArraySsbo<T: Pod> {
    block: Rc<RefCell<BlockResource>>,
    len: Cell<usize>,
    content_type: PhantomData<T>,
}

impl<T: Pod> ArraySsbo<T> {
    /// Creates an empty storage buffer at `binding_point`
    pub fn new(
        manager: &Rc<ResourceManager>,
        name: impl Into<String>,
        binding_point: u32,
    ) -> Result<Self> {
        let binding = BlockBinding::new(binding_point, StorageClass::ShaderStorage, UpdateMode::OnDemand);
        let block = BlockResource::create(manager, name, binding, 0)?;
        Ok(Self {
            block,
            len: Cell::new(0),
            content_type: PhantomData,
        })
    }

    /// Re-specifies the storage with `items`
    pub fn upload(&self, items: &[T], usage: BufferUsage) {
        let bytes: &[u8] = bytemuck::cast_slice(items);
        self.block
            .borrow_mut()
            .respecify(bytes.len(), Some(bytes), usage);
        self.len.set(items.len());
    }

    /// Re-specifies the storage for `count` elements without data
    pub fn resize(&self, count: usize, usage: BufferUsage) {
        self.block
            .borrow_mut()
            .respecify(count * std::mem::size_of::<T>(), None, usage);
        self.len.set(count);
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len.get() == 0
    }

    pub fn block(&self) -> &Rc<RefCell<BlockResource>> {
        &self.block
    }

    pub fn buffer(&self) -> BufferHandle {
        self.block.borrow().buffer()
    }

    /// Read access to the underlying block
    pub fn resource(&self) -> Ref<'_, BlockResource> {
        self.block.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GpuContext, HeadlessApi};
    use bytemuck::Zeroable;
    use rand::Rng;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    struct Payload {
        a: [f32; 4],
        b: [u32; 4],
    }

    fn manager() -> (HeadlessApi, Rc<ResourceManager>) {
        let api = HeadlessApi::new();
        let manager = ResourceManager::new(&GpuContext::new(api.clone()));
        (api, manager)
    }

    #[test]
    fn test_full_provider_uploads_byte_image() {
        let (api, manager) = manager();
        let block = StructResource::<Payload>::uniform_block(&manager, "Payload", 2, UpdateMode::PerFrame)
            .unwrap();
        let mut rng = rand::rng();
        for _ in 0..16 {
            let value = Payload {
                a: [rng.random(), rng.random(), rng.random(), rng.random()],
                b: [rng.random(), rng.random(), rng.random(), rng.random()],
            };
            block.set_full_provider(move || value);
            assert!(block.apply());
            assert_eq!(
                api.buffer_contents(block.buffer()).unwrap(),
                bytemuck::bytes_of(&value)
            );
        }
    }

    #[test]
    fn test_partial_provider_touches_only_region() {
        let (api, manager) = manager();
        let block = StructResource::<Payload>::storage_block(&manager, "Payload", 1, UpdateMode::OnDemand)
            .unwrap();
        let size = std::mem::size_of::<Payload>();
        let mut rng = rand::rng();

        for _ in 0..32 {
            let before = api.buffer_contents(block.buffer()).unwrap();
            let offset = rng.random_range(0..size);
            let len = rng.random_range(0..=size - offset);
            let fill: u8 = rng.random_range(1..=255);
            block.set_partial_provider(move |scratch: &mut Payload| {
                bytemuck::bytes_of_mut(scratch)[offset..offset + len].fill(fill);
                DirtyRegion::new(offset, len)
            });
            block.apply();

            let after = api.buffer_contents(block.buffer()).unwrap();
            for (i, (old, new)) in before.iter().zip(&after).enumerate() {
                if i >= offset && i < offset + len {
                    assert_eq!(*new, fill);
                } else {
                    assert_eq!(new, old);
                }
            }
        }
    }

    #[test]
    fn test_providers_are_exclusive() {
        let (_api, manager) = manager();
        let block = StructResource::<Payload>::uniform_block(&manager, "P", 0, UpdateMode::OnDemand)
            .unwrap();
        assert_eq!(block.provider(), ProviderKind::None);
        assert!(!block.apply());
        block.set_full_provider(Payload::zeroed);
        assert_eq!(block.provider(), ProviderKind::Full);
        block.set_partial_provider(|_| DirtyRegion::empty());
        assert_eq!(block.provider(), ProviderKind::Partial);
        block.clear_provider();
        assert_eq!(block.provider(), ProviderKind::None);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn test_region_past_end_panics() {
        let (_api, manager) = manager();
        let block = StructResource::<Payload>::uniform_block(&manager, "P", 0, UpdateMode::OnDemand)
            .unwrap();
        block.set_partial_provider(|_| DirtyRegion::new(24, 16));
        block.apply();
    }

    #[test]
    fn test_array_ssbo_upload_and_resize() {
        let (api, manager) = manager();
        let ssbo = ArraySsbo::<[f32; 4]>::new(&manager, "Particles", 3).unwrap();
        assert!(ssbo.is_empty());

        ssbo.upload(&[[1.0; 4], [2.0; 4]], BufferUsage::StreamDraw);
        assert_eq!(ssbo.len(), 2);
        assert_eq!(api.buffer_contents(ssbo.buffer()).unwrap().len(), 32);
        assert!(!ssbo.block().borrow_mut().apply());

        ssbo.resize(5, BufferUsage::DynamicDraw);
        assert_eq!(ssbo.len(), 5);
        assert_eq!(ssbo.resource().size(), 80);
        assert_eq!(api.buffer_contents(ssbo.buffer()).unwrap(), vec![0; 80]);
    }
}
