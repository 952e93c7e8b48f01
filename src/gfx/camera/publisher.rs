// src/gfx/camera/publisher.rs
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use cgmath::{Matrix4, Point3, SquareMatrix};
use log::debug;

use crate::config::{EngineConfig, CAMERA_MATRICES, CAMERA_POSITION};
use crate::error::Result;
use crate::gfx::resources::{ResourceManager, StructResource};

use super::camera_utils::{Camera, CameraMatricesBlock, CameraPositionBlock};

/// A camera shared between the scene and the publisher
pub type SharedCamera = Rc<RefCell<dyn Camera>>;

/// Feeds the engine camera blocks from the active camera
///
/// Owns the `CameraMatrices` and `CameraPosition` blocks. Activating a camera
/// only swaps their providers; the providers hold the camera weakly, so a
/// dropped camera falls back to identity matrices.
pub struct CameraPublisher {
    manager: Rc<ResourceManager>,
    matrices: StructResource<CameraMatricesBlock>,
    position: StructResource<CameraPositionBlock>,
    active: Option<Weak<RefCell<dyn Camera>>>,
    /// Eye position behind the last `CameraPosition` upload
    published: Cell<Option<Point3<f32>>>,
}

impl CameraPublisher {
    pub fn new(manager: &Rc<ResourceManager>, config: &EngineConfig) -> Result<Self> {
        let matrices = StructResource::new(manager, CAMERA_MATRICES, config.camera_matrices)?;
        let position = StructResource::new(manager, CAMERA_POSITION, config.camera_position)?;
        let mut publisher = Self {
            manager: Rc::clone(manager),
            matrices,
            position,
            active: None,
            published: Cell::new(None),
        };
        publisher.deactivate();
        Ok(publisher)
    }

    /// Makes `camera` the source of both camera blocks
    pub fn activate(&mut self, camera: &SharedCamera) {
        let weak = Rc::downgrade(camera);

        let source = weak.clone();
        self.matrices.set_full_provider(move || match source.upgrade() {
            Some(camera) => CameraMatricesBlock::from_camera(&*camera.borrow()),
            None => CameraMatricesBlock::default(),
        });

        if camera.borrow().world_position().is_some() {
            let source = weak.clone();
            self.position.set_full_provider(move || {
                source
                    .upgrade()
                    .and_then(|camera| camera.borrow().world_position())
                    .map(CameraPositionBlock::new)
                    .unwrap_or_default()
            });
        } else {
            self.position.set_full_provider(CameraPositionBlock::default);
        }

        self.active = Some(weak);
        debug!("camera activated");
        self.camera_moved();
    }

    /// Reverts both blocks to identity / origin
    pub fn deactivate(&mut self) {
        self.matrices.set_full_provider(CameraMatricesBlock::default);
        self.position.set_full_provider(CameraPositionBlock::default);
        self.active = None;
        self.camera_moved();
    }

    /// Re-uploads `CameraPosition`; call whenever the active camera moves
    pub fn camera_moved(&self) -> bool {
        self.published.set(self.eye());
        self.manager.apply_on_demand(CAMERA_POSITION)
    }

    /// Re-uploads `CameraPosition` if the active camera moved since the last upload
    ///
    /// Called once per frame by the scene, so camera setters need not notify.
    pub fn sync(&self) -> bool {
        if self.eye() == self.published.get() {
            return false;
        }
        debug!("camera moved, republishing position");
        self.camera_moved()
    }

    fn eye(&self) -> Option<Point3<f32>> {
        self.active_camera()
            .and_then(|camera| camera.borrow().world_position())
    }

    pub fn active_camera(&self) -> Option<SharedCamera> {
        self.active.as_ref().and_then(Weak::upgrade)
    }

    /// View matrix of the active camera, identity without one
    pub fn view(&self) -> Matrix4<f32> {
        self.active_camera()
            .map(|camera| camera.borrow().view())
            .unwrap_or_else(Matrix4::identity)
    }

    /// Projection matrix of the active camera, identity without one
    pub fn projection(&self) -> Matrix4<f32> {
        self.active_camera()
            .map(|camera| camera.borrow().projection())
            .unwrap_or_else(Matrix4::identity)
    }

    pub fn matrices(&self) -> &StructResource<CameraMatricesBlock> {
        &self.matrices
    }

    pub fn position(&self) -> &StructResource<CameraPositionBlock> {
        &self.position
    }
}

impl std::fmt::Debug for CameraPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraPublisher")
            .field("matrices", &self.matrices)
            .field("position", &self.position)
            .field("active", &self.active_camera().is_some())
            .finish()
    }
}
