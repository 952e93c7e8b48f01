// src/gfx/scene/scene.rs
use log::debug;

use crate::gfx::camera::SharedCamera;
use crate::gfx::context::RenderContext;

use super::{Node, NodeRef};

/// Main scene: a node tree plus the camera it is viewed through
pub struct Scene {
    root: NodeRef,
    camera: Option<SharedCamera>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            root: Node::new("root"),
            camera: None,
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Adds `node` under the root
    pub fn add_node(&self, node: NodeRef) {
        Node::add_child(&self.root, node);
    }

    /// Selects the camera; the scene keeps it alive while it is active
    pub fn set_camera(&mut self, ctx: &mut RenderContext, camera: SharedCamera) {
        ctx.camera.activate(&camera);
        self.camera = Some(camera);
    }

    pub fn camera(&self) -> Option<&SharedCamera> {
        self.camera.as_ref()
    }

    /// Renders one frame
    ///
    /// Republishes a moved camera, packs the lights, uploads the per-frame
    /// blocks, then traverses the tree, so every draw sees this frame's block
    /// contents.
    pub fn render_frame(&self, ctx: &mut RenderContext) {
        ctx.camera.sync();
        let lights = ctx.lights.apply(&ctx.resources);
        let uploaded = ctx.resources.apply_per_frame();
        debug!("frame: {} lights, {} per-frame blocks", lights, uploaded);

        let before = ctx.stack_depths();
        Node::traverse(&self.root, ctx);
        ctx.check_balanced(before);
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("root", &self.root.borrow())
            .field("camera", &self.camera.is_some())
            .finish()
    }
}

