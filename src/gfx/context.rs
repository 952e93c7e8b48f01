// src/gfx/context.rs
//! Explicit owner of the per-GPU-context engine state
//!
//! The stacks and managers mirror state of the single GPU context, so exactly
//! one [`RenderContext`] exists per context and it is threaded through scene
//! traversal as `&mut`.

use std::rc::Rc;

use log::{info, warn};

use crate::backend::{Capability, Gpu};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::gfx::camera::CameraPublisher;
use crate::gfx::lights::{LightManager, LightSource};
use crate::gfx::resources::ResourceManager;
use crate::gfx::shader::{builtin, ShaderProgram, ShaderSource, ShaderStack};
use crate::gfx::stacks::{TextureStack, TransformStack};

pub struct RenderContext {
    pub gpu: Gpu,
    pub config: EngineConfig,
    pub shaders: ShaderStack,
    pub transforms: TransformStack,
    pub textures: TextureStack,
    pub resources: Rc<ResourceManager>,
    pub lights: LightManager,
    pub camera: CameraPublisher,
}

/// Stack depths, used to check that a traversal left every stack balanced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackDepths {
    pub transforms: usize,
    pub shaders: usize,
    pub textures: usize,
    pub clip_distances: usize,
}

impl RenderContext {
    /// Creates the engine blocks and the base program
    pub fn new(gpu: &Gpu, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let resources = ResourceManager::new(gpu);
        let camera = CameraPublisher::new(&resources, &config)?;
        let lights = LightManager::new(&resources, &config)?;

        let base = builtin::base_program(gpu)?;
        resources.bind_all(&base);

        info!(
            "render context ready: {} blocks, {} texture units",
            resources.len(),
            config.max_texture_units
        );

        Ok(Self {
            gpu: Rc::clone(gpu),
            shaders: ShaderStack::new(base),
            transforms: TransformStack::new(),
            textures: TextureStack::new(gpu, config.max_texture_units),
            resources,
            lights,
            camera,
            config,
        })
    }

    /// Links `program` and binds every engine block it declares
    pub fn link_program(&self, program: &ShaderProgram) -> Result<()> {
        program.link()?;
        self.resources.bind_all(program);
        Ok(())
    }

    /// Builds a vertex + fragment program wired to the engine blocks
    pub fn create_program(
        &self,
        label: &str,
        vertex: impl Into<ShaderSource>,
        fragment: impl Into<ShaderSource>,
    ) -> Result<Rc<ShaderProgram>> {
        let program = ShaderProgram::from_sources(&self.gpu, label, vertex, fragment)?;
        self.resources.bind_all(&program);
        Ok(program)
    }

    pub fn register_light(&mut self, source: &Rc<dyn LightSource>) -> bool {
        self.lights.register(source)
    }

    pub fn stack_depths(&self) -> StackDepths {
        StackDepths {
            transforms: self.transforms.depth(),
            shaders: self.shaders.depth(),
            textures: self.textures.depth(),
            clip_distances: (0..self.config.max_clip_distances)
                .filter(|i| self.gpu.api().is_enabled(Capability::ClipDistance(*i)))
                .count(),
        }
    }

    /// Warns when a traversal left any stack above its base
    pub(crate) fn check_balanced(&self, before: StackDepths) {
        let after = self.stack_depths();
        if after != before {
            warn!("unbalanced traversal: {:?} -> {:?}", before, after);
        }
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("config", &self.config)
            .field("depths", &self.stack_depths())
            .field("resources", &self.resources)
            .field("lights", &self.lights)
            .finish()
    }
}
