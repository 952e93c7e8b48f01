// src/config.rs
//! Engine configuration
//!
//! Binding points and update disciplines of the engine-owned blocks, plus the
//! few backend limits the core checks against. Everything here has a default
//! that matches the built-in shaders.

use crate::error::{GfxError, Result};
use crate::gfx::resources::{StorageClass, UpdateMode};

/// Array size of the `SceneLights` block. Must equal the shader-side constant.
pub const MAX_SCENE_LIGHTS: usize = 16;

/// Block name of the camera view/projection matrices.
pub const CAMERA_MATRICES: &str = "CameraMatrices";
/// Block name of the active camera's world position.
pub const CAMERA_POSITION: &str = "CameraPosition";
/// Block name of the packed scene lights.
pub const SCENE_LIGHTS: &str = "SceneLights";

/// Where and how one named block is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBinding {
    pub binding_point: u32,
    pub storage: StorageClass,
    pub update_mode: UpdateMode,
}

impl BlockBinding {
    pub fn new(binding_point: u32, storage: StorageClass, update_mode: UpdateMode) -> Self {
        Self {
            binding_point,
            storage,
            update_mode,
        }
    }
}

/// Configuration recognised by the engine core
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub camera_matrices: BlockBinding,
    pub camera_position: BlockBinding,
    pub scene_lights: BlockBinding,
    /// Texture units available to the texture stack
    pub max_texture_units: u32,
    /// Clip distances a single clip-plane component may enable
    pub max_clip_distances: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            camera_matrices: BlockBinding::new(0, StorageClass::Uniform, UpdateMode::PerFrame),
            camera_position: BlockBinding::new(1, StorageClass::Uniform, UpdateMode::OnDemand),
            scene_lights: BlockBinding::new(0, StorageClass::ShaderStorage, UpdateMode::OnDemand),
            max_texture_units: 16,
            max_clip_distances: 8,
        }
    }
}

impl EngineConfig {
    pub fn with_camera_matrices(mut self, binding: BlockBinding) -> Self {
        self.camera_matrices = binding;
        self
    }

    pub fn with_camera_position(mut self, binding: BlockBinding) -> Self {
        self.camera_position = binding;
        self
    }

    pub fn with_scene_lights(mut self, binding: BlockBinding) -> Self {
        self.scene_lights = binding;
        self
    }

    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = units;
        self
    }

    pub fn with_max_clip_distances(mut self, distances: u32) -> Self {
        self.max_clip_distances = distances;
        self
    }

    /// Named block bindings in registration order
    pub fn blocks(&self) -> [(&'static str, BlockBinding); 3] {
        [
            (CAMERA_MATRICES, self.camera_matrices),
            (CAMERA_POSITION, self.camera_position),
            (SCENE_LIGHTS, self.scene_lights),
        ]
    }

    /// Rejects binding-point collisions within one storage class and zero limits
    pub fn validate(&self) -> Result<()> {
        let blocks = self.blocks();
        for (i, (name, a)) in blocks.iter().enumerate() {
            for (other, b) in &blocks[i + 1..] {
                if a.storage == b.storage && a.binding_point == b.binding_point {
                    return Err(GfxError::InvalidConfig(format!(
                        "blocks '{}' and '{}' share {:?} binding point {}",
                        name, other, a.storage, a.binding_point
                    )));
                }
            }
        }

        if self.max_texture_units == 0 {
            return Err(GfxError::InvalidConfig(
                "max_texture_units must be at least 1".to_string(),
            ));
        }
        if self.max_clip_distances == 0 {
            return Err(GfxError::InvalidConfig(
                "max_clip_distances must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Preprocessor preamble sharing build-time constants with shader sources
pub fn shader_defines() -> String {
    format!("#define MAX_SCENE_LIGHTS {}\n", MAX_SCENE_LIGHTS)
}
