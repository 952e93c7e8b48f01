// src/gfx/stacks/texture.rs
use log::warn;

use crate::backend::{Gpu, TextureHandle, TextureTarget};
use crate::error::{GfxError, Result};
use crate::gfx::uniform::TextureUnit;

/// Texture units claimed during traversal
///
/// Each push binds a texture to the next free unit; pop unbinds the most
/// recent one.
#[derive(Debug)]
pub struct TextureStack {
    gpu: Gpu,
    bound: Vec<TextureTarget>,
    max_units: u32,
}

impl TextureStack {
    pub fn new(gpu: &Gpu, max_units: u32) -> Self {
        Self {
            gpu: std::rc::Rc::clone(gpu),
            bound: Vec::new(),
            max_units,
        }
    }

    /// Binds `texture` to the next free unit and returns that unit
    pub fn push(&mut self, target: TextureTarget, texture: TextureHandle) -> Result<TextureUnit> {
        let unit = self.bound.len() as u32;
        if unit >= self.max_units {
            return Err(GfxError::InvalidArgument(format!(
                "all {} texture units are in use",
                self.max_units
            )));
        }
        let api = self.gpu.api();
        api.active_texture(unit);
        api.bind_texture(target, Some(texture));
        self.bound.push(target);
        Ok(TextureUnit(unit))
    }

    /// Unbinds the most recently claimed unit
    pub fn pop(&mut self) -> Option<TextureUnit> {
        let Some(target) = self.bound.pop() else {
            warn!("{}", GfxError::StackUnderflow { stack: "texture" });
            return None;
        };
        let unit = self.bound.len() as u32;
        let api = self.gpu.api();
        api.active_texture(unit);
        api.bind_texture(target, None);
        Some(TextureUnit(unit))
    }

    /// Units currently claimed
    pub fn depth(&self) -> usize {
        self.bound.len()
    }
}
