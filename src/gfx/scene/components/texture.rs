// src/gfx/scene/components/texture.rs
use std::cell::Cell;

use log::warn;

use crate::backend::{TextureHandle, TextureTarget};
use crate::gfx::context::RenderContext;
use crate::gfx::scene::component::{priority, Component};
use crate::gfx::uniform::TextureUnit;

/// Binds a texture for the subtree and points a sampler uniform at it
#[derive(Debug)]
pub struct TextureComponent {
    target: TextureTarget,
    texture: TextureHandle,
    sampler: String,
    unit: Cell<Option<TextureUnit>>,
}

impl TextureComponent {
    pub fn new(target: TextureTarget, texture: TextureHandle, sampler: impl Into<String>) -> Self {
        Self {
            target,
            texture,
            sampler: sampler.into(),
            unit: Cell::new(None),
        }
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Unit claimed by the last apply, while it is in effect
    pub fn unit(&self) -> Option<TextureUnit> {
        self.unit.get()
    }
}

impl Component for TextureComponent {
    fn name(&self) -> &str {
        &self.sampler
    }

    fn priority(&self) -> i32 {
        priority::TEXTURE
    }

    fn apply(&self, ctx: &mut RenderContext) {
        match ctx.textures.push(self.target, self.texture) {
            Ok(unit) => {
                ctx.shaders.peek().set_uniform(&self.sampler, unit);
                self.unit.set(Some(unit));
            }
            Err(err) => warn!("texture '{}' not bound: {}", self.sampler, err),
        }
    }

    fn unapply(&self, ctx: &mut RenderContext) {
        if self.unit.take().is_some() {
            ctx.textures.pop();
        }
    }
}
