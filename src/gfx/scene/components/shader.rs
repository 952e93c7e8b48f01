// src/gfx/scene/components/shader.rs
use std::cell::Cell;
use std::rc::Rc;

use crate::gfx::context::RenderContext;
use crate::gfx::scene::component::{priority, Component};
use crate::gfx::shader::ShaderProgram;

/// Shades the node's subtree with `program`
///
/// The program's blocks are bound on first use and again whenever the set of
/// registered blocks has changed since.
#[derive(Debug)]
pub struct ShaderComponent {
    program: Rc<ShaderProgram>,
    bound_revision: Cell<Option<u64>>,
}

impl ShaderComponent {
    pub fn new(program: Rc<ShaderProgram>) -> Self {
        Self {
            program,
            bound_revision: Cell::new(None),
        }
    }

    pub fn program(&self) -> &Rc<ShaderProgram> {
        &self.program
    }
}

impl Component for ShaderComponent {
    fn name(&self) -> &str {
        self.program.label()
    }

    fn priority(&self) -> i32 {
        priority::SHADER
    }

    fn apply(&self, ctx: &mut RenderContext) {
        let revision = ctx.resources.revision();
        if self.bound_revision.replace(Some(revision)) != Some(revision) {
            ctx.resources.bind_all(&self.program);
        }
        ctx.shaders.push(Rc::clone(&self.program));
    }

    fn unapply(&self, ctx: &mut RenderContext) {
        ctx.shaders.pop();
    }
}
