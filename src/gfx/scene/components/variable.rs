// src/gfx/scene/components/variable.rs
use std::cell::RefCell;
use std::rc::Rc;

use crate::gfx::context::RenderContext;
use crate::gfx::scene::component::{priority, Component};
use crate::gfx::uniform::{UniformSlot, UniformType};

/// Node-local uniforms, written to the active program on every visit
#[derive(Debug, Default)]
pub struct VariableComponent {
    slots: RefCell<Vec<UniformSlot>>,
}

impl VariableComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uniform<T: UniformType>(self, name: &str, provider: impl Fn() -> T + 'static) -> Self {
        self.add_uniform(name, provider);
        self
    }

    pub fn add_uniform<T: UniformType>(&self, name: &str, provider: impl Fn() -> T + 'static) {
        self.slots.borrow_mut().push(UniformSlot::new(name, provider));
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

impl Component for VariableComponent {
    fn name(&self) -> &str {
        "variable"
    }

    fn priority(&self) -> i32 {
        priority::VARIABLE
    }

    fn apply(&self, ctx: &mut RenderContext) {
        let program = Rc::clone(ctx.shaders.top());
        for slot in self.slots.borrow_mut().iter_mut() {
            program.bind_slot(slot);
            slot.apply(&ctx.gpu);
        }
    }
}
