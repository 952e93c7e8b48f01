// src/gfx/scene/components/light.rs
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use cgmath::{Matrix4, SquareMatrix};

use crate::gfx::context::RenderContext;
use crate::gfx::lights::{Light, LightSource};
use crate::gfx::scene::component::{priority, Component};
use crate::gfx::scene::{Node, NodeRef};

/// Emits a light from the node it is attached to
///
/// The light manager reads it before traversal; visiting it does nothing.
#[derive(Debug)]
pub struct LightComponent {
    light: Cell<Light>,
    node: RefCell<Weak<RefCell<Node>>>,
}

impl LightComponent {
    /// Creates the component and registers it with the context's light manager
    pub fn new(ctx: &mut RenderContext, light: Light) -> Rc<Self> {
        let component = Rc::new(Self {
            light: Cell::new(light),
            node: RefCell::new(Weak::new()),
        });
        let source: Rc<dyn LightSource> = component.clone();
        ctx.register_light(&source);
        component
    }

    pub fn set_light(&self, light: Light) {
        self.light.set(light);
    }
}

impl LightSource for LightComponent {
    fn light(&self) -> Light {
        self.light.get()
    }

    fn world_transform(&self) -> Matrix4<f32> {
        self.node
            .borrow()
            .upgrade()
            .map(|node| Node::world_transform(&node))
            .unwrap_or_else(Matrix4::identity)
    }
}

impl Component for LightComponent {
    fn name(&self) -> &str {
        "light"
    }

    fn priority(&self) -> i32 {
        priority::LIGHT
    }

    fn apply(&self, _ctx: &mut RenderContext) {}

    fn on_attach(&self, node: &NodeRef) {
        *self.node.borrow_mut() = Rc::downgrade(node);
    }
}
