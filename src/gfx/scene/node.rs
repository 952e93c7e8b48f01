// src/gfx/scene/node.rs
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use cgmath::{Matrix4, SquareMatrix};
use log::debug;

use crate::gfx::context::RenderContext;

use super::Component;

pub type NodeRef = Rc<RefCell<Node>>;

/// A scene-graph node: components plus children
pub struct Node {
    name: String,
    components: Vec<Rc<dyn Component>>,
    children: Vec<NodeRef>,
    parent: Weak<RefCell<Node>>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> NodeRef {
        Rc::new(RefCell::new(Self {
            name: name.into(),
            components: Vec::new(),
            children: Vec::new(),
            parent: Weak::new(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[Rc<dyn Component>] {
        &self.components
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.upgrade()
    }

    /// Adds `component`, keeping the list sorted by priority
    ///
    /// Components of equal priority keep insertion order.
    pub fn add_component(node: &NodeRef, component: Rc<dyn Component>) {
        {
            let mut this = node.borrow_mut();
            let pos = this
                .components
                .partition_point(|c| c.priority() <= component.priority());
            debug!("node '{}': + {}", this.name, component.name());
            this.components.insert(pos, Rc::clone(&component));
        }
        component.on_attach(node);
    }

    pub fn remove_component(node: &NodeRef, component: &Rc<dyn Component>) -> bool {
        let mut this = node.borrow_mut();
        let before = this.components.len();
        this.components.retain(|c| !Rc::ptr_eq(c, component));
        this.components.len() != before
    }

    pub fn add_child(parent: &NodeRef, child: NodeRef) {
        child.borrow_mut().parent = Rc::downgrade(parent);
        parent.borrow_mut().children.push(child);
    }

    /// Product of the components' local matrices in priority order
    pub fn local_transform(&self) -> Matrix4<f32> {
        self.components
            .iter()
            .filter_map(|c| c.local_transform())
            .fold(Matrix4::identity(), |acc, m| acc * m)
    }

    /// Local-to-world matrix: the local matrices of every ancestor, root first
    pub fn world_transform(node: &NodeRef) -> Matrix4<f32> {
        let mut world = node.borrow().local_transform();
        let mut current = node.borrow().parent();
        while let Some(ancestor) = current {
            world = ancestor.borrow().local_transform() * world;
            current = ancestor.borrow().parent();
        }
        world
    }

    /// Applies the subtree rooted at `node`
    pub fn traverse(node: &NodeRef, ctx: &mut RenderContext) {
        let (components, children) = {
            let this = node.borrow();
            (this.components.clone(), this.children.clone())
        };

        for component in &components {
            component.apply(ctx);
        }
        for child in &children {
            Node::traverse(child, ctx);
        }
        for component in components.iter().rev() {
            component.unapply(ctx);
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let components: Vec<&str> = self.components.iter().map(|c| c.name()).collect();
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("components", &components)
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::components::TransformComponent;
    use cgmath::Vector3;

    #[test]
    fn test_world_transform_composes_ancestors() {
        let root = Node::new("root");
        let child = Node::new("child");
        Node::add_component(
            &root,
            Rc::new(TransformComponent::from_translation(Vector3::new(1.0, 0.0, 0.0))),
        );
        Node::add_component(&child, Rc::new(TransformComponent::from_scale(2.0)));
        Node::add_child(&root, Rc::clone(&child));

        let expected = Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)) * Matrix4::from_scale(2.0);
        assert_eq!(Node::world_transform(&child), expected);
        assert!(Rc::ptr_eq(&child.borrow().parent().unwrap(), &root));
    }

    #[test]
    fn test_components_sorted_by_priority() {
        use crate::gfx::scene::components::VariableComponent;

        let node = Node::new("n");
        Node::add_component(&node, Rc::new(VariableComponent::new()));
        Node::add_component(&node, Rc::new(TransformComponent::identity()));
        let priorities: Vec<i32> = node.borrow().components().iter().map(|c| c.priority()).collect();
        assert_eq!(priorities, vec![100, 400]);
    }
}
