// src/gfx/scene/component.rs
use cgmath::Matrix4;

use crate::gfx::context::RenderContext;

use super::NodeRef;

/// Traversal order of the built-in components; lower runs first on enter
pub mod priority {
    pub const TRANSFORM: i32 = 100;
    pub const SKYBOX: i32 = 200;
    pub const SHADER: i32 = 300;
    /// After the node's own program is pushed, so the planes reach the program that draws it
    pub const CLIP_PLANE: i32 = 310;
    pub const TEXTURE: i32 = 350;
    pub const VARIABLE: i32 = 400;
    pub const LIGHT: i32 = 450;
    pub const MESH: i32 = 500;
}

/// Behaviour attached to a scene node
///
/// On enter, a node applies its components in ascending priority; after its
/// children it unapplies them in descending priority. Whatever `apply` pushes
/// onto a stack, `unapply` must pop.
pub trait Component {
    fn name(&self) -> &str;

    fn priority(&self) -> i32;

    fn apply(&self, ctx: &mut RenderContext);

    fn unapply(&self, _ctx: &mut RenderContext) {}

    /// Contribution to the node's local-to-parent matrix
    fn local_transform(&self) -> Option<Matrix4<f32>> {
        None
    }

    /// Called once when the component is added to `node`
    fn on_attach(&self, _node: &NodeRef) {}
}
