// src/gfx/scene/mod.rs
//! # Scene Graph
//!
//! Nodes carry components and children. A frame packs the lights, uploads the
//! per-frame blocks, then walks the tree: each node applies its components
//! in ascending priority, visits its children, and unapplies in descending
//! priority.
//!
//! - [`Scene`] - root node plus active camera; [`Scene::render_frame`]
//! - [`Node`] - components sorted by priority, children, weak parent
//! - [`Component`] - traversal hooks; built-ins in [`components`]

pub mod component;
pub mod components;
mod node;
mod scene;

pub use component::{priority, Component};
pub use node::{Node, NodeRef};
pub use scene::Scene;
