// src/gfx/uniform/mod.rs
//! Per-uniform plumbing
//!
//! - [`UniformValue`] / [`UniformKind`] - the tagged primitive types a uniform can hold
//! - [`UniformSlot`] - one named uniform with a pull provider and a memoized location
//! - [`PendingQueue`] - writes issued while their program was not bound

mod pending;
mod slot;
mod value;

pub use pending::{PendingCommand, PendingQueue};
pub use slot::{SlotBinding, UniformSlot};
pub use value::{TextureUnit, UniformKind, UniformType, UniformValue};
