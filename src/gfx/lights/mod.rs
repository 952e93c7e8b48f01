// src/gfx/lights/mod.rs
//! # Scene Lights
//!
//! [`LightManager`] packs every registered [`LightSource`] into the
//! `SceneLights` block, transformed to world space, once per frame.

mod light;
mod manager;

pub use light::{Attenuation, Light, LightColors, LightData, LightType, SceneLightsBlock};
pub use manager::{LightManager, LightSource};
