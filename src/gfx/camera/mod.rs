// src/gfx/camera/mod.rs
//! # Cameras
//!
//! - [`Camera`] - view/projection source trait
//! - [`OrbitCamera`] (alias [`Camera3D`]) - perspective orbit camera
//! - [`Camera2D`] - orthographic camera
//! - [`CameraPublisher`] - installs the active camera as provider of the
//!   engine camera blocks

pub mod camera_utils;
pub mod orbit_camera;
pub mod ortho_camera;
mod publisher;

pub use camera_utils::{Camera, CameraMatricesBlock, CameraPositionBlock};
pub use orbit_camera::{Camera3D, OrbitCamera, OrbitCameraBounds};
pub use ortho_camera::Camera2D;
pub use publisher::{CameraPublisher, SharedCamera};
