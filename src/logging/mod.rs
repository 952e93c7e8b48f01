// src/logging/mod.rs
//! Logging utilities.
//!
//! The engine reports every tolerant failure (missing uniforms, stack
//! underflow, light overflow) through the `log` facade. This module only
//! bootstraps a backend for applications that do not bring their own.

mod init;

pub use init::{init_logging, LoggingConfig};
