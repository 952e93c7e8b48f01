// src/error.rs
//! Error types shared across the engine core.
//!
//! Construction failures (shader loading, compilation, linking, invalid
//! arguments) are surfaced as [`GfxError`]. Lookup failures on the rendering
//! hot path use the same type internally but are logged and swallowed by the
//! orchestration layer, so a frame never aborts on per-frame data errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::ShaderStage;
use crate::gfx::uniform::UniformKind;

/// Errors produced by the engine core
#[derive(Debug, Error)]
pub enum GfxError {
    /// A shader source path could not be read
    #[error("failed to load shader source '{}': {source}", path.display())]
    ShaderLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A shader stage failed to compile; carries the backend info log
    #[error("{stage} stage of program '{program}' failed to compile:\n{log}")]
    Compile {
        program: String,
        stage: ShaderStage,
        log: String,
    },

    /// A program failed to link; carries the backend info log
    #[error("program '{program}' failed to link:\n{log}")]
    Link { program: String, log: String },

    #[error("uniform '{name}' is not active in program '{program}'")]
    UniformNotFound { program: String, name: String },

    #[error("uniform '{name}' in program '{program}' is declared as {expected:?} but written as {found:?}")]
    UniformTypeMismatch {
        program: String,
        name: String,
        expected: UniformKind,
        found: UniformKind,
    },

    #[error("program '{program}' does not declare block '{name}'")]
    BlockIndexNotFound { program: String, name: String },

    #[error("pop on the base of the {stack} stack")]
    StackUnderflow { stack: &'static str },

    #[error("more than {capacity} scene lights registered")]
    LightCapacityExceeded { capacity: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("program '{0}' is not linked")]
    ProgramNotLinked(String),

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// The backend refused to create an object
    #[error("graphics backend error: {0}")]
    Backend(String),
}

pub type Result<T, E = GfxError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_carries_log() {
        let err = GfxError::Compile {
            program: "lit".to_string(),
            stage: ShaderStage::Fragment,
            log: "0:3: 'k' : undeclared identifier".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("fragment"));
        assert!(text.contains("undeclared identifier"));
    }

    #[test]
    fn test_shader_load_error_has_source() {
        use std::error::Error as _;

        let err = GfxError::ShaderLoad {
            path: PathBuf::from("missing.vert"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("missing.vert"));
    }
}
