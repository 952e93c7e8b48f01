// src/gfx/shader/source.rs
use std::path::{Path, PathBuf};

use crate::config;
use crate::error::{GfxError, Result};

/// Shader text or the path of a file holding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    Inline(String),
    Path(PathBuf),
}

impl ShaderSource {
    /// Classifies `input` as inline source or a file path
    ///
    /// A newline, a `#version` directive or a `void main` forces inline
    /// interpretation; anything else is taken as a path.
    pub fn detect(input: &str) -> Self {
        if input.contains('\n') || input.contains("#version") || input.contains("void main") {
            ShaderSource::Inline(input.to_string())
        } else {
            ShaderSource::Path(PathBuf::from(input))
        }
    }

    /// Returns the source text, reading the file for path sources
    pub fn load(&self) -> Result<String> {
        let text = match self {
            ShaderSource::Inline(text) => text.clone(),
            ShaderSource::Path(path) => {
                std::fs::read_to_string(path).map_err(|source| GfxError::ShaderLoad {
                    path: path.clone(),
                    source,
                })?
            }
        };
        Ok(inject_defines(&text))
    }
}

impl From<&str> for ShaderSource {
    fn from(input: &str) -> Self {
        ShaderSource::detect(input)
    }
}

impl From<String> for ShaderSource {
    fn from(input: String) -> Self {
        ShaderSource::detect(&input)
    }
}

impl From<&Path> for ShaderSource {
    fn from(path: &Path) -> Self {
        ShaderSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ShaderSource {
    fn from(path: PathBuf) -> Self {
        ShaderSource::Path(path)
    }
}

/// Inserts the engine constants after `#version` when the source uses them
/// without defining them
fn inject_defines(source: &str) -> String {
    if !source.contains("MAX_SCENE_LIGHTS") || source.contains("#define MAX_SCENE_LIGHTS") {
        return source.to_string();
    }

    let defines = config::shader_defines();
    let mut out = String::with_capacity(source.len() + defines.len());
    let mut injected = false;
    for line in source.lines() {
        out.push_str(line);
        out.push('\n');
        if !injected && line.trim_start().starts_with("#version") {
            out.push_str(&defines);
            injected = true;
        }
    }
    if !injected {
        out.insert_str(0, &defines);
    }
    out
}
