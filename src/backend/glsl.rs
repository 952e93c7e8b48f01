// src/backend/glsl.rs
//! Minimal GLSL declaration scanner
//!
//! Extracts the top-level `uniform` variables and the uniform/storage block
//! names a shader declares. This is what the headless backend reports as the
//! program's active interface; it is not a GLSL parser and ignores everything
//! inside function bodies and block members.

use super::StorageClass;
use crate::gfx::uniform::UniformKind;

/// A loose `uniform` variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredUniform {
    pub name: String,
    pub type_name: String,
    pub array_len: Option<u32>,
}

/// A named interface block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredBlock {
    pub name: String,
    pub storage: StorageClass,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    pub uniforms: Vec<DeclaredUniform>,
    pub blocks: Vec<DeclaredBlock>,
}

const SKIPPED_QUALIFIERS: &[&str] = &[
    "highp", "mediump", "lowp", "readonly", "writeonly", "coherent", "volatile", "restrict",
    "const", "flat",
];

/// Maps a GLSL type name to the uniform kind the engine dispatches
pub fn uniform_kind(type_name: &str) -> Option<UniformKind> {
    match type_name {
        "int" => Some(UniformKind::Int),
        "float" => Some(UniformKind::Float),
        "vec2" => Some(UniformKind::Vec2),
        "vec3" => Some(UniformKind::Vec3),
        "vec4" => Some(UniformKind::Vec4),
        "mat3" => Some(UniformKind::Mat3),
        "mat4" => Some(UniformKind::Mat4),
        t if t.starts_with("sampler") || t.starts_with("isampler") || t.starts_with("usampler") => {
            Some(UniformKind::Sampler)
        }
        _ => None,
    }
}

/// Scans `source` for top-level uniform and block declarations
pub fn scan(source: &str) -> Declarations {
    let tokens = tokenize(source);
    let mut decls = Declarations::default();
    let mut depth = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "{" => depth += 1,
            "}" => depth = depth.saturating_sub(1),
            "layout" if depth == 0 => {
                i = skip_parens(&tokens, i + 1);
                continue;
            }
            "uniform" | "buffer" if depth == 0 => {
                let storage = if token == "uniform" {
                    StorageClass::Uniform
                } else {
                    StorageClass::ShaderStorage
                };
                i = parse_declaration(&tokens, i + 1, storage, &mut decls);
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    decls
}

fn parse_declaration(
    tokens: &[String],
    mut i: usize,
    storage: StorageClass,
    decls: &mut Declarations,
) -> usize {
    while i < tokens.len() && SKIPPED_QUALIFIERS.contains(&tokens[i].as_str()) {
        i += 1;
    }
    let Some(type_name) = tokens.get(i).cloned() else {
        return i;
    };
    i += 1;

    if tokens.get(i).map(String::as_str) == Some("{") {
        decls.blocks.push(DeclaredBlock {
            name: type_name,
            storage,
        });
        // The opening brace is left for the caller's depth tracking
        return i;
    }

    if storage == StorageClass::ShaderStorage {
        return i;
    }

    loop {
        let Some(name) = tokens.get(i).filter(|t| is_identifier(t)).cloned() else {
            return i;
        };
        i += 1;

        let mut array_len = None;
        if tokens.get(i).map(String::as_str) == Some("[") {
            array_len = tokens.get(i + 1).and_then(|t| t.parse::<u32>().ok());
            while i < tokens.len() && tokens[i] != "]" {
                i += 1;
            }
            i += 1;
        }

        decls.uniforms.push(DeclaredUniform {
            name,
            type_name: type_name.clone(),
            array_len,
        });

        match tokens.get(i).map(String::as_str) {
            Some(",") => i += 1,
            _ => return i,
        }
    }
}

fn skip_parens(tokens: &[String], mut i: usize) -> usize {
    if tokens.get(i).map(String::as_str) != Some("(") {
        return i;
    }
    let mut depth = 0usize;
    while i < tokens.len() {
        match tokens[i].as_str() {
            "(" => depth += 1,
            ")" => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    i
}

fn is_identifier(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for line in strip_comments(source).lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let mut chars = line.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(word);
            } else {
                tokens.push(c.to_string());
                chars.next();
            }
        }
    }
    tokens
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' && chars.peek() == Some(&'/') {
            for c in chars.by_ref() {
                if c == '\n' {
                    out.push('\n');
                    break;
                }
            }
        } else if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = '\0';
            for c in chars.by_ref() {
                if c == '\n' {
                    out.push('\n');
                }
                if prev == '*' && c == '/' {
                    break;
                }
                prev = c;
            }
        } else {
            out.push(c);
        }
    }
    out
}
