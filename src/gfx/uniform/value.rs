// src/gfx/uniform/value.rs
use cgmath::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// Texture unit index, uploaded to `sampler` uniforms as an `int`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureUnit(pub u32);

/// Primitive uniform types the engine dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Sampler,
}

/// A uniform value tagged with its type
///
/// Matrices are column-major (cgmath's native layout) and are uploaded
/// without transposition.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vector2<f32>),
    Vec3(Vector3<f32>),
    Vec4(Vector4<f32>),
    Mat3(Matrix3<f32>),
    Mat4(Matrix4<f32>),
    Sampler(TextureUnit),
    /// `vec4 name[N]`, written from element 0
    Vec4Array(Vec<Vector4<f32>>),
}

impl UniformValue {
    /// Kind of one element; arrays report their element type
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) | UniformValue::Vec4Array(_) => UniformKind::Vec4,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Sampler(_) => UniformKind::Sampler,
        }
    }
}

impl UniformKind {
    /// Whether a value of kind `written` may be stored in a uniform declared as `self`
    ///
    /// Samplers are integers on the wire, so the two are interchangeable.
    pub fn accepts(self, written: UniformKind) -> bool {
        matches!(
            (self, written),
            (UniformKind::Sampler, UniformKind::Int) | (UniformKind::Int, UniformKind::Sampler)
        ) || self == written
    }
}

/// Rust types that can back a uniform provider
pub trait UniformType: Into<UniformValue> + 'static {
    const KIND: UniformKind;
}

macro_rules! uniform_type {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for UniformValue {
            fn from(value: $ty) -> Self {
                UniformValue::$variant(value)
            }
        }

        impl UniformType for $ty {
            const KIND: UniformKind = UniformKind::$variant;
        }
    };
}

uniform_type!(i32, Int);
uniform_type!(f32, Float);
uniform_type!(Vector2<f32>, Vec2);
uniform_type!(Vector3<f32>, Vec3);
uniform_type!(Vector4<f32>, Vec4);
uniform_type!(Matrix3<f32>, Mat3);
uniform_type!(Matrix4<f32>, Mat4);
uniform_type!(TextureUnit, Sampler);

impl From<Vec<Vector4<f32>>> for UniformValue {
    fn from(values: Vec<Vector4<f32>>) -> Self {
        UniformValue::Vec4Array(values)
    }
}
