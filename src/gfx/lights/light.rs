// src/gfx/lights/light.rs
use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, Vector4, Zero};

use crate::config::MAX_SCENE_LIGHTS;

/// Wire values of `LightData::light_type`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Inactive = 0,
    Directional = 1,
    Point = 2,
    Spot = 3,
}

/// Phong colour terms shared by every light kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightColors {
    pub ambient: Vector4<f32>,
    pub diffuse: Vector4<f32>,
    pub specular: Vector4<f32>,
}

impl LightColors {
    /// White light with a faint ambient term
    pub fn white() -> Self {
        Self {
            ambient: Vector4::new(0.1, 0.1, 0.1, 1.0),
            diffuse: Vector4::new(1.0, 1.0, 1.0, 1.0),
            specular: Vector4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

impl Default for LightColors {
    fn default() -> Self {
        Self::white()
    }
}

/// Distance falloff `1 / (constant + linear d + quadratic d^2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

/// A light in the local space of the node carrying it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Directional {
        colors: LightColors,
        direction: Vector3<f32>,
    },
    Point {
        colors: LightColors,
        position: Point3<f32>,
        attenuation: Attenuation,
    },
    Spot {
        colors: LightColors,
        position: Point3<f32>,
        direction: Vector3<f32>,
        attenuation: Attenuation,
        /// Half-angle of the cone
        cutoff: Rad<f32>,
    },
}

impl Light {
    pub fn light_type(&self) -> LightType {
        match self {
            Light::Directional { .. } => LightType::Directional,
            Light::Point { .. } => LightType::Point,
            Light::Spot { .. } => LightType::Spot,
        }
    }

    pub fn colors(&self) -> &LightColors {
        match self {
            Light::Directional { colors, .. }
            | Light::Point { colors, .. }
            | Light::Spot { colors, .. } => colors,
        }
    }
}

/// One packed light record, std430 (112 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightData {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// `(constant, linear, quadratic, cos(cutoff))`
    pub attenuation: [f32; 4],
    pub light_type: i32,
    pub _pad: [i32; 3],
}

impl LightData {
    /// Packs `light` after transforming it by the world matrix `world`
    pub fn pack(light: &Light, world: Matrix4<f32>) -> Self {
        let colors = light.colors();
        let mut data = LightData {
            ambient: colors.ambient.into(),
            diffuse: colors.diffuse.into(),
            specular: colors.specular.into(),
            light_type: light.light_type() as i32,
            ..Default::default()
        };

        match *light {
            Light::Directional { direction, .. } => {
                data.direction = world_direction(world, direction);
            }
            Light::Point {
                position,
                attenuation,
                ..
            } => {
                data.position = world_position(world, position);
                data.attenuation = [attenuation.constant, attenuation.linear, attenuation.quadratic, 0.0];
            }
            Light::Spot {
                position,
                direction,
                attenuation,
                cutoff,
                ..
            } => {
                data.position = world_position(world, position);
                data.direction = world_direction(world, direction);
                data.attenuation = [
                    attenuation.constant,
                    attenuation.linear,
                    attenuation.quadratic,
                    cutoff.0.cos(),
                ];
            }
        }
        data
    }

    pub fn light_type(&self) -> i32 {
        self.light_type
    }
}

fn world_direction(world: Matrix4<f32>, direction: Vector3<f32>) -> [f32; 4] {
    let d = world * direction.extend(0.0);
    if d.is_zero() {
        return [0.0; 4];
    }
    d.normalize().into()
}

fn world_position(world: Matrix4<f32>, position: Point3<f32>) -> [f32; 4] {
    let p = world * position.to_homogeneous();
    [p.x, p.y, p.z, 1.0]
}

/// Image of the `SceneLights` block: `MAX_SCENE_LIGHTS * 112 + 16` bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneLightsBlock {
    pub lights: [LightData; MAX_SCENE_LIGHTS],
    pub active_count: i32,
    pub _pad: [i32; 3],
}

impl Default for SceneLightsBlock {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

impl SceneLightsBlock {
    /// Marks every record inactive and resets the count
    pub fn clear(&mut self) {
        for light in self.lights.iter_mut() {
            light.light_type = LightType::Inactive as i32;
        }
        self.active_count = 0;
    }
}
