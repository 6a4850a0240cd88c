//! Reference implementation of the lit fragment program.
//!
//! The WGSL in `render::shaders` evaluates the same model per pixel; the
//! functions here let the software backend and the tests answer "how lit is
//! this point" without a GPU.

use glam::{Vec2, Vec3, Vec4};

/// Anything the shadow lookup can read depth texels from.
pub trait DepthSampler {
    /// Edge length in texels; the map is square.
    fn size(&self) -> u32;
    /// Nearest texel at `uv`, clamped to the edge.
    fn sample(&self, uv: Vec2) -> f32;
}

/// Constants of the lighting model that are not exposed as settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingParams {
    pub light_color: Vec3,
    pub shininess: f32,
    /// Fraction of the base color that is always visible.
    pub ambient: f32,
}

impl Default for ShadingParams {
    fn default() -> Self {
        Self {
            light_color: Vec3::ONE,
            shininess: 150.0,
            ambient: 0.1,
        }
    }
}

/// GLSL `step`: 0 below the edge, 1 at or above it.
pub fn step(edge: f32, x: f32) -> f32 {
    if x < edge {
        0.0
    } else {
        1.0
    }
}

/// Whether a projected coordinate lands on the shadow map.
pub fn in_shadow_range(coord: Vec3) -> bool {
    (0.0..=1.0).contains(&coord.x) && (0.0..=1.0).contains(&coord.y)
}

/// 3x3 percentage-closer filter around `coord.xy`.
///
/// Each texel passes when its stored depth is at least `coord.z + bias`.
/// The result is the fraction of passing texels.
pub fn pcf_shadow_factor<S: DepthSampler + ?Sized>(map: &S, coord: Vec3, bias: f32) -> f32 {
    let texel = 1.0 / map.size().max(1) as f32;
    let reference = coord.z + bias;
    let mut lit = 0.0;
    for x in -1..=1 {
        for y in -1..=1 {
            let offset = Vec2::new(x as f32, y as f32) * texel;
            lit += step(reference, map.sample(coord.truncate() + offset));
        }
    }
    lit / 9.0
}

/// Shadow attenuation for a projected coordinate. Anything outside the
/// light's footprint counts as fully lit.
pub fn shadow_light<S: DepthSampler + ?Sized>(map: &S, coord: Vec3, bias: f32) -> f32 {
    if in_shadow_range(coord) {
        pcf_shadow_factor(map, coord, bias)
    } else {
        1.0
    }
}

/// Interpolated inputs of one fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub normal: Vec3,
    pub surface_to_light: Vec3,
    pub surface_to_view: Vec3,
    /// Base texture color already multiplied by the object's color.
    pub base_color: Vec4,
}

/// Blinn-Phong with shadow-gated diffuse and specular:
/// `ambient + (diffuse + specular) * shadow_light`.
///
/// Specular only appears where the diffuse term is positive. The output is
/// clamped to `[0, 1]` the way a unorm render target would store it.
pub fn shade(sample: &SurfaceSample, shadow_light: f32, params: &ShadingParams) -> Vec4 {
    let normal = sample.normal.normalize_or_zero();
    let to_light = sample.surface_to_light.normalize_or_zero();
    let to_view = sample.surface_to_view.normalize_or_zero();
    let half_vector = (to_light + to_view).normalize_or_zero();

    let light = normal.dot(to_light);
    let specular = if light > 0.0 {
        normal.dot(half_vector).max(0.0).powf(params.shininess)
    } else {
        0.0
    };

    let base = sample.base_color.truncate();
    let ambient = base * params.ambient;
    let diffuse = base * light * params.light_color;
    let specular = params.light_color * specular;
    let color = ambient + (diffuse + specular) * shadow_light;
    color.clamp(Vec3::ZERO, Vec3::ONE).extend(sample.base_color.w)
}
