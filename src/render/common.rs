//! Uniform blocks shared with the WGSL programs.
//!
//! Every struct here mirrors a WGSL struct field for field; sizes are
//! multiples of 16 bytes so the same bytes satisfy uniform layout rules.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::math::GL_TO_WGPU;
use crate::rig::{CameraRig, LightRig};
use crate::scene::ObjectUniforms;
use crate::settings::FrameConfig;

/// Flat color for the frustum wireframe.
pub const FRUSTUM_COLOR: Vec4 = Vec4::ONE;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatGlobals {
    pub view_projection: [[f32; 4]; 4],
}

impl FlatGlobals {
    /// Takes a GL-convention view-projection and converts it to wgpu clip
    /// space.
    pub fn new(view_projection: &Mat4) -> Self {
        Self {
            view_projection: (GL_TO_WGPU * *view_projection).to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatObject {
    pub world: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl FlatObject {
    pub fn new(world: &Mat4, color: Vec4) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            color: color.to_array(),
        }
    }

    pub fn frustum(light: &LightRig) -> Self {
        Self::new(&light.frustum, FRUSTUM_COLOR)
    }
}

impl From<&ObjectUniforms> for FlatObject {
    fn from(uniforms: &ObjectUniforms) -> Self {
        Self::new(&uniforms.world, uniforms.color)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LitGlobals {
    pub view_projection: [[f32; 4]; 4],
    pub texture_matrix: [[f32; 4]; 4],
    pub light_position: [f32; 4],
    pub view_position: [f32; 4],
    pub light_color: [f32; 4],
    /// bias, shininess, ambient, shadow map size
    pub params: [f32; 4],
}

impl LitGlobals {
    pub fn new(
        camera: &CameraRig,
        light: &LightRig,
        config: &FrameConfig,
        shadow_map_size: u32,
    ) -> Self {
        let shading = &config.shading;
        Self {
            view_projection: (GL_TO_WGPU * camera.view_projection).to_cols_array_2d(),
            texture_matrix: light.texture_matrix.to_cols_array_2d(),
            light_position: light.position.extend(1.0).to_array(),
            view_position: camera.position.extend(1.0).to_array(),
            light_color: shading.light_color.extend(1.0).to_array(),
            params: [
                config.settings.bias,
                shading.shininess,
                shading.ambient,
                shadow_map_size as f32,
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LitObject {
    pub world: [[f32; 4]; 4],
    pub color_mult: [f32; 4],
}

impl From<&ObjectUniforms> for LitObject {
    fn from(uniforms: &ObjectUniforms) -> Self {
        Self {
            world: uniforms.world.to_cols_array_2d(),
            color_mult: uniforms.color_mult.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Scene, Shape};
    use crate::settings::Settings;
    use glam::Vec3;

    #[test]
    fn uniform_sizes_are_16_byte_aligned() {
        for size in [
            std::mem::size_of::<FlatGlobals>(),
            std::mem::size_of::<FlatObject>(),
            std::mem::size_of::<LitGlobals>(),
            std::mem::size_of::<LitObject>(),
        ] {
            assert_eq!(size % 16, 0);
        }
        assert_eq!(std::mem::size_of::<LitGlobals>(), 192);
    }

    #[test]
    fn lit_globals_carry_frame_parameters() {
        let settings = Settings::default();
        let config = FrameConfig::new(settings, 1.5);
        let light = LightRig::from_settings(&settings).unwrap();
        let camera = CameraRig::from_settings(&settings, config.aspect).unwrap();
        let globals = LitGlobals::new(&camera, &light, &config, 2048);
        assert_eq!(globals.params, [-0.0001, 150.0, 0.1, 2048.0]);
        assert_eq!(globals.light_position, [2.5, 4.8, 4.3, 1.0]);
        assert_eq!(globals.view_position, [6.0, 5.0, 7.0, 1.0]);
    }

    #[test]
    fn flat_globals_map_depth_to_unit_range() {
        let light = LightRig::from_settings(&Settings::default()).unwrap();
        let globals = FlatGlobals::new(&light.view_projection);
        let clip = Mat4::from_cols_array_2d(&globals.view_projection);
        let point = Vec3::new(5.0, 0.0, 4.0);
        let wgpu_depth = clip.project_point3(point).z;
        // the GPU depth matches the texture-space depth used for lookups
        assert!((wgpu_depth - light.project(point).z).abs() < 1e-5);
    }

    #[test]
    fn per_object_blocks_follow_the_scene() {
        let scene = Scene::standard();
        let sphere = scene.drawable(Shape::Sphere).unwrap();
        let lit = LitObject::from(&sphere.uniforms);
        let flat = FlatObject::from(&sphere.uniforms);
        assert_eq!(lit.color_mult, [1.0, 0.5, 0.5, 1.0]);
        assert_eq!(flat.color, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(lit.world, flat.world);
    }
}
