//! CPU reference backend.
//!
//! Runs the depth pass into a [`DepthTarget`] and keeps enough of the frame
//! around to answer point queries afterwards: how much light reaches a
//! world position, and what color the lit program would give a surface
//! there. The headless CLI and the scenario tests are built on it.

use anyhow::{anyhow, Result};
use glam::{Mat4, Vec2, Vec3, Vec4};
use log::debug;

use crate::frame::FrameBackend;
use crate::math;
use crate::raster::{rasterize_depth, DepthTarget, RasterStats};
use crate::rig::{CameraRig, LightRig};
use crate::scene::{Scene, Shape};
use crate::settings::{FrameConfig, SHADOW_MAP_SIZE};
use crate::shading::{self, ShadingParams, SurfaceSample};

/// What the color pass captured about the frame.
#[derive(Debug, Clone, Copy)]
struct LitFrame {
    camera_position: Vec3,
    light_position: Vec3,
    texture_matrix: Mat4,
    bias: f32,
    shading: ShadingParams,
}

#[derive(Debug)]
pub struct SoftwareBackend {
    scene: Scene,
    shadow_map: DepthTarget,
    depth_stats: RasterStats,
    pending: Option<FrameConfig>,
    lit: Option<LitFrame>,
    frustum: Vec<[Vec3; 2]>,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new(Scene::standard())
    }
}

impl SoftwareBackend {
    pub fn new(scene: Scene) -> Self {
        Self::with_map_size(scene, SHADOW_MAP_SIZE)
    }

    pub fn with_map_size(scene: Scene, size: u32) -> Self {
        Self {
            scene,
            shadow_map: DepthTarget::new(size),
            depth_stats: RasterStats::default(),
            pending: None,
            lit: None,
            frustum: Vec::new(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn shadow_map(&self) -> &DepthTarget {
        &self.shadow_map
    }

    pub fn depth_stats(&self) -> RasterStats {
        self.depth_stats
    }

    /// World-space edges of the light frustum drawn by the last frame.
    pub fn frustum_segments(&self) -> &[[Vec3; 2]] {
        &self.frustum
    }

    /// Shadow factor at a world position, `None` before the first frame.
    pub fn shadow_light_at(&self, point: Vec3) -> Option<f32> {
        let lit = self.lit?;
        let coord = math::project_point(&lit.texture_matrix, point);
        Some(shading::shadow_light(&self.shadow_map, coord, lit.bias))
    }

    /// Color the lit program produces for a point on one of the scene's
    /// objects, given its surface normal and texture coordinate.
    pub fn shade_point(&self, shape: Shape, point: Vec3, normal: Vec3, uv: Vec2) -> Result<Vec4> {
        let lit = self
            .lit
            .ok_or_else(|| anyhow!("no frame has been rendered yet"))?;
        let drawable = self
            .scene
            .drawable(shape)
            .ok_or_else(|| anyhow!("scene has no {shape}"))?;
        let shadow = self.shadow_light_at(point).unwrap_or(1.0);
        let sample = SurfaceSample {
            normal,
            surface_to_light: lit.light_position - point,
            surface_to_view: lit.camera_position - point,
            base_color: self.scene.texture.sample(uv) * drawable.uniforms.color_mult,
        };
        Ok(shading::shade(&sample, shadow, &lit.shading))
    }
}

impl FrameBackend for SoftwareBackend {
    fn begin_frame(&mut self, config: &FrameConfig) -> Result<()> {
        self.pending = Some(*config);
        self.lit = None;
        self.frustum.clear();
        Ok(())
    }

    fn depth_pass(&mut self, light: &LightRig) -> Result<()> {
        self.shadow_map.clear();
        let mut stats = RasterStats::default();
        for drawable in &self.scene.drawables {
            let drawn = rasterize_depth(
                &mut self.shadow_map,
                &light.view_projection,
                &drawable.mesh,
                &drawable.uniforms.world,
            );
            debug!("depth pass: {} -> {:?}", drawable.shape, drawn);
            stats += drawn;
        }
        self.depth_stats = stats;
        Ok(())
    }

    fn color_pass(&mut self, camera: &CameraRig, light: &LightRig, config: &FrameConfig) -> Result<()> {
        self.lit = Some(LitFrame {
            camera_position: camera.position,
            light_position: light.position,
            texture_matrix: light.texture_matrix,
            bias: config.settings.bias,
            shading: config.shading,
        });
        Ok(())
    }

    fn draw_frustum(&mut self, _camera: &CameraRig, light: &LightRig) -> Result<()> {
        let corners = light.frustum_corners();
        self.frustum = self
            .scene
            .frustum_lines
            .indices
            .chunks_exact(2)
            .map(|pair| [corners[pair[0] as usize], corners[pair[1] as usize]])
            .collect();
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        if self.pending.take().is_none() {
            return Err(anyhow!("finish_frame called without begin_frame"));
        }
        debug!(
            "software frame: {} of {} shadow texels covered",
            self.shadow_map.covered_texels(),
            self.shadow_map.texels().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameDriver;
    use crate::settings::Settings;

    fn rendered(size: u32) -> SoftwareBackend {
        let mut backend = SoftwareBackend::with_map_size(Scene::standard(), size);
        let config = FrameConfig::new(Settings::default(), 1.0);
        FrameDriver::new().render(&config, &mut backend).unwrap();
        backend
    }

    #[test]
    fn queries_need_a_frame() {
        let backend = SoftwareBackend::with_map_size(Scene::standard(), 16);
        assert!(backend.shadow_light_at(Vec3::ZERO).is_none());
        assert!(backend
            .shade_point(Shape::Plane, Vec3::ZERO, Vec3::Y, Vec2::ZERO)
            .is_err());
    }

    #[test]
    fn depth_pass_covers_the_map() {
        let backend = rendered(128);
        let stats = backend.depth_stats();
        assert_eq!(stats.triangles, backend.scene().triangle_count());
        assert!(stats.fragments_written > 0);
        assert!(backend.shadow_map().covered_texels() > 0);
        assert_eq!(backend.frustum_segments().len(), 12);
    }

    #[test]
    fn shaded_plane_is_darker_in_shadow() {
        let backend = rendered(512);
        let lit = backend
            .shade_point(Shape::Plane, Vec3::new(5.0, 0.0, 4.0), Vec3::Y, Vec2::new(0.01, 0.01))
            .unwrap();
        let shadowed = backend
            .shade_point(Shape::Plane, Vec3::new(3.13, 0.0, -1.13), Vec3::Y, Vec2::new(0.01, 0.01))
            .unwrap();
        assert!(lit.z > shadowed.z);
        // ambient only: 10 % of the blue-tinted checker texel
        assert!((shadowed.z - 0.1).abs() < 1e-4);
    }
}
