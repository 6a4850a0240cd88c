use glam::{Mat4, Vec3};

use crate::math::{self, MathError};
use crate::mesh::cube_lines;
use crate::settings::{
    Settings, CAMERA_FAR, CAMERA_FOV_DEGREES, CAMERA_NEAR, CAMERA_Z, LIGHT_FAR, LIGHT_NEAR,
};

/// Everything the frame needs to know about the light, derived from one
/// settings snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct LightRig {
    pub position: Vec3,
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    /// World space to shadow-map texture space (`[0, 1]^3`).
    pub texture_matrix: Mat4,
    /// Maps the `[-1, 1]^3` cube onto the light frustum in world space.
    pub frustum: Mat4,
    pub perspective: bool,
}

impl LightRig {
    pub fn from_settings(settings: &Settings) -> Result<Self, MathError> {
        let position = settings.light_position;
        let world = math::look_at_with_fallback(position, settings.light_target, Vec3::Y)?;
        let view = math::inverse(&world)?;
        let projection = light_projection(settings);
        let texture_matrix = math::texture_matrix(&projection, &world)?;
        let frustum = world * math::inverse(&projection)?;
        Ok(Self {
            position,
            world,
            view,
            projection,
            view_projection: projection * view,
            texture_matrix,
            frustum,
            perspective: settings.perspective,
        })
    }

    /// Shadow-map coordinate of a world-space point.
    pub fn project(&self, point: Vec3) -> Vec3 {
        math::project_point(&self.texture_matrix, point)
    }

    /// World-space corners of the light frustum, in [`cube_lines`] order.
    pub fn frustum_corners(&self) -> Vec<Vec3> {
        cube_lines()
            .positions
            .iter()
            .map(|corner| math::project_point(&self.frustum, Vec3::from(*corner)))
            .collect()
    }
}

/// Perspective or orthographic light projection between the fixed light
/// near and far planes.
pub fn light_projection(settings: &Settings) -> Mat4 {
    let width = settings.projection_width;
    let height = settings.projection_height;
    if settings.perspective {
        math::perspective(
            settings.field_of_view.to_radians(),
            width / height,
            LIGHT_NEAR,
            LIGHT_FAR,
        )
    } else {
        math::orthographic(
            -width / 2.0,
            width / 2.0,
            -height / 2.0,
            height / 2.0,
            LIGHT_NEAR,
            LIGHT_FAR,
        )
    }
}

/// Viewer matrices for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraRig {
    pub position: Vec3,
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
}

impl CameraRig {
    pub fn from_settings(settings: &Settings, aspect: f32) -> Result<Self, MathError> {
        let position = Vec3::new(settings.camera_x, settings.camera_y, CAMERA_Z);
        let world = math::look_at(position, Vec3::ZERO, Vec3::Y)?;
        let view = math::inverse(&world)?;
        let projection = math::perspective(
            CAMERA_FOV_DEGREES.to_radians(),
            aspect,
            CAMERA_NEAR,
            CAMERA_FAR,
        );
        Ok(Self {
            position,
            world,
            view,
            projection,
            view_projection: projection * view,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn view_is_inverse_of_world() {
        let light = LightRig::from_settings(&Settings::default()).unwrap();
        assert!((light.view * light.world).abs_diff_eq(Mat4::IDENTITY, EPSILON));
        let camera = CameraRig::from_settings(&Settings::default(), 1.5).unwrap();
        assert!((camera.view * camera.world).abs_diff_eq(Mat4::IDENTITY, EPSILON));
        assert_eq!(camera.position, Vec3::new(6.0, 5.0, 7.0));
    }

    #[test]
    fn texture_matrix_matches_its_definition() {
        let light = LightRig::from_settings(&Settings::default()).unwrap();
        let bias = Mat4::from_translation(Vec3::splat(0.5)) * Mat4::from_scale(Vec3::splat(0.5));
        let expected = bias * light.projection * light.world.inverse();
        assert!(light.texture_matrix.abs_diff_eq(expected, EPSILON));
    }

    #[test]
    fn projections_agree_on_the_optical_axis() {
        let perspective = Settings::default();
        let orthographic = Settings {
            perspective: false,
            ..perspective
        };
        let persp_light = LightRig::from_settings(&perspective).unwrap();
        let ortho_light = LightRig::from_settings(&orthographic).unwrap();
        assert!(!persp_light.projection.abs_diff_eq(ortho_light.projection, EPSILON));

        let forward = (perspective.light_target - perspective.light_position).normalize();
        let midpoint = perspective.light_position + forward * (LIGHT_NEAR + LIGHT_FAR) * 0.5;
        for light in [&persp_light, &ortho_light] {
            let coord = light.project(midpoint);
            assert_abs_diff_eq!(coord.x, 0.5, epsilon = EPSILON);
            assert_abs_diff_eq!(coord.y, 0.5, epsilon = EPSILON);
            assert!((0.0..=1.0).contains(&coord.z));
        }
    }

    #[test]
    fn frustum_corners_sit_on_near_and_far_planes() {
        let settings = Settings::default();
        let light = LightRig::from_settings(&settings).unwrap();
        let forward = (settings.light_target - settings.light_position).normalize();
        let corners = light.frustum_corners();
        assert_eq!(corners.len(), 8);
        for (index, corner) in corners.iter().enumerate() {
            let depth = (*corner - settings.light_position).dot(forward);
            // corners 0-3 come from z = -1 (near), 4-7 from z = +1 (far)
            let expected = if index < 4 { LIGHT_NEAR } else { LIGHT_FAR };
            assert_abs_diff_eq!(depth, expected, epsilon = 1e-3);
        }
    }

    #[test]
    fn orthographic_frustum_is_a_box() {
        let settings = Settings {
            perspective: false,
            projection_width: 2.0,
            ..Settings::default()
        };
        let light = LightRig::from_settings(&settings).unwrap();
        let corners = light.frustum_corners();
        let near_width = (corners[1] - corners[0]).length();
        let far_width = (corners[5] - corners[4]).length();
        assert_abs_diff_eq!(near_width, 2.0, epsilon = EPSILON);
        assert_abs_diff_eq!(far_width, 2.0, epsilon = EPSILON);
    }

    #[test]
    fn straight_down_light_still_builds() {
        let settings = Settings {
            light_target: Vec3::new(2.5, 0.0, 4.3),
            ..Settings::default()
        };
        let light = LightRig::from_settings(&settings).unwrap();
        assert!(light.texture_matrix.is_finite());
    }
}
