use approx::assert_abs_diff_eq;
use glam::{Vec2, Vec3};

use shadow_map_demo::{
    FrameConfig, FrameDriver, FrameStage, Scene, Settings, Shape, SoftwareBackend,
};

const LIT_PLANE_POINT: Vec3 = Vec3::new(5.0, 0.0, 4.0);
const BEHIND_CUBE: Vec3 = Vec3::new(3.13, 0.0, -1.13);
const BEHIND_SPHERE: Vec3 = Vec3::new(1.25, 0.0, 3.4);

fn render(settings: Settings) -> SoftwareBackend {
    let mut backend = SoftwareBackend::new(Scene::standard());
    let mut driver = FrameDriver::new();
    driver
        .render(&FrameConfig::new(settings, 16.0 / 9.0), &mut backend)
        .unwrap();
    assert_eq!(driver.stage(), FrameStage::Idle);
    backend
}

#[test]
fn unoccluded_plane_point_is_fully_lit() {
    let backend = render(Settings::default());
    let shadow = backend.shadow_light_at(LIT_PLANE_POINT).unwrap();
    assert_abs_diff_eq!(shadow, 1.0);
}

#[test]
fn cube_shadows_the_plane_behind_it() {
    let backend = render(Settings::default());
    let lit = backend.shadow_light_at(LIT_PLANE_POINT).unwrap();
    let occluded = backend.shadow_light_at(BEHIND_CUBE).unwrap();
    assert!(occluded < lit);
    assert_abs_diff_eq!(occluded, 0.0);
}

#[test]
fn sphere_shadows_the_plane_below_it() {
    let backend = render(Settings::default());
    assert_abs_diff_eq!(backend.shadow_light_at(BEHIND_SPHERE).unwrap(), 0.0);
}

#[test]
fn points_outside_the_light_footprint_are_lit() {
    let backend = render(Settings::default());
    assert_abs_diff_eq!(
        backend.shadow_light_at(Vec3::new(-9.0, 0.0, -9.0)).unwrap(),
        1.0
    );

    // a 1x1 orthographic footprint no longer reaches the lit point at all
    let orthographic = render(Settings {
        perspective: false,
        ..Settings::default()
    });
    assert_abs_diff_eq!(orthographic.shadow_light_at(BEHIND_CUBE).unwrap(), 1.0);
}

#[test]
fn both_projections_agree_on_the_optical_axis() {
    let settings = Settings::default();
    let perspective = render(settings);
    let orthographic = render(Settings {
        perspective: false,
        ..settings
    });
    // the sphere sits between the light and its target
    let target = settings.light_target;
    assert_abs_diff_eq!(perspective.shadow_light_at(target).unwrap(), 0.0);
    assert_abs_diff_eq!(orthographic.shadow_light_at(target).unwrap(), 0.0);
}

#[test]
fn shadowed_surface_keeps_only_ambient() {
    let backend = render(Settings::default());
    let uv = Vec2::new(0.01, 0.01);
    let lit = backend
        .shade_point(Shape::Plane, LIT_PLANE_POINT, Vec3::Y, uv)
        .unwrap();
    let shadowed = backend
        .shade_point(Shape::Plane, BEHIND_CUBE, Vec3::Y, uv)
        .unwrap();
    assert_abs_diff_eq!(shadowed.x, 0.05, epsilon = 1e-5);
    assert_abs_diff_eq!(shadowed.z, 0.1, epsilon = 1e-5);
    assert!(lit.z > 0.5);
}

#[test]
fn frustum_wireframe_has_twelve_edges() {
    let backend = render(Settings::default());
    let segments = backend.frustum_segments();
    assert_eq!(segments.len(), 12);
    let light = Settings::default().light_position;
    // near-plane corners hug the light, far-plane ones do not
    let distances: Vec<f32> = segments
        .iter()
        .flatten()
        .map(|corner| corner.distance(light))
        .collect();
    let nearest = distances.iter().copied().fold(f32::INFINITY, f32::min);
    let farthest = distances.iter().copied().fold(0.0, f32::max);
    assert!(nearest < 2.0);
    assert!(farthest > 10.0);
}
