//! Camera math shared by the light and the viewer.
//!
//! Matrices are column-major `glam::Mat4` values, so composition,
//! identity, translation and scale come straight from `glam`. This module
//! adds the pieces with conventions attached: look-at builds a *world*
//! matrix (the inverse of a view matrix) and the projections follow the GL
//! clip convention where the near plane maps to -1 and the far plane to +1.

use glam::{Mat4, Vec3, Vec4};
use log::debug;
use thiserror::Error;

/// Squared length below which a look-at axis is considered collapsed.
const BASIS_EPSILON: f32 = 1e-10;

/// Determinant magnitude below which a matrix is treated as singular.
const SINGULAR_EPSILON: f32 = 1e-12;

/// Remaps GL clip space (z in [-w, w]) to wgpu clip space (z in [0, w]).
///
/// With this correction the depth written by the GPU equals the z produced
/// by [`texture_matrix`], which keeps the shadow comparison identical on
/// both backends.
pub const GL_TO_WGPU: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 1.0),
);

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MathError {
    #[error("look-at basis is degenerate (eye {eye}, target {target}, up {up})")]
    DegenerateBasis { eye: Vec3, target: Vec3, up: Vec3 },
    #[error("matrix is not invertible (determinant {0})")]
    Singular(f32),
}

/// Builds the world matrix of an observer at `eye` looking at `target`.
///
/// The basis is orthogonalised Gram-Schmidt style: z points from the
/// target back to the eye, x is perpendicular to `up` and z, y completes
/// the right-handed frame. Invert the result to obtain a view matrix.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Result<Mat4, MathError> {
    let degenerate = MathError::DegenerateBasis { eye, target, up };
    let backward = eye - target;
    if backward.length_squared() < BASIS_EPSILON {
        return Err(degenerate);
    }
    let z_axis = backward.normalize();
    let side = up.cross(z_axis);
    if side.length_squared() < BASIS_EPSILON {
        return Err(degenerate);
    }
    let x_axis = side.normalize();
    let y_axis = z_axis.cross(x_axis).normalize();

    Ok(Mat4::from_cols(
        x_axis.extend(0.0),
        y_axis.extend(0.0),
        z_axis.extend(0.0),
        eye.extend(1.0),
    ))
}

/// Like [`look_at`], but swaps in +Z and then +X when `up` is parallel to
/// the viewing direction. Only a coincident eye and target still fail.
pub fn look_at_with_fallback(eye: Vec3, target: Vec3, up: Vec3) -> Result<Mat4, MathError> {
    match look_at(eye, target, up) {
        Ok(matrix) => Ok(matrix),
        Err(err) => {
            for fallback in [Vec3::Z, Vec3::X] {
                if let Ok(matrix) = look_at(eye, target, fallback) {
                    debug!("look-at up vector {up} is parallel to the view direction; using {fallback}");
                    return Ok(matrix);
                }
            }
            Err(err)
        }
    }
}

/// General 4x4 inverse that refuses singular input instead of returning
/// infinities.
pub fn inverse(matrix: &Mat4) -> Result<Mat4, MathError> {
    let det = matrix.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return Err(MathError::Singular(det));
    }
    Ok(matrix.inverse())
}

/// Perspective projection with a vertical field of view in radians.
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = (std::f32::consts::FRAC_PI_2 - 0.5 * fov_y).tan();
    let range_inv = 1.0 / (near - far);
    Mat4::from_cols(
        Vec4::new(f / aspect, 0.0, 0.0, 0.0),
        Vec4::new(0.0, f, 0.0, 0.0),
        Vec4::new(0.0, 0.0, (near + far) * range_inv, -1.0),
        Vec4::new(0.0, 0.0, near * far * range_inv * 2.0, 0.0),
    )
}

/// Orthographic projection of the box `[left, right] x [bottom, top]`
/// between the `near` and `far` planes.
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(2.0 / (right - left), 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 / (top - bottom), 0.0, 0.0),
        Vec4::new(0.0, 0.0, 2.0 / (near - far), 0.0),
        Vec4::new(
            (left + right) / (left - right),
            (bottom + top) / (bottom - top),
            (near + far) / (near - far),
            1.0,
        ),
    )
}

/// Maps world positions into the light's `[0, 1]^3` texture space:
/// `bias * scale * projection * inverse(light_world)`.
pub fn texture_matrix(light_projection: &Mat4, light_world: &Mat4) -> Result<Mat4, MathError> {
    let bias = Mat4::from_translation(Vec3::splat(0.5)) * Mat4::from_scale(Vec3::splat(0.5));
    Ok(bias * *light_projection * inverse(light_world)?)
}

/// Transforms `point` by `matrix` and performs the homogeneous divide.
pub fn project_point(matrix: &Mat4, point: Vec3) -> Vec3 {
    matrix.project_point3(point)
}
