//! CPU depth pass: a small scanline-free rasterizer that fills a
//! [`DepthTarget`] the way the GPU depth pipeline fills the shadow map.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::mesh::Mesh;
use crate::shading::DepthSampler;

/// Square single-channel depth image. Row 0 holds `v = 0`, i.e. the bottom
/// of the light's clip space.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthTarget {
    size: u32,
    texels: Vec<f32>,
}

impl DepthTarget {
    pub const CLEAR_DEPTH: f32 = 1.0;

    pub fn new(size: u32) -> Self {
        let size = size.max(1);
        Self {
            size,
            texels: vec![Self::CLEAR_DEPTH; texel_count(size)],
        }
    }

    pub fn clear(&mut self) {
        self.texels.fill(Self::CLEAR_DEPTH);
    }

    pub fn texel(&self, x: u32, y: u32) -> f32 {
        self.texels[y as usize * self.size as usize + x as usize]
    }

    pub fn texels(&self) -> &[f32] {
        &self.texels
    }

    /// Number of texels that received geometry since the last clear.
    pub fn covered_texels(&self) -> usize {
        self.texels
            .iter()
            .filter(|depth| **depth < Self::CLEAR_DEPTH)
            .count()
    }

    fn test_and_write(&mut self, x: u32, y: u32, depth: f32) -> bool {
        let slot = &mut self.texels[y as usize * self.size as usize + x as usize];
        if depth < *slot {
            *slot = depth;
            true
        } else {
            false
        }
    }

    fn texel_index(&self, coordinate: f32) -> u32 {
        let max = self.size as f32 - 1.0;
        (coordinate * self.size as f32).floor().clamp(0.0, max) as u32
    }
}

impl DepthSampler for DepthTarget {
    fn size(&self) -> u32 {
        self.size
    }

    fn sample(&self, uv: Vec2) -> f32 {
        self.texel(self.texel_index(uv.x), self.texel_index(uv.y))
    }
}

/// Counters reported by one [`rasterize_depth`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RasterStats {
    pub triangles: usize,
    /// Back-facing triangles.
    pub culled: usize,
    /// Triangles entirely outside the near/far range.
    pub clipped: usize,
    pub fragments_written: usize,
}

impl std::ops::AddAssign for RasterStats {
    fn add_assign(&mut self, rhs: Self) {
        self.triangles += rhs.triangles;
        self.culled += rhs.culled;
        self.clipped += rhs.clipped;
        self.fragments_written += rhs.fragments_written;
    }
}

/// Renders `mesh`, placed by `world`, into `target` as seen through
/// `view_projection` (GL clip convention).
///
/// Triangles are clipped against the near and far planes, back faces
/// (clockwise on screen) are culled and the depth test keeps the smaller
/// of the stored and incoming `0.5 * z_ndc + 0.5`.
pub fn rasterize_depth(
    target: &mut DepthTarget,
    view_projection: &Mat4,
    mesh: &Mesh,
    world: &Mat4,
) -> RasterStats {
    let clip_from_object = *view_projection * *world;
    let mut stats = RasterStats::default();
    for triangle in mesh.triangles() {
        stats.triangles += 1;
        let clip = triangle.map(|corner| clip_from_object * corner.extend(1.0));
        let polygon = clip_depth_range(&clip);
        if polygon.len() < 3 {
            stats.clipped += 1;
            continue;
        }

        let screen: Vec<Vec3> = polygon
            .iter()
            .map(|vertex| to_screen(*vertex, target.size))
            .collect();
        if signed_area(&screen) <= 0.0 {
            stats.culled += 1;
            continue;
        }
        for i in 1..screen.len() - 1 {
            stats.fragments_written += fill_triangle(target, screen[0], screen[i], screen[i + 1]);
        }
    }
    stats
}

/// Sutherland-Hodgman against `-w <= z <= w`.
fn texel_count(size: u32) -> usize {
    size as usize * size as usize
}

fn clip_depth_range(triangle: &[Vec4; 3]) -> Vec<Vec4> {
    let near = |v: Vec4| v.z + v.w;
    let far = |v: Vec4| v.w - v.z;
    let polygon = clip_polygon(triangle.to_vec(), near);
    clip_polygon(polygon, far)
}

fn clip_polygon(polygon: Vec<Vec4>, distance: impl Fn(Vec4) -> f32) -> Vec<Vec4> {
    if polygon.is_empty() {
        return polygon;
    }
    let mut output = Vec::with_capacity(polygon.len() + 1);
    for (index, current) in polygon.iter().enumerate() {
        let next = polygon[(index + 1) % polygon.len()];
        let d_current = distance(*current);
        let d_next = distance(next);
        if d_current >= 0.0 {
            output.push(*current);
        }
        if (d_current >= 0.0) != (d_next >= 0.0) {
            let t = d_current / (d_current - d_next);
            output.push(current.lerp(next, t));
        }
    }
    output
}

/// Texel-space x/y plus `[0, 1]` depth.
fn to_screen(clip: Vec4, size: u32) -> Vec3 {
    let ndc = clip.truncate() / clip.w;
    let size = size as f32;
    Vec3::new(
        (ndc.x * 0.5 + 0.5) * size,
        (ndc.y * 0.5 + 0.5) * size,
        (ndc.z * 0.5 + 0.5).clamp(0.0, 1.0),
    )
}

fn signed_area(polygon: &[Vec3]) -> f32 {
    let mut area = 0.0;
    for (index, a) in polygon.iter().enumerate() {
        let b = polygon[(index + 1) % polygon.len()];
        area += a.x * b.y - b.x * a.y;
    }
    area * 0.5
}

fn edge(a: Vec3, b: Vec3, x: f32, y: f32) -> f32 {
    (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x)
}

/// Fills a counter-clockwise triangle, sampling at texel centres.
fn fill_triangle(target: &mut DepthTarget, a: Vec3, b: Vec3, c: Vec3) -> usize {
    let area = edge(a, b, c.x, c.y);
    if area <= 0.0 {
        return 0;
    }
    let max = target.size as f32 - 1.0;
    let min_x = a.x.min(b.x).min(c.x).floor().clamp(0.0, max) as u32;
    let max_x = a.x.max(b.x).max(c.x).ceil().clamp(0.0, max) as u32;
    let min_y = a.y.min(b.y).min(c.y).floor().clamp(0.0, max) as u32;
    let max_y = a.y.max(b.y).max(c.y).ceil().clamp(0.0, max) as u32;

    let mut written = 0;
    for y in min_y..=max_y {
        let py = y as f32 + 0.5;
        for x in min_x..=max_x {
            let px = x as f32 + 0.5;
            let w_a = edge(b, c, px, py);
            let w_b = edge(c, a, px, py);
            let w_c = edge(a, b, px, py);
            if w_a < 0.0 || w_b < 0.0 || w_c < 0.0 {
                continue;
            }
            let depth = (w_a * a.z + w_b * b.z + w_c * c.z) / area;
            if target.test_and_write(x, y, depth) {
                written += 1;
            }
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{orthographic, perspective, project_point};
    use crate::mesh::{plane, Vertex};
    use approx::assert_abs_diff_eq;

    fn triangle(corners: [Vec3; 3]) -> Mesh {
        Mesh {
            vertices: corners
                .iter()
                .map(|corner| Vertex::new(*corner, Vec3::Z, Vec2::ZERO))
                .collect(),
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn texel_count_does_not_wrap_past_u32() {
        assert_eq!(texel_count(70_000), 4_900_000_000);
        assert_eq!(texel_count(2048), 2048 * 2048);
    }

    fn ortho() -> Mat4 {
        orthographic(-1.0, 1.0, -1.0, 1.0, 0.5, 10.0)
    }

    #[test]
    fn samples_clamp_to_edge() {
        let mut target = DepthTarget::new(4);
        target.test_and_write(0, 0, 0.25);
        target.test_and_write(3, 3, 0.75);
        assert_eq!(target.sample(Vec2::new(-5.0, -5.0)), 0.25);
        assert_eq!(target.sample(Vec2::new(0.1, 0.1)), 0.25);
        assert_eq!(target.sample(Vec2::new(1.0, 1.0)), 0.75);
        assert_eq!(target.sample(Vec2::new(0.5, 0.5)), DepthTarget::CLEAR_DEPTH);
    }

    #[test]
    fn facing_quad_fills_its_footprint() {
        let mut target = DepthTarget::new(64);
        let quad = Mesh {
            vertices: [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)]
                .iter()
                .map(|(x, y)| Vertex::new(Vec3::new(*x, *y, -5.0), Vec3::Z, Vec2::ZERO))
                .collect(),
            indices: vec![0, 1, 2, 0, 2, 3],
        };
        let stats = rasterize_depth(&mut target, &ortho(), &quad, &Mat4::IDENTITY);
        assert_eq!(stats.triangles, 2);
        assert_eq!(stats.culled, 0);
        // the quad spans half the view in each direction
        assert_eq!(target.covered_texels(), 32 * 32);

        let expected = project_point(&ortho(), Vec3::new(0.0, 0.0, -5.0)).z * 0.5 + 0.5;
        assert_abs_diff_eq!(target.sample(Vec2::splat(0.5)), expected, epsilon = 1e-5);
        assert_eq!(target.sample(Vec2::splat(0.05)), DepthTarget::CLEAR_DEPTH);
    }

    #[test]
    fn plane_seen_from_above_is_front_facing() {
        let mut target = DepthTarget::new(32);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Z);
        let stats = rasterize_depth(&mut target, &(ortho() * view), &plane(1.0, 1.0, 1, 1), &Mat4::IDENTITY);
        assert_eq!(stats.culled, 0);
        assert!(target.covered_texels() > 0);
    }

    #[test]
    fn back_faces_are_culled() {
        let mut target = DepthTarget::new(32);
        let clockwise = triangle([
            Vec3::new(-0.5, -0.5, -2.0),
            Vec3::new(0.0, 0.5, -2.0),
            Vec3::new(0.5, -0.5, -2.0),
        ]);
        let stats = rasterize_depth(&mut target, &ortho(), &clockwise, &Mat4::IDENTITY);
        assert_eq!(stats.culled, 1);
        assert_eq!(target.covered_texels(), 0);
    }

    #[test]
    fn nearer_surface_wins_regardless_of_order() {
        let near = triangle([
            Vec3::new(-1.0, -1.0, -2.0),
            Vec3::new(1.0, -1.0, -2.0),
            Vec3::new(0.0, 1.0, -2.0),
        ]);
        let far = triangle([
            Vec3::new(-1.0, -1.0, -6.0),
            Vec3::new(1.0, -1.0, -6.0),
            Vec3::new(0.0, 1.0, -6.0),
        ]);
        let centre = Vec2::new(0.5, 0.4);

        let mut first = DepthTarget::new(32);
        rasterize_depth(&mut first, &ortho(), &near, &Mat4::IDENTITY);
        rasterize_depth(&mut first, &ortho(), &far, &Mat4::IDENTITY);

        let mut second = DepthTarget::new(32);
        rasterize_depth(&mut second, &ortho(), &far, &Mat4::IDENTITY);
        rasterize_depth(&mut second, &ortho(), &near, &Mat4::IDENTITY);

        assert_eq!(first.sample(centre), second.sample(centre));
        let expected = project_point(&ortho(), Vec3::new(0.0, 0.0, -2.0)).z * 0.5 + 0.5;
        assert_abs_diff_eq!(first.sample(centre), expected, epsilon = 1e-5);
    }

    #[test]
    fn geometry_behind_the_light_is_clipped() {
        let mut target = DepthTarget::new(32);
        let behind = triangle([
            Vec3::new(-1.0, -1.0, 2.0),
            Vec3::new(1.0, -1.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
        ]);
        let proj = perspective(1.5, 1.0, 0.5, 10.0);
        let stats = rasterize_depth(&mut target, &proj, &behind, &Mat4::IDENTITY);
        assert_eq!(stats.clipped, 1);
        assert_eq!(target.covered_texels(), 0);
    }

    #[test]
    fn straddling_triangle_keeps_its_visible_part() {
        let mut target = DepthTarget::new(64);
        // runs from behind the light to well in front of it
        let straddling = triangle([
            Vec3::new(-1.0, -0.2, 1.0),
            Vec3::new(1.0, -0.2, 1.0),
            Vec3::new(0.0, -0.2, -8.0),
        ]);
        let proj = perspective(1.5, 1.0, 0.5, 10.0);
        let stats = rasterize_depth(&mut target, &proj, &straddling, &Mat4::IDENTITY);
        assert_eq!(stats.clipped, 0);
        assert!(target.covered_texels() > 0);
        assert!(target.texels().iter().all(|depth| (0.0..=1.0).contains(depth)));
    }
}
