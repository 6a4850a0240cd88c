use std::fmt;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::mesh::{self, LineMesh, Mesh};

/// Primitive a drawable was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Sphere,
    Cube,
    Plane,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Sphere => "sphere",
            Shape::Cube => "cube",
            Shape::Plane => "plane",
        };
        f.write_str(name)
    }
}

/// Per-object parameters shared by the depth and lit programs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectUniforms {
    pub world: Mat4,
    /// Multiplies the base texture in the lit program.
    pub color_mult: Vec4,
    /// Flat color used by the unlit program.
    pub color: Vec4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub shape: Shape,
    pub mesh: Mesh,
    pub uniforms: ObjectUniforms,
}

impl Drawable {
    fn new(shape: Shape, mesh: Mesh, translation: Vec3, color_mult: Vec4, color: Vec4) -> Self {
        Self {
            shape,
            mesh,
            uniforms: ObjectUniforms {
                world: Mat4::from_translation(translation),
                color_mult,
                color,
            },
        }
    }
}

/// Luminance checkerboard used as every object's base texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkerboard {
    size: u32,
    texels: Vec<u8>,
}

impl Checkerboard {
    pub const LIGHT: u8 = 0xFF;
    pub const DARK: u8 = 0xCC;

    pub fn new(size: u32) -> Self {
        let size = size.max(1);
        let texels = (0..size)
            .flat_map(|y| {
                (0..size).map(move |x| {
                    if (x + y) % 2 == 0 {
                        Self::LIGHT
                    } else {
                        Self::DARK
                    }
                })
            })
            .collect();
        Self { size, texels }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// One byte per texel, rows from `v = 0`.
    pub fn texels(&self) -> &[u8] {
        &self.texels
    }

    /// Nearest sample with repeat wrapping, as a grey base color.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let wrap = |coordinate: f32| {
            let scaled = (coordinate.rem_euclid(1.0) * self.size as f32).floor() as u32;
            scaled.min(self.size - 1)
        };
        let texel = self.texels[(wrap(uv.y) * self.size + wrap(uv.x)) as usize];
        let luminance = texel as f32 / 255.0;
        Vec3::splat(luminance).extend(1.0)
    }
}

/// The fixed demo content: three lit objects, the frustum wireframe and
/// the shared base texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub drawables: Vec<Drawable>,
    pub frustum_lines: LineMesh,
    pub texture: Checkerboard,
}

impl Scene {
    pub fn standard() -> Self {
        let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);
        let drawables = vec![
            Drawable::new(
                Shape::Sphere,
                mesh::sphere(1.0, 32, 24),
                Vec3::new(2.0, 3.0, 4.0),
                Vec4::new(1.0, 0.5, 0.5, 1.0),
                blue,
            ),
            Drawable::new(
                Shape::Cube,
                mesh::cube(2.0),
                Vec3::new(3.0, 1.0, 0.0),
                Vec4::new(0.5, 1.0, 0.5, 1.0),
                blue,
            ),
            Drawable::new(
                Shape::Plane,
                mesh::plane(20.0, 20.0, 1, 1),
                Vec3::ZERO,
                Vec4::new(0.5, 0.5, 1.0, 1.0),
                Vec4::new(1.0, 0.0, 0.0, 1.0),
            ),
        ];
        Self {
            drawables,
            frustum_lines: mesh::cube_lines(),
            texture: Checkerboard::new(8),
        }
    }

    pub fn drawable(&self, shape: Shape) -> Option<&Drawable> {
        self.drawables.iter().find(|drawable| drawable.shape == shape)
    }

    pub fn triangle_count(&self) -> usize {
        self.drawables
            .iter()
            .map(|drawable| drawable.mesh.triangle_count())
            .sum()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::standard()
    }
}
