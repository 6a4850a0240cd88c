use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Interleaved vertex shared by every lit mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texcoord: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn new(position: Vec3, normal: Vec3, texcoord: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            texcoord: texcoord.to_array(),
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Indexed triangle list. Front faces wind counter-clockwise.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Iterates the object-space corners of every triangle.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                Vec3::from(self.vertices[tri[0] as usize].position),
                Vec3::from(self.vertices[tri[1] as usize].position),
                Vec3::from(self.vertices[tri[2] as usize].position),
            ]
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Indexed line list (two indices per segment), positions only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineMesh {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl LineMesh {
    pub fn segments(&self) -> impl Iterator<Item = [Vec3; 2]> + '_ {
        self.indices.chunks_exact(2).map(|pair| {
            [
                Vec3::from(self.positions[pair[0] as usize]),
                Vec3::from(self.positions[pair[1] as usize]),
            ]
        })
    }
}

/// UV sphere centred on the origin.
///
/// `around` subdivides longitude and `down` latitude; texture coordinates
/// run `1 - u` around and `v` from the north pole.
pub fn sphere(radius: f32, around: u32, down: u32) -> Mesh {
    let around = around.max(1);
    let down = down.max(1);
    let mut vertices = Vec::with_capacity(((around + 1) * (down + 1)) as usize);
    for y in 0..=down {
        for x in 0..=around {
            let u = x as f32 / around as f32;
            let v = y as f32 / down as f32;
            let theta = TAU * u;
            let phi = PI * v;
            let unit = Vec3::new(theta.cos() * phi.sin(), phi.cos(), theta.sin() * phi.sin());
            vertices.push(Vertex::new(unit * radius, unit, Vec2::new(1.0 - u, v)));
        }
    }

    let stride = around + 1;
    let mut indices = Vec::with_capacity((around * down * 6) as usize);
    for x in 0..around {
        for y in 0..down {
            indices.extend_from_slice(&[
                y * stride + x,
                y * stride + x + 1,
                (y + 1) * stride + x,
                (y + 1) * stride + x,
                y * stride + x + 1,
                (y + 1) * stride + x + 1,
            ]);
        }
    }
    Mesh { vertices, indices }
}

const CUBE_FACES: [([usize; 4], Vec3); 6] = [
    ([3, 7, 5, 1], Vec3::X),
    ([6, 2, 0, 4], Vec3::NEG_X),
    ([6, 7, 3, 2], Vec3::Y),
    ([0, 1, 5, 4], Vec3::NEG_Y),
    ([7, 6, 4, 5], Vec3::Z),
    ([2, 3, 1, 0], Vec3::NEG_Z),
];

const FACE_UVS: [Vec2; 4] = [
    Vec2::new(1.0, 0.0),
    Vec2::new(0.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
];

fn cube_corner(index: usize, half: f32) -> Vec3 {
    let sign = |bit: usize| if index & bit != 0 { half } else { -half };
    Vec3::new(sign(1), sign(2), sign(4))
}

/// Axis-aligned cube with edge length `size`, four vertices per face so
/// every face carries its own normal and texture coordinates.
pub fn cube(size: f32) -> Mesh {
    let half = size * 0.5;
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (face, (corners, normal)) in CUBE_FACES.iter().enumerate() {
        for (corner, uv) in corners.iter().zip(FACE_UVS) {
            vertices.push(Vertex::new(cube_corner(*corner, half), *normal, uv));
        }
        let offset = (face * 4) as u32;
        indices.extend_from_slice(&[
            offset,
            offset + 1,
            offset + 2,
            offset,
            offset + 2,
            offset + 3,
        ]);
    }
    Mesh { vertices, indices }
}

/// Plane in XZ facing +Y, centred on the origin.
pub fn plane(width: f32, depth: f32, across: u32, down: u32) -> Mesh {
    let across = across.max(1);
    let down = down.max(1);
    let mut vertices = Vec::with_capacity(((across + 1) * (down + 1)) as usize);
    for z in 0..=down {
        for x in 0..=across {
            let u = x as f32 / across as f32;
            let v = z as f32 / down as f32;
            vertices.push(Vertex::new(
                Vec3::new(width * u - width * 0.5, 0.0, depth * v - depth * 0.5),
                Vec3::Y,
                Vec2::new(u, 1.0 - v),
            ));
        }
    }

    let stride = across + 1;
    let mut indices = Vec::with_capacity((across * down * 6) as usize);
    for z in 0..down {
        for x in 0..across {
            indices.extend_from_slice(&[
                z * stride + x,
                (z + 1) * stride + x,
                z * stride + x + 1,
                (z + 1) * stride + x,
                (z + 1) * stride + x + 1,
                z * stride + x + 1,
            ]);
        }
    }
    Mesh { vertices, indices }
}

/// The twelve edges of the `[-1, 1]^3` cube, i.e. of clip space. Pushed
/// through an inverse projection this outlines a frustum.
pub fn cube_lines() -> LineMesh {
    let positions = (0..8).map(|corner| cube_corner(corner, 1.0).to_array()).collect();
    let indices = vec![
        0, 1, 1, 3, 3, 2, 2, 0, //
        4, 5, 5, 7, 7, 6, 6, 4, //
        0, 4, 1, 5, 3, 7, 2, 6,
    ];
    LineMesh { positions, indices }
}
