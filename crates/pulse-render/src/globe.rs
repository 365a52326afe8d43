//! Unit-sphere globe mesh: a subdivided icosahedron.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::buffer::{BufferAllocator, IndexData, MeshBuffer};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlobeVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl GlobeVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GlobeVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Highest subdivision level [`GlobeMesh::icosphere`] builds (1 310 720
/// triangles).
pub const MAX_SUBDIVISIONS: u32 = 8;

/// Triangle list with counter-clockwise, outward-facing winding.
pub struct GlobeMesh {
    pub vertices: Vec<GlobeVertex>,
    pub indices: Vec<u32>,
}

impl GlobeMesh {
    /// Icosahedron subdivided `subdivisions` times. Each step quadruples the
    /// triangle count: 6 gives 81 920 triangles. Levels above
    /// [`MAX_SUBDIVISIONS`] are clamped.
    pub fn icosphere(subdivisions: u32) -> Self {
        let subdivisions = if subdivisions > MAX_SUBDIVISIONS {
            log::warn!("globe subdivisions {subdivisions} clamped to {MAX_SUBDIVISIONS}");
            MAX_SUBDIVISIONS
        } else {
            subdivisions
        };
        let mut builder = SphereBuilder::icosahedron();
        for _ in 0..subdivisions {
            builder.subdivide();
        }

        let vertices = builder
            .positions
            .iter()
            .map(|p| GlobeVertex {
                position: p.to_array(),
                normal: p.to_array(),
            })
            .collect();

        Self {
            vertices,
            indices: builder.indices,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn upload(&self, allocator: &BufferAllocator) -> MeshBuffer {
        allocator.create_mesh("globe", &self.vertices, IndexData::U32(&self.indices))
    }
}

struct SphereBuilder {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
}

impl SphereBuilder {
    fn icosahedron() -> Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let positions = [
            (-1.0, t, 0.0),
            (1.0, t, 0.0),
            (-1.0, -t, 0.0),
            (1.0, -t, 0.0),
            (0.0, -1.0, t),
            (0.0, 1.0, t),
            (0.0, -1.0, -t),
            (0.0, 1.0, -t),
            (t, 0.0, -1.0),
            (t, 0.0, 1.0),
            (-t, 0.0, -1.0),
            (-t, 0.0, 1.0),
        ]
        .into_iter()
        .map(|(x, y, z)| Vec3::new(x, y, z).normalize())
        .collect();

        #[rustfmt::skip]
        let indices = vec![
            0, 11, 5,   0, 5, 1,    0, 1, 7,    0, 7, 10,   0, 10, 11,
            1, 5, 9,    5, 11, 4,   11, 10, 2,  10, 7, 6,   7, 1, 8,
            3, 9, 4,    3, 4, 2,    3, 2, 6,    3, 6, 8,    3, 8, 9,
            4, 9, 5,    2, 4, 11,   6, 2, 10,   8, 6, 7,    9, 8, 1,
        ];

        Self { positions, indices }
    }

    /// Split every triangle into four, pushing shared edge midpoints onto the sphere.
    fn subdivide(&mut self) {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::with_capacity(self.indices.len());
        let mut indices = Vec::with_capacity(self.indices.len() * 4);

        let triangles = std::mem::take(&mut self.indices);
        for tri in triangles.chunks_exact(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            let ab = self.midpoint(&mut midpoints, a, b);
            let bc = self.midpoint(&mut midpoints, b, c);
            let ca = self.midpoint(&mut midpoints, c, a);

            indices.extend_from_slice(&[a, ab, ca, b, bc, ab, c, ca, bc, ab, bc, ca]);
        }
        self.indices = indices;
    }

    fn midpoint(&mut self, cache: &mut HashMap<(u32, u32), u32>, a: u32, b: u32) -> u32 {
        let key = (a.min(b), a.max(b));
        *cache.entry(key).or_insert_with(|| {
            let mid = (self.positions[a as usize] + self.positions[b as usize]).normalize();
            self.positions.push(mid);
            (self.positions.len() - 1) as u32
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdivisions_are_capped() {
        let capped = GlobeMesh::icosphere(MAX_SUBDIVISIONS);
        let huge = GlobeMesh::icosphere(u32::MAX);
        assert_eq!(huge.triangle_count(), capped.triangle_count());
        assert_eq!(huge.triangle_count(), 20 * 4usize.pow(MAX_SUBDIVISIONS));
    }

    #[test]
    fn test_vertices_on_unit_sphere() {
        let mesh = GlobeMesh::icosphere(4);
        for v in &mesh.vertices {
            let len = Vec3::from_array(v.position).length();
            assert!((len - 1.0).abs() < 1e-5, "vertex off the sphere: {len}");
            assert_eq!(v.position, v.normal);
        }
    }

    #[test]
    fn test_triangle_count_quadruples() {
        assert_eq!(GlobeMesh::icosphere(0).triangle_count(), 20);
        assert_eq!(GlobeMesh::icosphere(1).triangle_count(), 80);
        assert_eq!(GlobeMesh::icosphere(6).triangle_count(), 20 * 4usize.pow(6));
    }

    #[test]
    fn test_shared_midpoints_are_reused() {
        // Euler: V = E - F + 2 with E = 3F / 2.
        let mesh = GlobeMesh::icosphere(3);
        let faces = mesh.triangle_count();
        assert_eq!(mesh.vertices.len(), faces * 3 / 2 - faces + 2);
    }

    #[test]
    fn test_indices_valid() {
        let mesh = GlobeMesh::icosphere(3);
        let n = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < n));
    }

    #[test]
    fn test_winding_faces_outward() {
        let mesh = GlobeMesh::icosphere(2);
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(mesh.vertices[i as usize].position));
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0, "inward-facing triangle");
        }
    }

    #[test]
    fn test_layout_stride() {
        let layout = GlobeVertex::layout();
        assert_eq!(layout.array_stride, 24);
        assert_eq!(layout.attributes.len(), 2);
    }
}
