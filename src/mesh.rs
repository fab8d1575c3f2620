//! Extruded prism ("column") mesh for a populated grid.
//!
//! Every non-empty cell becomes a regular N-gon prism. Positions stay in cell
//! units with `z` in `{0, 1}`; the vertex program scales the cross-section by
//! `size`, the extrusion by `height * normalized value`, and maps cells into
//! the world with the grid model matrix.

use bevy_asset::RenderAssetUsages;
use bevy_math::{DVec2, Vec2};
use bevy_mesh::{Mesh, MeshVertexAttribute, PrimitiveTopology, VertexFormat};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::grid::Grid;

/// Vertices emitted per column face: 3 roof + 6 wall.
pub const VERTICES_PER_FACE: usize = 9;

/// Byte stride of one interleaved [`PrismVertex`].
pub const VERTEX_STRIDE: u64 = std::mem::size_of::<PrismVertex>() as u64;

/// Horizontal offset of a vertex from its cell centre, in cell units.
pub const ATTRIBUTE_PRISM_OFFSET: MeshVertexAttribute =
    MeshVertexAttribute::new("PrismOffset", 0x7072_6973_0001, VertexFormat::Float32x2);

/// 2D wall normal; zero on roofs.
pub const ATTRIBUTE_FACE_NORMAL: MeshVertexAttribute =
    MeshVertexAttribute::new("PrismFaceNormal", 0x7072_6973_0002, VertexFormat::Float32x2);

/// Aggregated cell value.
pub const ATTRIBUTE_CELL_VALUE: MeshVertexAttribute =
    MeshVertexAttribute::new("PrismCellValue", 0x7072_6973_0003, VertexFormat::Float32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshOptions {
    /// Sides of the column cross-section, at least 2.
    pub faces_per_column: u32,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            faces_per_column: 4,
        }
    }
}

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrismVertex {
    pub position: [f32; 3],
    pub offset: [f32; 2],
    pub normal: [f32; 2],
    pub value: f32,
}

impl PrismVertex {
    #[inline]
    fn new(x: f32, y: f32, z: f32, offset: Vec2, normal: Vec2, value: f32) -> Self {
        Self {
            position: [x, y, z],
            offset: offset.to_array(),
            normal: normal.to_array(),
            value,
        }
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::from_array(self.offset)
    }

    pub fn normal(&self) -> Vec2 {
        Vec2::from_array(self.normal)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrismMesh {
    pub vertices: Vec<PrismVertex>,
}

impl PrismMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Flat `f32` view, 8 floats per vertex in attribute order.
    pub fn to_floats(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.vertices.len() * 8);
        for v in &self.vertices {
            out.extend_from_slice(&v.position);
            out.extend_from_slice(&v.offset);
            out.extend_from_slice(&v.normal);
            out.push(v.value);
        }
        out
    }

    /// Little-endian interleaved vertex buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_floats()
            .into_iter()
            .flat_map(f32::to_le_bytes)
            .collect()
    }

    /// Non-indexed triangle list for Bevy renderers with a custom material.
    pub fn to_bevy_mesh(&self) -> Mesh {
        let positions: Vec<[f32; 3]> = self.vertices.iter().map(|v| v.position).collect();
        let offsets: Vec<[f32; 2]> = self.vertices.iter().map(|v| v.offset).collect();
        let normals: Vec<[f32; 2]> = self.vertices.iter().map(|v| v.normal).collect();
        let values: Vec<f32> = self.vertices.iter().map(|v| v.value).collect();

        Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(ATTRIBUTE_PRISM_OFFSET, offsets)
        .with_inserted_attribute(ATTRIBUTE_FACE_NORMAL, normals)
        .with_inserted_attribute(ATTRIBUTE_CELL_VALUE, values)
    }
}

/// Vertex attribute layout of the interleaved buffer, shader locations 0..=3.
pub fn vertex_attributes() -> [wgpu_types::VertexAttribute; 4] {
    use wgpu_types::{VertexAttribute, VertexFormat as Format};

    [
        VertexAttribute {
            format: Format::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        VertexAttribute {
            format: Format::Float32x2,
            offset: 12,
            shader_location: 1,
        },
        VertexAttribute {
            format: Format::Float32x2,
            offset: 20,
            shader_location: 2,
        },
        VertexAttribute {
            format: Format::Float32,
            offset: 28,
            shader_location: 3,
        },
    ]
}

/// Closed ring of `faces + 1` cross-section offsets on a circle of radius 0.5.
///
/// Kept in double precision; offsets and wall normals are narrowed per vertex.
fn column_outline(faces: u32) -> Vec<DVec2> {
    let angle = 2.0 * PI / faces as f64;
    let start = -angle / 2.0;
    let r = 0.5;

    let mut ring: Vec<DVec2> = (0..faces)
        .map(|i| {
            let a = start + angle * i as f64;
            DVec2::new(r * a.sin(), r * a.cos())
        })
        .collect();
    ring.push(ring[0]);
    ring
}

/// Tessellate every non-empty cell of `grid` into a prism.
///
/// The outline runs clockwise seen from above, so the triangles below are
/// emitted counter-clockwise when seen from outside the column.
pub fn build(grid: &Grid, options: MeshOptions) -> PrismMesh {
    let faces = options.faces_per_column.max(2);
    let outline = column_outline(faces);

    let mut vertices =
        Vec::with_capacity(grid.non_empty_count() * faces as usize * VERTICES_PER_FACE);

    for (cx, cy, value) in grid.iter_non_empty() {
        let (x, y, v) = (cx as f32, cy as f32, value as f32);

        for pair in outline.windows(2) {
            let wall = (pair[0] + pair[1]).normalize_or_zero().as_vec2();
            let (left, right) = (pair[0].as_vec2(), pair[1].as_vec2());

            // roof
            vertices.push(PrismVertex::new(x, y, 1.0, Vec2::ZERO, Vec2::ZERO, v));
            vertices.push(PrismVertex::new(x, y, 1.0, right, Vec2::ZERO, v));
            vertices.push(PrismVertex::new(x, y, 1.0, left, Vec2::ZERO, v));

            // wall
            vertices.push(PrismVertex::new(x, y, 0.0, left, wall, v));
            vertices.push(PrismVertex::new(x, y, 1.0, left, wall, v));
            vertices.push(PrismVertex::new(x, y, 1.0, right, wall, v));

            vertices.push(PrismVertex::new(x, y, 1.0, right, wall, v));
            vertices.push(PrismVertex::new(x, y, 0.0, right, wall, v));
            vertices.push(PrismVertex::new(x, y, 0.0, left, wall, v));
        }
    }

    PrismMesh { vertices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::{DVec2, Vec3};

    fn grid(cells: Vec<f64>, width: usize) -> Grid {
        let height = cells.len() / width;
        Grid::from_cells(width, height, cells, DVec2::ZERO, DVec2::ONE).unwrap()
    }

    fn corner(v: &PrismVertex) -> Vec3 {
        Vec3::new(
            v.position[0] + v.offset[0],
            v.position[1] + v.offset[1],
            v.position[2],
        )
    }

    #[test]
    fn stride_is_32_bytes() {
        assert_eq!(VERTEX_STRIDE, 32);
        let attrs = vertex_attributes();
        assert_eq!(attrs[3].offset + 4, VERTEX_STRIDE);
    }

    #[test]
    fn vertex_count_per_cell() {
        let g = grid(vec![1.0, f64::NAN, 2.0, 3.0], 2);
        for faces in [2, 3, 4, 6, 12] {
            let mesh = build(
                &g,
                MeshOptions {
                    faces_per_column: faces,
                },
            );
            assert_eq!(mesh.vertex_count(), 3 * faces as usize * VERTICES_PER_FACE);
        }
    }

    #[test]
    fn empty_grid_gives_empty_mesh() {
        let g = grid(vec![f64::NAN; 4], 2);
        assert!(build(&g, MeshOptions::default()).is_empty());
    }

    #[test]
    fn outline_closes() {
        let ring = column_outline(5);
        assert_eq!(ring.len(), 6);
        assert_eq!(ring[0], ring[5]);
        for p in &ring {
            assert!((p.length() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn square_columns_are_axis_aligned() {
        let ring = column_outline(4);
        let s = 0.5 * std::f64::consts::FRAC_1_SQRT_2;
        assert!((ring[0] - DVec2::new(-s, s)).length() < 1e-12);
        assert!((ring[1] - DVec2::new(s, s)).length() < 1e-12);
    }

    #[test]
    fn offsets_are_narrowed_from_double_precision() {
        let faces = 7;
        let g = grid(vec![1.0], 1);
        let mesh = build(&g, MeshOptions { faces_per_column: faces });
        let ring = column_outline(faces);

        for (face, pair) in mesh.vertices.chunks(VERTICES_PER_FACE).zip(ring.windows(2)) {
            let wall = (pair[0] + pair[1]).normalize_or_zero();
            assert_eq!(face[1].offset, [pair[1].x as f32, pair[1].y as f32]);
            assert_eq!(face[2].offset, [pair[0].x as f32, pair[0].y as f32]);
            assert_eq!(face[3].normal, [wall.x as f32, wall.y as f32]);
        }
    }

    #[test]
    fn carries_cell_value_and_position() {
        let g = grid(vec![f64::NAN, 7.5], 2);
        let mesh = build(&g, MeshOptions::default());
        for v in &mesh.vertices {
            assert_eq!(v.value, 7.5);
            assert_eq!(&v.position[..2], &[1.0, 0.0]);
            assert!(v.position[2] == 0.0 || v.position[2] == 1.0);
        }
    }

    #[test]
    fn roof_faces_up_and_walls_face_out() {
        let g = grid(vec![1.0], 1);
        let mesh = build(
            &g,
            MeshOptions {
                faces_per_column: 6,
            },
        );

        for face in mesh.vertices.chunks(VERTICES_PER_FACE) {
            let roof = &face[..3];
            let n = (corner(&roof[1]) - corner(&roof[0])).cross(corner(&roof[2]) - corner(&roof[0]));
            assert!(n.z > 0.0, "roof normal {:?}", n);
            assert_eq!(roof[0].normal(), Vec2::ZERO);

            for tri in face[3..].chunks(3) {
                let n = (corner(&tri[1]) - corner(&tri[0])).cross(corner(&tri[2]) - corner(&tri[0]));
                let outward = tri[0].normal().extend(0.0);
                assert!(n.dot(outward) > 0.0, "wall normal {:?} vs {:?}", n, outward);
                assert!((tri[0].normal().length() - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn byte_buffer_matches_stride() {
        let g = grid(vec![1.0, 2.0], 2);
        let mesh = build(&g, MeshOptions::default());
        assert_eq!(mesh.to_bytes().len() as u64, mesh.vertex_count() as u64 * VERTEX_STRIDE);
        let floats = mesh.to_floats();
        assert_eq!(&floats[..8], &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn bevy_mesh_has_all_attributes() {
        let g = grid(vec![1.0], 1);
        let mesh = build(&g, MeshOptions::default()).to_bevy_mesh();
        assert_eq!(mesh.count_vertices(), 4 * VERTICES_PER_FACE);
        assert!(mesh.attribute(ATTRIBUTE_PRISM_OFFSET).is_some());
        assert!(mesh.attribute(ATTRIBUTE_FACE_NORMAL).is_some());
        assert!(mesh.attribute(ATTRIBUTE_CELL_VALUE).is_some());
    }
}
