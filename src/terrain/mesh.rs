//! Height-field triangulation at a chosen level of detail

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::noise_field::NoiseGrid;

/// GPU-ready terrain vertex
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Vertex and index buffers for one chunk at one LOD
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshGeometry {
    pub lod: u32,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex buffer as raw bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Converts a height field into renderable geometry
pub trait MeshBuilder: Send + Sync {
    fn build_mesh(&self, heights: &NoiseGrid, lod: u32) -> MeshGeometry;
}

/// Sample stride for a LOD level: 1 at full detail, `2 * lod` beyond.
///
/// # Examples
/// ```
/// use landmass::terrain::mesh::mesh_simplification_increment;
///
/// assert_eq!(mesh_simplification_increment(0), 1);
/// assert_eq!(mesh_simplification_increment(1), 2);
/// assert_eq!(mesh_simplification_increment(3), 6);
/// ```
pub fn mesh_simplification_increment(lod: u32) -> usize {
    if lod == 0 { 1 } else { lod as usize * 2 }
}

/// Mesh builder settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// World-space height of a normalized sample of 1.0
    pub height_multiplier: f32,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self { height_multiplier: 20.0 }
    }
}

/// Regular grid triangulation centered on the chunk origin
#[derive(Clone, Debug, Default)]
pub struct GridMeshBuilder {
    settings: MeshSettings,
}

impl GridMeshBuilder {
    pub fn new(settings: MeshSettings) -> Self {
        Self { settings }
    }
}

impl MeshBuilder for GridMeshBuilder {
    fn build_mesh(&self, heights: &NoiseGrid, lod: u32) -> MeshGeometry {
        let width = heights.width();
        let height = heights.height();
        if width == 0 || height == 0 {
            return MeshGeometry { lod, ..Default::default() };
        }

        let increment = mesh_simplification_increment(lod);
        let top_left_x = (width - 1) as f32 / -2.0;
        let top_left_z = (height - 1) as f32 / -2.0;
        let u_span = (width - 1).max(1) as f32;
        let v_span = (height - 1).max(1) as f32;

        let xs: Vec<usize> = (0..width).step_by(increment).collect();
        let ys: Vec<usize> = (0..height).step_by(increment).collect();
        let per_line = xs.len() as u32;

        let mut vertices = Vec::with_capacity(xs.len() * ys.len());
        for &y in &ys {
            for &x in &xs {
                vertices.push(MeshVertex {
                    position: [
                        top_left_x + x as f32,
                        heights.get(x, y) * self.settings.height_multiplier,
                        top_left_z + y as f32,
                    ],
                    uv: [x as f32 / u_span, y as f32 / v_span],
                });
            }
        }

        let rows = ys.len() as u32;
        let mut indices = Vec::with_capacity(((per_line.saturating_sub(1)) * rows.saturating_sub(1) * 6) as usize);
        for row in 0..rows.saturating_sub(1) {
            for col in 0..per_line.saturating_sub(1) {
                let a = row * per_line + col;
                indices.extend_from_slice(&[a, a + per_line + 1, a + per_line]);
                indices.extend_from_slice(&[a + per_line + 1, a, a + 1]);
            }
        }

        MeshGeometry { lod, vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_detail_mesh() {
        let grid = NoiseGrid::filled(5, 5, 0.5);
        let mesh = GridMeshBuilder::default().build_mesh(&grid, 0);
        assert_eq!(mesh.lod, 0);
        assert_eq!(mesh.vertices.len(), 25);
        assert_eq!(mesh.triangle_count(), 4 * 4 * 2);
        assert_eq!(mesh.vertices[0].position, [-2.0, 10.0, -2.0]);
        assert_eq!(mesh.vertices[24].position, [2.0, 10.0, 2.0]);
        assert_eq!(mesh.vertices[24].uv, [1.0, 1.0]);
    }

    #[test]
    fn test_lod_reduces_vertices() {
        let grid = NoiseGrid::filled(241, 241, 0.0);
        let builder = GridMeshBuilder::default();
        let lod0 = builder.build_mesh(&grid, 0);
        let lod1 = builder.build_mesh(&grid, 1);
        let lod2 = builder.build_mesh(&grid, 2);
        assert_eq!(lod0.vertices.len(), 241 * 241);
        assert_eq!(lod1.vertices.len(), 121 * 121);
        assert_eq!(lod2.vertices.len(), 61 * 61);
        assert!(lod2.triangle_count() < lod1.triangle_count());
    }

    #[test]
    fn test_indices_in_bounds() {
        let grid = NoiseGrid::filled(13, 9, 1.0);
        let mesh = GridMeshBuilder::new(MeshSettings { height_multiplier: 2.0 }).build_mesh(&grid, 1);
        let count = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < count));
        assert!(mesh.vertices.iter().all(|v| v.position[1] == 2.0));
    }

    #[test]
    fn test_degenerate_grids() {
        let builder = GridMeshBuilder::default();
        assert!(builder.build_mesh(&NoiseGrid::filled(0, 0, 0.0), 0).vertices.is_empty());

        let line = builder.build_mesh(&NoiseGrid::filled(4, 1, 0.0), 0);
        assert_eq!(line.vertices.len(), 4);
        assert_eq!(line.triangle_count(), 0);
    }

    #[test]
    fn test_vertex_bytes() {
        let mesh = GridMeshBuilder::default().build_mesh(&NoiseGrid::filled(2, 2, 0.0), 0);
        assert_eq!(mesh.vertex_bytes().len(), 4 * std::mem::size_of::<MeshVertex>());
    }
}
