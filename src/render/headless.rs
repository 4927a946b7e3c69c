//! In-memory renderer that records what would be on screen

use std::collections::HashMap;
use std::sync::Arc;

use super::TerrainRenderer;
use crate::streaming::ChunkCoord;
use crate::terrain::{ColorMap, MeshGeometry};

/// Display state of one chunk
#[derive(Clone, Debug, Default)]
pub struct RenderedChunk {
    pub visible: bool,
    pub mesh: Option<Arc<MeshGeometry>>,
    pub texture_size: Option<(usize, usize)>,
}

/// Renderer without a GPU, used for headless runs and tests
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    chunks: HashMap<ChunkCoord, RenderedChunk>,
    visibility_changes: usize,
    mesh_swaps: usize,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&RenderedChunk> {
        self.chunks.get(&coord)
    }

    pub fn is_visible(&self, coord: ChunkCoord) -> bool {
        self.chunks.get(&coord).is_some_and(|c| c.visible)
    }

    /// LOD of the active mesh
    pub fn mesh_lod(&self, coord: ChunkCoord) -> Option<u32> {
        self.chunks.get(&coord)?.mesh.as_ref().map(|m| m.lod)
    }

    pub fn has_texture(&self, coord: ChunkCoord) -> bool {
        self.chunks.get(&coord).is_some_and(|c| c.texture_size.is_some())
    }

    pub fn visible_count(&self) -> usize {
        self.chunks.values().filter(|c| c.visible).count()
    }

    /// Triangles across all visible chunks with a mesh
    pub fn visible_triangles(&self) -> usize {
        self.chunks
            .values()
            .filter(|c| c.visible)
            .filter_map(|c| c.mesh.as_ref())
            .map(|m| m.triangle_count())
            .sum()
    }

    pub fn visibility_changes(&self) -> usize {
        self.visibility_changes
    }

    pub fn mesh_swaps(&self) -> usize {
        self.mesh_swaps
    }
}

impl TerrainRenderer for HeadlessRenderer {
    fn set_chunk_visible(&mut self, coord: ChunkCoord, visible: bool) {
        self.chunks.entry(coord).or_default().visible = visible;
        self.visibility_changes += 1;
    }

    fn set_chunk_mesh(&mut self, coord: ChunkCoord, mesh: Arc<MeshGeometry>) {
        self.chunks.entry(coord).or_default().mesh = Some(mesh);
        self.mesh_swaps += 1;
    }

    fn set_chunk_texture(&mut self, coord: ChunkCoord, texture: &ColorMap) {
        self.chunks.entry(coord).or_default().texture_size = Some((texture.width(), texture.height()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_state() {
        let mut renderer = HeadlessRenderer::new();
        let coord = ChunkCoord::new(1, 2);
        assert!(!renderer.is_visible(coord));

        renderer.set_chunk_visible(coord, true);
        renderer.set_chunk_mesh(coord, Arc::new(MeshGeometry { lod: 2, ..Default::default() }));
        renderer.set_chunk_texture(coord, &ColorMap::new(2, 2, vec![[0; 4]; 4]));

        assert!(renderer.is_visible(coord));
        assert_eq!(renderer.mesh_lod(coord), Some(2));
        assert!(renderer.has_texture(coord));
        assert_eq!(renderer.visible_count(), 1);
        assert_eq!(renderer.mesh_swaps(), 1);

        renderer.set_chunk_visible(coord, false);
        assert_eq!(renderer.visible_count(), 0);
        assert_eq!(renderer.visibility_changes(), 2);
    }
}
