//! Renderer-facing interface for streamed terrain
//!
//! The streamer only pushes state changes; it never reads anything back.

pub mod headless;
pub use headless::{HeadlessRenderer, RenderedChunk};

use std::sync::Arc;

use crate::streaming::ChunkCoord;
use crate::terrain::{ColorMap, MeshGeometry};

/// Fire-and-forget sink for chunk display state
pub trait TerrainRenderer {
    fn set_chunk_visible(&mut self, coord: ChunkCoord, visible: bool);

    /// Replace the chunk's active geometry
    fn set_chunk_mesh(&mut self, coord: ChunkCoord, mesh: Arc<MeshGeometry>);

    fn set_chunk_texture(&mut self, coord: ChunkCoord, texture: &ColorMap);
}
