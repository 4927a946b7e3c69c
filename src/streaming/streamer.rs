//! Viewer-driven chunk streaming
//!
//! Each tick the streamer delivers finished generation results, then (if
//! the viewer moved far enough) walks the square window of chunk coordinates
//! around the viewer, creating missing chunks and re-evaluating existing
//! ones. Chunks that drop out of the visible set are hidden, never removed,
//! so the registry grows for the whole session.

use std::collections::{HashMap, HashSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::chunk::{ChunkCoord, TerrainChunk};
use super::generator::{GenerationBackend, GenerationResult, RequestKey};
use super::lod::{LodDescriptor, LodTable, DEFAULT_LOD_DESCRIPTORS};
use crate::core::{Error, Result};
use crate::render::TerrainRenderer;

/// Streaming configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Height samples along one chunk side; the chunk spans `samples - 1` units
    pub chunk_samples: usize,
    /// LOD tiers, ascending by threshold
    pub lods: Vec<LodDescriptor>,
    /// Minimum viewer travel before the visible set is recomputed
    pub viewer_move_threshold: f32,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            chunk_samples: 241,
            lods: DEFAULT_LOD_DESCRIPTORS.to_vec(),
            viewer_move_threshold: 25.0,
        }
    }
}

impl StreamerConfig {
    /// World size of one chunk
    pub fn chunk_size(&self) -> f32 {
        self.chunk_samples.saturating_sub(1) as f32
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_samples < 2 {
            return Err(Error::Config(format!(
                "chunk_samples must be at least 2, got {}",
                self.chunk_samples
            )));
        }
        if !self.viewer_move_threshold.is_finite() || self.viewer_move_threshold < 0.0 {
            return Err(Error::Config(format!(
                "viewer_move_threshold must be a non-negative number, got {}",
                self.viewer_move_threshold
            )));
        }
        LodTable::new(self.lods.clone()).map(|_| ())
    }
}

/// Owns the chunk registry and drives visibility/LOD from the viewer position
pub struct ChunkStreamer<B: GenerationBackend, R: TerrainRenderer> {
    chunk_size: f32,
    lods: LodTable,
    /// Half-width of the square coordinate window, in chunks
    chunks_visible_in_view_distance: i32,
    move_threshold_sq: f32,
    viewer_position: Vec2,
    /// Viewer position at the last visible-set recompute
    last_update_position: Option<Vec2>,
    chunks: HashMap<ChunkCoord, TerrainChunk>,
    visible_last_update: HashSet<ChunkCoord>,
    backend: B,
    renderer: R,
}

impl<B: GenerationBackend, R: TerrainRenderer> ChunkStreamer<B, R> {
    pub fn new(config: &StreamerConfig, backend: B, renderer: R) -> Result<Self> {
        config.validate()?;
        let chunk_size = config.chunk_size();
        let lods = LodTable::new(config.lods.clone())?;
        let chunks_visible_in_view_distance = (lods.max_view_distance() / chunk_size).round() as i32;

        let mut move_threshold = config.viewer_move_threshold;
        if move_threshold > chunk_size {
            log::warn!(
                "viewer_move_threshold {} exceeds chunk size {}, clamping",
                move_threshold, chunk_size
            );
            move_threshold = chunk_size;
        }

        log::info!(
            "Chunk streamer: chunk size {}, view distance {}, {} LOD tiers, window radius {}",
            chunk_size,
            lods.max_view_distance(),
            lods.len(),
            chunks_visible_in_view_distance
        );

        Ok(Self {
            chunk_size,
            lods,
            chunks_visible_in_view_distance,
            move_threshold_sq: move_threshold * move_threshold,
            viewer_position: Vec2::ZERO,
            last_update_position: None,
            chunks: HashMap::new(),
            visible_last_update: HashSet::new(),
            backend,
            renderer,
        })
    }

    /// Per-tick entry point. Returns `true` if the visible set was recomputed.
    pub fn update(&mut self, viewer: Vec2) -> bool {
        self.viewer_position = viewer;
        self.deliver_results();

        let moved = match self.last_update_position {
            None => true,
            Some(old) => old.distance_squared(viewer) > self.move_threshold_sq,
        };
        if moved {
            self.last_update_position = Some(viewer);
            self.update_visible_chunks();
        }
        moved
    }

    /// Like [`update`](Self::update) but ignores the movement threshold
    pub fn force_update(&mut self, viewer: Vec2) {
        self.viewer_position = viewer;
        self.deliver_results();
        self.last_update_position = Some(viewer);
        self.update_visible_chunks();
    }

    /// Apply every finished generation result. The single place where
    /// worker output mutates chunk state.
    fn deliver_results(&mut self) {
        for result in self.backend.poll_results() {
            self.apply_result(result);
        }
    }

    fn apply_result(&mut self, result: GenerationResult) {
        let coord = match result.key() {
            RequestKey::MapData(coord) | RequestKey::Mesh(coord, _) => coord,
        };
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            log::warn!("Dropping generation result for unknown chunk {}", coord);
            return;
        };

        match result {
            GenerationResult::MapData { map_data, .. } => {
                if !chunk.on_map_data(map_data, &mut self.renderer) {
                    return;
                }
            }
            GenerationResult::Mesh { lod_index, mesh, .. } => {
                chunk.on_mesh(lod_index, mesh, &mut self.renderer);
            }
            GenerationResult::Failed { key, message } => {
                log::error!("Generation failed for {:?}: {}", key, message);
                match key {
                    RequestKey::MapData(_) => chunk.on_map_failed(),
                    RequestKey::Mesh(_, lod_index) => chunk.on_mesh_failed(lod_index),
                }
                return;
            }
        }

        self.refresh_chunk(coord);
    }

    /// Re-evaluate one chunk outside the window walk, keeping the visible
    /// set in sync so it gets hidden later.
    fn refresh_chunk(&mut self, coord: ChunkCoord) {
        let Some(chunk) = self.chunks.get_mut(&coord) else { return };
        let visible = chunk.update(self.viewer_position, &self.lods, &mut self.backend, &mut self.renderer);
        if visible {
            self.visible_last_update.insert(coord);
        } else {
            self.visible_last_update.remove(&coord);
        }
    }

    fn update_visible_chunks(&mut self) {
        let viewer = self.viewer_position;
        let current = ChunkCoord::from_world_pos(viewer, self.chunk_size);
        let radius = self.chunks_visible_in_view_distance;
        let mut visible_now = HashSet::new();
        let mut created = 0usize;

        for y_offset in -radius..=radius {
            for x_offset in -radius..=radius {
                let coord = current.offset(x_offset, y_offset);
                match self.chunks.get_mut(&coord) {
                    Some(chunk) => {
                        if chunk.update(viewer, &self.lods, &mut self.backend, &mut self.renderer) {
                            visible_now.insert(coord);
                        }
                    }
                    None => {
                        let chunk = TerrainChunk::new(coord, self.chunk_size, self.lods.len(), &mut self.backend);
                        self.chunks.insert(coord, chunk);
                        created += 1;
                    }
                }
            }
        }

        for coord in self.visible_last_update.difference(&visible_now) {
            if let Some(chunk) = self.chunks.get_mut(coord) {
                chunk.set_visible(false, &mut self.renderer);
            }
        }
        self.visible_last_update = visible_now;

        log::debug!(
            "Visible set around {}: {} visible, {} created, {} registered",
            current,
            self.visible_last_update.len(),
            created,
            self.chunks.len()
        );
    }

    pub fn viewer_position(&self) -> Vec2 {
        self.viewer_position
    }

    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    pub fn lods(&self) -> &LodTable {
        &self.lods
    }

    /// Half-width of the coordinate window, in chunks
    pub fn view_radius_in_chunks(&self) -> i32 {
        self.chunks_visible_in_view_distance
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Coordinates visible after the last evaluation, sorted
    pub fn visible_chunks(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.visible_last_update.iter().copied().collect();
        coords.sort();
        coords
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}
