//! Streamed terrain tiles and their per-LOD mesh caches

use std::fmt;
use std::sync::Arc;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::generator::{GenerationBackend, RequestKey};
use super::lod::LodTable;
use crate::math::Rect;
use crate::render::TerrainRenderer;
use crate::terrain::{MapData, MeshGeometry};

/// Integer tile coordinate. World position = coordinate * chunk size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing `pos`, rounding to the nearest tile center
    pub fn from_world_pos(pos: Vec2, chunk_size: f32) -> Self {
        let c = (pos / chunk_size).round();
        Self::new(c.x as i32, c.y as i32)
    }

    /// World-space center of this tile
    pub fn world_center(self, chunk_size: f32) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32) * chunk_size
    }

    /// Neighbouring tile; saturates at the edge of the coordinate range
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl From<IVec2> for ChunkCoord {
    fn from(v: IVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Map data lifecycle of a chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// No map request in flight (fresh, or the last request failed)
    Created,
    MapPending,
    MapReady,
}

/// Cached mesh for one LOD tier
#[derive(Clone, Debug, Default)]
pub enum MeshSlot {
    #[default]
    Empty,
    Requested,
    Ready(Arc<MeshGeometry>),
}

impl MeshSlot {
    pub fn is_ready(&self) -> bool {
        matches!(self, MeshSlot::Ready(_))
    }

    pub fn is_requested(&self) -> bool {
        matches!(self, MeshSlot::Requested)
    }
}

/// One streamed tile. Chunks are never destroyed, only hidden.
pub struct TerrainChunk {
    coord: ChunkCoord,
    center: Vec2,
    bounds: Rect,
    state: ChunkState,
    map_data: Option<Arc<MapData>>,
    lod_meshes: Vec<MeshSlot>,
    visible: bool,
    /// LOD slot whose mesh is currently displayed
    current_lod: Option<usize>,
    /// LOD slot wanted at the last evaluation
    desired_lod: Option<usize>,
}

impl TerrainChunk {
    /// Create a chunk and fire its single map data request
    pub fn new(
        coord: ChunkCoord,
        chunk_size: f32,
        lod_count: usize,
        backend: &mut impl GenerationBackend,
    ) -> Self {
        let center = coord.world_center(chunk_size);
        let mut chunk = Self {
            coord,
            center,
            bounds: Rect::from_center_size(center, chunk_size),
            state: ChunkState::Created,
            map_data: None,
            lod_meshes: vec![MeshSlot::Empty; lod_count],
            visible: false,
            current_lod: None,
            desired_lod: None,
        };
        chunk.request_map_data(backend);
        chunk
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn map_data(&self) -> Option<&Arc<MapData>> {
        self.map_data.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn current_lod(&self) -> Option<usize> {
        self.current_lod
    }

    pub fn desired_lod(&self) -> Option<usize> {
        self.desired_lod
    }

    pub fn mesh_slot(&self, lod_index: usize) -> Option<&MeshSlot> {
        self.lod_meshes.get(lod_index)
    }

    fn request_map_data(&mut self, backend: &mut impl GenerationBackend) {
        let queued = backend.request_map_data(self.coord, self.center);
        if queued || backend.is_pending(RequestKey::MapData(self.coord)) {
            self.state = ChunkState::MapPending;
        } else {
            log::warn!("Chunk {} could not queue its map data request", self.coord);
        }
    }

    /// Store delivered map data. Returns `false` if data was already present.
    pub fn on_map_data(&mut self, map_data: MapData, renderer: &mut impl TerrainRenderer) -> bool {
        if self.state == ChunkState::MapReady {
            log::warn!("Chunk {} received map data twice, ignoring", self.coord);
            return false;
        }
        renderer.set_chunk_texture(self.coord, &map_data.color_map);
        self.map_data = Some(Arc::new(map_data));
        self.state = ChunkState::MapReady;
        log::debug!("Chunk {} map data ready", self.coord);
        true
    }

    /// Map generation failed; the next evaluation asks again
    pub fn on_map_failed(&mut self) {
        if self.state == ChunkState::MapPending {
            self.state = ChunkState::Created;
        }
    }

    /// Cache a delivered mesh and display it if it is the LOD we want now.
    /// Meshes for LODs no longer wanted are kept for later.
    pub fn on_mesh(&mut self, lod_index: usize, mesh: MeshGeometry, renderer: &mut impl TerrainRenderer) {
        let Some(slot) = self.lod_meshes.get_mut(lod_index) else {
            log::warn!("Chunk {} got a mesh for unknown LOD slot {}", self.coord, lod_index);
            return;
        };
        let mesh = Arc::new(mesh);
        *slot = MeshSlot::Ready(Arc::clone(&mesh));

        if self.visible && self.desired_lod == Some(lod_index) && self.current_lod != Some(lod_index) {
            self.current_lod = Some(lod_index);
            renderer.set_chunk_mesh(self.coord, mesh);
        }
    }

    /// Mesh generation failed; the slot may be requested again
    pub fn on_mesh_failed(&mut self, lod_index: usize) {
        if let Some(slot) = self.lod_meshes.get_mut(lod_index) {
            if slot.is_requested() {
                *slot = MeshSlot::Empty;
            }
        }
    }

    /// Re-evaluate visibility and LOD against the viewer. Returns visibility.
    ///
    /// Visibility is set even when no mesh for the chosen LOD exists yet; the
    /// previous mesh stays on screen until the request resolves.
    pub fn update(
        &mut self,
        viewer: Vec2,
        lods: &LodTable,
        backend: &mut impl GenerationBackend,
        renderer: &mut impl TerrainRenderer,
    ) -> bool {
        match self.state {
            ChunkState::Created => {
                self.request_map_data(backend);
                return self.visible;
            }
            ChunkState::MapPending => return self.visible,
            ChunkState::MapReady => {}
        }

        let distance = self.bounds.distance_to_point(viewer);
        let lod_index = lods.select(distance);
        let visible = lod_index.is_some();

        if let Some(lod_index) = lod_index {
            self.desired_lod = Some(lod_index);
            if self.current_lod != Some(lod_index) {
                match self.lod_meshes.get(lod_index) {
                    Some(MeshSlot::Ready(mesh)) => {
                        let mesh = Arc::clone(mesh);
                        self.current_lod = Some(lod_index);
                        renderer.set_chunk_mesh(self.coord, mesh);
                    }
                    Some(MeshSlot::Empty) => self.request_mesh(lod_index, lods, backend),
                    Some(MeshSlot::Requested) | None => {}
                }
            }
        }

        self.set_visible(visible, renderer);
        visible
    }

    fn request_mesh(&mut self, lod_index: usize, lods: &LodTable, backend: &mut impl GenerationBackend) {
        let (Some(map_data), Some(descriptor)) = (self.map_data.clone(), lods.get(lod_index)) else {
            return;
        };
        let queued = backend.request_mesh(self.coord, lod_index, descriptor.lod, map_data);
        if queued || backend.is_pending(RequestKey::Mesh(self.coord, lod_index)) {
            self.lod_meshes[lod_index] = MeshSlot::Requested;
            log::debug!("Chunk {} requested LOD {}", self.coord, descriptor.lod);
        }
    }

    /// Toggle visibility, notifying the renderer only on change
    pub fn set_visible(&mut self, visible: bool, renderer: &mut impl TerrainRenderer) {
        if self.visible != visible {
            self.visible = visible;
            renderer.set_chunk_visible(self.coord, visible);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessRenderer;
    use crate::streaming::generator::tests::{test_services, CountingMeshBuilder};
    use crate::streaming::generator::{GenerationResult, InlineGenerator};
    use crate::streaming::lod::LodDescriptor;
    use std::sync::atomic::Ordering;

    const CHUNK_SIZE: f32 = 16.0;

    fn setup() -> (InlineGenerator, HeadlessRenderer, Arc<CountingMeshBuilder>) {
        let builder = Arc::new(CountingMeshBuilder::default());
        let generator = InlineGenerator::new(test_services(17, builder.clone()));
        (generator, HeadlessRenderer::new(), builder)
    }

    fn lods() -> LodTable {
        LodTable::new(vec![
            LodDescriptor::new(0, 10.0),
            LodDescriptor::new(1, 20.0),
            LodDescriptor::new(2, 30.0),
        ])
        .unwrap()
    }

    /// Deliver every queued result to `chunk`
    fn deliver(chunk: &mut TerrainChunk, generator: &mut InlineGenerator, renderer: &mut HeadlessRenderer) {
        for result in generator.poll_results() {
            match result {
                GenerationResult::MapData { map_data, .. } => {
                    chunk.on_map_data(map_data, renderer);
                }
                GenerationResult::Mesh { lod_index, mesh, .. } => chunk.on_mesh(lod_index, mesh, renderer),
                GenerationResult::Failed { .. } => panic!("unexpected failure"),
            }
        }
    }

    #[test]
    fn test_chunk_coord_from_world_pos() {
        assert_eq!(ChunkCoord::from_world_pos(Vec2::ZERO, 240.0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_world_pos(Vec2::new(400.0, 0.0), 240.0), ChunkCoord::new(2, 0));
        assert_eq!(ChunkCoord::from_world_pos(Vec2::new(-130.0, 100.0), 240.0), ChunkCoord::new(-1, 0));
        assert_eq!(ChunkCoord::new(1, -2).world_center(240.0), Vec2::new(240.0, -480.0));
        assert_eq!(ChunkCoord::new(1, -2).to_string(), "(1, -2)");
    }

    #[test]
    fn test_chunk_coord_saturates_at_range_edge() {
        let far = ChunkCoord::from_world_pos(Vec2::new(1.0e12, -1.0e12), 240.0);
        assert_eq!(far, ChunkCoord::new(i32::MAX, i32::MIN));
        assert_eq!(far.offset(2, -2), far);
        assert_eq!(far.offset(-1, 1), ChunkCoord::new(i32::MAX - 1, i32::MIN + 1));
    }

    #[test]
    fn test_new_chunk_requests_map_once() {
        let (mut generator, _, _) = setup();
        let chunk = TerrainChunk::new(ChunkCoord::new(3, 4), CHUNK_SIZE, 3, &mut generator);

        assert_eq!(chunk.state(), ChunkState::MapPending);
        assert_eq!(chunk.bounds().center(), Vec2::new(48.0, 64.0));
        assert!(generator.is_pending(RequestKey::MapData(ChunkCoord::new(3, 4))));
        assert_eq!(generator.pending_count(), 1);
        assert!(!chunk.is_visible());
        assert_eq!(chunk.current_lod(), None);
    }

    #[test]
    fn test_no_mesh_request_before_map_data() {
        let (mut generator, mut renderer, builder) = setup();
        let mut chunk = TerrainChunk::new(ChunkCoord::new(0, 0), CHUNK_SIZE, 3, &mut generator);

        assert!(!chunk.update(Vec2::ZERO, &lods(), &mut generator, &mut renderer));
        assert_eq!(generator.pending_count(), 1);
        assert_eq!(builder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_lifecycle_to_active_mesh() {
        let (mut generator, mut renderer, _) = setup();
        let coord = ChunkCoord::new(0, 0);
        let lods = lods();
        let mut chunk = TerrainChunk::new(coord, CHUNK_SIZE, lods.len(), &mut generator);

        deliver(&mut chunk, &mut generator, &mut renderer);
        assert_eq!(chunk.state(), ChunkState::MapReady);
        assert!(renderer.has_texture(coord));

        // Visible at once, mesh still pending
        assert!(chunk.update(Vec2::ZERO, &lods, &mut generator, &mut renderer));
        assert!(renderer.is_visible(coord));
        assert!(chunk.mesh_slot(0).unwrap().is_requested());
        assert_eq!(chunk.current_lod(), None);

        deliver(&mut chunk, &mut generator, &mut renderer);
        assert!(chunk.mesh_slot(0).unwrap().is_ready());
        assert_eq!(chunk.current_lod(), Some(0));
        assert_eq!(renderer.mesh_lod(coord), Some(0));
    }

    #[test]
    fn test_single_in_flight_mesh_request() {
        let (mut generator, mut renderer, builder) = setup();
        let lods = lods();
        let mut chunk = TerrainChunk::new(ChunkCoord::new(0, 0), CHUNK_SIZE, lods.len(), &mut generator);
        deliver(&mut chunk, &mut generator, &mut renderer);

        chunk.update(Vec2::ZERO, &lods, &mut generator, &mut renderer);
        chunk.update(Vec2::ZERO, &lods, &mut generator, &mut renderer);
        chunk.update(Vec2::new(1.0, 0.0), &lods, &mut generator, &mut renderer);
        deliver(&mut chunk, &mut generator, &mut renderer);
        assert_eq!(builder.calls.load(Ordering::SeqCst), 1);

        // Already cached: re-evaluating never rebuilds
        chunk.update(Vec2::ZERO, &lods, &mut generator, &mut renderer);
        assert_eq!(generator.pending_count(), 0);
        assert_eq!(builder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cached_lod_applied_without_request() {
        let (mut generator, mut renderer, builder) = setup();
        let coord = ChunkCoord::new(0, 0);
        let lods = lods();
        let mut chunk = TerrainChunk::new(coord, CHUNK_SIZE, lods.len(), &mut generator);
        deliver(&mut chunk, &mut generator, &mut renderer);

        // Bounds span -8..8; 23 units out is 15 from the edge -> LOD 1
        let near = Vec2::ZERO;
        let far = Vec2::new(23.0, 0.0);

        chunk.update(near, &lods, &mut generator, &mut renderer);
        deliver(&mut chunk, &mut generator, &mut renderer);
        chunk.update(far, &lods, &mut generator, &mut renderer);
        deliver(&mut chunk, &mut generator, &mut renderer);
        assert_eq!(chunk.current_lod(), Some(1));
        assert_eq!(builder.calls.load(Ordering::SeqCst), 2);

        chunk.update(near, &lods, &mut generator, &mut renderer);
        assert_eq!(chunk.current_lod(), Some(0));
        assert_eq!(renderer.mesh_lod(coord), Some(0));
        assert_eq!(generator.pending_count(), 0);
        assert_eq!(builder.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stale_mesh_cached_not_applied() {
        let (mut generator, mut renderer, _) = setup();
        let lods = lods();
        let mut chunk = TerrainChunk::new(ChunkCoord::new(0, 0), CHUNK_SIZE, lods.len(), &mut generator);
        deliver(&mut chunk, &mut generator, &mut renderer);

        chunk.update(Vec2::ZERO, &lods, &mut generator, &mut renderer);
        // Viewer moves to LOD 1 range before the LOD 0 mesh lands
        chunk.update(Vec2::new(23.0, 0.0), &lods, &mut generator, &mut renderer);
        deliver(&mut chunk, &mut generator, &mut renderer);

        assert!(chunk.mesh_slot(0).unwrap().is_ready());
        assert!(chunk.mesh_slot(1).unwrap().is_ready());
        assert_eq!(chunk.desired_lod(), Some(1));
        assert_eq!(chunk.current_lod(), Some(1));
    }

    #[test]
    fn test_out_of_range_hides_chunk() {
        let (mut generator, mut renderer, _) = setup();
        let coord = ChunkCoord::new(0, 0);
        let lods = lods();
        let mut chunk = TerrainChunk::new(coord, CHUNK_SIZE, lods.len(), &mut generator);
        deliver(&mut chunk, &mut generator, &mut renderer);

        assert!(chunk.update(Vec2::ZERO, &lods, &mut generator, &mut renderer));
        assert!(!chunk.update(Vec2::new(100.0, 0.0), &lods, &mut generator, &mut renderer));
        assert!(!renderer.is_visible(coord));
    }

    #[test]
    fn test_failed_requests_retry() {
        let (mut generator, mut renderer, _) = setup();
        let lods = lods();
        let coord = ChunkCoord::new(0, 0);
        let mut chunk = TerrainChunk::new(coord, CHUNK_SIZE, lods.len(), &mut generator);

        // Drop the in-flight map request and report failure
        generator.poll_results();
        chunk.on_map_failed();
        assert_eq!(chunk.state(), ChunkState::Created);
        chunk.update(Vec2::ZERO, &lods, &mut generator, &mut renderer);
        assert_eq!(chunk.state(), ChunkState::MapPending);

        deliver(&mut chunk, &mut generator, &mut renderer);
        chunk.update(Vec2::ZERO, &lods, &mut generator, &mut renderer);
        generator.poll_results();
        chunk.on_mesh_failed(0);
        assert!(matches!(chunk.mesh_slot(0), Some(MeshSlot::Empty)));
        chunk.update(Vec2::ZERO, &lods, &mut generator, &mut renderer);
        assert!(generator.is_pending(RequestKey::Mesh(coord, 0)));
    }

    #[test]
    fn test_duplicate_map_data_ignored() {
        let (mut generator, mut renderer, _) = setup();
        let mut chunk = TerrainChunk::new(ChunkCoord::new(0, 0), CHUNK_SIZE, 3, &mut generator);
        deliver(&mut chunk, &mut generator, &mut renderer);
        let original = chunk.map_data().cloned().unwrap();

        let extra = MapData {
            height_map: crate::terrain::NoiseGrid::filled(1, 1, 0.0),
            color_map: crate::terrain::ColorMap::new(1, 1, vec![[0, 0, 0, 255]]),
        };
        assert!(!chunk.on_map_data(extra, &mut renderer));
        assert!(Arc::ptr_eq(chunk.map_data().unwrap(), &original));
    }
}
