//! Generation requests and the backends that fulfil them
//!
//! The streamer never touches worker threads directly. It submits value-only
//! requests to a [`GenerationBackend`] and collects finished results once per
//! tick through [`GenerationBackend::poll_results`], which is the only point
//! where chunk state is mutated.

use std::collections::{HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use glam::Vec2;

use super::chunk::ChunkCoord;
use crate::terrain::{MapData, MapDataService, MeshBuilder, MeshGeometry};

/// Identity of an in-flight request. At most one per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKey {
    MapData(ChunkCoord),
    /// Chunk and LOD slot index
    Mesh(ChunkCoord, usize),
}

/// Work item handed to a backend
#[derive(Clone, Debug)]
pub enum GenerationRequest {
    MapData {
        coord: ChunkCoord,
        center: Vec2,
    },
    Mesh {
        coord: ChunkCoord,
        lod_index: usize,
        lod: u32,
        map_data: Arc<MapData>,
    },
}

impl GenerationRequest {
    pub fn key(&self) -> RequestKey {
        match self {
            GenerationRequest::MapData { coord, .. } => RequestKey::MapData(*coord),
            GenerationRequest::Mesh { coord, lod_index, .. } => RequestKey::Mesh(*coord, *lod_index),
        }
    }

    /// Run the request. A panic inside a collaborator becomes `Failed`.
    pub fn execute(self, services: &GenerationServices) -> GenerationResult {
        let key = self.key();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match self {
            GenerationRequest::MapData { coord, center } => GenerationResult::MapData {
                coord,
                map_data: services.map_data.generate(center),
            },
            GenerationRequest::Mesh { coord, lod_index, lod, map_data } => GenerationResult::Mesh {
                coord,
                lod_index,
                mesh: services.mesh_builder.build_mesh(&map_data.height_map, lod),
            },
        }));

        outcome.unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "generation task panicked".to_string());
            GenerationResult::Failed { key, message }
        })
    }
}

/// Finished work delivered back to the streamer
#[derive(Debug)]
pub enum GenerationResult {
    MapData {
        coord: ChunkCoord,
        map_data: MapData,
    },
    Mesh {
        coord: ChunkCoord,
        lod_index: usize,
        mesh: MeshGeometry,
    },
    Failed {
        key: RequestKey,
        message: String,
    },
}

impl GenerationResult {
    pub fn key(&self) -> RequestKey {
        match self {
            GenerationResult::MapData { coord, .. } => RequestKey::MapData(*coord),
            GenerationResult::Mesh { coord, lod_index, .. } => RequestKey::Mesh(*coord, *lod_index),
            GenerationResult::Failed { key, .. } => *key,
        }
    }
}

/// Immutable collaborators shared with worker threads
#[derive(Clone)]
pub struct GenerationServices {
    pub map_data: Arc<MapDataService>,
    pub mesh_builder: Arc<dyn MeshBuilder>,
}

impl GenerationServices {
    pub fn new(map_data: Arc<MapDataService>, mesh_builder: Arc<dyn MeshBuilder>) -> Self {
        Self { map_data, mesh_builder }
    }
}

/// Non-blocking request interface used by the streamer
pub trait GenerationBackend {
    /// Queue a request. Returns `false` if one with the same key is already
    /// in flight or the backend cannot accept work.
    fn submit(&mut self, request: GenerationRequest) -> bool;

    /// Drain finished results without blocking
    fn poll_results(&mut self) -> Vec<GenerationResult>;

    fn is_pending(&self, key: RequestKey) -> bool;

    fn pending_count(&self) -> usize;

    fn request_map_data(&mut self, coord: ChunkCoord, center: Vec2) -> bool {
        self.submit(GenerationRequest::MapData { coord, center })
    }

    fn request_mesh(&mut self, coord: ChunkCoord, lod_index: usize, lod: u32, map_data: Arc<MapData>) -> bool {
        self.submit(GenerationRequest::Mesh { coord, lod_index, lod, map_data })
    }
}

/// Runs queued requests on the caller's thread during the next poll.
///
/// Work is deferred by one tick, which keeps `update` cheap and makes
/// results fully deterministic.
pub struct InlineGenerator {
    services: GenerationServices,
    queue: VecDeque<GenerationRequest>,
    pending: HashSet<RequestKey>,
    /// Maximum requests executed per poll (`None` = all queued)
    jobs_per_poll: Option<usize>,
}

impl InlineGenerator {
    pub fn new(services: GenerationServices) -> Self {
        Self {
            services,
            queue: VecDeque::new(),
            pending: HashSet::new(),
            jobs_per_poll: None,
        }
    }

    /// Limit how much work a single poll may run
    pub fn with_jobs_per_poll(mut self, jobs: usize) -> Self {
        self.jobs_per_poll = Some(jobs.max(1));
        self
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }
}

impl GenerationBackend for InlineGenerator {
    fn submit(&mut self, request: GenerationRequest) -> bool {
        if !self.pending.insert(request.key()) {
            return false;
        }
        self.queue.push_back(request);
        true
    }

    fn poll_results(&mut self) -> Vec<GenerationResult> {
        let budget = self.jobs_per_poll.unwrap_or(self.queue.len()).min(self.queue.len());
        let mut results = Vec::with_capacity(budget);
        for request in self.queue.drain(..budget) {
            let result = request.execute(&self.services);
            self.pending.remove(&result.key());
            results.push(result);
        }
        results
    }

    fn is_pending(&self, key: RequestKey) -> bool {
        self.pending.contains(&key)
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
