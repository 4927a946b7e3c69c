//! Viewer-driven chunk streaming and LOD management

pub mod lod;
pub mod chunk;
pub mod generator;
pub mod async_generator;
pub mod streamer;

pub use lod::{LodDescriptor, LodTable, DEFAULT_LOD_DESCRIPTORS};
pub use chunk::{ChunkCoord, ChunkState, MeshSlot, TerrainChunk};
pub use generator::{
    GenerationBackend, GenerationRequest, GenerationResult, GenerationServices,
    InlineGenerator, RequestKey,
};
pub use async_generator::AsyncGenerator;
pub use streamer::{ChunkStreamer, StreamerConfig};
