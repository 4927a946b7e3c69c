//! Procedural height fields and the per-chunk data built from them

pub mod noise_field;
pub use noise_field::{NoiseField, NoiseGrid, NoiseParameters, NormalizeMode};

pub mod map_data;
pub use map_data::{MapData, MapDataService, NoiseSettings};

pub mod color;
pub use color::{ColorMap, Colorizer, RegionColorizer, TerrainRegion};

pub mod mesh;
pub use mesh::{GridMeshBuilder, MeshBuilder, MeshGeometry, MeshSettings, MeshVertex};

pub mod export;
