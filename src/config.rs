//! World configuration loaded from JSON

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::streaming::{GenerationServices, StreamerConfig};
use crate::terrain::color::default_regions;
use crate::terrain::{GridMeshBuilder, MapDataService, MeshSettings, NoiseSettings, RegionColorizer, TerrainRegion};

/// Everything needed to stream one world. The seed alone reproduces the terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub noise: NoiseSettings,
    pub streamer: StreamerConfig,
    pub mesh: MeshSettings,
    /// Color bands, ascending by height
    pub regions: Vec<TerrainRegion>,
    /// Maximum generation jobs running at once
    pub max_concurrent_jobs: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            streamer: StreamerConfig::default(),
            mesh: MeshSettings::default(),
            regions: default_regions(),
            max_concurrent_jobs: 4,
        }
    }
}

impl WorldConfig {
    /// Read and validate a JSON config file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::info!("Loaded world config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.streamer.validate()?;
        if self.max_concurrent_jobs == 0 {
            return Err(Error::Config("max_concurrent_jobs must be at least 1".to_string()));
        }
        if self.noise.scale <= 0.0 {
            log::warn!("Noise scale {} is not positive and will be clamped", self.noise.scale);
        }
        Ok(())
    }

    /// Map data and mesh collaborators for the generation backends
    pub fn generation_services(&self) -> GenerationServices {
        let colorizer = Arc::new(RegionColorizer::new(self.regions.clone()));
        let map_data = MapDataService::new(self.noise.clone(), self.streamer.chunk_samples, colorizer);
        let mesh_builder = Arc::new(GridMeshBuilder::new(self.mesh.clone()));
        GenerationServices::new(Arc::new(map_data), mesh_builder)
    }
}
