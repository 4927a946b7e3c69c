//! Per-chunk height and color data

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::color::{ColorMap, Colorizer};
use super::noise_field::{NoiseField, NoiseGrid, NoiseParameters, NormalizeMode};

/// World-wide noise settings shared by every chunk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub seed: u32,
    pub scale: f32,
    pub octaves: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    /// Extra offset in noise space, applied to every chunk
    pub offset: Vec2,
    pub normalize_mode: NormalizeMode,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            scale: 50.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
            normalize_mode: NormalizeMode::Local,
        }
    }
}

/// Height field plus its color classification. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct MapData {
    pub height_map: NoiseGrid,
    pub color_map: ColorMap,
}

/// Builds [`MapData`] for chunk centers.
///
/// Pure with respect to its inputs; safe to call from worker threads.
pub struct MapDataService {
    settings: NoiseSettings,
    map_size: usize,
    colorizer: Arc<dyn Colorizer>,
}

impl MapDataService {
    /// `map_size` is the sample count along each side of a chunk
    pub fn new(settings: NoiseSettings, map_size: usize, colorizer: Arc<dyn Colorizer>) -> Self {
        Self { settings, map_size, colorizer }
    }

    pub fn settings(&self) -> &NoiseSettings {
        &self.settings
    }

    pub fn map_size(&self) -> usize {
        self.map_size
    }

    /// Noise inputs for a chunk centered at `center` (world units).
    /// The world position is converted to noise space so neighbours line up.
    pub fn noise_parameters(&self, center: Vec2) -> NoiseParameters {
        let mut params = NoiseParameters {
            width: self.map_size,
            height: self.map_size,
            seed: self.settings.seed,
            scale: self.settings.scale,
            octaves: self.settings.octaves,
            persistence: self.settings.persistence,
            lacunarity: self.settings.lacunarity,
            offset: self.settings.offset,
            normalize_mode: self.settings.normalize_mode,
        };
        params.offset += center / params.effective_scale();
        params
    }

    /// Generate height and color data for one chunk
    pub fn generate(&self, center: Vec2) -> MapData {
        let height_map = NoiseField::new(self.noise_parameters(center)).generate();
        let color_map = self.colorizer.colorize(&height_map);
        MapData { height_map, color_map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::color::RegionColorizer;

    fn service(map_size: usize) -> MapDataService {
        MapDataService::new(NoiseSettings::default(), map_size, Arc::new(RegionColorizer::default()))
    }

    #[test]
    fn test_noise_parameters_offset() {
        let service = service(241);
        let params = service.noise_parameters(Vec2::new(240.0, -480.0));
        assert_eq!(params.width, 241);
        assert_eq!(params.height, 241);
        assert_eq!(params.offset, Vec2::new(4.8, -9.6));
        assert_eq!(params.seed, 42);
    }

    #[test]
    fn test_noise_parameters_zero_scale() {
        let service = MapDataService::new(
            NoiseSettings { scale: 0.0, ..Default::default() },
            16,
            Arc::new(RegionColorizer::default()),
        );
        let params = service.noise_parameters(Vec2::new(1.0, 0.0));
        assert!(params.offset.x.is_finite());
    }

    #[test]
    fn test_generate_sizes_match() {
        let data = service(33).generate(Vec2::ZERO);
        assert_eq!(data.height_map.width(), 33);
        assert_eq!(data.color_map.width(), 33);
        assert_eq!(data.color_map.pixels().len(), 33 * 33);
    }

    #[test]
    fn test_generate_deterministic_per_center() {
        let service = service(17);
        let a = service.generate(Vec2::new(16.0, 0.0));
        let b = service.generate(Vec2::new(16.0, 0.0));
        let c = service.generate(Vec2::new(32.0, 0.0));
        assert_eq!(a, b);
        assert_ne!(a.height_map, c.height_map);
    }
}
