//! Height-banded color maps

use serde::{Deserialize, Serialize};

use super::noise_field::NoiseGrid;

/// RGBA8 color
pub type Rgba = [u8; 4];

/// Per-sample colors matching a [`NoiseGrid`]
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl ColorMap {
    pub fn new(width: usize, height: usize, pixels: Vec<Rgba>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self { width, height, pixels }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Rgba {
        self.pixels[y * self.width + x]
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Pixels flattened into RGBA bytes
    pub fn as_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flatten().copied().collect()
    }
}

/// Turns a height field into a color map
pub trait Colorizer: Send + Sync {
    fn colorize(&self, heights: &NoiseGrid) -> ColorMap;
}

/// A named band of normalized heights, inclusive of its upper `height`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainRegion {
    pub name: String,
    pub height: f32,
    pub color: Rgba,
}

impl TerrainRegion {
    pub fn new(name: &str, height: f32, color: Rgba) -> Self {
        Self { name: name.to_string(), height, color }
    }
}

/// Default banding from deep water up to snow caps
pub fn default_regions() -> Vec<TerrainRegion> {
    vec![
        TerrainRegion::new("deep_water", 0.3, [50, 99, 195, 255]),
        TerrainRegion::new("shallow_water", 0.4, [54, 103, 199, 255]),
        TerrainRegion::new("sand", 0.45, [210, 208, 125, 255]),
        TerrainRegion::new("grass", 0.55, [86, 152, 23, 255]),
        TerrainRegion::new("grass_high", 0.6, [62, 107, 18, 255]),
        TerrainRegion::new("rock", 0.7, [90, 69, 60, 255]),
        TerrainRegion::new("rock_high", 0.9, [75, 60, 53, 255]),
        TerrainRegion::new("snow", 1.0, [255, 255, 255, 255]),
    ]
}

/// Colors each sample with the first region whose upper bound covers it
#[derive(Clone, Debug)]
pub struct RegionColorizer {
    regions: Vec<TerrainRegion>,
}

impl RegionColorizer {
    /// Regions are sorted by height; an empty list falls back to the defaults
    pub fn new(mut regions: Vec<TerrainRegion>) -> Self {
        if regions.is_empty() {
            regions = default_regions();
        }
        regions.sort_by(|a, b| a.height.total_cmp(&b.height));
        Self { regions }
    }

    pub fn regions(&self) -> &[TerrainRegion] {
        &self.regions
    }

    /// Color for a single normalized height
    pub fn color_at(&self, height: f32) -> Rgba {
        self.regions
            .iter()
            .find(|region| height <= region.height)
            .or(self.regions.last())
            .map(|region| region.color)
            .unwrap_or([0, 0, 0, 255])
    }
}

impl Default for RegionColorizer {
    fn default() -> Self {
        Self::new(default_regions())
    }
}

impl Colorizer for RegionColorizer {
    fn colorize(&self, heights: &NoiseGrid) -> ColorMap {
        let pixels = heights.values().iter().map(|&h| self.color_at(h)).collect();
        ColorMap::new(heights.width(), heights.height(), pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_at_bands() {
        let colorizer = RegionColorizer::default();
        assert_eq!(colorizer.color_at(0.0), [50, 99, 195, 255]);
        assert_eq!(colorizer.color_at(0.3), [50, 99, 195, 255]);
        assert_eq!(colorizer.color_at(0.31), [54, 103, 199, 255]);
        assert_eq!(colorizer.color_at(1.0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_above_top_region_uses_last() {
        let colorizer = RegionColorizer::new(vec![
            TerrainRegion::new("low", 0.5, [1, 1, 1, 255]),
            TerrainRegion::new("mid", 0.8, [2, 2, 2, 255]),
        ]);
        assert_eq!(colorizer.color_at(0.95), [2, 2, 2, 255]);
    }

    #[test]
    fn test_regions_sorted() {
        let colorizer = RegionColorizer::new(vec![
            TerrainRegion::new("high", 0.9, [9, 9, 9, 255]),
            TerrainRegion::new("low", 0.1, [1, 1, 1, 255]),
        ]);
        assert_eq!(colorizer.regions()[0].name, "low");
        assert_eq!(colorizer.color_at(0.05), [1, 1, 1, 255]);
    }

    #[test]
    fn test_empty_regions_fall_back_to_defaults() {
        let colorizer = RegionColorizer::new(Vec::new());
        assert_eq!(colorizer.regions().len(), default_regions().len());
    }

    #[test]
    fn test_colorize_matches_grid() {
        let grid = NoiseGrid::filled(4, 3, 0.5);
        let map = RegionColorizer::default().colorize(&grid);
        assert_eq!(map.width(), 4);
        assert_eq!(map.height(), 3);
        assert_eq!(map.pixels().len(), 12);
        assert_eq!(map.get(3, 2), [86, 152, 23, 255]);
        assert_eq!(map.as_bytes().len(), 48);
    }
}
