//! PNG export of height and color maps

use std::path::Path;

use image::{GrayImage, Luma, RgbaImage};

use super::color::ColorMap;
use super::noise_field::NoiseGrid;
use crate::core::{Error, Result};

/// Grayscale image of a normalized height field (0.0 black, 1.0 white)
pub fn height_map_image(grid: &NoiseGrid) -> GrayImage {
    GrayImage::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        let h = grid.get(x as usize, y as usize).clamp(0.0, 1.0);
        Luma([(h * 255.0).round() as u8])
    })
}

/// RGBA image of a color map
pub fn color_map_image(map: &ColorMap) -> Result<RgbaImage> {
    RgbaImage::from_raw(map.width() as u32, map.height() as u32, map.as_bytes())
        .ok_or_else(|| Error::Generation("color map size does not match its pixels".to_string()))
}

pub fn save_height_map(grid: &NoiseGrid, path: &Path) -> Result<()> {
    height_map_image(grid).save(path)?;
    Ok(())
}

pub fn save_color_map(map: &ColorMap, path: &Path) -> Result<()> {
    color_map_image(map)?.save(path)?;
    Ok(())
}
