//! Map generator binary - renders one chunk's height and color maps to PNG.
//!
//! Usage: cargo run --release --bin generate_map -- [OPTIONS]
//!
//! Options:
//!   --seed <SEED>       Random seed (default: 42)
//!   --scale <SCALE>     Noise scale (default: 50.0)
//!   --octaves <N>       Octave count (default: 4)
//!   --size <SAMPLES>    Samples per side (default: 241)
//!   --x <X> --y <Y>     Chunk coordinate (default: 0 0)
//!   --global            Use global normalization
//!   --out <DIR>         Output directory (default: "maps")

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use landmass::core::{logging, Result};
use landmass::streaming::ChunkCoord;
use landmass::terrain::export::{save_color_map, save_height_map};
use landmass::terrain::{MapDataService, NoiseSettings, NormalizeMode, RegionColorizer};

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let defaults = NoiseSettings::default();
    let settings = NoiseSettings {
        seed: parse_u32_arg(&args, "--seed").unwrap_or(defaults.seed),
        scale: parse_f32_arg(&args, "--scale").unwrap_or(defaults.scale),
        octaves: parse_u32_arg(&args, "--octaves").unwrap_or(defaults.octaves),
        normalize_mode: if args.iter().any(|a| a == "--global") {
            NormalizeMode::Global
        } else {
            NormalizeMode::Local
        },
        ..defaults
    };
    let size = parse_u32_arg(&args, "--size").unwrap_or(241).max(2) as usize;
    let coord = ChunkCoord::new(
        parse_i32_arg(&args, "--x").unwrap_or(0),
        parse_i32_arg(&args, "--y").unwrap_or(0),
    );
    let output_dir = PathBuf::from(parse_str_arg(&args, "--out").unwrap_or_else(|| "maps".to_string()));

    println!("=== Landmass Map Generator ===");
    println!("Seed:    {}", settings.seed);
    println!("Scale:   {}, Octaves: {}", settings.scale, settings.octaves);
    println!("Chunk:   {} ({} samples)", coord, size);
    println!("Output:  {}", output_dir.display());

    let service = MapDataService::new(settings, size, Arc::new(RegionColorizer::default()));
    let start = Instant::now();
    let map_data = service.generate(coord.world_center((size - 1) as f32));
    log::info!("Generated {}x{} map in {:.1?}", size, size, start.elapsed());

    std::fs::create_dir_all(&output_dir)?;
    let stem = format!("chunk_{}_{}", coord.x, coord.y);
    let height_path = output_dir.join(format!("{}_height.png", stem));
    let color_path = output_dir.join(format!("{}_color.png", stem));
    save_height_map(&map_data.height_map, &height_path)?;
    save_color_map(&map_data.color_map, &color_path)?;

    println!("Wrote {}", height_path.display());
    println!("Wrote {}", color_path.display());
    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_i32_arg(args: &[String], flag: &str) -> Option<i32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
