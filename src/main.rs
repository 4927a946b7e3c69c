//! Landmass - headless terrain streaming fly-through
//!
//! Usage: cargo run --release -- [CONFIG.json] [--seconds <S>] [--speed <UNITS_PER_S>]
//!
//! Streams terrain around a viewer flying along +X and logs how many
//! chunks are registered, visible and in flight.

use std::time::{Duration, Instant};

use glam::Vec2;

use landmass::config::WorldConfig;
use landmass::core::{logging, Result};
use landmass::render::HeadlessRenderer;
use landmass::streaming::{AsyncGenerator, ChunkStreamer, GenerationBackend};

const TICK: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1).filter(|a| !a.starts_with("--")) {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    let seconds = parse_f32_arg(&args, "--seconds").unwrap_or(10.0);
    let speed = parse_f32_arg(&args, "--speed").unwrap_or(120.0);

    log::info!(
        "Seed {}, scale {}, {} octaves, {} LOD tiers",
        config.noise.seed,
        config.noise.scale,
        config.noise.octaves,
        config.streamer.lods.len()
    );

    let backend = AsyncGenerator::new(config.generation_services(), config.max_concurrent_jobs)?;
    let mut streamer = ChunkStreamer::new(&config.streamer, backend, HeadlessRenderer::new())?;

    let start = Instant::now();
    let mut ticks = 0u64;
    let mut recomputes = 0u64;
    let mut last_report = Instant::now();

    while start.elapsed().as_secs_f32() < seconds {
        let viewer = Vec2::new(start.elapsed().as_secs_f32() * speed, 0.0);
        if streamer.update(viewer) {
            recomputes += 1;
        }
        ticks += 1;

        if last_report.elapsed() >= Duration::from_secs(1) {
            report(&streamer);
            last_report = Instant::now();
        }
        std::thread::sleep(TICK);
    }

    // Let in-flight work land so the final report is complete
    let drain_deadline = Instant::now() + Duration::from_secs(5);
    let final_position = streamer.viewer_position();
    while streamer.backend().pending_count() > 0 && Instant::now() < drain_deadline {
        streamer.update(final_position);
        std::thread::sleep(TICK);
    }

    log::info!("{} ticks, {} visible-set recomputes", ticks, recomputes);
    report(&streamer);
    Ok(())
}

fn report(streamer: &ChunkStreamer<AsyncGenerator, HeadlessRenderer>) {
    let renderer = streamer.renderer();
    log::info!(
        "viewer ({:.0}, {:.0}): {} chunks registered, {} visible, {} triangles, {} jobs in flight",
        streamer.viewer_position().x,
        streamer.viewer_position().y,
        streamer.chunk_count(),
        renderer.visible_count(),
        renderer.visible_triangles(),
        streamer.backend().pending_count()
    );
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
