use criterion::{criterion_group, criterion_main, Criterion, black_box};

use landmass::config::WorldConfig;
use landmass::render::HeadlessRenderer;
use landmass::streaming::{ChunkStreamer, InlineGenerator, StreamerConfig};
use landmass::terrain::{GridMeshBuilder, MeshBuilder, NoiseParameters, NormalizeMode};
use landmass::terrain::noise_field::generate;

use glam::Vec2;

fn bench_noise_241(c: &mut Criterion) {
    let params = NoiseParameters::default();

    c.bench_function("noise_generate_241", |b| {
        b.iter(|| generate(black_box(&params)));
    });
}

fn bench_noise_241_global(c: &mut Criterion) {
    let params = NoiseParameters {
        normalize_mode: NormalizeMode::Global,
        ..Default::default()
    };

    c.bench_function("noise_generate_241_global", |b| {
        b.iter(|| generate(black_box(&params)));
    });
}

fn bench_mesh_lods(c: &mut Criterion) {
    let heights = generate(&NoiseParameters::default());
    let builder = GridMeshBuilder::default();

    for lod in [0u32, 1, 2] {
        c.bench_function(&format!("mesh_build_241_lod{}", lod), |b| {
            b.iter(|| builder.build_mesh(black_box(&heights), lod));
        });
    }
}

fn bench_streamer_tick(c: &mut Criterion) {
    let config = WorldConfig {
        streamer: StreamerConfig { chunk_samples: 61, ..Default::default() },
        ..Default::default()
    };

    c.bench_function("streamer_tick_moving_viewer", |b| {
        let backend = InlineGenerator::new(config.generation_services()).with_jobs_per_poll(4);
        let mut streamer = match ChunkStreamer::new(&config.streamer, backend, HeadlessRenderer::new()) {
            Ok(streamer) => streamer,
            Err(e) => panic!("invalid streamer config: {}", e),
        };
        let mut frame = 0u32;
        b.iter(|| {
            frame += 1;
            let viewer = Vec2::new(frame as f32 * 2.0, (frame as f32 * 0.01).sin() * 200.0);
            streamer.update(black_box(viewer))
        });
    });
}

criterion_group!(
    benches,
    bench_noise_241,
    bench_noise_241_global,
    bench_mesh_lods,
    bench_streamer_tick,
);
criterion_main!(benches);
