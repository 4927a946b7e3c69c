//! Layered coherent-noise height fields
//!
//! Sums `octaves` layers of Perlin noise into a `width x height` grid and
//! rescales the result into `[0, 1]`. Generation is pure: the same
//! parameters always produce a bit-identical grid.

use glam::Vec2;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Smallest usable noise scale. Non-positive scales are clamped to this.
pub const MIN_SCALE: f32 = 0.0001;

/// Per-octave offsets are drawn from `-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE`.
pub const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// Lattice period of the Perlin permutation table. Sample coordinates are
/// wrapped into `[0, PERLIN_PERIOD)`, which leaves the field unchanged.
pub const PERLIN_PERIOD: f64 = 256.0;

/// How raw accumulated heights are mapped into `[0, 1]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    /// Min-max rescale across the whole grid
    #[default]
    Local,
    /// Divide by the theoretical amplitude sum so separately generated
    /// grids share one height scale
    Global,
}

/// Inputs for one height-field generation
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseParameters {
    pub width: usize,
    pub height: usize,
    pub seed: u32,
    pub scale: f32,
    pub octaves: u32,
    /// Amplitude multiplier applied after each octave
    pub persistence: f32,
    /// Added to the frequency after each octave
    pub lacunarity: f32,
    /// Added to every octave offset, in noise space
    pub offset: Vec2,
    pub normalize_mode: NormalizeMode,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            width: 241,
            height: 241,
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

impl NoiseParameters {
    /// Scale actually used for sampling
    pub fn effective_scale(&self) -> f32 {
        if self.scale > 0.0 { self.scale } else { MIN_SCALE }
    }

    /// Replace non-finite persistence, lacunarity and offset components with
    /// their defaults. Generation never fails on abnormal numbers.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.persistence.is_finite() {
            log::warn!("Non-finite persistence {}, using {}", self.persistence, defaults.persistence);
            self.persistence = defaults.persistence;
        }
        if !self.lacunarity.is_finite() {
            log::warn!("Non-finite lacunarity {}, using {}", self.lacunarity, defaults.lacunarity);
            self.lacunarity = defaults.lacunarity;
        }
        if !self.offset.is_finite() {
            log::warn!("Non-finite noise offset {}, zeroing bad components", self.offset);
            self.offset = Vec2::select(self.offset.is_finite_mask(), self.offset, Vec2::ZERO);
        }
        self
    }
}

/// Row-major grid of height samples
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseGrid {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl NoiseGrid {
    /// Grid filled with `value`
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self { width, height, values: vec![value; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample at column `x`, row `y`
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// One row of samples
    pub fn row(&self, y: usize) -> &[f32] {
        &self.values[y * self.width..(y + 1) * self.width]
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Accumulated heights before normalization, with their global extremes
#[derive(Clone, Debug)]
pub struct RawNoiseField {
    pub grid: NoiseGrid,
    pub min: f32,
    pub max: f32,
}

/// Fractal Perlin height-field generator
pub struct NoiseField {
    params: NoiseParameters,
    perlin: Perlin,
    octave_offsets: Vec<[f64; 2]>,
}

impl NoiseField {
    /// Prepare a generator. Octave offsets are drawn here, before any sampling.
    pub fn new(params: NoiseParameters) -> Self {
        let params = params.sanitized();
        let octave_offsets = octave_offsets(params.seed, params.octaves, params.offset);
        let perlin = Perlin::new(params.seed);
        Self { params, perlin, octave_offsets }
    }

    pub fn params(&self) -> &NoiseParameters {
        &self.params
    }

    pub fn octave_offsets(&self) -> &[[f64; 2]] {
        &self.octave_offsets
    }

    /// Accumulate all octaves without normalizing
    pub fn sample_raw(&self) -> RawNoiseField {
        let width = self.params.width;
        let height = self.params.height;
        if width == 0 || height == 0 {
            return RawNoiseField { grid: NoiseGrid::filled(width, height, 0.0), min: 0.0, max: 0.0 };
        }

        let scale = self.params.effective_scale() as f64;
        let half_width = width as f64 / 2.0;
        let half_height = height as f64 / 2.0;

        let mut values = vec![0.0f32; width * height];
        let (min, max) = values
            .par_chunks_mut(width)
            .enumerate()
            .map(|(y, row)| {
                let mut row_min = f32::MAX;
                let mut row_max = f32::MIN;
                let cy = y as f64 - half_height;
                for (x, cell) in row.iter_mut().enumerate() {
                    let cx = x as f64 - half_width;
                    let h = self.fractal_height(cx / scale, cy / scale);
                    *cell = h;
                    row_min = row_min.min(h);
                    row_max = row_max.max(h);
                }
                (row_min, row_max)
            })
            .reduce(
                || (f32::MAX, f32::MIN),
                |a, b| (a.0.min(b.0), a.1.max(b.1)),
            );

        RawNoiseField { grid: NoiseGrid { width, height, values }, min, max }
    }

    /// Generate the normalized grid
    pub fn generate(&self) -> NoiseGrid {
        let raw = self.sample_raw();
        match self.params.normalize_mode {
            NormalizeMode::Local => normalize_local(raw),
            NormalizeMode::Global => normalize_global(raw, self.max_possible_height()),
        }
    }

    /// Sum of octave amplitudes, the largest magnitude a cell can reach
    pub fn max_possible_height(&self) -> f32 {
        let mut amplitude = 1.0f32;
        let mut total = 0.0f32;
        for _ in 0..self.params.octaves {
            total += amplitude.abs();
            amplitude *= self.params.persistence;
        }
        total
    }

    /// Sum octaves at a grid-centered, scale-divided coordinate.
    /// Frequency grows by adding lacunarity, not multiplying.
    /// Overflowing sums collapse to 0.
    fn fractal_height(&self, nx: f64, ny: f64) -> f32 {
        let persistence = self.params.persistence as f64;
        let lacunarity = self.params.lacunarity as f64;
        let mut amplitude = 1.0f64;
        let mut frequency = 1.0f64;
        let mut height = 0.0f64;

        for offset in &self.octave_offsets {
            let sample_x = wrap_coordinate(nx * frequency + offset[0]);
            let sample_y = wrap_coordinate(ny * frequency + offset[1]);
            height += self.perlin.get([sample_x, sample_y]) * amplitude;
            amplitude *= persistence;
            frequency += lacunarity;
        }

        let height = height as f32;
        if height.is_finite() { height } else { 0.0 }
    }
}

/// Fold a sample coordinate into one Perlin period. Non-finite input maps to 0.
fn wrap_coordinate(v: f64) -> f64 {
    if v.is_finite() { v.rem_euclid(PERLIN_PERIOD) } else { 0.0 }
}

/// Generate a normalized grid in one call
pub fn generate(params: &NoiseParameters) -> NoiseGrid {
    NoiseField::new(params.clone()).generate()
}

/// Deterministic per-octave offsets for `seed`, shifted by `offset`
pub fn octave_offsets(seed: u32, octaves: u32, offset: Vec2) -> Vec<[f64; 2]> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    (0..octaves)
        .map(|_| {
            let x = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f64 + offset.x as f64;
            let y = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f64 + offset.y as f64;
            [x, y]
        })
        .collect()
}

/// Position of `value` between `a` and `b`, clamped to `[0, 1]`.
/// Returns 0 when `a == b`.
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    let t = (value as f64 - a as f64) / (b as f64 - a as f64);
    if t.is_finite() { (t as f32).clamp(0.0, 1.0) } else { 0.0 }
}

fn normalize_local(raw: RawNoiseField) -> NoiseGrid {
    let RawNoiseField { mut grid, min, max } = raw;
    grid.values
        .par_iter_mut()
        .for_each(|v| *v = inverse_lerp(min, max, *v));
    grid
}

fn normalize_global(raw: RawNoiseField, max_possible: f32) -> NoiseGrid {
    let mut grid = raw.grid;
    if max_possible <= 0.0 {
        grid.values.iter_mut().for_each(|v| *v = 0.0);
        return grid;
    }
    grid.values
        .par_iter_mut()
        .for_each(|v| *v = ((*v / max_possible + 1.0) * 0.5).clamp(0.0, 1.0));
    grid
}
