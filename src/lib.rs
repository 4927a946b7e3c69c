//! Landmass - seeded fractal terrain streamed around a moving viewer

pub mod core;
pub mod math;
pub mod terrain;
pub mod streaming;
pub mod render;
pub mod config;
