pub mod jitter;

pub use jitter::{apply, draw, rng_from_seed, select_covered, JitterConfig, NoiseKind};
