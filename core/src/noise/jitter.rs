//! Bounded stochastic perturbation of replayed tracks, with deterministic
//! seeding and per-aircraft coverage selection.

use crate::prelude::ScenarioError;
use crate::track::Waypoint;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    Uniform,
    Normal,
}

impl FromStr for NoiseKind {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(Self::Uniform),
            "normal" => Ok(Self::Normal),
            other => Err(ScenarioError::InvalidConfig(format!(
                "unknown distribution: {other}"
            ))),
        }
    }
}

/// Jitter parameters; persists across scenario generations in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    pub enabled: bool,
    pub kind: NoiseKind,
    /// None means a fresh entropy seed per run, not reproducible.
    pub seed: Option<u64>,
    /// Perturbation half-widths; zero disables the field.
    pub dt_s: f64,
    pub dlat_deg: f64,
    pub dlon_deg: f64,
    pub dfl: i32,
    /// Clamp for the normal case at ±(sigma_clamp × magnitude); 0 disables.
    pub sigma_clamp: f64,
    /// Percentage of aircraft perturbed (0–100).
    pub coverage_pct: f64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: NoiseKind::Normal,
            seed: None,
            dt_s: 0.0,
            dlat_deg: 0.0,
            dlon_deg: 0.0,
            dfl: 0,
            sigma_clamp: 0.0,
            coverage_pct: 100.0,
        }
    }
}

pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// One bounded draw. Non-positive magnitude always yields exactly zero.
pub fn draw(rng: &mut StdRng, magnitude: f64, kind: NoiseKind, sigma_clamp: f64) -> f64 {
    if magnitude <= 0.0 {
        return 0.0;
    }
    match kind {
        NoiseKind::Uniform => rng.gen_range(-magnitude..=magnitude),
        NoiseKind::Normal => {
            let Ok(dist) = Normal::new(0.0, magnitude) else {
                return 0.0;
            };
            let x = dist.sample(rng);
            let limit = sigma_clamp * magnitude;
            if limit > 0.0 {
                x.clamp(-limit, limit)
            } else {
                x
            }
        }
    }
}

/// Deterministic subset of aircraft to perturb: exactly
/// `round(pct/100 × N)` identifiers sampled without replacement.
pub fn select_covered(ids: &[String], coverage_pct: f64, seed: Option<u64>) -> BTreeSet<String> {
    let pct = coverage_pct.clamp(0.0, 100.0);
    if pct <= 0.0 {
        return BTreeSet::new();
    }
    if pct >= 100.0 {
        return ids.iter().cloned().collect();
    }
    let k = (pct / 100.0 * ids.len() as f64).round() as usize;
    if k == 0 {
        return BTreeSet::new();
    }
    let mut rng = rng_from_seed(seed);
    ids.choose_multiple(&mut rng, k).cloned().collect()
}

/// Perturbs the selected aircraft in place, in sequence order per aircraft.
///
/// Elapsed time is clamped non-negative and non-decreasing relative to the
/// previous already-perturbed waypoint; flight levels round to the nearest
/// integer and clamp non-negative.
pub fn apply(
    points: &mut BTreeMap<String, Vec<Waypoint>>,
    config: &JitterConfig,
    selected: &BTreeSet<String>,
) {
    if !config.enabled {
        return;
    }
    let mut rng = rng_from_seed(config.seed);
    for (acid, track) in points.iter_mut() {
        if !selected.contains(acid) {
            continue;
        }
        let mut last_t: Option<f64> = None;
        for wp in track.iter_mut() {
            wp.t = (wp.t + draw(&mut rng, config.dt_s, config.kind, config.sigma_clamp)).max(0.0);
            if let Some(prev) = last_t {
                wp.t = wp.t.max(prev);
            }
            wp.lat += draw(&mut rng, config.dlat_deg, config.kind, config.sigma_clamp);
            wp.lon += draw(&mut rng, config.dlon_deg, config.kind, config.sigma_clamp);
            let dfl = draw(&mut rng, f64::from(config.dfl), config.kind, config.sigma_clamp);
            wp.fl = ((f64::from(wp.fl) + dfl).round() as i32).max(0);
            last_t = Some(wp.t);
        }
    }
}
