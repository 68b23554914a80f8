//! Two-aircraft encounter synthesis: sampled kinematics back-projected from
//! a desired closest point of approach.

use crate::geo;
use crate::noise;
use crate::prelude::ScenarioError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Geometric relationship between the two converging aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    HeadOn,
    Crossing,
    Overtaking,
}

impl FromStr for Topology {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headon" | "head-on" => Ok(Self::HeadOn),
            "cross" | "crossing" => Ok(Self::Crossing),
            "overtake" | "overtaking" => Ok(Self::Overtaking),
            other => Err(ScenarioError::InvalidConfig(format!(
                "unknown topology: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::HeadOn => "headon",
            Self::Crossing => "cross",
            Self::Overtaking => "overtake",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AltitudeMode {
    /// Both aircraft hold one flight level throughout.
    Level,
    /// The two aircraft cross through the CPA level from opposite sides.
    AltCross,
}

impl FromStr for AltitudeMode {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "level" => Ok(Self::Level),
            "altcross" | "altitude-crossing" => Ok(Self::AltCross),
            other => Err(ScenarioError::InvalidConfig(format!(
                "unknown altitude mode: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for AltitudeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Level => "level",
            Self::AltCross => "altcross",
        })
    }
}

/// Closed sampling interval. A degenerate interval always yields its exact
/// value, never a random draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRange {
    pub lo: f64,
    pub hi: f64,
}

impl SampleRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        if lo <= hi {
            Self { lo, hi }
        } else {
            Self { lo: hi, hi: lo }
        }
    }

    pub fn exact(value: f64) -> Self {
        Self {
            lo: value,
            hi: value,
        }
    }

    /// Parses `lo:hi` or a single value (degenerate interval).
    pub fn parse(text: &str) -> Result<Self, ScenarioError> {
        let s = text.trim();
        let parse_num = |p: &str| {
            p.trim().parse::<f64>().map_err(|_| {
                ScenarioError::InvalidConfig(format!("malformed range: {text}"))
            })
        };
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(parse_num(a)?, parse_num(b)?)),
            None => Ok(Self::exact(parse_num(s)?)),
        }
    }

    pub fn sample(&self, rng: &mut rand::rngs::StdRng) -> f64 {
        use rand::Rng;
        if self.lo == self.hi {
            self.lo
        } else {
            // Bounds may arrive unnormalized from hand-edited config files.
            rng.gen_range(self.lo.min(self.hi)..=self.lo.max(self.hi))
        }
    }
}

/// Sampling intervals for the initial kinematics of both aircraft. Any
/// never-set range keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterRanges {
    pub cas1: SampleRange,
    pub cas2: SampleRange,
    pub fl1: SampleRange,
    pub fl2: SampleRange,
    pub brg1: SampleRange,
    pub angle: SampleRange,
}

impl Default for EncounterRanges {
    fn default() -> Self {
        Self {
            cas1: SampleRange::new(220.0, 280.0),
            cas2: SampleRange::new(220.0, 280.0),
            fl1: SampleRange::new(290.0, 370.0),
            fl2: SampleRange::new(290.0, 370.0),
            brg1: SampleRange::new(0.0, 359.0),
            angle: SampleRange::exact(90.0),
        }
    }
}

/// Requested encounter, before sampling.
#[derive(Debug, Clone)]
pub struct EncounterSpec {
    pub topology: Topology,
    pub alt_mode: AltitudeMode,
    pub cpa_lat: f64,
    pub cpa_lon: f64,
    /// Seconds from spawn (t = 0) to closest approach.
    pub tcpa_s: f64,
    /// Flight level at CPA; defaults to the midpoint of the sampled levels.
    pub fl_cpa: Option<i32>,
    /// Crossing-angle override, used only for the crossing topology.
    pub angle_deg: Option<f64>,
    pub acid1: String,
    pub acid2: String,
    pub type1: String,
    pub type2: String,
    pub seed: Option<u64>,
}

/// Fully specified start state of one aircraft, routed to the shared CPA.
#[derive(Debug, Clone)]
pub struct AircraftStart {
    pub acid: String,
    pub ac_type: String,
    pub lat: f64,
    pub lon: f64,
    pub heading_deg: i32,
    pub fl_start: i32,
    pub fl_cpa: i32,
    pub cas_kt: f64,
}

/// Resolved encounter; transient, never persisted beyond the rendered lines.
#[derive(Debug, Clone)]
pub struct Encounter {
    pub topology: Topology,
    pub alt_mode: AltitudeMode,
    pub cpa_lat: f64,
    pub cpa_lon: f64,
    pub tcpa_s: f64,
    /// Crossing angle actually used (sampled or overridden).
    pub angle_deg: f64,
    pub first: AircraftStart,
    pub second: AircraftStart,
}

/// Derives both aircraft's spawn states by back-projection from the CPA.
pub fn synthesize(spec: &EncounterSpec, ranges: &EncounterRanges) -> Encounter {
    let mut rng = noise::rng_from_seed(spec.seed);

    let mut cas1 = ranges.cas1.sample(&mut rng);
    let mut cas2 = ranges.cas2.sample(&mut rng);
    let mut fl1 = ranges.fl1.sample(&mut rng).round() as i32;
    let mut fl2 = ranges.fl2.sample(&mut rng).round() as i32;
    let brg1 = ranges.brg1.sample(&mut rng).rem_euclid(360.0);
    let mut angle = ranges.angle.sample(&mut rng);

    if spec.topology == Topology::Crossing {
        if let Some(a) = spec.angle_deg {
            angle = a;
        }
    }

    // Overtaker must be strictly faster, even when sampling ties or inverts.
    if spec.topology == Topology::Overtaking && cas2 <= cas1 {
        let (slow, fast) = if cas1 <= cas2 {
            (cas1, cas2)
        } else {
            (cas2, cas1)
        };
        cas1 = slow;
        cas2 = fast + (0.05 * fast).max(5.0);
    }

    let brg2 = match spec.topology {
        Topology::HeadOn => (brg1 + 180.0).rem_euclid(360.0),
        Topology::Crossing => (brg1 + angle).rem_euclid(360.0),
        Topology::Overtaking => brg1,
    };

    // CAS stands in for ground speed; wind is out of the model.
    let d1_nm = cas1 / 3600.0 * spec.tcpa_s;
    let d2_nm = cas2 / 3600.0 * spec.tcpa_s;
    let (lat1, lon1) = geo::destination(spec.cpa_lat, spec.cpa_lon, brg1 + 180.0, d1_nm);
    let (lat2, lon2) = geo::destination(spec.cpa_lat, spec.cpa_lon, brg2 + 180.0, d2_nm);

    let fl_cpa = spec
        .fl_cpa
        .unwrap_or_else(|| ((f64::from(fl1) + f64::from(fl2)) / 2.0).round() as i32);
    let (fl1_start, fl2_start) = match spec.alt_mode {
        AltitudeMode::Level => (fl_cpa, fl_cpa),
        AltitudeMode::AltCross => {
            if fl1 == fl_cpa {
                fl1 += 10;
            }
            if fl2 == fl_cpa {
                fl2 -= 10;
            }
            if !((fl1 > fl_cpa && fl2 < fl_cpa) || (fl2 > fl_cpa && fl1 < fl_cpa)) {
                if fl1 <= fl_cpa {
                    fl1 = fl_cpa + 10;
                }
                if fl2 >= fl_cpa {
                    fl2 = fl_cpa - 10;
                }
            }
            (fl1, fl2)
        }
    };

    Encounter {
        topology: spec.topology,
        alt_mode: spec.alt_mode,
        cpa_lat: spec.cpa_lat,
        cpa_lon: spec.cpa_lon,
        tcpa_s: spec.tcpa_s,
        angle_deg: angle,
        first: AircraftStart {
            acid: spec.acid1.clone(),
            ac_type: spec.type1.clone(),
            lat: lat1,
            lon: lon1,
            heading_deg: (brg1.round() as i32).rem_euclid(360),
            fl_start: fl1_start,
            fl_cpa,
            cas_kt: cas1,
        },
        second: AircraftStart {
            acid: spec.acid2.clone(),
            ac_type: spec.type2.clone(),
            lat: lat2,
            lon: lon2,
            heading_deg: (brg2.round() as i32).rem_euclid(360),
            fl_start: fl2_start,
            fl_cpa,
            cas_kt: cas2,
        },
    }
}
