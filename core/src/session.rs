//! Explicit session context threading configuration from the front-end
//! surface to the generation calls. Created at startup, mutated by
//! configuration calls, read by generation calls, never implicitly reset.

use crate::encounter::{Encounter, EncounterRanges};
use crate::noise::{self, JitterConfig};
use crate::prelude::{ScenarioError, ScenarioResult, WriteSummary};
use crate::scenario::{Assembler, ScenarioSource};
use crate::track::{TrackSet, TrackStore, Waypoint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Separation thresholds echoed for operator awareness; never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictMinima {
    pub hsep_nm: f64,
    pub vsep_ft: i32,
}

impl Default for ConflictMinima {
    fn default() -> Self {
        Self {
            hsep_nm: 5.0,
            vsep_ft: 1000,
        }
    }
}

pub struct Session {
    base_dir: PathBuf,
    data_dir: PathBuf,
    scn_dir: PathBuf,
    store: TrackStore,
    assembler: Assembler,
    tracks: Option<TrackSet>,
    jitter: JitterConfig,
    /// Cached coverage subset; invalidated when tracks or jitter change.
    jitter_subset: Option<BTreeSet<String>>,
    autodel: bool,
    minima: ConflictMinima,
    ranges: EncounterRanges,
    /// Aircraft created by encounter generation in this session.
    spawned: Vec<String>,
}

impl Session {
    /// Roots the session at `base`, creating `data/` and `scenarios/`
    /// subdirectories idempotently.
    pub fn new(base: impl Into<PathBuf>) -> ScenarioResult<Self> {
        let base_dir: PathBuf = base.into();
        let data_dir = base_dir.join("data");
        let scn_dir = base_dir.join("scenarios");
        fs::create_dir_all(&data_dir)?;
        fs::create_dir_all(&scn_dir)?;
        Ok(Self {
            base_dir,
            data_dir,
            scn_dir,
            store: TrackStore::new(),
            assembler: Assembler::new(),
            tracks: None,
            jitter: JitterConfig::default(),
            jitter_subset: None,
            autodel: true,
            minima: ConflictMinima::default(),
            ranges: EncounterRanges::default(),
            spawned: Vec::new(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn scenario_dir(&self) -> &Path {
        &self.scn_dir
    }

    /// Path of a named scenario file under the scenarios directory.
    pub fn scenario_path(&self, name: &str) -> PathBuf {
        self.scn_dir.join(format!("{name}.scn"))
    }

    /// Loads track CSVs. No paths means auto-discovery under the data dir;
    /// a single directory path is expanded to the CSV files inside it.
    /// Returns (flights, waypoints) counts.
    pub fn load_tracks(&mut self, paths: &[PathBuf]) -> ScenarioResult<(usize, usize)> {
        let resolved = match paths {
            [] => TrackStore::discover(&self.data_dir)?,
            [single] if single.is_dir() => TrackStore::discover(single)?,
            explicit => explicit.to_vec(),
        };
        let set = self.store.load(&resolved)?;
        let counts = (set.flights.len(), set.waypoint_count());
        self.tracks = Some(set);
        self.jitter_subset = None;
        Ok(counts)
    }

    pub fn tracks(&self) -> Option<&TrackSet> {
        self.tracks.as_ref()
    }

    pub fn set_jitter(&mut self, jitter: JitterConfig) {
        self.jitter = jitter;
        self.jitter_subset = None;
    }

    pub fn jitter(&self) -> &JitterConfig {
        &self.jitter
    }

    pub fn set_autodel(&mut self, on: bool) {
        self.autodel = on;
    }

    pub fn autodel(&self) -> bool {
        self.autodel
    }

    pub fn set_minima(&mut self, minima: ConflictMinima) {
        self.minima = minima;
    }

    pub fn minima(&self) -> ConflictMinima {
        self.minima
    }

    pub fn set_ranges(&mut self, ranges: EncounterRanges) {
        self.ranges = ranges;
    }

    pub fn ranges(&self) -> &EncounterRanges {
        &self.ranges
    }

    pub fn spawned(&self) -> &[String] {
        &self.spawned
    }

    /// `DEL` host commands for every aircraft spawned by encounter
    /// generation in this session, clearing the record.
    pub fn drain_spawned_dels(&mut self) -> Vec<String> {
        self.spawned
            .drain(..)
            .map(|acid| format!("DEL {acid}"))
            .collect()
    }

    /// Per-run waypoint snapshot with jitter applied to the covered subset.
    pub fn points_for_run(&mut self) -> ScenarioResult<BTreeMap<String, Vec<Waypoint>>> {
        let Some(tracks) = &self.tracks else {
            return Err(ScenarioError::MissingInput("no track data loaded".into()));
        };
        let mut points = tracks.points.clone();
        if !self.jitter.enabled {
            return Ok(points);
        }
        if self.jitter_subset.is_none() {
            let ids: Vec<String> = points.keys().cloned().collect();
            self.jitter_subset = Some(noise::select_covered(
                &ids,
                self.jitter.coverage_pct,
                self.jitter.seed,
            ));
        }
        if let Some(subset) = &self.jitter_subset {
            noise::apply(&mut points, &self.jitter, subset);
        }
        Ok(points)
    }

    /// Writes or appends the replay scenario `name` from the loaded tracks.
    pub fn write_replay(&mut self, name: &str, overwrite: bool) -> ScenarioResult<WriteSummary> {
        let points = self.points_for_run()?;
        let Some(tracks) = &self.tracks else {
            return Err(ScenarioError::MissingInput("no track data loaded".into()));
        };
        let source = ScenarioSource::Replay {
            flights: &tracks.flights,
            points: &points,
            autodel: self.autodel,
        };
        self.assembler
            .write(&self.scenario_path(name), &source, overwrite)
    }

    /// Writes or appends one synthesized encounter, recording its rendered
    /// aircraft for session cleanup.
    pub fn write_encounter(
        &mut self,
        name: &str,
        encounter: &Encounter,
        overwrite: bool,
    ) -> ScenarioResult<WriteSummary> {
        let source = ScenarioSource::Encounter(encounter);
        let summary = self
            .assembler
            .write(&self.scenario_path(name), &source, overwrite)?;
        self.spawned.extend(summary.aircraft.iter().cloned());
        Ok(summary)
    }
}
