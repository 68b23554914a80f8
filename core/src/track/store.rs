//! Ingestion of heterogeneous tabular flight data, classified by column
//! signature and assembled into per-aircraft waypoint sequences.

use crate::prelude::{ScenarioError, ScenarioResult};
use crate::telemetry::{LogManager, MetricsRecorder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One recorded sample of an aircraft trajectory.
#[derive(Debug, Clone)]
pub struct Waypoint {
    pub seq: i64,
    /// Elapsed time in seconds.
    pub t: f64,
    /// Flight level; 0 means on the ground.
    pub fl: i32,
    pub lat: f64,
    pub lon: f64,
    /// Ground speed in knots; 0 when the input row carries none.
    pub gs: f64,
    /// Heading in degrees; NaN when the input row carries none.
    pub hdg: f64,
}

/// Side table of flight metadata, keyed by the same aircraft identifier as
/// the waypoint sequences.
#[derive(Debug, Clone, Default)]
pub struct FlightMeta {
    pub ac_type: String,
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Clone, Default)]
pub struct TrackSet {
    pub flights: BTreeMap<String, FlightMeta>,
    pub points: BTreeMap<String, Vec<Waypoint>>,
}

impl TrackSet {
    pub fn waypoint_count(&self) -> usize {
        self.points.values().map(Vec::len).sum()
    }
}

/// Table kinds recognized by header signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    FlightMeta,
    FlightPoints,
    /// Recognized so boundary exports can sit in the same directory, but
    /// produces no behavior.
    AirspaceBoundary,
    Unknown,
}

const META_HEADERS: &[&str] = &["ECTRL ID", "AC Type", "ADEP", "ADES"];
const POINT_HEADERS: &[&str] = &[
    "ECTRL ID",
    "Sequence Number",
    "Time Over",
    "Flight Level",
    "Latitude",
    "Longitude",
    "Delay Time Over",
    "Dev Latitude",
    "Dev Longitude",
    "Dev Flight Level",
    "ground_speed",
    "vertical_speed",
    "heading",
    "pitch",
];
const BOUNDARY_HEADERS: &[&str] = &[
    "Airspace ID",
    "Min Flight Level",
    "Max Flight Level",
    "Sequence Number",
    "Latitude",
    "Longitude",
];

/// Classifies a header row by the set of column names it contains.
pub fn classify(headers: &[String]) -> TableKind {
    let has_all = |required: &[&str]| required.iter().all(|h| headers.iter().any(|c| c == h));
    if has_all(META_HEADERS) {
        TableKind::FlightMeta
    } else if has_all(POINT_HEADERS) {
        TableKind::FlightPoints
    } else if has_all(BOUNDARY_HEADERS) {
        TableKind::AirspaceBoundary
    } else {
        TableKind::Unknown
    }
}

pub struct TrackStore {
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl TrackStore {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("track"),
            metrics: MetricsRecorder::new(),
        }
    }

    /// CSV files directly under `dir`, sorted for deterministic load order.
    pub fn discover(dir: &Path) -> ScenarioResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(ScenarioError::MissingInput(format!(
                "data directory not found: {}",
                dir.display()
            )));
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Loads and classifies every file, requiring both flight metadata and
    /// flight waypoints to be present among them.
    pub fn load(&self, paths: &[PathBuf]) -> ScenarioResult<TrackSet> {
        if paths.is_empty() {
            return Err(ScenarioError::MissingInput("no CSV files found".into()));
        }

        let mut flights = BTreeMap::new();
        let mut points: BTreeMap<String, Vec<Waypoint>> = BTreeMap::new();
        let mut found_meta = false;
        let mut found_points = false;

        for path in paths {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .trim(csv::Trim::All)
                .from_path(path)?;
            let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
            match classify(&headers) {
                TableKind::FlightMeta => {
                    found_meta = true;
                    self.read_meta(&mut reader, &headers, &mut flights)?;
                }
                TableKind::FlightPoints => {
                    found_points = true;
                    self.read_points(&mut reader, &headers, &mut points)?;
                }
                TableKind::AirspaceBoundary | TableKind::Unknown => {}
            }
        }

        if !found_meta && !found_points {
            return Err(ScenarioError::MissingInput(
                "no usable input among the CSV files".into(),
            ));
        }
        if !(found_meta && found_points) {
            return Err(ScenarioError::MissingInput(
                "need both flight metadata and flight waypoint tables (matched by headers)".into(),
            ));
        }

        for track in points.values_mut() {
            track.sort_by_key(|w| w.seq);
        }

        let set = TrackSet { flights, points };
        self.logger.record(&format!(
            "loaded {} flights, {} waypoints",
            set.flights.len(),
            set.waypoint_count()
        ));
        Ok(set)
    }

    /// Recovered row defects seen across all loads.
    pub fn row_defects(&self) -> usize {
        self.metrics.snapshot().1
    }

    fn read_meta(
        &self,
        reader: &mut csv::Reader<std::fs::File>,
        headers: &[String],
        flights: &mut BTreeMap<String, FlightMeta>,
    ) -> ScenarioResult<()> {
        let col = |name: &str| headers.iter().position(|h| h == name);
        let (id_col, type_col, dep_col, des_col) = (
            col("ECTRL ID"),
            col("AC Type"),
            col("ADEP"),
            col("ADES"),
        );
        for record in reader.records() {
            let record = record?;
            let Some(acid) = field(&record, id_col).filter(|s| !s.is_empty()) else {
                self.metrics.record_row_defect();
                continue;
            };
            flights.insert(
                acid.to_string(),
                FlightMeta {
                    ac_type: field(&record, type_col).unwrap_or("").to_string(),
                    origin: field(&record, dep_col).unwrap_or("").to_string(),
                    destination: field(&record, des_col).unwrap_or("").to_string(),
                },
            );
        }
        Ok(())
    }

    fn read_points(
        &self,
        reader: &mut csv::Reader<std::fs::File>,
        headers: &[String],
        points: &mut BTreeMap<String, Vec<Waypoint>>,
    ) -> ScenarioResult<()> {
        let col = |name: &str| headers.iter().position(|h| h == name);
        let id_col = col("ECTRL ID");
        let seq_col = col("Sequence Number");
        let time_col = col("Time Over");
        let fl_col = col("Flight Level");
        let lat_col = col("Latitude");
        let lon_col = col("Longitude");
        let gs_col = col("ground_speed");
        let hdg_col = col("heading");

        for record in reader.records() {
            let record = record?;
            let Some(acid) = field(&record, id_col).filter(|s| !s.is_empty()) else {
                self.metrics.record_row_defect();
                continue;
            };
            let hdg = match field(&record, hdg_col) {
                None => f64::NAN,
                Some(raw) => self.parse_f64(raw, 0.0),
            };
            let gs = match field(&record, gs_col) {
                None => 0.0,
                Some(raw) => self.parse_f64(raw, 0.0),
            };
            let wp = Waypoint {
                seq: self.parse_int(field(&record, seq_col)),
                t: self.parse_time_s(field(&record, time_col)),
                fl: (self.parse_int(field(&record, fl_col)) as i32).max(0),
                lat: self.parse_opt_f64(field(&record, lat_col)),
                lon: self.parse_opt_f64(field(&record, lon_col)),
                gs,
                hdg,
            };
            points.entry(acid.to_string()).or_default().push(wp);
        }
        Ok(())
    }

    fn parse_f64(&self, raw: &str, default: f64) -> f64 {
        match raw.parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                self.metrics.record_row_defect();
                default
            }
        }
    }

    fn parse_opt_f64(&self, raw: Option<&str>) -> f64 {
        raw.map_or(0.0, |s| self.parse_f64(s, 0.0))
    }

    /// Integer fields coerce by truncating any decimal part.
    fn parse_int(&self, raw: Option<&str>) -> i64 {
        match raw {
            None => 0,
            Some(s) => match s.parse::<f64>() {
                Ok(v) => v as i64,
                Err(_) => {
                    self.metrics.record_row_defect();
                    0
                }
            },
        }
    }

    /// Accepts `H:MM:SS(.ss)` or raw seconds.
    fn parse_time_s(&self, raw: Option<&str>) -> f64 {
        let Some(s) = raw else { return 0.0 };
        if s.contains(':') {
            let mut parts = s.splitn(3, ':');
            let h = parts.next().map_or(0.0, |p| self.parse_f64(p, 0.0));
            let m = parts.next().map_or(0.0, |p| self.parse_f64(p, 0.0));
            let sec = parts.next().map_or(0.0, |p| self.parse_f64(p, 0.0));
            h * 3600.0 + m * 60.0 + sec
        } else {
            self.parse_f64(s, 0.0)
        }
    }
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new()
    }
}

fn field<'r>(record: &'r csv::StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| record.get(i))
}
