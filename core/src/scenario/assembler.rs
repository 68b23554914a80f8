//! Renders replay batches and synthesized encounters into command lines and
//! merges them into the scenario file.

use crate::atmosphere;
use crate::encounter::Encounter;
use crate::prelude::{ScenarioResult, WriteSummary};
use crate::scenario::names::{next_unique_id, sanitize_fix_name};
use crate::scenario::script;
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::track::{FlightMeta, Waypoint};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Identifier family used by the default encounter placeholders.
pub const ENCOUNTER_ID_FAMILY: &str = "SC";

/// What one write renders: a replay batch or a single synthesized encounter.
pub enum ScenarioSource<'a> {
    Replay {
        flights: &'a BTreeMap<String, FlightMeta>,
        points: &'a BTreeMap<String, Vec<Waypoint>>,
        autodel: bool,
    },
    Encounter(&'a Encounter),
}

pub struct Assembler {
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("scenario"),
            metrics: MetricsRecorder::new(),
        }
    }

    /// Writes or appends `source` to `path`.
    ///
    /// The call is a read-modify-write transaction: existing identifiers are
    /// scanned, the new lines written, and the whole file re-sorted into
    /// canonical time order. The one-time header is emitted only when the
    /// file is created or overwritten. Not safe against concurrent writers;
    /// the host is assumed to serialize calls.
    pub fn write(
        &self,
        path: &Path,
        source: &ScenarioSource<'_>,
        overwrite: bool,
    ) -> ScenarioResult<WriteSummary> {
        let append = !overwrite && path.is_file();
        let mut used = if append {
            script::scan_existing_ids(path)
        } else {
            BTreeSet::new()
        };

        let (lines, aircraft) = match source {
            ScenarioSource::Replay {
                flights,
                points,
                autodel,
            } => render_replay(flights, points, *autodel, &mut used),
            ScenarioSource::Encounter(enc) => {
                let (acid1, acid2) = resolve_encounter_ids(enc, append, path, &mut used);
                let lines = render_encounter(enc, &acid1, &acid2);
                (lines, vec![acid1, acid2])
            }
        };

        let mut file = if append {
            OpenOptions::new().append(true).open(path)?
        } else {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?
        };
        if !append {
            writeln!(file, "{}HOLD", script::format_stamp(0.0))?;
            writeln!(file, "{}ASAS ON", script::format_stamp(0.0))?;
        }
        for line in &lines {
            writeln!(file, "{line}")?;
        }
        drop(file);
        script::sort_scenario_file(path)?;

        self.metrics.record_write();
        self.logger.record(&format!(
            "{} {} lines for {} aircraft to {}",
            if append { "appended" } else { "wrote" },
            lines.len(),
            aircraft.len(),
            path.display()
        ));
        Ok(WriteSummary {
            path: path.to_path_buf(),
            appended: append,
            aircraft,
            lines: lines.len(),
        })
    }

    pub fn writes(&self) -> usize {
        self.metrics.snapshot().0
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Default `SC1`/`SC2` placeholders continue the highest existing family
/// index on append; anything else goes through plain collision renaming.
fn resolve_encounter_ids(
    enc: &Encounter,
    append: bool,
    path: &Path,
    used: &mut BTreeSet<String>,
) -> (String, String) {
    let default_pair = enc.first.acid == format!("{ENCOUNTER_ID_FAMILY}1")
        && enc.second.acid == format!("{ENCOUNTER_ID_FAMILY}2");
    if append && default_pair {
        let top = script::scan_max_family_index(path, ENCOUNTER_ID_FAMILY);
        let first = format!("{}{}", ENCOUNTER_ID_FAMILY, top + 1);
        let second = format!("{}{}", ENCOUNTER_ID_FAMILY, top + 2);
        used.insert(first.clone());
        used.insert(second.clone());
        (first, second)
    } else {
        let first = next_unique_id(&enc.first.acid, used);
        used.insert(first.clone());
        let second = next_unique_id(&enc.second.acid, used);
        used.insert(second.clone());
        (first, second)
    }
}

fn alt_token(fl: i32) -> String {
    if fl <= 0 {
        "0".to_string()
    } else {
        format!("FL{fl}")
    }
}

/// Renders one aircraft per metadata entry that also has waypoints; either
/// side missing drops the aircraft silently.
fn render_replay(
    flights: &BTreeMap<String, FlightMeta>,
    points: &BTreeMap<String, Vec<Waypoint>>,
    autodel: bool,
    used: &mut BTreeSet<String>,
) -> (Vec<String>, Vec<String>) {
    let mut lines = Vec::new();
    let mut rendered = Vec::new();

    for (acid, meta) in flights {
        let Some(track) = points.get(acid) else {
            continue;
        };
        let (Some(first), Some(last)) = (track.first(), track.last()) else {
            continue;
        };
        let out_id = next_unique_id(acid, used);
        used.insert(out_id.clone());

        let stamp = script::format_stamp(first.t);
        let cas0 = atmosphere::gs_to_cas_kt(first.gs, f64::from(first.fl));
        let hdg0 = if first.hdg.is_nan() { 0 } else { first.hdg as i64 };
        lines.push(format!(
            "{stamp}CRE {out_id},{},{:.6},{:.6},{hdg0:03},{},{cas0:.1}",
            meta.ac_type,
            first.lat,
            first.lon,
            i64::from(first.fl) * 100,
        ));

        let landing = last.fl == 0;
        let trigger_on_last = landing || autodel;

        let mut dest_fix: Option<String> = None;
        let mut approach_fix: Option<String> = None;
        if trigger_on_last {
            let name = sanitize_fix_name(&format!("{out_id}_DEST"));
            lines.push(format!(
                "{stamp}DEFWPT {name},{:.6},{:.6},FIX",
                last.lat, last.lon
            ));
            dest_fix = Some(name);
        }
        if landing && track.len() >= 2 {
            let pen = &track[track.len() - 2];
            let name = sanitize_fix_name(&format!("{out_id}_APP"));
            lines.push(format!(
                "{stamp}DEFWPT {name},{:.6},{:.6},FIX",
                pen.lat, pen.lon
            ));
            approach_fix = Some(name);
        }

        for (idx, wp) in track.iter().enumerate().skip(1) {
            let cas = atmosphere::gs_to_cas_kt(wp.gs, f64::from(wp.fl));
            let is_last = idx + 1 == track.len();
            let is_penultimate = idx + 2 == track.len();
            if is_last && trigger_on_last {
                if let Some(fix) = &dest_fix {
                    lines.push(format!(
                        "{stamp}ADDWPT {out_id} {fix},{},{cas:.1}",
                        alt_token(wp.fl)
                    ));
                    continue;
                }
            }
            if is_penultimate && landing {
                if let Some(fix) = &approach_fix {
                    lines.push(format!(
                        "{stamp}ADDWPT {out_id} {fix},{},{cas:.1}",
                        alt_token(wp.fl)
                    ));
                    continue;
                }
            }
            lines.push(format!(
                "{stamp}ADDWPT {out_id} {:.6},{:.6},{},{cas:.1}",
                wp.lat,
                wp.lon,
                alt_token(wp.fl)
            ));
        }

        lines.push(format!("{stamp}LNAV {out_id} ON"));
        lines.push(format!("{stamp}VNAV {out_id} ON"));
        if landing {
            if let Some(fix) = &approach_fix {
                lines.push(format!("{stamp}{out_id} AT {fix} DO {out_id} ALT 0"));
            }
        }
        if trigger_on_last {
            if let Some(fix) = &dest_fix {
                lines.push(format!("{stamp}{out_id} AT {fix} DO DEL {out_id}"));
            }
        }
        rendered.push(out_id);
    }
    (lines, rendered)
}

/// Both aircraft spawn at time zero and route to the shared CPA point.
fn render_encounter(enc: &Encounter, acid1: &str, acid2: &str) -> Vec<String> {
    let stamp = script::format_stamp(0.0);
    let mut lines = Vec::new();
    for (acid, ac) in [(acid1, &enc.first), (acid2, &enc.second)] {
        lines.push(format!(
            "{stamp}CRE {acid},{},{:.6},{:.6},{:03},{},{:.1}",
            ac.ac_type,
            ac.lat,
            ac.lon,
            ac.heading_deg,
            i64::from(ac.fl_start) * 100,
            ac.cas_kt,
        ));
        lines.push(format!(
            "{stamp}ADDWPT {acid} {:.6},{:.6},{},{:.1}",
            enc.cpa_lat,
            enc.cpa_lon,
            alt_token(ac.fl_cpa),
            ac.cas_kt,
        ));
        lines.push(format!("{stamp}LNAV {acid} ON"));
        lines.push(format!("{stamp}VNAV {acid} ON"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::{synthesize, AltitudeMode, EncounterRanges, EncounterSpec, SampleRange, Topology};
    use tempfile::TempDir;

    fn meta(acid: &str, ac_type: &str) -> (String, FlightMeta) {
        (
            acid.to_string(),
            FlightMeta {
                ac_type: ac_type.to_string(),
                origin: "EHAM".to_string(),
                destination: "LFPG".to_string(),
            },
        )
    }

    fn waypoint(seq: i64, t: f64, fl: i32) -> Waypoint {
        Waypoint {
            seq,
            t,
            fl,
            lat: 52.0 + seq as f64 * 0.1,
            lon: 4.0 + seq as f64 * 0.1,
            gs: 440.0,
            hdg: 90.0,
        }
    }

    fn replay_fixture(acid: &str, levels: &[i32]) -> (BTreeMap<String, FlightMeta>, BTreeMap<String, Vec<Waypoint>>) {
        let mut flights = BTreeMap::new();
        let (k, v) = meta(acid, "A320");
        flights.insert(k, v);
        let mut points = BTreeMap::new();
        points.insert(
            acid.to_string(),
            levels
                .iter()
                .enumerate()
                .map(|(i, &fl)| waypoint(i as i64 + 1, i as f64 * 60.0, fl))
                .collect(),
        );
        (flights, points)
    }

    fn encounter(seed: u64) -> Encounter {
        let mut ranges = EncounterRanges::default();
        ranges.cas1 = SampleRange::exact(250.0);
        ranges.cas2 = SampleRange::exact(250.0);
        ranges.brg1 = SampleRange::exact(90.0);
        let spec = EncounterSpec {
            topology: Topology::HeadOn,
            alt_mode: AltitudeMode::Level,
            cpa_lat: 52.0,
            cpa_lon: 4.0,
            tcpa_s: 120.0,
            fl_cpa: Some(330),
            angle_deg: None,
            acid1: "SC1".into(),
            acid2: "SC2".into(),
            type1: "A320".into(),
            type2: "B738".into(),
            seed: Some(seed),
        };
        synthesize(&spec, &ranges)
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn header_is_written_exactly_once_across_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let assembler = Assembler::new();

        for _ in 0..3 {
            let enc = encounter(1);
            assembler
                .write(&path, &ScenarioSource::Encounter(&enc), false)
                .unwrap();
        }

        let lines = read_lines(&path);
        let holds = lines.iter().filter(|l| l.ends_with(">HOLD")).count();
        let asas = lines.iter().filter(|l| l.ends_with(">ASAS ON")).count();
        assert_eq!(holds, 1);
        assert_eq!(asas, 1);
        assert!(lines[0].ends_with(">HOLD"));
        assert!(lines[1].ends_with(">ASAS ON"));
        assert_eq!(assembler.writes(), 3);
    }

    #[test]
    fn custom_encounter_ids_resolve_collisions_within_one_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let assembler = Assembler::new();

        let (flights, points) = replay_fixture("AB3", &[330, 330]);
        let source = ScenarioSource::Replay {
            flights: &flights,
            points: &points,
            autodel: false,
        };
        assembler.write(&path, &source, false).unwrap();

        let mut enc = encounter(1);
        enc.first.acid = "AB3".into();
        enc.second.acid = "AB3".into();
        let summary = assembler
            .write(&path, &ScenarioSource::Encounter(&enc), false)
            .unwrap();
        assert_eq!(summary.aircraft, vec!["AB4", "AB5"]);
    }

    #[test]
    fn overwrite_resets_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let assembler = Assembler::new();

        let enc = encounter(1);
        assembler
            .write(&path, &ScenarioSource::Encounter(&enc), false)
            .unwrap();
        assembler
            .write(&path, &ScenarioSource::Encounter(&enc), true)
            .unwrap();

        let lines = read_lines(&path);
        let cres = lines.iter().filter(|l| l.contains(">CRE ")).count();
        assert_eq!(cres, 2, "overwrite should keep only the last encounter");
    }

    #[test]
    fn default_encounter_ids_bump_monotonically_on_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let assembler = Assembler::new();

        let first = assembler
            .write(&path, &ScenarioSource::Encounter(&encounter(1)), false)
            .unwrap();
        let second = assembler
            .write(&path, &ScenarioSource::Encounter(&encounter(2)), false)
            .unwrap();
        let third = assembler
            .write(&path, &ScenarioSource::Encounter(&encounter(3)), false)
            .unwrap();

        assert_eq!(first.aircraft, vec!["SC1", "SC2"]);
        assert_eq!(second.aircraft, vec!["SC3", "SC4"]);
        assert_eq!(third.aircraft, vec!["SC5", "SC6"]);
    }

    #[test]
    fn colliding_replay_ids_increment_their_suffix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let assembler = Assembler::new();

        let (flights, points) = replay_fixture("AB3", &[330, 330, 330]);
        let source = ScenarioSource::Replay {
            flights: &flights,
            points: &points,
            autodel: false,
        };
        let first = assembler.write(&path, &source, false).unwrap();
        let second = assembler.write(&path, &source, false).unwrap();
        let third = assembler.write(&path, &source, false).unwrap();

        assert_eq!(first.aircraft, vec!["AB3"]);
        assert_eq!(second.aircraft, vec!["AB4"]);
        assert_eq!(third.aircraft, vec!["AB5"]);
    }

    #[test]
    fn replay_renders_creation_route_and_nav_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let (flights, points) = replay_fixture("KL1023", &[330, 340, 340]);
        let source = ScenarioSource::Replay {
            flights: &flights,
            points: &points,
            autodel: false,
        };
        Assembler::new().write(&path, &source, false).unwrap();

        let lines = read_lines(&path);
        assert!(lines.iter().any(|l| l.contains("CRE KL1023,A320,")));
        assert_eq!(lines.iter().filter(|l| l.contains("ADDWPT KL1023 ")).count(), 2);
        assert!(lines.iter().any(|l| l.contains("LNAV KL1023 ON")));
        assert!(lines.iter().any(|l| l.contains("VNAV KL1023 ON")));
        // No landing and no autodel: no fixes, no triggers.
        assert!(!lines.iter().any(|l| l.contains("DEFWPT")));
        assert!(!lines.iter().any(|l| l.contains(" AT ")));
    }

    #[test]
    fn landing_aircraft_gets_approach_and_removal_triggers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let (flights, points) = replay_fixture("KL1023", &[330, 100, 0]);
        let source = ScenarioSource::Replay {
            flights: &flights,
            points: &points,
            autodel: false,
        };
        Assembler::new().write(&path, &source, false).unwrap();

        let lines = read_lines(&path);
        assert!(lines.iter().any(|l| l.contains("DEFWPT KL1023_DEST,")));
        assert!(lines.iter().any(|l| l.contains("DEFWPT KL1023_APP,")));
        assert!(lines
            .iter()
            .any(|l| l.contains("KL1023 AT KL1023_APP DO KL1023 ALT 0")));
        assert!(lines
            .iter()
            .any(|l| l.contains("KL1023 AT KL1023_DEST DO DEL KL1023")));
        // Last leg routes to the named fix with the ground altitude token.
        assert!(lines
            .iter()
            .any(|l| l.contains("ADDWPT KL1023 KL1023_DEST,0,")));
    }

    #[test]
    fn autodel_adds_removal_trigger_without_landing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let (flights, points) = replay_fixture("KL1023", &[330, 340, 350]);
        let source = ScenarioSource::Replay {
            flights: &flights,
            points: &points,
            autodel: true,
        };
        Assembler::new().write(&path, &source, false).unwrap();

        let lines = read_lines(&path);
        assert!(lines.iter().any(|l| l.contains("DEFWPT KL1023_DEST,")));
        assert!(!lines.iter().any(|l| l.contains("_APP")));
        assert!(lines
            .iter()
            .any(|l| l.contains("KL1023 AT KL1023_DEST DO DEL KL1023")));
    }

    #[test]
    fn meta_without_points_is_dropped_silently() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let mut flights = BTreeMap::new();
        let (k, v) = meta("GHOST", "A320");
        flights.insert(k, v);
        let points = BTreeMap::new();
        let source = ScenarioSource::Replay {
            flights: &flights,
            points: &points,
            autodel: true,
        };
        let summary = Assembler::new().write(&path, &source, false).unwrap();
        assert!(summary.aircraft.is_empty());
        assert_eq!(summary.lines, 0);
    }

    #[test]
    fn body_lines_are_chronologically_sorted_after_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let assembler = Assembler::new();

        // Later-starting aircraft written first.
        let (flights_b, points_b) = replay_fixture("BB1", &[330, 330]);
        let mut late_points = points_b.clone();
        for wp in late_points.get_mut("BB1").unwrap() {
            wp.t += 600.0;
        }
        let source_late = ScenarioSource::Replay {
            flights: &flights_b,
            points: &late_points,
            autodel: false,
        };
        assembler.write(&path, &source_late, false).unwrap();

        let (flights_a, points_a) = replay_fixture("AA1", &[330, 330]);
        let source_early = ScenarioSource::Replay {
            flights: &flights_a,
            points: &points_a,
            autodel: false,
        };
        assembler.write(&path, &source_early, false).unwrap();

        let lines = read_lines(&path);
        let mut last_t = 0.0;
        for line in lines.iter().filter(|l| !script::is_header_line(l)) {
            let t = script::parse_stamp(line).expect("all body lines stamped");
            assert!(t >= last_t, "out of order: {line}");
            last_t = t;
        }
        // The earlier-spawning AA1 must come before the late BB1.
        let first_cre = lines.iter().position(|l| l.contains("CRE AA1,")).unwrap();
        let second_cre = lines.iter().position(|l| l.contains("CRE BB1,")).unwrap();
        assert!(first_cre < second_cre);
    }

    #[test]
    fn encounter_lines_route_both_aircraft_to_the_cpa() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.scn");
        let enc = encounter(1);
        Assembler::new()
            .write(&path, &ScenarioSource::Encounter(&enc), false)
            .unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.iter().filter(|l| l.contains(">CRE ")).count(), 2);
        assert_eq!(
            lines
                .iter()
                .filter(|l| l.contains("ADDWPT") && l.contains("52.000000,4.000000,FL330"))
                .count(),
            2
        );
        assert_eq!(lines.iter().filter(|l| l.contains("LNAV")).count(), 2);
        assert_eq!(lines.iter().filter(|l| l.contains("VNAV")).count(), 2);
    }
}
