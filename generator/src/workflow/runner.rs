use crate::workflow::config::WorkflowConfig;
use rand::Rng;
use scencore::encounter::{
    self, AltitudeMode, EncounterSpec, SampleRange, Topology,
};
use scencore::geo;
use scencore::noise;
use scencore::prelude::{ScenarioError, WriteSummary};
use scencore::session::Session;
use std::path::PathBuf;

/// Arguments for one replay generation.
pub struct ReplayArgs {
    pub name: String,
    /// Explicit CSV files or a single directory; empty auto-discovers the
    /// session data directory.
    pub files: Vec<PathBuf>,
    pub overwrite: bool,
}

/// Arguments for one encounter generation.
pub struct EncounterArgs {
    pub name: String,
    pub topology: String,
    pub altmode: String,
    pub lat: f64,
    pub lon: f64,
    pub tcpa: f64,
    pub angle: Option<f64>,
    pub acid1: String,
    pub acid2: String,
    pub type1: String,
    pub type2: String,
    pub fl_cpa: Option<i32>,
    pub seed: Option<u64>,
    pub overwrite: bool,
}

/// Arguments for a randomized batch with CPAs inside a circle.
pub struct BatchArgs {
    pub name: String,
    pub count: usize,
    pub center_lat: f64,
    pub center_lon: f64,
    pub radius_nm: f64,
    /// CSV of topology tokens.
    pub types: String,
    /// level | altcross | mix.
    pub altmode: String,
    /// `lo:hi` seconds; defaults to 60:240.
    pub tcpa: Option<String>,
    pub angle: Option<String>,
    pub cas: Option<String>,
    pub fl: Option<String>,
    /// CSV pool of aircraft type codes, sampled per aircraft.
    pub actypes: Option<String>,
    pub seed: Option<u64>,
    pub overwrite: bool,
}

/// Drives the scenario core from parsed front-end arguments and prints the
/// operator-facing summary lines.
pub struct Runner {
    session: Session,
}

impl Runner {
    pub fn new(config: &WorkflowConfig) -> anyhow::Result<Self> {
        Ok(Self {
            session: config.build_session()?,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn run_replay(&mut self, args: &ReplayArgs) -> anyhow::Result<WriteSummary> {
        let (flights, waypoints) = self.session.load_tracks(&args.files)?;
        self.status(&format!("loaded {flights} flights, {waypoints} waypoints"));
        if self.session.jitter().enabled {
            let j = self.session.jitter();
            self.status(&format!(
                "jitter on: kind={:?} seed={} dt={}s dlat={} dlon={} dfl={} pct={:.0}%",
                j.kind,
                j.seed.map_or("none".to_string(), |s| s.to_string()),
                j.dt_s,
                j.dlat_deg,
                j.dlon_deg,
                j.dfl,
                j.coverage_pct,
            ));
        }
        let summary = self.session.write_replay(&args.name, args.overwrite)?;
        self.status(&format!(
            "{} replay of {} aircraft: {}",
            if summary.appended { "appended" } else { "wrote" },
            summary.aircraft.len(),
            summary.path.display()
        ));
        Ok(summary)
    }

    pub fn run_encounter(&mut self, args: &EncounterArgs) -> anyhow::Result<WriteSummary> {
        let spec = spec_from_args(args)?;
        let enc = encounter::synthesize(&spec, self.session.ranges());
        let summary = self
            .session
            .write_encounter(&args.name, &enc, args.overwrite)?;
        self.echo_encounter(&enc, &summary);
        Ok(summary)
    }

    pub fn run_batch(&mut self, args: &BatchArgs) -> anyhow::Result<Vec<WriteSummary>> {
        if args.count == 0 || args.radius_nm <= 0.0 {
            return Err(
                ScenarioError::InvalidConfig("batch needs count > 0 and radius > 0".into()).into(),
            );
        }
        let topologies = parse_topologies(&args.types)?;
        let fixed_mode = match args.altmode.trim() {
            "mix" => None,
            other => Some(other.parse::<AltitudeMode>()?),
        };
        let tcpa_range = match &args.tcpa {
            Some(text) => SampleRange::parse(text)?,
            None => SampleRange::new(60.0, 240.0),
        };

        // Overrides apply to this batch only; the session ranges are untouched.
        let mut ranges = self.session.ranges().clone();
        if let Some(text) = &args.cas {
            let r = SampleRange::parse(text)?;
            ranges.cas1 = r;
            ranges.cas2 = r;
        }
        if let Some(text) = &args.fl {
            let r = SampleRange::parse(text)?;
            ranges.fl1 = r;
            ranges.fl2 = r;
        }
        if let Some(text) = &args.angle {
            ranges.angle = SampleRange::parse(text)?;
        }
        let pool: Vec<String> = args
            .actypes
            .as_deref()
            .unwrap_or("A320,B738")
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if pool.is_empty() {
            return Err(ScenarioError::InvalidConfig("empty aircraft type pool".into()).into());
        }

        let mut rng = noise::rng_from_seed(args.seed);
        let mut summaries = Vec::with_capacity(args.count);
        let mut overwrite = args.overwrite;
        for _ in 0..args.count {
            let topology = topologies[rng.gen_range(0..topologies.len())];
            let alt_mode = match fixed_mode {
                Some(mode) => mode,
                None => {
                    if rng.gen_bool(0.5) {
                        AltitudeMode::Level
                    } else {
                        AltitudeMode::AltCross
                    }
                }
            };
            // CPA uniform by area: r = R·√u, bearing uniform.
            let r_nm = args.radius_nm * rng.gen::<f64>().sqrt();
            let theta = rng.gen_range(0.0..360.0);
            let (cpa_lat, cpa_lon) =
                geo::destination(args.center_lat, args.center_lon, theta, r_nm);
            let angle = (topology == Topology::Crossing).then(|| ranges.angle.sample(&mut rng));

            let spec = EncounterSpec {
                topology,
                alt_mode,
                cpa_lat,
                cpa_lon,
                tcpa_s: tcpa_range.sample(&mut rng),
                fl_cpa: None,
                angle_deg: angle,
                acid1: "SC1".into(),
                acid2: "SC2".into(),
                type1: pool[rng.gen_range(0..pool.len())].clone(),
                type2: pool[rng.gen_range(0..pool.len())].clone(),
                seed: Some(rng.gen()),
            };
            let enc = encounter::synthesize(&spec, &ranges);
            summaries.push(self.session.write_encounter(&args.name, &enc, overwrite)?);
            overwrite = false;
        }

        if let Some(last) = summaries.last() {
            self.status(&format!(
                "batch of {} encounters in r={:.1} NM around ({:.4},{:.4}): {}",
                summaries.len(),
                args.radius_nm,
                args.center_lat,
                args.center_lon,
                last.path.display()
            ));
        }
        Ok(summaries)
    }

    /// Emits the `IC` host command that loads a written scenario.
    pub fn emit_load(&self, summary: &WriteSummary) {
        println!("IC {}", summary.path.display());
    }

    /// Emits the `IC` host command for an already-written scenario by name.
    pub fn run_load(&self, name: &str) -> anyhow::Result<()> {
        let path = self.session.scenario_path(name);
        if !path.is_file() {
            return Err(ScenarioError::MissingInput(format!(
                "scenario not found: {}",
                path.display()
            ))
            .into());
        }
        println!("IC {}", path.display());
        Ok(())
    }

    /// Emits `DEL` host commands for every aircraft spawned by encounter
    /// generation in this session.
    pub fn emit_cleanup(&mut self) -> Vec<String> {
        let dels = self.session.drain_spawned_dels();
        for line in &dels {
            println!("{line}");
        }
        self.status(&format!("deleted {} encounter aircraft", dels.len()));
        dels
    }

    fn echo_encounter(&self, enc: &encounter::Encounter, summary: &WriteSummary) {
        let minima = self.session.minima();
        self.status(&format!(
            "{} {} encounter ({}): {}",
            if summary.appended { "appended" } else { "wrote" },
            enc.topology,
            enc.alt_mode,
            summary.path.display()
        ));
        self.status(&format!(
            "CPA=({:.4},{:.4}) tcpa={:.0}s minima: HSEP={} NM VSEP={} ft",
            enc.cpa_lat, enc.cpa_lon, enc.tcpa_s, minima.hsep_nm, minima.vsep_ft
        ));
        for (acid, ac) in summary.aircraft.iter().zip([&enc.first, &enc.second]) {
            self.status(&format!(
                "{acid} {} hdg={:03} cas={:.1} kt FL{}->FL{}",
                ac.ac_type, ac.heading_deg, ac.cas_kt, ac.fl_start, ac.fl_cpa
            ));
        }
    }

    fn status(&self, message: &str) {
        println!("[scen] {message}");
    }
}

fn spec_from_args(args: &EncounterArgs) -> anyhow::Result<EncounterSpec> {
    let topology: Topology = args.topology.parse()?;
    let alt_mode: AltitudeMode = args.altmode.parse()?;
    Ok(EncounterSpec {
        topology,
        alt_mode,
        cpa_lat: args.lat,
        cpa_lon: args.lon,
        tcpa_s: args.tcpa,
        fl_cpa: args.fl_cpa,
        angle_deg: args.angle,
        acid1: args.acid1.clone(),
        acid2: args.acid2.clone(),
        type1: args.type1.clone(),
        type2: args.type2.clone(),
        seed: args.seed,
    })
}

fn parse_topologies(text: &str) -> anyhow::Result<Vec<Topology>> {
    let topologies: Vec<Topology> = text
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()?;
    if topologies.is_empty() {
        return Err(ScenarioError::InvalidConfig("empty topology list".into()).into());
    }
    Ok(topologies)
}
