use clap::{Parser, Subcommand};
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::{BatchArgs, EncounterArgs, ReplayArgs, Runner};

mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Air-traffic scenario generation driver")]
struct Args {
    /// Load session configuration from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the session base directory
    #[arg(long)]
    base_dir: Option<PathBuf>,
    /// Print each write summary as JSON
    #[arg(long, default_value_t = false)]
    report_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a replay scenario from recorded tracks
    Replay {
        name: String,
        /// Explicit CSV files or one directory; omit to scan <base>/data
        #[arg(long)]
        files: Vec<PathBuf>,
        #[arg(long, default_value_t = false)]
        overwrite: bool,
        /// Emit the IC host command for the written file
        #[arg(long, default_value_t = false)]
        load: bool,
    },
    /// Synthesize one two-aircraft encounter
    Encounter {
        name: String,
        /// headon | cross | overtake
        #[arg(long)]
        topology: String,
        /// level | altcross
        #[arg(long, default_value = "level")]
        altmode: String,
        /// CPA latitude (deg)
        #[arg(long)]
        lat: f64,
        /// CPA longitude (deg)
        #[arg(long)]
        lon: f64,
        /// Seconds from spawn to closest approach
        #[arg(long)]
        tcpa: f64,
        /// Crossing angle override (deg)
        #[arg(long)]
        angle: Option<f64>,
        #[arg(long, default_value = "SC1")]
        acid1: String,
        #[arg(long, default_value = "SC2")]
        acid2: String,
        #[arg(long, default_value = "A320")]
        type1: String,
        #[arg(long, default_value = "B738")]
        type2: String,
        /// Flight level at CPA
        #[arg(long)]
        fl_cpa: Option<i32>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = false)]
        overwrite: bool,
        #[arg(long, default_value_t = false)]
        load: bool,
    },
    /// Append randomized encounters with CPAs inside a circular region
    BatchCircle {
        name: String,
        #[arg(long)]
        count: usize,
        #[arg(long)]
        center_lat: f64,
        #[arg(long)]
        center_lon: f64,
        #[arg(long)]
        radius_nm: f64,
        /// CSV of topology tokens
        #[arg(long, default_value = "headon,cross,overtake")]
        types: String,
        /// level | altcross | mix
        #[arg(long, default_value = "level")]
        altmode: String,
        /// Seconds to CPA as lo:hi (default 60:240)
        #[arg(long)]
        tcpa: Option<String>,
        #[arg(long)]
        angle: Option<String>,
        #[arg(long)]
        cas: Option<String>,
        #[arg(long)]
        fl: Option<String>,
        /// CSV pool of aircraft type codes
        #[arg(long)]
        actypes: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = false)]
        overwrite: bool,
        /// Emit DEL host commands for the spawned aircraft afterwards
        #[arg(long, default_value_t = false)]
        cleanup: bool,
        #[arg(long, default_value_t = false)]
        load: bool,
    },
    /// Emit the IC host command for an existing scenario
    Load { name: String },
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("[scen][err] {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    if let Some(base) = &args.base_dir {
        config.base_dir = base.clone();
    }
    let mut runner = Runner::new(&config)?;

    match args.command {
        Command::Replay {
            name,
            files,
            overwrite,
            load,
        } => {
            let summary = runner.run_replay(&ReplayArgs {
                name,
                files,
                overwrite,
            })?;
            if args.report_json {
                println!("{}", serde_json::to_string(&summary)?);
            }
            if load {
                runner.emit_load(&summary);
            }
        }
        Command::Encounter {
            name,
            topology,
            altmode,
            lat,
            lon,
            tcpa,
            angle,
            acid1,
            acid2,
            type1,
            type2,
            fl_cpa,
            seed,
            overwrite,
            load,
        } => {
            let summary = runner.run_encounter(&EncounterArgs {
                name,
                topology,
                altmode,
                lat,
                lon,
                tcpa,
                angle,
                acid1,
                acid2,
                type1,
                type2,
                fl_cpa,
                seed,
                overwrite,
            })?;
            if args.report_json {
                println!("{}", serde_json::to_string(&summary)?);
            }
            if load {
                runner.emit_load(&summary);
            }
        }
        Command::BatchCircle {
            name,
            count,
            center_lat,
            center_lon,
            radius_nm,
            types,
            altmode,
            tcpa,
            angle,
            cas,
            fl,
            actypes,
            seed,
            overwrite,
            cleanup,
            load,
        } => {
            let summaries = runner.run_batch(&BatchArgs {
                name,
                count,
                center_lat,
                center_lon,
                radius_nm,
                types,
                altmode,
                tcpa,
                angle,
                cas,
                fl,
                actypes,
                seed,
                overwrite,
            })?;
            if args.report_json {
                println!("{}", serde_json::to_string(&summaries)?);
            }
            if load {
                if let Some(last) = summaries.last() {
                    runner.emit_load(last);
                }
            }
            if cleanup {
                runner.emit_cleanup();
            }
        }
        Command::Load { name } => {
            runner.run_load(&name)?;
        }
    }
    Ok(())
}
