use anyhow::Context;
use scencore::encounter::EncounterRanges;
use scencore::noise::JitterConfig;
use scencore::session::{ConflictMinima, Session};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Session-level configuration loaded from YAML. Every field defaults, so a
/// partial file configures only what it names.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub base_dir: PathBuf,
    pub autodel: bool,
    pub jitter: JitterConfig,
    pub minima: ConflictMinima,
    pub ranges: EncounterRanges,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("scen_data"),
            autodel: true,
            jitter: JitterConfig::default(),
            minima: ConflictMinima::default(),
            ranges: EncounterRanges::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Builds a session carrying this configuration.
    pub fn build_session(&self) -> anyhow::Result<Session> {
        let mut session =
            Session::new(self.base_dir.clone()).context("creating session directories")?;
        session.set_autodel(self.autodel);
        session.set_jitter(self.jitter.clone());
        session.set_minima(self.minima);
        session.set_ranges(self.ranges.clone());
        Ok(session)
    }
}
