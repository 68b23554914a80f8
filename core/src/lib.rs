//! Scenario-synthesis core for the air-traffic replay and encounter platform.
//!
//! The modules turn recorded flight tracks and geometric two-aircraft
//! encounters into time-stamped simulator command scripts, with well-defined
//! merge semantics against a shared output file.

pub mod atmosphere;
pub mod encounter;
pub mod geo;
pub mod noise;
pub mod prelude;
pub mod scenario;
pub mod session;
pub mod telemetry;
pub mod track;

pub use prelude::{ScenarioError, ScenarioResult, WriteSummary};
pub use session::Session;
