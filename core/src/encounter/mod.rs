pub mod synth;

pub use synth::{
    synthesize, AircraftStart, AltitudeMode, Encounter, EncounterRanges, EncounterSpec,
    SampleRange, Topology,
};
