pub mod isa;

pub use isa::{gs_to_cas_kt, isa_temperature_pressure};
