pub mod assembler;
pub mod names;
pub mod script;

pub use assembler::{Assembler, ScenarioSource};
