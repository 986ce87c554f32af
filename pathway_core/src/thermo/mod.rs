//! Thermodynamic analysis of pathways
pub mod mdf;

pub use mdf::{MdfCompound, MdfError, MdfReaction, MdfSolution, ThermodynamicModel};
