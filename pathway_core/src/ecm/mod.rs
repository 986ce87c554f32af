//! Enzyme cost minimisation for pathways with kinetic parameters
pub mod kinetics;
pub mod model;

pub use model::{EcmCompound, EcmError, EcmReaction, EcmSolution, EnzymeCostModel};
