//! Module providing the Pathway struct for representing a metabolic pathway.

pub mod compound;
pub mod model;
pub mod reaction;

/// Flux assigned to reactions which have no entry in the Flux table (M/s)
pub const DEFAULT_FLUX: f64 = 1e-3;

/// Unit the net reaction is expressed in (M/s per unit coefficient)
pub const NET_REACTION_FLUX_UNIT: f64 = 1e-3;
