//! Core rust implementation of the pathway toolkit: SBtab pathway documents, Max-min Driving
//! Force analysis, Enzyme Cost Minimisation and PDF reports of the results.

pub mod configuration;
pub mod ecm;
pub mod estimation;
pub mod io;
pub mod optimize;
pub mod pathway;
pub mod plot;
pub mod report;
pub mod thermo;
mod utils;
