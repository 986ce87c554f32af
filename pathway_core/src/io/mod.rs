//! Module for reading and writing pathway documents
pub mod reaction_parse;
pub mod sbtab;
pub mod pathway_sbtab;
