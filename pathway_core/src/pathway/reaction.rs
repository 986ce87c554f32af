//! This module provides a struct for representing the reactions of a pathway
use derive_builder::Builder;
use indexmap::IndexMap;

use crate::io::reaction_parse::format_formula;

/// Represents a reaction in the pathway
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Compound stoichiometry of the reaction, substrates are negative
    #[builder(default = "IndexMap::new()")]
    pub stoichiometry: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Flux through the reaction (M/s), the sign sets the direction the reaction runs in
    #[builder(default = "crate::pathway::DEFAULT_FLUX")]
    pub flux: f64,
    /// Standard transformed Gibbs energy of the reaction (kJ/mol), None until estimated
    #[builder(default = "None")]
    pub standard_dg_prime: Option<f64>,
    /// Catalytic rate constant (1/s)
    #[builder(default = "None")]
    pub kcat: Option<f64>,
    /// Michaelis constants (M) keyed by compound id
    #[builder(default = "IndexMap::new()")]
    pub km: IndexMap<String, f64>,
    /// Molecular mass of the enzyme catalyzing the reaction (Da)
    #[builder(default = "None")]
    pub enzyme_mass: Option<f64>,
    /// Measured enzyme concentration (M)
    #[builder(default = "None")]
    pub measured_enzyme: Option<f64>,
}

impl Reaction {
    /// Reaction formula written from the stoichiometry
    pub fn formula(&self) -> String {
        format_formula(&self.stoichiometry)
    }

    /// +1 for reactions running forward, -1 for reactions running backward, 0 without flux
    pub fn direction(&self) -> f64 {
        if self.flux > 0.0 {
            1.0
        } else if self.flux < 0.0 {
            -1.0
        } else {
            0.0
        }
    }

    /// Stoichiometry oriented so that the reaction runs forward along its flux
    pub fn oriented_stoichiometry(&self) -> IndexMap<String, f64> {
        let direction = if self.flux < 0.0 { -1.0 } else { 1.0 };
        self.stoichiometry
            .iter()
            .map(|(compound, coefficient)| (compound.clone(), direction * coefficient))
            .collect()
    }

    /// Ids of the compounds taking part in the reaction
    pub fn compounds(&self) -> impl Iterator<Item = &String> {
        self.stoichiometry.keys()
    }
}
