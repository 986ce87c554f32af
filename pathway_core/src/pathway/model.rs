//! This module provides the Pathway struct for representing an entire pathway
use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;
use tracing::{debug, warn};

use crate::configuration::{
    ConfigError, PathwayConfig, DEFAULT_KCAT, DEFAULT_KM_MILLIMOLAR, DEFAULT_PROTEIN_MASS,
    REFERENCE_IONIC_STRENGTH, REFERENCE_P_H,
};
use crate::estimation::{EstimationError, GibbsEstimator};
use crate::io::reaction_parse::{format_formula, ReactionParseError};
use crate::io::sbtab::SbtabError;
use crate::pathway::compound::Compound;
use crate::pathway::reaction::Reaction;
use crate::pathway::NET_REACTION_FLUX_UNIT;

/// Represents a metabolic pathway together with its thermodynamic and kinetic annotation
#[derive(Clone, Debug, PartialEq)]
pub struct Pathway {
    /// Map of compound ids to Compound objects, in document order
    pub compounds: IndexMap<String, Compound>,
    /// Map of reaction ids to Reaction objects, in document order
    pub reactions: IndexMap<String, Reaction>,
    /// Options from the Configuration table
    pub config: PathwayConfig,
}

impl Pathway {
    pub fn new_empty() -> Self {
        Pathway {
            compounds: IndexMap::new(),
            reactions: IndexMap::new(),
            config: PathwayConfig::default(),
        }
    }

    /// Add a compound to the pathway
    ///
    /// # Examples
    /// ```rust
    /// use pathway_core::pathway::model::Pathway;
    /// use pathway_core::pathway::compound::CompoundBuilder;
    /// let mut pathway = Pathway::new_empty();
    /// pathway.add_compound(CompoundBuilder::default().id("glc").build().unwrap());
    /// assert!(pathway.compounds.contains_key("glc"));
    /// ```
    pub fn add_compound(&mut self, compound: Compound) {
        let id = compound.id.clone();
        self.compounds.insert(id, compound);
    }

    /// Add a reaction to the pathway
    pub fn add_reaction(&mut self, reaction: Reaction) {
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Check that every reaction only uses known compounds, and that all concentration bounds
    /// are positive and ordered
    pub fn validate(&self) -> Result<(), PathwayError> {
        for reaction in self.reactions.values() {
            for compound in reaction.compounds() {
                if !self.compounds.contains_key(compound) {
                    return Err(PathwayError::UnknownCompound {
                        reaction: reaction.id.clone(),
                        compound: compound.clone(),
                    });
                }
            }
        }
        for compound in self.compounds.values() {
            if compound.lower_bound <= 0.0 || compound.lower_bound > compound.upper_bound {
                return Err(PathwayError::InvalidBounds {
                    compound: compound.id.clone(),
                    lower_bound: compound.lower_bound,
                    upper_bound: compound.upper_bound,
                });
            }
        }
        Ok(())
    }

    /// Stoichiometric matrix with one row per compound and one column per reaction
    pub fn stoichiometric_matrix(&self) -> DMatrix<f64> {
        let mut matrix = DMatrix::zeros(self.compounds.len(), self.reactions.len());
        for (j, reaction) in self.reactions.values().enumerate() {
            for (compound, coefficient) in &reaction.stoichiometry {
                if let Some(i) = self.compounds.get_index_of(compound) {
                    matrix[(i, j)] = *coefficient;
                }
            }
        }
        matrix
    }

    /// Reaction fluxes (M/s) in reaction order
    pub fn fluxes(&self) -> DVector<f64> {
        DVector::from_iterator(self.reactions.len(), self.reactions.values().map(|r| r.flux))
    }

    /// Standard reaction Gibbs energies (kJ/mol) in reaction order
    pub fn standard_dg_primes(&self) -> Result<DVector<f64>, PathwayError> {
        let values = self
            .reactions
            .values()
            .map(|r| {
                r.standard_dg_prime
                    .ok_or_else(|| PathwayError::MissingStandardDg(r.id.clone()))
            })
            .collect::<Result<Vec<f64>, PathwayError>>()?;
        Ok(DVector::from_vec(values))
    }

    /// RT in kJ/mol at the configured temperature
    pub fn rt(&self) -> Result<f64, PathwayError> {
        Ok(self.config.rt()?)
    }

    /// Fill in the standard Gibbs energy of every reaction which doesn't have one yet
    pub fn estimate_standard_dgs<E: GibbsEstimator + ?Sized>(
        &mut self,
        estimator: &E,
    ) -> Result<(), PathwayError> {
        let p_h = self.config.p_h()?;
        let ionic_strength = self.config.ionic_strength()?;
        if (p_h - REFERENCE_P_H).abs() > 1e-6
            || (ionic_strength - REFERENCE_IONIC_STRENGTH).abs() > 1e-6
        {
            warn!(
                p_h,
                ionic_strength,
                "formation energies are tabulated at pH 7 and I = 0.25 M, using them as is"
            );
        }
        for reaction in self.reactions.values_mut() {
            if reaction.standard_dg_prime.is_some() {
                continue;
            }
            let dg = estimator.standard_dg_prime(reaction, &self.compounds)?;
            debug!(reaction = %reaction.id, dg, "estimated standard Gibbs energy");
            reaction.standard_dg_prime = Some(dg);
        }
        Ok(())
    }

    /// Give every reaction default kinetic parameters where they are missing
    ///
    /// Every reactant except water and protons gets a Michaelis constant.
    pub fn set_default_kinetics(&mut self) {
        for reaction in self.reactions.values_mut() {
            reaction.kcat.get_or_insert(DEFAULT_KCAT);
            reaction.enzyme_mass.get_or_insert(DEFAULT_PROTEIN_MASS);
            for compound_id in reaction.stoichiometry.keys() {
                let unit_activity = self
                    .compounds
                    .get(compound_id)
                    .is_some_and(|c| c.has_unit_activity());
                if !unit_activity && !reaction.km.contains_key(compound_id) {
                    reaction
                        .km
                        .insert(compound_id.clone(), DEFAULT_KM_MILLIMOLAR * 1e-3);
                }
            }
        }
    }

    /// Overall stoichiometry of the pathway, `S · v` with fluxes expressed in mM/s
    ///
    /// Compounds with a net coefficient below 1e-9 in magnitude are dropped.
    pub fn net_reaction(&self) -> IndexMap<String, f64> {
        let net = self.stoichiometric_matrix() * (self.fluxes() / NET_REACTION_FLUX_UNIT);
        self.compounds
            .keys()
            .zip(net.iter())
            .filter(|(_, coefficient)| coefficient.abs() >= 1e-9)
            .map(|(id, coefficient)| (id.clone(), *coefficient))
            .collect()
    }

    /// Formula of the net reaction, e.g. `C00031 + 2 C00003 <=> 2 C00022 + 2 C00004`
    pub fn net_reaction_formula(&self) -> String {
        format_formula(&self.net_reaction())
    }
}

/// Errors associated with building or using a Pathway
#[derive(Error, Debug)]
pub enum PathwayError {
    /// Problem with the underlying SBtab document
    #[error("{0}")]
    Sbtab(#[from] SbtabError),
    /// A reaction formula could not be parsed
    #[error("reaction {reaction}: {source}")]
    Formula {
        reaction: String,
        source: ReactionParseError,
    },
    /// Problem with the Configuration table
    #[error("{0}")]
    Config(#[from] ConfigError),
    /// Standard Gibbs energy estimation failed
    #[error("{0}")]
    Estimation(#[from] EstimationError),
    /// A reaction refers to a compound missing from the Compound table
    #[error("reaction {reaction} uses compound {compound}, which is not in the Compound table")]
    UnknownCompound { reaction: String, compound: String },
    /// A quantity table refers to a reaction missing from the Reaction table
    #[error("table {table} refers to unknown reaction {reaction}")]
    UnknownReaction { table: String, reaction: String },
    /// A table is missing a required column
    #[error("table {table} is missing the !{column} column")]
    MissingColumn { table: String, column: String },
    /// A numeric cell could not be parsed
    #[error("table {table}, row {row}: invalid number '{value}'")]
    InvalidNumber {
        table: String,
        row: usize,
        value: String,
    },
    /// A table uses a unit which can't be converted
    #[error("table {table} uses unsupported unit '{unit}'")]
    UnknownUnit { table: String, unit: String },
    /// Concentration bounds are not positive or not ordered
    #[error("invalid concentration bounds for {compound}: [{lower_bound}, {upper_bound}] M")]
    InvalidBounds {
        compound: String,
        lower_bound: f64,
        upper_bound: f64,
    },
    /// A reaction has no standard Gibbs energy
    #[error("reaction {0} has no standard Gibbs energy")]
    MissingStandardDg(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::reaction_parse::parse_formula;
    use crate::pathway::compound::CompoundBuilder;
    use crate::pathway::reaction::ReactionBuilder;

    fn setup_pathway() -> Pathway {
        let mut pathway = Pathway::new_empty();
        for (id, kegg) in [("A", "C00031"), ("B", "C00092"), ("C", "C00085"), ("h2o", "C00001")] {
            pathway.add_compound(
                CompoundBuilder::default()
                    .id(id)
                    .identifiers(Some(format!("KEGG:{}", kegg)))
                    .build()
                    .unwrap(),
            );
        }
        pathway.add_reaction(
            ReactionBuilder::default()
                .id("R1")
                .stoichiometry(parse_formula("A + h2o <=> B").unwrap())
                .flux(1e-3)
                .build()
                .unwrap(),
        );
        pathway.add_reaction(
            ReactionBuilder::default()
                .id("R2")
                .stoichiometry(parse_formula("B <=> 2 C").unwrap())
                .flux(1e-3)
                .build()
                .unwrap(),
        );
        pathway
    }

    #[test]
    fn stoichiometric_matrix() {
        let pathway = setup_pathway();
        let s = pathway.stoichiometric_matrix();
        assert_eq!(s.shape(), (4, 2));
        assert_eq!(s[(0, 0)], -1.0);
        assert_eq!(s[(1, 0)], 1.0);
        assert_eq!(s[(1, 1)], -1.0);
        assert_eq!(s[(2, 1)], 2.0);
        assert_eq!(s[(3, 0)], -1.0);
    }

    #[test]
    fn net_reaction() {
        let pathway = setup_pathway();
        let net = pathway.net_reaction();
        assert!(!net.contains_key("B"));
        assert!((net["A"] + 1.0).abs() < 1e-12);
        assert!((net["C"] - 2.0).abs() < 1e-12);
        assert_eq!(pathway.net_reaction_formula(), "A + h2o <=> 2 C");
    }

    #[test]
    fn validation() {
        let mut pathway = setup_pathway();
        assert!(pathway.validate().is_ok());

        pathway.add_reaction(
            ReactionBuilder::default()
                .id("R3")
                .stoichiometry(parse_formula("C <=> D").unwrap())
                .build()
                .unwrap(),
        );
        match pathway.validate() {
            Err(PathwayError::UnknownCompound { reaction, compound }) => {
                assert_eq!(reaction, "R3");
                assert_eq!(compound, "D");
            }
            _ => panic!("Unknown compound not caught"),
        }

        let mut pathway = setup_pathway();
        pathway.compounds["A"].lower_bound = 1.0;
        assert!(matches!(
            pathway.validate(),
            Err(PathwayError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn default_kinetics() {
        let mut pathway = setup_pathway();
        pathway.set_default_kinetics();
        let r1 = &pathway.reactions["R1"];
        assert_eq!(r1.kcat, Some(DEFAULT_KCAT));
        assert_eq!(r1.enzyme_mass, Some(DEFAULT_PROTEIN_MASS));
        assert!(r1.km.contains_key("A"));
        assert!(r1.km.contains_key("B"));
        // Water has unit activity and takes no part in saturation
        assert!(!r1.km.contains_key("h2o"));
    }

    #[test]
    fn missing_standard_dg() {
        let pathway = setup_pathway();
        match pathway.standard_dg_primes() {
            Err(PathwayError::MissingStandardDg(id)) => assert_eq!(id, "R1"),
            _ => panic!("Missing standard Gibbs energy not caught"),
        }
    }
}
