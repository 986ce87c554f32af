//! Estimation of standard reaction Gibbs energies from compound formation energies
use indexmap::IndexMap;
use thiserror::Error;

use crate::pathway::compound::Compound;
use crate::pathway::reaction::Reaction;

const BUNDLED_FORMATION_ENERGIES: &str = include_str!("../data/formation_energies.tsv");

/// Source of standard transformed Gibbs energies
pub trait GibbsEstimator {
    /// Standard transformed Gibbs energy of formation of a compound (kJ/mol)
    fn standard_dg_formation(&self, compound: &Compound) -> Result<f64, EstimationError>;

    /// Standard transformed Gibbs energy of a reaction (kJ/mol), `Σ ν·ΔfG'°`
    fn standard_dg_prime(
        &self,
        reaction: &Reaction,
        compounds: &IndexMap<String, Compound>,
    ) -> Result<f64, EstimationError> {
        let mut total = 0.0;
        for (compound_id, coefficient) in &reaction.stoichiometry {
            let compound =
                compounds
                    .get(compound_id)
                    .ok_or_else(|| EstimationError::UnknownCompound {
                        compound: compound_id.clone(),
                    })?;
            total += coefficient * self.standard_dg_formation(compound)?;
        }
        Ok(total)
    }
}

/// Formation energy estimator keyed by KEGG accession
///
/// The default instance is backed by a bundled table of formation energies for central
/// carbon metabolism (pH 7, I = 0.25 M). Other tables can be loaded with
/// [`ComponentContribution::from_tsv`].
#[derive(Clone, Debug)]
pub struct ComponentContribution {
    /// Formation energies (kJ/mol) keyed by KEGG accession
    formation_energies: IndexMap<String, f64>,
}

impl Default for ComponentContribution {
    fn default() -> Self {
        ComponentContribution::from_tsv(BUNDLED_FORMATION_ENERGIES)
    }
}

impl ComponentContribution {
    /// Read formation energies from `accession<TAB>name<TAB>value` lines, `#` starts a comment
    ///
    /// Lines that don't hold a parsable value are skipped.
    pub fn from_tsv(content: &str) -> Self {
        let formation_energies = content
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let cells: Vec<&str> = line.split('\t').collect();
                let accession = cells.first()?.trim();
                let value = cells.last()?.trim().parse::<f64>().ok()?;
                Some((accession.to_string(), value))
            })
            .collect();
        ComponentContribution { formation_energies }
    }

    /// Number of compounds with known formation energies
    pub fn len(&self) -> usize {
        self.formation_energies.len()
    }

    /// Whether no formation energies are known
    pub fn is_empty(&self) -> bool {
        self.formation_energies.is_empty()
    }
}

impl GibbsEstimator for ComponentContribution {
    fn standard_dg_formation(&self, compound: &Compound) -> Result<f64, EstimationError> {
        let kegg_id = compound
            .kegg_id()
            .ok_or_else(|| EstimationError::NoIdentifier {
                compound: compound.id.clone(),
            })?;
        self.formation_energies
            .get(kegg_id)
            .copied()
            .ok_or_else(|| EstimationError::UnknownFormationEnergy {
                compound: compound.id.clone(),
                kegg_id: kegg_id.to_string(),
            })
    }
}

/// Errors from estimating Gibbs energies
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    /// The compound has no KEGG identifier to look it up by
    #[error("compound {compound} has no KEGG identifier")]
    NoIdentifier { compound: String },
    /// No formation energy is known for the compound
    #[error("no formation energy is known for compound {compound} ({kegg_id})")]
    UnknownFormationEnergy { compound: String, kegg_id: String },
    /// The reaction uses a compound which is not part of the pathway
    #[error("compound {compound} is not part of the pathway")]
    UnknownCompound { compound: String },
}
