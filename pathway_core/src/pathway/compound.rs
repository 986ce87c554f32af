//! This module provides the compound struct representing a metabolite of the pathway

use derive_builder::Builder;

use crate::configuration::{DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND};

/// KEGG accession of water
pub const WATER: &str = "C00001";
/// KEGG accession of the proton
pub const PROTON: &str = "C00080";

/// Represents a compound
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Compound {
    /// Used to identify the compound (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable name of the compound
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Database identifiers, e.g. `KEGG:C00031`
    #[builder(default = "None")]
    pub identifiers: Option<String>,
    /// Lowest allowed concentration (M)
    #[builder(default = "DEFAULT_LOWER_BOUND")]
    pub lower_bound: f64,
    /// Highest allowed concentration (M)
    #[builder(default = "DEFAULT_UPPER_BOUND")]
    pub upper_bound: f64,
    /// Molecular mass (Da), used for metabolite volumes
    #[builder(default = "None")]
    pub molecular_mass: Option<f64>,
}

impl Compound {
    /// KEGG accession of the compound, read from its identifiers
    ///
    /// Accepts `KEGG:C00031`, `kegg.compound:C00031` and a bare `C00031`. Falls back to the
    /// compound id when that looks like a KEGG accession.
    pub fn kegg_id(&self) -> Option<&str> {
        if let Some(identifiers) = &self.identifiers {
            for identifier in identifiers.split([';', ',', ' ']) {
                let accession = match identifier.split_once(':') {
                    Some((namespace, accession)) => {
                        let namespace = namespace.to_ascii_lowercase();
                        if namespace != "kegg" && namespace != "kegg.compound" {
                            continue;
                        }
                        accession
                    }
                    None => identifier,
                };
                if is_kegg_accession(accession) {
                    return Some(accession);
                }
            }
        }
        if is_kegg_accession(&self.id) {
            return Some(&self.id);
        }
        None
    }

    /// Water and protons have their activity fixed to 1
    pub fn has_unit_activity(&self) -> bool {
        matches!(self.kegg_id(), Some(WATER) | Some(PROTON))
    }

    /// Whether the concentration is fixed by its bounds
    pub fn is_fixed(&self) -> bool {
        self.lower_bound == self.upper_bound
    }
}

fn is_kegg_accession(text: &str) -> bool {
    text.len() == 6 && text.starts_with('C') && text[1..].chars().all(|c| c.is_ascii_digit())
}
