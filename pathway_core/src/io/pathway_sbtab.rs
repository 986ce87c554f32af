//! Module providing SBtab IO for Pathways
//!
//! A network SBtab holds `Reaction`, `Compound` and optionally `Flux`,
//! `ConcentrationConstraint` and `Configuration` tables. A pathway SBtab additionally holds a
//! `Parameter` table with the thermodynamic (and for ECM, kinetic) annotation, and optionally
//! an `EnzymeConcentration` table with measured enzyme levels.
use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, info, instrument};

use crate::configuration::{
    concentration_scale, energy_scale, flux_scale, mass_scale, Algorithm, PathwayConfig, DEFAULT_LOWER_BOUND,
    DEFAULT_UPPER_BOUND,
};
use crate::estimation::GibbsEstimator;
use crate::io::reaction_parse::parse_formula;
use crate::io::sbtab::{SbtabDocument, SbtabTable};
use crate::pathway::compound::Compound;
use crate::pathway::model::{Pathway, PathwayError};
use crate::pathway::reaction::Reaction;
use crate::pathway::DEFAULT_FLUX;
use crate::utils::format::format_number;

// region Quantity Types
pub const STANDARD_DG: &str = "standard Gibbs energy of reaction";
pub const EQUILIBRIUM_CONSTANT: &str = "equilibrium constant";
pub const KCAT: &str = "catalytic rate constant geometric mean";
pub const MICHAELIS_CONSTANT: &str = "Michaelis constant";
pub const PROTEIN_MASS: &str = "protein molecular mass";
pub const MOLECULAR_MASS: &str = "molecular mass";
pub const RATE_OF_REACTION: &str = "rate of reaction";
pub const CONCENTRATION: &str = "concentration";
pub const CONCENTRATION_OF_ENZYME: &str = "concentration of enzyme";
// endregion Quantity Types

impl Pathway {
    /// Build a pathway from a pathway SBtab document
    #[instrument(level = "info", skip_all, fields(document = %doc.name))]
    pub fn from_sbtab(doc: &SbtabDocument) -> Result<Pathway, PathwayError> {
        let mut pathway = Pathway::new_empty();
        if let Some(table) = doc.get_table("Configuration") {
            pathway.config = PathwayConfig::from_table(table)?;
        }
        pathway.read_compounds(doc.require_table("Compound")?)?;
        pathway.read_reactions(doc.require_table("Reaction")?)?;
        if let Some(table) = doc.get_table("Flux") {
            pathway.read_fluxes(table)?;
        }
        if let Some(table) = doc.get_table("ConcentrationConstraint") {
            pathway.read_concentration_constraints(table)?;
        }
        if let Some(table) = doc.get_table("Parameter") {
            pathway.read_parameters(table)?;
        }
        if let Some(table) = doc.get_table("EnzymeConcentration") {
            pathway.read_enzyme_concentrations(table)?;
        }
        pathway.validate()?;
        info!(
            compounds = pathway.compounds.len(),
            reactions = pathway.reactions.len(),
            "read pathway"
        );
        Ok(pathway)
    }

    /// Build a pathway from a network SBtab file, estimating any missing standard Gibbs
    /// energies with `estimator`
    ///
    /// # Parameters
    /// - `path`: Network SBtab file
    /// - `estimator`: Source of formation energies
    /// - `algorithm`: Analysis the pathway is prepared for, ECM pathways get default kinetic
    ///   parameters where none are given
    pub fn from_network_sbtab<P: AsRef<Path>, E: GibbsEstimator + ?Sized>(
        path: P,
        estimator: &E,
        algorithm: Algorithm,
    ) -> Result<Pathway, PathwayError> {
        let doc = SbtabDocument::read(path)?;
        Pathway::from_network_document(&doc, estimator, algorithm)
    }

    /// Same as [`Pathway::from_network_sbtab`] for an already parsed document
    pub fn from_network_document<E: GibbsEstimator + ?Sized>(
        doc: &SbtabDocument,
        estimator: &E,
        algorithm: Algorithm,
    ) -> Result<Pathway, PathwayError> {
        let mut pathway = Pathway::from_sbtab(doc)?;
        pathway.estimate_standard_dgs(estimator)?;
        pathway.config.set("algorithm", &algorithm.to_string());
        if algorithm == Algorithm::Ecm {
            pathway.set_default_kinetics();
        }
        Ok(pathway)
    }

    /// Convert the pathway into a pathway SBtab document
    pub fn to_sbtab(&self) -> SbtabDocument {
        let mut doc = SbtabDocument::new("pathway", "pathway.tsv");

        let mut config = SbtabTable::new("Configuration", "Config", &["Option", "Value"]);
        for (option, value) in self.config.iter() {
            config.add_row(&[option, value]);
        }
        doc.add_table(config);

        let mut reactions = SbtabTable::new("Reaction", "Reaction", &["ID", "ReactionFormula"]);
        for reaction in self.reactions.values() {
            reactions.add_row(&[reaction.id.clone(), reaction.formula()]);
        }
        doc.add_table(reactions);

        let mut compounds = SbtabTable::new("Compound", "Compound", &["ID", "Name", "Identifiers"]);
        for compound in self.compounds.values() {
            compounds.add_row(&[
                compound.id.clone(),
                compound.name.clone().unwrap_or_default(),
                compound.identifiers.clone().unwrap_or_default(),
            ]);
        }
        doc.add_table(compounds);

        let mut fluxes = SbtabTable::new("Flux", "Quantity", &["QuantityType", "Reaction", "Value"]);
        fluxes.set_attribute("Unit", "mM/s");
        for reaction in self.reactions.values() {
            fluxes.add_row(&[
                RATE_OF_REACTION.to_string(),
                reaction.id.clone(),
                format_number(reaction.flux * 1e3),
            ]);
        }
        doc.add_table(fluxes);

        let mut bounds = SbtabTable::new(
            "ConcentrationConstraint",
            "Quantity",
            &["QuantityType", "Compound", "Min", "Max"],
        );
        bounds.set_attribute("Unit", "mM");
        for compound in self.compounds.values() {
            bounds.add_row(&[
                CONCENTRATION.to_string(),
                compound.id.clone(),
                format_number(compound.lower_bound * 1e3),
                format_number(compound.upper_bound * 1e3),
            ]);
        }
        doc.add_table(bounds);

        doc.add_table(self.parameter_table());

        let measured: Vec<&Reaction> = self
            .reactions
            .values()
            .filter(|r| r.measured_enzyme.is_some())
            .collect();
        if !measured.is_empty() {
            let mut enzymes = SbtabTable::new(
                "EnzymeConcentration",
                "Quantity",
                &["QuantityType", "Reaction", "Value"],
            );
            enzymes.set_attribute("Unit", "mM");
            for reaction in measured {
                enzymes.add_row(&[
                    CONCENTRATION_OF_ENZYME.to_string(),
                    reaction.id.clone(),
                    format_number(reaction.measured_enzyme.unwrap_or_default() * 1e3),
                ]);
            }
            doc.add_table(enzymes);
        }
        doc
    }

    fn parameter_table(&self) -> SbtabTable {
        let mut table = SbtabTable::new(
            "Parameter",
            "Quantity",
            &["QuantityType", "Reaction", "Compound", "Value", "Unit"],
        );
        for reaction in self.reactions.values() {
            let id = reaction.id.as_str();
            if let Some(dg) = reaction.standard_dg_prime {
                table.add_row(&[STANDARD_DG, id, "", format_number(dg).as_str(), "kJ/mol"]);
            }
            if let Some(kcat) = reaction.kcat {
                table.add_row(&[KCAT, id, "", format_number(kcat).as_str(), "1/s"]);
            }
            for (compound, km) in &reaction.km {
                table.add_row(&[
                    MICHAELIS_CONSTANT,
                    id,
                    compound.as_str(),
                    format_number(km * 1e3).as_str(),
                    "mM",
                ]);
            }
            if let Some(mass) = reaction.enzyme_mass {
                table.add_row(&[PROTEIN_MASS, id, "", format_number(mass).as_str(), "Da"]);
            }
        }
        for compound in self.compounds.values() {
            if let Some(mass) = compound.molecular_mass {
                table.add_row(&[
                    MOLECULAR_MASS,
                    "",
                    compound.id.as_str(),
                    format_number(mass).as_str(),
                    "Da",
                ]);
            }
        }
        table
    }

    // region Table Readers
    fn read_compounds(&mut self, table: &SbtabTable) -> Result<(), PathwayError> {
        let id_col = require_column(table, "ID")?;
        let name_col = table.column_index("Name");
        let identifier_col = table
            .column_index("Identifiers")
            .or_else(|| table.column_index("Identifiers:kegg.compound"));
        for row in table.rows() {
            let id = row[id_col].trim();
            if id.is_empty() {
                continue;
            }
            let cell = |col: Option<usize>| {
                col.map(|c| row[c].trim().to_string())
                    .filter(|value| !value.is_empty())
            };
            let mut compound = Compound {
                id: id.to_string(),
                name: cell(name_col),
                identifiers: cell(identifier_col),
                lower_bound: DEFAULT_LOWER_BOUND,
                upper_bound: DEFAULT_UPPER_BOUND,
                molecular_mass: None,
            };
            if compound.has_unit_activity() {
                compound.lower_bound = 1.0;
                compound.upper_bound = 1.0;
            }
            self.add_compound(compound);
        }
        Ok(())
    }

    fn read_reactions(&mut self, table: &SbtabTable) -> Result<(), PathwayError> {
        let id_col = require_column(table, "ID")?;
        let formula_col = require_column(table, "ReactionFormula")?;
        let name_col = table.column_index("Name");
        for row in table.rows() {
            let id = row[id_col].trim();
            if id.is_empty() {
                continue;
            }
            let stoichiometry =
                parse_formula(&row[formula_col]).map_err(|source| PathwayError::Formula {
                    reaction: id.to_string(),
                    source,
                })?;
            let name = name_col
                .map(|c| row[c].trim().to_string())
                .filter(|n| !n.is_empty());
            self.add_reaction(Reaction {
                id: id.to_string(),
                stoichiometry,
                name,
                flux: DEFAULT_FLUX,
                standard_dg_prime: None,
                kcat: None,
                km: IndexMap::new(),
                enzyme_mass: None,
                measured_enzyme: None,
            });
        }
        Ok(())
    }

    fn read_fluxes(&mut self, table: &SbtabTable) -> Result<(), PathwayError> {
        let scale = table_scale(table, "mM/s", flux_scale)?;
        let reaction_col = require_column(table, "Reaction")?;
        let value_col = require_column(table, "Value")?;
        for (row_index, row) in table.rows().iter().enumerate() {
            let reaction = self.reaction_mut(table, &row[reaction_col])?;
            reaction.flux = parse_number(table, row_index, &row[value_col])? * scale;
        }
        Ok(())
    }

    fn read_concentration_constraints(&mut self, table: &SbtabTable) -> Result<(), PathwayError> {
        let scale = table_scale(table, "mM", concentration_scale)?;
        let compound_col = require_column(table, "Compound")?;
        let min_col = require_column(table, "Min")?;
        let max_col = require_column(table, "Max")?;
        for (row_index, row) in table.rows().iter().enumerate() {
            let compound_id = row[compound_col].trim();
            let compound = match self.compounds.get_mut(compound_id) {
                Some(compound) => compound,
                None => {
                    debug!(compound = compound_id, "skipping bounds of unknown compound");
                    continue;
                }
            };
            if !row[min_col].trim().is_empty() {
                compound.lower_bound = parse_number(table, row_index, &row[min_col])? * scale;
            }
            if !row[max_col].trim().is_empty() {
                compound.upper_bound = parse_number(table, row_index, &row[max_col])? * scale;
            }
        }
        Ok(())
    }

    fn read_parameters(&mut self, table: &SbtabTable) -> Result<(), PathwayError> {
        let type_col = require_column(table, "QuantityType")?;
        let value_col = require_column(table, "Value")?;
        let reaction_col = table.column_index("Reaction");
        let compound_col = table.column_index("Compound");
        let unit_col = table.column_index("Unit");
        let rt = self.rt()?;
        for (row_index, row) in table.rows().iter().enumerate() {
            let quantity = row[type_col].trim();
            let value = parse_number(table, row_index, &row[value_col])?;
            let reaction_id = reaction_col.map(|c| row[c].trim()).unwrap_or_default();
            let compound_id = compound_col.map(|c| row[c].trim()).unwrap_or_default();
            let unit = unit_col.map(|c| row[c].trim()).unwrap_or_default();
            match quantity {
                STANDARD_DG => {
                    let scale = unit_scale(table, unit, energy_scale)?;
                    self.reaction_mut(table, reaction_id)?.standard_dg_prime = Some(value * scale);
                }
                EQUILIBRIUM_CONSTANT => {
                    self.reaction_mut(table, reaction_id)?.standard_dg_prime =
                        Some(-rt * value.ln());
                }
                KCAT | "substrate catalytic rate constant" => {
                    self.reaction_mut(table, reaction_id)?.kcat = Some(value);
                }
                MICHAELIS_CONSTANT => {
                    let scale = if unit.is_empty() {
                        1e-3
                    } else {
                        unit_scale(table, unit, concentration_scale)?
                    };
                    self.reaction_mut(table, reaction_id)?
                        .km
                        .insert(compound_id.to_string(), value * scale);
                }
                PROTEIN_MASS => {
                    let scale = unit_scale(table, unit, mass_scale)?;
                    self.reaction_mut(table, reaction_id)?.enzyme_mass = Some(value * scale);
                }
                MOLECULAR_MASS => {
                    let scale = unit_scale(table, unit, mass_scale)?;
                    if let Some(compound) = self.compounds.get_mut(compound_id) {
                        compound.molecular_mass = Some(value * scale);
                    }
                }
                other => debug!(quantity = other, "ignoring parameter"),
            }
        }
        Ok(())
    }

    fn read_enzyme_concentrations(&mut self, table: &SbtabTable) -> Result<(), PathwayError> {
        let scale = table_scale(table, "mM", concentration_scale)?;
        let reaction_col = require_column(table, "Reaction")?;
        let value_col = require_column(table, "Value")?;
        for (row_index, row) in table.rows().iter().enumerate() {
            let value = parse_number(table, row_index, &row[value_col])?;
            self.reaction_mut(table, &row[reaction_col])?.measured_enzyme = Some(value * scale);
        }
        Ok(())
    }

    fn reaction_mut(
        &mut self,
        table: &SbtabTable,
        reaction_id: &str,
    ) -> Result<&mut Reaction, PathwayError> {
        self.reactions
            .get_mut(reaction_id.trim())
            .ok_or_else(|| PathwayError::UnknownReaction {
                table: table.id().to_string(),
                reaction: reaction_id.trim().to_string(),
            })
    }
    // endregion Table Readers
}

/// Conversion factor for the table's Unit attribute
fn table_scale(
    table: &SbtabTable,
    default_unit: &str,
    scale: fn(&str) -> Option<f64>,
) -> Result<f64, PathwayError> {
    let unit = table.attribute("Unit").unwrap_or(default_unit);
    unit_scale(table, unit, scale)
}

/// Conversion factor for a unit named in `table`, unknown units are an error
fn unit_scale(
    table: &SbtabTable,
    unit: &str,
    scale: fn(&str) -> Option<f64>,
) -> Result<f64, PathwayError> {
    scale(unit).ok_or_else(|| PathwayError::UnknownUnit {
        table: table.id().to_string(),
        unit: unit.to_string(),
    })
}

fn require_column(table: &SbtabTable, column: &str) -> Result<usize, PathwayError> {
    table
        .column_index(column)
        .ok_or_else(|| PathwayError::MissingColumn {
            table: table.id().to_string(),
            column: column.to_string(),
        })
}

fn parse_number(table: &SbtabTable, row: usize, value: &str) -> Result<f64, PathwayError> {
    value
        .trim()
        .parse()
        .map_err(|_| PathwayError::InvalidNumber {
            table: table.id().to_string(),
            row: row + 1,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::ComponentContribution;
    use approx::assert_abs_diff_eq;
    use std::path::PathBuf;

    fn test_data(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join(name)
    }

    #[test]
    fn read_network() {
        let doc = SbtabDocument::read(test_data("network.tsv")).unwrap();
        let pathway = Pathway::from_sbtab(&doc).unwrap();
        assert_eq!(pathway.reactions.len(), 4);
        assert_eq!(pathway.compounds.len(), 12);
        let (_, first) = pathway.reactions.first().unwrap();
        assert_eq!(first.id, "GAPDH");
        assert!(first.standard_dg_prime.is_none());
        // Flux of 1 mM/s
        assert!((first.flux - 1e-3).abs() < 1e-15);
        // Water is fixed at 1 M
        let water = &pathway.compounds["h2o"];
        assert!(water.is_fixed());
        assert!((water.upper_bound - 1.0).abs() < 1e-15);
        // Bounds are converted from mM
        let nad = &pathway.compounds["nad"];
        assert!((nad.lower_bound - 1e-3).abs() < 1e-15);
        assert!((nad.upper_bound - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn network_to_mdf_pathway() {
        let pathway = Pathway::from_network_sbtab(
            test_data("network.tsv"),
            &ComponentContribution::default(),
            Algorithm::Mdf,
        )
        .unwrap();
        assert_eq!(pathway.config.algorithm().unwrap(), Algorithm::Mdf);
        for reaction in pathway.reactions.values() {
            assert!(reaction.standard_dg_prime.is_some());
            assert!(reaction.kcat.is_none());
        }
        let network = SbtabDocument::read(test_data("network.tsv")).unwrap();
        let written = pathway.to_sbtab();
        for table in ["Compound", "Reaction"] {
            let mut expected = network.require_table(table).unwrap().column_values("ID").unwrap();
            let mut actual = written.require_table(table).unwrap().column_values("ID").unwrap();
            expected.sort_unstable();
            actual.sort_unstable();
            assert_eq!(actual, expected);
        }
        // GAP + Pi + NAD+ <=> BPG + NADH has a standard Gibbs energy of about +6.3 kJ/mol
        let gapdh = pathway.reactions["GAPDH"].standard_dg_prime.unwrap();
        assert!((gapdh - 6.3).abs() < 1e-6);
    }

    #[test]
    fn network_to_ecm_pathway() {
        let pathway = Pathway::from_network_sbtab(
            test_data("network.tsv"),
            &ComponentContribution::default(),
            Algorithm::Ecm,
        )
        .unwrap();
        assert_eq!(pathway.config.algorithm().unwrap(), Algorithm::Ecm);
        for reaction in pathway.reactions.values() {
            assert!(reaction.kcat.is_some());
            assert!(reaction.enzyme_mass.is_some());
            assert!(!reaction.km.is_empty());
        }
    }

    #[test]
    fn pathway_round_trip() {
        let pathway = Pathway::from_network_sbtab(
            test_data("network.tsv"),
            &ComponentContribution::default(),
            Algorithm::Ecm,
        )
        .unwrap();
        let text = pathway.to_sbtab().to_sbtab_string();
        let doc = SbtabDocument::from_str("pathway", &text, "pathway.tsv").unwrap();
        let reread = Pathway::from_sbtab(&doc).unwrap();
        assert_eq!(reread.reactions.len(), pathway.reactions.len());
        assert_eq!(reread.compounds.len(), pathway.compounds.len());
        for (id, reaction) in &pathway.reactions {
            let other = &reread.reactions[id];
            assert_eq!(other.stoichiometry, reaction.stoichiometry);
            assert!((other.flux - reaction.flux).abs() < 1e-12);
            assert!(
                (other.standard_dg_prime.unwrap() - reaction.standard_dg_prime.unwrap()).abs()
                    < 1e-6
            );
            assert_eq!(other.kcat, reaction.kcat);
            assert_eq!(other.km.len(), reaction.km.len());
        }
        assert_eq!(reread.config.algorithm_name(), "ECM");
    }

    #[test]
    fn read_errors() {
        let missing_compound = "!!SBtab TableID='Compound' TableType='Compound'
!ID\t!Identifiers
A\tKEGG:C00031
!!SBtab TableID='Reaction' TableType='Reaction'
!ID\t!ReactionFormula
R1\tA <=> B
";
        let doc = SbtabDocument::from_str("x", missing_compound, "x.tsv").unwrap();
        assert!(matches!(
            Pathway::from_sbtab(&doc),
            Err(PathwayError::UnknownCompound { .. })
        ));

        let bad_flux = "!!SBtab TableID='Compound' TableType='Compound'
!ID\t!Identifiers
A\tKEGG:C00031
!!SBtab TableID='Reaction' TableType='Reaction'
!ID\t!ReactionFormula
R1\tA <=> A + A
!!SBtab TableID='Flux' TableType='Quantity' Unit='mM/s'
!QuantityType\t!Reaction\t!Value
rate of reaction\tR1\tfast
";
        let doc = SbtabDocument::from_str("x", bad_flux, "x.tsv").unwrap();
        match Pathway::from_sbtab(&doc) {
            Err(PathwayError::InvalidNumber { table, row, value }) => {
                assert_eq!(table, "Flux");
                assert_eq!(row, 1);
                assert_eq!(value, "fast");
            }
            _ => panic!("Invalid flux not caught"),
        }

        let parameters = |unit: &str| {
            format!(
                "!!SBtab TableID='Compound' TableType='Compound'
!ID\t!Identifiers
A\tKEGG:C00031
B\tKEGG:C00092
!!SBtab TableID='Reaction' TableType='Reaction'
!ID\t!ReactionFormula
R1\tA <=> B
!!SBtab TableID='Parameter' TableType='Quantity'
!QuantityType\t!Reaction\t!Compound\t!Value\t!Unit
standard Gibbs energy of reaction\tR1\t\t1.5\t{unit}
protein molecular mass\tR1\t\t40\tkDa
"
            )
        };
        let doc = SbtabDocument::from_str("x", &parameters("kcal/mol"), "x.tsv").unwrap();
        let pathway = Pathway::from_sbtab(&doc).unwrap();
        let reaction = &pathway.reactions["R1"];
        assert_abs_diff_eq!(reaction.standard_dg_prime.unwrap(), 6.276, epsilon = 1e-12);
        assert_abs_diff_eq!(reaction.enzyme_mass.unwrap(), 40_000.0, epsilon = 1e-9);

        let doc = SbtabDocument::from_str("x", &parameters("eV"), "x.tsv").unwrap();
        match Pathway::from_sbtab(&doc) {
            Err(PathwayError::UnknownUnit { table, unit }) => {
                assert_eq!(table, "Parameter");
                assert_eq!(unit, "eV");
            }
            _ => panic!("Unknown energy unit not caught"),
        }

        let no_reactions = "!!SBtab TableID='Compound' TableType='Compound'
!ID\t!Identifiers
A\tKEGG:C00031
";
        let doc = SbtabDocument::from_str("x", no_reactions, "x.tsv").unwrap();
        assert!(matches!(
            Pathway::from_sbtab(&doc),
            Err(PathwayError::Sbtab(_))
        ));
    }
}
