//! Pathway configuration read from the `Configuration` table of a pathway SBtab, along with
//! the physical constants and defaults shared by the analyses
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use indexmap::IndexMap;
use thiserror::Error;

use crate::io::sbtab::SbtabTable;

/// Gas constant in kJ/(mol*K)
pub const R: f64 = 8.314_462_618e-3;

/// Default lower bound on compound concentrations (M)
pub const DEFAULT_LOWER_BOUND: f64 = 1e-6;
/// Default upper bound on compound concentrations (M)
pub const DEFAULT_UPPER_BOUND: f64 = 1e-2;

/// Default catalytic rate constant written for ECM pathways (1/s)
pub const DEFAULT_KCAT: f64 = 200.0;
/// Default Michaelis constant written for ECM pathways (mM)
pub const DEFAULT_KM_MILLIMOLAR: f64 = 0.2;
/// Default enzyme molecular mass written for ECM pathways (Da)
pub const DEFAULT_PROTEIN_MASS: f64 = 40_000.0;

/// pH at which the bundled formation energies are tabulated
pub const REFERENCE_P_H: f64 = 7.0;
/// Ionic strength (M) at which the bundled formation energies are tabulated
pub const REFERENCE_IONIC_STRENGTH: f64 = 0.25;

/// Analysis to run on a pathway
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Max-min Driving Force
    #[default]
    Mdf,
    /// Enzyme Cost Minimization
    Ecm,
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    /// Parse the algorithm name, matching is case-sensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MDF" => Ok(Algorithm::Mdf),
            "ECM" => Ok(Algorithm::Ecm),
            other => Err(ConfigError::UnknownAlgorithm {
                value: other.to_string(),
            }),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Mdf => write!(f, "MDF"),
            Algorithm::Ecm => write!(f, "ECM"),
        }
    }
}

/// Option/value mapping taken from the `Configuration` table
///
/// Values are stored as raw strings, typed accessors parse them on demand and fall back to
/// the defaults when an option is absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathwayConfig {
    options: IndexMap<String, String>,
}

impl PathwayConfig {
    /// Create a configuration from explicit option/value pairs
    pub fn new(options: IndexMap<String, String>) -> Self {
        PathwayConfig { options }
    }

    /// Read a `Configuration` table with `!Option` and `!Value` columns
    pub fn from_table(table: &SbtabTable) -> Result<Self, ConfigError> {
        let option_col = table
            .column_index("Option")
            .ok_or(ConfigError::MissingColumn("Option"))?;
        let value_col = table
            .column_index("Value")
            .ok_or(ConfigError::MissingColumn("Value"))?;
        let mut options = IndexMap::new();
        for row in table.rows() {
            let key = row[option_col].trim();
            if key.is_empty() {
                continue;
            }
            options.insert(key.to_string(), row[value_col].trim().to_string());
        }
        Ok(PathwayConfig { options })
    }

    /// Raw value of an option
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(|v| v.as_str())
    }

    /// Set (or replace) an option
    pub fn set(&mut self, key: &str, value: &str) {
        self.options.insert(key.to_string(), value.to_string());
    }

    /// Iterate over the options in table order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Name of the requested algorithm, `"MDF"` when absent
    pub fn algorithm_name(&self) -> &str {
        self.get("algorithm").unwrap_or("MDF")
    }

    /// Requested algorithm, validated against the supported set
    pub fn algorithm(&self) -> Result<Algorithm, ConfigError> {
        self.algorithm_name().parse()
    }

    /// pH of the aqueous environment
    pub fn p_h(&self) -> Result<f64, ConfigError> {
        self.quantity("p_h", REFERENCE_P_H)
    }

    /// pMg of the aqueous environment
    pub fn p_mg(&self) -> Result<f64, ConfigError> {
        self.quantity("p_mg", 3.0)
    }

    /// Ionic strength in M
    pub fn ionic_strength(&self) -> Result<f64, ConfigError> {
        self.quantity("ionic_strength", REFERENCE_IONIC_STRENGTH)
    }

    /// Temperature in K
    pub fn temperature(&self) -> Result<f64, ConfigError> {
        self.quantity("temperature", 298.15)
    }

    /// RT in kJ/mol at the configured temperature
    pub fn rt(&self) -> Result<f64, ConfigError> {
        Ok(R * self.temperature()?)
    }

    fn quantity(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.get(key) {
            Some(raw) => parse_quantity(raw).map_err(|_| ConfigError::InvalidValue {
                option: key.to_string(),
                value: raw.to_string(),
            }),
            None => Ok(default),
        }
    }
}

/// Parse a number with an optional unit suffix, concentrations are converted to M
///
/// # Examples
/// ```rust
/// use pathway_core::configuration::parse_quantity;
/// assert!((parse_quantity("250 mM").unwrap() - 0.25).abs() < 1e-12);
/// assert_eq!(parse_quantity("298.15 K").unwrap(), 298.15);
/// ```
pub fn parse_quantity(raw: &str) -> Result<f64, std::num::ParseFloatError> {
    let mut parts = raw.split_whitespace();
    let number: f64 = parts.next().unwrap_or("").parse()?;
    let scale = match parts.next() {
        Some(unit) => concentration_scale(unit).unwrap_or(1.0),
        None => 1.0,
    };
    Ok(number * scale)
}

/// Factor converting a concentration in `unit` into M, None for non-concentration units
pub fn concentration_scale(unit: &str) -> Option<f64> {
    match unit.trim() {
        "M" | "molar" => Some(1.0),
        "mM" | "millimolar" => Some(1e-3),
        "uM" | "µM" | "micromolar" => Some(1e-6),
        "nM" | "nanomolar" => Some(1e-9),
        _ => None,
    }
}

/// Factor converting a flux in `unit` into M/s
pub fn flux_scale(unit: &str) -> Option<f64> {
    let (amount, time) = unit.trim().split_once('/')?;
    let time_scale = match time {
        "s" => 1.0,
        "min" => 1.0 / 60.0,
        "h" => 1.0 / 3600.0,
        _ => return None,
    };
    Some(concentration_scale(amount)? * time_scale)
}

/// Factor converting a molar energy in `unit` into kJ/mol, an empty unit means kJ/mol
pub fn energy_scale(unit: &str) -> Option<f64> {
    match unit.trim() {
        "" | "kJ/mol" => Some(1.0),
        "J/mol" => Some(1e-3),
        "kcal/mol" => Some(4.184),
        "cal/mol" => Some(4.184e-3),
        _ => None,
    }
}

/// Factor converting a molecular mass in `unit` into Da, an empty unit means Da
pub fn mass_scale(unit: &str) -> Option<f64> {
    match unit.trim() {
        "" | "Da" | "g/mol" => Some(1.0),
        "kDa" | "kg/mol" => Some(1e3),
        _ => None,
    }
}

/// Errors in the pathway configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The algorithm option names an analysis that is not supported
    #[error("Unknown algorithm: {value}. Please use 'MDF' or 'ECM'")]
    UnknownAlgorithm { value: String },
    /// An option could not be parsed into a number
    #[error("Invalid value '{value}' for configuration option {option}")]
    InvalidValue { option: String, value: String },
    /// The Configuration table lacks a required column
    #[error("Configuration table is missing the !{0} column")]
    MissingColumn(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_parse() {
        assert_eq!("MDF".parse::<Algorithm>().unwrap(), Algorithm::Mdf);
        assert_eq!("ECM".parse::<Algorithm>().unwrap(), Algorithm::Ecm);
        // Matching is case-sensitive
        match "mdf".parse::<Algorithm>() {
            Err(ConfigError::UnknownAlgorithm { value }) => assert_eq!(value, "mdf"),
            _ => panic!("Lower case algorithm name accepted"),
        }
    }

    #[test]
    fn unknown_algorithm_message() {
        let err = "FOO".parse::<Algorithm>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("FOO"));
        assert!(msg.contains("'MDF'"));
        assert!(msg.contains("'ECM'"));
    }

    #[test]
    fn default_algorithm() {
        let config = PathwayConfig::default();
        assert_eq!(config.algorithm_name(), "MDF");
        assert_eq!(config.algorithm().unwrap(), Algorithm::Mdf);
    }

    #[test]
    fn quantities() {
        let mut config = PathwayConfig::default();
        config.set("ionic_strength", "100 mM");
        config.set("temperature", "310 K");
        config.set("p_h", "7.5");
        assert!((config.ionic_strength().unwrap() - 0.1).abs() < 1e-12);
        assert!((config.temperature().unwrap() - 310.0).abs() < 1e-12);
        assert!((config.p_h().unwrap() - 7.5).abs() < 1e-12);
        assert!((config.p_mg().unwrap() - 3.0).abs() < 1e-12);

        config.set("p_h", "neutral");
        assert!(matches!(
            config.p_h(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn units() {
        assert_eq!(concentration_scale("mM"), Some(1e-3));
        assert_eq!(concentration_scale("furlong"), None);
        assert!((flux_scale("mM/s").unwrap() - 1e-3).abs() < 1e-15);
        assert!((flux_scale("M/min").unwrap() - 1.0 / 60.0).abs() < 1e-15);
        assert_eq!(flux_scale("mM"), None);
        assert_eq!(energy_scale(""), Some(1.0));
        assert_eq!(energy_scale("J/mol"), Some(1e-3));
        assert!((energy_scale("kcal/mol").unwrap() - 4.184).abs() < 1e-15);
        assert_eq!(energy_scale("eV"), None);
        assert_eq!(mass_scale("kDa"), Some(1e3));
        assert_eq!(mass_scale("g/mol"), Some(1.0));
        assert_eq!(mass_scale("lb"), None);
    }
}
