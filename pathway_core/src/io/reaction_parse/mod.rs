//! Module for parsing reaction formula strings into stoichiometries, and for writing them back

use crate::io::reaction_parse::lexer::LexerError;
use crate::io::reaction_parse::parser::ParseError;
use indexmap::IndexMap;
use thiserror::Error;

mod lexer;
pub mod parser;
mod token;

/// Parse a reaction formula into a map of compound id to stoichiometric coefficient
///
/// # Parameters
/// - `input`: &str with the reaction formula, terms separated by whitespace
///
/// # Returns
/// Parse result which is
/// - `Ok`: The stoichiometry, in order of first appearance, with substrates negative
/// - `Err`: The ReactionParseError describing the issue with the formula
///
/// # Examples
/// ```rust
/// use pathway_core::io::reaction_parse::parse_formula;
/// let stoich = parse_formula("C00002 + C00031 <=> C00008 + C00092").unwrap();
/// assert_eq!(stoich["C00031"], -1.0);
/// assert_eq!(stoich["C00092"], 1.0);
/// ```
pub fn parse_formula(input: &str) -> Result<IndexMap<String, f64>, ReactionParseError> {
    let tokens = lexer::Lexer::new(input).lex()?;
    let mut parser = parser::FormulaParser::new(tokens);
    Ok(parser.parse()?)
}

/// Write a stoichiometry as a reaction formula, e.g. `A + 2 B <=> C`
///
/// Coefficients with magnitude below 1e-9 are skipped, unit coefficients are omitted.
pub fn format_formula<'a, I>(stoichiometry: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a f64)>,
{
    let mut substrates = Vec::new();
    let mut products = Vec::new();
    for (compound, &coefficient) in stoichiometry {
        if coefficient.abs() < 1e-9 {
            continue;
        }
        let term = match format_coefficient(coefficient.abs()) {
            Some(c) => format!("{} {}", c, compound),
            None => compound.clone(),
        };
        if coefficient < 0.0 {
            substrates.push(term);
        } else {
            products.push(term);
        }
    }
    format!("{} <=> {}", substrates.join(" + "), products.join(" + "))
        .trim()
        .to_string()
}

/// Text for a positive coefficient, None when it is 1
fn format_coefficient(coefficient: f64) -> Option<String> {
    if (coefficient - 1.0).abs() < 1e-9 {
        return None;
    }
    if (coefficient - coefficient.round()).abs() < 1e-9 {
        return Some(format!("{}", coefficient.round() as i64));
    }
    let text = format!("{:.3}", coefficient);
    Some(text.trim_end_matches('0').trim_end_matches('.').to_string())
}

/// Enum representing possible lex and parse errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ReactionParseError {
    /// Lexing Error
    #[error("Error occurred during lexing of reaction formula: {0}")]
    LexingError(#[from] LexerError),
    /// Parsing Error
    #[error("Error occurred during parsing of reaction formula: {0}")]
    ParsingError(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formula() {
        let stoich = parse_formula("2 A + B <=> 3 C + A").unwrap();
        // A appears on both sides and is summed
        assert_eq!(stoich.get("A"), Some(&-1.0));
        assert_eq!(stoich.get("B"), Some(&-1.0));
        assert_eq!(stoich.get("C"), Some(&3.0));
        let order: Vec<&String> = stoich.keys().collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_cancelling_compound() {
        let stoich = parse_formula("ATP + A <=> ATP + B").unwrap();
        assert!(!stoich.contains_key("ATP"));
        assert_eq!(stoich.len(), 2);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_formula("A + B"),
            Err(ReactionParseError::ParsingError(ParseError::MissingToken(_)))
        ));
        assert!(matches!(
            parse_formula(" <=> B"),
            Err(ReactionParseError::ParsingError(ParseError::EmptySide))
        ));
        assert!(matches!(
            parse_formula("A <=> "),
            Err(ReactionParseError::ParsingError(ParseError::EmptySide))
        ));
        assert!(matches!(
            parse_formula("0 A <=> B"),
            Err(ReactionParseError::ParsingError(
                ParseError::InvalidCoefficient(_)
            ))
        ));
    }

    #[test]
    fn test_format_formula() {
        let mut stoich = IndexMap::new();
        stoich.insert("A".to_string(), -1.0);
        stoich.insert("B".to_string(), -2.0);
        stoich.insert("C".to_string(), 0.5);
        stoich.insert("D".to_string(), 1e-12);
        assert_eq!(format_formula(&stoich), "A + 2 B <=> 0.5 C");
    }

    #[test]
    fn test_format_then_parse() {
        let stoich = parse_formula("C00002 + C00031 <=> C00008 + 1.5 C00092").unwrap();
        let text = format_formula(&stoich);
        assert_eq!(text, "C00002 + C00031 <=> C00008 + 1.5 C00092");
    }
}
