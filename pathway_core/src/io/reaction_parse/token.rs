//! Module providing Token struct for lexing

/// Represents Tokens in a reaction formula
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    /// A compound identifier
    Identifier(String),
    /// A stoichiometric coefficient
    Number(f64),
    /// Separator between the terms of one side
    Plus,
    /// Separator between the substrate and product sides
    Arrow,
    Eof,
}
