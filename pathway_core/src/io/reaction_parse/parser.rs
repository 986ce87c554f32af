use crate::io::reaction_parse::token::Token;

use indexmap::IndexMap;
use thiserror::Error;
/*
Reaction Formula Grammar:
formula -> side ARROW side EOF ;
side -> term ( "+" term )* ;
term -> NUMBER? IDENTIFIER ;

e.g. 2 C00002 + C00031 <=> C00008 + C00092
 */

/// Reaction formula parser
pub struct FormulaParser {
    /// Vector of tokens from the formula string
    tokens: Vec<Token>,
    /// Current token being processed
    current: usize,
}

impl FormulaParser {
    /// Create a new FormulaParser
    pub fn new(tokens: Vec<Token>) -> FormulaParser {
        FormulaParser { tokens, current: 0 }
    }

    // region Parsing Functions

    /// Parse the token vector into a stoichiometry map, substrates carry negative coefficients
    pub fn parse(&mut self) -> Result<IndexMap<String, f64>, ParseError> {
        let mut stoichiometry = IndexMap::new();
        for (compound, coefficient) in self.side()? {
            *stoichiometry.entry(compound).or_insert(0.0) -= coefficient;
        }
        self.consume(Token::Arrow, "Expect '<=>' between substrates and products.")?;
        for (compound, coefficient) in self.side()? {
            *stoichiometry.entry(compound).or_insert(0.0) += coefficient;
        }
        if !self.is_at_end() {
            // If entire formula has not been parsed, an error has occurred
            return Err(ParseError::EarlyTermination);
        }
        // Compounds appearing equally on both sides cancel out
        stoichiometry.retain(|_, coefficient| *coefficient != 0.0);
        Ok(stoichiometry)
    }

    fn side(&mut self) -> Result<Vec<(String, f64)>, ParseError> {
        if self.check(&Token::Arrow) || self.is_at_end() {
            return Err(ParseError::EmptySide);
        }
        let mut terms = vec![self.term()?];
        while self.match_token(&Token::Plus) {
            terms.push(self.term()?);
        }
        Ok(terms)
    }

    fn term(&mut self) -> Result<(String, f64), ParseError> {
        let coefficient = match self.peek() {
            Token::Number(value) => {
                self.advance();
                if value <= 0.0 {
                    return Err(ParseError::InvalidCoefficient(value));
                }
                value
            }
            _ => 1.0,
        };
        match self.peek() {
            Token::Identifier(id) => {
                self.advance();
                Ok((id, coefficient))
            }
            _ => Err(ParseError::ExpectedCompound),
        }
    }

    // endregion Parsing Functions

    // region parsing helper functions

    /// Check whether the token at the current position matches `token`, if it does advance
    /// [`self.current`] and return true, otherwise return false
    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            return true;
        }
        false
    }

    /// Check whether the current token matches the provided `token`
    fn check(&self, token: &Token) -> bool {
        if self.is_at_end() {
            return false;
        }
        &self.peek() == token
    }

    /// Advance `self.current` one position unless at the end of the token Vec, then return the
    /// previous token.
    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    /// Check whether the parser is at the end of the source Vec
    fn is_at_end(&self) -> bool {
        self.peek() == Token::Eof
    }

    /// Get a copy of the current token
    fn peek(&self) -> Token {
        self.tokens[self.current].clone()
    }

    /// Get a copy of the previous token
    fn previous(&self) -> Token {
        self.tokens[self.current - 1].clone()
    }

    /// Check whether the current token matches an input token, if it matches advance to the
    /// next token, and if it doesn't return an error.
    fn consume(&mut self, token: Token, msg: &str) -> Result<Token, ParseError> {
        if self.check(&token) {
            return Ok(self.advance());
        }

        Err(ParseError::MissingToken(msg.to_string()))
    }

    // endregion parsing helper functions
}

/// Enum representing possible parse errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    /// A side of the reaction has no compounds
    #[error("Reaction side has no compounds")]
    EmptySide,
    /// A coefficient was not followed by a compound, or a '+' was dangling
    #[error("Expected a compound identifier")]
    ExpectedCompound,
    /// Coefficients must be positive
    #[error("Invalid stoichiometric coefficient {0}")]
    InvalidCoefficient(f64),
    /// Expected token was missing
    #[error("{0}")]
    MissingToken(String),
    /// Tokens remained after the product side was parsed
    #[error("Unexpected tokens after the product side")]
    EarlyTermination,
}
