//! Lex a reaction formula string into a series of tokens for later parsing
//!
//! Terms are separated by whitespace, so identifiers may themselves contain characters such
//! as `+`, `-` or digits (e.g. `NAD+` or `13BPG`).

use std::collections::VecDeque;

use thiserror::Error;

use crate::io::reaction_parse::token::Token;

const ARROWS: [&str; 6] = ["<=>", "<->", "=>", "<=", "->", "="];

pub struct Lexer {
    source: Vec<char>,
    tokens: VecDeque<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: VecDeque::new(),
            start: 0,
            current: 0,
        }
    }

    /// Convert the source into tokens, always terminated by [`Token::Eof`]
    pub fn lex(mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.tokens.push_back(Token::Eof);
        Ok(self.tokens.into())
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c = self.advance();
        match c {
            // Whitespace
            ' ' | '\r' | '\n' | '\t' => {}
            c if c.is_control() => return Err(LexerError::InvalidCharacter(c)),
            _ => self.read_word(),
        };
        Ok(())
    }

    fn read_word(&mut self) {
        while !self.is_at_end() && !self.peek().is_whitespace() {
            self.advance();
        }
        let word: String = self.source[self.start..self.current].iter().collect();
        let token = if word == "+" {
            Token::Plus
        } else if ARROWS.contains(&word.as_str()) {
            Token::Arrow
        } else if let Some(number) = Lexer::as_number(&word) {
            Token::Number(number)
        } else {
            Token::Identifier(word)
        };
        self.tokens.push_back(token);
    }

    /// Words made only of digits and a decimal point are coefficients
    fn as_number(word: &str) -> Option<f64> {
        if !word.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }
        word.parse().ok()
    }

    fn advance(&mut self) -> char {
        let char_at_current = self.source[self.current];
        self.current += 1;
        char_at_current
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            return '\0';
        }
        self.source[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum LexerError {
    #[error("invalid character {0:?} in reaction formula")]
    InvalidCharacter(char),
}
