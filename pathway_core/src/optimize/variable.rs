//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// A continuous variable of a linear program
///
/// Infinite bounds leave the variable unbounded on that side.
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Variable {
    /// Used to identify the variable (must be unique within a problem)
    #[builder(setter(into))]
    pub id: String,
    /// Human readable name of the variable
    #[builder(setter(into, strip_option), default = "None")]
    pub name: Option<String>,
    /// Lowest value the variable can take
    #[builder(default = "f64::NEG_INFINITY")]
    pub lower_bound: f64,
    /// Highest value the variable can take
    #[builder(default = "f64::INFINITY")]
    pub upper_bound: f64,
    /// Position of the variable in the problem, set when it is added
    #[builder(default = "0")]
    pub(crate) index: usize,
}

impl Variable {
    /// Position of the variable in the problem's variable vector
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the bounds pin the variable to a single value
    pub fn is_fixed(&self) -> bool {
        self.lower_bound == self.upper_bound
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <= {} <= {}", self.lower_bound, name, self.upper_bound),
            None => write!(f, "{} <= {} <= {}", self.lower_bound, self.id, self.upper_bound),
        }
    }
}
