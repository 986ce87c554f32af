//! Provides struct representing an optimization problem
use indexmap::IndexMap;
use thiserror::Error;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::solvers::LinearSolver;
use crate::optimize::variable::Variable;
use crate::optimize::ProblemSolution;

/// A linear optimization problem
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }
    // endregion Creation Functions

    // region Adding Variables
    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id));
        }
        if variable.lower_bound > variable.upper_bound || variable.lower_bound.is_nan() {
            return Err(ProblemError::InvalidVariableBounds(variable.id));
        }
        variable.index = self.variables.len();
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        self.add_variable(Variable {
            id: id.to_string(),
            name: name.map(|n| n.to_string()),
            lower_bound,
            upper_bound,
            index: 0,
        })
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints
            .insert(constraint.id().to_string(), constraint);
        Ok(())
    }

    /// Create a new equality constraint and add it to the model
    pub fn add_new_equality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::new_equality(id, variables, coefficients, equals))
    }

    /// Create a new inequality constraint and add it to the model
    pub fn add_new_inequality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::new_inequality(
            id,
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        ))
    }
    // endregion Adding Constraints

    // region Objective
    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if !self.variables.contains_key(variable_id) {
            return Err(ProblemError::NonExistentVariablesInObjective(
                variable_id.to_string(),
            ));
        }
        self.objective
            .add_term(ObjectiveTerm::new(variable_id, coefficient));
        Ok(())
    }
    // endregion Objective

    // region Accessors
    /// Variables in the order they were added
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Constraints in the order they were added
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    /// Objective of the problem
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Number of variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Position of a variable in the variable vector
    pub fn variable_index(&self, id: &str) -> Option<usize> {
        self.variables.get_index_of(id)
    }
    // endregion Accessors

    /// Solve the problem with the given solver
    pub fn solve<S: LinearSolver + ?Sized>(
        &self,
        solver: &S,
    ) -> Result<ProblemSolution, ProblemError> {
        solver.solve(self)
    }

    // region Validation Functions
    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        if self.constraints.contains_key(constraint.id()) {
            return Err(ProblemError::ConstraintAlreadyExists(
                constraint.id().to_string(),
            ));
        }
        if let Constraint::Inequality {
            lower_bound,
            upper_bound,
            ..
        } = constraint
        {
            if lower_bound > upper_bound {
                return Err(ProblemError::InvalidConstraintBounds(
                    constraint.id().to_string(),
                ));
            }
        }
        for term in constraint.terms() {
            if !self.variables.contains_key(&term.variable) {
                return Err(ProblemError::NonExistentVariablesInConstraint {
                    constraint: constraint.id().to_string(),
                    variable: term.variable.clone(),
                });
            }
        }
        Ok(())
    }
    // endregion Validation Functions
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add variable {0}, but a variable with that id already exists")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Variable {0} has lower_bound > upper_bound")]
    InvalidVariableBounds(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add constraint {0}, but a constraint with that id already exists")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Inequality constraint {0} has lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Constraint {constraint} uses variable {variable}, which is not in the problem")]
    NonExistentVariablesInConstraint { constraint: String, variable: String },
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Objective term uses variable {0}, which is not in the problem")]
    NonExistentVariablesInObjective(String),
    /// The solver could not be set up
    #[error("Solver setup failed: {0}")]
    SolverSetup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_variables_and_constraints() {
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", None, 0.0, 10.0).unwrap();
        problem.add_new_variable("y", Some("y var"), 0.0, 5.0).unwrap();
        assert_eq!(problem.num_variables(), 2);
        assert_eq!(problem.variable_index("y"), Some(1));
        assert_eq!(
            problem.add_new_variable("x", None, 0.0, 1.0),
            Err(ProblemError::VariableIdAlreadyExists("x".to_string()))
        );
        assert_eq!(
            problem.add_new_variable("z", None, 2.0, 1.0),
            Err(ProblemError::InvalidVariableBounds("z".to_string()))
        );

        problem
            .add_new_inequality_constraint("c1", &["x", "y"], &[1.0, 1.0], f64::NEG_INFINITY, 8.0)
            .unwrap();
        assert!(matches!(
            problem.add_new_equality_constraint("c2", &["x", "w"], &[1.0, 1.0], 1.0),
            Err(ProblemError::NonExistentVariablesInConstraint { .. })
        ));
        assert!(matches!(
            problem.add_new_equality_constraint("c1", &["x"], &[1.0], 1.0),
            Err(ProblemError::ConstraintAlreadyExists(_))
        ));
        assert_eq!(problem.num_constraints(), 1);

        problem.add_new_linear_objective_term("x", 1.0).unwrap();
        assert!(problem.add_new_linear_objective_term("w", 1.0).is_err());
        assert_eq!(problem.objective().terms().len(), 1);
    }
}
