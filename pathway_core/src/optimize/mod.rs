//! Module for constructing and solving linear optimization problems

pub mod constraint;
pub mod objective;
pub mod problem;
pub mod solvers;
pub mod variable;

use indexmap::IndexMap;

/// Struct representing the solution to an optimization problem
///
/// Dual values follow the minimization convention: a positive dual means raising the upper
/// bound of the constraint (or variable) would lower the minimized objective.
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemSolution {
    /// The status of the optimization problem, representing if the optimization was
    /// completed successfully
    pub status: OptimizationStatus,
    /// Optimized value of the objective
    ///
    /// Some(f64) if the optimization was completed successfully, None otherwise
    pub objective_value: Option<f64>,
    /// Values of the variables at the optimum,
    ///
    /// Some(IndexMap), keyed by variable id, with values corresponding to variable
    /// values at optimum if the problem could be solved, None otherwise
    pub variable_values: Option<IndexMap<String, f64>>,
    /// Values of the dual variables at the optimum
    ///
    /// Some(IndexMap), keyed by constraint id, upper bound dual minus lower bound dual
    pub dual_values: Option<IndexMap<String, f64>>,
    /// Duals of the variable bounds, keyed by variable id, upper bound dual minus lower
    /// bound dual
    pub reduced_costs: Option<IndexMap<String, f64>>,
}

impl ProblemSolution {
    /// Solution for a problem which could not be solved
    pub fn failed(status: OptimizationStatus) -> Self {
        ProblemSolution {
            status,
            objective_value: None,
            variable_values: None,
            dual_values: None,
            reduced_costs: None,
        }
    }
}

/// Status of an optimization problem
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum OptimizationStatus {
    /// Problem has not yet attempted to be optimized
    Unoptimized,
    /// Problem has been optimized
    Optimal,
    /// Problem can't be optimized because objective value is not bounded
    Unbounded,
    /// Problem can't be solved because it is infeasible (conflicting constraints)
    Infeasible,
    /// An approximate solution has been found
    AlmostOptimal,
    /// A numerical error occurred during solving
    NumericalError,
    /// The solver hit the maximum allowed iterations, or max time, or made insufficient progress
    SolverHalted,
}

impl OptimizationStatus {
    /// Whether the status carries a usable solution
    pub fn has_solution(&self) -> bool {
        matches!(
            self,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        )
    }
}
