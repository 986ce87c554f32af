//! Solver interfaces for optimization problems
pub mod clarabel;

use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::ProblemSolution;

/// A solver for linear programs
pub trait LinearSolver {
    /// Solve the problem, an infeasible or unbounded problem is reported through the
    /// solution status rather than as an error
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, ProblemError>;
}
