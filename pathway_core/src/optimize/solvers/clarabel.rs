//! Implements a solver interface for Clarabel
//!
//! Problems are written in Clarabel's conic form `min qᵀx s.t. Ax + s = b`, with equality
//! rows in a zero cone followed by inequality rows in a nonnegative cone. Every finite bound
//! of a constraint or variable becomes one row.
use clarabel::algebra::CscMatrix as ClarabelCscMatrix;
use clarabel::solver::*;
use indexmap::IndexMap;
use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csc::CscMatrix;
use tracing::debug;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::LinearSolver;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Interior point LP solver backed by Clarabel
#[derive(Clone, Debug)]
pub struct ClarabelSolver {
    /// Maximum number of interior point iterations
    pub max_iter: u32,
    /// Print the solver log
    pub verbose: bool,
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        ClarabelSolver {
            max_iter: 200,
            verbose: false,
        }
    }
}

/// What a row of the constraint matrix stands for, used to map duals back
#[derive(Clone, Copy, Debug)]
enum RowOrigin {
    /// Upper bound (or equality) of the constraint at this index
    ConstraintUpper(usize),
    /// Lower bound of the constraint at this index
    ConstraintLower(usize),
    /// Upper bound (or fixed value) of the variable at this index
    VariableUpper(usize),
    /// Lower bound of the variable at this index
    VariableLower(usize),
}

struct Row {
    entries: Vec<(usize, f64)>,
    rhs: f64,
    origin: RowOrigin,
}

/// Rows of the conic problem, split by cone
#[derive(Default)]
struct ConicRows {
    equalities: Vec<Row>,
    inequalities: Vec<Row>,
}

impl ConicRows {
    fn from_problem(problem: &Problem) -> ConicRows {
        let mut rows = ConicRows::default();
        for (index, constraint) in problem.constraints().enumerate() {
            let entries: Vec<(usize, f64)> = constraint
                .terms()
                .iter()
                .filter_map(|t| Some((problem.variable_index(&t.variable)?, t.coefficient)))
                .collect();
            match constraint {
                Constraint::Equality { equals, .. } => rows.equalities.push(Row {
                    entries,
                    rhs: *equals,
                    origin: RowOrigin::ConstraintUpper(index),
                }),
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => rows.push_bounds(
                    entries,
                    *lower_bound,
                    *upper_bound,
                    RowOrigin::ConstraintLower(index),
                    RowOrigin::ConstraintUpper(index),
                ),
            }
        }
        for variable in problem.variables() {
            let index = variable.index();
            rows.push_bounds(
                vec![(index, 1.0)],
                variable.lower_bound,
                variable.upper_bound,
                RowOrigin::VariableLower(index),
                RowOrigin::VariableUpper(index),
            );
        }
        rows
    }

    /// Add the rows for `lower <= a·x <= upper`, a single equality row when both are equal
    fn push_bounds(
        &mut self,
        entries: Vec<(usize, f64)>,
        lower: f64,
        upper: f64,
        lower_origin: RowOrigin,
        upper_origin: RowOrigin,
    ) {
        if lower == upper {
            self.equalities.push(Row {
                entries,
                rhs: upper,
                origin: upper_origin,
            });
            return;
        }
        if lower.is_finite() {
            self.inequalities.push(Row {
                entries: entries.iter().map(|(i, c)| (*i, -c)).collect(),
                rhs: -lower,
                origin: lower_origin,
            });
        }
        if upper.is_finite() {
            self.inequalities.push(Row {
                entries,
                rhs: upper,
                origin: upper_origin,
            });
        }
    }

    fn rows(&self) -> impl Iterator<Item = &Row> {
        self.equalities.iter().chain(self.inequalities.iter())
    }

    fn len(&self) -> usize {
        self.equalities.len() + self.inequalities.len()
    }

    /// Sparse constraint matrix in Clarabel's compressed column format
    fn matrix(&self, num_variables: usize) -> ClarabelCscMatrix<f64> {
        let mut coo = CooMatrix::new(self.len(), num_variables);
        for (i, row) in self.rows().enumerate() {
            for &(j, value) in &row.entries {
                coo.push(i, j, value);
            }
        }
        let csc = CscMatrix::from(&coo);
        ClarabelCscMatrix::new(
            self.len(),
            num_variables,
            csc.col_offsets().to_vec(),
            csc.row_indices().to_vec(),
            csc.values().to_vec(),
        )
    }
}

impl LinearSolver for ClarabelSolver {
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, ProblemError> {
        let n = problem.num_variables();
        let sense = match problem.objective().sense() {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        };
        let mut q = vec![0.0; n];
        for term in problem.objective().terms() {
            if let Some(j) = problem.variable_index(&term.variable) {
                q[j] += sense * term.coefficient;
            }
        }
        let rows = ConicRows::from_problem(problem);
        let a = rows.matrix(n);
        let b: Vec<f64> = rows.rows().map(|r| r.rhs).collect();
        let p = ClarabelCscMatrix::new(n, n, vec![0; n + 1], vec![], vec![]);
        let mut cones = Vec::new();
        if !rows.equalities.is_empty() {
            cones.push(ZeroConeT(rows.equalities.len()));
        }
        if !rows.inequalities.is_empty() {
            cones.push(NonnegativeConeT(rows.inequalities.len()));
        }
        debug!(
            variables = n,
            equalities = rows.equalities.len(),
            inequalities = rows.inequalities.len(),
            "solving linear program"
        );

        let settings = DefaultSettingsBuilder::default()
            .verbose(self.verbose)
            .max_iter(self.max_iter)
            .build()
            .map_err(|e| ProblemError::SolverSetup(e.to_string()))?;
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = match solver.solution.status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::NumericalError => OptimizationStatus::NumericalError,
            SolverStatus::Unsolved => OptimizationStatus::Unoptimized,
            _ => OptimizationStatus::SolverHalted,
        };
        if !status.has_solution() {
            return Ok(ProblemSolution::failed(status));
        }

        let x = &solver.solution.x;
        let z = &solver.solution.z;
        let variable_values: IndexMap<String, f64> = problem
            .variables()
            .map(|v| (v.id.clone(), x[v.index()]))
            .collect();
        let mut dual_values: IndexMap<String, f64> =
            problem.constraints().map(|c| (c.id().to_string(), 0.0)).collect();
        let mut reduced_costs: IndexMap<String, f64> =
            problem.variables().map(|v| (v.id.clone(), 0.0)).collect();
        for (row, dual) in rows.rows().zip(z.iter()) {
            match row.origin {
                RowOrigin::ConstraintUpper(i) => dual_values[i] += dual,
                RowOrigin::ConstraintLower(i) => dual_values[i] -= dual,
                RowOrigin::VariableUpper(i) => reduced_costs[i] += dual,
                RowOrigin::VariableLower(i) => reduced_costs[i] -= dual,
            }
        }
        Ok(ProblemSolution {
            status,
            objective_value: Some(sense * solver.solution.obj_val),
            variable_values: Some(variable_values),
            dual_values: Some(dual_values),
            reduced_costs: Some(reduced_costs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn small_lp() {
        // max x + 2y s.t. x + y <= 4, 0 <= x <= 3, 0 <= y <= 3
        let mut problem = Problem::new_maximization();
        problem.add_new_variable("x", None, 0.0, 3.0).unwrap();
        problem.add_new_variable("y", None, 0.0, 3.0).unwrap();
        problem
            .add_new_inequality_constraint("c", &["x", "y"], &[1.0, 1.0], f64::NEG_INFINITY, 4.0)
            .unwrap();
        problem.add_new_linear_objective_term("x", 1.0).unwrap();
        problem.add_new_linear_objective_term("y", 2.0).unwrap();
        let solution = problem.solve(&ClarabelSolver::default()).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert_abs_diff_eq!(solution.objective_value.unwrap(), 7.0, epsilon = 1e-5);
        let values = solution.variable_values.unwrap();
        assert_abs_diff_eq!(values["x"], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(values["y"], 3.0, epsilon = 1e-5);
        // Raising the right hand side of c by one raises the objective by one
        assert_abs_diff_eq!(solution.dual_values.unwrap()["c"], 1.0, epsilon = 1e-5);
        // Raising the upper bound of y trades one x for one y
        assert_abs_diff_eq!(solution.reduced_costs.unwrap()["y"], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn fixed_variables_and_equalities() {
        // min x + y s.t. x - y = 1, y fixed at 2
        let mut problem = Problem::new_minimization();
        problem.add_new_variable("x", None, -10.0, 10.0).unwrap();
        problem.add_new_variable("y", None, 2.0, 2.0).unwrap();
        problem
            .add_new_equality_constraint("c", &["x", "y"], &[1.0, -1.0], 1.0)
            .unwrap();
        problem.add_new_linear_objective_term("x", 1.0).unwrap();
        problem.add_new_linear_objective_term("y", 1.0).unwrap();
        let solution = problem.solve(&ClarabelSolver::default()).unwrap();
        assert!(solution.status.has_solution());
        assert_abs_diff_eq!(solution.objective_value.unwrap(), 5.0, epsilon = 1e-5);
        assert_abs_diff_eq!(solution.variable_values.unwrap()["x"], 3.0, epsilon = 1e-5);
    }

    #[test]
    fn infeasible() {
        let mut problem = Problem::new_minimization();
        problem.add_new_variable("x", None, 0.0, 1.0).unwrap();
        problem
            .add_new_inequality_constraint("c", &["x"], &[1.0], 2.0, f64::INFINITY)
            .unwrap();
        problem.add_new_linear_objective_term("x", 1.0).unwrap();
        let solution = problem.solve(&ClarabelSolver::default()).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.variable_values.is_none());
    }
}
