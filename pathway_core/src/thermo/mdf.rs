//! Max-min Driving Force analysis
//!
//! The MDF of a pathway is the largest `B` such that every reaction, oriented along its flux,
//! has a driving force `-ΔG'` of at least `B` for some set of concentrations within their
//! bounds. With `x = ln c` the problem is the LP
//!
//! ```text
//! maximize B
//! s.t.     σ_i (ΔG'°_i + RT Σ_j S_ji x_j) + B <= 0   for every reaction i with flux
//!          ln lb_j <= x_j <= ln ub_j
//! ```
use nalgebra::DVector;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::io::sbtab::{SbtabDocument, SbtabTable};
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::clarabel::ClarabelSolver;
use crate::optimize::OptimizationStatus;
use crate::pathway::model::{Pathway, PathwayError};
use crate::plot::{Artist, Axes, Color, Figure, LegendPlacement, Rect, Scale, Ticks, MDF_PAGE_SIZE};
use crate::utils::format::format_number;

const MDF_VARIABLE: &str = "mdf";
/// Shadow prices above this are treated as binding
const BINDING_THRESHOLD: f64 = 1e-3;

fn concentration_variable(compound: &str) -> String {
    format!("ln_conc:{}", compound)
}

fn driving_force_constraint(reaction: &str) -> String {
    format!("driving_force:{}", reaction)
}

/// Thermodynamic model of a pathway, ready for MDF analysis
#[derive(Clone, Debug)]
pub struct ThermodynamicModel {
    pathway: Pathway,
    standard_dg_primes: DVector<f64>,
    rt: f64,
}

impl ThermodynamicModel {
    /// Build the model from a pathway SBtab document, every reaction needs a standard Gibbs
    /// energy
    pub fn from_sbtab(doc: &SbtabDocument) -> Result<Self, MdfError> {
        ThermodynamicModel::from_pathway(Pathway::from_sbtab(doc)?)
    }

    /// Build the model from a pathway
    pub fn from_pathway(pathway: Pathway) -> Result<Self, MdfError> {
        let standard_dg_primes = pathway.standard_dg_primes()?;
        let rt = pathway.rt()?;
        Ok(ThermodynamicModel {
            pathway,
            standard_dg_primes,
            rt,
        })
    }

    /// The pathway the model was built from
    pub fn pathway(&self) -> &Pathway {
        &self.pathway
    }

    /// Solve for the max-min driving force
    pub fn mdf_analysis(&self) -> Result<MdfSolution, MdfError> {
        let problem = self.build_problem()?;
        info!(
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "solving MDF problem"
        );
        let solution = problem.solve(&ClarabelSolver::default())?;
        let (values, duals, reduced_costs) = match (
            solution.status.has_solution(),
            solution.variable_values,
            solution.dual_values,
            solution.reduced_costs,
        ) {
            (true, Some(values), Some(duals), Some(reduced_costs)) => {
                (values, duals, reduced_costs)
            }
            _ => return Err(MdfError::SolverFailed(solution.status)),
        };
        let score = values[MDF_VARIABLE];
        debug!(score, "MDF problem solved");

        let ln_conc: Vec<f64> = self
            .pathway
            .compounds
            .keys()
            .map(|id| values[&concentration_variable(id)])
            .collect();
        let ln_conc = DVector::from_vec(ln_conc);
        let dg_primes = self.dg_primes(&ln_conc);

        let reactions = self
            .pathway
            .reactions
            .values()
            .enumerate()
            .map(|(i, reaction)| MdfReaction {
                id: reaction.id.clone(),
                formula: reaction.formula(),
                flux: reaction.flux,
                standard_dg_prime: self.standard_dg_primes[i],
                dg_prime: dg_primes[i],
                shadow_price: duals
                    .get(&driving_force_constraint(&reaction.id))
                    .copied()
                    .unwrap_or(0.0),
            })
            .collect();
        let compounds = self
            .pathway
            .compounds
            .values()
            .enumerate()
            .map(|(j, compound)| MdfCompound {
                id: compound.id.clone(),
                name: compound.name.clone(),
                concentration: ln_conc[j].exp(),
                lower_bound: compound.lower_bound,
                upper_bound: compound.upper_bound,
                shadow_price: reduced_costs
                    .get(&concentration_variable(&compound.id))
                    .copied()
                    .unwrap_or(0.0),
            })
            .collect();
        Ok(MdfSolution {
            score,
            reactions,
            compounds,
        })
    }

    /// `ΔG' = ΔG'° + RT Sᵀ ln c` for every reaction, in the written direction
    pub fn dg_primes(&self, ln_conc: &DVector<f64>) -> DVector<f64> {
        let s = self.pathway.stoichiometric_matrix();
        &self.standard_dg_primes + s.transpose() * ln_conc * self.rt
    }

    fn build_problem(&self) -> Result<Problem, MdfError> {
        let mut problem = Problem::new_maximization();
        for compound in self.pathway.compounds.values() {
            problem.add_new_variable(
                &concentration_variable(&compound.id),
                compound.name.as_deref(),
                compound.lower_bound.ln(),
                compound.upper_bound.ln(),
            )?;
        }
        problem.add_new_variable(MDF_VARIABLE, Some("B"), f64::NEG_INFINITY, f64::INFINITY)?;

        let mut active = 0;
        for (i, reaction) in self.pathway.reactions.values().enumerate() {
            let direction = reaction.direction();
            if direction == 0.0 {
                debug!(reaction = %reaction.id, "no flux, skipping driving force constraint");
                continue;
            }
            let variables: Vec<String> = reaction
                .stoichiometry
                .keys()
                .map(|id| concentration_variable(id))
                .collect();
            let mut variable_refs: Vec<&str> = variables.iter().map(|v| v.as_str()).collect();
            let mut coefficients: Vec<f64> = reaction
                .stoichiometry
                .values()
                .map(|nu| direction * self.rt * nu)
                .collect();
            variable_refs.push(MDF_VARIABLE);
            coefficients.push(1.0);
            problem.add_new_inequality_constraint(
                &driving_force_constraint(&reaction.id),
                &variable_refs,
                &coefficients,
                f64::NEG_INFINITY,
                -direction * self.standard_dg_primes[i],
            )?;
            active += 1;
        }
        if active == 0 {
            return Err(MdfError::NoActiveReactions);
        }
        problem.add_new_linear_objective_term(MDF_VARIABLE, 1.0)?;
        for variable in problem.variables() {
            trace!(%variable, "MDF variable");
        }
        for constraint in problem.constraints() {
            trace!(id = constraint.id(), %constraint, "MDF constraint");
        }
        Ok(problem)
    }
}

/// Result for a single reaction
#[derive(Clone, Debug, PartialEq)]
pub struct MdfReaction {
    pub id: String,
    pub formula: String,
    /// Flux (M/s)
    pub flux: f64,
    /// Standard transformed Gibbs energy (kJ/mol)
    pub standard_dg_prime: f64,
    /// Transformed Gibbs energy at the optimum (kJ/mol)
    pub dg_prime: f64,
    /// Sensitivity of the MDF to this reaction's driving force
    pub shadow_price: f64,
}

impl MdfReaction {
    /// Driving force along the flux direction (kJ/mol)
    pub fn driving_force(&self) -> f64 {
        if self.flux < 0.0 {
            self.dg_prime
        } else {
            -self.dg_prime
        }
    }
}

/// Result for a single compound
#[derive(Clone, Debug, PartialEq)]
pub struct MdfCompound {
    pub id: String,
    pub name: Option<String>,
    /// Concentration at the optimum (M)
    pub concentration: f64,
    /// Lower bound (M)
    pub lower_bound: f64,
    /// Upper bound (M)
    pub upper_bound: f64,
    /// Sensitivity of the MDF to the compound's log concentration bounds
    pub shadow_price: f64,
}

/// Solution of an MDF analysis
#[derive(Clone, Debug, PartialEq)]
pub struct MdfSolution {
    /// The max-min driving force (kJ/mol)
    pub score: f64,
    pub reactions: Vec<MdfReaction>,
    pub compounds: Vec<MdfCompound>,
}

impl MdfSolution {
    /// Tabular form of the solution
    pub fn to_sbtab(&self) -> SbtabDocument {
        let mut doc = SbtabDocument::new("mdf_result", "mdf_result.tsv");

        let mut summary = SbtabTable::new("MDF", "Quantity", &["QuantityType", "Value"]);
        summary.set_attribute("Unit", "kJ/mol");
        summary.add_row(&["max-min driving force", format_number(self.score).as_str()]);
        doc.add_table(summary);

        let mut reactions = SbtabTable::new(
            "ReactionResult",
            "Quantity",
            &[
                "Reaction",
                "ReactionFormula",
                "Flux",
                "StandardGibbsEnergy",
                "GibbsEnergy",
                "ShadowPrice",
            ],
        );
        reactions.set_attribute("FluxUnit", "mM/s");
        reactions.set_attribute("EnergyUnit", "kJ/mol");
        for r in &self.reactions {
            reactions.add_row(&[
                r.id.clone(),
                r.formula.clone(),
                format_number(r.flux * 1e3),
                format_number(r.standard_dg_prime),
                format_number(r.dg_prime),
                format_number(r.shadow_price),
            ]);
        }
        doc.add_table(reactions);

        let mut compounds = SbtabTable::new(
            "CompoundResult",
            "Quantity",
            &[
                "Compound",
                "Name",
                "Concentration",
                "LowerBound",
                "UpperBound",
                "ShadowPrice",
            ],
        );
        compounds.set_attribute("Unit", "mM");
        for c in &self.compounds {
            compounds.add_row(&[
                c.id.clone(),
                c.name.clone().unwrap_or_default(),
                format_number(c.concentration * 1e3),
                format_number(c.lower_bound * 1e3),
                format_number(c.upper_bound * 1e3),
                format_number(c.shadow_price),
            ]);
        }
        doc.add_table(compounds);
        doc
    }

    /// Concentrations at the optimum against their allowed ranges, log scale
    pub fn plot_concentrations(&self) -> Figure {
        let n = self.compounds.len();
        // first compound on top
        let position = |i: usize| (n - 1 - i) as f64;
        let mut axes = Axes::default();
        axes.x.scale = Scale::Log;
        axes.x.label = Some("Concentration [M]".to_string());
        axes.y.ticks = Ticks::Labeled(
            self.compounds
                .iter()
                .enumerate()
                .map(|(i, c)| (position(i), c.id.clone()))
                .collect(),
        );
        axes.y.limits = Some((-0.5, n as f64 - 0.5));
        axes.add(Artist::Rectangles {
            label: Some("allowed range".to_string()),
            color: Color::GREY,
            rects: self
                .compounds
                .iter()
                .enumerate()
                .map(|(i, c)| Rect::hbar(position(i), 0.6, c.lower_bound, c.upper_bound))
                .collect(),
        });
        axes.add(Artist::Markers {
            label: Some("concentration".to_string()),
            color: Color::BLUE,
            size: 5.0,
            points: self
                .compounds
                .iter()
                .enumerate()
                .map(|(i, c)| (c.concentration, position(i)))
                .collect(),
        });
        let binding: Vec<(f64, f64)> = self
            .compounds
            .iter()
            .enumerate()
            .filter(|(_, c)| c.shadow_price.abs() > BINDING_THRESHOLD)
            .map(|(i, c)| (c.concentration, position(i)))
            .collect();
        if !binding.is_empty() {
            axes.add(Artist::Markers {
                label: Some("bound limits MDF".to_string()),
                color: Color::RED,
                size: 5.0,
                points: binding,
            });
        }
        axes.legend = Some(LegendPlacement::UpperRight);
        Figure::with_axes(MDF_PAGE_SIZE.0, MDF_PAGE_SIZE.1, axes)
    }

    /// Cumulative Gibbs energy profile along the pathway, standard and at the optimum
    pub fn plot_driving_forces(&self) -> Figure {
        let mut standard = vec![(0.0, 0.0)];
        let mut optimized = vec![(0.0, 0.0)];
        let (mut cum_standard, mut cum_optimized) = (0.0, 0.0);
        for (k, r) in self.reactions.iter().enumerate() {
            let sign = if r.flux < 0.0 { -1.0 } else { 1.0 };
            cum_standard += sign * r.standard_dg_prime;
            cum_optimized += sign * r.dg_prime;
            standard.push(((k + 1) as f64, cum_standard));
            optimized.push(((k + 1) as f64, cum_optimized));
        }
        let bottlenecks: Vec<(f64, f64)> = self
            .reactions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.shadow_price > BINDING_THRESHOLD)
            .map(|(k, _)| optimized[k + 1])
            .collect();

        let mut axes = Axes::default();
        axes.x.label = Some("reaction step".to_string());
        axes.y.label = Some("cumulative dG' [kJ/mol]".to_string());
        axes.x.limits = Some((-0.25, self.reactions.len() as f64 + 0.25));
        axes.x.ticks = Ticks::Labeled(
            self.reactions
                .iter()
                .enumerate()
                .map(|(k, r)| ((k + 1) as f64, r.id.clone()))
                .collect(),
        );
        axes.title = Some(format!("MDF = {:.2} kJ/mol", self.score));
        axes.add(Artist::Line {
            label: Some("standard dG'".to_string()),
            color: Color::GREY,
            width: 1.5,
            points: standard,
        });
        axes.add(Artist::Line {
            label: Some("dG' at MDF optimum".to_string()),
            color: Color::BLUE,
            width: 1.5,
            points: optimized,
        });
        if !bottlenecks.is_empty() {
            axes.add(Artist::Markers {
                label: Some("bottleneck".to_string()),
                color: Color::RED,
                size: 6.0,
                points: bottlenecks,
            });
        }
        axes.legend = Some(LegendPlacement::UpperRight);
        Figure::with_axes(MDF_PAGE_SIZE.0, MDF_PAGE_SIZE.1, axes)
    }
}

/// Errors from MDF analysis
#[derive(Error, Debug)]
pub enum MdfError {
    /// The pathway could not be read or lacks Gibbs energies
    #[error("{0}")]
    Pathway(#[from] PathwayError),
    /// The LP could not be built
    #[error("{0}")]
    Problem(#[from] ProblemError),
    /// No reaction carries flux, so the MDF is unbounded
    #[error("no reaction carries flux, the MDF is undefined")]
    NoActiveReactions,
    /// The LP solver did not find an optimum
    #[error("MDF problem could not be solved, solver status: {0:?}")]
    SolverFailed(OptimizationStatus),
}
