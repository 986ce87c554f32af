//! Enzyme Cost Model
//!
//! Minimises the total enzyme cost `Σ_i E_i(c) · MW_i` of a pathway over the log
//! concentrations, within the concentration bounds. The search starts from the MDF optimum,
//! where every reaction has a positive driving force, and proceeds by projected gradient
//! descent on `ln cost` with a backtracking line search.
use nalgebra::DVector;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ecm::kinetics::ReactionKinetics;
use crate::io::sbtab::{SbtabDocument, SbtabTable};
use crate::pathway::model::{Pathway, PathwayError};
use crate::plot::{Artist, Axes, Color, Figure, PieChart, PieSlice, Rect, Scale, Ticks};
use crate::thermo::mdf::{MdfError, ThermodynamicModel};
use crate::utils::format::format_number;

/// Width and height (inches) of the enzyme demand page
pub const DEMAND_PAGE_SIZE: (f64, f64) = (7.0, 4.0);
/// Width and height (inches) of the volume page
pub const VOLUME_PAGE_SIZE: (f64, f64) = (5.0, 5.0);

const MAX_ITERATIONS: usize = 1000;
const ARMIJO: f64 = 1e-4;
const MIN_STEP: f64 = 1e-12;
const COST_TOLERANCE: f64 = 1e-10;
const STEP_TOLERANCE: f64 = 1e-9;

/// Enzyme cost model of a pathway
#[derive(Clone, Debug)]
pub struct EnzymeCostModel {
    thermodynamics: ThermodynamicModel,
    kinetics: Vec<ReactionKinetics>,
    ln_lower: DVector<f64>,
    ln_upper: DVector<f64>,
    rt: f64,
}

impl EnzymeCostModel {
    /// Build the model from a pathway SBtab document
    pub fn from_sbtab(doc: &SbtabDocument) -> Result<Self, EcmError> {
        EnzymeCostModel::from_pathway(Pathway::from_sbtab(doc)?)
    }

    /// Build the model from a pathway, every reaction needs a standard Gibbs energy, a
    /// catalytic rate constant and an enzyme mass
    pub fn from_pathway(pathway: Pathway) -> Result<Self, EcmError> {
        let rt = pathway.rt()?;
        let standard_dg_primes = pathway.standard_dg_primes()?;
        let mut kinetics = Vec::with_capacity(pathway.reactions.len());
        for (i, reaction) in pathway.reactions.values().enumerate() {
            let kcat = reaction
                .kcat
                .ok_or_else(|| EcmError::MissingKcat(reaction.id.clone()))?;
            let enzyme_mass = reaction
                .enzyme_mass
                .ok_or_else(|| EcmError::MissingEnzymeMass(reaction.id.clone()))?;
            let stoichiometry: Vec<(usize, f64, Option<f64>)> = reaction
                .stoichiometry
                .iter()
                .filter_map(|(compound, nu)| {
                    let (index, _, c) = pathway.compounds.get_full(compound)?;
                    let km = if c.has_unit_activity() {
                        None
                    } else {
                        reaction.km.get(compound).copied()
                    };
                    Some((index, *nu, km))
                })
                .collect();
            kinetics.push(ReactionKinetics::new(
                reaction.flux,
                kcat,
                enzyme_mass,
                standard_dg_primes[i],
                &stoichiometry,
            ));
        }
        let ln_lower = DVector::from_iterator(
            pathway.compounds.len(),
            pathway.compounds.values().map(|c| c.lower_bound.ln()),
        );
        let ln_upper = DVector::from_iterator(
            pathway.compounds.len(),
            pathway.compounds.values().map(|c| c.upper_bound.ln()),
        );
        Ok(EnzymeCostModel {
            thermodynamics: ThermodynamicModel::from_pathway(pathway)?,
            kinetics,
            ln_lower,
            ln_upper,
            rt,
        })
    }

    /// The pathway the model was built from
    pub fn pathway(&self) -> &Pathway {
        self.thermodynamics.pathway()
    }

    /// Total enzyme cost (g/L) at the given log concentrations
    pub fn enzyme_cost(&self, ln_conc: &DVector<f64>) -> f64 {
        self.kinetics
            .iter()
            .map(|k| k.enzyme_demand(ln_conc, self.rt) * k.enzyme_mass)
            .sum()
    }

    /// Gradient of `ln cost` with respect to the log concentrations
    pub fn ln_cost_gradient(&self, ln_conc: &DVector<f64>) -> DVector<f64> {
        let mut gradient = DVector::zeros(ln_conc.len());
        let cost = self.enzyme_cost(ln_conc);
        if !(cost.is_finite() && cost > 0.0) {
            return gradient;
        }
        for k in &self.kinetics {
            let weight = k.enzyme_demand(ln_conc, self.rt) * k.enzyme_mass / cost;
            k.add_ln_demand_gradient(ln_conc, self.rt, weight, &mut gradient);
        }
        gradient
    }

    /// Find the concentrations minimising the enzyme cost
    pub fn optimize_ecm(&self) -> Result<EcmSolution, EcmError> {
        let mdf = self.thermodynamics.mdf_analysis()?;
        if mdf.score <= 0.0 {
            return Err(EcmError::NonPositiveMdf(mdf.score));
        }
        let start = DVector::from_iterator(
            mdf.compounds.len(),
            mdf.compounds.iter().map(|c| c.concentration.ln()),
        );
        let mut x = self.project(start);
        let initial_cost = self.enzyme_cost(&x);
        info!(initial_cost, "optimizing enzyme cost");

        let mut f = initial_cost.ln();
        let mut iterations = 0;
        while iterations < MAX_ITERATIONS {
            iterations += 1;
            let gradient = self.ln_cost_gradient(&x);
            let Some((next, f_next)) = self.line_search(&x, f, &gradient) else {
                debug!(iterations, "line search made no progress");
                break;
            };
            let step = (&next - &x).amax();
            let decrease = f - f_next;
            x = next;
            f = f_next;
            if decrease.abs() < COST_TOLERANCE || step < STEP_TOLERANCE {
                break;
            }
        }
        if iterations == MAX_ITERATIONS {
            warn!(iterations, "enzyme cost optimization hit the iteration limit");
        }
        let total_cost = self.enzyme_cost(&x);
        info!(total_cost, iterations, "enzyme cost optimized");
        Ok(self.solution(&x, initial_cost, iterations))
    }

    fn project(&self, mut x: DVector<f64>) -> DVector<f64> {
        for j in 0..x.len() {
            x[j] = x[j].clamp(self.ln_lower[j], self.ln_upper[j]);
        }
        x
    }

    /// Armijo backtracking along the projected gradient path
    fn line_search(
        &self,
        x: &DVector<f64>,
        f: f64,
        gradient: &DVector<f64>,
    ) -> Option<(DVector<f64>, f64)> {
        let mut t = 1.0;
        while t >= MIN_STEP {
            let candidate = self.project(x - gradient * t);
            let f_candidate = self.enzyme_cost(&candidate).ln();
            let predicted = gradient.dot(&(&candidate - x));
            if f_candidate.is_finite() && predicted < 0.0 && f_candidate <= f + ARMIJO * predicted
            {
                return Some((candidate, f_candidate));
            }
            t *= 0.5;
        }
        None
    }

    fn solution(&self, ln_conc: &DVector<f64>, initial_cost: f64, iterations: usize) -> EcmSolution {
        let pathway = self.pathway();
        let reactions = pathway
            .reactions
            .values()
            .zip(&self.kinetics)
            .map(|(reaction, k)| {
                let demand = k.enzyme_demand(ln_conc, self.rt);
                let active = k.flux != 0.0;
                EcmReaction {
                    id: reaction.id.clone(),
                    formula: reaction.formula(),
                    flux: reaction.flux,
                    enzyme_mass: k.enzyme_mass,
                    capacity: k.capacity(),
                    thermodynamic_factor: if active {
                        1.0 / k.eta_thermodynamic(ln_conc, self.rt)
                    } else {
                        1.0
                    },
                    saturation_factor: if active {
                        1.0 / k.eta_saturation(ln_conc)
                    } else {
                        1.0
                    },
                    demand,
                    cost: demand * k.enzyme_mass,
                    measured: reaction.measured_enzyme,
                }
            })
            .collect();
        let compounds = pathway
            .compounds
            .values()
            .enumerate()
            .map(|(j, c)| EcmCompound {
                id: c.id.clone(),
                name: c.name.clone(),
                concentration: ln_conc[j].exp(),
                lower_bound: c.lower_bound,
                upper_bound: c.upper_bound,
                molecular_mass: c.molecular_mass,
                unit_activity: c.has_unit_activity(),
            })
            .collect();
        EcmSolution {
            total_cost: self.enzyme_cost(ln_conc),
            initial_cost,
            iterations,
            reactions,
            compounds,
        }
    }
}

/// Enzyme demand of a single reaction at the optimum
#[derive(Clone, Debug, PartialEq)]
pub struct EcmReaction {
    pub id: String,
    pub formula: String,
    /// Flux (M/s)
    pub flux: f64,
    /// Enzyme molecular mass (Da)
    pub enzyme_mass: f64,
    /// Demand with a fully saturated, irreversible enzyme, `v / kcat` (M)
    pub capacity: f64,
    /// `1 / η_thr`
    pub thermodynamic_factor: f64,
    /// `1 / η_sat`
    pub saturation_factor: f64,
    /// Enzyme demand (M)
    pub demand: f64,
    /// Enzyme cost (g/L)
    pub cost: f64,
    /// Measured enzyme concentration (M)
    pub measured: Option<f64>,
}

/// Concentration of a single compound at the optimum
#[derive(Clone, Debug, PartialEq)]
pub struct EcmCompound {
    pub id: String,
    pub name: Option<String>,
    /// (M)
    pub concentration: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Molecular mass (Da)
    pub molecular_mass: Option<f64>,
    /// Water and protons
    pub unit_activity: bool,
}

/// Solution of an enzyme cost minimisation
#[derive(Clone, Debug, PartialEq)]
pub struct EcmSolution {
    /// Enzyme cost at the optimum (g/L)
    pub total_cost: f64,
    /// Enzyme cost at the MDF starting point (g/L)
    pub initial_cost: f64,
    /// Gradient steps taken
    pub iterations: usize,
    pub reactions: Vec<EcmReaction>,
    pub compounds: Vec<EcmCompound>,
}

impl EcmSolution {
    /// Metabolite volume `Σ c · MW` (g/L) over compounds with a known mass, water and
    /// protons excluded. None when no mass is known.
    pub fn metabolite_volume(&self) -> Option<f64> {
        let masses: Vec<f64> = self
            .compounds
            .iter()
            .filter(|c| !c.unit_activity)
            .filter_map(|c| c.molecular_mass.map(|mw| c.concentration * mw))
            .collect();
        if masses.is_empty() {
            None
        } else {
            Some(masses.iter().sum())
        }
    }

    /// Tabular form of the solution
    pub fn to_sbtab(&self) -> SbtabDocument {
        let mut doc = SbtabDocument::new("ecm_result", "ecm_result.tsv");

        let mut summary = SbtabTable::new("ECM", "Quantity", &["QuantityType", "Value"]);
        summary.set_attribute("Unit", "g/L");
        summary.add_row(&["total enzyme cost", format_number(self.total_cost).as_str()]);
        summary.add_row(&["initial enzyme cost", format_number(self.initial_cost).as_str()]);
        if let Some(volume) = self.metabolite_volume() {
            summary.add_row(&["metabolite volume", format_number(volume).as_str()]);
        }
        doc.add_table(summary);

        let mut enzymes = SbtabTable::new(
            "EnzymeResult",
            "Quantity",
            &[
                "Reaction",
                "ReactionFormula",
                "Flux",
                "Capacity",
                "ThermodynamicFactor",
                "SaturationFactor",
                "EnzymeConcentration",
                "MeasuredEnzymeConcentration",
                "EnzymeCost",
            ],
        );
        enzymes.set_attribute("FluxUnit", "mM/s");
        enzymes.set_attribute("ConcentrationUnit", "mM");
        enzymes.set_attribute("CostUnit", "g/L");
        for r in &self.reactions {
            enzymes.add_row(&[
                r.id.clone(),
                r.formula.clone(),
                format_number(r.flux * 1e3),
                format_number(r.capacity * 1e3),
                format_number(r.thermodynamic_factor),
                format_number(r.saturation_factor),
                format_number(r.demand * 1e3),
                r.measured
                    .map(|m| format_number(m * 1e3))
                    .unwrap_or_default(),
                format_number(r.cost),
            ]);
        }
        doc.add_table(enzymes);

        let mut compounds = SbtabTable::new(
            "CompoundResult",
            "Quantity",
            &["Compound", "Name", "Concentration", "LowerBound", "UpperBound"],
        );
        compounds.set_attribute("Unit", "mM");
        for c in &self.compounds {
            compounds.add_row(&[
                c.id.clone(),
                c.name.clone().unwrap_or_default(),
                format_number(c.concentration * 1e3),
                format_number(c.lower_bound * 1e3),
                format_number(c.upper_bound * 1e3),
            ]);
        }
        doc.add_table(compounds);
        doc
    }

    /// Enzyme demand of every reaction as stacked log-scale bars: the capacity `v / kcat`,
    /// then the thermodynamic and saturation factors on top of it
    ///
    /// With `plot_measured` the measured enzyme levels are drawn as markers.
    pub fn plot_enzyme_demand_breakdown(&self, plot_measured: bool) -> Figure {
        let active: Vec<(usize, &EcmReaction)> = self
            .reactions
            .iter()
            .filter(|r| r.capacity > 0.0 && r.demand.is_finite())
            .enumerate()
            .collect();
        let measured: Vec<(f64, f64)> = if plot_measured {
            active
                .iter()
                .filter_map(|(k, r)| r.measured.map(|m| (*k as f64, m)))
                .filter(|(_, m)| *m > 0.0)
                .collect()
        } else {
            Vec::new()
        };

        let mut values: Vec<f64> = active
            .iter()
            .flat_map(|(_, r)| [r.capacity, r.demand])
            .collect();
        values.extend(measured.iter().map(|p| p.1));
        let (floor, ceiling) = crate::plot::ticks::auto_limits(&values, Scale::Log);

        let mut axes = Axes::default();
        axes.y.scale = Scale::Log;
        axes.y.label = Some("enzyme demand [M]".to_string());
        axes.y.limits = Some((floor, ceiling));
        axes.x.limits = Some((-0.6, active.len() as f64 - 0.4));
        axes.x.ticks = Ticks::Labeled(
            active
                .iter()
                .map(|(k, r)| (*k as f64, r.id.clone()))
                .collect(),
        );
        let bar = |x: usize, bottom: f64, top: f64| Rect::bar(x as f64, 0.8, bottom, top);
        axes.add(Artist::Rectangles {
            label: Some("capacity".to_string()),
            color: Color::BLUE,
            rects: active
                .iter()
                .map(|(k, r)| bar(*k, floor, r.capacity))
                .collect(),
        });
        axes.add(Artist::Rectangles {
            label: Some("thermodynamic".to_string()),
            color: Color::ORANGE,
            rects: active
                .iter()
                .map(|(k, r)| {
                    bar(*k, r.capacity, r.capacity * r.thermodynamic_factor)
                })
                .collect(),
        });
        axes.add(Artist::Rectangles {
            label: Some("saturation".to_string()),
            color: Color::GREEN,
            rects: active
                .iter()
                .map(|(k, r)| bar(*k, r.capacity * r.thermodynamic_factor, r.demand))
                .collect(),
        });
        if !measured.is_empty() {
            axes.add(Artist::Markers {
                label: Some("measured".to_string()),
                color: Color::RED,
                size: 6.0,
                points: measured,
            });
        }
        Figure::with_axes(DEMAND_PAGE_SIZE.0, DEMAND_PAGE_SIZE.1, axes)
    }

    /// Share of the total volume taken by each enzyme and, when compound masses are known,
    /// by the metabolites
    pub fn plot_volumes_pie(&self) -> Figure {
        let mut slices: Vec<PieSlice> = self
            .reactions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.cost.is_finite() && r.cost > 0.0)
            .map(|(i, r)| PieSlice {
                label: r.id.clone(),
                value: r.cost,
                color: Color::palette(i),
            })
            .collect();
        if let Some(volume) = self.metabolite_volume() {
            slices.push(PieSlice {
                label: "metabolites".to_string(),
                value: volume,
                color: Color::GREY,
            });
        }
        Figure::with_pie(
            VOLUME_PAGE_SIZE.0,
            VOLUME_PAGE_SIZE.1,
            PieChart {
                title: Some("volume [g/L]".to_string()),
                slices,
            },
        )
    }
}

/// Errors from enzyme cost optimisation
#[derive(Error, Debug)]
pub enum EcmError {
    #[error("{0}")]
    Pathway(#[from] PathwayError),
    #[error("{0}")]
    Mdf(#[from] MdfError),
    #[error("reaction {0} has no catalytic rate constant")]
    MissingKcat(String),
    #[error("reaction {0} has no enzyme molecular mass")]
    MissingEnzymeMass(String),
    /// No concentrations let every reaction run along its flux
    #[error("the pathway is thermodynamically infeasible (MDF = {0:.3} kJ/mol)")]
    NonPositiveMdf(f64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::reaction_parse::parse_formula;
    use crate::pathway::compound::CompoundBuilder;
    use crate::pathway::reaction::ReactionBuilder;
    use crate::plot::Panel;
    use approx::assert_abs_diff_eq;
    use std::path::PathBuf;

    fn fixture() -> EnzymeCostModel {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("ecm_pathway.tsv");
        let doc = SbtabDocument::read(path).unwrap();
        EnzymeCostModel::from_sbtab(&doc).unwrap()
    }

    fn two_step() -> Pathway {
        let mut pathway = Pathway::new_empty();
        for id in ["A", "B", "C"] {
            pathway.add_compound(
                CompoundBuilder::default()
                    .id(id)
                    .molecular_mass(Some(150.0))
                    .build()
                    .unwrap(),
            );
        }
        for (id, formula, dg) in [("R1", "A <=> B", -4.0), ("R2", "B <=> C", -6.0)] {
            let mut reaction = ReactionBuilder::default()
                .id(id)
                .stoichiometry(parse_formula(formula).unwrap())
                .standard_dg_prime(Some(dg))
                .flux(1e-3)
                .build()
                .unwrap();
            reaction.kcat = Some(50.0);
            reaction.enzyme_mass = Some(30_000.0);
            pathway.add_reaction(reaction);
        }
        pathway.set_default_kinetics();
        pathway
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let model = fixture();
        let mdf = model.thermodynamics.mdf_analysis().unwrap();
        let x = DVector::from_iterator(
            mdf.compounds.len(),
            mdf.compounds.iter().map(|c| c.concentration.ln()),
        );
        let gradient = model.ln_cost_gradient(&x);
        let h = 1e-6;
        for j in 0..x.len() {
            let mut up = x.clone();
            let mut down = x.clone();
            up[j] += h;
            down[j] -= h;
            let numeric =
                (model.enzyme_cost(&up).ln() - model.enzyme_cost(&down).ln()) / (2.0 * h);
            assert_abs_diff_eq!(gradient[j], numeric, epsilon = 1e-4);
        }
    }

    #[test]
    fn optimum_is_cheaper_than_start() {
        let solution = fixture().optimize_ecm().unwrap();
        assert!(solution.total_cost.is_finite());
        assert!(solution.total_cost > 0.0);
        assert!(solution.total_cost <= solution.initial_cost * (1.0 + 1e-9));
        for c in &solution.compounds {
            assert!(c.concentration >= c.lower_bound * (1.0 - 1e-9));
            assert!(c.concentration <= c.upper_bound * (1.0 + 1e-9));
        }
        let total: f64 = solution.reactions.iter().map(|r| r.cost).sum();
        assert_abs_diff_eq!(total, solution.total_cost, epsilon = 1e-9);
        for r in &solution.reactions {
            assert!(r.thermodynamic_factor >= 1.0);
            assert!(r.saturation_factor >= 1.0);
            assert_abs_diff_eq!(
                r.demand,
                r.capacity * r.thermodynamic_factor * r.saturation_factor,
                epsilon = 1e-12
            );
        }
        let measured: Vec<&str> = solution
            .reactions
            .iter()
            .filter(|r| r.measured.is_some())
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(measured, vec!["GAPDH", "PGK"]);
    }

    #[test]
    fn solution_outputs() {
        let solution = fixture().optimize_ecm().unwrap();
        let text = solution.to_sbtab().to_sbtab_string();
        let reread = SbtabDocument::from_str("ecm", &text, "ecm.tsv").unwrap();
        assert_eq!(reread.require_table("EnzymeResult").unwrap().len(), 4);
        assert_eq!(reread.require_table("CompoundResult").unwrap().len(), 12);
        assert_eq!(reread.require_table("ECM").unwrap().len(), 3);

        let breakdown = solution.plot_enzyme_demand_breakdown(true);
        assert_eq!((breakdown.width, breakdown.height), (7.0, 4.0));
        let axes = breakdown.axes().unwrap();
        assert_eq!(axes.y.scale, Scale::Log);
        let labels: Vec<&str> = axes.legend_entries().iter().map(|e| e.0).collect();
        assert_eq!(labels, vec!["capacity", "thermodynamic", "saturation", "measured"]);
        let without = solution.plot_enzyme_demand_breakdown(false);
        assert_eq!(without.axes().unwrap().artists.len(), 3);

        let pie = solution.plot_volumes_pie();
        assert_eq!((pie.width, pie.height), (5.0, 5.0));
        match &pie.panel {
            Panel::Pie(chart) => {
                assert_eq!(chart.slices.len(), 5);
                assert_eq!(chart.slices[4].label, "metabolites");
            }
            other => panic!("Expected a pie chart, got {:?}", other),
        }
    }

    #[test]
    fn small_pathway() {
        let model = EnzymeCostModel::from_pathway(two_step()).unwrap();
        let solution = model.optimize_ecm().unwrap();
        assert!(solution.total_cost <= solution.initial_cost * (1.0 + 1e-9));
        // The intermediate settles strictly between its bounds
        let b = &solution.compounds[1];
        assert!(b.concentration > b.lower_bound && b.concentration < b.upper_bound);
        // A cheaper enzyme gives a cheaper pathway
        let mut cheap = two_step();
        cheap.reactions["R1"].kcat = Some(500.0);
        let cheaper = EnzymeCostModel::from_pathway(cheap)
            .unwrap()
            .optimize_ecm()
            .unwrap();
        assert!(cheaper.total_cost < solution.total_cost);
    }

    #[test]
    fn zero_flux_reaction_costs_nothing() {
        let mut pathway = two_step();
        pathway.reactions["R2"].flux = 0.0;
        let solution = EnzymeCostModel::from_pathway(pathway)
            .unwrap()
            .optimize_ecm()
            .unwrap();
        assert_eq!(solution.reactions[1].demand, 0.0);
        assert_eq!(solution.reactions[1].cost, 0.0);
        assert_eq!(
            solution.plot_enzyme_demand_breakdown(true).axes().unwrap().x_ticks().len(),
            1
        );
    }

    #[test]
    fn missing_parameters() {
        let mut pathway = two_step();
        pathway.reactions["R2"].kcat = None;
        assert!(matches!(
            EnzymeCostModel::from_pathway(pathway),
            Err(EcmError::MissingKcat(id)) if id == "R2"
        ));
        let mut pathway = two_step();
        pathway.reactions["R1"].enzyme_mass = None;
        assert!(matches!(
            EnzymeCostModel::from_pathway(pathway),
            Err(EcmError::MissingEnzymeMass(id)) if id == "R1"
        ));
    }

    #[test]
    fn infeasible_pathway() {
        let mut pathway = two_step();
        pathway.reactions["R1"].standard_dg_prime = Some(60.0);
        let model = EnzymeCostModel::from_pathway(pathway).unwrap();
        assert!(matches!(model.optimize_ecm(), Err(EcmError::NonPositiveMdf(_))));
    }
}
