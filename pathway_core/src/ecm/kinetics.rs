//! Rate law of the enzyme cost model
//!
//! The enzyme demand of a reaction with flux `v` is
//!
//! ```text
//! E = v / (kcat · η_thr · η_sat)
//! ```
//!
//! with the thermodynamic efficiency `η_thr = 1 - exp(ΔG'/RT)` and the convenience kinetics
//! saturation
//!
//! ```text
//! η_sat = Π_s (s/K_s)^n_s / (Π_s (1 + s/K_s)^n_s + Π_p (1 + p/K_p)^n_p - 1)
//! ```
//!
//! Reactants without a Michaelis constant are treated as fully saturating and take no part in
//! `η_sat`. All quantities are evaluated along the direction of the flux.
use nalgebra::DVector;

/// A reactant taking part in the saturation term
#[derive(Clone, Debug, PartialEq)]
struct SaturatingReactant {
    /// Position of the compound in the concentration vector
    index: usize,
    /// Oriented stoichiometric coefficient, negative for substrates
    coefficient: f64,
    /// Michaelis constant (M)
    km: f64,
}

/// Kinetic description of one reaction, oriented along its flux
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionKinetics {
    /// Magnitude of the flux (M/s)
    pub flux: f64,
    /// Catalytic rate constant (1/s)
    pub kcat: f64,
    /// Enzyme molecular mass (Da)
    pub enzyme_mass: f64,
    /// Oriented standard Gibbs energy (kJ/mol)
    standard_dg: f64,
    /// Oriented stoichiometry as (compound index, coefficient)
    stoichiometry: Vec<(usize, f64)>,
    saturating: Vec<SaturatingReactant>,
}

impl ReactionKinetics {
    /// Create the kinetics of a reaction
    ///
    /// # Parameters
    /// - `flux`: Signed flux (M/s), the stoichiometry is flipped for negative fluxes
    /// - `kcat`: Catalytic rate constant in the flux direction (1/s)
    /// - `enzyme_mass`: Molecular mass of the enzyme (Da)
    /// - `standard_dg`: Standard Gibbs energy of the reaction as written (kJ/mol)
    /// - `stoichiometry`: (compound index, coefficient, Michaelis constant) as written
    pub fn new(
        flux: f64,
        kcat: f64,
        enzyme_mass: f64,
        standard_dg: f64,
        stoichiometry: &[(usize, f64, Option<f64>)],
    ) -> Self {
        let direction = if flux < 0.0 { -1.0 } else { 1.0 };
        ReactionKinetics {
            flux: flux.abs(),
            kcat,
            enzyme_mass,
            standard_dg: direction * standard_dg,
            stoichiometry: stoichiometry
                .iter()
                .map(|(i, nu, _)| (*i, direction * nu))
                .collect(),
            saturating: stoichiometry
                .iter()
                .filter_map(|(i, nu, km)| {
                    km.map(|km| SaturatingReactant {
                        index: *i,
                        coefficient: direction * nu,
                        km,
                    })
                })
                .collect(),
        }
    }

    /// Gibbs energy along the flux (kJ/mol)
    pub fn dg_prime(&self, ln_conc: &DVector<f64>, rt: f64) -> f64 {
        self.standard_dg
            + rt * self
                .stoichiometry
                .iter()
                .map(|(i, nu)| nu * ln_conc[*i])
                .sum::<f64>()
    }

    /// Thermodynamic efficiency, the fraction of the forward rate that is not cancelled by
    /// the backward rate
    pub fn eta_thermodynamic(&self, ln_conc: &DVector<f64>, rt: f64) -> f64 {
        1.0 - (self.dg_prime(ln_conc, rt) / rt).exp()
    }

    /// Saturation efficiency of the enzyme
    pub fn eta_saturation(&self, ln_conc: &DVector<f64>) -> f64 {
        let terms = self.saturation_terms(ln_conc);
        (terms.ln_numerator - terms.denominator.ln()).exp()
    }

    /// Capacity demand `v / kcat` (M)
    pub fn capacity(&self) -> f64 {
        if self.flux == 0.0 {
            return 0.0;
        }
        self.flux / self.kcat
    }

    /// Enzyme demand (M), infinite where the reaction can't run along its flux
    pub fn enzyme_demand(&self, ln_conc: &DVector<f64>, rt: f64) -> f64 {
        if self.flux == 0.0 {
            return 0.0;
        }
        let eta_thr = self.eta_thermodynamic(ln_conc, rt);
        if eta_thr <= 0.0 {
            return f64::INFINITY;
        }
        self.capacity() / (eta_thr * self.eta_saturation(ln_conc))
    }

    /// Gradient of `ln E` with respect to the log concentrations, accumulated into `gradient`
    /// with weight `weight`
    pub fn add_ln_demand_gradient(
        &self,
        ln_conc: &DVector<f64>,
        rt: f64,
        weight: f64,
        gradient: &mut DVector<f64>,
    ) {
        if self.flux == 0.0 {
            return;
        }
        // d ln η_thr / d ln c_j = -ν_j q / (1 - q) with q = exp(ΔG'/RT)
        let q = (self.dg_prime(ln_conc, rt) / rt).exp();
        let thermodynamic = q / (1.0 - q);
        for (i, nu) in &self.stoichiometry {
            gradient[*i] += weight * nu * thermodynamic;
        }
        let terms = self.saturation_terms(ln_conc);
        for reactant in &self.saturating {
            let ratio = (ln_conc[reactant.index]).exp() / reactant.km;
            let occupancy = ratio / (1.0 + ratio);
            let n = reactant.coefficient.abs();
            let d_ln_eta_sat = if reactant.coefficient < 0.0 {
                n - terms.substrate_product * n * occupancy / terms.denominator
            } else {
                -terms.product_product * n * occupancy / terms.denominator
            };
            gradient[reactant.index] -= weight * d_ln_eta_sat;
        }
    }

    fn saturation_terms(&self, ln_conc: &DVector<f64>) -> SaturationTerms {
        let mut ln_numerator = 0.0;
        let mut ln_substrate_product = 0.0;
        let mut ln_product_product = 0.0;
        for reactant in &self.saturating {
            let ln_ratio = ln_conc[reactant.index] - reactant.km.ln();
            let n = reactant.coefficient.abs();
            let ln_one_plus = ln_ratio.exp().ln_1p();
            if reactant.coefficient < 0.0 {
                ln_numerator += n * ln_ratio;
                ln_substrate_product += n * ln_one_plus;
            } else {
                ln_product_product += n * ln_one_plus;
            }
        }
        let substrate_product = ln_substrate_product.exp();
        let product_product = ln_product_product.exp();
        SaturationTerms {
            ln_numerator,
            substrate_product,
            product_product,
            denominator: substrate_product + product_product - 1.0,
        }
    }
}

struct SaturationTerms {
    ln_numerator: f64,
    substrate_product: f64,
    product_product: f64,
    denominator: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RT: f64 = 2.479;

    fn kinetics() -> ReactionKinetics {
        // 2 A <=> B + C, C saturating
        ReactionKinetics::new(
            2e-3,
            100.0,
            40_000.0,
            -3.0,
            &[(0, -2.0, Some(1e-4)), (1, 1.0, Some(2e-4)), (2, 1.0, None)],
        )
    }

    #[test]
    fn michaelis_menten_limit() {
        // A single substrate and no products with a Km gives s / (K + s)
        let k = ReactionKinetics::new(1e-3, 10.0, 1.0, -50.0, &[(0, -1.0, Some(1e-3)), (1, 1.0, None)]);
        let ln_conc = DVector::from_vec(vec![(1e-3f64).ln(), (1e-6f64).ln()]);
        assert_abs_diff_eq!(k.eta_saturation(&ln_conc), 0.5, epsilon = 1e-12);
        let eta_thr = k.eta_thermodynamic(&ln_conc, RT);
        assert_abs_diff_eq!(
            k.enzyme_demand(&ln_conc, RT),
            1e-4 / (0.5 * eta_thr),
            epsilon = 1e-15
        );
    }

    #[test]
    fn reverse_flux_orientation() {
        let forward = ReactionKinetics::new(1e-3, 10.0, 1.0, 5.0, &[(0, -1.0, None), (1, 1.0, None)]);
        let backward = ReactionKinetics::new(-1e-3, 10.0, 1.0, -5.0, &[(0, 1.0, None), (1, -1.0, None)]);
        let ln_conc = DVector::from_vec(vec![(1e-2f64).ln(), (1e-5f64).ln()]);
        assert_abs_diff_eq!(
            forward.dg_prime(&ln_conc, RT),
            backward.dg_prime(&ln_conc, RT),
            epsilon = 1e-12
        );
        assert_eq!(backward.flux, 1e-3);
    }

    #[test]
    fn infeasible_direction() {
        let k = kinetics();
        // Product far above substrate makes the reaction run backward
        let ln_conc = DVector::from_vec(vec![(1e-6f64).ln(), (1e-1f64).ln(), (1e-1f64).ln()]);
        assert!(k.eta_thermodynamic(&ln_conc, RT) < 0.0);
        assert_eq!(k.enzyme_demand(&ln_conc, RT), f64::INFINITY);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let k = kinetics();
        let ln_conc = DVector::from_vec(vec![(2e-3f64).ln(), (5e-5f64).ln(), (1e-4f64).ln()]);
        let mut gradient = DVector::zeros(3);
        k.add_ln_demand_gradient(&ln_conc, RT, 1.0, &mut gradient);
        let h = 1e-6;
        for j in 0..3 {
            let mut up = ln_conc.clone();
            let mut down = ln_conc.clone();
            up[j] += h;
            down[j] -= h;
            let numeric = (k.enzyme_demand(&up, RT).ln() - k.enzyme_demand(&down, RT).ln()) / (2.0 * h);
            assert_abs_diff_eq!(gradient[j], numeric, epsilon = 1e-5);
        }
    }
}
