//! Successive approximation of the leader's price intercept.
//!
//! The recursion is
//!
//! ```text
//! a_{t+1} = (K0 + c * (a_t + mu_c / 2)) / (2B)
//! K0      = alpha (2 beta + delta) / (2 beta) + delta mu_c / 2
//! c       = delta^2 (1 - rho kappa) / (2 beta)
//! ```
//!
//! i.e. the leader re-derives its best-response intercept while the
//! uninformed share of the follower prices off the leader's expected price
//! `a_t + mu_c / 2`. Its fixed point is the closed form in
//! [`InterceptTerms::intercept`], so a disagreement means the two have drifted.

use tracing::debug;

use crate::derived::{DerivedQuantityEvaluator, InterceptTerms};
use crate::error::ModelError;
use crate::params::ParameterSet;

/// Result of one converged iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPointSolution {
    pub intercept: f64,
    pub iterations: usize,
    /// |a_t - a_{t-1}| at the last step
    pub residual: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPointSolver {
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for FixedPointSolver {
    fn default() -> Self {
        FixedPointSolver {
            tol: 1e-6,
            max_iter: 100,
        }
    }
}

impl FixedPointSolver {
    pub fn new(tol: f64, max_iter: usize) -> Self {
        FixedPointSolver { tol, max_iter }
    }

    /// One application of the pricing recursion.
    pub fn step(a: f64, rho: f64, kappa: f64, terms: &InterceptTerms, params: &ParameterSet) -> f64 {
        let (alpha, beta, delta, mu_c) = (params.alpha(), params.beta(), params.delta(), params.mu_c());
        let base = alpha * (2.0 * beta + delta) / (2.0 * beta) + delta * mu_c / 2.0;
        let spillover = delta * delta * (1.0 - rho * kappa) / (2.0 * beta);
        (base + spillover * (a + mu_c / 2.0)) / (2.0 * terms.b)
    }

    /// Iterate from the myopic intercept alpha / beta and confirm the closed form.
    pub fn solve(&self, rho: f64, kappa: f64, params: &ParameterSet) -> Result<FixedPointSolution, ModelError> {
        let terms = DerivedQuantityEvaluator::new(params).intercept_terms(rho, kappa)?;
        self.check_against(terms.intercept(), rho, kappa, &terms, params)
    }

    /// Iterate and compare the result against `closed_form`.
    pub fn check_against(
        &self,
        closed_form: f64,
        rho: f64,
        kappa: f64,
        terms: &InterceptTerms,
        params: &ParameterSet,
    ) -> Result<FixedPointSolution, ModelError> {
        let mut a = params.alpha() / params.beta();
        let mut residual = f64::INFINITY;
        let mut iterations = 0;

        while iterations < self.max_iter {
            let next = Self::step(a, rho, kappa, terms, params);
            residual = (next - a).abs();
            a = next;
            iterations += 1;
            if residual < self.tol {
                break;
            }
        }

        let converged = residual < self.tol;
        let agrees = (a - closed_form).abs() <= self.tol;
        if !converged || !agrees {
            return Err(ModelError::FixedPointDivergence {
                investments: None,
                rho,
                kappa,
                iterated: a,
                closed_form,
                iterations,
                residual,
            });
        }

        debug!(rho, kappa, intercept = a, iterations, "fixed point confirmed");
        Ok(FixedPointSolution {
            intercept: a,
            iterations,
            residual,
        })
    }
}
