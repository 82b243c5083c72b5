//! Post-solve checks: first-order (KKT) stationarity by finite differences
//! on common random numbers, and internal consistency of the solved market.
//!
//! Residuals are reported as data and no verdict fails a solve. The
//! bound-aware verdict does decide whether the joint formulation hands over
//! to best responses.

use std::fmt;

use rand::Rng;
use serde::Serialize;
use tracing::warn;

use crate::config::SolverConfig;
use crate::derived::InvestmentPair;
use crate::error::ModelError;
use crate::fixed_point::FixedPointSolver;
use crate::monte_carlo::{Espionage, MarketOutcome, MarketShocks, MonteCarloValueEstimator};
use crate::params::{Firm, ParameterSet};
use crate::solution::EquilibriumSolution;

/// Position of an investment relative to the box [0, I_bar].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundStatus {
    Lower,
    Interior,
    Upper,
}

impl fmt::Display for BoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lower => "lower",
            Self::Interior => "interior",
            Self::Upper => "upper",
        };
        f.write_str(s)
    }
}

/// Stationarity check for one firm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FirmKkt {
    pub firm: Firm,
    pub investment: f64,
    /// Finite-difference dV_i/dI_i
    pub marginal_value: f64,
    /// kappa_i * I_i
    pub marginal_cost: f64,
    /// marginal_value - marginal_cost
    pub residual: f64,
    pub bound: BoundStatus,
    /// Multiplier on the active bound implied by the residual; zero when interior
    pub multiplier: f64,
    /// Residual sign is admissible given the bound (within tolerance)
    pub complementary_slackness: bool,
}

impl FirmKkt {
    fn new(firm: Firm, investment: f64, marginal_value: f64, params: &ParameterSet, tol: f64) -> Self {
        let marginal_cost = params.cost_coefficient(firm) * investment;
        let residual = marginal_value - marginal_cost;
        let edge = 1e-9 * params.i_bar();
        let bound = if investment <= edge {
            BoundStatus::Lower
        } else if investment >= params.i_bar() - edge {
            BoundStatus::Upper
        } else {
            BoundStatus::Interior
        };
        // dU/dI + mu_lower - mu_upper = 0
        let (multiplier, complementary_slackness) = match bound {
            BoundStatus::Lower => (-residual, -residual >= -tol),
            BoundStatus::Upper => (residual, residual >= -tol),
            BoundStatus::Interior => (0.0, residual.abs() < tol),
        };
        FirmKkt {
            firm,
            investment,
            marginal_value,
            marginal_cost,
            residual,
            bound,
            multiplier,
            complementary_slackness,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KktReport {
    pub leader: FirmKkt,
    pub follower: FirmKkt,
    pub tolerance: f64,
    /// Finite-difference step in investment units
    pub step: f64,
    pub n_samples: usize,
    /// max |residual_i| < tolerance
    pub satisfied: bool,
    /// Both firms satisfy stationarity or complementary slackness at their bound
    pub bound_kkt_satisfied: bool,
}

impl KktReport {
    pub fn max_abs_residual(&self) -> f64 {
        self.leader.residual.abs().max(self.follower.residual.abs())
    }

    pub fn print_summary(&self) {
        println!(
            "KKT check (h = {:.2e}, N = {}, tol = {:.1e}):",
            self.step, self.n_samples, self.tolerance
        );
        println!(
            "{:<10} {:>10} {:>12} {:>12} {:>12} {:>10} {:>12}",
            "Firm", "I", "dV/dI", "kappa*I", "Residual", "Bound", "Multiplier"
        );
        for f in [&self.leader, &self.follower] {
            println!(
                "{:<10} {:>10.4} {:>12.4} {:>12.4} {:>12.4} {:>10} {:>12.4}",
                f.firm.to_string(),
                f.investment,
                f.marginal_value,
                f.marginal_cost,
                f.residual,
                f.bound.to_string(),
                f.multiplier
            );
        }
        println!(
            "Stationary: {} (max |residual| = {:.4}), bound-aware KKT: {}",
            self.satisfied,
            self.max_abs_residual(),
            self.bound_kkt_satisfied
        );
    }
}

/// Internal consistency of the solved market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConsistencyReport {
    /// |iterated intercept - closed form| at the optimum
    pub fixed_point_residual: f64,
    pub fixed_point_iterations: usize,
    /// Market at the mean leader cost when espionage fails
    pub reference_outcome: MarketOutcome,
    /// Largest demand-formula vs profit-implied quantity gap over all draws,
    /// under both contest results
    pub max_demand_gap: f64,
}

impl ConsistencyReport {
    pub fn print_summary(&self) {
        let o = &self.reference_outcome;
        println!("Consistency at c_1 = mu_c:");
        println!(
            "  p_1 = {:.4}, p_2 = {:.4}, q_1 = {:.4}, q_2 = {:.4}, pi_1 = {:.3}, pi_2 = {:.3}",
            o.p_1, o.p_2, o.q_1, o.q_2, o.profit_1, o.profit_2
        );
        println!(
            "  fixed point: {} iterations, residual {:.2e}; max demand gap {:.2e}",
            self.fixed_point_iterations, self.fixed_point_residual, self.max_demand_gap
        );
    }
}

pub struct EquilibriumVerifier<'a> {
    params: &'a ParameterSet,
    estimator: MonteCarloValueEstimator<'a>,
    fixed_point: FixedPointSolver,
    tol: f64,
    fd_step: f64,
    n_samples: usize,
}

impl<'a> EquilibriumVerifier<'a> {
    pub fn new(params: &'a ParameterSet, config: &SolverConfig) -> Self {
        EquilibriumVerifier {
            params,
            estimator: MonteCarloValueEstimator::new(params)
                .with_parallel_draws(config.parallel_draws)
                .with_sampling(config.espionage_sampling),
            fixed_point: config.fixed_point_solver(),
            tol: config.kkt_tol,
            fd_step: config.fd_step * params.i_bar(),
            n_samples: config.n_samples,
        }
    }

    /// dV_i/dI_i at `investments`, both sides evaluated on the same draws.
    ///
    /// Points are clamped to [0, I_bar]; at a bound the difference becomes
    /// one-sided.
    pub fn marginal_value(&self, firm: Firm, investments: InvestmentPair, shocks: &MarketShocks) -> Result<f64, ModelError> {
        let i_bar = self.params.i_bar();
        let own = match firm {
            Firm::Leader => investments.i_1,
            Firm::Follower => investments.i_2,
        };
        let lo = (own - self.fd_step).max(0.0);
        let hi = (own + self.fd_step).min(i_bar);
        let at = |i: f64| match firm {
            Firm::Leader => InvestmentPair::new(i, investments.i_2),
            Firm::Follower => InvestmentPair::new(investments.i_1, i),
        };

        let v_hi = self.estimator.estimate(at(hi), shocks)?.value(firm);
        let v_lo = self.estimator.estimate(at(lo), shocks)?.value(firm);
        Ok((v_hi - v_lo) / (hi - lo))
    }

    /// KKT report at `investments` on a fresh block of draws from `rng`.
    pub fn verify<R: Rng + ?Sized>(&self, investments: InvestmentPair, rng: &mut R) -> Result<KktReport, ModelError> {
        let shocks = MarketShocks::draw(self.n_samples, rng);
        self.verify_with_shocks(investments, &shocks)
    }

    pub fn verify_solution<R: Rng + ?Sized>(
        &self,
        solution: &EquilibriumSolution,
        rng: &mut R,
    ) -> Result<KktReport, ModelError> {
        self.verify(InvestmentPair::new(solution.i_1_star, solution.i_2_star), rng)
    }

    pub fn verify_with_shocks(&self, investments: InvestmentPair, shocks: &MarketShocks) -> Result<KktReport, ModelError> {
        let report = self.stationarity(investments, shocks)?;
        if !report.satisfied {
            warn!(
                residual_1 = report.leader.residual,
                residual_2 = report.follower.residual,
                tol = self.tol,
                "KKT residuals above tolerance (advisory)"
            );
        }
        Ok(report)
    }

    /// KKT report on `shocks` without logging; the solver uses it to test a
    /// candidate point.
    pub fn stationarity(&self, investments: InvestmentPair, shocks: &MarketShocks) -> Result<KktReport, ModelError> {
        let leader = FirmKkt::new(
            Firm::Leader,
            investments.i_1,
            self.marginal_value(Firm::Leader, investments, shocks)?,
            self.params,
            self.tol,
        );
        let follower = FirmKkt::new(
            Firm::Follower,
            investments.i_2,
            self.marginal_value(Firm::Follower, investments, shocks)?,
            self.params,
            self.tol,
        );

        Ok(KktReport {
            leader,
            follower,
            tolerance: self.tol,
            step: self.fd_step,
            n_samples: shocks.len(),
            satisfied: leader.residual.abs().max(follower.residual.abs()) < self.tol,
            bound_kkt_satisfied: leader.complementary_slackness && follower.complementary_slackness,
        })
    }

    /// Re-derive the market at `investments` and check it against itself.
    ///
    /// Fails with `FixedPointDivergence` if iteration and closed form disagree.
    pub fn check_consistency(&self, investments: InvestmentPair, shocks: &MarketShocks) -> Result<ConsistencyReport, ModelError> {
        let state = self.estimator.derive(investments)?;
        let fixed_point = self.fixed_point.solve(state.rho, state.kappa, self.params)?;

        let max_demand_gap = shocks
            .as_slice()
            .iter()
            .flat_map(|draw| {
                let c_1 = draw.leader_cost(self.params);
                [
                    Espionage::Failed,
                    Espionage::Succeeded {
                        signal_noise: draw.signal,
                    },
                ]
                .map(|espionage| MarketOutcome::at_cost(c_1, espionage, &state, self.params))
            })
            .map(|outcome| outcome.demand_gap(self.params))
            .fold(0.0, f64::max);

        Ok(ConsistencyReport {
            fixed_point_residual: (fixed_point.intercept - state.a).abs(),
            fixed_point_iterations: fixed_point.iterations,
            reference_outcome: MarketOutcome::at_cost(self.params.mu_c(), Espionage::Failed, &state, self.params),
            max_demand_gap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(n_samples: usize) -> SolverConfig {
        SolverConfig::default().with_samples(n_samples)
    }

    #[test]
    fn bound_status_and_multipliers() {
        let params = ParameterSet::baseline();

        let lower = FirmKkt::new(Firm::Leader, 0.0, -2.0, &params, 1e-3);
        assert_eq!(lower.bound, BoundStatus::Lower);
        assert_abs_diff_eq!(lower.multiplier, 2.0);
        assert!(lower.complementary_slackness);

        let pushing_out = FirmKkt::new(Firm::Leader, 0.0, 2.0, &params, 1e-3);
        assert!(!pushing_out.complementary_slackness);

        let upper = FirmKkt::new(Firm::Follower, params.i_bar(), 3.0, &params, 1e-3);
        assert_eq!(upper.bound, BoundStatus::Upper);
        assert_abs_diff_eq!(upper.residual, 3.0 - 0.5 * 5.0);
        assert!(upper.complementary_slackness);

        let interior = FirmKkt::new(Firm::Follower, 2.0, 1.0 + 5e-4, &params, 1e-3);
        assert_eq!(interior.bound, BoundStatus::Interior);
        assert_eq!(interior.multiplier, 0.0);
        assert!(interior.complementary_slackness);
    }

    #[test]
    fn deterministic_costs_give_stable_gradient() {
        let params = crate::params::ParameterValues {
            sigma_c: 0.0,
            ..Default::default()
        }
        .validate()
        .unwrap();
        let verifier = EquilibriumVerifier::new(&params, &config(10));
        let pair = InvestmentPair::new(1.0, 2.0);

        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(2);
        let a = verifier.verify(pair, &mut rng_a).unwrap();
        let b = verifier.verify(pair, &mut rng_b).unwrap();
        // No cost risk: the draws are irrelevant.
        assert_abs_diff_eq!(a.leader.marginal_value, b.leader.marginal_value, epsilon = 1e-9);
        assert_abs_diff_eq!(a.follower.marginal_value, b.follower.marginal_value, epsilon = 1e-9);
    }

    #[test]
    fn boundary_gradient_is_one_sided() {
        let params = ParameterSet::baseline();
        let verifier = EquilibriumVerifier::new(&params, &config(2000));
        let mut rng = StdRng::seed_from_u64(8);
        let shocks = MarketShocks::draw(2000, &mut rng);

        let at_zero = verifier
            .marginal_value(Firm::Leader, InvestmentPair::new(0.0, 1.5), &shocks)
            .unwrap();
        assert!(at_zero.is_finite());

        let at_cap = verifier
            .marginal_value(Firm::Follower, InvestmentPair::new(1.0, params.i_bar()), &shocks)
            .unwrap();
        assert!(at_cap.is_finite());
    }

    #[test]
    fn defense_has_positive_marginal_value() {
        // More defense lowers rho, which the leader values.
        let params = ParameterSet::baseline();
        let verifier = EquilibriumVerifier::new(&params, &config(4000));
        let mut rng = StdRng::seed_from_u64(21);
        let report = verifier.verify(InvestmentPair::new(0.2, 2.0), &mut rng).unwrap();

        assert!(report.leader.marginal_value > 0.0);
        assert!(report.follower.marginal_value > 0.0);
        assert_eq!(report.n_samples, 4000);
    }

    #[test]
    fn solution_record_is_verified_at_its_investments() {
        let params = ParameterSet::baseline();
        let solver_config = config(1000).with_formulation(crate::nash::Formulation::BestResponse);
        let report = crate::nash::solve_equilibrium(&params, &solver_config).unwrap();
        let verifier = EquilibriumVerifier::new(&params, &solver_config);

        let from_record = verifier
            .verify_solution(&report.solution, &mut StdRng::seed_from_u64(3))
            .unwrap();
        let pair = InvestmentPair::new(report.solution.i_1_star, report.solution.i_2_star);
        let direct = verifier.verify(pair, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(from_record, direct);
    }

    #[test]
    fn silent_check_matches_logged_report() {
        let params = ParameterSet::baseline();
        let verifier = EquilibriumVerifier::new(&params, &config(1500));
        let shocks = MarketShocks::draw(1500, &mut StdRng::seed_from_u64(14));
        let pair = InvestmentPair::new(0.0, 1.1);

        let silent = verifier.stationarity(pair, &shocks).unwrap();
        assert_eq!(silent, verifier.verify_with_shocks(pair, &shocks).unwrap());
        // A defense-free corner is not a Nash point: the leader wants to defend.
        assert_eq!(silent.leader.bound, BoundStatus::Lower);
        assert!(silent.leader.residual > 0.0);
        assert!(!silent.bound_kkt_satisfied);
    }

    #[test]
    fn consistency_holds_across_draws() {
        let params = ParameterSet::baseline();
        let verifier = EquilibriumVerifier::new(&params, &config(2000));
        let mut rng = StdRng::seed_from_u64(4);
        let shocks = MarketShocks::draw(2000, &mut rng);

        let report = verifier.check_consistency(InvestmentPair::new(0.8, 1.6), &shocks).unwrap();
        assert!(report.max_demand_gap < 1e-9);
        assert!(report.fixed_point_residual <= 1e-6);
        assert!(report.reference_outcome.q_1 > 0.0);
    }
}
