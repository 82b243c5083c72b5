//! Stage-1 investment game.
//!
//! Both formulations evaluate every candidate on one block of draws taken
//! from the solve's random stream, so the objective is a deterministic
//! function of the investments for the whole search.
//!
//! Both value functions depend on the investments only through rho * kappa,
//! so the joint-surplus maximizer sits on a bound for at least one firm and
//! is rarely a Nash point. When it fails the bound-aware KKT check on the
//! solver's draws, best-response sweeps take over from it.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SolverConfig;
use crate::derived::InvestmentPair;
use crate::error::ModelError;
use crate::monte_carlo::{MarketShocks, MonteCarloValueEstimator};
use crate::optimizer::{golden_section_maximize, NelderMead, Termination};
use crate::params::{Firm, ParameterSet};
use crate::solution::{EquilibriumReport, EquilibriumSolution};
use crate::verifier::EquilibriumVerifier;

/// Objective value assigned to candidates outside the stable pricing domain.
pub const INFEASIBLE_PENALTY: f64 = 1e12;

/// Value estimates spent on a KKT check (two per firm)
const KKT_EVALUATIONS: usize = 4;

/// How the investment equilibrium is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formulation {
    /// Maximize U_1 + U_2 jointly over the box, then fall back to best
    /// responses from that point if it is not a Nash point.
    #[default]
    JointSurplus,
    /// Iterate each firm's own best response until neither moves.
    BestResponse,
}

impl fmt::Display for Formulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::JointSurplus => "joint_surplus",
            Self::BestResponse => "best_response",
        };
        f.write_str(s)
    }
}

/// Where the search stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NashOutcome {
    pub investments: InvestmentPair,
    /// U_1 + U_2 at `investments`
    pub objective: f64,
    pub termination: Termination,
    pub iterations: usize,
    pub evaluations: usize,
    /// Best-response sweeps replaced the joint-surplus point
    pub fallback: bool,
}

impl NashOutcome {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Map a stability violation to the infeasible penalty; keep fatal errors.
fn penalized(value: Result<f64, ModelError>, investments: InvestmentPair) -> Result<f64, ModelError> {
    match value {
        Err(err) if !err.is_fatal() => {
            debug!(i_1 = investments.i_1, i_2 = investments.i_2, %err, "infeasible candidate");
            Ok(-INFEASIBLE_PENALTY)
        }
        other => other,
    }
}

pub struct NashInvestmentSolver<'a> {
    params: &'a ParameterSet,
    config: SolverConfig,
    estimator: MonteCarloValueEstimator<'a>,
    verifier: EquilibriumVerifier<'a>,
}

impl<'a> NashInvestmentSolver<'a> {
    pub fn new(params: &'a ParameterSet, config: SolverConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let check = config.check_fixed_point.then(|| config.fixed_point_solver());
        let estimator = MonteCarloValueEstimator::new(params)
            .with_fixed_point_check(check)
            .with_parallel_draws(config.parallel_draws)
            .with_sampling(config.espionage_sampling);
        let verifier = EquilibriumVerifier::new(params, &config);
        Ok(NashInvestmentSolver {
            params,
            config,
            estimator,
            verifier,
        })
    }

    /// U_1 + U_2
    pub fn joint_surplus(&self, investments: InvestmentPair, shocks: &MarketShocks) -> Result<f64, ModelError> {
        let estimate = self.estimator.estimate(investments, shocks)?;
        Ok(estimate.net_utility(Firm::Leader, investments, self.params)
            + estimate.net_utility(Firm::Follower, investments, self.params))
    }

    pub fn net_utility(&self, firm: Firm, investments: InvestmentPair, shocks: &MarketShocks) -> Result<f64, ModelError> {
        let estimate = self.estimator.estimate(investments, shocks)?;
        Ok(estimate.net_utility(firm, investments, self.params))
    }

    /// Starting point of both searches
    pub fn start(&self) -> InvestmentPair {
        let i_bar = self.params.i_bar();
        InvestmentPair::new(0.2 * i_bar, 0.2 * i_bar)
    }

    /// Simplex radius / best-response step below which the search stops
    fn investment_tol(&self) -> f64 {
        self.config.nash_tol.sqrt() * self.params.i_bar()
    }

    /// Search for the equilibrium investments on a fixed block of draws.
    pub fn optimize(&self, shocks: &MarketShocks) -> Result<NashOutcome, ModelError> {
        match self.config.formulation {
            Formulation::JointSurplus => {
                let joint = self.optimize_joint(shocks)?;
                let kkt = self.verifier.stationarity(joint.investments, shocks)?;
                if kkt.bound_kkt_satisfied {
                    return Ok(NashOutcome {
                        evaluations: joint.evaluations + KKT_EVALUATIONS,
                        ..joint
                    });
                }

                info!(
                    i_1 = joint.investments.i_1,
                    i_2 = joint.investments.i_2,
                    residual_1 = kkt.leader.residual,
                    residual_2 = kkt.follower.residual,
                    "joint-surplus point is not a Nash point; iterating best responses from it"
                );
                let nash = self.optimize_best_response(joint.investments, shocks)?;
                Ok(NashOutcome {
                    iterations: joint.iterations + nash.iterations,
                    evaluations: joint.evaluations + KKT_EVALUATIONS + nash.evaluations,
                    fallback: true,
                    ..nash
                })
            }
            Formulation::BestResponse => self.optimize_best_response(self.start(), shocks),
        }
    }

    /// Box-projected Nelder–Mead on U_1 + U_2, without the Nash check.
    pub fn optimize_joint(&self, shocks: &MarketShocks) -> Result<NashOutcome, ModelError> {
        let i_bar = self.params.i_bar();
        let search = NelderMead {
            f_tol: self.config.nash_tol,
            x_tol: self.investment_tol(),
            max_iter: self.config.nash_max_iter,
            initial_step: 0.1 * i_bar,
        };
        let objective = |x: [f64; 2]| {
            let investments = InvestmentPair::from_array(x);
            penalized(self.joint_surplus(investments, shocks), investments)
        };
        let result = search.maximize(objective, self.start().to_array(), 0.0, i_bar)?;

        Ok(NashOutcome {
            investments: InvestmentPair::from_array(result.x),
            objective: result.value,
            termination: result.termination,
            iterations: result.iterations,
            evaluations: result.evaluations,
            fallback: false,
        })
    }

    /// Gauss–Seidel sweeps from `start`: the leader best-responds, then the
    /// follower responds to the updated defense.
    pub fn optimize_best_response(&self, start: InvestmentPair, shocks: &MarketShocks) -> Result<NashOutcome, ModelError> {
        let i_bar = self.params.i_bar();
        let step_tol = self.investment_tol();
        let line_tol = 1e-2 * step_tol;

        let mut current = start;
        let mut evaluations = 0;
        let mut iterations = 0;
        let mut termination = Termination::IterationLimit;

        while iterations < self.config.nash_max_iter {
            iterations += 1;
            let previous = current;

            let leader = golden_section_maximize(
                |i_1| {
                    let investments = InvestmentPair::new(i_1, current.i_2);
                    penalized(self.net_utility(Firm::Leader, investments, shocks), investments)
                },
                0.0,
                i_bar,
                line_tol,
            )?;
            current.i_1 = leader.x;

            let follower = golden_section_maximize(
                |i_2| {
                    let investments = InvestmentPair::new(current.i_1, i_2);
                    penalized(self.net_utility(Firm::Follower, investments, shocks), investments)
                },
                0.0,
                i_bar,
                line_tol,
            )?;
            current.i_2 = follower.x;
            evaluations += leader.evaluations + follower.evaluations;

            let moved = (current.i_1 - previous.i_1).abs().max((current.i_2 - previous.i_2).abs());
            debug!(sweep = iterations, i_1 = current.i_1, i_2 = current.i_2, moved, "best-response sweep");
            if moved <= step_tol {
                termination = Termination::Converged;
                break;
            }
        }

        let objective = penalized(self.joint_surplus(current, shocks), current)?;
        Ok(NashOutcome {
            investments: current,
            objective,
            termination,
            iterations,
            evaluations: evaluations + 1,
            fallback: false,
        })
    }

    /// Full solve on `rng`: optimize on one block of draws, evaluate the
    /// optimum on the same block, then verify on a fresh block from the same
    /// stream.
    pub fn solve<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<EquilibriumReport, ModelError> {
        let cfg = &self.config;
        info!(
            formulation = %cfg.formulation,
            sampling = %cfg.espionage_sampling,
            n_samples = cfg.n_samples,
            seed = cfg.seed,
            "solving investment equilibrium"
        );

        let shocks = MarketShocks::draw(cfg.n_samples, rng);
        let outcome = self.optimize(&shocks)?;
        if !outcome.converged() {
            warn!(
                iterations = outcome.iterations,
                i_1 = outcome.investments.i_1,
                i_2 = outcome.investments.i_2,
                "investment search hit the iteration cap; returning best point found"
            );
        }

        let investments = outcome.investments;
        let state = self.estimator.derive(investments)?;
        let estimate = self.estimator.estimate(investments, &shocks)?;

        let consistency = self.verifier.check_consistency(investments, &shocks)?;
        let kkt = self.verifier.verify(investments, rng)?;

        let solution = EquilibriumSolution {
            i_1_star: investments.i_1,
            i_2_star: investments.i_2,
            rho_star: state.rho,
            kappa_star: state.kappa,
            a_star: state.a,
            v_1_star: estimate.v_1,
            v_2_star: estimate.v_2,
            standard_error_1: estimate.standard_error_1,
            standard_error_2: estimate.standard_error_2,
            u_1_star: estimate.net_utility(Firm::Leader, investments, self.params),
            u_2_star: estimate.net_utility(Firm::Follower, investments, self.params),
            consumer_surplus: estimate.consumer_surplus,
            total_welfare: estimate.consumer_surplus + estimate.v_1 + estimate.v_2,
            converged: outcome.converged(),
            iterations: outcome.iterations,
            evaluations: outcome.evaluations,
            kkt_residual_1: kkt.leader.residual,
            kkt_residual_2: kkt.follower.residual,
            n_samples: cfg.n_samples,
            seed: cfg.seed,
            formulation: cfg.formulation,
            espionage_sampling: cfg.espionage_sampling,
            best_response_fallback: outcome.fallback,
        };

        info!(
            i_1 = solution.i_1_star,
            i_2 = solution.i_2_star,
            converged = solution.converged,
            iterations = solution.iterations,
            fallback = solution.best_response_fallback,
            "equilibrium solved"
        );
        Ok(EquilibriumReport {
            solution,
            kkt,
            consistency,
        })
    }
}

/// Solve with a fresh stream seeded from `config.seed`.
pub fn solve_equilibrium(params: &ParameterSet, config: &SolverConfig) -> Result<EquilibriumReport, ModelError> {
    let solver = NashInvestmentSolver::new(params, *config)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    solver.solve(&mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StabilityTerm;

    fn small_config(formulation: Formulation) -> SolverConfig {
        SolverConfig::default().with_samples(2000).with_formulation(formulation)
    }

    #[test]
    fn stability_violation_becomes_penalty() {
        let violation = Err(ModelError::StabilityViolation {
            term: StabilityTerm::Denominator,
            value: -0.2,
            rho: 1.0,
            kappa: 1.0,
        });
        let pair = InvestmentPair::new(0.0, 5.0);
        assert_eq!(penalized(violation, pair), Ok(-INFEASIBLE_PENALTY));
        assert_eq!(penalized(Ok(12.5), pair), Ok(12.5));
    }

    #[test]
    fn divergence_is_not_penalized() {
        let divergence = ModelError::FixedPointDivergence {
            investments: Some(InvestmentPair::new(1.0, 1.0)),
            rho: 0.5,
            kappa: 0.5,
            iterated: 44.0,
            closed_form: 45.0,
            iterations: 5,
            residual: 1e-8,
        };
        let pair = InvestmentPair::new(1.0, 1.0);
        assert_eq!(penalized(Err(divergence.clone()), pair), Err(divergence));
    }

    #[test]
    fn invalid_config_is_rejected_before_solving() {
        let params = ParameterSet::baseline();
        let config = SolverConfig::default().with_samples(0);
        assert!(matches!(
            NashInvestmentSolver::new(&params, config),
            Err(ModelError::InvalidConfig { field: "n_samples", .. })
        ));
    }

    /// No profitable unilateral deviation on a coarse grid.
    fn assert_mutual_best_reply(solver: &NashInvestmentSolver, star: InvestmentPair, shocks: &MarketShocks) {
        let i_bar = solver.params.i_bar();
        let u_1 = solver.net_utility(Firm::Leader, star, shocks).unwrap();
        let u_2 = solver.net_utility(Firm::Follower, star, shocks).unwrap();

        for k in 0..=20 {
            let i = k as f64 * i_bar / 20.0;
            let dev_1 = solver
                .net_utility(Firm::Leader, InvestmentPair::new(i, star.i_2), shocks)
                .unwrap();
            let dev_2 = solver
                .net_utility(Firm::Follower, InvestmentPair::new(star.i_1, i), shocks)
                .unwrap();
            assert!(dev_1 <= u_1 + 1e-3, "leader gains by moving to {}", i);
            assert!(dev_2 <= u_2 + 1e-3, "follower gains by moving to {}", i);
        }
    }

    #[test]
    fn joint_search_stays_in_box_and_converges() {
        let params = ParameterSet::baseline();
        let solver = NashInvestmentSolver::new(&params, small_config(Formulation::JointSurplus)).unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        let shocks = MarketShocks::draw(2000, &mut rng);

        let outcome = solver.optimize_joint(&shocks).unwrap();
        let start = solver.start();
        assert!(outcome.converged());
        assert!(!outcome.fallback);
        assert!((0.0..=params.i_bar()).contains(&outcome.investments.i_1));
        assert!((0.0..=params.i_bar()).contains(&outcome.investments.i_2));
        assert!(outcome.objective >= solver.joint_surplus(start, &shocks).unwrap());
    }

    #[test]
    fn best_response_is_a_mutual_best_reply() {
        let params = ParameterSet::baseline();
        let solver = NashInvestmentSolver::new(&params, small_config(Formulation::BestResponse)).unwrap();
        let mut rng = StdRng::seed_from_u64(23);
        let shocks = MarketShocks::draw(2000, &mut rng);

        let outcome = solver.optimize(&shocks).unwrap();
        assert!(outcome.converged());
        assert!(!outcome.fallback);
        assert_mutual_best_reply(&solver, outcome.investments, &shocks);
    }

    #[test]
    fn joint_corner_hands_over_to_best_responses() {
        let params = ParameterSet::baseline();
        let solver = NashInvestmentSolver::new(&params, small_config(Formulation::JointSurplus)).unwrap();
        let mut rng = StdRng::seed_from_u64(29);
        let shocks = MarketShocks::draw(2000, &mut rng);

        let joint = solver.optimize_joint(&shocks).unwrap();
        let outcome = solver.optimize(&shocks).unwrap();
        assert!(outcome.fallback);
        assert!(outcome.converged());
        assert!(outcome.iterations > joint.iterations);
        assert!(outcome.evaluations > joint.evaluations);
        assert!(outcome.investments.i_1 > 0.0 && outcome.investments.i_2 > 0.0);
        assert_mutual_best_reply(&solver, outcome.investments, &shocks);
    }

    #[test]
    fn best_responses_reach_the_same_point_from_any_start() {
        let params = ParameterSet::baseline();
        let solver = NashInvestmentSolver::new(&params, small_config(Formulation::BestResponse)).unwrap();
        let mut rng = StdRng::seed_from_u64(37);
        let shocks = MarketShocks::draw(2000, &mut rng);

        let from_start = solver.optimize_best_response(solver.start(), &shocks).unwrap();
        let from_corner = solver
            .optimize_best_response(InvestmentPair::new(0.0, params.i_bar()), &shocks)
            .unwrap();
        assert!(from_start.converged() && from_corner.converged());
        assert!((from_start.investments.i_1 - from_corner.investments.i_1).abs() < 5e-3);
        assert!((from_start.investments.i_2 - from_corner.investments.i_2).abs() < 5e-3);
    }
}
