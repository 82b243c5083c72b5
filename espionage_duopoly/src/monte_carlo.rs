//! Monte Carlo value functions over the leader's private cost and the
//! espionage contest.
//!
//! Each draw holds a standard-normal cost shock, a uniform contest draw and a
//! standard-normal signal-noise shock. A block of draws is reused across every
//! objective evaluation of a solve (common random numbers). A draw maps to a
//! cost as `c_1 = mu_c + sigma_c * z`; espionage succeeds when the contest
//! draw falls below rho.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::RunningMoments;
use crate::derived::{DerivedQuantityEvaluator, DerivedState, InterceptTerms, InvestmentPair};
use crate::error::ModelError;
use crate::fixed_point::FixedPointSolver;
use crate::params::{Firm, ParameterSet};

/// Draws per reduction chunk. Chunk boundaries are fixed, so sequential and
/// parallel reductions merge identical partial moments in identical order.
pub const DRAW_CHUNK: usize = 4096;

/// Random inputs of one market realization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShockDraw {
    /// Standard-normal leader-cost shock
    pub cost: f64,
    /// Uniform on [0, 1); espionage succeeds when below rho
    pub contest: f64,
    /// Standard-normal noise in a stolen signal
    pub signal: f64,
}

impl ShockDraw {
    pub fn leader_cost(&self, params: &ParameterSet) -> f64 {
        params.mu_c() + params.sigma_c() * self.cost
    }

    /// Contest result at success probability `rho`.
    pub fn espionage(&self, rho: f64) -> Espionage {
        if self.contest < rho {
            Espionage::Succeeded {
                signal_noise: self.signal,
            }
        } else {
            Espionage::Failed
        }
    }
}

/// A block of draws, taken from the stream in per-draw order
/// (cost, contest, signal).
#[derive(Debug, Clone, PartialEq)]
pub struct MarketShocks {
    draws: Vec<ShockDraw>,
}

impl MarketShocks {
    pub fn draw<R: Rng + ?Sized>(n_samples: usize, rng: &mut R) -> Self {
        let draws = (0..n_samples)
            .map(|_| {
                let cost: f64 = StandardNormal.sample(&mut *rng);
                let contest = rng.random::<f64>();
                let signal: f64 = StandardNormal.sample(&mut *rng);
                ShockDraw { cost, contest, signal }
            })
            .collect();
        MarketShocks { draws }
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn as_slice(&self) -> &[ShockDraw] {
        &self.draws
    }
}

/// How the espionage contest enters a value estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EspionageSampling {
    /// Weight each draw's success and failure markets by rho and 1 - rho
    #[default]
    Conditional,
    /// Branch on the draw's contest variable
    Sampled,
}

impl std::fmt::Display for EspionageSampling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conditional => f.write_str("conditional"),
            Self::Sampled => f.write_str("sampled"),
        }
    }
}

/// Stage-2 result as seen by the follower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Espionage {
    /// The follower prices on its prior
    Failed,
    /// The follower observes the leader's price plus noise of precision kappa;
    /// `signal_noise` is the standard-normal shock in that noise
    Succeeded { signal_noise: f64 },
}

/// Stage-4 prices, quantities and profits for one realized leader cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketOutcome {
    pub leader_cost: f64,
    pub follower_cost: f64,
    pub p_1: f64,
    pub p_2: f64,
    pub q_1: f64,
    pub q_2: f64,
    pub profit_1: f64,
    pub profit_2: f64,
}

impl MarketOutcome {
    /// Leader prices on its realized cost. On failed espionage the follower
    /// prices on the prior `a + mu_c / 2`; on success on its posterior mean
    /// `(1 - kappa) * prior + kappa * signal`, whose spread around the prior
    /// is `kappa * (p_1 - prior)` plus noise of sd `sigma_c / 2 * sqrt(kappa (1 - kappa))`.
    pub fn at_cost(c_1: f64, espionage: Espionage, state: &DerivedState, params: &ParameterSet) -> Self {
        let (alpha, beta, delta) = (params.alpha(), params.beta(), params.delta());

        let p_1 = state.a + c_1 / 2.0;
        let prior_p_1 = state.a + params.mu_c() / 2.0;
        let expected_p_1 = match espionage {
            Espionage::Failed => prior_p_1,
            Espionage::Succeeded { signal_noise } => {
                let kappa = state.kappa;
                let noise_sd = 0.5 * params.sigma_c() * (kappa * (1.0 - kappa)).max(0.0).sqrt();
                prior_p_1 + kappa * (p_1 - prior_p_1) + noise_sd * signal_noise
            }
        };
        let p_2 = (alpha + beta * params.gamma() + delta * expected_p_1) / (2.0 * beta);

        Self::at_prices(c_1, p_1, p_2, params)
    }

    /// Market for one draw with the contest decided by the draw itself.
    pub fn realize(draw: &ShockDraw, state: &DerivedState, params: &ParameterSet) -> Self {
        Self::at_cost(draw.leader_cost(params), draw.espionage(state.rho), state, params)
    }

    /// Quantities and profits at given prices; the follower's cost is gamma.
    pub fn at_prices(c_1: f64, p_1: f64, p_2: f64, params: &ParameterSet) -> Self {
        let (alpha, beta, delta) = (params.alpha(), params.beta(), params.delta());
        let c_2 = params.gamma();
        let q_1 = demand(alpha, beta, delta, p_1, p_2);
        let q_2 = demand(alpha, beta, delta, p_2, p_1);

        MarketOutcome {
            leader_cost: c_1,
            follower_cost: c_2,
            p_1,
            p_2,
            q_1,
            q_2,
            profit_1: (p_1 - c_1) * q_1,
            profit_2: (p_2 - c_2) * q_2,
        }
    }

    /// 0.5 * (beta q_1^2 + 2 delta q_1 q_2 + beta q_2^2)
    pub fn consumer_surplus(&self, params: &ParameterSet) -> f64 {
        let (beta, delta) = (params.beta(), params.delta());
        0.5 * (beta * self.q_1 * self.q_1 + 2.0 * delta * self.q_1 * self.q_2 + beta * self.q_2 * self.q_2)
    }

    /// Largest gap between the demand-formula quantity at the reported prices
    /// and the quantity implied by profit / margin.
    pub fn demand_gap(&self, params: &ParameterSet) -> f64 {
        let (alpha, beta, delta) = (params.alpha(), params.beta(), params.delta());
        let sides = [
            (self.p_1, self.p_2, self.leader_cost, self.profit_1),
            (self.p_2, self.p_1, self.follower_cost, self.profit_2),
        ];
        sides
            .iter()
            .filter(|(p, _, c, _)| (p - c).abs() > f64::EPSILON)
            .map(|&(p, other, c, profit)| (demand(alpha, beta, delta, p, other) - profit / (p - c)).abs())
            .fold(0.0, f64::max)
    }
}

/// Linear demand, truncated at zero.
pub fn demand(alpha: f64, beta: f64, delta: f64, own_price: f64, rival_price: f64) -> f64 {
    (alpha - beta * own_price + delta * rival_price).max(0.0)
}

/// Sample-mean value functions at one investment pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueEstimate {
    pub v_1: f64,
    pub v_2: f64,
    pub standard_error_1: f64,
    pub standard_error_2: f64,
    pub consumer_surplus: f64,
    pub n_samples: usize,
}

impl ValueEstimate {
    pub fn value(&self, firm: Firm) -> f64 {
        match firm {
            Firm::Leader => self.v_1,
            Firm::Follower => self.v_2,
        }
    }

    /// U_i = V_i - 0.5 * kappa_i * I_i^2
    pub fn net_utility(&self, firm: Firm, investments: InvestmentPair, params: &ParameterSet) -> f64 {
        let own = match firm {
            Firm::Leader => investments.i_1,
            Firm::Follower => investments.i_2,
        };
        self.value(firm) - params.investment_cost(firm, own)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DrawMoments {
    profit_1: RunningMoments,
    profit_2: RunningMoments,
    surplus: RunningMoments,
}

impl DrawMoments {
    fn merge(&mut self, other: &DrawMoments) {
        self.profit_1.merge(&other.profit_1);
        self.profit_2.merge(&other.profit_2);
        self.surplus.merge(&other.surplus);
    }
}

/// Monte Carlo oracle for V_1 and V_2.
#[derive(Debug, Clone, Copy)]
pub struct MonteCarloValueEstimator<'a> {
    evaluator: DerivedQuantityEvaluator<'a>,
    fixed_point_check: Option<FixedPointSolver>,
    parallel_draws: bool,
    sampling: EspionageSampling,
}

impl<'a> MonteCarloValueEstimator<'a> {
    pub fn new(params: &'a ParameterSet) -> Self {
        MonteCarloValueEstimator {
            evaluator: DerivedQuantityEvaluator::new(params),
            fixed_point_check: None,
            parallel_draws: false,
            sampling: EspionageSampling::default(),
        }
    }

    /// Confirm every intercept by iteration before using it.
    pub fn with_fixed_point_check(mut self, solver: Option<FixedPointSolver>) -> Self {
        self.fixed_point_check = solver;
        self
    }

    pub fn with_parallel_draws(mut self, parallel: bool) -> Self {
        self.parallel_draws = parallel;
        self
    }

    pub fn with_sampling(mut self, sampling: EspionageSampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn params(&self) -> &'a ParameterSet {
        self.evaluator.params()
    }

    /// Derived quantities at `investments`, confirmed by the fixed-point
    /// solver when checking is enabled. A divergence carries `investments`.
    pub fn derive(&self, investments: InvestmentPair) -> Result<DerivedState, ModelError> {
        let state = self.evaluator.evaluate(investments)?;
        if let Some(solver) = &self.fixed_point_check {
            let terms = InterceptTerms {
                b: state.b,
                numerator: state.numerator,
                denominator: state.denominator,
            };
            solver
                .check_against(state.a, state.rho, state.kappa, &terms, self.params())
                .map_err(|err| err.at_investments(investments))?;
        }
        Ok(state)
    }

    /// Estimate V_1 and V_2 on a given block of draws.
    ///
    /// The intercept does not depend on the realized cost, so it is derived
    /// once and shared by every draw.
    pub fn estimate(&self, investments: InvestmentPair, shocks: &MarketShocks) -> Result<ValueEstimate, ModelError> {
        let state = self.derive(investments)?;
        let params = self.params();
        let sampling = self.sampling;

        let accumulate = |chunk: &[ShockDraw]| {
            let mut moments = DrawMoments::default();
            for draw in chunk {
                let (profit_1, profit_2, surplus) = match sampling {
                    EspionageSampling::Sampled => {
                        let outcome = MarketOutcome::realize(draw, &state, params);
                        (outcome.profit_1, outcome.profit_2, outcome.consumer_surplus(params))
                    }
                    EspionageSampling::Conditional => {
                        let c_1 = draw.leader_cost(params);
                        let failed = MarketOutcome::at_cost(c_1, Espionage::Failed, &state, params);
                        let succeeded = MarketOutcome::at_cost(
                            c_1,
                            Espionage::Succeeded {
                                signal_noise: draw.signal,
                            },
                            &state,
                            params,
                        );
                        let weigh = |fail: f64, success: f64| (1.0 - state.rho) * fail + state.rho * success;
                        (
                            weigh(failed.profit_1, succeeded.profit_1),
                            weigh(failed.profit_2, succeeded.profit_2),
                            weigh(failed.consumer_surplus(params), succeeded.consumer_surplus(params)),
                        )
                    }
                };
                moments.profit_1.push(profit_1);
                moments.profit_2.push(profit_2);
                moments.surplus.push(surplus);
            }
            moments
        };

        let partials: Vec<DrawMoments> = if self.parallel_draws {
            shocks.as_slice().par_chunks(DRAW_CHUNK).map(accumulate).collect()
        } else {
            shocks.as_slice().chunks(DRAW_CHUNK).map(accumulate).collect()
        };

        let mut total = DrawMoments::default();
        for partial in &partials {
            total.merge(partial);
        }

        Ok(ValueEstimate {
            v_1: total.profit_1.mean(),
            v_2: total.profit_2.mean(),
            standard_error_1: total.profit_1.standard_error(),
            standard_error_2: total.profit_2.standard_error(),
            consumer_surplus: total.surplus.mean(),
            n_samples: shocks.len(),
        })
    }

    /// Draw `n_samples` fresh shocks from `rng` and estimate on them.
    pub fn estimate_fresh<R: Rng + ?Sized>(
        &self,
        investments: InvestmentPair,
        n_samples: usize,
        rng: &mut R,
    ) -> Result<ValueEstimate, ModelError> {
        let shocks = MarketShocks::draw(n_samples, rng);
        self.estimate(investments, &shocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterValues;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Expected profits without demand truncation. With e = p_1 - prior and d
    /// the follower's revision of its expected leader price,
    /// E[e^2] = sigma_c^2 / 4 and E[e d] = E[d^2] = rho * kappa * sigma_c^2 / 4.
    fn analytic_values(state: &DerivedState, params: &ParameterSet) -> (f64, f64) {
        let (beta, delta) = (params.beta(), params.delta());
        let tau2 = params.sigma_c() * params.sigma_c() / 4.0;
        let x = state.information();
        let mean = MarketOutcome::at_cost(params.mu_c(), Espionage::Failed, state, params);

        let v_1 = mean.profit_1 + beta * tau2 - delta * delta / (2.0 * beta) * x * tau2;
        let v_2 = mean.profit_2 + delta * delta / (4.0 * beta) * x * tau2;
        (v_1, v_2)
    }

    fn baseline_state(i_1: f64, i_2: f64) -> (ParameterSet, DerivedState) {
        let params = ParameterSet::baseline();
        let state = DerivedQuantityEvaluator::new(&params)
            .evaluate(InvestmentPair::new(i_1, i_2))
            .unwrap();
        (params, state)
    }

    #[test]
    fn failed_espionage_means_follower_ignores_cost() {
        let (params, state) = baseline_state(0.5, 3.0);

        let low = MarketOutcome::at_cost(20.0, Espionage::Failed, &state, &params);
        let high = MarketOutcome::at_cost(60.0, Espionage::Failed, &state, &params);
        assert_eq!(low.p_2, high.p_2);
        assert!(low.p_1 < high.p_1);
    }

    #[test]
    fn informed_follower_tracks_leader_cost() {
        let (params, state) = baseline_state(0.0, 5.0);
        let clean = Espionage::Succeeded { signal_noise: 0.0 };

        let low = MarketOutcome::at_cost(20.0, clean, &state, &params);
        let high = MarketOutcome::at_cost(60.0, clean, &state, &params);
        assert!(low.p_2 < high.p_2);

        // kappa = 1/2 at I_2 = I_bar: the revision is half the leader's deviation.
        let prior_p_2 = MarketOutcome::at_cost(20.0, Espionage::Failed, &state, &params).p_2;
        let revision = (state.kappa * (low.p_1 - (state.a + params.mu_c() / 2.0))) * params.delta() / (2.0 * params.beta());
        assert_relative_eq!(low.p_2 - prior_p_2, revision, epsilon = 1e-12);
    }

    #[test]
    fn signal_noise_moves_only_the_follower() {
        let (params, state) = baseline_state(0.5, 3.0);

        let clean = MarketOutcome::at_cost(40.0, Espionage::Succeeded { signal_noise: 0.0 }, &state, &params);
        let noisy = MarketOutcome::at_cost(40.0, Espionage::Succeeded { signal_noise: 1.0 }, &state, &params);
        assert_eq!(clean.p_1, noisy.p_1);
        assert!(noisy.p_2 > clean.p_2);
    }

    #[test]
    fn contest_draw_decides_success() {
        let draw = ShockDraw {
            cost: 0.0,
            contest: 0.3,
            signal: -0.7,
        };
        assert_eq!(draw.espionage(0.31), Espionage::Succeeded { signal_noise: -0.7 });
        assert_eq!(draw.espionage(0.3), Espionage::Failed);
        assert_eq!(draw.espionage(0.0), Espionage::Failed);
    }

    #[test]
    fn shock_block_is_reproducible() {
        let a = MarketShocks::draw(100, &mut StdRng::seed_from_u64(12));
        let b = MarketShocks::draw(100, &mut StdRng::seed_from_u64(12));
        assert_eq!(a, b);
        assert!(a.as_slice().iter().all(|d| (0.0..1.0).contains(&d.contest)));
    }

    #[test]
    fn reported_prices_satisfy_demand() {
        let (params, state) = baseline_state(1.0, 2.0);
        for &c_1 in &[0.0, 25.0, 40.0, 70.0, 120.0] {
            for espionage in [Espionage::Failed, Espionage::Succeeded { signal_noise: 1.5 }] {
                let outcome = MarketOutcome::at_cost(c_1, espionage, &state, &params);
                assert!(outcome.demand_gap(&params) < 1e-9);
                assert!(outcome.q_1 >= 0.0 && outcome.q_2 >= 0.0);
            }
        }
    }

    #[test]
    fn degenerate_costs_give_exact_values() {
        let params = ParameterValues {
            sigma_c: 0.0,
            ..Default::default()
        }
        .validate()
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let pair = InvestmentPair::new(1.0, 1.0);

        for sampling in [EspionageSampling::Conditional, EspionageSampling::Sampled] {
            let estimator = MonteCarloValueEstimator::new(&params).with_sampling(sampling);
            let estimate = estimator.estimate_fresh(pair, 500, &mut rng).unwrap();
            let state = estimator.derive(pair).unwrap();
            let outcome = MarketOutcome::at_cost(params.mu_c(), Espionage::Failed, &state, &params);

            assert_relative_eq!(estimate.v_1, outcome.profit_1, epsilon = 1e-9);
            assert_relative_eq!(estimate.v_2, outcome.profit_2, epsilon = 1e-9);
            assert_abs_diff_eq!(estimate.standard_error_1, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(estimate.standard_error_2, 0.0, epsilon = 1e-9);
            assert_eq!(estimate.n_samples, 500);
        }
    }

    #[test]
    fn estimate_is_unbiased_without_truncation() {
        let params = ParameterValues {
            sigma_c: 5.0,
            ..Default::default()
        }
        .validate()
        .unwrap();
        let pair = InvestmentPair::new(0.5, 2.0);

        for sampling in [EspionageSampling::Conditional, EspionageSampling::Sampled] {
            let estimator = MonteCarloValueEstimator::new(&params).with_sampling(sampling);
            let state = estimator.derive(pair).unwrap();
            let (v_1, v_2) = analytic_values(&state, &params);

            let mut rng = StdRng::seed_from_u64(2024);
            let estimate = estimator.estimate_fresh(pair, 20_000, &mut rng).unwrap();

            assert!((estimate.v_1 - v_1).abs() < 4.0 * estimate.standard_error_1, "{}", sampling);
            assert!((estimate.v_2 - v_2).abs() < 4.0 * estimate.standard_error_2, "{}", sampling);
        }
    }

    #[test]
    fn sampling_modes_agree_without_espionage() {
        let params = ParameterSet::baseline();
        let shocks = MarketShocks::draw(2000, &mut StdRng::seed_from_u64(31));
        let pair = InvestmentPair::new(1.0, 0.0);

        let conditional = MonteCarloValueEstimator::new(&params).estimate(pair, &shocks).unwrap();
        let sampled = MonteCarloValueEstimator::new(&params)
            .with_sampling(EspionageSampling::Sampled)
            .estimate(pair, &shocks)
            .unwrap();
        assert_eq!(conditional, sampled);
    }

    #[test]
    fn sampling_modes_agree_in_expectation() {
        let params = ParameterSet::baseline();
        let shocks = MarketShocks::draw(20_000, &mut StdRng::seed_from_u64(8));
        let pair = InvestmentPair::new(0.5, 3.0);

        let conditional = MonteCarloValueEstimator::new(&params).estimate(pair, &shocks).unwrap();
        let sampled = MonteCarloValueEstimator::new(&params)
            .with_sampling(EspionageSampling::Sampled)
            .estimate(pair, &shocks)
            .unwrap();
        assert!((conditional.v_1 - sampled.v_1).abs() < 4.0 * sampled.standard_error_1);
        assert!((conditional.v_2 - sampled.v_2).abs() < 4.0 * sampled.standard_error_2);
    }

    #[test]
    fn standard_error_shrinks_with_samples() {
        let params = ParameterSet::baseline();
        let estimator = MonteCarloValueEstimator::new(&params);
        let pair = InvestmentPair::new(1.0, 1.5);

        let mut rng = StdRng::seed_from_u64(9);
        let small = estimator.estimate_fresh(pair, 400, &mut rng).unwrap();
        let large = estimator.estimate_fresh(pair, 40_000, &mut rng).unwrap();

        let ratio = small.standard_error_1 / large.standard_error_1;
        assert!(ratio > 7.0 && ratio < 13.0, "ratio = {}", ratio);
    }

    #[test]
    fn common_shocks_give_identical_estimates() {
        let params = ParameterSet::baseline();
        let estimator = MonteCarloValueEstimator::new(&params);
        let mut rng = StdRng::seed_from_u64(5);
        let shocks = MarketShocks::draw(3000, &mut rng);
        let pair = InvestmentPair::new(0.8, 1.6);

        let first = estimator.estimate(pair, &shocks).unwrap();
        let second = estimator.estimate(pair, &shocks).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parallel_reduction_is_bit_identical() {
        let params = ParameterSet::baseline();
        let mut rng = StdRng::seed_from_u64(11);
        let shocks = MarketShocks::draw(3 * DRAW_CHUNK + 17, &mut rng);
        let pair = InvestmentPair::new(0.8, 1.6);

        for sampling in [EspionageSampling::Conditional, EspionageSampling::Sampled] {
            let sequential = MonteCarloValueEstimator::new(&params)
                .with_sampling(sampling)
                .estimate(pair, &shocks)
                .unwrap();
            let parallel = MonteCarloValueEstimator::new(&params)
                .with_sampling(sampling)
                .with_parallel_draws(true)
                .estimate(pair, &shocks)
                .unwrap();
            assert_eq!(sequential, parallel);
        }
    }

    #[test]
    fn fixed_point_check_does_not_change_values() {
        let params = ParameterSet::baseline();
        let mut rng = StdRng::seed_from_u64(3);
        let shocks = MarketShocks::draw(1000, &mut rng);
        let pair = InvestmentPair::new(2.0, 3.0);

        let plain = MonteCarloValueEstimator::new(&params).estimate(pair, &shocks).unwrap();
        let checked = MonteCarloValueEstimator::new(&params)
            .with_fixed_point_check(Some(FixedPointSolver::default()))
            .estimate(pair, &shocks)
            .unwrap();
        assert_eq!(plain, checked);
    }

    #[test]
    fn divergence_in_derive_names_the_investments() {
        let params = ParameterSet::baseline();
        let pair = InvestmentPair::new(0.75, 2.5);
        let estimator =
            MonteCarloValueEstimator::new(&params).with_fixed_point_check(Some(FixedPointSolver::new(1e-12, 1)));

        match estimator.derive(pair) {
            Err(err @ ModelError::FixedPointDivergence { .. }) => {
                assert!(matches!(
                    err,
                    ModelError::FixedPointDivergence {
                        investments: Some(p),
                        ..
                    } if p == pair
                ));
                assert!(err.to_string().contains("I_1 = 0.75, I_2 = 2.5"));
            }
            other => panic!("expected divergence, got {:?}", other),
        }
    }

    #[test]
    fn net_utility_subtracts_quadratic_cost() {
        let params = ParameterSet::baseline();
        let estimate = ValueEstimate {
            v_1: 100.0,
            v_2: 50.0,
            standard_error_1: 0.0,
            standard_error_2: 0.0,
            consumer_surplus: 0.0,
            n_samples: 1,
        };
        let pair = InvestmentPair::new(2.0, 4.0);
        assert_abs_diff_eq!(estimate.net_utility(Firm::Leader, pair, &params), 99.0);
        assert_abs_diff_eq!(estimate.net_utility(Firm::Follower, pair, &params), 46.0);
    }
}
