//! Marginal analysis around a solved investment pair.
//!
//! - welfare: dW/dI_2 split into consumer surplus, the leader's value and the
//!   follower's net utility
//! - strategic interaction: cross partials of rho, V_1 and V_2 in (I_1, I_2)
//! - effects: profits with simultaneous pricing, with sequential pricing but no
//!   espionage, and in the full game
//!
//! Every finite difference evaluates all of its points on one block of draws,
//! the same way the KKT verifier does.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::analysis::RunningMoments;
use crate::config::SolverConfig;
use crate::derived::{DerivedQuantityEvaluator, InvestmentPair};
use crate::error::ModelError;
use crate::monte_carlo::{MarketOutcome, MarketShocks, MonteCarloValueEstimator, ValueEstimate};
use crate::params::{Firm, ParameterSet};

/// Contest and signal channels of espionage at one investment pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EspionageChannels {
    pub rho: f64,
    pub d_rho_d_i_2: f64,
    pub kappa: f64,
    pub d_kappa_d_i_2: f64,
}

impl EspionageChannels {
    /// d(rho kappa)/dI_2
    pub fn information_slope(&self) -> f64 {
        self.d_rho_d_i_2 * self.kappa + self.rho * self.d_kappa_d_i_2
    }
}

/// dW/dI_2 = dCS/dI_2 + dV_1/dI_2 + (dV_2/dI_2 - kappa_2 I_2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WelfareDecomposition {
    pub investments: InvestmentPair,
    pub marginal_consumer_surplus: f64,
    pub marginal_leader_value: f64,
    pub marginal_follower_value: f64,
    /// kappa_2 * I_2
    pub marginal_cost_2: f64,
    pub marginal_follower_utility: f64,
    pub marginal_welfare: f64,
    pub channels: EspionageChannels,
}

impl WelfareDecomposition {
    /// More espionage at the margin lowers welfare.
    pub fn espionage_is_excessive(&self) -> bool {
        self.marginal_welfare < 0.0
    }

    pub fn print_summary(&self) {
        println!(
            "Welfare decomposition at I_1 = {:.4}, I_2 = {:.4}:",
            self.investments.i_1, self.investments.i_2
        );
        println!("  dCS/dI_2          = {:>10.4}", self.marginal_consumer_surplus);
        println!("  dV_1/dI_2         = {:>10.4}", self.marginal_leader_value);
        println!(
            "  dU_2/dI_2         = {:>10.4}  (dV_2/dI_2 {:.4} - kappa_2 I_2 {:.4})",
            self.marginal_follower_utility, self.marginal_follower_value, self.marginal_cost_2
        );
        println!(
            "  dW/dI_2           = {:>10.4}  ({})",
            self.marginal_welfare,
            if self.espionage_is_excessive() { "excessive" } else { "insufficient" }
        );
        let c = &self.channels;
        println!(
            "  channels: rho = {:.4}, drho/dI_2 = {:.4}, kappa = {:.4}, dkappa/dI_2 = {:.4}, d(rho kappa)/dI_2 = {:.4}",
            c.rho,
            c.d_rho_d_i_2,
            c.kappa,
            c.d_kappa_d_i_2,
            c.information_slope()
        );
    }
}

/// Cross partials in (I_1, I_2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategicInteraction {
    pub investments: InvestmentPair,
    /// Closed-form d^2 rho / dI_1 dI_2
    pub rho_cross_partial: f64,
    /// Four-point stencil of the same quantity
    pub rho_cross_partial_numeric: f64,
    /// I_2 at which the rho cross partial changes sign, given I_1
    pub threshold_i_2: f64,
    pub leader_cross_partial: f64,
    pub follower_cross_partial: f64,
}

impl StrategicInteraction {
    /// Defense raises the marginal success of espionage.
    pub fn complements(&self) -> bool {
        self.rho_cross_partial > 0.0
    }

    pub fn print_summary(&self) {
        println!(
            "Strategic interaction at I_1 = {:.4}, I_2 = {:.4}:",
            self.investments.i_1, self.investments.i_2
        );
        println!(
            "  d2rho/dI_1dI_2 = {:.5} (stencil {:.5}), {}; sign flips at I_2 = {:.4}",
            self.rho_cross_partial,
            self.rho_cross_partial_numeric,
            if self.complements() { "complements" } else { "substitutes" },
            self.threshold_i_2
        );
        println!(
            "  d2V_1/dI_1dI_2 = {:.5}, d2V_2/dI_1dI_2 = {:.5}",
            self.leader_cross_partial, self.follower_cross_partial
        );
    }
}

/// Expected gross profit of one firm in the three games.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FirmEffects {
    /// Simultaneous pricing, no espionage
    pub simultaneous: f64,
    /// Leader moves first, no espionage (rho kappa = 0)
    pub sequential: f64,
    /// Leader moves first, espionage at the given investments
    pub full: f64,
}

impl FirmEffects {
    pub fn sequential_effect(&self) -> f64 {
        self.sequential - self.simultaneous
    }

    /// Value of the information the follower steals
    pub fn information_effect(&self) -> f64 {
        self.full - self.sequential
    }

    pub fn total_gain(&self) -> f64 {
        self.full - self.simultaneous
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectDecomposition {
    pub investments: InvestmentPair,
    pub leader: FirmEffects,
    pub follower: FirmEffects,
}

impl EffectDecomposition {
    pub fn firm(&self, firm: Firm) -> &FirmEffects {
        match firm {
            Firm::Leader => &self.leader,
            Firm::Follower => &self.follower,
        }
    }

    pub fn print_summary(&self) {
        println!(
            "Effect decomposition at I_1 = {:.4}, I_2 = {:.4}:",
            self.investments.i_1, self.investments.i_2
        );
        println!(
            "  {:<10} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "Firm", "Simultaneous", "Sequential", "Full", "Leadership", "Information"
        );
        for firm in [Firm::Leader, Firm::Follower] {
            let e = self.firm(firm);
            println!(
                "  {:<10} {:>12.3} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
                firm.to_string(),
                e.simultaneous,
                e.sequential,
                e.full,
                e.sequential_effect(),
                e.information_effect()
            );
        }
    }
}

/// All three analyses at one point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketDecomposition {
    pub welfare: WelfareDecomposition,
    pub interaction: StrategicInteraction,
    pub effects: EffectDecomposition,
}

impl MarketDecomposition {
    pub fn print_summary(&self) {
        self.welfare.print_summary();
        println!();
        self.interaction.print_summary();
        println!();
        self.effects.print_summary();
    }
}

pub struct DecompositionAnalyzer<'a> {
    params: &'a ParameterSet,
    evaluator: DerivedQuantityEvaluator<'a>,
    estimator: MonteCarloValueEstimator<'a>,
    step: f64,
}

impl<'a> DecompositionAnalyzer<'a> {
    pub fn new(params: &'a ParameterSet, config: &SolverConfig) -> Self {
        DecompositionAnalyzer {
            params,
            evaluator: DerivedQuantityEvaluator::new(params),
            estimator: MonteCarloValueEstimator::new(params)
                .with_parallel_draws(config.parallel_draws)
                .with_sampling(config.espionage_sampling),
            step: config.fd_step * params.i_bar(),
        }
    }

    /// Finite-difference points around `x`, clamped to [0, I_bar]
    fn bracket(&self, x: f64) -> (f64, f64) {
        ((x - self.step).max(0.0), (x + self.step).min(self.params.i_bar()))
    }

    fn values(&self, i_1: f64, i_2: f64, shocks: &MarketShocks) -> Result<ValueEstimate, ModelError> {
        self.estimator.estimate(InvestmentPair::new(i_1, i_2), shocks)
    }

    pub fn welfare(&self, investments: InvestmentPair, shocks: &MarketShocks) -> Result<WelfareDecomposition, ModelError> {
        let (lo, hi) = self.bracket(investments.i_2);
        let up = self.values(investments.i_1, hi, shocks)?;
        let down = self.values(investments.i_1, lo, shocks)?;
        let slope = |f: fn(&ValueEstimate) -> f64| (f(&up) - f(&down)) / (hi - lo);

        let marginal_consumer_surplus = slope(|v| v.consumer_surplus);
        let marginal_leader_value = slope(|v| v.v_1);
        let marginal_follower_value = slope(|v| v.v_2);
        let marginal_cost_2 = self.params.cost_coefficient(Firm::Follower) * investments.i_2;
        let marginal_follower_utility = marginal_follower_value - marginal_cost_2;

        let slopes = self.evaluator.contest_slopes(investments.i_1, investments.i_2);
        let channels = EspionageChannels {
            rho: self.evaluator.contest_success(investments.i_1, investments.i_2),
            d_rho_d_i_2: slopes.d_rho_d_i_2,
            kappa: self.evaluator.signal_precision(investments.i_2),
            d_kappa_d_i_2: self.evaluator.signal_precision_slope(investments.i_2),
        };

        Ok(WelfareDecomposition {
            investments,
            marginal_consumer_surplus,
            marginal_leader_value,
            marginal_follower_value,
            marginal_cost_2,
            marginal_follower_utility,
            marginal_welfare: marginal_consumer_surplus + marginal_leader_value + marginal_follower_utility,
            channels,
        })
    }

    pub fn interaction(&self, investments: InvestmentPair, shocks: &MarketShocks) -> Result<StrategicInteraction, ModelError> {
        let (lo_1, hi_1) = self.bracket(investments.i_1);
        let (lo_2, hi_2) = self.bracket(investments.i_2);
        let area = (hi_1 - lo_1) * (hi_2 - lo_2);
        let stencil = |f: &dyn Fn(f64, f64) -> f64| (f(hi_1, hi_2) - f(hi_1, lo_2) - f(lo_1, hi_2) + f(lo_1, lo_2)) / area;

        let rho_cross_partial_numeric = stencil(&|i_1: f64, i_2: f64| self.evaluator.contest_success(i_1, i_2));

        let corners = [
            self.values(hi_1, hi_2, shocks)?,
            self.values(hi_1, lo_2, shocks)?,
            self.values(lo_1, hi_2, shocks)?,
            self.values(lo_1, lo_2, shocks)?,
        ];
        let cross = |firm: Firm| {
            let v = corners.map(|c| c.value(firm));
            (v[0] - v[1] - v[2] + v[3]) / area
        };

        Ok(StrategicInteraction {
            investments,
            rho_cross_partial: self.evaluator.contest_slopes(investments.i_1, investments.i_2).cross,
            rho_cross_partial_numeric,
            threshold_i_2: self.evaluator.interaction_threshold(investments.i_1),
            leader_cross_partial: cross(Firm::Leader),
            follower_cross_partial: cross(Firm::Follower),
        })
    }

    /// Closed-form d^2 rho / dI_1 dI_2 on a grid, rows indexed by I_1.
    pub fn interaction_map(&self, grid_1: &[f64], grid_2: &[f64]) -> Vec<Vec<f64>> {
        grid_1
            .iter()
            .map(|&i_1| {
                grid_2
                    .iter()
                    .map(|&i_2| self.evaluator.contest_slopes(i_1, i_2).cross)
                    .collect()
            })
            .collect()
    }

    /// Bayesian Nash prices when both firms set prices at once and nobody
    /// spies: (mean leader price, follower price).
    pub fn simultaneous_prices(&self) -> (f64, f64) {
        let p = self.params;
        let (alpha, beta, delta) = (p.alpha(), p.beta(), p.delta());
        let leader_base = alpha + beta * p.mu_c();
        let follower_base = alpha + beta * p.gamma();
        let det = 4.0 * beta * beta - delta * delta;
        (
            (2.0 * beta * leader_base + delta * follower_base) / det,
            (2.0 * beta * follower_base + delta * leader_base) / det,
        )
    }

    pub fn effects(&self, investments: InvestmentPair, shocks: &MarketShocks) -> Result<EffectDecomposition, ModelError> {
        let (mean_p_1, p_2) = self.simultaneous_prices();
        let mu_c = self.params.mu_c();
        let mut profit_1 = RunningMoments::new();
        let mut profit_2 = RunningMoments::new();
        for draw in shocks.as_slice() {
            let c_1 = draw.leader_cost(self.params);
            let outcome = MarketOutcome::at_prices(c_1, mean_p_1 + (c_1 - mu_c) / 2.0, p_2, self.params);
            profit_1.push(outcome.profit_1);
            profit_2.push(outcome.profit_2);
        }

        // rho = 0 without espionage, so the follower always prices on its prior.
        let sequential = self.values(investments.i_1, 0.0, shocks)?;
        let full = self.values(investments.i_1, investments.i_2, shocks)?;

        Ok(EffectDecomposition {
            investments,
            leader: FirmEffects {
                simultaneous: profit_1.mean(),
                sequential: sequential.v_1,
                full: full.v_1,
            },
            follower: FirmEffects {
                simultaneous: profit_2.mean(),
                sequential: sequential.v_2,
                full: full.v_2,
            },
        })
    }

    pub fn decompose(&self, investments: InvestmentPair, shocks: &MarketShocks) -> Result<MarketDecomposition, ModelError> {
        Ok(MarketDecomposition {
            welfare: self.welfare(investments, shocks)?,
            interaction: self.interaction(investments, shocks)?,
            effects: self.effects(investments, shocks)?,
        })
    }
}

/// Decompose at `investments` on `config.n_samples` draws seeded from `config.seed`.
pub fn decompose_equilibrium(
    params: &ParameterSet,
    config: &SolverConfig,
    investments: InvestmentPair,
) -> Result<MarketDecomposition, ModelError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let shocks = MarketShocks::draw(config.n_samples, &mut rng);
    DecompositionAnalyzer::new(params, config).decompose(investments, &shocks)
}
