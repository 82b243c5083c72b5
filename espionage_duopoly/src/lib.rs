//! Espionage Duopoly Equilibrium Engine
//!
//! A four-stage Bertrand–Stackelberg duopoly. The leader privately knows its
//! marginal cost; the follower may buy information about it through espionage
//! while the leader invests in defense.
//!
//! Stages:
//! - 1: simultaneous investments I_1 (defense) and I_2 (espionage)
//! - 2: espionage succeeds with probability rho(I_1, I_2)
//! - 3: a successful signal carries precision kappa(I_2)
//! - 4: price competition; the leader knows its cost, the follower prices on
//!   its prior or, after a successful theft, on the noisy signal
//!
//! Solve pipeline: [`ParameterSet`] → [`NashInvestmentSolver`] →
//! [`MonteCarloValueEstimator`] → [`FixedPointSolver`] /
//! [`DerivedQuantityEvaluator`], then [`EquilibriumVerifier`] once on the
//! optimum. [`DecompositionAnalyzer`] splits welfare, interaction and profit
//! effects around a solved point.

pub mod analysis;
pub mod config;
pub mod decomposition;
pub mod derived;
pub mod error;
pub mod fixed_point;
pub mod monte_carlo;
pub mod nash;
pub mod optimizer;
pub mod params;
pub mod scenarios;
pub mod solution;
pub mod verifier;

pub use config::{RunConfig, SolverConfig, SweepConfig, SweepParameter};
pub use decomposition::{decompose_equilibrium, DecompositionAnalyzer, MarketDecomposition};
pub use derived::{DerivedQuantityEvaluator, DerivedState, InvestmentPair};
pub use error::{ConfigError, ModelError};
pub use fixed_point::{FixedPointSolution, FixedPointSolver};
pub use monte_carlo::{
    Espionage, EspionageSampling, MarketOutcome, MarketShocks, MonteCarloValueEstimator, ShockDraw, ValueEstimate,
};
pub use nash::{solve_equilibrium, Formulation, NashInvestmentSolver};
pub use params::{Firm, ParameterSet, ParameterValues};
pub use solution::{EquilibriumReport, EquilibriumSolution};
pub use verifier::{ConsistencyReport, EquilibriumVerifier, KktReport};
