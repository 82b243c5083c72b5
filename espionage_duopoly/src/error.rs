//! Error types for the equilibrium engine.
//!
//! Only parameter validation, configuration and fixed-point divergence halt a
//! solve. A stability violation is recoverable: the Nash solver converts it
//! into an infeasible-point penalty. Optimizer non-convergence and KKT residuals
//! are reported as data, never as errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::derived::InvestmentPair;

/// Which stability term left the valid domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityTerm {
    /// Effective demand slope faced by the leader
    Slope,
    /// Denominator of the closed-form intercept
    Denominator,
}

impl std::fmt::Display for StabilityTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StabilityTerm::Slope => write!(f, "B"),
            StabilityTerm::Denominator => write!(f, "denominator"),
        }
    }
}

/// Errors raised by the model, its solvers and its configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Parameter '{name}' = {value} is invalid: {reason}")]
    ParameterValidation {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Stability violation: {term} = {value} must be positive (rho = {rho}, kappa = {kappa})")]
    StabilityViolation {
        term: StabilityTerm,
        value: f64,
        rho: f64,
        kappa: f64,
    },

    #[error(
        "Fixed-point divergence{} at rho = {rho}, kappa = {kappa}: iterated intercept {iterated} \
         vs closed form {closed_form} after {iterations} iterations (step residual {residual})",
        investment_context(.investments)
    )]
    FixedPointDivergence {
        /// Investment pair that produced (rho, kappa), when known
        investments: Option<InvestmentPair>,
        rho: f64,
        kappa: f64,
        iterated: f64,
        closed_form: f64,
        iterations: usize,
        residual: f64,
    },

    #[error("Solver setting '{field}' is invalid: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
}

fn investment_context(investments: &Option<InvestmentPair>) -> String {
    match investments {
        Some(pair) => format!(" for I_1 = {}, I_2 = {}", pair.i_1, pair.i_2),
        None => String::new(),
    }
}

impl ModelError {
    /// Whether the error must abort the whole solve.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ModelError::StabilityViolation { .. })
    }

    /// Attach the investment pair to a fixed-point divergence; other errors
    /// pass through unchanged.
    pub fn at_investments(self, pair: InvestmentPair) -> Self {
        match self {
            ModelError::FixedPointDivergence {
                rho,
                kappa,
                iterated,
                closed_form,
                iterations,
                residual,
                ..
            } => ModelError::FixedPointDivergence {
                investments: Some(pair),
                rho,
                kappa,
                iterated,
                closed_form,
                iterations,
                residual,
            },
            other => other,
        }
    }
}

/// Errors raised while loading a run configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}
