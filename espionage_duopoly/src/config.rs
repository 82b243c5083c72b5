//! Solver settings and TOML run configuration.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ModelError};
use crate::fixed_point::FixedPointSolver;
use crate::monte_carlo::EspionageSampling;
use crate::nash::Formulation;
use crate::params::{ParameterSet, ParameterValues};

/// Numerical settings for one equilibrium solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Monte Carlo draws per value estimate
    pub n_samples: usize,
    /// Seed of the single random stream used by the whole solve
    pub seed: u64,
    pub fixed_point_tol: f64,
    pub fixed_point_max_iter: usize,
    pub nash_tol: f64,
    pub nash_max_iter: usize,
    /// Advisory threshold on the largest KKT residual
    pub kkt_tol: f64,
    /// Finite-difference step as a fraction of I_bar
    pub fd_step: f64,
    pub formulation: Formulation,
    /// Weight or sample the espionage contest in each draw
    pub espionage_sampling: EspionageSampling,
    /// Iterate the pricing recursion on every objective evaluation
    pub check_fixed_point: bool,
    /// Reduce Monte Carlo draws across the rayon pool
    pub parallel_draws: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            n_samples: 20_000,
            seed: 42,
            fixed_point_tol: 1e-6,
            fixed_point_max_iter: 100,
            nash_tol: 1e-8,
            nash_max_iter: 1000,
            kkt_tol: 1e-3,
            fd_step: 1e-3,
            formulation: Formulation::JointSurplus,
            espionage_sampling: EspionageSampling::Conditional,
            check_fixed_point: false,
            parallel_draws: false,
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidConfig {
            field,
            reason: format!("must be positive and finite, got {}", value),
        })
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_samples < 2 {
            return Err(ModelError::InvalidConfig {
                field: "n_samples",
                reason: format!("need at least 2 draws for a standard error, got {}", self.n_samples),
            });
        }
        positive("fixed_point_tol", self.fixed_point_tol)?;
        positive("nash_tol", self.nash_tol)?;
        positive("kkt_tol", self.kkt_tol)?;
        positive("fd_step", self.fd_step)?;
        if self.fd_step >= 0.5 {
            return Err(ModelError::InvalidConfig {
                field: "fd_step",
                reason: format!("must be below 0.5 of I_bar, got {}", self.fd_step),
            });
        }
        if self.fixed_point_max_iter == 0 {
            return Err(ModelError::InvalidConfig {
                field: "fixed_point_max_iter",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.nash_max_iter == 0 {
            return Err(ModelError::InvalidConfig {
                field: "nash_max_iter",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn fixed_point_solver(&self) -> FixedPointSolver {
        FixedPointSolver::new(self.fixed_point_tol, self.fixed_point_max_iter)
    }

    pub fn with_seed(self, seed: u64) -> Self {
        SolverConfig { seed, ..self }
    }

    pub fn with_samples(self, n_samples: usize) -> Self {
        SolverConfig { n_samples, ..self }
    }

    pub fn with_formulation(self, formulation: Formulation) -> Self {
        SolverConfig { formulation, ..self }
    }

    pub fn with_sampling(self, espionage_sampling: EspionageSampling) -> Self {
        SolverConfig {
            espionage_sampling,
            ..self
        }
    }
}

/// A structural parameter that a comparative-statics sweep can vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    Alpha,
    Beta,
    Delta,
    Gamma,
    #[serde(rename = "kappa_1")]
    Kappa1,
    #[serde(rename = "kappa_2")]
    Kappa2,
    MuC,
    SigmaC,
    Epsilon,
    GammaExponent,
    LambdaDefense,
    Iota,
    #[serde(rename = "I_bar")]
    IBar,
}

impl SweepParameter {
    pub fn apply(self, values: &mut ParameterValues, value: f64) {
        match self {
            SweepParameter::Alpha => values.alpha = value,
            SweepParameter::Beta => values.beta = value,
            SweepParameter::Delta => values.delta = value,
            SweepParameter::Gamma => values.gamma = value,
            SweepParameter::Kappa1 => values.kappa_1 = value,
            SweepParameter::Kappa2 => values.kappa_2 = value,
            SweepParameter::MuC => values.mu_c = value,
            SweepParameter::SigmaC => values.sigma_c = value,
            SweepParameter::Epsilon => values.epsilon = value,
            SweepParameter::GammaExponent => values.gamma_exponent = value,
            SweepParameter::LambdaDefense => values.lambda_defense = value,
            SweepParameter::Iota => values.iota = value,
            SweepParameter::IBar => values.i_bar = value,
        }
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Delta => "delta",
            Self::Gamma => "gamma",
            Self::Kappa1 => "kappa_1",
            Self::Kappa2 => "kappa_2",
            Self::MuC => "mu_c",
            Self::SigmaC => "sigma_c",
            Self::Epsilon => "epsilon",
            Self::GammaExponent => "gamma_exponent",
            Self::LambdaDefense => "lambda_defense",
            Self::Iota => "iota",
            Self::IBar => "I_bar",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    pub parameter: SweepParameter,
    pub values: Vec<f64>,
}

/// Top-level run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub name: String,
    pub parameters: ParameterValues,
    pub solver: SolverConfig,
    pub sweep: Option<SweepConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            name: "baseline".to_string(),
            parameters: ParameterValues::default(),
            solver: SolverConfig::default(),
            sweep: None,
        }
    }
}

impl RunConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(source)?;
        config.parameter_set()?;
        config.solver.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn parameter_set(&self) -> Result<ParameterSet, ModelError> {
        ParameterSet::new(self.parameters)
    }
}
