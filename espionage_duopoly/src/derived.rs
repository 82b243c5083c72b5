//! Contest technology and the algebraic terms of the leader's pricing rule.
//!
//! Evaluation order is fixed by the signatures: investments give `psi_1`,
//! `rho` and `kappa`; only `(rho, kappa)` feed [`InterceptTerms`]; only the
//! terms feed the intercept `a`.

use serde::Serialize;

use crate::error::{ModelError, StabilityTerm};
use crate::params::ParameterSet;

/// Candidate investment levels (defense `i_1`, espionage `i_2`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvestmentPair {
    pub i_1: f64,
    pub i_2: f64,
}

impl InvestmentPair {
    pub fn new(i_1: f64, i_2: f64) -> Self {
        InvestmentPair { i_1, i_2 }
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.i_1, self.i_2]
    }

    pub fn from_array(x: [f64; 2]) -> Self {
        InvestmentPair { i_1: x[0], i_2: x[1] }
    }
}

/// Slope, numerator and denominator of the leader's intercept for one (rho, kappa).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterceptTerms {
    pub b: f64,
    pub numerator: f64,
    pub denominator: f64,
}

impl InterceptTerms {
    /// Closed-form fixed point a = numerator / denominator
    pub fn intercept(&self) -> f64 {
        self.numerator / self.denominator
    }
}

/// Partial derivatives of the contest success probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContestSlopes {
    pub d_rho_d_i_1: f64,
    pub d_rho_d_i_2: f64,
    /// d^2 rho / dI_1 dI_2
    pub cross: f64,
}

/// Everything derived from one investment pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedState {
    pub rho: f64,
    pub kappa: f64,
    pub b: f64,
    pub numerator: f64,
    pub denominator: f64,
    pub a: f64,
}

impl DerivedState {
    /// Probability-weighted information the follower prices on
    pub fn information(&self) -> f64 {
        self.rho * self.kappa
    }
}

/// Stateless evaluator of the contest, signal and intercept formulas.
#[derive(Debug, Clone, Copy)]
pub struct DerivedQuantityEvaluator<'a> {
    params: &'a ParameterSet,
}

impl<'a> DerivedQuantityEvaluator<'a> {
    pub fn new(params: &'a ParameterSet) -> Self {
        DerivedQuantityEvaluator { params }
    }

    pub fn params(&self) -> &'a ParameterSet {
        self.params
    }

    /// Leader's defense strength psi_1(I_1) = epsilon + I_1^gamma + lambda * I_1
    pub fn defense_strength(&self, i_1: f64) -> f64 {
        let p = self.params;
        p.epsilon() + i_1.max(0.0).powf(p.gamma_exponent()) + p.lambda_defense() * i_1.max(0.0)
    }

    /// Probability that the follower's espionage succeeds.
    pub fn contest_success(&self, i_1: f64, i_2: f64) -> f64 {
        let attack = i_2.max(0.0).powf(self.params.gamma_exponent());
        let defense = self.defense_strength(i_1);
        (attack / (attack + defense)).clamp(0.0, 1.0)
    }

    /// psi_1'(I_1) = gamma I_1^(gamma - 1) + lambda; unbounded at zero when gamma < 1
    pub fn defense_slope(&self, i_1: f64) -> f64 {
        let g = self.params.gamma_exponent();
        g * i_1.max(0.0).powf(g - 1.0) + self.params.lambda_defense()
    }

    /// Closed-form slopes of rho = A / (A + psi_1) with A = I_2^gamma.
    ///
    /// The cross partial is A' psi_1' (A - psi_1) / (A + psi_1)^3, so defense
    /// and espionage are complements exactly when rho > 1/2.
    pub fn contest_slopes(&self, i_1: f64, i_2: f64) -> ContestSlopes {
        let g = self.params.gamma_exponent();
        let attack = i_2.max(0.0).powf(g);
        let attack_slope = g * i_2.max(0.0).powf(g - 1.0);
        let defense = self.defense_strength(i_1);
        let defense_slope = self.defense_slope(i_1);
        let total = attack + defense;

        // Without espionage rho is identically zero in I_1.
        let d_rho_d_i_1 = if attack == 0.0 {
            0.0
        } else {
            -attack * defense_slope / total.powi(2)
        };
        ContestSlopes {
            d_rho_d_i_1,
            d_rho_d_i_2: attack_slope * defense / total.powi(2),
            cross: attack_slope * defense_slope * (attack - defense) / total.powi(3),
        }
    }

    /// Espionage level at which d^2 rho / dI_1 dI_2 changes sign: I_2^gamma = psi_1(I_1).
    /// May lie above I_bar.
    pub fn interaction_threshold(&self, i_1: f64) -> f64 {
        self.defense_strength(i_1).powf(1.0 / self.params.gamma_exponent())
    }

    /// Signal precision kappa(I_2) = I_2^iota / (I_2^iota + I_bar^iota)
    pub fn signal_precision(&self, i_2: f64) -> f64 {
        let iota = self.params.iota();
        let signal = i_2.max(0.0).powf(iota);
        let reference = self.params.i_bar().powf(iota);
        (signal / (signal + reference)).clamp(0.0, 1.0)
    }

    pub fn signal_precision_slope(&self, i_2: f64) -> f64 {
        let iota = self.params.iota();
        let signal = i_2.max(0.0).powf(iota);
        let reference = self.params.i_bar().powf(iota);
        iota * i_2.max(0.0).powf(iota - 1.0) * reference / (signal + reference).powi(2)
    }

    /// Slope, numerator and denominator given already-computed rho and kappa.
    ///
    /// Returns `StabilityViolation` when B or the denominator is not positive.
    pub fn intercept_terms(&self, rho: f64, kappa: f64) -> Result<InterceptTerms, ModelError> {
        let p = self.params;
        let (alpha, beta, delta, mu_c) = (p.alpha(), p.beta(), p.delta(), p.mu_c());
        let x = rho * kappa;
        let d2 = delta * delta;

        let b = beta - x * d2 / (2.0 * beta);
        if b <= 0.0 {
            return Err(ModelError::StabilityViolation {
                term: StabilityTerm::Slope,
                value: b,
                rho,
                kappa,
            });
        }

        let numerator = alpha * (2.0 * beta + delta) / (2.0 * beta)
            + delta * mu_c / 2.0
            + d2 * (1.0 - x) * mu_c / (4.0 * beta);
        let denominator = 2.0 * beta - d2 * (1.0 + x) / (2.0 * beta);
        if denominator <= 0.0 {
            return Err(ModelError::StabilityViolation {
                term: StabilityTerm::Denominator,
                value: denominator,
                rho,
                kappa,
            });
        }

        Ok(InterceptTerms {
            b,
            numerator,
            denominator,
        })
    }

    pub fn evaluate(&self, investments: InvestmentPair) -> Result<DerivedState, ModelError> {
        let rho = self.contest_success(investments.i_1, investments.i_2);
        let kappa = self.signal_precision(investments.i_2);
        let terms = self.intercept_terms(rho, kappa)?;
        Ok(DerivedState {
            rho,
            kappa,
            b: terms.b,
            numerator: terms.numerator,
            denominator: terms.denominator,
            a: terms.intercept(),
        })
    }
}
