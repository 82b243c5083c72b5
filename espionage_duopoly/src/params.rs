use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Raw structural constants of the espionage duopoly, as read from a config
/// file or assembled by a sweep. Not validated; see [`ParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterValues {
    /// Market size (demand intercept)
    pub alpha: f64,
    /// Own-price sensitivity
    pub beta: f64,
    /// Cross-price sensitivity (product substitutability)
    pub delta: f64,
    /// Follower's marginal cost (common knowledge)
    pub gamma: f64,
    /// Leader's counter-espionage cost coefficient
    pub kappa_1: f64,
    /// Follower's espionage cost coefficient
    pub kappa_2: f64,
    /// Mean of the leader's private cost
    pub mu_c: f64,
    /// Standard deviation of the leader's private cost
    pub sigma_c: f64,
    /// Defense regularizer, keeps the contest denominator positive
    pub epsilon: f64,
    /// Returns-to-scale exponent of the contest technology
    pub gamma_exponent: f64,
    /// Linear defense effectiveness
    pub lambda_defense: f64,
    /// Signal precision exponent
    pub iota: f64,
    /// Upper bound on either firm's investment
    #[serde(rename = "I_bar", alias = "i_bar")]
    pub i_bar: f64,
}

impl Default for ParameterValues {
    fn default() -> Self {
        ParameterValues {
            alpha: 100.0,
            beta: 1.5,
            delta: 0.5,
            gamma: 45.0,
            kappa_1: 0.5,
            kappa_2: 0.5,
            mu_c: 40.0,
            sigma_c: 20.0,
            epsilon: 0.5,
            gamma_exponent: 0.6,
            lambda_defense: 1.5,
            iota: 0.5,
            i_bar: 5.0,
        }
    }
}

impl ParameterValues {
    /// Validate and freeze.
    pub fn validate(self) -> Result<ParameterSet, ModelError> {
        ParameterSet::new(self)
    }
}

fn check(name: &'static str, value: f64, ok: bool, reason: &'static str) -> Result<(), ModelError> {
    if !value.is_finite() {
        return Err(ModelError::ParameterValidation {
            name,
            value,
            reason: "must be finite",
        });
    }
    if ok {
        Ok(())
    } else {
        Err(ModelError::ParameterValidation {
            name,
            value,
            reason,
        })
    }
}

/// Validated, immutable model parameters shared read-only by every component.
///
/// The only way to obtain one is through [`ParameterSet::new`], so every
/// downstream formula may rely on the structural inequalities holding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "ParameterValues")]
pub struct ParameterSet {
    values: ParameterValues,
}

impl From<ParameterSet> for ParameterValues {
    fn from(params: ParameterSet) -> Self {
        params.values
    }
}

impl ParameterSet {
    pub fn new(values: ParameterValues) -> Result<Self, ModelError> {
        let v = &values;
        check("alpha", v.alpha, v.alpha > 0.0, "market size must be positive")?;
        check("beta", v.beta, v.beta > 0.0, "own-price sensitivity must be positive")?;
        check(
            "delta",
            v.delta,
            v.delta > 0.0 && v.delta < v.beta,
            "cross-price sensitivity must lie in (0, beta)",
        )?;
        check("gamma", v.gamma, v.gamma >= 0.0, "follower cost must be non-negative")?;
        check("kappa_1", v.kappa_1, v.kappa_1 > 0.0, "investment cost must be positive")?;
        check("kappa_2", v.kappa_2, v.kappa_2 > 0.0, "investment cost must be positive")?;
        check("mu_c", v.mu_c, v.mu_c > 0.0, "mean leader cost must be positive")?;
        check("sigma_c", v.sigma_c, v.sigma_c >= 0.0, "cost dispersion must be non-negative")?;
        check("epsilon", v.epsilon, v.epsilon > 0.0, "defense regularizer must be positive")?;
        check(
            "gamma_exponent",
            v.gamma_exponent,
            v.gamma_exponent > 0.0 && v.gamma_exponent <= 1.0,
            "contest exponent must lie in (0, 1]",
        )?;
        check(
            "lambda_defense",
            v.lambda_defense,
            v.lambda_defense > 0.0,
            "defense effectiveness must be positive",
        )?;
        check("iota", v.iota, v.iota > 0.0, "signal exponent must be positive")?;
        check("I_bar", v.i_bar, v.i_bar > 0.0, "investment bound must be positive")?;
        Ok(ParameterSet { values })
    }

    /// Baseline calibration. Its Nash equilibrium in investments is interior;
    /// the joint-surplus optimum is not (it sits at I_1 = 0).
    pub fn baseline() -> Self {
        ParameterSet {
            values: ParameterValues::default(),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.values.alpha
    }

    pub fn beta(&self) -> f64 {
        self.values.beta
    }

    pub fn delta(&self) -> f64 {
        self.values.delta
    }

    pub fn gamma(&self) -> f64 {
        self.values.gamma
    }

    pub fn kappa_1(&self) -> f64 {
        self.values.kappa_1
    }

    pub fn kappa_2(&self) -> f64 {
        self.values.kappa_2
    }

    pub fn mu_c(&self) -> f64 {
        self.values.mu_c
    }

    pub fn sigma_c(&self) -> f64 {
        self.values.sigma_c
    }

    pub fn epsilon(&self) -> f64 {
        self.values.epsilon
    }

    pub fn gamma_exponent(&self) -> f64 {
        self.values.gamma_exponent
    }

    pub fn lambda_defense(&self) -> f64 {
        self.values.lambda_defense
    }

    pub fn iota(&self) -> f64 {
        self.values.iota
    }

    pub fn i_bar(&self) -> f64 {
        self.values.i_bar
    }

    /// Quadratic investment cost 0.5 * kappa_i * I^2 for firm 1 or 2
    pub fn investment_cost(&self, firm: Firm, investment: f64) -> f64 {
        0.5 * self.cost_coefficient(firm) * investment * investment
    }

    /// kappa_i, the slope of firm i's marginal investment cost
    pub fn cost_coefficient(&self, firm: Firm) -> f64 {
        match firm {
            Firm::Leader => self.values.kappa_1,
            Firm::Follower => self.values.kappa_2,
        }
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        ParameterSet::baseline()
    }
}

/// The two players. The leader invests in defense, the follower in espionage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Firm {
    Leader,
    Follower,
}

impl std::fmt::Display for Firm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Firm::Leader => write!(f, "leader"),
            Firm::Follower => write!(f, "follower"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected_field(values: ParameterValues) -> &'static str {
        match ParameterSet::new(values) {
            Err(ModelError::ParameterValidation { name, .. }) => name,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn baseline_is_valid() {
        let validated = ParameterSet::new(ParameterValues::default()).unwrap();
        assert_eq!(validated, ParameterSet::baseline());
    }

    #[test]
    fn delta_must_be_below_beta() {
        let values = ParameterValues {
            delta: 1.5,
            ..Default::default()
        };
        assert_eq!(rejected_field(values), "delta");

        let values = ParameterValues {
            delta: 0.0,
            ..Default::default()
        };
        assert_eq!(rejected_field(values), "delta");
    }

    #[test]
    fn structural_bounds_are_enforced() {
        let cases = [
            (ParameterValues { beta: 0.0, ..Default::default() }, "beta"),
            (ParameterValues { sigma_c: -1.0, ..Default::default() }, "sigma_c"),
            (ParameterValues { kappa_1: 0.0, ..Default::default() }, "kappa_1"),
            (ParameterValues { kappa_2: -0.5, ..Default::default() }, "kappa_2"),
            (ParameterValues { i_bar: 0.0, ..Default::default() }, "I_bar"),
            (ParameterValues { epsilon: 0.0, ..Default::default() }, "epsilon"),
            (ParameterValues { gamma_exponent: 1.2, ..Default::default() }, "gamma_exponent"),
            (ParameterValues { alpha: f64::NAN, ..Default::default() }, "alpha"),
        ];
        for (values, field) in cases {
            assert_eq!(rejected_field(values), field);
        }
    }

    #[test]
    fn zero_cost_dispersion_is_allowed() {
        let values = ParameterValues {
            sigma_c: 0.0,
            ..Default::default()
        };
        assert!(ParameterSet::new(values).is_ok());
    }

    #[test]
    fn parses_from_toml_with_defaults() {
        let values: ParameterValues = toml::from_str("alpha = 120.0\nI_bar = 4.0\n").unwrap();
        assert_eq!(values.alpha, 120.0);
        assert_eq!(values.i_bar, 4.0);
        assert_eq!(values.beta, ParameterValues::default().beta);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed: Result<ParameterValues, _> = toml::from_str("alpah = 120.0\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn investment_cost_is_quadratic() {
        let params = ParameterSet::baseline();
        assert_eq!(params.investment_cost(Firm::Leader, 2.0), 0.5 * 0.5 * 4.0);
        assert_eq!(params.cost_coefficient(Firm::Follower), params.kappa_2());
    }
}
