use rayon::prelude::*;

use crate::analysis::{mean_abs, std_dev};
use crate::config::{SolverConfig, SweepConfig, SweepParameter};
use crate::error::ModelError;
use crate::nash::{solve_equilibrium, Formulation};
use crate::params::{ParameterSet, ParameterValues};
use crate::solution::{EquilibriumReport, EquilibriumSolution};

/// Configuration for a named equilibrium scenario
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Name of the scenario
    pub name: String,
    pub params: ParameterSet,
    pub solver: SolverConfig,
}

impl ScenarioConfig {
    fn preset(name: &str, values: ParameterValues, solver: SolverConfig) -> Result<Self, ModelError> {
        Ok(ScenarioConfig {
            name: name.to_string(),
            params: values.validate()?,
            solver,
        })
    }

    /// Baseline calibration
    pub fn baseline(solver: SolverConfig) -> Self {
        ScenarioConfig {
            name: "Baseline".to_string(),
            params: ParameterSet::baseline(),
            solver,
        }
    }

    /// Espionage is five times cheaper for the follower
    pub fn cheap_espionage(solver: SolverConfig) -> Result<Self, ModelError> {
        let values = ParameterValues {
            kappa_2: 0.1,
            ..Default::default()
        };
        Self::preset("Cheap espionage", values, solver)
    }

    /// Each unit of defense is far more effective
    pub fn strong_defense(solver: SolverConfig) -> Result<Self, ModelError> {
        let values = ParameterValues {
            lambda_defense: 4.0,
            ..Default::default()
        };
        Self::preset("Strong defense", values, solver)
    }

    /// No cost uncertainty: a stolen signal reveals nothing new
    pub fn certain_costs(solver: SolverConfig) -> Result<Self, ModelError> {
        let values = ParameterValues {
            sigma_c: 0.0,
            ..Default::default()
        };
        Self::preset("Certain costs", values, solver)
    }

    pub fn all(solver: SolverConfig) -> Result<Vec<Self>, ModelError> {
        Ok(vec![
            Self::baseline(solver),
            Self::cheap_espionage(solver)?,
            Self::strong_defense(solver)?,
            Self::certain_costs(solver)?,
        ])
    }
}

/// Result of running a scenario
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub config: ScenarioConfig,
    pub report: EquilibriumReport,
}

impl ScenarioResult {
    /// Print a summary of the scenario result
    pub fn print_summary(&self) {
        println!("\n=== {} ===", self.config.name);
        self.report.print_summary();
    }
}

/// Run a single scenario and return results
pub fn run_scenario(config: ScenarioConfig) -> Result<ScenarioResult, ModelError> {
    let report = solve_equilibrium(&config.params, &config.solver)?;
    Ok(ScenarioResult { config, report })
}

/// Run scenarios in parallel; each solve owns its random stream.
pub fn run_all_scenarios(solver: SolverConfig) -> Result<Vec<ScenarioResult>, ModelError> {
    ScenarioConfig::all(solver)?
        .into_par_iter()
        .map(run_scenario)
        .collect()
}

/// One point of a comparative-statics sweep.
#[derive(Debug, Clone)]
pub struct SweepPoint {
    pub parameter: SweepParameter,
    pub value: f64,
    /// Invalid parameter values are reported here rather than aborting the sweep
    pub outcome: Result<EquilibriumSolution, ModelError>,
}

/// Solve the equilibrium at every value of one parameter.
///
/// All points share `solver.seed`, so neighbouring points are compared on
/// the same cost draws.
pub fn comparative_statics(base: ParameterValues, sweep: &SweepConfig, solver: &SolverConfig) -> Vec<SweepPoint> {
    sweep
        .values
        .par_iter()
        .map(|&value| {
            let mut values = base;
            sweep.parameter.apply(&mut values, value);
            let outcome = values
                .validate()
                .and_then(|params| solve_equilibrium(&params, solver))
                .map(|report| report.solution);
            SweepPoint {
                parameter: sweep.parameter,
                value,
                outcome,
            }
        })
        .collect()
}

pub fn print_sweep_table(points: &[SweepPoint]) {
    let Some(first) = points.first() else {
        return;
    };
    println!(
        "{:>12} {:>9} {:>9} {:>8} {:>8} {:>11} {:>11} {:>11} {:>6}",
        first.parameter.to_string(),
        "I_1*",
        "I_2*",
        "rho*",
        "kappa*",
        "V_1*",
        "V_2*",
        "W",
        "conv"
    );
    println!(
        "{:->12} {:->9} {:->9} {:->8} {:->8} {:->11} {:->11} {:->11} {:->6}",
        "", "", "", "", "", "", "", "", ""
    );
    for point in points {
        match &point.outcome {
            Ok(s) => println!(
                "{:>12.4} {:>9.4} {:>9.4} {:>8.4} {:>8.4} {:>11.3} {:>11.3} {:>11.3} {:>6}",
                point.value,
                s.i_1_star,
                s.i_2_star,
                s.rho_star,
                s.kappa_star,
                s.v_1_star,
                s.v_2_star,
                s.total_welfare,
                s.converged
            ),
            Err(err) => println!("{:>12.4}   {}", point.value, err),
        }
    }
}

/// Equilibrium quantities whose response to a sweep is reported as an elasticity.
pub const ELASTICITY_KEYS: [&str; 10] = [
    "I_1_star",
    "I_2_star",
    "rho_star",
    "kappa_star",
    "V_1_star",
    "V_2_star",
    "U_1_star",
    "U_2_star",
    "consumer_surplus",
    "total_welfare",
];

/// Arc elasticities between two neighbouring sweep points.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepElasticity {
    pub parameter: SweepParameter,
    pub from: f64,
    pub to: f64,
    /// (dY/dX) * (X_mid / Y_mid) per key; `None` where Y_mid is zero or the
    /// ratio is not finite
    pub values: Vec<(&'static str, Option<f64>)>,
}

impl SweepElasticity {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.iter().find(|(k, _)| *k == key).and_then(|(_, v)| *v)
    }
}

fn arc_elasticity(x_0: f64, x_1: f64, y_0: f64, y_1: f64) -> Option<f64> {
    let x_mid = 0.5 * (x_0 + x_1);
    let y_mid = 0.5 * (y_0 + y_1);
    let e = (y_1 - y_0) / (x_1 - x_0) * x_mid / y_mid;
    e.is_finite().then_some(e)
}

/// Elasticities between consecutive solved points. Failed points are skipped,
/// so an interval may span one.
pub fn compute_elasticities(points: &[SweepPoint]) -> Vec<SweepElasticity> {
    let solved: Vec<(SweepParameter, f64, Vec<(&'static str, f64)>)> = points
        .iter()
        .filter_map(|p| p.outcome.as_ref().ok().map(|s| (p.parameter, p.value, s.to_pairs())))
        .collect();

    solved
        .windows(2)
        .filter(|w| w[1].1 != w[0].1)
        .map(|w| {
            let (parameter, from, lower) = &w[0];
            let (_, to, upper) = &w[1];
            let lookup = |pairs: &[(&'static str, f64)], key: &str| {
                pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
            };
            let values = ELASTICITY_KEYS
                .iter()
                .map(|&key| {
                    let e = lookup(lower, key)
                        .zip(lookup(upper, key))
                        .and_then(|(y_0, y_1)| arc_elasticity(*from, *to, y_0, y_1));
                    (key, e)
                })
                .collect();
            SweepElasticity {
                parameter: *parameter,
                from: *from,
                to: *to,
                values,
            }
        })
        .collect()
}

pub fn print_elasticity_table(elasticities: &[SweepElasticity]) {
    let Some(first) = elasticities.first() else {
        return;
    };
    let shown = ["I_1_star", "I_2_star", "V_1_star", "V_2_star", "total_welfare"];
    println!(
        "{:>21} {:>9} {:>9} {:>9} {:>9} {:>9}",
        format!("{} interval", first.parameter),
        "e(I_1*)",
        "e(I_2*)",
        "e(V_1*)",
        "e(V_2*)",
        "e(W)"
    );
    for e in elasticities {
        let cells: Vec<String> = shown
            .iter()
            .map(|key| match e.get(key) {
                Some(v) => format!("{:>9.4}", v),
                None => format!("{:>9}", "-"),
            })
            .collect();
        println!("{:>10.4}..{:<10.4} {}", e.from, e.to, cells.join(" "));
    }
}

/// Mean absolute KKT residual at two sample sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualScaling {
    pub n_small: usize,
    pub n_large: usize,
    pub replications: usize,
    pub mean_abs_small: f64,
    pub mean_abs_large: f64,
    /// Spread of the per-replication mean residual at the small size
    pub std_small: f64,
}

impl ResidualScaling {
    /// Shrink factor; Monte Carlo error predicts sqrt(n_large / n_small).
    pub fn ratio(&self) -> f64 {
        self.mean_abs_small / self.mean_abs_large
    }

    pub fn expected_ratio(&self) -> f64 {
        (self.n_large as f64 / self.n_small as f64).sqrt()
    }

    pub fn print_summary(&self) {
        println!(
            "KKT residual scaling over {} replications: N={} -> {:.5} (sd {:.5}), N={} -> {:.5}, ratio {:.2} (expected {:.2})",
            self.replications,
            self.n_small,
            self.mean_abs_small,
            self.std_small,
            self.n_large,
            self.mean_abs_large,
            self.ratio(),
            self.expected_ratio()
        );
    }
}

/// Replicated best-response solves, one seed per replication, at two sample
/// sizes. Every residual of both firms enters the averages.
pub fn kkt_residual_scaling(
    params: &ParameterSet,
    solver: &SolverConfig,
    n_small: usize,
    n_large: usize,
    seeds: &[u64],
) -> Result<ResidualScaling, ModelError> {
    let residuals_at = |n_samples: usize| -> Result<Vec<[f64; 2]>, ModelError> {
        seeds
            .par_iter()
            .map(|&seed| -> Result<[f64; 2], ModelError> {
                let config = solver
                    .with_samples(n_samples)
                    .with_seed(seed)
                    .with_formulation(Formulation::BestResponse);
                let report = solve_equilibrium(params, &config)?;
                Ok([report.kkt.leader.residual, report.kkt.follower.residual])
            })
            .collect()
    };

    let small = residuals_at(n_small)?;
    let large = residuals_at(n_large)?;
    let flat = |rows: &[[f64; 2]]| rows.iter().flatten().copied().collect::<Vec<f64>>();
    let per_replication: Vec<f64> = small.iter().map(|r| mean_abs(r)).collect();

    Ok(ResidualScaling {
        n_small,
        n_large,
        replications: seeds.len(),
        mean_abs_small: mean_abs(&flat(&small)),
        mean_abs_large: mean_abs(&flat(&large)),
        std_small: std_dev(&per_replication),
    })
}
