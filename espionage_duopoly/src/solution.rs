use serde::{Deserialize, Serialize};

use crate::monte_carlo::EspionageSampling;
use crate::nash::Formulation;
use crate::verifier::{ConsistencyReport, KktReport};

/// Terminal record of one equilibrium solve. Values are evaluated at the
/// optimum on the same cost draws the optimizer used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumSolution {
    #[serde(rename = "I_1_star")]
    pub i_1_star: f64,
    #[serde(rename = "I_2_star")]
    pub i_2_star: f64,
    pub rho_star: f64,
    pub kappa_star: f64,
    /// Leader's price intercept at the optimum
    pub a_star: f64,
    #[serde(rename = "V_1_star")]
    pub v_1_star: f64,
    #[serde(rename = "V_2_star")]
    pub v_2_star: f64,
    pub standard_error_1: f64,
    pub standard_error_2: f64,
    #[serde(rename = "U_1_star")]
    pub u_1_star: f64,
    #[serde(rename = "U_2_star")]
    pub u_2_star: f64,
    pub consumer_surplus: f64,
    /// Consumer surplus plus both value functions
    pub total_welfare: f64,
    pub converged: bool,
    pub iterations: usize,
    pub evaluations: usize,
    pub kkt_residual_1: f64,
    pub kkt_residual_2: f64,
    pub n_samples: usize,
    pub seed: u64,
    pub formulation: Formulation,
    pub espionage_sampling: EspionageSampling,
    /// The joint-surplus point failed the Nash check and best responses
    /// produced these investments
    pub best_response_fallback: bool,
}

impl EquilibriumSolution {
    /// Flat key -> scalar view for tabular collaborators.
    pub fn to_pairs(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("I_1_star", self.i_1_star),
            ("I_2_star", self.i_2_star),
            ("rho_star", self.rho_star),
            ("kappa_star", self.kappa_star),
            ("a_star", self.a_star),
            ("V_1_star", self.v_1_star),
            ("V_2_star", self.v_2_star),
            ("standard_error_1", self.standard_error_1),
            ("standard_error_2", self.standard_error_2),
            ("U_1_star", self.u_1_star),
            ("U_2_star", self.u_2_star),
            ("consumer_surplus", self.consumer_surplus),
            ("total_welfare", self.total_welfare),
            ("converged", if self.converged { 1.0 } else { 0.0 }),
            ("iterations", self.iterations as f64),
            ("evaluations", self.evaluations as f64),
            ("kkt_residual_1", self.kkt_residual_1),
            ("kkt_residual_2", self.kkt_residual_2),
            ("n_samples", self.n_samples as f64),
            ("best_response_fallback", if self.best_response_fallback { 1.0 } else { 0.0 }),
        ]
    }

    /// rho * kappa, the probability-weighted information the follower uses
    pub fn information(&self) -> f64 {
        self.rho_star * self.kappa_star
    }

    pub fn print_summary(&self) {
        println!(
            "Investments: I_1* = {:.4} (defense), I_2* = {:.4} (espionage)",
            self.i_1_star, self.i_2_star
        );
        println!(
            "Contest: rho* = {:.4}, kappa* = {:.4}, rho*kappa = {:.4}, a* = {:.4}",
            self.rho_star,
            self.kappa_star,
            self.information(),
            self.a_star
        );
        println!(
            "Values: V_1* = {:.3} (se {:.3}), V_2* = {:.3} (se {:.3})",
            self.v_1_star, self.standard_error_1, self.v_2_star, self.standard_error_2
        );
        println!("Net utilities: U_1* = {:.3}, U_2* = {:.3}", self.u_1_star, self.u_2_star);
        println!(
            "Welfare: CS = {:.3}, W = {:.3}",
            self.consumer_surplus, self.total_welfare
        );
        println!(
            "Solver: {}{} converged={} iterations={} evaluations={} (N={}, seed={}, {} contest)",
            self.formulation,
            if self.best_response_fallback { " -> best_response" } else { "" },
            self.converged,
            self.iterations,
            self.evaluations,
            self.n_samples,
            self.seed,
            self.espionage_sampling
        );
    }
}

/// Everything a solve produces: the record plus its diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquilibriumReport {
    pub solution: EquilibriumSolution,
    pub kkt: KktReport,
    pub consistency: ConsistencyReport,
}

impl EquilibriumReport {
    pub fn print_summary(&self) {
        self.solution.print_summary();
        println!();
        self.kkt.print_summary();
        println!();
        self.consistency.print_summary();
    }
}
