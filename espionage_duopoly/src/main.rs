//! Equilibrium runner.
//!
//! Usage:
//!   cargo run --release -- experiments/baseline.toml
//!   cargo run --release            (all preset scenarios at default settings)

use std::env;
use std::path::Path;
use std::time::Instant;

use espionage_duopoly::scenarios::{
    comparative_statics, compute_elasticities, print_elasticity_table, print_sweep_table, run_all_scenarios,
};
use espionage_duopoly::{decompose_equilibrium, solve_equilibrium, InvestmentPair, RunConfig, SolverConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => run_presets(),
        2 => run_config(Path::new(&args[1])),
        _ => {
            eprintln!("Usage: {} [run_config.toml]", args[0]);
            eprintln!("Example: {} experiments/baseline.toml", args[0]);
            std::process::exit(1);
        }
    }
}

fn run_presets() {
    println!("========================================");
    println!("Espionage Duopoly: preset scenarios");
    println!("========================================");

    let start = Instant::now();
    let results = run_all_scenarios(SolverConfig::default()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    for result in &results {
        result.print_summary();
    }

    println!("\n{:<18} {:>9} {:>9} {:>10} {:>10} {:>10}", "Scenario", "I_1*", "I_2*", "V_1*", "V_2*", "W");
    println!("{:-<18} {:->9} {:->9} {:->10} {:->10} {:->10}", "", "", "", "", "", "");
    for result in &results {
        let s = &result.report.solution;
        println!(
            "{:<18} {:>9.4} {:>9.4} {:>10.2} {:>10.2} {:>10.2}",
            result.config.name, s.i_1_star, s.i_2_star, s.v_1_star, s.v_2_star, s.total_welfare
        );
    }
    println!("\nCompleted in {:.1}s", start.elapsed().as_secs_f64());
}

fn run_config(path: &Path) {
    let config = RunConfig::load(path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });
    let params = config.parameter_set().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("=== {} ===\n", config.name);
    let report = solve_equilibrium(&params, &config.solver).unwrap_or_else(|e| {
        eprintln!("Solve aborted: {}", e);
        std::process::exit(1);
    });
    report.print_summary();

    let investments = InvestmentPair::new(report.solution.i_1_star, report.solution.i_2_star);
    match decompose_equilibrium(&params, &config.solver, investments) {
        Ok(decomposition) => {
            println!();
            decomposition.print_summary();
        }
        Err(e) => eprintln!("Decomposition skipped: {}", e),
    }

    if let Some(sweep) = &config.sweep {
        println!("\nComparative statics: {} ∈ {:?}\n", sweep.parameter, sweep.values);
        let points = comparative_statics(config.parameters, sweep, &config.solver);
        print_sweep_table(&points);
        println!("\nArc elasticities:\n");
        print_elasticity_table(&compute_elasticities(&points));
    }

    match serde_json::to_string_pretty(&report.solution) {
        Ok(json) => println!("\n{}", json),
        Err(e) => eprintln!("Error serializing solution: {}", e),
    }
}
