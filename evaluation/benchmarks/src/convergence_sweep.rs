use anyhow::Context;
use brqc_core::ByzantineStrategy;
use brqc_sim::{export_scaling_csv, log_log_slope, run_trials, scaling_sweep, TrialParams};
use std::fs;
use std::path::Path;
use std::time::Instant;

const TRIALS: usize = 100;
const BASE_SEED: u64 = 42;
const STRATEGY_COUNTS: [usize; 5] = [5, 10, 20, 50, 100];

fn main() -> anyhow::Result<()> {
    // Structured logging; WARN keeps timeouts visible without flooding
    // the summary table with per-run convergence events.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    println!("--------------------------------------------------");
    println!("BRQC Convergence Sweep");
    println!("--------------------------------------------------");

    let out_dir = Path::new("evaluation/results");
    fs::create_dir_all(out_dir).context("creating results directory")?;
    let start = Instant::now();

    // 1. Behavior matrix at the canonical population
    println!("\nBehavior matrix (10 agents, 20 strategies, 3 Byzantine, {TRIALS} trials):\n");
    let behaviors = [
        ByzantineStrategy::Random,
        ByzantineStrategy::Adversarial,
        ByzantineStrategy::Misleading,
    ];
    let mut matrix = Vec::new();
    for (row, behavior) in behaviors.iter().enumerate() {
        let params = TrialParams::new(10, 20, 3, *behavior);
        let stats = run_trials(&params, TRIALS, BASE_SEED + (row * TRIALS) as u64)?;
        println!(
            "  {:<11} success {:>5.1}%  mean {:>5.2} iters  violations {}  timeouts {}",
            behavior.to_string(),
            100.0 * stats.success_rate(),
            stats.mean_iterations,
            stats.violations,
            stats.timeouts
        );
        matrix.push(serde_json::json!({
            "behavior": behavior,
            "success_rate": stats.success_rate(),
            "mean_iterations": stats.mean_iterations,
            "violations": stats.violations,
            "timeouts": stats.timeouts,
        }));
    }

    // 2. Liveness scaling under the random adversary
    println!("\nLiveness scaling (random adversary, {TRIALS} trials per point):\n");
    let base = TrialParams::new(10, 20, 3, ByzantineStrategy::Random);
    let points = scaling_sweep(&base, &STRATEGY_COUNTS, TRIALS, BASE_SEED + 1000)?;

    println!(
        "{:>6} {:>9} {:>12} {:>10}",
        "m", "success", "mean iters", "bound"
    );
    for point in &points {
        println!(
            "{:>6} {:>8.1}% {:>12.2} {:>10.1}",
            point.num_strategies,
            100.0 * point.success_rate,
            point.mean_iterations,
            point.bound
        );
    }
    let slope = log_log_slope(&points);
    println!("\nFitted growth exponent: {slope:.3}");

    // 3. Export
    let csv_path = out_dir.join("convergence_sweep.csv");
    export_scaling_csv(&csv_path, &points)
        .with_context(|| format!("writing {}", csv_path.display()))?;

    let summary = serde_json::json!({
        "trials_per_cell": TRIALS,
        "base_seed": BASE_SEED,
        "behavior_matrix": matrix,
        "scaling": points,
        "growth_exponent": slope,
        "runtime_secs": start.elapsed().as_secs_f64(),
    });
    let json_path = out_dir.join("convergence_summary.json");
    fs::write(&json_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("writing {}", json_path.display()))?;

    println!("\n--------------------------------------------------");
    println!("Sweep complete in {:.2}s", start.elapsed().as_secs_f64());
    println!("Results written to {}", out_dir.display());
    Ok(())
}
