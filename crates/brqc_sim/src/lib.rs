//! # brqc_sim -- Experiment Engine for BRQC Consensus
//!
//! Runs seeded batches of consensus trials on top of [`brqc_core`] and
//! aggregates the outcomes into the statistics the evaluation suite
//! reports on: success rates, safety violations, and the growth of the
//! mean convergence round as the strategy space scales.
//!
//! The entry points are:
//!
//! - [`run_trial`] -- one orchestrator run under one seed
//! - [`run_trials`] -- a batch of trials with consecutive seeds
//! - [`scaling_sweep`] -- batches across a range of strategy counts
//! - [`log_log_slope`] -- least-squares growth exponent of a sweep
//!
//! Everything is deterministic given the base seed, so every number in
//! an exported CSV can be reproduced from the command line.

use brqc_core::{
    theoretical_bound, ByzantineStrategy, ConsensusConfig, ConsensusOrchestrator, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters for one consensus trial.
///
/// `max_iterations: None` uses the default budget of ten times the
/// theoretical bound for the configured strategy count, which is far
/// beyond the point where a healthy population has converged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialParams {
    pub num_agents: usize,
    pub num_strategies: usize,
    pub num_byzantine: usize,
    pub optimal_strategy: usize,
    pub byzantine_strategy: ByzantineStrategy,
    pub max_iterations: Option<usize>,
}

impl TrialParams {
    pub fn new(
        num_agents: usize,
        num_strategies: usize,
        num_byzantine: usize,
        byzantine_strategy: ByzantineStrategy,
    ) -> Self {
        Self {
            num_agents,
            num_strategies,
            num_byzantine,
            optimal_strategy: 0,
            byzantine_strategy,
            max_iterations: None,
        }
    }

    /// Iteration budget for this trial: the explicit override, or ten
    /// times the theoretical bound for the strategy count.
    pub fn iteration_budget(&self) -> usize {
        self.max_iterations
            .unwrap_or_else(|| (10.0 * theoretical_bound(self.num_strategies)).ceil() as usize)
    }

    fn to_config(&self) -> ConsensusConfig {
        ConsensusConfig::new(
            self.num_agents,
            self.num_strategies,
            self.num_byzantine,
            self.optimal_strategy,
            self.byzantine_strategy,
        )
    }
}

/// Outcome of a single seeded trial.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct TrialRecord {
    pub seed: u64,
    pub converged: bool,
    pub iterations: usize,
    pub consensus: Option<usize>,
    /// Converged on a strategy other than the configured optimum.
    pub safety_violation: bool,
}

/// Aggregate statistics over a batch of trials.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct TrialStats {
    pub trials: usize,
    pub converged: usize,
    /// Converged on the configured optimal strategy.
    pub successes: usize,
    pub violations: usize,
    pub timeouts: usize,
    /// Mean iterations to convergence, over converged trials only.
    pub mean_iterations: f64,
}

impl TrialStats {
    pub fn success_rate(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.successes as f64 / self.trials as f64
    }
}

/// One point of a liveness-scaling sweep.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ScalingPoint {
    pub num_strategies: usize,
    pub trials: usize,
    pub success_rate: f64,
    pub mean_iterations: f64,
    /// `theoretical_bound` for this strategy count, for comparison.
    pub bound: f64,
}

/// Runs one consensus trial and reports its outcome.
pub fn run_trial(params: &TrialParams, seed: u64) -> Result<TrialRecord> {
    let mut orchestrator = ConsensusOrchestrator::with_seed(params.to_config(), seed)?;
    let outcome = orchestrator.run(params.iteration_budget());
    let safety_violation =
        outcome.converged && outcome.consensus != Some(params.optimal_strategy);
    Ok(TrialRecord {
        seed,
        converged: outcome.converged,
        iterations: outcome.iterations,
        consensus: outcome.consensus,
        safety_violation,
    })
}

/// Runs `trials` consensus trials with seeds `base_seed..base_seed + trials`
/// and aggregates the outcomes.
pub fn run_trials(params: &TrialParams, trials: usize, base_seed: u64) -> Result<TrialStats> {
    let mut stats = TrialStats {
        trials,
        converged: 0,
        successes: 0,
        violations: 0,
        timeouts: 0,
        mean_iterations: 0.0,
    };
    let mut iteration_sum = 0usize;

    for offset in 0..trials {
        let record = run_trial(params, base_seed + offset as u64)?;
        if record.converged {
            stats.converged += 1;
            iteration_sum += record.iterations;
            if record.safety_violation {
                stats.violations += 1;
            } else {
                stats.successes += 1;
            }
        } else {
            stats.timeouts += 1;
        }
    }

    if stats.converged > 0 {
        stats.mean_iterations = iteration_sum as f64 / stats.converged as f64;
    }
    Ok(stats)
}

/// Runs a trial batch for each strategy count in `strategy_counts`,
/// holding every other parameter of `base` fixed.
///
/// The optimal strategy index from `base` is kept, so it must be valid
/// for the smallest strategy count in the sweep.
pub fn scaling_sweep(
    base: &TrialParams,
    strategy_counts: &[usize],
    trials: usize,
    base_seed: u64,
) -> Result<Vec<ScalingPoint>> {
    let mut points = Vec::with_capacity(strategy_counts.len());
    for (index, &num_strategies) in strategy_counts.iter().enumerate() {
        let mut params = base.clone();
        params.num_strategies = num_strategies;
        // Disjoint seed block per point so adding a point never
        // perturbs the others.
        let stats = run_trials(&params, trials, base_seed + (index * trials) as u64)?;
        points.push(ScalingPoint {
            num_strategies,
            trials,
            success_rate: stats.success_rate(),
            mean_iterations: stats.mean_iterations,
            bound: theoretical_bound(num_strategies),
        });
    }
    Ok(points)
}

/// Least-squares slope of `ln(mean_iterations)` against
/// `ln(num_strategies)` over the sweep points.
///
/// This is the empirical growth exponent: a value near 0.5 means the
/// convergence round grows like the square root of the strategy count.
/// Points with a non-positive mean are skipped; with fewer than two
/// usable points the slope is undefined and NaN is returned.
pub fn log_log_slope(points: &[ScalingPoint]) -> f64 {
    let samples: Vec<(f64, f64)> = points
        .iter()
        .filter(|p| p.mean_iterations > 0.0 && p.num_strategies > 0)
        .map(|p| {
            (
                (p.num_strategies as f64).ln(),
                p.mean_iterations.ln(),
            )
        })
        .collect();
    if samples.len() < 2 {
        return f64::NAN;
    }

    let n = samples.len() as f64;
    let mean_x = samples.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;
    let covariance: f64 = samples
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let variance: f64 = samples.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    covariance / variance
}

/// Writes sweep points to a CSV file with a header row.
pub fn export_scaling_csv(path: &Path, points: &[ScalingPoint]) -> std::result::Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}
