//! Error types for the BRQC consensus library
//!
//! Only construction can fail hard. Malformed broadcasts are handled in-round
//! by zeroing the sender's weight, and running out of iterations is a reported
//! outcome (`RunOutcome { converged: false, .. }`), never an `Err`.

use thiserror::Error;

/// Fatal configuration errors raised when building an orchestrator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The Byzantine-tolerance bound `f < n/3` does not hold.
    #[error("byzantine bound violated: f = {num_byzantine} with n = {num_agents} requires f < n/3")]
    ByzantineBoundViolated {
        num_agents: usize,
        num_byzantine: usize,
    },

    #[error("population must contain at least one agent (got n = {num_agents})")]
    EmptyPopulation { num_agents: usize },

    #[error("strategy space must contain at least one index (got m = {num_strategies})")]
    EmptyStrategySpace { num_strategies: usize },

    #[error("optimal strategy index {optimal_strategy} out of range for {num_strategies} strategies")]
    OptimalStrategyOutOfRange {
        optimal_strategy: usize,
        num_strategies: usize,
    },
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, ConfigError>;
