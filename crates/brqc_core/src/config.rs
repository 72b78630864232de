//! Run configuration for the consensus orchestrator
//!
//! Bundles the population shape (`n`, `m`, `f`), the ground-truth optimal
//! index, the adversary behavior, and the numeric tunables of the protocol.
//! Serde-friendly so experiment harnesses can load sweeps from disk.

use serde::{Deserialize, Serialize};

use crate::adversary::ByzantineStrategy;
use crate::error::{ConfigError, Result};

fn default_decay_rate() -> f64 {
    0.15
}

fn default_anomaly_threshold() -> f64 {
    0.3
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_norm_tolerance() -> f64 {
    1e-6
}

fn default_agreement_threshold() -> f64 {
    0.9
}

fn default_trust_threshold() -> f64 {
    0.9
}

/// Configuration for a single consensus run.
///
/// The population shape is fixed for the run: `num_agents` total agents, the
/// first `num_byzantine` of which transmit adversary output instead of
/// following the protocol. Tolerance requires `num_byzantine < num_agents/3`,
/// checked by [`ConsensusConfig::validate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Total number of agents `n`
    pub num_agents: usize,
    /// Number of candidate strategies `m` (amplitude vector dimension)
    pub num_strategies: usize,
    /// Number of Byzantine agents `f`; must satisfy `f < n/3`
    pub num_byzantine: usize,
    /// Ground-truth optimal strategy index, known to honest agents
    pub optimal_strategy: usize,
    /// Behavior of the Byzantine agents, fixed for the run
    pub byzantine_strategy: ByzantineStrategy,

    /// Confidence decay rate `lambda`. Higher values distrust deviating
    /// senders faster but risk over-penalizing honest noise.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    /// Anomaly dead zone: normalized distances below this score 0
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,
    /// Minimum confidence for a peer to enter the local majority vector
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Tolerance for the unit-norm validation of received vectors
    #[serde(default = "default_norm_tolerance")]
    pub norm_tolerance: f64,
    /// Dominant-probability mass an agent needs to count as agreeing
    #[serde(default = "default_agreement_threshold")]
    pub agreement_threshold: f64,
    /// Confidence an agreeing agent needs in its honest peers to count as
    /// high-confidence
    #[serde(default = "default_trust_threshold")]
    pub trust_threshold: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        // Canonical benchmark population: 10 agents, 20 strategies, 3 Byzantine.
        Self::new(10, 20, 3, 0, ByzantineStrategy::Random)
    }
}

impl ConsensusConfig {
    /// Build a config with the given population shape and default tunables.
    pub fn new(
        num_agents: usize,
        num_strategies: usize,
        num_byzantine: usize,
        optimal_strategy: usize,
        byzantine_strategy: ByzantineStrategy,
    ) -> Self {
        Self {
            num_agents,
            num_strategies,
            num_byzantine,
            optimal_strategy,
            byzantine_strategy,
            decay_rate: default_decay_rate(),
            anomaly_threshold: default_anomaly_threshold(),
            min_confidence: default_min_confidence(),
            norm_tolerance: default_norm_tolerance(),
            agreement_threshold: default_agreement_threshold(),
            trust_threshold: default_trust_threshold(),
        }
    }

    /// Check the population shape. Integer form of `f < n/3`: rejects when
    /// `3*f >= n`, so `n = 10` admits `f <= 3` and rejects `f = 4`.
    pub fn validate(&self) -> Result<()> {
        if self.num_agents < 1 {
            return Err(ConfigError::EmptyPopulation {
                num_agents: self.num_agents,
            });
        }
        if self.num_strategies < 1 {
            return Err(ConfigError::EmptyStrategySpace {
                num_strategies: self.num_strategies,
            });
        }
        if 3 * self.num_byzantine >= self.num_agents {
            return Err(ConfigError::ByzantineBoundViolated {
                num_agents: self.num_agents,
                num_byzantine: self.num_byzantine,
            });
        }
        if self.optimal_strategy >= self.num_strategies {
            return Err(ConfigError::OptimalStrategyOutOfRange {
                optimal_strategy: self.optimal_strategy,
                num_strategies: self.num_strategies,
            });
        }
        Ok(())
    }

    /// Number of honest agents `n - f`
    pub fn num_honest(&self) -> usize {
        self.num_agents - self.num_byzantine
    }

    /// Byzantine quorum `2f + 1`
    pub fn quorum(&self) -> usize {
        2 * self.num_byzantine + 1
    }
}
