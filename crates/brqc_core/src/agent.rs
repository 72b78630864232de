//! Per-agent protocol state
//!
//! `Agent` is data plus the few mutations the protocol allows an agent to
//! perform on itself: caching a received broadcast, decaying confidence in a
//! sender, and replacing its own amplitude after fuse-and-amplify. All fields
//! are private so no other agent's state can be aliased or mutated from the
//! outside; the orchestrator works through these methods only.

use std::collections::BTreeMap;

use num_complex::Complex64;

use crate::amplitude::{self, uniform};

/// Agent identifier, also the agent's index in the population
pub type AgentId = usize;

/// Confidence every agent starts with, in every peer and in itself
pub const INITIAL_CONFIDENCE: f64 = 1.0;

/// One participant in the consensus population.
///
/// - Honest agents know the ground-truth `optimal_strategy` and follow the
///   round pipeline.
/// - Byzantine agents carry `None` (they never learn the truth) and have
///   their broadcasts substituted by the adversary model; their own state
///   is never read back.
#[derive(Clone, Debug)]
pub struct Agent {
    id: AgentId,
    optimal_strategy: Option<usize>,
    is_byzantine: bool,
    amplitude: Vec<Complex64>,
    confidence: BTreeMap<AgentId, f64>,
    received: BTreeMap<AgentId, Vec<Complex64>>,
}

impl Agent {
    /// Honest agent: uniform starting amplitude, full confidence in the
    /// whole population of `num_agents` peers (itself included).
    pub fn new_honest(
        id: AgentId,
        num_agents: usize,
        num_strategies: usize,
        optimal_strategy: usize,
    ) -> Self {
        Self::new(id, num_agents, num_strategies, Some(optimal_strategy), false)
    }

    /// Byzantine agent: same shape, no ground truth.
    pub fn new_byzantine(id: AgentId, num_agents: usize, num_strategies: usize) -> Self {
        Self::new(id, num_agents, num_strategies, None, true)
    }

    fn new(
        id: AgentId,
        num_agents: usize,
        num_strategies: usize,
        optimal_strategy: Option<usize>,
        is_byzantine: bool,
    ) -> Self {
        let confidence = (0..num_agents).map(|j| (j, INITIAL_CONFIDENCE)).collect();
        // Receive arena: one buffer per sender, reused every round
        let received = (0..num_agents)
            .map(|j| (j, vec![Complex64::new(0.0, 0.0); num_strategies]))
            .collect();
        Self {
            id,
            optimal_strategy,
            is_byzantine,
            amplitude: uniform(num_strategies),
            confidence,
            received,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn is_byzantine(&self) -> bool {
        self.is_byzantine
    }

    pub fn optimal_strategy(&self) -> Option<usize> {
        self.optimal_strategy
    }

    pub fn amplitude(&self) -> &[Complex64] {
        &self.amplitude
    }

    /// Full confidence map, keyed by peer id
    pub fn confidence(&self) -> &BTreeMap<AgentId, f64> {
        &self.confidence
    }

    /// Confidence in one peer (0 for peers outside the population)
    pub fn confidence_in(&self, peer: AgentId) -> f64 {
        self.confidence.get(&peer).copied().unwrap_or(0.0)
    }

    /// This round's received cache
    pub fn received(&self) -> &BTreeMap<AgentId, Vec<Complex64>> {
        &self.received
    }

    /// Cache a broadcast from `sender`, overwriting last round's entry.
    /// The vector is copied, never aliased.
    pub fn store_received(&mut self, sender: AgentId, vector: &[Complex64]) {
        match self.received.get_mut(&sender) {
            Some(buffer) if buffer.len() == vector.len() => buffer.copy_from_slice(vector),
            _ => {
                self.received.insert(sender, vector.to_vec());
            }
        }
    }

    /// Decay confidence in `sender` by `1 - decay_rate * anomaly_score`,
    /// clamped to `[0, 1]`. Self-confidence is pinned at 1.0.
    pub fn decay_confidence(&mut self, sender: AgentId, anomaly_score: f64, decay_rate: f64) {
        if sender == self.id {
            return;
        }
        if let Some(score) = self.confidence.get_mut(&sender) {
            *score = (*score * (1.0 - decay_rate * anomaly_score)).clamp(0.0, 1.0);
        }
    }

    /// Replace the amplitude after fuse-and-amplify
    pub fn replace_amplitude(&mut self, vector: Vec<Complex64>) {
        self.amplitude = vector;
    }

    /// Index currently carrying the most belief mass, with that mass
    pub fn dominant_strategy(&self) -> Option<(usize, f64)> {
        amplitude::dominant_index(&self.amplitude)
    }

    /// Belief mass on one strategy index
    pub fn strategy_probability(&self, index: usize) -> f64 {
        amplitude::probability(&self.amplitude, index)
    }
}
