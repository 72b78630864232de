//! Round orchestration and convergence
//!
//! Owns the agent population and drives bulk-synchronous rounds: broadcast is
//! collected in full, then every honest agent independently validates, scores,
//! decays confidence, fuses and amplifies against that read-only snapshot.
//! Phase boundaries are hard barriers; no agent consumes a partial round.
//!
//! Convergence is two-part by design: a Byzantine quorum of honest agents must
//! hold dominant mass on the optimal index (agreement) *and* near-full
//! confidence in their honest peers (mutual trust). Agreement alone can be
//! coincidental under adversarial noise.

use std::collections::BTreeMap;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adversary::AdversaryModel;
use crate::agent::{Agent, AgentId};
use crate::amplitude::{amplify, fuse};
use crate::anomaly::{anomaly_score, is_normalized, majority_vector};
use crate::config::ConsensusConfig;
use crate::error::Result;

/// Calibration constant for the convergence bound
const BOUND_CALIBRATION: f64 = 2.5;

/// Expected convergence horizon for an `m`-strategy run:
/// `2.5 * sqrt(m) * ln(max(2, m))`.
///
/// Pure function, safe to call before or after a run. Callers sizing a
/// `run` budget conventionally allow ten times this value to absorb
/// run-to-run variance without becoming unbounded.
pub fn theoretical_bound(num_strategies: usize) -> f64 {
    let m = num_strategies as f64;
    BOUND_CALIBRATION * m.sqrt() * m.max(2.0).ln()
}

/// Orchestrator lifecycle. `Converged` and `TimedOut` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Initialized,
    Running,
    Converged,
    TimedOut,
}

/// What a run produced.
///
/// A timeout is a reported outcome, not an error: under adversarial
/// conditions at the edge of tolerance it is the expected result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub converged: bool,
    pub iterations: usize,
    /// Agreed strategy index; `None` unless converged
    pub consensus: Option<usize>,
}

/// Drives a population of agents to consensus on the optimal strategy index.
#[derive(Clone, Debug)]
pub struct ConsensusOrchestrator {
    config: ConsensusConfig,
    agents: Vec<Agent>,
    adversary: AdversaryModel,
    state: RunState,
    round: usize,
    consensus: Option<usize>,
}

impl ConsensusOrchestrator {
    /// Build a population with entropy-seeded adversary randomness.
    pub fn new(config: ConsensusConfig) -> Result<Self> {
        config.validate()?;
        let adversary = AdversaryModel::new(
            config.byzantine_strategy,
            config.num_strategies,
            config.optimal_strategy,
        );
        Ok(Self::assemble(config, adversary))
    }

    /// Build a population whose run replays deterministically for `seed`.
    pub fn with_seed(config: ConsensusConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let adversary = AdversaryModel::with_seed(
            config.byzantine_strategy,
            config.num_strategies,
            config.optimal_strategy,
            seed,
        );
        Ok(Self::assemble(config, adversary))
    }

    fn assemble(config: ConsensusConfig, adversary: AdversaryModel) -> Self {
        // The first f constructed agents are Byzantine. The assignment is
        // fixed and known to the harness, never to the honest agents.
        let agents = (0..config.num_agents)
            .map(|id| {
                if id < config.num_byzantine {
                    Agent::new_byzantine(id, config.num_agents, config.num_strategies)
                } else {
                    Agent::new_honest(
                        id,
                        config.num_agents,
                        config.num_strategies,
                        config.optimal_strategy,
                    )
                }
            })
            .collect();
        Self {
            config,
            agents,
            adversary,
            state: RunState::Initialized,
            round: 0,
            consensus: None,
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Rounds executed so far
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Agreed strategy index, `None` until the run converges
    pub fn consensus(&self) -> Option<usize> {
        self.consensus
    }

    /// Execute exactly one round. Returns `true` once converged.
    ///
    /// Calling this on a terminal orchestrator is a no-op that reports
    /// whether the run had converged.
    pub fn run_iteration(&mut self) -> bool {
        if matches!(self.state, RunState::Converged | RunState::TimedOut) {
            return self.state == RunState::Converged;
        }
        self.state = RunState::Running;
        self.round += 1;

        // Phase 1: broadcast, collected in full before any agent consumes it
        let broadcast = self.collect_broadcast();

        // Phases 2-4: per honest agent against the read-only snapshot
        for agent in self.agents.iter_mut() {
            if agent.is_byzantine() {
                continue;
            }
            honest_round(agent, &broadcast, &self.config);
        }

        // Phase 5: convergence
        let (agreeing, high_confidence) = self.tally_agreement();
        let quorum = self.config.quorum();
        debug!(
            round = self.round,
            agreeing, high_confidence, quorum, "round complete"
        );
        if agreeing >= quorum && high_confidence >= quorum {
            self.consensus = self.first_agreeing_strategy();
            self.state = RunState::Converged;
            info!(
                round = self.round,
                consensus = ?self.consensus,
                "consensus reached"
            );
            return true;
        }
        false
    }

    /// Drive rounds until convergence or the iteration budget runs out.
    ///
    /// On a terminal orchestrator this executes nothing and re-reports the
    /// stored outcome with `iterations: 0`.
    pub fn run(&mut self, max_iterations: usize) -> RunOutcome {
        if matches!(self.state, RunState::Converged | RunState::TimedOut) {
            return RunOutcome {
                converged: self.state == RunState::Converged,
                iterations: 0,
                consensus: self.consensus,
            };
        }
        for iteration in 1..=max_iterations {
            if self.run_iteration() {
                return RunOutcome {
                    converged: true,
                    iterations: iteration,
                    consensus: self.consensus,
                };
            }
        }
        self.state = RunState::TimedOut;
        warn!(
            max_iterations,
            strategy = %self.config.byzantine_strategy,
            "iteration budget exhausted without convergence"
        );
        RunOutcome {
            converged: false,
            iterations: max_iterations,
            consensus: None,
        }
    }

    /// Snapshot every agent's transmission for this round. Byzantine agents
    /// substitute adversary output; honest agents broadcast their amplitude.
    fn collect_broadcast(&mut self) -> Vec<Vec<Complex64>> {
        let mut snapshot = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            if agent.is_byzantine() {
                snapshot.push(self.adversary.transmit());
            } else {
                snapshot.push(agent.amplitude().to_vec());
            }
        }
        snapshot
    }

    /// Count agreeing honest agents and, among them, those holding
    /// above-threshold confidence in essentially all honest peers.
    ///
    /// The peer count reads ground-truth Byzantine flags; agents themselves
    /// never learn who is Byzantine. Only this internal check does, and it
    /// never feeds back into agent state.
    fn tally_agreement(&self) -> (usize, usize) {
        let honest_peers_needed = self.config.num_honest().saturating_sub(1);
        let mut agreeing = 0;
        let mut high_confidence = 0;
        for agent in self.agents.iter().filter(|a| !a.is_byzantine()) {
            if !self.agent_agrees(agent) {
                continue;
            }
            agreeing += 1;
            let trusted_honest = self
                .agents
                .iter()
                .filter(|peer| !peer.is_byzantine() && peer.id() != agent.id())
                .filter(|peer| agent.confidence_in(peer.id()) > self.config.trust_threshold)
                .count();
            if trusted_honest >= honest_peers_needed {
                high_confidence += 1;
            }
        }
        (agreeing, high_confidence)
    }

    fn agent_agrees(&self, agent: &Agent) -> bool {
        let (Some(target), Some((winner, mass))) =
            (agent.optimal_strategy(), agent.dominant_strategy())
        else {
            return false;
        };
        winner == target && mass > self.config.agreement_threshold
    }

    fn first_agreeing_strategy(&self) -> Option<usize> {
        self.agents
            .iter()
            .filter(|agent| !agent.is_byzantine() && self.agent_agrees(agent))
            .find_map(|agent| agent.dominant_strategy().map(|(winner, _)| winner))
    }
}

/// Phases 2-4 for one honest agent: validate the snapshot, score deviations
/// against the local majority, decay confidence, fuse with
/// deviation-discounted weights, amplify toward the target.
fn honest_round(agent: &mut Agent, broadcast: &[Vec<Complex64>], config: &ConsensusConfig) {
    let Some(target) = agent.optimal_strategy() else {
        return;
    };
    let dim = config.num_strategies;
    let own_id = agent.id();

    // Phase 2: receive and validate. A sender failing the norm check keeps
    // its persistent confidence entry; only this round's weight drops to 0
    // so a later valid broadcast is scored normally again.
    let mut valid = vec![false; broadcast.len()];
    for (sender, vector) in broadcast.iter().enumerate() {
        valid[sender] = is_normalized(vector, config.norm_tolerance);
        agent.store_received(sender, vector);
    }

    // Phase 3: anomaly scoring against the majority of currently-trusted
    // peers, then multiplicative confidence decay.
    let majority = majority_vector(
        agent.received(),
        &effective_confidence(agent, &valid),
        config.min_confidence,
        dim,
    );
    let scores: Vec<(AgentId, f64)> = agent
        .received()
        .iter()
        .filter(|(sender, _)| **sender != own_id && valid[**sender])
        .map(|(sender, vector)| {
            (
                *sender,
                anomaly_score(vector, &majority, config.anomaly_threshold),
            )
        })
        .collect();
    for (sender, score) in &scores {
        agent.decay_confidence(*sender, *score, config.decay_rate);
    }

    // Phase 4: fuse with post-decay confidence discounted by this round's
    // deviation scores, then amplify toward the target. The reflection
    // preserves components off the target-uniform plane, so noise has to be
    // kept out of the fusion here; decay alone removes it too slowly.
    let mut weights = effective_confidence(agent, &valid);
    for (sender, score) in &scores {
        if let Some(weight) = weights.get_mut(sender) {
            *weight *= 1.0 - score;
        }
    }
    let fused = fuse(agent.received(), &weights, dim);
    agent.replace_amplitude(amplify(&fused, target));
}

/// This round's usable weights: the agent's confidence map with invalid
/// senders left out entirely.
fn effective_confidence(agent: &Agent, valid: &[bool]) -> BTreeMap<AgentId, f64> {
    agent
        .confidence()
        .iter()
        .filter(|(sender, _)| valid.get(**sender).copied().unwrap_or(false))
        .map(|(&sender, &score)| (sender, score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adversary::ByzantineStrategy;
    use crate::amplitude::{l2_norm, uniform};
    use crate::error::ConfigError;

    fn config(
        n: usize,
        m: usize,
        f: usize,
        strategy: ByzantineStrategy,
    ) -> ConsensusConfig {
        ConsensusConfig::new(n, m, f, 0, strategy)
    }

    #[test]
    fn test_construction_rejects_invalid_configs() {
        let err = ConsensusOrchestrator::new(config(10, 20, 4, ByzantineStrategy::Random));
        assert_eq!(
            err.err(),
            Some(ConfigError::ByzantineBoundViolated {
                num_agents: 10,
                num_byzantine: 4,
            })
        );

        assert!(ConsensusOrchestrator::new(config(0, 20, 0, ByzantineStrategy::Random)).is_err());
        assert!(ConsensusOrchestrator::new(config(10, 0, 3, ByzantineStrategy::Random)).is_err());

        let out_of_range = ConsensusConfig::new(10, 20, 3, 20, ByzantineStrategy::Random);
        assert!(ConsensusOrchestrator::new(out_of_range).is_err());

        assert!(ConsensusOrchestrator::new(config(10, 20, 3, ByzantineStrategy::Random)).is_ok());
    }

    #[test]
    fn test_first_f_agents_are_byzantine() {
        let orch =
            ConsensusOrchestrator::with_seed(config(10, 20, 3, ByzantineStrategy::Random), 1)
                .unwrap();
        // The split point comes from the stored config, readable back out
        let split = orch.config().num_byzantine;
        assert_eq!(split, 3);
        for agent in orch.agents() {
            if agent.id() < split {
                assert!(agent.is_byzantine());
                assert_eq!(agent.optimal_strategy(), None);
            } else {
                assert!(!agent.is_byzantine());
                assert_eq!(agent.optimal_strategy(), Some(0));
            }
        }
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut orch =
            ConsensusOrchestrator::with_seed(config(10, 20, 3, ByzantineStrategy::Adversarial), 5)
                .unwrap();
        assert_eq!(orch.state(), RunState::Initialized);
        assert_eq!(orch.consensus(), None);

        let converged_first_round = orch.run_iteration();
        assert!(!converged_first_round);
        assert_eq!(orch.state(), RunState::Running);
        assert_eq!(orch.round(), 1);

        let outcome = orch.run(400);
        assert!(outcome.converged);
        assert_eq!(orch.state(), RunState::Converged);

        // Terminal states are sticky: no further rounds execute
        let round = orch.round();
        assert!(orch.run_iteration());
        assert_eq!(orch.round(), round);

        let rerun = orch.run(10);
        assert!(rerun.converged);
        assert_eq!(rerun.iterations, 0);
        assert_eq!(rerun.consensus, outcome.consensus);
    }

    #[test]
    fn test_clean_population_converges_within_grover_horizon() {
        let mut orch =
            ConsensusOrchestrator::with_seed(config(4, 16, 0, ByzantineStrategy::Random), 3)
                .unwrap();
        let outcome = orch.run(20);
        assert!(outcome.converged);
        assert_eq!(outcome.consensus, Some(0));
        // Pure amplification crosses 0.9 on round 2 for 16 strategies
        assert!(
            outcome.iterations <= 3,
            "took {} iterations",
            outcome.iterations
        );
        for agent in orch.agents() {
            assert!((l2_norm(agent.amplitude()) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_two_strategy_oscillation_times_out() {
        // With m = 2 the reflection maps the uniform start to itself (up to
        // sign), so dominant mass never exceeds 0.5 and the run must report
        // a timeout instead of crashing or spinning.
        let mut orch =
            ConsensusOrchestrator::with_seed(config(4, 2, 0, ByzantineStrategy::Random), 3)
                .unwrap();
        let outcome = orch.run(25);
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 25);
        assert_eq!(outcome.consensus, None);
        assert_eq!(orch.state(), RunState::TimedOut);

        // Timed out is as sticky as converged: re-running executes no
        // rounds and reports zero iterations, not a fresh budget
        let rerun = orch.run(10);
        assert!(!rerun.converged);
        assert_eq!(rerun.iterations, 0);
        assert_eq!(rerun.consensus, None);
        assert_eq!(orch.round(), 25);
    }

    #[test]
    fn test_malformed_broadcast_drops_round_weight_only() {
        let cfg = config(3, 4, 0, ByzantineStrategy::Random);
        let mut orch = ConsensusOrchestrator::with_seed(cfg.clone(), 1).unwrap();

        // Sender 1's vector has norm 2 and must be excluded this round.
        // Senders 0 and 2 stay uniform, so fusion yields the uniform vector
        // and one amplification round over 4 strategies lands all mass on
        // the target exactly.
        let mut broadcast = vec![uniform(4), uniform(4), uniform(4)];
        for amp in broadcast[1].iter_mut() {
            *amp *= 2.0;
        }

        let agent = &mut orch.agents[0];
        honest_round(agent, &broadcast, &cfg);

        assert!(
            (agent.strategy_probability(0) - 1.0).abs() < 1e-9,
            "malformed sender leaked into fusion: p = {}",
            agent.strategy_probability(0)
        );
        // Persistent confidence is untouched; the sender may re-validate later
        assert_eq!(agent.confidence_in(1), 1.0);
        // The malformed vector is still recorded in the round cache
        assert_eq!(agent.received()[&1][0].re, broadcast[1][0].re);
    }

    #[test]
    fn test_deviating_sender_is_discounted_from_same_round_fusion() {
        let cfg = config(4, 4, 0, ByzantineStrategy::Random);
        let mut orch = ConsensusOrchestrator::with_seed(cfg.clone(), 1).unwrap();

        // Sender 3 spikes on a wrong basis index. Against the majority its
        // deviation scores 0.3625, so its fusion weight this round is the
        // decayed confidence times the discount, 0.9456 * 0.6375 = 0.6029,
        // while the persistent entry only decays to 0.9456.
        let mut broadcast = vec![uniform(4), uniform(4), uniform(4)];
        let mut spike = vec![Complex64::new(0.0, 0.0); 4];
        spike[2] = Complex64::new(1.0, 0.0);
        broadcast.push(spike);

        let agent = &mut orch.agents[0];
        honest_round(agent, &broadcast, &cfg);

        // One amplification over the discounted fusion lands 0.9756 on the
        // target; fusing the spike at full post-decay confidence caps it
        // at 0.9473.
        let p = agent.strategy_probability(0);
        assert!(p > 0.96, "spike fused at undiscounted weight: p = {}", p);
        assert!((agent.confidence_in(3) - 0.945628).abs() < 1e-6);
        // Honest uniform peers sit in the dead zone and keep full trust
        assert_eq!(agent.confidence_in(1), 1.0);
    }

    #[test]
    fn test_honest_mutual_confidence_survives_adversarial_rounds() {
        let mut orch =
            ConsensusOrchestrator::with_seed(config(10, 20, 3, ByzantineStrategy::Adversarial), 11)
                .unwrap();
        for _ in 0..5 {
            orch.run_iteration();
        }
        for agent in orch.agents().iter().filter(|a| !a.is_byzantine()) {
            for peer in orch.agents() {
                if peer.is_byzantine() {
                    assert!(
                        agent.confidence_in(peer.id()) < 1.0,
                        "agent {} never penalized byzantine peer {}",
                        agent.id(),
                        peer.id()
                    );
                } else {
                    assert_eq!(
                        agent.confidence_in(peer.id()),
                        1.0,
                        "agent {} lost confidence in honest peer {}",
                        agent.id(),
                        peer.id()
                    );
                }
            }
        }
    }

    #[test]
    fn test_theoretical_bound_shape() {
        // 2.5 * sqrt(20) * ln(20)
        assert!((theoretical_bound(20) - 33.4933).abs() < 1e-3);
        // Floor inside the log keeps tiny strategy spaces positive
        assert!((theoretical_bound(1) - 2.5 * 2.0f64.ln()).abs() < 1e-9);
        assert!(theoretical_bound(100) > theoretical_bound(20));
    }
}
