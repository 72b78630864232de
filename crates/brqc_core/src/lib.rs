//! # brqc_core -- Byzantine-Resilient Quorum Consensus
//!
//! A population of `n` agents must settle on one shared strategy index out
//! of `m` candidates while up to `f < n/3` of them transmit arbitrary
//! unit-norm vectors. Honest agents hold a complex amplitude vector whose
//! squared magnitudes are belief probabilities; every bulk-synchronous round
//! they validate the broadcast, score deviations from a locally trusted
//! majority, decay confidence in deviating senders, fuse what they received
//! at confidence weights discounted by this round's deviation scores, and
//! amplify toward the optimal index with a Grover-style reflection.
//! Convergence needs a `2f + 1` quorum that both agrees on the index and
//! still trusts its honest peers.
//!
//! The library is single-threaded and deterministic under a fixed seed; it
//! carries no network, file, or CLI surface of its own.
//!
//! ## Quick Start
//!
//! ```
//! use brqc_core::{theoretical_bound, ByzantineStrategy, ConsensusConfig, ConsensusOrchestrator};
//!
//! let config = ConsensusConfig::new(10, 20, 3, 0, ByzantineStrategy::Adversarial);
//! let mut orchestrator = ConsensusOrchestrator::with_seed(config, 42)?;
//!
//! let budget = (10.0 * theoretical_bound(20)).ceil() as usize;
//! let outcome = orchestrator.run(budget);
//! assert!(outcome.converged);
//! assert_eq!(outcome.consensus, Some(0));
//! # Ok::<(), brqc_core::ConfigError>(())
//! ```

// -- Pure numeric layer --
pub mod amplitude;
pub mod anomaly;

// -- Population model --
pub mod adversary;
pub mod agent;

// -- Orchestration --
pub mod config;
pub mod error;
pub mod orchestrator;

pub use adversary::{AdversaryModel, ByzantineStrategy};
pub use agent::{Agent, AgentId, INITIAL_CONFIDENCE};
pub use config::ConsensusConfig;
pub use error::{ConfigError, Result};
pub use orchestrator::{theoretical_bound, ConsensusOrchestrator, RunOutcome, RunState};
