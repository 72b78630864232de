//! Deviation scoring for received amplitude vectors
//!
//! Validates that transmissions are well-formed (unit norm), measures how far
//! a reported vector sits from a locally computed majority reference, and
//! builds that reference from currently-trusted peers. Scores feed the
//! multiplicative confidence decay in the round loop.

use std::collections::BTreeMap;

use num_complex::Complex64;

use crate::agent::AgentId;
use crate::amplitude::{fuse, l2_norm};

/// Distance between orthogonal unit belief vectors, used to map raw
/// distances into `[0, 1]`
const MAX_UNIT_DISTANCE: f64 = std::f64::consts::SQRT_2;

/// True iff the vector's L2 norm is within `tolerance` of 1.
///
/// Failing this marks the *sender* as malformed for the round; the vector is
/// excluded from majority and fusion with its weight forced to 0.
pub fn is_normalized(vector: &[Complex64], tolerance: f64) -> bool {
    (l2_norm(vector) - 1.0).abs() < tolerance
}

fn distance(a: &[Complex64], b: &[Complex64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "anomaly distance over mismatched dims");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm_sqr())
        .sum::<f64>()
        .sqrt()
}

/// Normalized deviation of `vector` from `reference`, in `[0, 1]`.
///
/// `d = ||vector - reference|| / sqrt(2)`. Below `threshold` the score is 0
/// (a dead zone absorbing honest numeric noise); above it the score rises
/// linearly, reaching 1 at `d = 1`, and clamps there for the anti-parallel
/// extremes where `d` can exceed 1.
pub fn anomaly_score(vector: &[Complex64], reference: &[Complex64], threshold: f64) -> f64 {
    let deviation = distance(vector, reference) / MAX_UNIT_DISTANCE;
    if deviation < threshold {
        return 0.0;
    }
    let span = (1.0 - threshold).max(f64::EPSILON);
    ((deviation - threshold) / span).clamp(0.0, 1.0)
}

/// Majority reference: confidence-weighted fusion restricted to peers whose
/// confidence strictly exceeds `min_confidence`.
///
/// Falls back to the uniform vector when no peer qualifies, so a freshly
/// poisoned confidence map can never crash the detector.
pub fn majority_vector(
    states: &BTreeMap<AgentId, Vec<Complex64>>,
    confidence: &BTreeMap<AgentId, f64>,
    min_confidence: f64,
    dim: usize,
) -> Vec<Complex64> {
    let trusted: BTreeMap<AgentId, f64> = confidence
        .iter()
        .filter(|(_, &score)| score > min_confidence)
        .map(|(&id, &score)| (id, score))
        .collect();
    fuse(states, &trusted, dim)
}
