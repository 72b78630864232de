//! Amplitude-vector operators
//!
//! Pure numeric operations on unit-L2-norm vectors of complex amplitudes.
//! `amplify` is the Grover-style concentration step (phase flip on the target
//! component, reflection about the mean, renormalize); `fuse` is the
//! confidence-weighted mean used to blend peer vectors into one. Both are
//! total functions: degenerate inputs fall back instead of dividing by zero.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use num_complex::Complex64;

use crate::agent::AgentId;

/// Norms below this are treated as degenerate (all components cancelled)
const DEGENERATE_NORM: f64 = 1e-12;

/// L2 norm of an amplitude vector
pub fn l2_norm(vector: &[Complex64]) -> f64 {
    vector.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt()
}

/// Scale `vector` to unit L2 norm in place.
///
/// Returns `false` (leaving the vector untouched) when the norm is
/// degenerate, so callers can pick their own fallback.
pub fn normalize_in_place(vector: &mut [Complex64]) -> bool {
    let norm = l2_norm(vector);
    if norm < DEGENERATE_NORM {
        return false;
    }
    for amp in vector.iter_mut() {
        *amp /= norm;
    }
    true
}

/// Uniform unit vector: every component `1/sqrt(dim)`.
///
/// The honest starting state, and the fallback for fusion over an empty or
/// fully distrusted peer set.
pub fn uniform(dim: usize) -> Vec<Complex64> {
    if dim == 0 {
        return Vec::new();
    }
    let amp = 1.0 / (dim as f64).sqrt();
    vec![Complex64::new(amp, 0.0); dim]
}

/// Squared magnitude of one component, read as belief probability
pub fn probability(vector: &[Complex64], index: usize) -> f64 {
    vector.get(index).map(|a| a.norm_sqr()).unwrap_or(0.0)
}

/// Index carrying the most probability mass, with that mass.
///
/// Returns `None` for an empty vector.
pub fn dominant_index(vector: &[Complex64]) -> Option<(usize, f64)> {
    vector
        .iter()
        .map(|a| a.norm_sqr())
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}

/// One amplification round toward `target`: negate the target component,
/// reflect every component about the new mean (`v' = 2*mean - v`), then
/// renormalize.
///
/// From a uniform start, repeated application concentrates squared magnitude
/// on `target`, exceeding 0.9 within `O(sqrt(dim))` rounds. A degenerate
/// (zero-norm) result is returned unnormalized rather than divided by zero.
/// `target` must index into `vector`; debug builds assert on a violation.
pub fn amplify(vector: &[Complex64], target: usize) -> Vec<Complex64> {
    let mut out = vector.to_vec();
    if out.is_empty() {
        return out;
    }
    debug_assert!(target < out.len(), "amplify target out of range");
    if let Some(amp) = out.get_mut(target) {
        *amp = -*amp;
    }
    let mean = out.iter().sum::<Complex64>() / out.len() as f64;
    for amp in out.iter_mut() {
        *amp = 2.0 * mean - *amp;
    }
    normalize_in_place(&mut out);
    out
}

/// Apply [`amplify`] exactly `iterations` times. Pure, no hidden state.
pub fn amplify_n(vector: &[Complex64], target: usize, iterations: usize) -> Vec<Complex64> {
    let mut out = vector.to_vec();
    for _ in 0..iterations {
        out = amplify(&out, target);
    }
    out
}

/// Confidence-weighted fusion of peer vectors.
///
/// Computes `sum(w_j * state_j) / sum(w_j)` over the intersection of the two
/// maps' keys, then renormalizes to unit norm. Falls back to [`uniform`]
/// (`dim` components) when the maps share no usable key, every weight is
/// zero, or the weighted mean cancels to a degenerate norm. Vectors whose
/// length differs from `dim` are skipped.
pub fn fuse(
    states: &BTreeMap<AgentId, Vec<Complex64>>,
    weights: &BTreeMap<AgentId, f64>,
    dim: usize,
) -> Vec<Complex64> {
    let mut acc = vec![Complex64::new(0.0, 0.0); dim];
    let mut total_weight = 0.0;
    for (id, state) in states {
        let Some(&weight) = weights.get(id) else {
            continue;
        };
        if weight <= 0.0 || state.len() != dim {
            continue;
        }
        for (sum, amp) in acc.iter_mut().zip(state.iter()) {
            *sum += *amp * weight;
        }
        total_weight += weight;
    }
    if total_weight <= 0.0 {
        return uniform(dim);
    }
    for sum in acc.iter_mut() {
        *sum /= total_weight;
    }
    if !normalize_in_place(&mut acc) {
        // Trusted vectors cancelled each other out
        return uniform(dim);
    }
    acc
}
