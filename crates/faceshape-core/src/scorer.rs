//! Archetype scoring: per-axis Gaussian similarity, stabilized softmax,
//! confidence floor and ranking.

use crate::config::ShapeConfig;
use crate::types::{FaceShape, LastResult, Measurement, ScoredCandidate, ShapeRatios, MIN_EXTENT};

/// Softmax exponents are clamped to ±this before `exp`.
const SOFTMAX_EXP_LIMIT: f64 = 50.0;

/// Similarity of `measured` to `ideal`, relative to `ideal`, in [0, 1].
///
/// Any unusable input scores exactly 0.
pub fn gaussian_score(measured: f64, ideal: f64, sigma: f64) -> f64 {
    if !measured.is_finite() || !ideal.is_finite() {
        return 0.0;
    }
    // relative error is undefined against a zero ideal
    if ideal == 0.0 {
        return 0.0;
    }
    // also rejects NaN sigma
    if !(sigma > 0.0) {
        return 0.0;
    }
    let diff = (measured - ideal) / ideal;
    let val = (-0.5 * diff * diff / (sigma * sigma)).exp();
    if val.is_finite() {
        val.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Score every archetype against `m` and rank the results.
///
/// A measurement without a usable cheekbone or length cannot be scored; in
/// that case the distribution concentrates on `last` when there is one and
/// is uniform otherwise.
pub fn score_shapes(
    m: &Measurement,
    config: &ShapeConfig,
    last: Option<&LastResult>,
) -> Vec<ScoredCandidate> {
    if !m.cheekbone.is_finite() || m.cheekbone <= MIN_EXTENT || !m.length.is_finite() {
        return degenerate_distribution(config, last);
    }

    let ratios = ShapeRatios::from_measurement(m);
    let measured = ratios.as_array();

    let mut candidates: Vec<ScoredCandidate> = config
        .archetypes
        .iter()
        .map(|a| {
            let mut axis_scores = [0.0; 3];
            for (i, s) in axis_scores.iter_mut().enumerate() {
                *s = gaussian_score(measured[i], a.ideal[i], config.sigma);
            }
            let score = axis_scores
                .iter()
                .zip(a.weight.iter())
                .map(|(s, w)| s * w)
                .sum();
            ScoredCandidate {
                shape: a.shape,
                score,
                confidence: 0.0,
                ratios,
                axis_scores,
            }
        })
        .collect();

    let scores: Vec<f64> = candidates.iter().map(|c| c.score).collect();
    let mut confidences = softmax(&scores, config.softmax_eps);
    apply_confidence_floor(&mut confidences, config.min_confidence);
    for (c, conf) in candidates.iter_mut().zip(confidences) {
        c.confidence = conf;
    }

    rank_candidates(&mut candidates);
    candidates
}

/// Softmax with max-subtraction, exponent clamping and an additive
/// regularizer, so no entry is ever exactly zero and the sum is never zero.
pub fn softmax(scores: &[f64], eps: f64) -> Vec<f64> {
    let max = scores.iter().copied().fold(0.0, f64::max);
    let exps: Vec<f64> = scores
        .iter()
        .map(|s| {
            let v = (s - max).clamp(-SOFTMAX_EXP_LIMIT, SOFTMAX_EXP_LIMIT).exp();
            if v.is_finite() {
                v + eps
            } else {
                eps
            }
        })
        .collect();

    let mut sum: f64 = exps.iter().sum();
    if !(sum > 0.0 && sum.is_finite()) {
        sum = 1.0;
    }
    exps.iter().map(|e| (e / sum).clamp(0.0, 1.0)).collect()
}

/// Raise every confidence below `min` to `min` and renormalize to 1.
///
/// Floored entries stay pinned at `min` and the remaining mass is shared
/// proportionally by the rest, repeating until nothing falls under the
/// floor. The result therefore both sums to 1 and respects the floor,
/// provided `min * len <= 1`.
pub fn apply_confidence_floor(confidences: &mut [f64], min: f64) {
    if confidences.is_empty() || !confidences.iter().any(|c| *c < min) {
        return;
    }

    let n = confidences.len();
    let mut pinned = vec![false; n];
    loop {
        for (c, p) in confidences.iter().zip(pinned.iter_mut()) {
            if *c < min {
                *p = true;
            }
        }

        let pinned_count = pinned.iter().filter(|p| **p).count();
        let free_mass = (1.0 - pinned_count as f64 * min).max(0.0);
        let free_total: f64 = confidences
            .iter()
            .zip(pinned.iter())
            .filter(|(_, p)| !**p)
            .map(|(c, _)| *c)
            .sum();

        if pinned_count == n || !(free_total > 0.0) {
            // nothing left to rescale: split evenly
            confidences.fill((1.0 / n as f64).clamp(0.0, 1.0));
            return;
        }

        let scale = free_mass / free_total;
        for (c, p) in confidences.iter_mut().zip(pinned.iter()) {
            *c = if *p { min } else { (*c * scale).clamp(0.0, 1.0) };
        }

        let settled = confidences
            .iter()
            .zip(pinned.iter())
            .all(|(c, p)| *p || *c >= min);
        if settled {
            return;
        }
    }
}

/// Order by score, then confidence, both descending. NaN ranks last.
pub fn rank_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        rank_key(b.score)
            .total_cmp(&rank_key(a.score))
            .then_with(|| rank_key(b.confidence).total_cmp(&rank_key(a.confidence)))
    });
}

fn rank_key(v: f64) -> f64 {
    if v.is_nan() {
        f64::NEG_INFINITY
    } else {
        v
    }
}

fn degenerate_distribution(config: &ShapeConfig, last: Option<&LastResult>) -> Vec<ScoredCandidate> {
    let n = config.archetypes.len().max(1) as f64;
    let shapes = config.archetypes.iter().map(|a| a.shape);

    let mut candidates: Vec<ScoredCandidate> = match last {
        Some(last) => shapes
            .map(|shape| {
                let hit = shape == last.name;
                blank_candidate(
                    shape,
                    if hit { 1.0 } else { 0.0 },
                    if hit { last.confidence } else { 0.0 },
                )
            })
            .collect(),
        None => shapes.map(|shape| blank_candidate(shape, 0.0, 1.0 / n)).collect(),
    };

    rank_candidates(&mut candidates);
    candidates
}

fn blank_candidate(shape: FaceShape, score: f64, confidence: f64) -> ScoredCandidate {
    ScoredCandidate {
        shape,
        score,
        confidence,
        ratios: ShapeRatios::default(),
        axis_scores: [0.0; 3],
    }
}
