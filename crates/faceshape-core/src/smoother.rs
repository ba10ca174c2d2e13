//! Exponential moving average over face measurements.

use crate::types::Measurement;

/// Per-field EMA with finite-value guards.
#[derive(Debug, Clone)]
pub struct Smoother {
    alpha: f64,
    state: Option<Measurement>,
}

impl Smoother {
    /// `alpha` is the weight of the newest sample; lower is smoother.
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Current smoothed measurement, if any update has happened.
    pub fn state(&self) -> Option<&Measurement> {
        self.state.as_ref()
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Blend `next` into the state and return the new state.
    ///
    /// The first update seeds the state unblended.
    pub fn update(&mut self, next: &Measurement) -> Measurement {
        let smoothed = match &self.state {
            None => *next,
            Some(prev) => Measurement {
                jaw: blend(Some(prev.jaw), next.jaw, self.alpha),
                cheekbone: blend(Some(prev.cheekbone), next.cheekbone, self.alpha),
                forehead: blend(Some(prev.forehead), next.forehead, self.alpha),
                length: blend(Some(prev.length), next.length, self.alpha),
            },
        };
        self.state = Some(smoothed);
        smoothed
    }
}

/// One EMA step for a single field.
fn blend(prev: Option<f64>, next: f64, alpha: f64) -> f64 {
    match prev {
        Some(p) if p.is_finite() && next.is_finite() => alpha * next + (1.0 - alpha) * p,
        // previous value unusable (or absent): adopt the fresh one
        _ if next.is_finite() => next,
        // nothing usable arrived: hold what we had
        Some(p) => p,
        None => 0.0,
    }
}
