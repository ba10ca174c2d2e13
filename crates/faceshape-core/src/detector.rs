//! Per-stream face-shape detector with decay fallback.
//!
//! One [`FaceShapeDetector`] owns the smoothing state and the last-result
//! cache for a single tracking stream. Every call to
//! [`detect`](FaceShapeDetector::detect) returns a usable result: when the
//! frame cannot be measured it hands back the previous classification with
//! its confidence decayed, or a fixed default if nothing was seen yet.

use crate::config::{ConfigError, ShapeConfig};
use crate::extractor::{self, MIN_LANDMARKS};
use crate::scorer;
use crate::smoother::Smoother;
use crate::transform::Transform;
use crate::types::{DetectionResult, FaceShape, LastResult, Measurement, RunnerUp, ShapeRatios};

/// Shape reported before anything has been measured.
const DEFAULT_SHAPE: FaceShape = FaceShape::Oval;

#[derive(Debug)]
pub struct FaceShapeDetector {
    config: ShapeConfig,
    smoother: Smoother,
    last: Option<LastResult>,
    /// Product of decay factors applied since the last fresh detection.
    decay: f64,
    /// Consecutive fallback frames since the last fresh detection.
    fallback_streak: u32,
}

impl FaceShapeDetector {
    /// Create a detector, rejecting an invalid configuration.
    pub fn new(config: ShapeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: ShapeConfig) -> Self {
        Self {
            smoother: Smoother::new(config.ema_alpha),
            config,
            last: None,
            decay: 1.0,
            fallback_streak: 0,
        }
    }

    pub fn config(&self) -> &ShapeConfig {
        &self.config
    }

    /// The cached most recent fresh detection.
    pub fn last_result(&self) -> Option<&LastResult> {
        self.last.as_ref()
    }

    /// Current EMA state.
    pub fn smoothed(&self) -> Option<&Measurement> {
        self.smoother.state()
    }

    /// Consecutive frames answered from the cache or the default.
    pub fn fallback_streak(&self) -> u32 {
        self.fallback_streak
    }

    /// Seed the cache, e.g. when resuming a stream.
    pub fn restore(&mut self, last: LastResult) {
        self.last = Some(last);
        self.decay = 1.0;
        self.fallback_streak = 0;
    }

    /// Forget all smoothing and cached state.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.last = None;
        self.decay = 1.0;
        self.fallback_streak = 0;
        tracing::debug!("face-shape detector reset");
    }

    /// Classify one frame of landmarks.
    ///
    /// `positions` is a flat xyz buffer. `world` places the mesh in world
    /// space; `projection` is the camera's view-projection matrix. Never
    /// fails: unusable frames degrade to the decayed last result.
    pub fn detect(
        &mut self,
        positions: &[f32],
        world: Option<&Transform>,
        projection: Option<&Transform>,
    ) -> DetectionResult {
        let count = extractor::landmark_count(positions);
        if count < MIN_LANDMARKS {
            tracing::debug!(count, "too few landmarks; using fallback");
            return self.fallback(Measurement::default());
        }

        let extraction =
            extractor::extract_measurements(positions, world, projection, &self.config.bands);
        if !extraction.bbox.is_finite() {
            tracing::debug!(
                width = extraction.bbox.width,
                height = extraction.bbox.height,
                "non-finite landmark extent; using fallback"
            );
            return self.fallback(Measurement::default());
        }

        let raw = extraction.measurement;
        if !raw.has_valid_cheekbone() {
            tracing::debug!(cheekbone = raw.cheekbone, "degenerate cheekbone width; using fallback");
            return self.fallback(raw);
        }

        self.classify(&raw)
    }

    /// Normal path: smooth, score, cache.
    fn classify(&mut self, raw: &Measurement) -> DetectionResult {
        let smoothed = self.smoother.update(raw);
        let scored = scorer::score_shapes(&smoothed, &self.config, self.last.as_ref());

        let Some(top) = scored.first() else {
            return self.default_result(smoothed);
        };

        let result = DetectionResult {
            name: top.shape,
            confidence: self.clamp_confidence(top.confidence),
            score: if top.score.is_finite() { top.score } else { 0.0 },
            second: scored.get(1).map(|c| RunnerUp {
                name: c.shape,
                confidence: self.clamp_confidence(c.confidence),
            }),
            measurements: smoothed,
            ratios: top.ratios,
        };

        tracing::trace!(
            alpha = self.smoother.alpha(),
            shape = %result.name,
            confidence = result.confidence,
            score = result.score,
            second = ?result.second.map(|s| s.name),
            "face shape classified"
        );

        self.last = Some(LastResult::from(&result));
        self.decay = 1.0;
        self.fallback_streak = 0;
        result
    }

    /// Decay the cached result, or produce the default carrying `raw`.
    fn fallback(&mut self, raw: Measurement) -> DetectionResult {
        self.fallback_streak = self.fallback_streak.saturating_add(1);

        let Some(last) = &self.last else {
            return self.default_result(raw);
        };

        self.decay *= self.config.last_result_decay;
        let confidence = self.clamp_confidence(last.confidence * self.decay);
        tracing::debug!(
            shape = %last.name,
            confidence,
            streak = self.fallback_streak,
            "returning decayed last result"
        );
        last.to_result(confidence)
    }

    fn default_result(&self, measurements: Measurement) -> DetectionResult {
        DetectionResult {
            name: DEFAULT_SHAPE,
            confidence: self.config.min_confidence,
            score: 0.0,
            second: None,
            measurements,
            ratios: ShapeRatios::default(),
        }
    }

    /// Clamp into `[min_confidence, 1]`; non-finite values become the floor.
    fn clamp_confidence(&self, c: f64) -> f64 {
        let min = self.config.min_confidence;
        if c.is_finite() {
            c.clamp(min, 1.0)
        } else {
            min
        }
    }
}

impl Default for FaceShapeDetector {
    fn default() -> Self {
        Self::from_valid(ShapeConfig::default())
    }
}
