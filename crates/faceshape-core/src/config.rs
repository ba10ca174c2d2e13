//! Classifier configuration and the face-shape archetype catalog.
//!
//! A [`ShapeConfig`] is plain data that can be written as TOML (see
//! `contrib/shapes/default.toml`). Build one with [`ShapeConfig::default`],
//! [`ShapeConfig::from_toml_str`] or [`ShapeConfig::load`]; the latter two
//! validate before returning.

use crate::types::FaceShape;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Tolerance on the archetype weight sum before a warning is logged.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bad config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
    #[error("archetype catalog has no entry for {0}")]
    MissingArchetype(FaceShape),
    #[error("archetype {0} is listed more than once")]
    DuplicateArchetype(FaceShape),
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Ideal ratios and axis weights for one face shape.
///
/// Both arrays are ordered `[length/width, jaw/cheek, forehead/cheek]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeArchetype {
    pub shape: FaceShape,
    pub ideal: [f64; 3],
    pub weight: [f64; 3],
}

/// Reference catalog, in declaration order.
const REFERENCE_ARCHETYPES: [(FaceShape, [f64; 3], [f64; 3]); 7] = [
    (FaceShape::Oval, [1.5, 0.8, 1.02], [0.5, 0.25, 0.25]),
    (FaceShape::Round, [1.18, 0.98, 1.0], [0.45, 0.3, 0.25]),
    (FaceShape::Square, [1.2, 1.05, 1.0], [0.3, 0.55, 0.15]),
    (FaceShape::Rectangle, [1.6, 0.93, 1.0], [0.5, 0.25, 0.25]),
    (FaceShape::Heart, [1.35, 0.8, 1.2], [0.35, 0.25, 0.4]),
    (FaceShape::Diamond, [1.45, 0.78, 0.92], [0.45, 0.25, 0.3]),
    (FaceShape::Triangle, [1.25, 1.1, 0.88], [0.35, 0.4, 0.25]),
];

/// Fractional `[start, end)` vertical bands over the face bounding box,
/// bottom to top. The upper band includes its end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bands {
    pub lower: [f64; 2],
    pub middle: [f64; 2],
    pub upper: [f64; 2],
}

impl Default for Bands {
    fn default() -> Self {
        Self {
            lower: [0.0, 0.33],
            middle: [0.33, 0.66],
            upper: [0.66, 1.0],
        }
    }
}

impl Bands {
    fn validate(&self) -> Result<(), ConfigError> {
        let named = [("bands.lower", self.lower), ("bands.middle", self.middle), ("bands.upper", self.upper)];
        for (field, [start, end]) in named {
            if !(start.is_finite() && end.is_finite()) || start >= end {
                return Err(invalid(field, format!("expected start < end, got [{start}, {end}]")));
            }
        }
        if self.lower[0] != 0.0 {
            return Err(invalid("bands.lower", "must start at 0.0"));
        }
        if self.upper[1] != 1.0 {
            return Err(invalid("bands.upper", "must end at 1.0"));
        }
        if self.lower[1] != self.middle[0] {
            return Err(invalid("bands.middle", "must start where bands.lower ends"));
        }
        if self.middle[1] != self.upper[0] {
            return Err(invalid("bands.upper", "must start where bands.middle ends"));
        }
        Ok(())
    }
}

/// All tunables of the face-shape pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    /// EMA blend weight of the newest measurement (lower = smoother).
    pub ema_alpha: f64,
    /// Relative tolerance of the per-axis Gaussian (lower = sharper).
    pub sigma: f64,
    /// Floor applied to every reported confidence.
    pub min_confidence: f64,
    /// Regularizer added to every softmax term.
    pub softmax_eps: f64,
    /// Confidence multiplier per consecutive fallback frame.
    pub last_result_decay: f64,
    pub bands: Bands,
    pub archetypes: Vec<ShapeArchetype>,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            ema_alpha: 0.18,
            sigma: 0.08,
            min_confidence: 0.03,
            softmax_eps: 1e-6,
            last_result_decay: 0.6,
            bands: Bands::default(),
            archetypes: REFERENCE_ARCHETYPES
                .iter()
                .map(|&(shape, ideal, weight)| ShapeArchetype { shape, ideal, weight })
                .collect(),
        }
    }
}

impl ShapeConfig {
    /// Parse and validate a TOML document. Missing keys take reference values.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: ShapeConfig = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&src)?;
        tracing::debug!(path = %path.display(), "loaded face-shape config");
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Check every invariant the scorer relies on.
    ///
    /// Weight vectors are not required to sum to 1; a sum that is off only
    /// logs a warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(invalid("ema_alpha", format!("must be in (0, 1], got {}", self.ema_alpha)));
        }
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(invalid("sigma", format!("must be positive, got {}", self.sigma)));
        }
        if !(self.softmax_eps > 0.0 && self.softmax_eps.is_finite()) {
            return Err(invalid("softmax_eps", format!("must be positive, got {}", self.softmax_eps)));
        }
        if !(0.0..=1.0).contains(&self.last_result_decay) {
            return Err(invalid(
                "last_result_decay",
                format!("must be in [0, 1], got {}", self.last_result_decay),
            ));
        }
        self.bands.validate()?;

        for shape in FaceShape::ALL {
            match self.archetypes.iter().filter(|a| a.shape == shape).count() {
                0 => return Err(ConfigError::MissingArchetype(shape)),
                1 => {}
                _ => return Err(ConfigError::DuplicateArchetype(shape)),
            }
        }

        let n = self.archetypes.len() as f64;
        if !(0.0..=1.0 / n).contains(&self.min_confidence) {
            return Err(invalid(
                "min_confidence",
                format!("must be in [0, 1/{n}], got {}", self.min_confidence),
            ));
        }

        for a in &self.archetypes {
            if a.ideal.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
                return Err(invalid(format!("archetype {}.ideal", a.shape), "ratios must be positive"));
            }
            if a.weight.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
                return Err(invalid(format!("archetype {}.weight", a.shape), "weights must be non-negative"));
            }
            let sum: f64 = a.weight.iter().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                tracing::warn!(shape = %a.shape, sum, "archetype weights do not sum to 1");
            }
        }

        Ok(())
    }

    pub fn archetype(&self, shape: FaceShape) -> Option<&ShapeArchetype> {
        self.archetypes.iter().find(|a| a.shape == shape)
    }
}
