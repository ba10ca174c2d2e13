//! faceshape-core: face-shape classification from tracked face-mesh landmarks.
//!
//! Measures jaw, cheekbone and forehead widths from a landmark cloud,
//! smooths them over time and scores them against seven face-shape
//! archetypes. A [`FaceShapeDetector`] wraps the pipeline per tracking
//! stream and falls back to a decayed previous result on bad frames.

pub mod config;
pub mod detector;
pub mod extractor;
pub mod scorer;
pub mod smoother;
pub mod transform;
pub mod types;

pub use config::{Bands, ConfigError, ShapeArchetype, ShapeConfig};
pub use detector::FaceShapeDetector;
pub use transform::Transform;
pub use types::{
    BoundingBox, DetectionResult, FaceShape, LastResult, Measurement, RunnerUp, ScoredCandidate,
    ShapeRatios,
};
