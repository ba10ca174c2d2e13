use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest width/height the pipeline will ever divide by.
pub const MIN_EXTENT: f64 = 1e-6;

/// The seven face-shape archetypes, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceShape {
    Oval,
    Round,
    Square,
    Rectangle,
    Heart,
    Diamond,
    Triangle,
}

impl FaceShape {
    pub const ALL: [FaceShape; 7] = [
        FaceShape::Oval,
        FaceShape::Round,
        FaceShape::Square,
        FaceShape::Rectangle,
        FaceShape::Heart,
        FaceShape::Diamond,
        FaceShape::Triangle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FaceShape::Oval => "Oval",
            FaceShape::Round => "Round",
            FaceShape::Square => "Square",
            FaceShape::Rectangle => "Rectangle",
            FaceShape::Heart => "Heart",
            FaceShape::Diamond => "Diamond",
            FaceShape::Triangle => "Triangle",
        }
    }
}

impl fmt::Display for FaceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A landmark after world transform and (optional) projection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Axis-aligned bounds of a projected point cloud.
///
/// Finite `width` and `height` never drop below [`MIN_EXTENT`]. A cloud with
/// an infinite coordinate keeps its non-finite extent so callers can reject
/// the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Compute bounds over `points`. An empty slice yields a degenerate
    /// box at the origin.
    pub fn from_points(points: &[Point3]) -> Self {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for p in points {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }

        if points.is_empty() {
            min_x = 0.0;
            max_x = 0.0;
            min_y = 0.0;
            max_y = 0.0;
        }

        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            width: floor_extent(max_x - min_x),
            height: floor_extent(max_y - min_y),
        }
    }

    /// True when both extents are finite, i.e. the cloud is measurable.
    pub fn is_finite(&self) -> bool {
        self.width.is_finite() && self.height.is_finite()
    }
}

/// Raise a finite extent to at least [`MIN_EXTENT`]. Non-finite values pass
/// through unchanged.
pub(crate) fn floor_extent(v: f64) -> f64 {
    if v.is_finite() {
        v.max(MIN_EXTENT)
    } else {
        v
    }
}

/// Facial widths at three vertical bands plus overall face length.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurement {
    pub jaw: f64,
    pub cheekbone: f64,
    pub forehead: f64,
    pub length: f64,
}

impl Measurement {
    /// True when the cheekbone width can serve as the ratio denominator.
    pub fn has_valid_cheekbone(&self) -> bool {
        self.cheekbone.is_finite() && self.cheekbone > MIN_EXTENT
    }
}

/// Measurement ratios relative to cheekbone width.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeRatios {
    pub length_to_width: f64,
    pub jaw_to_cheek: f64,
    pub forehead_to_cheek: f64,
}

impl ShapeRatios {
    pub fn from_measurement(m: &Measurement) -> Self {
        Self {
            length_to_width: m.length / m.cheekbone,
            jaw_to_cheek: m.jaw / m.cheekbone,
            forehead_to_cheek: m.forehead / m.cheekbone,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.length_to_width, self.jaw_to_cheek, self.forehead_to_cheek]
    }
}

/// One archetype's score for a single detection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub shape: FaceShape,
    /// Weighted sum of per-axis similarities.
    pub score: f64,
    /// Share of the calibrated distribution, in [0, 1].
    pub confidence: f64,
    pub ratios: ShapeRatios,
    /// Per-axis Gaussian similarity: [length/width, jaw/cheek, forehead/cheek].
    pub axis_scores: [f64; 3],
}

/// Summary of the second-best candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunnerUp {
    pub name: FaceShape,
    pub confidence: f64,
}

/// The classification handed back to the caller for every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub name: FaceShape,
    pub confidence: f64,
    pub score: f64,
    pub second: Option<RunnerUp>,
    pub measurements: Measurement,
    pub ratios: ShapeRatios,
}

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = if self.confidence.is_finite() {
            self.confidence * 100.0
        } else {
            0.0
        };
        write!(f, "{} ({:.0}%)", self.name, pct)
    }
}

/// Cached copy of the most recent fresh detection, used for decay fallback.
///
/// The runner-up is deliberately absent: a decayed result never reports one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastResult {
    pub name: FaceShape,
    pub confidence: f64,
    pub score: f64,
    pub measurements: Measurement,
    pub ratios: ShapeRatios,
}

impl From<&DetectionResult> for LastResult {
    fn from(r: &DetectionResult) -> Self {
        Self {
            name: r.name,
            confidence: r.confidence,
            score: r.score,
            measurements: r.measurements,
            ratios: r.ratios,
        }
    }
}

impl LastResult {
    /// Rebuild a caller-facing result with the given confidence.
    pub fn to_result(&self, confidence: f64) -> DetectionResult {
        DetectionResult {
            name: self.name,
            confidence,
            score: self.score,
            second: None,
            measurements: self.measurements,
            ratios: self.ratios,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_floors_degenerate_extent() {
        let pts = vec![Point3::new(1.0, 2.0, 0.0); 4];
        let bbox = BoundingBox::from_points(&pts);
        assert_eq!(bbox.width, MIN_EXTENT);
        assert_eq!(bbox.height, MIN_EXTENT);
        assert_eq!(bbox.min_x, 1.0);
        assert_eq!(bbox.max_y, 2.0);
    }

    #[test]
    fn test_bbox_empty() {
        let bbox = BoundingBox::from_points(&[]);
        assert_eq!(bbox.min_x, 0.0);
        assert_eq!(bbox.width, MIN_EXTENT);
    }

    #[test]
    fn test_bbox_extent() {
        let pts = [
            Point3::new(-1.0, -2.0, 0.0),
            Point3::new(3.0, 4.0, 0.0),
            Point3::new(0.0, 0.0, 5.0),
        ];
        let bbox = BoundingBox::from_points(&pts);
        assert_eq!(bbox.width, 4.0);
        assert_eq!(bbox.height, 6.0);
    }

    #[test]
    fn test_bbox_keeps_infinite_extent() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, f64::INFINITY, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        let bbox = BoundingBox::from_points(&pts);
        assert_eq!(bbox.width, 2.0);
        assert_eq!(bbox.height, f64::INFINITY);
        assert!(!bbox.is_finite());
        assert!(BoundingBox::from_points(&[Point3::new(0.0, 0.0, 0.0); 3]).is_finite());
    }

    #[test]
    fn test_cheekbone_validity() {
        let mut m = Measurement { jaw: 1.0, cheekbone: 1.0, forehead: 1.0, length: 1.0 };
        assert!(m.has_valid_cheekbone());
        m.cheekbone = MIN_EXTENT;
        assert!(!m.has_valid_cheekbone());
        m.cheekbone = f64::NAN;
        assert!(!m.has_valid_cheekbone());
    }

    #[test]
    fn test_display_rounds_percentage() {
        let r = DetectionResult {
            name: FaceShape::Heart,
            confidence: 0.537,
            score: 0.9,
            second: None,
            measurements: Measurement::default(),
            ratios: ShapeRatios::default(),
        };
        assert_eq!(r.to_string(), "Heart (54%)");
    }

    #[test]
    fn test_shape_display_honours_width() {
        assert_eq!(format!("{:<6}|", FaceShape::Oval), "Oval  |");
    }

    #[test]
    fn test_shape_serializes_as_name() {
        let json = serde_json::to_string(&FaceShape::Rectangle).unwrap();
        assert_eq!(json, "\"Rectangle\"");
    }
}
