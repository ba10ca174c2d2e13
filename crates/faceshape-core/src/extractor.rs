//! Face measurement extraction from a tracked landmark mesh.
//!
//! Landmarks are placed in world space, optionally projected to NDC, then
//! sliced into three horizontal bands. The widest span inside each band
//! gives the jaw, cheekbone and forehead widths.

use crate::config::Bands;
use crate::transform::Transform;
use crate::types::{floor_extent, BoundingBox, Measurement, Point3};

/// Fewest landmarks a frame needs before extraction is attempted.
pub const MIN_LANDMARKS: usize = 4;

/// Raw per-frame extraction output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extraction {
    pub measurement: Measurement,
    pub bbox: BoundingBox,
}

/// Number of complete xyz triples in a flat landmark buffer.
pub fn landmark_count(positions: &[f32]) -> usize {
    positions.len() / 3
}

/// Decode a flat `[x, y, z, x, y, z, ...]` buffer, applying `world` and
/// then `projection` to every point. A trailing partial triple is ignored.
pub fn build_points(
    positions: &[f32],
    world: Option<&Transform>,
    projection: Option<&Transform>,
) -> Vec<Point3> {
    positions
        .chunks_exact(3)
        .map(|c| {
            let mut p = Point3::new(f64::from(c[0]), f64::from(c[1]), f64::from(c[2]));
            if let Some(m) = world {
                p = m.apply(p);
            }
            if let Some(m) = projection {
                p = m.apply(p);
            }
            p
        })
        .collect()
}

/// Horizontal span of the points whose fractional height in `bbox` falls in
/// `[start, end)`, or `[start, end]` when `inclusive_end` is set.
///
/// An empty band falls back to the full bbox width.
pub fn band_width(
    points: &[Point3],
    bbox: &BoundingBox,
    start: f64,
    end: f64,
    inclusive_end: bool,
) -> f64 {
    let mut left = f64::INFINITY;
    let mut right = f64::NEG_INFINITY;
    let mut count = 0usize;

    for p in points {
        let frac = (p.y - bbox.min_y) / bbox.height;
        let in_band = frac >= start && (frac < end || (inclusive_end && frac <= end));
        if in_band && p.x.is_finite() {
            left = left.min(p.x);
            right = right.max(p.x);
            count += 1;
        }
    }

    if count == 0 {
        return floor_extent(bbox.width);
    }
    floor_extent(right - left)
}

/// Measure an already-decoded point cloud.
pub fn measure_points(points: &[Point3], bands: &Bands) -> Extraction {
    let bbox = BoundingBox::from_points(points);

    let measurement = Measurement {
        jaw: band_width(points, &bbox, bands.lower[0], bands.lower[1], false),
        cheekbone: band_width(points, &bbox, bands.middle[0], bands.middle[1], false),
        forehead: band_width(points, &bbox, bands.upper[0], bands.upper[1], true),
        length: bbox.height,
    };

    Extraction { measurement, bbox }
}

/// Full extraction: decode, transform, project, measure.
pub fn extract_measurements(
    positions: &[f32],
    world: Option<&Transform>,
    projection: Option<&Transform>,
    bands: &Bands,
) -> Extraction {
    let points = build_points(positions, world, projection);
    measure_points(&points, bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two points per row: (±half_width, y).
    fn rows(rows: &[(f32, f32)]) -> Vec<f32> {
        rows.iter()
            .flat_map(|&(y, w)| [-w / 2.0, y, 0.0, w / 2.0, y, 0.0])
            .collect()
    }

    #[test]
    fn test_build_points_ignores_partial_triple() {
        let pts = build_points(&[1.0, 2.0, 3.0, 4.0, 5.0], None, None);
        assert_eq!(pts, vec![Point3::new(1.0, 2.0, 3.0)]);
        assert_eq!(landmark_count(&[0.0; 11]), 3);
    }

    #[test]
    fn test_band_widths() {
        // heights 0..10, jaw rows at 0 and 2, cheek at 4 and 6, forehead at 8 and 10
        let positions = rows(&[(0.0, 4.0), (2.0, 5.0), (4.0, 8.0), (6.0, 7.0), (8.0, 6.0), (10.0, 3.0)]);
        let ex = extract_measurements(&positions, None, None, &Bands::default());
        assert_relative_eq!(ex.measurement.jaw, 5.0);
        assert_relative_eq!(ex.measurement.cheekbone, 8.0);
        assert_relative_eq!(ex.measurement.forehead, 6.0);
        assert_relative_eq!(ex.measurement.length, 10.0);
        assert_relative_eq!(ex.bbox.width, 8.0);
    }

    #[test]
    fn test_top_row_belongs_to_upper_band() {
        // only the top row is in the upper band; it sits exactly at fraction 1.0
        let positions = rows(&[(0.0, 2.0), (5.0, 4.0), (10.0, 1.0)]);
        let ex = extract_measurements(&positions, None, None, &Bands::default());
        assert_relative_eq!(ex.measurement.forehead, 1.0);
    }

    #[test]
    fn test_band_start_is_inclusive() {
        // y = 33 of 100 sits exactly on the lower/middle boundary
        let positions = rows(&[(0.0, 2.0), (33.0, 6.0), (100.0, 1.0)]);
        let ex = extract_measurements(&positions, None, None, &Bands::default());
        assert_relative_eq!(ex.measurement.jaw, 2.0);
        assert_relative_eq!(ex.measurement.cheekbone, 6.0);
    }

    #[test]
    fn test_empty_band_falls_back_to_bbox_width() {
        let positions = rows(&[(0.0, 2.0), (1.0, 6.0), (10.0, 1.0)]);
        let ex = extract_measurements(&positions, None, None, &Bands::default());
        assert_relative_eq!(ex.measurement.cheekbone, 6.0);
    }

    #[test]
    fn test_same_row_points() {
        // collinear along x at a single height: everything lands in the jaw band
        let positions: Vec<f32> = (0..6).flat_map(|i| [i as f32, 1.0, 0.0]).collect();
        let ex = extract_measurements(&positions, None, None, &Bands::default());
        assert_relative_eq!(ex.measurement.jaw, 5.0);
        assert_relative_eq!(ex.measurement.cheekbone, 5.0);
        assert_eq!(ex.measurement.length, crate::types::MIN_EXTENT);
    }

    #[test]
    fn test_coincident_points_are_degenerate() {
        let positions: Vec<f32> = (0..6).flat_map(|_| [0.5, 0.5, 0.5]).collect();
        let ex = extract_measurements(&positions, None, None, &Bands::default());
        assert!(!ex.measurement.has_valid_cheekbone());
        assert_eq!(ex.measurement.cheekbone, crate::types::MIN_EXTENT);
    }

    #[test]
    fn test_world_transform_applies_before_banding() {
        let positions = rows(&[(0.0, 4.0), (5.0, 8.0), (10.0, 6.0)]);
        let world = Transform::scale(0.5, 2.0, 1.0);
        let ex = extract_measurements(&positions, Some(&world), None, &Bands::default());
        assert_relative_eq!(ex.measurement.cheekbone, 4.0);
        assert_relative_eq!(ex.measurement.length, 20.0);
    }

    #[test]
    fn test_projection_divides_by_depth() {
        // simple pinhole: w = -z, camera looks down -z; everything at z = -2
        let mut m = *Transform::identity().as_array();
        m[11] = -1.0;
        m[15] = 0.0;
        let projection = Transform::from_array(m);
        let world = Transform::translation(0.0, 0.0, -2.0);
        let positions = rows(&[(0.0, 4.0), (5.0, 8.0), (10.0, 6.0)]);
        let ex = extract_measurements(&positions, Some(&world), Some(&projection), &Bands::default());
        assert_relative_eq!(ex.measurement.cheekbone, 4.0);
        assert_relative_eq!(ex.measurement.length, 5.0);
    }

    #[test]
    fn test_non_finite_landmarks_do_not_panic() {
        let positions = [f32::NAN, 0.0, 0.0, 1.0, f32::INFINITY, 0.0, 0.0, 1.0, 0.0, 2.0, 2.0, 0.0];
        let ex = extract_measurements(&positions, None, None, &Bands::default());
        assert!(ex.measurement.jaw.is_finite());
        assert!(ex.measurement.cheekbone.is_finite());
        // the infinite y is reported, not floored away
        assert_eq!(ex.measurement.length, f64::INFINITY);
        assert!(!ex.bbox.is_finite());
    }
}
