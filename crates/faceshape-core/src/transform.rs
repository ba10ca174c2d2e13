//! 4×4 homogeneous transforms for landmark placement and projection.
//!
//! Matrices are stored column-major, the layout WebGL and three.js hand
//! out, so a tracker's `matrixWorld.elements` can be passed through as is.

use crate::types::Point3;
use serde::{Deserialize, Serialize};

/// Column-major 4×4 matrix. Element `(row, col)` lives at `m[col * 4 + row]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    m: [f64; 16],
}

impl Transform {
    pub fn identity() -> Self {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        Self { m }
    }

    pub fn from_array(m: [f64; 16]) -> Self {
        Self { m }
    }

    /// Build from a tracker's `Float32Array`-style column-major buffer.
    pub fn from_cols(cols: &[f32; 16]) -> Self {
        let mut m = [0.0; 16];
        for (dst, src) in m.iter_mut().zip(cols.iter()) {
            *dst = f64::from(*src);
        }
        Self { m }
    }

    /// Translation by (x, y, z).
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        let mut t = Self::identity();
        t.m[12] = x;
        t.m[13] = y;
        t.m[14] = z;
        t
    }

    /// Non-uniform scale along each axis.
    pub fn scale(x: f64, y: f64, z: f64) -> Self {
        let mut t = Self::identity();
        t.m[0] = x;
        t.m[5] = y;
        t.m[10] = z;
        t
    }

    pub fn as_array(&self) -> &[f64; 16] {
        &self.m
    }

    /// Apply to `p` as `(x, y, z, 1)` and perspective-divide by `w`.
    ///
    /// A zero or non-finite `w` skips the divide; downstream guards deal
    /// with whatever comes out.
    pub fn apply(&self, p: Point3) -> Point3 {
        let e = &self.m;
        let x = e[0] * p.x + e[4] * p.y + e[8] * p.z + e[12];
        let y = e[1] * p.x + e[5] * p.y + e[9] * p.z + e[13];
        let z = e[2] * p.x + e[6] * p.y + e[10] * p.z + e[14];
        let w = e[3] * p.x + e[7] * p.y + e[11] * p.z + e[15];

        if w.is_finite() && w != 0.0 && w != 1.0 {
            Point3::new(x / w, y / w, z / w)
        } else {
            Point3::new(x, y, z)
        }
    }

    /// Compose: the returned transform applies `self` first, then `next`.
    pub fn then(&self, next: &Transform) -> Transform {
        let a = &next.m;
        let b = &self.m;
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
            }
        }
        Transform { m: out }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_is_noop() {
        let p = Point3::new(1.5, -2.0, 3.25);
        assert_eq!(Transform::identity().apply(p), p);
    }

    #[test]
    fn test_translation_uses_last_column() {
        let p = Transform::translation(1.0, 2.0, 3.0).apply(Point3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Point3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_then_applies_in_order() {
        // scale then translate: (1,1,1) -> (2,2,2) -> (3,2,2)
        let t = Transform::scale(2.0, 2.0, 2.0).then(&Transform::translation(1.0, 0.0, 0.0));
        let p = t.apply(Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.z, 2.0);
    }

    #[test]
    fn test_perspective_divide() {
        // w = -z, the usual perspective row
        let mut m = *Transform::identity().as_array();
        m[11] = -1.0;
        m[15] = 0.0;
        let p = Transform::from_array(m).apply(Point3::new(2.0, 4.0, -2.0));
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.z, -1.0);
    }

    #[test]
    fn test_zero_w_skips_divide() {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        let p = Transform::from_array(m).apply(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(p, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_from_cols_widens() {
        let mut cols = [0.0f32; 16];
        cols[0] = 1.0;
        cols[5] = 1.0;
        cols[10] = 1.0;
        cols[15] = 1.0;
        cols[12] = 0.5;
        let p = Transform::from_cols(&cols).apply(Point3::default());
        assert_relative_eq!(p.x, 0.5);
    }
}
