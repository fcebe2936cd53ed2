/// Center-pivoted flip/rotate transform shared by preview and export
///
/// Geometry matches a 2D canvas transform stack:
///   translate(center) · scale(flips) · rotate(θ) · translate(-center)
/// applied to the (possibly cropped) source region drawn into a frame of the
/// same size. Points outside the frame after rotation are clipped.

use cgmath::{Matrix3, Vector3};

use crate::state::EditState;

/// The geometric part of an `EditState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    /// Clockwise degrees, one of 0, 90, 180, 270
    pub rotation: u16,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Orientation {
    pub fn from_state(state: &EditState) -> Self {
        Self {
            rotation: state.rotation,
            flip_horizontal: state.flip_horizontal,
            flip_vertical: state.flip_vertical,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Transform for a frame of `width` x `height`
    pub fn pivot(&self, width: f64, height: f64) -> CenterPivot {
        CenterPivot::new(width, height, *self)
    }
}

/// Forward and inverse matrices of the center-pivot transform.
///
/// Forward maps region-local coordinates to frame coordinates; inverse maps
/// frame coordinates back into the region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterPivot {
    forward: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl CenterPivot {
    pub fn new(width: f64, height: f64, orientation: Orientation) -> Self {
        let (cx, cy) = (width / 2.0, height / 2.0);
        let radians = orientation.rotation as f64 * std::f64::consts::PI / 180.0;
        let (sin, cos) = radians.sin_cos();
        // Rotation is always a quarter turn, so the trig terms are exact
        // integers; snapping keeps pixel-center math free of 1e-17 drift.
        let (sin, cos) = (sin.round(), cos.round());
        let sx = if orientation.flip_horizontal { -1.0 } else { 1.0 };
        let sy = if orientation.flip_vertical { -1.0 } else { 1.0 };

        let forward = translation(cx, cy)
            * scaling(sx, sy)
            * rotation(sin, cos)
            * translation(-cx, -cy);
        // Flips are their own inverse; rotation inverts by negating sin.
        let inverse = translation(cx, cy)
            * rotation(-sin, cos)
            * scaling(sx, sy)
            * translation(-cx, -cy);

        Self { forward, inverse }
    }

    /// Region-local point to frame point
    pub fn map(&self, x: f64, y: f64) -> (f64, f64) {
        apply(&self.forward, x, y)
    }

    /// Frame point to region-local point
    pub fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        apply(&self.inverse, x, y)
    }

    /// Rows of the inverse affine (a, b, c) / (d, e, f) for GPU upload
    pub fn inverse_rows(&self) -> [[f32; 3]; 2] {
        let m = &self.inverse;
        [
            [m[0][0] as f32, m[1][0] as f32, m[2][0] as f32],
            [m[0][1] as f32, m[1][1] as f32, m[2][1] as f32],
        ]
    }
}

fn apply(m: &Matrix3<f64>, x: f64, y: f64) -> (f64, f64) {
    let v = *m * Vector3::new(x, y, 1.0);
    (v.x, v.y)
}

// cgmath matrices are column-major: Matrix3::new takes column 0 first.

fn translation(tx: f64, ty: f64) -> Matrix3<f64> {
    Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, tx, ty, 1.0)
}

fn scaling(sx: f64, sy: f64) -> Matrix3<f64> {
    Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0)
}

fn rotation(sin: f64, cos: f64) -> Matrix3<f64> {
    Matrix3::new(cos, sin, 0.0, -sin, cos, 0.0, 0.0, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orient(rotation: u16, h: bool, v: bool) -> Orientation {
        Orientation {
            rotation,
            flip_horizontal: h,
            flip_vertical: v,
        }
    }

    #[test]
    fn test_identity_maps_points_to_themselves() {
        let pivot = Orientation::default().pivot(200.0, 100.0);
        assert_eq!(pivot.map(13.5, 7.25), (13.5, 7.25));
        assert_eq!(pivot.unmap(13.5, 7.25), (13.5, 7.25));
    }

    #[test]
    fn test_quarter_turn_is_clockwise_about_center() {
        let pivot = orient(90, false, false).pivot(100.0, 100.0);
        // Top-left corner goes to top-right
        assert_eq!(pivot.map(0.0, 0.0), (100.0, 0.0));
        assert_eq!(pivot.map(50.0, 50.0), (50.0, 50.0));
    }

    #[test]
    fn test_flip_applies_after_rotation() {
        let pivot = orient(90, true, false).pivot(100.0, 100.0);
        // Rotated to top-right, then mirrored back to top-left
        assert_eq!(pivot.map(0.0, 0.0), (0.0, 0.0));
        assert_eq!(pivot.map(100.0, 0.0), (0.0, 100.0));
    }

    #[test]
    fn test_inverse_undoes_forward() {
        for rotation in [0, 90, 180, 270] {
            for (h, v) in [(false, false), (true, false), (false, true), (true, true)] {
                let pivot = orient(rotation, h, v).pivot(64.0, 48.0);
                let (fx, fy) = pivot.map(3.5, 40.5);
                let (x, y) = pivot.unmap(fx, fy);
                assert!((x - 3.5).abs() < 1e-12 && (y - 40.5).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_inverse_rows_match_unmap() {
        let pivot = orient(270, false, true).pivot(30.0, 20.0);
        let [r0, r1] = pivot.inverse_rows();
        let (x, y) = pivot.unmap(4.5, 9.5);
        assert!((r0[0] * 4.5 + r0[1] * 9.5 + r0[2] - x as f32).abs() < 1e-4);
        assert!((r1[0] * 4.5 + r1[1] * 9.5 + r1[2] - y as f32).abs() < 1e-4);
    }
}
