//! Joint geometry primitives.

use formcoach_pose_model::Point2;

/// Angle at vertex `b` between rays `b->a` and `b->c`, in degrees.
///
/// Returns 0 when either ray has zero length. The result lies in
/// [0, 180] and is rounded to two decimals.
pub fn angle(a: Point2, b: Point2, c: Point2) -> f64 {
    let (ux, uy) = (a.x - b.x, a.y - b.y);
    let (vx, vy) = (c.x - b.x, c.y - b.y);

    let norms = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
    if norms == 0.0 || !norms.is_finite() {
        return 0.0;
    }

    let cos = ((ux * vx + uy * vy) / norms).clamp(-1.0, 1.0);
    round2(cos.acos().to_degrees())
}

/// Euclidean distance between two points.
pub fn distance(p: Point2, q: Point2) -> f64 {
    ((p.x - q.x).powi(2) + (p.y - q.y).powi(2)).sqrt()
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn test_right_angle_corner() {
        // rays (-1, 0) and (0, 1) are perpendicular
        assert_eq!(angle(p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)), 90.0);
    }

    #[test]
    fn test_half_right_angle() {
        assert_eq!(angle(p(1.0, 0.0), p(0.0, 0.0), p(1.0, 1.0)), 45.0);
    }

    #[test]
    fn test_zero_length_ray_is_zero() {
        assert_eq!(angle(p(1.0, 0.0), p(1.0, 0.0), p(3.0, 4.0)), 0.0);
        assert_eq!(angle(p(1.0, 0.0), p(2.0, 2.0), p(2.0, 2.0)), 0.0);
    }

    #[test]
    fn test_straight_line_is_180() {
        assert_eq!(angle(p(0.0, 0.0), p(5.0, 5.0), p(10.0, 10.0)), 180.0);
    }

    #[test]
    fn test_rounding() {
        // 60.000000001-ish drift must collapse to 60.0
        let a = angle(p(1.0, 0.0), p(0.0, 0.0), p(0.5, 3f64.sqrt() / 2.0));
        assert_eq!(a, 60.0);
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(p(0.0, 0.0), p(3.0, 4.0)), 5.0);
        assert_eq!(distance(p(2.0, 2.0), p(2.0, 2.0)), 0.0);
    }

    proptest! {
        #[test]
        fn angle_stays_in_range(
            ax in -1000.0f64..1000.0, ay in -1000.0f64..1000.0,
            bx in -1000.0f64..1000.0, by in -1000.0f64..1000.0,
            cx in -1000.0f64..1000.0, cy in -1000.0f64..1000.0,
        ) {
            let a = angle(p(ax, ay), p(bx, by), p(cx, cy));
            prop_assert!((0.0..=180.0).contains(&a));
        }

        #[test]
        fn angle_is_symmetric(
            ax in -100.0f64..100.0, ay in -100.0f64..100.0,
            cx in -100.0f64..100.0, cy in -100.0f64..100.0,
        ) {
            let b = p(3.0, -7.0);
            prop_assert_eq!(angle(p(ax, ay), b, p(cx, cy)), angle(p(cx, cy), b, p(ax, ay)));
        }
    }
}
