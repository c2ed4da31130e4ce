//! Shape metrics stored with, or used to match, directed edges

use log::warn;

use crate::formats::directed_edge::MAX_CURVATURE;
use crate::point::PointLL;

/// Radius (m) above which a turn does not count as curved
const STRAIGHT_RADIUS: f64 = 1000.0;
const RADIUS_SCORE_FACTOR: f64 = 1500.0;
const MAX_TRIPLE_SCORE: f64 = 25.0;

/// Quantized curvature 0..=15 of a polyline.
///
/// Every consecutive triple of points contributes `1500 / radius` of its
/// circumscribed circle (0 for radii over 1 km, at most 25). Triples that do
/// not define a circle are skipped. The average is capped at 15.
pub fn compute_curvature(shape: &[PointLL]) -> u32 {
    if shape.len() < 3 {
        return 0;
    }

    let mut n = 0u32;
    let mut total = 0.0;
    for triple in shape.windows(3) {
        let Some(radius) = triple[0].circumradius(&triple[1], &triple[2]) else {
            continue;
        };
        let score = if radius > STRAIGHT_RADIUS {
            0.0
        } else {
            (RADIUS_SCORE_FACTOR / radius).min(MAX_TRIPLE_SCORE)
        };
        total += score;
        n += 1;
    }

    if n == 0 {
        return 0;
    }
    (total / n as f64).min(MAX_CURVATURE as f64) as u32
}

/// Whether two shapes are the same polyline, in either direction
pub fn shapes_match(shape1: &[PointLL], shape2: &[PointLL]) -> bool {
    if shape1.len() != shape2.len() {
        return false;
    }
    let (Some(first), Some(first2), Some(last2)) = (shape1.first(), shape2.first(), shape2.last())
    else {
        return true;
    };

    if first == first2 {
        shape1.iter().eq(shape2.iter())
    } else if first == last2 {
        shape1.iter().eq(shape2.iter().rev())
    } else {
        warn!("Neither end of the shape matches");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lon: f64, lat: f64) -> PointLL {
        PointLL::new(lon, lat)
    }

    #[test]
    fn test_two_points_no_curvature() {
        assert_eq!(compute_curvature(&[p(4.0, 50.0), p(4.1, 50.1)]), 0);
        assert_eq!(compute_curvature(&[]), 0);
    }

    #[test]
    fn test_collinear_no_curvature() {
        let shape = [p(4.0, 50.0), p(4.0, 50.001), p(4.0, 50.002)];
        assert_eq!(compute_curvature(&shape), 0);
    }

    #[test]
    fn test_tight_turn_saturates() {
        // ~11m legs at a right angle: radius ~8m, score capped at 25
        let shape = [p(4.0, 50.0), p(4.0, 50.0001), p(4.00015, 50.0001)];
        assert_eq!(compute_curvature(&shape), 15);
    }

    #[test]
    fn test_gentle_curve_is_low() {
        // Points on a wide arc: radius well above 1km
        let shape = [p(4.0, 50.0), p(4.01, 50.0002), p(4.02, 50.0)];
        assert_eq!(compute_curvature(&shape), 0);
    }

    #[test]
    fn test_average_over_valid_triples() {
        // A saturated triple (25) and a nearly straight one (0) average to 12
        let shape = [
            p(4.0, 50.0),
            p(4.0, 50.0001),
            p(4.00015, 50.0001),
            p(4.02, 50.0003),
        ];
        assert_eq!(compute_curvature(&shape), 12);
    }

    #[test]
    fn test_shapes_match() {
        let a = vec![p(1.0, 1.0), p(1.5, 1.2), p(2.0, 2.0)];
        let mut rev = a.clone();
        rev.reverse();

        assert!(shapes_match(&a, &a));
        assert!(shapes_match(&a, &rev));
        assert!(!shapes_match(&a, &a[..2]));

        let other = vec![p(9.0, 9.0), p(1.5, 1.2), p(8.0, 8.0)];
        let logged = crate::test_log::levels(|| assert!(!shapes_match(&a, &other)));
        assert_eq!(logged, vec![log::Level::Warn]);

        // Same ends, different middle
        let bent = vec![p(1.0, 1.0), p(1.4, 1.2), p(2.0, 2.0)];
        let logged = crate::test_log::levels(|| assert!(!shapes_match(&a, &bent)));
        assert!(logged.is_empty());
    }
}
