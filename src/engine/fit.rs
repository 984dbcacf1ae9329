// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Cubic construction helpers

use kurbo::{CubicBez, Point};

/// Straight cubic from `a` to `b` with control points at the thirds
pub fn straight(a: Point, b: Point) -> CubicBez {
    CubicBez::new(a, a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b)
}

/// Cubic passing through `samples` at t = 0, 1/3, 2/3, 1
pub fn fit_through(samples: [Point; 4]) -> CubicBez {
    let [p0, s1, s2, p3] = samples.map(|p| p.to_vec2());
    let c1 = (p0 * -5.0 + s1 * 18.0 - s2 * 9.0 + p3 * 2.0) / 6.0;
    let c2 = (p0 * 2.0 - s1 * 9.0 + s2 * 18.0 - p3 * 5.0) / 6.0;
    CubicBez::new(samples[0], c1.to_point(), c2.to_point(), samples[3])
}

/// Shift the interior control points after an endpoint moved by `delta`.
///
/// The point next to the moved end takes two thirds of the move and the
/// far one a third, so a straight cubic stays straight.
pub fn follow_endpoint(curve: &mut CubicBez, at_start: bool, delta: kurbo::Vec2) {
    if at_start {
        curve.p0 += delta;
        curve.p1 += delta * (2.0 / 3.0);
        curve.p2 += delta * (1.0 / 3.0);
    } else {
        curve.p3 += delta;
        curve.p2 += delta * (2.0 / 3.0);
        curve.p1 += delta * (1.0 / 3.0);
    }
}

/// Control point `index` (0..=3) of `curve`
pub fn curve_point(curve: &CubicBez, index: usize) -> Point {
    match index {
        0 => curve.p0,
        1 => curve.p1,
        2 => curve.p2,
        _ => curve.p3,
    }
}

pub fn set_curve_point(curve: &mut CubicBez, index: usize, point: Point) {
    match index {
        0 => curve.p0 = point,
        1 => curve.p1 = point,
        2 => curve.p2 = point,
        _ => curve.p3 = point,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{ParamCurve, Vec2};

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn fit_reproduces_samples() {
        let samples = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(20.0, -3.0),
            Point::new(30.0, 0.0),
        ];
        let c = fit_through(samples);
        assert!(close(c.eval(0.0), samples[0]));
        assert!(close(c.eval(1.0 / 3.0), samples[1]));
        assert!(close(c.eval(2.0 / 3.0), samples[2]));
        assert!(close(c.eval(1.0), samples[3]));
    }

    #[test]
    fn fit_of_straight_samples_is_straight() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(7.0, 11.0);
        let c = fit_through([a, a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b]);
        let s = straight(a, b);
        assert!(close(c.p1, s.p1));
        assert!(close(c.p2, s.p2));
    }

    #[test]
    fn following_an_endpoint_keeps_straight_curves_straight() {
        let mut c = straight(Point::new(0.0, 0.0), Point::new(9.0, 0.0));
        follow_endpoint(&mut c, true, Vec2::new(3.0, 6.0));
        let expected = straight(Point::new(3.0, 6.0), Point::new(9.0, 0.0));
        assert!(close(c.p1, expected.p1));
        assert!(close(c.p2, expected.p2));
    }

    #[test]
    fn indexed_point_access() {
        let mut c = straight(Point::ZERO, Point::new(3.0, 0.0));
        assert!(close(curve_point(&c, 2), Point::new(2.0, 0.0)));
        assert_eq!(curve_point(&c, 3), Point::new(3.0, 0.0));
        set_curve_point(&mut c, 1, Point::new(1.0, 5.0));
        assert_eq!(c.p1, Point::new(1.0, 5.0));
    }
}
