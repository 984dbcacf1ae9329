// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Conversions between viewport, canvas and object-local coordinates.
//!
//! - viewport: pointer/device space, after the canvas pan/zoom
//! - canvas: the scene's own pixel space
//! - local: an object's space before its own transform; for paths this is
//!   the curve space the mesh engine works in

use kurbo::{Affine, Point, Vec2};

use crate::canvas::SceneObject;

/// Inverse of `m`, or `None` when it collapses the plane
pub fn invert(m: Affine) -> Option<Affine> {
    let det = m.determinant();
    if det.abs() < f64::EPSILON || !det.is_finite() {
        None
    } else {
        Some(m.inverse())
    }
}

/// Viewport pointer position to canvas coordinates
pub fn canvas_coord(viewport: Affine, pointer: Point) -> Point {
    invert(viewport).map_or(pointer, |inv| inv * pointer)
}

/// Canvas position to the local space of `object`.
///
/// For paths the path offset is added back, so the result is directly
/// comparable with the path's curve points.
pub fn relative_coord(position: Point, object: &SceneObject) -> Point {
    let local = invert(object.own_matrix()).map_or(position, |inv| inv * position);
    local + object.path_offset()
}

/// Local point of `object` to canvas coordinates
pub fn object_to_canvas(point: Point, object: &SceneObject) -> Point {
    object.own_matrix() * (point - object.path_offset())
}

/// Apply only the linear part of `m` (no translation)
pub fn transform_vector(v: Vec2, m: Affine) -> Vec2 {
    let [a, b, c, d, _, _] = m.as_coeffs();
    Vec2::new(a * v.x + c * v.y, b * v.x + d * v.y)
}

/// Affine map taking triangle `from` onto triangle `to`
pub fn affine_from_triangles(from: [Point; 3], to: [Point; 3]) -> Option<Affine> {
    let e1 = from[1] - from[0];
    let e2 = from[2] - from[0];
    let g1 = to[1] - to[0];
    let g2 = to[2] - to[0];
    let src = Affine::new([e1.x, e1.y, e2.x, e2.y, 0.0, 0.0]);
    let dst = Affine::new([g1.x, g1.y, g2.x, g2.y, 0.0, 0.0]);
    let linear = dst * invert(src)?;
    Some(Affine::translate(to[0].to_vec2()) * linear * Affine::translate(-from[0].to_vec2()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::CubicBez;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn relative_coord_inverts_object_transform() {
        let curve = CubicBez::new((0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 20.0));
        let mut path = SceneObject::path(curve);
        path.center = Point::new(200.0, 100.0);
        path.angle = 30.0;
        path.scale_x = 1.5;
        path.flip_x = true;
        let local = Point::new(20.0, 0.0);
        let canvas = object_to_canvas(local, &path);
        assert!(close(relative_coord(canvas, &path), local));
    }

    #[test]
    fn canvas_coord_undoes_viewport() {
        let viewport = Affine::translate((10.0, 20.0)) * Affine::scale(2.0);
        let p = canvas_coord(viewport, Point::new(30.0, 40.0));
        assert!(close(p, Point::new(10.0, 10.0)));
    }

    #[test]
    fn vectors_ignore_translation() {
        let m = Affine::translate((100.0, 100.0)) * Affine::scale_non_uniform(2.0, -1.0);
        assert_eq!(transform_vector(Vec2::new(1.0, 1.0), m), Vec2::new(2.0, -1.0));
    }

    #[test]
    fn triangle_mapping_hits_all_corners() {
        let from = [Point::new(0.0, 0.0), Point::new(4.0, 1.0), Point::new(1.0, 5.0)];
        let to = [Point::new(10.0, 10.0), Point::new(12.0, 10.0), Point::new(10.0, 13.0)];
        let m = affine_from_triangles(from, to).unwrap();
        for (f, t) in from.iter().zip(to.iter()) {
            assert!(close(m * *f, *t));
        }
        let flat = [Point::ZERO, Point::new(1.0, 1.0), Point::new(2.0, 2.0)];
        assert!(affine_from_triangles(flat, to).is_none());
    }
}
