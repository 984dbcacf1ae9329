// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Projective mapping between the unit square and a quadrilateral.

use kurbo::Point;

/// 3×3 projective transform.
///
/// Maps `(x, y)` to `((sx·x + shx·y + tx) / w, (shy·x + sy·y + ty) / w)`
/// with `w = w0·x + w1·y + w2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    sx: f64,
    shy: f64,
    w0: f64,
    shx: f64,
    sy: f64,
    w1: f64,
    tx: f64,
    ty: f64,
    w2: f64,
}

impl Homography {
    /// Map the unit square onto `quad` (tl, tr, br, bl).
    ///
    /// `(0,0)` lands on `quad[0]`, `(1,0)` on `quad[1]`, `(1,1)` on
    /// `quad[2]` and `(0,1)` on `quad[3]`. Returns `None` for a singular
    /// quad.
    pub fn square_to_quad(quad: [Point; 4]) -> Option<Self> {
        let [p0, p1, p2, p3] = quad;
        let dx = p0.x - p1.x + p2.x - p3.x;
        let dy = p0.y - p1.y + p2.y - p3.y;

        if dx == 0.0 && dy == 0.0 {
            // parallelogram
            return Some(Self {
                sx: p1.x - p0.x,
                shy: p1.y - p0.y,
                w0: 0.0,
                shx: p2.x - p1.x,
                sy: p2.y - p1.y,
                w1: 0.0,
                tx: p0.x,
                ty: p0.y,
                w2: 1.0,
            });
        }

        let dx1 = p1.x - p2.x;
        let dy1 = p1.y - p2.y;
        let dx2 = p3.x - p2.x;
        let dy2 = p3.y - p2.y;
        let den = dx1 * dy2 - dx2 * dy1;
        if den == 0.0 {
            return None;
        }
        let u = (dx * dy2 - dy * dx2) / den;
        let v = (dy * dx1 - dx * dy1) / den;
        Some(Self {
            sx: p1.x - p0.x + u * p1.x,
            shy: p1.y - p0.y + u * p1.y,
            w0: u,
            shx: p3.x - p0.x + v * p3.x,
            sy: p3.y - p0.y + v * p3.y,
            w1: v,
            tx: p0.x,
            ty: p0.y,
            w2: 1.0,
        })
    }

    /// Map `quad` onto the unit square
    pub fn quad_to_square(quad: [Point; 4]) -> Option<Self> {
        Self::square_to_quad(quad)?.invert()
    }

    pub fn invert(&self) -> Option<Self> {
        let d0 = self.sy * self.w2 - self.w1 * self.ty;
        let d1 = self.w0 * self.ty - self.shy * self.w2;
        let d2 = self.shy * self.w1 - self.w0 * self.sy;
        let d = self.sx * d0 + self.shx * d1 + self.tx * d2;
        if d == 0.0 || !d.is_finite() {
            return None;
        }
        let d = 1.0 / d;
        let a = self;
        Some(Self {
            sx: d * d0,
            shy: d * d1,
            w0: d * d2,
            shx: d * (a.w1 * a.tx - a.shx * a.w2),
            sy: d * (a.sx * a.w2 - a.w0 * a.tx),
            w1: d * (a.w0 * a.shx - a.sx * a.w1),
            tx: d * (a.shx * a.ty - a.sy * a.tx),
            ty: d * (a.shy * a.tx - a.sx * a.ty),
            w2: d * (a.sx * a.sy - a.shy * a.shx),
        })
    }

    pub fn apply(&self, p: Point) -> Point {
        let m = 1.0 / (p.x * self.w0 + p.y * self.w1 + self.w2);
        Point::new(
            m * (p.x * self.sx + p.y * self.shx + self.tx),
            m * (p.x * self.shy + p.y * self.sy + self.ty),
        )
    }
}
