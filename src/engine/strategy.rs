// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Built-in split strategies.
//!
//! A split strategy turns an engine's boundary curves into the point
//! lattice the rasterizer maps the source through.

use kurbo::{CubicBez, ParamCurve, Point};

use super::{BoundaryCurves, Homography, MeshEngine, SplitPoints};
use crate::error::{WarpError, WarpResult};
use crate::model::GridPosition;
use crate::settings;

/// Boundary curves of one region in (top, right, bottom, left) order
pub fn region_sides(engine: &dyn MeshEngine, bounds: &BoundaryCurves) -> Option<[CubicBez; 4]> {
    Some([
        engine.curve(bounds.top)?,
        engine.curve(bounds.right)?,
        engine.curve(bounds.bottom)?,
        engine.curve(bounds.left)?,
    ])
}

/// Coons patch through four boundary curves at `(u, v)`.
///
/// Top and bottom run left to right in `u`; left and right run top to
/// bottom in `v`.
pub fn coons_point(sides: &[CubicBez; 4], u: f64, v: f64) -> Point {
    let [top, right, bottom, left] = sides;
    let t = top.eval(u).to_vec2();
    let b = bottom.eval(u).to_vec2();
    let l = left.eval(v).to_vec2();
    let r = right.eval(v).to_vec2();
    let tl = top.p0.to_vec2();
    let tr = top.p3.to_vec2();
    let bl = bottom.p0.to_vec2();
    let br = bottom.p3.to_vec2();
    let ruled = t * (1.0 - v) + b * v + l * (1.0 - u) + r * u;
    let bilinear =
        tl * ((1.0 - u) * (1.0 - v)) + tr * (u * (1.0 - v)) + bl * ((1.0 - u) * v) + br * (u * v);
    (ruled - bilinear).to_point()
}

/// Free-form warp: every region is filled with a Coons patch of its own
/// boundary curves.
pub fn warp(engine: &dyn MeshEngine) -> WarpResult<SplitPoints> {
    let n = engine.rendering_config().divisions();
    let mut out = Vec::with_capacity(engine.rows());
    for (row, cells) in engine.region_boundary_curves().iter().enumerate() {
        let mut row_points = Vec::with_capacity(cells.len());
        for (col, bounds) in cells.iter().enumerate() {
            let sides =
                region_sides(engine, bounds).ok_or(WarpError::RegionOutOfRange { row, col })?;
            let mut lattice = Vec::with_capacity((n + 1) * (n + 1));
            for i in 0..=n {
                let v = i as f64 / n as f64;
                for j in 0..=n {
                    let u = j as f64 / n as f64;
                    lattice.push(coons_point(&sides, u, v));
                }
            }
            row_points.push(lattice);
        }
        out.push(row_points);
    }
    Ok(out)
}

/// Four-corner perspective: the whole grid follows one homography defined
/// by the outer corner vertices.
///
/// Fails with [`WarpError::InvalidShape`] when the corners are degenerate
/// or do not form a convex quadrilateral.
pub fn perspective(engine: &dyn MeshEngine) -> WarpResult<SplitPoints> {
    let rows = engine.rows();
    let cols = engine.cols();
    let corner = |row, col| {
        engine
            .vertex(GridPosition::new(row, col))
            .ok_or(WarpError::RegionOutOfRange { row, col })
    };
    let quad = [corner(0, 0)?, corner(0, cols)?, corner(rows, cols)?, corner(rows, 0)?];
    validate_quad(&quad)?;
    let homography = Homography::square_to_quad(quad)
        .ok_or_else(|| WarpError::invalid_shape("singular perspective quad"))?;

    let n = engine.rendering_config().divisions();
    let state = engine.warp_state();
    let mut out = Vec::with_capacity(rows);
    for row in 0..rows {
        let mut row_points = Vec::with_capacity(cols);
        for col in 0..cols {
            let top_left = state.split_points[row][col];
            let bottom_right = state.split_points[row + 1][col + 1];
            let mut lattice = Vec::with_capacity((n + 1) * (n + 1));
            for i in 0..=n {
                let y = top_left.y + (bottom_right.y - top_left.y) * i as f64 / n as f64;
                for j in 0..=n {
                    let x = top_left.x + (bottom_right.x - top_left.x) * j as f64 / n as f64;
                    lattice.push(homography.apply(Point::new(x, y)));
                }
            }
            row_points.push(lattice);
        }
        out.push(row_points);
    }
    Ok(out)
}

/// Reject degenerate, self-intersecting and concave quads (tl, tr, br, bl)
pub fn validate_quad(quad: &[Point; 4]) -> WarpResult<()> {
    let eps = settings::engine::EPSILON;
    let mut sign = 0.0;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        let c = quad[(i + 2) % 4];
        let cross = (b - a).cross(c - b);
        if cross.abs() <= eps {
            return Err(WarpError::invalid_shape("collinear corners"));
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return Err(WarpError::invalid_shape("quad is not convex"));
        }
    }
    // a convex turn sequence can still wind twice around (a bow tie with
    // consistent turns), so check the area too
    let area: f64 = (0..4)
        .map(|i| quad[i].to_vec2().cross(quad[(i + 1) % 4].to_vec2()))
        .sum::<f64>()
        / 2.0;
    if area.abs() <= eps || area.signum() != sign {
        return Err(WarpError::invalid_shape("quad winds over itself"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::straight;

    fn square_sides(size: f64) -> [CubicBez; 4] {
        let tl = Point::new(0.0, 0.0);
        let tr = Point::new(size, 0.0);
        let br = Point::new(size, size);
        let bl = Point::new(0.0, size);
        [straight(tl, tr), straight(tr, br), straight(bl, br), straight(tl, bl)]
    }

    #[test]
    fn coons_patch_of_square_is_bilinear() {
        let sides = square_sides(10.0);
        let p = coons_point(&sides, 0.25, 0.5);
        assert!((p - Point::new(2.5, 5.0)).hypot() < 1e-9);
    }

    #[test]
    fn convex_quads_pass_in_either_winding() {
        let quad = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(validate_quad(&quad).is_ok());
        let mirrored = [quad[1], quad[0], quad[3], quad[2]];
        assert!(validate_quad(&mirrored).is_ok());
    }

    #[test]
    fn bow_tie_is_rejected() {
        let quad = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
        ];
        assert!(matches!(validate_quad(&quad), Err(WarpError::InvalidShape(_))));
    }

    #[test]
    fn concave_quad_is_rejected() {
        let quad = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(3.0, 3.0),
            Point::new(0.0, 10.0),
        ];
        assert!(validate_quad(&quad).is_err());
    }
}
