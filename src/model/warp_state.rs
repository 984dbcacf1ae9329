// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Grid addressing and serializable warp snapshots.
//!
//! A grid of `rows × cols` regions has `(rows + 1) × (cols + 1)` vertices.
//! Regions are addressed by `(row, col)`; vertices by a `GridPosition`
//! in the finer vertex space, so the corner shared by four neighbouring
//! regions has exactly one position.

use std::fmt;

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Corner of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexType {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl VertexType {
    /// (row offset, col offset) of this corner relative to its region
    pub fn offsets(self) -> (usize, usize) {
        match self {
            VertexType::TopLeft => (0, 0),
            VertexType::TopRight => (0, 1),
            VertexType::BottomLeft => (1, 0),
            VertexType::BottomRight => (1, 1),
        }
    }

    /// Vertex-space position of this corner of region `(row, col)`
    pub fn position(self, row: usize, col: usize) -> GridPosition {
        let (dr, dc) = self.offsets();
        GridPosition::new(row + dr, col + dc)
    }
}

/// Side of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Top,
    Right,
    Bottom,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
        Direction::Left,
    ];

    /// Corners at the start (`p0`) and end (`p3`) of this side's curve.
    ///
    /// Horizontal sides run left to right, vertical sides top to bottom.
    pub fn endpoints(self) -> [VertexType; 2] {
        match self {
            Direction::Top => [VertexType::TopLeft, VertexType::TopRight],
            Direction::Right => [VertexType::TopRight, VertexType::BottomRight],
            Direction::Bottom => [VertexType::BottomLeft, VertexType::BottomRight],
            Direction::Left => [VertexType::TopLeft, VertexType::BottomLeft],
        }
    }
}

/// Vertex-space grid position, rendered as `"row-col"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: usize,
    pub col: usize,
}

impl GridPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

/// Control points of the four boundary curves of one region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub top: [Point; 4],
    pub right: [Point; 4],
    pub bottom: [Point; 4],
    pub left: [Point; 4],
}

impl RegionBounds {
    pub fn side(&self, direction: Direction) -> &[Point; 4] {
        match direction {
            Direction::Top => &self.top,
            Direction::Right => &self.right,
            Direction::Bottom => &self.bottom,
            Direction::Left => &self.left,
        }
    }
}

/// Snapshot of a mesh deformation, used for history entries.
///
/// Owns plain point data only, so a snapshot never aliases live engine
/// curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarpState {
    /// Normalized (0..=1) source position of every split vertex,
    /// indexed `[vertex_row][vertex_col]`
    pub split_points: Vec<Vec<Point>>,
    /// Curve-space boundary curves, indexed `[row][col]`
    pub region_bounds: Vec<Vec<RegionBounds>>,
}

impl WarpState {
    pub fn rows(&self) -> usize {
        self.region_bounds.len()
    }

    pub fn cols(&self) -> usize {
        self.region_bounds.first().map_or(0, Vec::len)
    }

    /// Compare two snapshots point by point within `epsilon`
    pub fn approx_eq(&self, other: &WarpState, epsilon: f64) -> bool {
        let close = |a: &Point, b: &Point| (a.x - b.x).abs() <= epsilon && (a.y - b.y).abs() <= epsilon;
        if self.rows() != other.rows() || self.cols() != other.cols() {
            return false;
        }
        let splits = self
            .split_points
            .iter()
            .flatten()
            .zip(other.split_points.iter().flatten())
            .all(|(a, b)| close(a, b));
        let bounds = self
            .region_bounds
            .iter()
            .flatten()
            .zip(other.region_bounds.iter().flatten())
            .all(|(a, b)| {
                Direction::ALL.iter().all(|&d| {
                    a.side(d).iter().zip(b.side(d).iter()).all(|(p, q)| close(p, q))
                })
            });
        splits && bounds
    }
}
