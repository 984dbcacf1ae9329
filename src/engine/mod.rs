// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Mesh-warp engine contract and the reference grid engine.
//!
//! The session controller only talks to an engine through [`MeshEngine`].
//! An engine owns the curve grid (one set of boundary curves per region,
//! shared between neighbours), runs a pluggable [`SplitStrategy`] to turn
//! those curves into a point lattice, and rasterizes the lattice.

mod fit;
mod grid;
mod homography;
mod raster;
pub mod strategy;

pub use fit::{curve_point, fit_through, set_curve_point, straight};
pub use grid::GridWarp;
pub use homography::Homography;

use std::fmt;
use std::rc::Rc;

use image::RgbaImage;
use kurbo::{CubicBez, Point, Size, Vec2};
use peniko::Color;

use crate::error::WarpResult;
use crate::model::{Direction, GridPosition, VertexType, WarpState};
use crate::settings;
use crate::theme;

/// Lattice points per region, indexed `[row][col][point]`.
///
/// Each region holds `(n + 1)²` points in row-major order, where `n` is
/// [`RenderingConfig::divisions`].
pub type SplitPoints = Vec<Vec<Vec<Point>>>;

/// Identity of one curve in an engine's grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurveId(pub u64);

/// Named split algorithm registered with an engine
#[derive(Clone)]
pub struct SplitStrategy {
    name: String,
    execute: Rc<dyn Fn(&dyn MeshEngine) -> WarpResult<SplitPoints>>,
}

impl SplitStrategy {
    pub fn new(
        name: impl Into<String>,
        execute: impl Fn(&dyn MeshEngine) -> WarpResult<SplitPoints> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            execute: Rc::new(execute),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn execute(&self, engine: &dyn MeshEngine) -> WarpResult<SplitPoints> {
        (self.execute)(engine)
    }
}

impl fmt::Debug for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitStrategy")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Display toggles and lattice density
#[derive(Debug, Clone, Copy)]
pub struct RenderingConfig {
    /// Lattice step as a fraction of a region side
    pub split_unit: f64,
    /// Bilinear sampling instead of nearest neighbour
    pub enable_antialias: bool,
    pub enable_content_display: bool,
    pub enable_grid_display: bool,
    pub enable_grid_vertex_display: bool,
    pub grid_color: Color,
}

impl RenderingConfig {
    /// Lattice quads per region side
    pub fn divisions(&self) -> usize {
        if self.split_unit <= 0.0 || !self.split_unit.is_finite() {
            return 1;
        }
        ((1.0 / self.split_unit).ceil() as usize).clamp(1, 256)
    }
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            split_unit: settings::engine::SPLIT_UNIT,
            enable_antialias: true,
            enable_content_display: true,
            enable_grid_display: false,
            enable_grid_vertex_display: false,
            grid_color: theme::grid::OVERLAY,
        }
    }
}

/// Rasterized warp result
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub image: RgbaImage,
    pub width: u32,
    pub height: u32,
}

/// Boundary and interior curves of one region, outermost first and last
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionCurves {
    pub horizontal: Vec<CurveId>,
    pub vertical: Vec<CurveId>,
}

/// The four boundary curves of one region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryCurves {
    pub top: CurveId,
    pub right: CurveId,
    pub bottom: CurveId,
    pub left: CurveId,
}

impl BoundaryCurves {
    pub fn get(&self, direction: Direction) -> CurveId {
        match direction {
            Direction::Top => self.top,
            Direction::Right => self.right,
            Direction::Bottom => self.bottom,
            Direction::Left => self.left,
        }
    }
}

/// Lattice quad under a point.
///
/// Corners are ordered top-left, top-right, bottom-right, bottom-left.
/// `click_part` 0 is the triangle (tl, tr, bl), 1 is (br, tr, bl).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    pub row: usize,
    pub col: usize,
    /// Unwarped (source) corners
    pub before: [Point; 4],
    /// Warped corners
    pub after: [Point; 4],
    pub click_part: usize,
}

impl HitInfo {
    /// Triangle of `after` containing the hit
    pub fn after_triangle(&self) -> [Point; 3] {
        triangle(&self.after, self.click_part)
    }

    /// Matching triangle of `before`
    pub fn before_triangle(&self) -> [Point; 3] {
        triangle(&self.before, self.click_part)
    }
}

fn triangle(quad: &[Point; 4], part: usize) -> [Point; 3] {
    if part == 0 {
        [quad[0], quad[1], quad[3]]
    } else {
        [quad[2], quad[1], quad[3]]
    }
}

/// Contract between the session controller and a mesh-warp engine.
///
/// All coordinates are in the engine's curve space: the source image's
/// pixel space after the input size limit has been applied.
pub trait MeshEngine {
    /// Curve-space extent of the unwarped source
    fn source_size(&self) -> Size;

    fn set_split_strategy(&mut self, strategy: SplitStrategy);

    /// Downscale the source before warping when it exceeds `limit`
    fn set_input_limit_size(&mut self, limit: Size);

    /// Cap the rasterized output; `None` removes the cap
    fn set_output_limit_size(&mut self, limit: Option<Size>);

    fn rendering_config(&self) -> &RenderingConfig;

    fn set_rendering_config(&mut self, config: RenderingConfig);

    /// Run the split strategy and rasterize the result
    fn render(&mut self) -> WarpResult<RenderOutput>;

    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    /// Boundary plus interior lattice curves per region
    fn region_curves(&self) -> Vec<Vec<RegionCurves>>;

    fn region_boundary_curves(&self) -> Vec<Vec<BoundaryCurves>>;

    fn curve(&self, id: CurveId) -> Option<CubicBez>;

    fn set_curve(&mut self, id: CurveId, curve: CubicBez);

    /// Position of a shared vertex
    fn vertex(&self, position: GridPosition) -> Option<Point>;

    /// Move the corner `vertex` of region `(row, col)`.
    ///
    /// With `recompute`, interior control points of the touched curves
    /// follow the move; without it only the endpoints change.
    fn update_vertex_coord(
        &mut self,
        row: usize,
        col: usize,
        vertex: VertexType,
        point: Point,
        recompute: bool,
    );

    /// Add split lines through an unwarped source `point` inside region
    /// `(row, col)`
    fn split_region_by_point(&mut self, row: usize, col: usize, point: Point) -> WarpResult<()>;

    /// Remove the split lines through each vertex; returns whether the grid
    /// changed. Outer corners are never removed.
    fn remove_regions(&mut self, positions: &[GridPosition]) -> bool;

    /// Lattice quad under a warped curve-space point, from the last render
    fn hit_info(&self, point: Point) -> Option<HitInfo>;

    fn warp_state(&self) -> WarpState;

    fn set_warp_state(&mut self, state: &WarpState);

    fn is_unwarped(&self) -> bool;

    /// Straighten every curve back onto its split lines
    fn reset_warp_state(&mut self);

    /// Visit every region side; shared curves are visited once per region
    /// that references them
    fn for_each_region_bound_coords(
        &mut self,
        visitor: &mut dyn FnMut(usize, usize, Direction, CurveId, &mut CubicBez),
    );

    /// Output pixels per curve-space unit used by the last render
    fn scale(&self) -> Vec2;
}
