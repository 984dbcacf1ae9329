// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Reference mesh engine.
//!
//! The grid is a set of full-width row split lines and full-height column
//! split lines over the source. Every edge between two neighbouring
//! vertices is one cubic stored once under a [`CurveId`]:
//!
//! - `horizontal[r][c]` joins vertex `(r, c)` to `(r, c + 1)`
//! - `vertical[r][c]` joins vertex `(r, c)` to `(r + 1, c)`
//!
//! so two regions sharing a side share the curve, and four regions sharing
//! a corner share the vertex. Vertex positions are read from curve
//! endpoints; every mutation keeps all endpoints of a vertex identical.

use std::collections::HashMap;

use image::RgbaImage;
use image::imageops::{self, FilterType};
use kurbo::{Affine, CubicBez, ParamCurve, ParamCurveExtrema, Point, Rect, Size, Vec2};

use super::fit::{fit_through, follow_endpoint, straight};
use super::raster::Raster;
use super::strategy::{self, coons_point};
use super::{
    BoundaryCurves, CurveId, HitInfo, MeshEngine, RegionCurves, RenderOutput, RenderingConfig,
    SplitPoints, SplitStrategy,
};
use crate::error::{WarpError, WarpResult};
use crate::model::{Direction, GridPosition, RegionBounds, VertexType, WarpState};
use crate::settings;

const EPSILON: f64 = settings::engine::EPSILON;

/// Reference [`MeshEngine`] over an in-memory RGBA source
pub struct GridWarp {
    original: RgbaImage,
    /// `original` after the input size limit
    source: RgbaImage,
    output_limit: Option<Size>,
    config: RenderingConfig,
    strategy: SplitStrategy,
    row_splits: Vec<f64>,
    col_splits: Vec<f64>,
    horizontal: Vec<Vec<CurveId>>,
    vertical: Vec<Vec<CurveId>>,
    /// Interior lattice curves from the last render, per region
    interior: Vec<Vec<RegionCurves>>,
    curves: HashMap<CurveId, CubicBez>,
    next_curve: u64,
    lattice: Option<SplitPoints>,
    output_scale: f64,
}

impl GridWarp {
    /// Engine with a single unwarped region covering `source`
    pub fn new(source: RgbaImage) -> Self {
        let mut engine = Self {
            original: source.clone(),
            source,
            output_limit: None,
            config: RenderingConfig::default(),
            strategy: SplitStrategy::new("warp", strategy::warp),
            row_splits: vec![0.0, 1.0],
            col_splits: vec![0.0, 1.0],
            horizontal: Vec::new(),
            vertical: Vec::new(),
            interior: Vec::new(),
            curves: HashMap::new(),
            next_curve: 0,
            lattice: None,
            output_scale: 1.0,
        };
        engine.straighten();
        engine
    }

    /// Name of the registered split strategy
    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    fn size(&self) -> Size {
        Size::new(self.source.width() as f64, self.source.height() as f64)
    }

    fn alloc(&mut self, curve: CubicBez) -> CurveId {
        let id = CurveId(self.next_curve);
        self.next_curve += 1;
        self.curves.insert(id, curve);
        id
    }

    fn get(&self, id: CurveId) -> CubicBez {
        // every id in the grid tables is present in `curves`
        self.curves.get(&id).copied().unwrap_or(CubicBez::new(
            Point::ZERO,
            Point::ZERO,
            Point::ZERO,
            Point::ZERO,
        ))
    }

    fn unwarped_vertex(&self, row: usize, col: usize) -> Point {
        let size = self.size();
        Point::new(
            self.col_splits[col] * size.width,
            self.row_splits[row] * size.height,
        )
    }

    fn invalidate(&mut self) {
        for region in self.interior.drain(..).flatten() {
            for id in region.horizontal.iter().chain(&region.vertical) {
                self.curves.remove(id);
            }
        }
        self.lattice = None;
    }

    /// Replace every curve with straight edges on the current split lines
    fn straighten(&mut self) {
        self.invalidate();
        self.curves.clear();
        let rows = self.row_splits.len() - 1;
        let cols = self.col_splits.len() - 1;
        self.horizontal = (0..=rows)
            .map(|r| {
                (0..cols)
                    .map(|c| {
                        let a = self.unwarped_vertex(r, c);
                        let b = self.unwarped_vertex(r, c + 1);
                        self.alloc(straight(a, b))
                    })
                    .collect()
            })
            .collect();
        self.vertical = (0..rows)
            .map(|r| {
                (0..=cols)
                    .map(|c| {
                        let a = self.unwarped_vertex(r, c);
                        let b = self.unwarped_vertex(r + 1, c);
                        self.alloc(straight(a, b))
                    })
                    .collect()
            })
            .collect();
    }

    /// Curves touching a vertex, with whether the vertex is their start
    fn incident_curves(&self, pos: GridPosition) -> Vec<(CurveId, bool)> {
        let rows = self.rows();
        let cols = self.cols();
        let mut out = Vec::with_capacity(4);
        if pos.col > 0 {
            out.push((self.horizontal[pos.row][pos.col - 1], false));
        }
        if pos.col < cols {
            out.push((self.horizontal[pos.row][pos.col], true));
        }
        if pos.row > 0 {
            out.push((self.vertical[pos.row - 1][pos.col], false));
        }
        if pos.row < rows {
            out.push((self.vertical[pos.row][pos.col], true));
        }
        out
    }

    fn boundary(&self, row: usize, col: usize) -> BoundaryCurves {
        BoundaryCurves {
            top: self.horizontal[row][col],
            right: self.vertical[row][col + 1],
            bottom: self.horizontal[row + 1][col],
            left: self.vertical[row][col],
        }
    }

    /// Re-grid onto new split lines, carrying the current deformation over
    fn regrid(&mut self, rows: Vec<f64>, cols: Vec<f64>) {
        let old = Snapshot {
            rows: self.row_splits.clone(),
            cols: self.col_splits.clone(),
            horizontal: self
                .horizontal
                .iter()
                .map(|r| r.iter().map(|id| self.get(*id)).collect())
                .collect(),
            vertical: self
                .vertical
                .iter()
                .map(|r| r.iter().map(|id| self.get(*id)).collect())
                .collect(),
        };

        let vertices: Vec<Vec<Point>> = rows
            .iter()
            .map(|&y| cols.iter().map(|&x| old.sample(x, y)).collect())
            .collect();

        self.invalidate();
        self.curves.clear();
        self.horizontal = (0..rows.len())
            .map(|r| {
                (0..cols.len() - 1)
                    .map(|c| {
                        let mut curve = old.horizontal_edge(rows[r], cols[c], cols[c + 1]);
                        curve.p0 = vertices[r][c];
                        curve.p3 = vertices[r][c + 1];
                        self.alloc(curve)
                    })
                    .collect()
            })
            .collect();
        self.vertical = (0..rows.len() - 1)
            .map(|r| {
                (0..cols.len())
                    .map(|c| {
                        let mut curve = old.vertical_edge(cols[c], rows[r], rows[r + 1]);
                        curve.p0 = vertices[r][c];
                        curve.p3 = vertices[r + 1][c];
                        self.alloc(curve)
                    })
                    .collect()
            })
            .collect();
        self.row_splits = rows;
        self.col_splits = cols;
    }

    fn curves_bounds(&self) -> Option<Rect> {
        self.region_curves()
            .iter()
            .flatten()
            .flat_map(|region| region.horizontal.iter().chain(&region.vertical))
            .filter_map(|id| self.curves.get(id))
            .map(|c| c.bounding_box())
            .reduce(|a, b| a.union(b))
    }

    /// Fit interior lattice curves through the rows and columns of each
    /// region's lattice
    fn build_interior(&mut self, lattice: &SplitPoints, n: usize) {
        self.invalidate();
        let mut interior = Vec::with_capacity(lattice.len());
        for cells in lattice {
            let mut row_out = Vec::with_capacity(cells.len());
            for points in cells {
                let at = |i: usize, j: usize| points[i * (n + 1) + j];
                let mut region = RegionCurves::default();
                for i in 1..n {
                    let samples = polyline_samples(&(0..=n).map(|j| at(i, j)).collect::<Vec<_>>());
                    region.horizontal.push(self.alloc(fit_through(samples)));
                }
                for j in 1..n {
                    let samples = polyline_samples(&(0..=n).map(|i| at(i, j)).collect::<Vec<_>>());
                    region.vertical.push(self.alloc(fit_through(samples)));
                }
                row_out.push(region);
            }
            interior.push(row_out);
        }
        self.interior = interior;
    }

    fn check_lattice(&self, lattice: &SplitPoints, n: usize) -> WarpResult<()> {
        let expected = (n + 1) * (n + 1);
        let ok = lattice.len() == self.rows()
            && lattice
                .iter()
                .all(|r| r.len() == self.cols() && r.iter().all(|c| c.len() == expected));
        if ok {
            Ok(())
        } else {
            Err(WarpError::invalid_shape("split strategy returned a mismatched lattice"))
        }
    }

    fn source_rect(&self, row: usize, col: usize) -> Rect {
        let size = self.size();
        Rect::new(
            self.col_splits[col] * size.width,
            self.row_splits[row] * size.height,
            self.col_splits[col + 1] * size.width,
            self.row_splits[row + 1] * size.height,
        )
    }
}

/// Immutable copy of the curve grid used while re-gridding
struct Snapshot {
    rows: Vec<f64>,
    cols: Vec<f64>,
    horizontal: Vec<Vec<CubicBez>>,
    vertical: Vec<Vec<CubicBez>>,
}

impl Snapshot {
    fn line_index(splits: &[f64], value: f64) -> Option<usize> {
        splits.iter().position(|s| (s - value).abs() <= EPSILON)
    }

    /// Span `i` with `splits[i] <= value <= splits[i + 1]`
    fn span(splits: &[f64], value: f64) -> usize {
        let last = splits.len() - 2;
        splits
            .windows(2)
            .position(|w| value <= w[1] + EPSILON)
            .unwrap_or(last)
            .min(last)
    }

    fn param(splits: &[f64], span: usize, value: f64) -> f64 {
        let len = splits[span + 1] - splits[span];
        if len <= 0.0 {
            0.0
        } else {
            ((value - splits[span]) / len).clamp(0.0, 1.0)
        }
    }

    fn sides(&self, row: usize, col: usize) -> [CubicBez; 4] {
        [
            self.horizontal[row][col],
            self.vertical[row][col + 1],
            self.horizontal[row + 1][col],
            self.vertical[row][col],
        ]
    }

    /// Deformed position of the normalized source point `(x, y)`
    fn sample(&self, x: f64, y: f64) -> Point {
        let on_row = Self::line_index(&self.rows, y);
        let on_col = Self::line_index(&self.cols, x);
        match (on_row, on_col) {
            (Some(r), Some(c)) => {
                if c < self.cols.len() - 1 {
                    self.horizontal[r][c].p0
                } else {
                    self.horizontal[r][c - 1].p3
                }
            }
            (Some(r), None) => {
                let c = Self::span(&self.cols, x);
                self.horizontal[r][c].eval(Self::param(&self.cols, c, x))
            }
            (None, Some(c)) => {
                let r = Self::span(&self.rows, y);
                self.vertical[r][c].eval(Self::param(&self.rows, r, y))
            }
            (None, None) => {
                let r = Self::span(&self.rows, y);
                let c = Self::span(&self.cols, x);
                let u = Self::param(&self.cols, c, x);
                let v = Self::param(&self.rows, r, y);
                coons_point(&self.sides(r, c), u, v)
            }
        }
    }

    fn horizontal_edge(&self, y: f64, x0: f64, x1: f64) -> CubicBez {
        if let Some(r) = Self::line_index(&self.rows, y) {
            let c = Self::span(&self.cols, x0 + (x1 - x0) / 2.0);
            if x0 >= self.cols[c] - EPSILON && x1 <= self.cols[c + 1] + EPSILON {
                let t0 = Self::param(&self.cols, c, x0);
                let t1 = Self::param(&self.cols, c, x1);
                return self.horizontal[r][c].subsegment(t0..t1);
            }
        }
        fit_through(thirds(|t| self.sample(x0 + (x1 - x0) * t, y)))
    }

    fn vertical_edge(&self, x: f64, y0: f64, y1: f64) -> CubicBez {
        if let Some(c) = Self::line_index(&self.cols, x) {
            let r = Self::span(&self.rows, y0 + (y1 - y0) / 2.0);
            if y0 >= self.rows[r] - EPSILON && y1 <= self.rows[r + 1] + EPSILON {
                let t0 = Self::param(&self.rows, r, y0);
                let t1 = Self::param(&self.rows, r, y1);
                return self.vertical[r][c].subsegment(t0..t1);
            }
        }
        fit_through(thirds(|t| self.sample(x, y0 + (y1 - y0) * t)))
    }
}

fn thirds(f: impl Fn(f64) -> Point) -> [Point; 4] {
    [f(0.0), f(1.0 / 3.0), f(2.0 / 3.0), f(1.0)]
}

/// Samples at t = 0, 1/3, 2/3, 1 along an evenly parameterized polyline
fn polyline_samples(points: &[Point]) -> [Point; 4] {
    let segments = points.len().saturating_sub(1).max(1);
    thirds(|t| {
        let pos = t * segments as f64;
        let i = (pos.floor() as usize).min(segments - 1);
        let a = points[i.min(points.len() - 1)];
        let b = points[(i + 1).min(points.len() - 1)];
        a.lerp(b, pos - i as f64)
    })
}

fn point_in_triangle(p: Point, tri: [Point; 3]) -> bool {
    let d1 = (tri[1] - tri[0]).cross(p - tri[0]);
    let d2 = (tri[2] - tri[1]).cross(p - tri[1]);
    let d3 = (tri[0] - tri[2]).cross(p - tri[2]);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

impl MeshEngine for GridWarp {
    fn source_size(&self) -> Size {
        self.size()
    }

    fn set_split_strategy(&mut self, strategy: SplitStrategy) {
        tracing::debug!("split strategy set to {}", strategy.name());
        self.strategy = strategy;
    }

    fn set_input_limit_size(&mut self, limit: Size) {
        let (w, h) = (self.original.width() as f64, self.original.height() as f64);
        let k = (limit.width / w).min(limit.height / h).min(1.0);
        let nw = ((w * k).round() as u32).max(1);
        let nh = ((h * k).round() as u32).max(1);
        if (nw, nh) == self.source.dimensions() {
            return;
        }
        let old = self.size();
        self.source = if (nw, nh) == self.original.dimensions() {
            self.original.clone()
        } else {
            imageops::resize(&self.original, nw, nh, FilterType::Triangle)
        };
        let ratio = Affine::scale_non_uniform(nw as f64 / old.width, nh as f64 / old.height);
        for curve in self.curves.values_mut() {
            *curve = ratio * *curve;
        }
        self.lattice = None;
        tracing::debug!("input limited to {}x{}", nw, nh);
    }

    fn set_output_limit_size(&mut self, limit: Option<Size>) {
        self.output_limit = limit;
    }

    fn rendering_config(&self) -> &RenderingConfig {
        &self.config
    }

    fn set_rendering_config(&mut self, config: RenderingConfig) {
        self.config = config;
    }

    fn render(&mut self) -> WarpResult<RenderOutput> {
        let n = self.config.divisions();
        let lattice = self.strategy.execute(&*self)?;
        self.check_lattice(&lattice, n)?;
        self.build_interior(&lattice, n);

        let bounds = self
            .curves_bounds()
            .unwrap_or_else(|| Rect::from_origin_size(Point::ZERO, self.size()));
        let mut factor = 1.0_f64;
        if let Some(limit) = self.output_limit {
            factor = factor
                .min(limit.width / bounds.width().max(EPSILON))
                .min(limit.height / bounds.height().max(EPSILON));
        }
        self.output_scale = factor;

        let raster = Raster {
            source: &self.source,
            lattice: &lattice,
            row_splits: &self.row_splits,
            col_splits: &self.col_splits,
            divisions: n,
            bounds,
            factor,
            config: &self.config,
        };
        let (width, height) = raster.output_size();
        let max = settings::engine::MAX_OUTPUT_DIMENSION;
        let image = if width > max || height > max {
            tracing::warn!(
                "warp output {}x{} exceeds {}px; returning a blank image",
                width,
                height,
                max
            );
            RgbaImage::new(1, 1)
        } else {
            raster.run()
        };
        self.lattice = Some(lattice);
        let (width, height) = image.dimensions();
        Ok(RenderOutput {
            image,
            width,
            height,
        })
    }

    fn rows(&self) -> usize {
        self.row_splits.len() - 1
    }

    fn cols(&self) -> usize {
        self.col_splits.len() - 1
    }

    fn region_curves(&self) -> Vec<Vec<RegionCurves>> {
        (0..self.rows())
            .map(|r| {
                (0..self.cols())
                    .map(|c| {
                        let b = self.boundary(r, c);
                        let inner = self.interior.get(r).and_then(|row| row.get(c));
                        let mut horizontal = vec![b.top];
                        let mut vertical = vec![b.left];
                        if let Some(inner) = inner {
                            horizontal.extend(&inner.horizontal);
                            vertical.extend(&inner.vertical);
                        }
                        horizontal.push(b.bottom);
                        vertical.push(b.right);
                        RegionCurves {
                            horizontal,
                            vertical,
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn region_boundary_curves(&self) -> Vec<Vec<BoundaryCurves>> {
        (0..self.rows())
            .map(|r| (0..self.cols()).map(|c| self.boundary(r, c)).collect())
            .collect()
    }

    fn curve(&self, id: CurveId) -> Option<CubicBez> {
        self.curves.get(&id).copied()
    }

    fn set_curve(&mut self, id: CurveId, curve: CubicBez) {
        if let Some(slot) = self.curves.get_mut(&id) {
            *slot = curve;
        }
    }

    fn vertex(&self, position: GridPosition) -> Option<Point> {
        if position.row > self.rows() || position.col > self.cols() {
            return None;
        }
        let (id, start) = self.incident_curves(position).into_iter().next()?;
        let curve = self.curves.get(&id)?;
        Some(if start { curve.p0 } else { curve.p3 })
    }

    fn update_vertex_coord(
        &mut self,
        row: usize,
        col: usize,
        vertex: VertexType,
        point: Point,
        recompute: bool,
    ) {
        let pos = vertex.position(row, col);
        let Some(current) = self.vertex(pos) else {
            tracing::debug!("ignoring update of vertex {} outside the grid", pos);
            return;
        };
        let delta = point - current;
        for (id, start) in self.incident_curves(pos) {
            if let Some(curve) = self.curves.get_mut(&id) {
                if recompute {
                    follow_endpoint(curve, start, delta);
                }
                // pin exactly so every incident curve agrees on the vertex
                if start {
                    curve.p0 = point;
                } else {
                    curve.p3 = point;
                }
            }
        }
    }

    fn split_region_by_point(&mut self, row: usize, col: usize, point: Point) -> WarpResult<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(WarpError::RegionOutOfRange { row, col });
        }
        let size = self.size();
        let x = point.x / size.width;
        let y = point.y / size.height;
        let mut rows = self.row_splits.clone();
        let mut cols = self.col_splits.clone();
        let mut changed = false;
        if y > EPSILON && y < 1.0 - EPSILON && Snapshot::line_index(&rows, y).is_none() {
            let at = rows.partition_point(|s| *s < y);
            rows.insert(at, y);
            changed = true;
        }
        if x > EPSILON && x < 1.0 - EPSILON && Snapshot::line_index(&cols, x).is_none() {
            let at = cols.partition_point(|s| *s < x);
            cols.insert(at, x);
            changed = true;
        }
        if changed {
            tracing::debug!("split region ({}, {}) at ({:.3}, {:.3})", row, col, x, y);
            self.regrid(rows, cols);
        }
        Ok(())
    }

    fn remove_regions(&mut self, positions: &[GridPosition]) -> bool {
        let rows = self.rows();
        let cols = self.cols();
        let mut drop_rows = Vec::new();
        let mut drop_cols = Vec::new();
        for pos in positions {
            if pos.row > rows || pos.col > cols {
                continue;
            }
            if pos.row > 0 && pos.row < rows {
                drop_rows.push(pos.row);
            }
            if pos.col > 0 && pos.col < cols {
                drop_cols.push(pos.col);
            }
        }
        if drop_rows.is_empty() && drop_cols.is_empty() {
            return false;
        }
        let keep = |splits: &[f64], drop: &[usize]| -> Vec<f64> {
            splits
                .iter()
                .enumerate()
                .filter(|(i, _)| !drop.contains(i))
                .map(|(_, s)| *s)
                .collect()
        };
        let new_rows = keep(&self.row_splits, &drop_rows);
        let new_cols = keep(&self.col_splits, &drop_cols);
        tracing::debug!(
            "removing split rows {:?} and cols {:?}",
            drop_rows,
            drop_cols
        );
        self.regrid(new_rows, new_cols);
        true
    }

    fn hit_info(&self, point: Point) -> Option<HitInfo> {
        let lattice = self.lattice.as_ref()?;
        let n = self.config.divisions();
        for (row, cells) in lattice.iter().enumerate() {
            for (col, points) in cells.iter().enumerate() {
                let src = self.source_rect(row, col);
                let before_at = |i: usize, j: usize| {
                    Point::new(
                        src.x0 + src.width() * j as f64 / n as f64,
                        src.y0 + src.height() * i as f64 / n as f64,
                    )
                };
                for i in 0..n {
                    for j in 0..n {
                        let idx = |i: usize, j: usize| i * (n + 1) + j;
                        let after = [
                            points[idx(i, j)],
                            points[idx(i, j + 1)],
                            points[idx(i + 1, j + 1)],
                            points[idx(i + 1, j)],
                        ];
                        let before = [
                            before_at(i, j),
                            before_at(i, j + 1),
                            before_at(i + 1, j + 1),
                            before_at(i + 1, j),
                        ];
                        for part in 0..2 {
                            let info = HitInfo {
                                row,
                                col,
                                before,
                                after,
                                click_part: part,
                            };
                            if point_in_triangle(point, info.after_triangle()) {
                                return Some(info);
                            }
                        }
                    }
                }
            }
        }
        None
    }

    fn warp_state(&self) -> WarpState {
        let split_points = self
            .row_splits
            .iter()
            .map(|&y| self.col_splits.iter().map(|&x| Point::new(x, y)).collect())
            .collect();
        let points = |id: CurveId| {
            let c = self.get(id);
            [c.p0, c.p1, c.p2, c.p3]
        };
        let region_bounds = (0..self.rows())
            .map(|r| {
                (0..self.cols())
                    .map(|c| {
                        let b = self.boundary(r, c);
                        RegionBounds {
                            top: points(b.top),
                            right: points(b.right),
                            bottom: points(b.bottom),
                            left: points(b.left),
                        }
                    })
                    .collect()
            })
            .collect();
        WarpState {
            split_points,
            region_bounds,
        }
    }

    fn set_warp_state(&mut self, state: &WarpState) {
        let rows = state.rows();
        let cols = state.cols();
        let consistent = rows > 0
            && cols > 0
            && state.split_points.len() == rows + 1
            && state.split_points.iter().all(|r| r.len() == cols + 1)
            && state.region_bounds.iter().all(|r| r.len() == cols);
        if !consistent {
            tracing::warn!("ignoring malformed warp state ({}x{})", rows, cols);
            return;
        }
        let bez = |p: &[Point; 4]| CubicBez::new(p[0], p[1], p[2], p[3]);
        self.invalidate();
        self.curves.clear();
        self.row_splits = state.split_points.iter().map(|r| r[0].y).collect();
        self.col_splits = state.split_points[0].iter().map(|p| p.x).collect();
        self.horizontal = (0..=rows)
            .map(|r| {
                (0..cols)
                    .map(|c| {
                        let bounds = &state.region_bounds[r.min(rows - 1)][c];
                        let side = if r < rows { &bounds.top } else { &bounds.bottom };
                        self.alloc(bez(side))
                    })
                    .collect()
            })
            .collect();
        self.vertical = (0..rows)
            .map(|r| {
                (0..=cols)
                    .map(|c| {
                        let bounds = &state.region_bounds[r][c.min(cols - 1)];
                        let side = if c < cols { &bounds.left } else { &bounds.right };
                        self.alloc(bez(side))
                    })
                    .collect()
            })
            .collect();
    }

    fn is_unwarped(&self) -> bool {
        let close = |a: Point, b: Point| (a - b).hypot() <= 1e-6;
        let same = |curve: CubicBez, expected: CubicBez| {
            close(curve.p0, expected.p0)
                && close(curve.p1, expected.p1)
                && close(curve.p2, expected.p2)
                && close(curve.p3, expected.p3)
        };
        let horizontal = self.horizontal.iter().enumerate().all(|(r, ids)| {
            ids.iter().enumerate().all(|(c, id)| {
                same(
                    self.get(*id),
                    straight(self.unwarped_vertex(r, c), self.unwarped_vertex(r, c + 1)),
                )
            })
        });
        let vertical = self.vertical.iter().enumerate().all(|(r, ids)| {
            ids.iter().enumerate().all(|(c, id)| {
                same(
                    self.get(*id),
                    straight(self.unwarped_vertex(r, c), self.unwarped_vertex(r + 1, c)),
                )
            })
        });
        horizontal && vertical
    }

    fn reset_warp_state(&mut self) {
        self.straighten();
    }

    fn for_each_region_bound_coords(
        &mut self,
        visitor: &mut dyn FnMut(usize, usize, Direction, CurveId, &mut CubicBez),
    ) {
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                let bounds = self.boundary(row, col);
                for direction in Direction::ALL {
                    let id = bounds.get(direction);
                    if let Some(curve) = self.curves.get_mut(&id) {
                        visitor(row, col, direction, id, curve);
                    }
                }
            }
        }
    }

    fn scale(&self) -> Vec2 {
        Vec2::new(self.output_scale, self.output_scale)
    }
}
