// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Scene objects: the warped image, boundary paths, handles and guide lines.
//!
//! Every object is positioned by its center. Its own transform is
//! `translate(center) · rotate(angle) · scale(scale × flip)` applied to
//! local coordinates centered on the origin. Paths additionally carry a
//! path offset: path data lives in curve space, and the offset is the
//! center of the path's own bounding box.

use std::sync::Arc;

use image::RgbaImage;
use kurbo::{Affine, CubicBez, Line, ParamCurveExtrema, Point, Rect, Vec2};
use peniko::Color;

/// Compositing mode for the warped image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    SourceOver,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
}

/// Geometry of a scene object
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Image(Arc<RgbaImage>),
    /// Single cubic in curve space; `offset` is the center of its bounds
    Path { curve: CubicBez, offset: Vec2 },
    Circle { radius: f64 },
    Rect,
    /// Segment in canvas coordinates
    Line(Line),
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub kind: ObjectKind,
    pub center: Point,
    /// Unscaled width
    pub width: f64,
    /// Unscaled height
    pub height: f64,
    /// Rotation in degrees
    pub angle: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub flip_x: bool,
    pub flip_y: bool,
    pub opacity: f64,
    pub blend: BlendMode,
    pub visible: bool,
    pub selectable: bool,
    /// Receives pointer events
    pub evented: bool,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    /// Hit-test against painted pixels instead of the bounding box
    pub per_pixel_target_find: bool,
    /// Show resize/rotate affordances when selected
    pub has_controls: bool,
    pub has_borders: bool,
}

impl SceneObject {
    fn with_kind(kind: ObjectKind, center: Point, width: f64, height: f64) -> Self {
        Self {
            kind,
            center,
            width,
            height,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            flip_x: false,
            flip_y: false,
            opacity: 1.0,
            blend: BlendMode::default(),
            visible: true,
            selectable: true,
            evented: true,
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            per_pixel_target_find: false,
            has_controls: true,
            has_borders: true,
        }
    }

    pub fn image(image: RgbaImage, center: Point) -> Self {
        let (w, h) = image.dimensions();
        Self::with_kind(ObjectKind::Image(Arc::new(image)), center, w as f64, h as f64)
    }

    /// Path whose local origin is the center of the curve's bounds
    pub fn path(curve: CubicBez) -> Self {
        let bounds = curve.bounding_box();
        let offset = bounds.center().to_vec2();
        Self::with_kind(
            ObjectKind::Path { curve, offset },
            bounds.center(),
            bounds.width(),
            bounds.height(),
        )
    }

    pub fn circle(radius: f64, center: Point) -> Self {
        Self::with_kind(
            ObjectKind::Circle { radius },
            center,
            radius * 2.0,
            radius * 2.0,
        )
    }

    pub fn rect(width: f64, height: f64, center: Point) -> Self {
        Self::with_kind(ObjectKind::Rect, center, width, height)
    }

    pub fn line(line: Line) -> Self {
        let bounds = line.bounding_box();
        Self::with_kind(
            ObjectKind::Line(line),
            line.midpoint(),
            bounds.width(),
            bounds.height(),
        )
    }

    /// Object-local to canvas transform
    pub fn own_matrix(&self) -> Affine {
        let sx = if self.flip_x { -self.scale_x } else { self.scale_x };
        let sy = if self.flip_y { -self.scale_y } else { self.scale_y };
        Affine::translate(self.center.to_vec2())
            * Affine::rotate(self.angle.to_radians())
            * Affine::scale_non_uniform(sx, sy)
    }

    /// Path offset; zero for anything but paths
    pub fn path_offset(&self) -> Vec2 {
        match &self.kind {
            ObjectKind::Path { offset, .. } => *offset,
            _ => Vec2::ZERO,
        }
    }

    /// Curve of a path object
    pub fn curve(&self) -> Option<CubicBez> {
        match &self.kind {
            ObjectKind::Path { curve, .. } => Some(*curve),
            _ => None,
        }
    }

    pub fn pixels(&self) -> Option<&Arc<RgbaImage>> {
        match &self.kind {
            ObjectKind::Image(img) => Some(img),
            _ => None,
        }
    }

    /// Replace the pixels of an image object, resizing it to match
    pub fn set_pixels(&mut self, image: RgbaImage) {
        let (w, h) = image.dimensions();
        self.kind = ObjectKind::Image(Arc::new(image));
        self.width = w as f64;
        self.height = h as f64;
    }

    /// Move a line's endpoints, keeping `center` on its midpoint
    pub fn set_line(&mut self, line: Line) {
        let bounds = line.bounding_box();
        self.kind = ObjectKind::Line(line);
        self.center = line.midpoint();
        self.width = bounds.width();
        self.height = bounds.height();
    }

    /// Translate by `delta` in canvas space
    pub fn translate(&mut self, delta: Vec2) {
        self.center += delta;
        if let ObjectKind::Line(line) = &mut self.kind {
            line.p0 += delta;
            line.p1 += delta;
        }
    }

    /// Canvas-space axis-aligned bounds
    pub fn bounds(&self) -> Rect {
        if let ObjectKind::Line(line) = &self.kind {
            return line.bounding_box();
        }
        let m = self.own_matrix();
        let half = Vec2::new(self.width / 2.0, self.height / 2.0);
        let corners = [
            Point::new(-half.x, -half.y),
            Point::new(half.x, -half.y),
            Point::new(half.x, half.y),
            Point::new(-half.x, half.y),
        ];
        let first = m * corners[0];
        corners[1..]
            .iter()
            .fold(Rect::from_points(first, first), |r, p| r.union_pt(m * *p))
    }

    /// Whether a canvas-space point falls on this object
    pub fn contains(&self, point: Point) -> bool {
        if let ObjectKind::Line(line) = &self.kind {
            let d = line.p1 - line.p0;
            let len2 = d.hypot2();
            let t = if len2 == 0.0 {
                0.0
            } else {
                ((point - line.p0).dot(d) / len2).clamp(0.0, 1.0)
            };
            return (point - (line.p0 + d * t)).hypot() <= self.stroke_width.max(1.0) * 2.0;
        }
        let m = self.own_matrix();
        if m.determinant().abs() < f64::EPSILON {
            return false;
        }
        let local = m.inverse() * point;
        match &self.kind {
            ObjectKind::Circle { radius } => local.to_vec2().hypot() <= *radius,
            _ => local.x.abs() <= self.width / 2.0 && local.y.abs() <= self.height / 2.0,
        }
    }
}
