// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Lattice rasterizer.
//!
//! Every lattice quad is filled by mapping output pixels back into the unit
//! square of that quad and from there into the matching source rectangle.

use image::{Rgba, RgbaImage};
use kurbo::{Point, Rect, Size};

use super::{Homography, RenderingConfig, SplitPoints};
use crate::settings;

/// Inputs for one rasterization pass
pub(super) struct Raster<'a> {
    pub source: &'a RgbaImage,
    pub lattice: &'a SplitPoints,
    /// Normalized split lines
    pub row_splits: &'a [f64],
    pub col_splits: &'a [f64],
    pub divisions: usize,
    /// Curve-space rect covered by the output
    pub bounds: Rect,
    /// Output pixels per curve unit
    pub factor: f64,
    pub config: &'a RenderingConfig,
}

impl Raster<'_> {
    /// Pixel size of the output; fitting noise on the curves must not add
    /// a pixel row or column.
    pub fn output_size(&self) -> (u32, u32) {
        let pixels = |extent: f64| {
            (extent * self.factor - settings::engine::EPSILON)
                .ceil()
                .max(1.0)
        };
        (
            pixels(self.bounds.width()) as u32,
            pixels(self.bounds.height()) as u32,
        )
    }

    fn to_output(&self, p: Point) -> Point {
        ((p - self.bounds.origin()) * self.factor).to_point()
    }

    pub fn run(&self) -> RgbaImage {
        let (width, height) = self.output_size();
        let mut out = RgbaImage::new(width, height);
        let n = self.divisions;
        let src_size = Size::new(self.source.width() as f64, self.source.height() as f64);

        for (row, cells) in self.lattice.iter().enumerate() {
            for (col, points) in cells.iter().enumerate() {
                let x0 = self.col_splits[col] * src_size.width;
                let x1 = self.col_splits[col + 1] * src_size.width;
                let y0 = self.row_splits[row] * src_size.height;
                let y1 = self.row_splits[row + 1] * src_size.height;
                for i in 0..n {
                    for j in 0..n {
                        let quad = [
                            points[i * (n + 1) + j],
                            points[i * (n + 1) + j + 1],
                            points[(i + 1) * (n + 1) + j + 1],
                            points[(i + 1) * (n + 1) + j],
                        ]
                        .map(|p| self.to_output(p));
                        if self.config.enable_content_display {
                            let src = Rect::new(
                                x0 + (x1 - x0) * j as f64 / n as f64,
                                y0 + (y1 - y0) * i as f64 / n as f64,
                                x0 + (x1 - x0) * (j + 1) as f64 / n as f64,
                                y0 + (y1 - y0) * (i + 1) as f64 / n as f64,
                            );
                            self.fill_quad(&mut out, quad, src);
                        }
                        if self.config.enable_grid_display {
                            let color = grid_pixel(self.config);
                            draw_line(&mut out, quad[0], quad[1], color);
                            draw_line(&mut out, quad[0], quad[3], color);
                            if j + 1 == n {
                                draw_line(&mut out, quad[1], quad[2], color);
                            }
                            if i + 1 == n {
                                draw_line(&mut out, quad[3], quad[2], color);
                            }
                        }
                    }
                }
                if self.config.enable_grid_vertex_display {
                    let color = grid_pixel(self.config);
                    for p in points {
                        draw_dot(&mut out, self.to_output(*p), color);
                    }
                }
            }
        }
        out
    }

    fn fill_quad(&self, out: &mut RgbaImage, quad: [Point; 4], src: Rect) {
        let Some(inverse) = Homography::quad_to_square(quad) else {
            return;
        };
        let bbox = quad
            .iter()
            .skip(1)
            .fold(Rect::from_points(quad[0], quad[0]), |r, p| r.union_pt(*p));
        let px0 = bbox.x0.floor().max(0.0) as u32;
        let py0 = bbox.y0.floor().max(0.0) as u32;
        let px1 = (bbox.x1.ceil() as u32).min(out.width());
        let py1 = (bbox.y1.ceil() as u32).min(out.height());
        const EDGE: f64 = 1e-6;
        for py in py0..py1 {
            for px in px0..px1 {
                let st = inverse.apply(Point::new(px as f64 + 0.5, py as f64 + 0.5));
                if !(-EDGE..=1.0 + EDGE).contains(&st.x) || !(-EDGE..=1.0 + EDGE).contains(&st.y) {
                    continue;
                }
                let sx = src.x0 + src.width() * st.x.clamp(0.0, 1.0);
                let sy = src.y0 + src.height() * st.y.clamp(0.0, 1.0);
                let pixel = if self.config.enable_antialias {
                    sample_bilinear(self.source, sx, sy)
                } else {
                    sample_nearest(self.source, sx, sy)
                };
                out.put_pixel(px, py, pixel);
            }
        }
    }
}

fn grid_pixel(config: &RenderingConfig) -> Rgba<u8> {
    let c = config.grid_color.to_rgba8();
    Rgba([c.r, c.g, c.b, c.a])
}

fn sample_nearest(img: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let max_x = img.width().saturating_sub(1);
    let max_y = img.height().saturating_sub(1);
    let ix = (x.floor().max(0.0) as u32).min(max_x);
    let iy = (y.floor().max(0.0) as u32).min(max_y);
    *img.get_pixel(ix, iy)
}

fn sample_bilinear(img: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let max_x = img.width().saturating_sub(1) as f64;
    let max_y = img.height().saturating_sub(1) as f64;
    let fx = (x - 0.5).clamp(0.0, max_x);
    let fy = (y - 0.5).clamp(0.0, max_y);
    let x0 = fx.floor();
    let y0 = fy.floor();
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);
    let tx = fx - x0;
    let ty = fy - y0;
    let at = |px: f64, py: f64| img.get_pixel(px as u32, py as u32).0;
    let (a, b, c, d) = (at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1));
    let mut out = [0u8; 4];
    for k in 0..4 {
        let top = a[k] as f64 * (1.0 - tx) + b[k] as f64 * tx;
        let bottom = c[k] as f64 * (1.0 - tx) + d[k] as f64 * tx;
        out[k] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

fn put(out: &mut RgbaImage, x: f64, y: f64, color: Rgba<u8>) {
    if x < 0.0 || y < 0.0 {
        return;
    }
    let (ix, iy) = (x as u32, y as u32);
    if ix < out.width() && iy < out.height() {
        out.put_pixel(ix, iy, color);
    }
}

fn draw_line(out: &mut RgbaImage, a: Point, b: Point, color: Rgba<u8>) {
    let steps = (b - a).hypot().ceil().max(1.0) as usize;
    for k in 0..=steps {
        let p = a.lerp(b, k as f64 / steps as f64);
        put(out, p.x, p.y, color);
    }
}

fn draw_dot(out: &mut RgbaImage, p: Point, color: Rgba<u8>) {
    for dy in -1..=1 {
        for dx in -1..=1 {
            put(out, p.x + dx as f64, p.y + dy as f64, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_lattice(size: f64, n: usize) -> SplitPoints {
        let mut points = Vec::new();
        for i in 0..=n {
            for j in 0..=n {
                points.push(Point::new(
                    size * j as f64 / n as f64,
                    size * i as f64 / n as f64,
                ));
            }
        }
        vec![vec![points]]
    }

    #[test]
    fn identity_lattice_copies_the_source() {
        let mut source = RgbaImage::new(8, 8);
        source.put_pixel(2, 5, Rgba([255, 0, 0, 255]));
        let lattice = identity_lattice(8.0, 2);
        let config = RenderingConfig {
            enable_antialias: false,
            ..RenderingConfig::default()
        };
        let raster = Raster {
            source: &source,
            lattice: &lattice,
            row_splits: &[0.0, 1.0],
            col_splits: &[0.0, 1.0],
            divisions: 2,
            bounds: Rect::new(0.0, 0.0, 8.0, 8.0),
            factor: 1.0,
            config: &config,
        };
        let out = raster.run();
        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(out.get_pixel(2, 5).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(5, 2).0, [0, 0, 0, 0]);
    }

    #[test]
    fn output_factor_shrinks_the_image() {
        let source = RgbaImage::new(8, 8);
        let lattice = identity_lattice(8.0, 1);
        let config = RenderingConfig::default();
        let raster = Raster {
            source: &source,
            lattice: &lattice,
            row_splits: &[0.0, 1.0],
            col_splits: &[0.0, 1.0],
            divisions: 1,
            bounds: Rect::new(0.0, 0.0, 8.0, 8.0),
            factor: 0.5,
            config: &config,
        };
        assert_eq!(raster.output_size(), (4, 4));
    }

    #[test]
    fn curve_noise_does_not_grow_the_output() {
        let source = RgbaImage::new(40, 20);
        let lattice = identity_lattice(40.0, 1);
        let config = RenderingConfig::default();
        let mut raster = Raster {
            source: &source,
            lattice: &lattice,
            row_splits: &[0.0, 1.0],
            col_splits: &[0.0, 1.0],
            divisions: 1,
            bounds: Rect::new(-1e-14, 0.0, 40.000000000000014, 20.000000000000007),
            factor: 1.0,
            config: &config,
        };
        assert_eq!(raster.output_size(), (40, 20));
        raster.bounds = Rect::new(0.0, 0.0, 40.25, 20.0);
        assert_eq!(raster.output_size(), (41, 20));
    }
}
