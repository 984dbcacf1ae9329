// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Rebuilding the session visuals from a fresh engine render.
//!
//! Paths live in curve space. One affine (the "grid" transform) maps curve
//! space onto the canvas so the warp stays anchored to the target:
//!
//! ```text
//! grid = translate(center) · rotate(angle) · scale(±sx, ±sy) · translate(-bounds.center)
//! ```
//!
//! where `center` is the target's center plus the drift of the curve
//! bounds since the first render.

use kurbo::{Affine, ParamCurveExtrema, Point, Rect, Vec2};

use super::state::{Anchor, Session};
use crate::canvas::{Canvas, SceneObject};
use crate::coords::transform_vector;
use crate::engine::RenderOutput;
use crate::settings;

/// Replace every path object with one per distinct curve in the grid
pub(super) fn rebuild_paths(session: &mut Session, canvas: &mut dyn Canvas) {
    for path in session.paths.drain(..) {
        canvas.discard(path);
    }
    session.curve_paths.clear();
    session.path_curves.clear();

    let regions = session.engine.region_curves();
    for region in regions.iter().flatten() {
        for id in region.horizontal.iter().chain(&region.vertical) {
            // neighbours share curves
            if session.curve_paths.contains_key(id) {
                continue;
            }
            let Some(curve) = session.engine.curve(*id) else {
                continue;
            };
            let mut object = SceneObject::path(curve);
            object.selectable = false;
            object.evented = false;
            let path = canvas.insert(object);
            session.paths.push(path);
            session.curve_paths.insert(*id, path);
            session.path_curves.insert(path, *id);
        }
    }
}

/// Union of the bounds of every path's curve
fn curve_bounds(session: &Session) -> Option<Rect> {
    session
        .path_curves
        .values()
        .filter_map(|id| session.engine.curve(*id))
        .map(|c| c.bounding_box())
        .reduce(|a, b| a.union(b))
}

/// Position the warped image and the paths over the target.
///
/// Returns `false` when the target has gone from the canvas.
pub(super) fn place(session: &mut Session, canvas: &mut dyn Canvas, output: RenderOutput) -> bool {
    let Some(target) = canvas.object(session.target).cloned() else {
        tracing::warn!("warp target {:?} left the canvas", session.target);
        return false;
    };
    let source = session.engine.source_size();
    let bounds = curve_bounds(session)
        .unwrap_or_else(|| Rect::from_origin_size(Point::ZERO, source));

    let out_w = output.width.max(1) as f64;
    let out_h = output.height.max(1) as f64;
    let anchor = *session.anchor.get_or_insert_with(|| {
        let engine_scale = session.engine.scale();
        Anchor {
            bounds,
            warp_scale: Vec2::new(
                session.snapshot_size.width / out_w * engine_scale.x,
                session.snapshot_size.height / out_h * engine_scale.y,
            ),
        }
    });
    let ws = anchor.warp_scale;

    let drift = bounds.center() - anchor.bounds.center();
    let offset = transform_vector(Vec2::new(drift.x * ws.x, drift.y * ws.y), target.own_matrix());
    let center = target.center + offset;
    let sx = target.scale_x * ws.x;
    let sy = target.scale_y * ws.y;

    // image
    let eps = settings::engine::EPSILON;
    let image_sx = sx / (out_w / bounds.width().max(eps));
    let image_sy = sy / (out_h / bounds.height().max(eps));
    let image = match session.warp_object {
        Some(id) if canvas.object(id).is_some() => id,
        _ => {
            let id = canvas.insert(SceneObject::image(output.image.clone(), center));
            session.warp_object = Some(id);
            id
        }
    };
    if let Some(object) = canvas.object_mut(image) {
        object.set_pixels(output.image);
        object.center = center;
        object.angle = target.angle;
        object.scale_x = image_sx;
        object.scale_y = image_sy;
        object.flip_x = target.flip_x;
        object.flip_y = target.flip_y;
        object.opacity = target.opacity;
        object.blend = target.blend;
        object.selectable = false;
        object.has_controls = false;
        object.has_borders = false;
    }

    // paths
    let fx = if target.flip_x { -sx } else { sx };
    let fy = if target.flip_y { -sy } else { sy };
    let grid = Affine::translate(center.to_vec2())
        * Affine::rotate(target.angle.to_radians())
        * Affine::scale_non_uniform(fx, fy)
        * Affine::translate(-bounds.center().to_vec2());
    for path in &session.paths {
        if let Some(object) = canvas.object_mut(*path) {
            object.center = grid * object.path_offset().to_point();
            object.angle = target.angle;
            object.scale_x = sx;
            object.scale_y = sy;
            object.flip_x = target.flip_x;
            object.flip_y = target.flip_y;
        }
    }
    true
}
