// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! In-memory canvas used by the demo binary and the tests.

use std::collections::HashMap;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use kurbo::{Affine, Point};

use super::{Canvas, ObjectKind, SceneObject, Selection};
use crate::model::ObjectId;

/// Headless [`Canvas`]: an object map plus a bottom-to-top display list
#[derive(Debug)]
pub struct MemoryCanvas {
    objects: HashMap<ObjectId, SceneObject>,
    stack: Vec<ObjectId>,
    active: Selection,
    viewport: Affine,
    render_on_add_remove: bool,
    selection_enabled: bool,
    repaints: usize,
}

impl Default for MemoryCanvas {
    fn default() -> Self {
        Self {
            objects: HashMap::new(),
            stack: Vec::new(),
            active: Selection::new(),
            viewport: Affine::IDENTITY,
            render_on_add_remove: true,
            selection_enabled: true,
            repaints: 0,
        }
    }
}

impl MemoryCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport(viewport: Affine) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    pub fn set_viewport(&mut self, viewport: Affine) {
        self.viewport = viewport;
    }

    /// Attached objects, bottom to top
    pub fn attached(&self) -> &[ObjectId] {
        &self.stack
    }

    /// Number of objects in the store, attached or not
    pub fn stored(&self) -> usize {
        self.objects.len()
    }

    /// Repaints issued so far
    pub fn repaint_count(&self) -> usize {
        self.repaints
    }

    /// Topmost visible, evented object under a viewport point
    pub fn hit_test(&self, pointer: Point) -> Option<ObjectId> {
        let point = self.viewport.inverse() * pointer;
        self.stack.iter().rev().copied().find(|id| {
            self.objects
                .get(id)
                .is_some_and(|o| o.visible && o.evented && o.contains(point))
        })
    }

    /// Index in the display list
    pub fn z_index(&self, id: ObjectId) -> Option<usize> {
        self.stack.iter().position(|o| *o == id)
    }

    fn repaint_if_live(&mut self) {
        if self.render_on_add_remove {
            self.repaints += 1;
        }
    }
}

impl Canvas for MemoryCanvas {
    fn insert(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId::next();
        self.objects.insert(id, object);
        id
    }

    fn discard(&mut self, id: ObjectId) {
        self.remove(id);
        self.objects.remove(&id);
    }

    fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    fn add(&mut self, id: ObjectId) {
        if !self.objects.contains_key(&id) {
            tracing::debug!("ignoring add of unknown object {:?}", id);
            return;
        }
        self.stack.retain(|o| *o != id);
        self.stack.push(id);
        self.repaint_if_live();
    }

    fn remove(&mut self, id: ObjectId) {
        let before = self.stack.len();
        self.stack.retain(|o| *o != id);
        self.active.remove(&id);
        if self.stack.len() != before {
            self.repaint_if_live();
        }
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.stack.contains(&id)
    }

    fn bring_to_front(&mut self, id: ObjectId) {
        if let Some(pos) = self.z_index(id) {
            self.stack.remove(pos);
            self.stack.push(id);
        }
    }

    fn set_render_on_add_remove(&mut self, enabled: bool) {
        self.render_on_add_remove = enabled;
    }

    fn request_render_all(&mut self) {
        self.repaints += 1;
    }

    fn viewport_transform(&self) -> Affine {
        self.viewport
    }

    fn active_objects(&self) -> Vec<ObjectId> {
        self.active.iter().copied().collect()
    }

    fn set_active_objects(&mut self, ids: &[ObjectId]) {
        self.active = ids.iter().copied().filter(|id| self.stack.contains(id)).collect();
    }

    fn set_selection_enabled(&mut self, enabled: bool) {
        self.selection_enabled = enabled;
    }

    fn selection_enabled(&self) -> bool {
        self.selection_enabled
    }

    fn rasterize(&self, id: ObjectId) -> Option<RgbaImage> {
        let object = self.objects.get(&id)?;
        let w = (object.width * object.scale_x.abs()).round().max(1.0) as u32;
        let h = (object.height * object.scale_y.abs()).round().max(1.0) as u32;
        let mut out = match &object.kind {
            ObjectKind::Image(img) => {
                if img.dimensions() == (w, h) {
                    (**img).clone()
                } else {
                    imageops::resize(&**img, w, h, FilterType::Triangle)
                }
            }
            ObjectKind::Rect | ObjectKind::Circle { .. } => {
                let color = object.fill.map_or([0, 0, 0, 0], |c| {
                    let c = c.to_rgba8();
                    [c.r, c.g, c.b, c.a]
                });
                let mut img = RgbaImage::from_pixel(w, h, Rgba(color));
                if let ObjectKind::Circle { .. } = object.kind {
                    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
                    for (x, y, p) in img.enumerate_pixels_mut() {
                        let dx = (x as f64 + 0.5 - cx) / cx;
                        let dy = (y as f64 + 0.5 - cy) / cy;
                        if dx * dx + dy * dy > 1.0 {
                            *p = Rgba([0, 0, 0, 0]);
                        }
                    }
                }
                img
            }
            ObjectKind::Path { .. } | ObjectKind::Line(_) => RgbaImage::new(w, h),
        };
        if object.flip_x {
            imageops::flip_horizontal_in_place(&mut out);
        }
        if object.flip_y {
            imageops::flip_vertical_in_place(&mut out);
        }
        if object.opacity < 1.0 {
            let k = object.opacity.clamp(0.0, 1.0);
            for p in out.pixels_mut() {
                p.0[3] = (p.0[3] as f64 * k).round() as u8;
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_object(w: u32, h: u32) -> SceneObject {
        let mut img = RgbaImage::new(w, h);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        SceneObject::image(img, Point::new(50.0, 50.0))
    }

    #[test]
    fn add_remove_and_z_order() {
        let mut canvas = MemoryCanvas::new();
        let a = canvas.insert(SceneObject::circle(4.0, Point::ZERO));
        let b = canvas.insert(SceneObject::circle(4.0, Point::ZERO));
        canvas.add(a);
        canvas.add(b);
        assert_eq!(canvas.attached(), &[a, b]);
        canvas.bring_to_front(a);
        assert_eq!(canvas.attached(), &[b, a]);
        canvas.remove(a);
        assert!(!canvas.contains(a));
        assert!(canvas.object(a).is_some());
        canvas.discard(a);
        assert!(canvas.object(a).is_none());
    }

    #[test]
    fn batched_add_remove_skips_repaints() {
        let mut canvas = MemoryCanvas::new();
        let a = canvas.insert(SceneObject::rect(2.0, 2.0, Point::ZERO));
        canvas.set_render_on_add_remove(false);
        canvas.add(a);
        canvas.remove(a);
        assert_eq!(canvas.repaint_count(), 0);
        canvas.set_render_on_add_remove(true);
        canvas.request_render_all();
        assert_eq!(canvas.repaint_count(), 1);
    }

    #[test]
    fn hit_test_respects_viewport_and_order() {
        let mut canvas = MemoryCanvas::with_viewport(Affine::scale(2.0));
        let low = canvas.insert(SceneObject::rect(20.0, 20.0, Point::new(10.0, 10.0)));
        let high = canvas.insert(SceneObject::circle(4.0, Point::new(10.0, 10.0)));
        canvas.add(low);
        canvas.add(high);
        assert_eq!(canvas.hit_test(Point::new(20.0, 20.0)), Some(high));
        assert_eq!(canvas.hit_test(Point::new(2.0, 2.0)), Some(low));
        assert_eq!(canvas.hit_test(Point::new(100.0, 100.0)), None);
    }

    #[test]
    fn rasterize_applies_flip_and_opacity() {
        let mut canvas = MemoryCanvas::new();
        let mut obj = image_object(4, 2);
        obj.flip_x = true;
        obj.opacity = 0.5;
        let id = canvas.insert(obj);
        let out = canvas.rasterize(id).unwrap();
        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(out.get_pixel(3, 0).0, [255, 0, 0, 128]);
    }

    #[test]
    fn active_objects_must_be_attached() {
        let mut canvas = MemoryCanvas::new();
        let a = canvas.insert(SceneObject::rect(2.0, 2.0, Point::ZERO));
        let b = canvas.insert(SceneObject::rect(2.0, 2.0, Point::ZERO));
        canvas.add(a);
        canvas.set_active_objects(&[a, b]);
        assert_eq!(canvas.active_objects(), vec![a]);
        canvas.remove(a);
        assert!(canvas.active_objects().is_empty());
    }
}
