// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Scene-graph contract consumed by the session controller.
//!
//! A canvas is an object store plus a z-ordered display list: objects are
//! created with [`Canvas::insert`] (detached), attached with
//! [`Canvas::add`], detached with [`Canvas::remove`] and dropped from the
//! store with [`Canvas::discard`].

mod events;
mod memory;
mod object;
mod selection;

pub use events::{CanvasEvent, MovingObject, PointerEvent, TransformAction, key_matches};
pub use memory::MemoryCanvas;
pub use object::{BlendMode, ObjectKind, SceneObject};
pub use selection::Selection;

use image::RgbaImage;
use kurbo::Affine;

use crate::model::ObjectId;

pub trait Canvas {
    /// Store a detached object
    fn insert(&mut self, object: SceneObject) -> ObjectId;

    /// Detach and drop an object
    fn discard(&mut self, id: ObjectId);

    fn object(&self, id: ObjectId) -> Option<&SceneObject>;

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject>;

    /// Attach on top of the display list; re-adding moves to the top
    fn add(&mut self, id: ObjectId);

    /// Detach from the display list, keeping the object stored
    fn remove(&mut self, id: ObjectId);

    /// Whether the object is attached
    fn contains(&self, id: ObjectId) -> bool;

    fn bring_to_front(&mut self, id: ObjectId);

    /// Repaint after every add/remove when enabled
    fn set_render_on_add_remove(&mut self, enabled: bool);

    fn request_render_all(&mut self);

    /// Canvas to viewport transform (pan/zoom)
    fn viewport_transform(&self) -> Affine;

    fn active_objects(&self) -> Vec<ObjectId>;

    fn set_active_objects(&mut self, ids: &[ObjectId]);

    fn discard_active_object(&mut self) {
        self.set_active_objects(&[]);
    }

    /// Rubber-band selection toggle
    fn set_selection_enabled(&mut self, enabled: bool);

    fn selection_enabled(&self) -> bool;

    /// Rasterize an object with its current opacity, flip and scale but
    /// without its position or rotation
    fn rasterize(&self, id: ObjectId) -> Option<RgbaImage>;
}
