// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Canvas events forwarded to the active mode.
//!
//! The host translates its own input system into these. Object moves are
//! applied to the canvas by the host first (as a scene-graph library
//! would), then reported with `ObjectMoving`.

use std::time::Duration;

use kurbo::Point;

use crate::model::ObjectId;
use crate::settings;

/// Pointer press, move or release
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Viewport (device) coordinates
    pub pointer: Point,
    /// Topmost evented object under the pointer
    pub target: Option<ObjectId>,
    /// Pressed button mask; 1 is the primary button
    pub buttons: u8,
    /// Monotonic host timestamp
    pub time: Duration,
}

impl PointerEvent {
    pub fn is_primary(&self) -> bool {
        self.buttons == settings::interaction::PRIMARY_BUTTON
    }
}

/// An object being dragged, with its center at drag start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingObject {
    pub id: ObjectId,
    pub original: Point,
}

/// Kind of transform that just finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformAction {
    Drag,
    Scale,
    Rotate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    /// Objects moved during a drag (one entry per object in the
    /// selection)
    ObjectMoving(Vec<MovingObject>),
    /// A transform gesture ended
    ObjectModified {
        targets: Vec<ObjectId>,
        action: TransformAction,
    },
    /// The active selection was created, updated or cleared
    SelectionChanged,
    KeyDown(String),
    KeyUp(String),
}

/// Case-insensitive key name comparison
pub fn key_matches(pressed: &str, expected: &str) -> bool {
    pressed.eq_ignore_ascii_case(expected)
}
