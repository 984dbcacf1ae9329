// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Hold-a-key axis locking for handle drags

use crate::canvas::{Canvas, MovingObject, key_matches};

/// Restricts drags to the dominant axis while the configured key is held
#[derive(Debug, Clone, Default)]
pub struct AxisConstraint {
    key: Option<String>,
    pressed: bool,
}

impl AxisConstraint {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key,
            pressed: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.pressed
    }

    pub fn on_key_down(&mut self, key: &str) {
        if let Some(expected) = &self.key {
            self.pressed = key_matches(key, expected);
        }
    }

    pub fn on_key_up(&mut self, key: &str) {
        if let Some(expected) = &self.key
            && key_matches(key, expected)
        {
            self.pressed = false;
        }
    }

    /// Snap each moved object back onto the axis it moved least along
    pub fn apply(&self, canvas: &mut dyn Canvas, moving: &[MovingObject]) {
        if !self.pressed {
            return;
        }
        for m in moving {
            if let Some(object) = canvas.object_mut(m.id) {
                let dx = (object.center.x - m.original.x).abs();
                let dy = (object.center.y - m.original.y).abs();
                if dx > dy {
                    object.center.y = m.original.y;
                } else {
                    object.center.x = m.original.x;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{MemoryCanvas, SceneObject};
    use kurbo::Point;

    fn dragged(to: Point) -> (MemoryCanvas, MovingObject) {
        let mut canvas = MemoryCanvas::new();
        let id = canvas.insert(SceneObject::circle(4.0, to));
        (
            canvas,
            MovingObject {
                id,
                original: Point::new(10.0, 10.0),
            },
        )
    }

    #[test]
    fn locks_to_dominant_axis_while_held() {
        let mut constraint = AxisConstraint::new(Some("Shift".into()));
        constraint.on_key_down("SHIFT");
        assert!(constraint.is_active());

        let (mut canvas, m) = dragged(Point::new(30.0, 14.0));
        constraint.apply(&mut canvas, &[m]);
        assert_eq!(canvas.object(m.id).unwrap().center, Point::new(30.0, 10.0));

        let (mut canvas, m) = dragged(Point::new(12.0, 40.0));
        constraint.apply(&mut canvas, &[m]);
        assert_eq!(canvas.object(m.id).unwrap().center, Point::new(10.0, 40.0));
    }

    #[test]
    fn released_or_unconfigured_key_is_free() {
        let mut constraint = AxisConstraint::new(Some("Shift".into()));
        constraint.on_key_down("Shift");
        constraint.on_key_up("shift");
        let (mut canvas, m) = dragged(Point::new(30.0, 14.0));
        constraint.apply(&mut canvas, &[m]);
        assert_eq!(canvas.object(m.id).unwrap().center, Point::new(30.0, 14.0));

        let mut none = AxisConstraint::default();
        none.on_key_down("Shift");
        assert!(!none.is_active());
    }
}
