// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Four-corner perspective editing

use kurbo::Point;

use super::{AttachToken, AxisConstraint, BaseRenderer, Command, Hook, Mode, StyleTarget};
use crate::canvas::{Canvas, CanvasEvent, MovingObject, PointerEvent, SceneObject, TransformAction};
use crate::coords::{canvas_coord, object_to_canvas, relative_coord};
use crate::engine::{CurveId, SplitStrategy, curve_point, strategy};
use crate::model::{Direction, ObjectId, VertexType};
use crate::session::{RenderOptions, Session};
use crate::settings;
use crate::theme::{self, ThemeColors};

/// Perspective mode settings
#[derive(Debug, Clone)]
pub struct PerspectiveOptions {
    pub theme: ThemeColors,
    /// Drag on empty canvas to lay the corners out as a rectangle
    pub enable_drag_resize: bool,
    /// Per-axis distance (canvas px) before a drag-resize starts
    pub minimum_drag_threshold: f64,
    pub constraint_key: Option<String>,
}

impl Default for PerspectiveOptions {
    fn default() -> Self {
        Self {
            theme: ThemeColors::default(),
            enable_drag_resize: true,
            minimum_drag_threshold: settings::interaction::MINIMUM_DRAG_THRESHOLD,
            constraint_key: None,
        }
    }
}

/// Where a corner handle writes to
#[derive(Debug, Clone, Copy)]
struct CornerControl {
    handle: ObjectId,
    curve: CurveId,
    /// 0 for the curve start, 3 for its end
    point_index: usize,
    row: usize,
    col: usize,
    vertex: VertexType,
}

/// Drag-resize gesture in progress
#[derive(Debug, Clone, Copy)]
struct Resize {
    start: Point,
    resized: bool,
}

/// Perspective deformation mode
#[derive(Debug)]
pub struct Perspective {
    base: BaseRenderer,
    options: PerspectiveOptions,
    controls: Vec<CornerControl>,
    resize: Option<Resize>,
    constraint: AxisConstraint,
}

impl Default for Perspective {
    fn default() -> Self {
        Self::new(PerspectiveOptions::default())
    }
}

/// Corner each side's handle controls, and which end of the curve it is
fn corner_of(direction: Direction) -> (VertexType, usize) {
    match direction {
        Direction::Top => (VertexType::TopLeft, 0),
        Direction::Right => (VertexType::TopRight, 0),
        Direction::Bottom => (VertexType::BottomRight, 3),
        Direction::Left => (VertexType::BottomLeft, 3),
    }
}

impl Perspective {
    pub fn new(options: PerspectiveOptions) -> Self {
        Self {
            base: BaseRenderer::new(options.theme),
            constraint: AxisConstraint::new(options.constraint_key.clone()),
            options,
            controls: Vec::new(),
            resize: None,
        }
    }

    pub fn options(&self) -> &PerspectiveOptions {
        &self.options
    }

    /// Corner handles in top-left, top-right, bottom-right, bottom-left order
    pub fn control_objects(&self) -> Vec<ObjectId> {
        self.controls.iter().map(|c| c.handle).collect()
    }

    fn default_control(&self, center: Point) -> SceneObject {
        let mut object = SceneObject::circle(theme::handle::RADIUS, center);
        object.fill = Some(self.base.theme.theme);
        object.stroke = Some(theme::handle::STROKE);
        object.stroke_width = theme::handle::STROKE_WIDTH;
        object.has_controls = false;
        object.has_borders = false;
        object
    }

    /// Try the dragged corners; roll back any that make the quad invalid
    fn drag_corners(
        &mut self,
        moving: &[MovingObject],
        session: &mut Session,
        canvas: &mut dyn Canvas,
    ) -> bool {
        let mut moved = false;
        for m in moving {
            let Some(control) = self.controls.iter().find(|c| c.handle == m.id).copied() else {
                continue;
            };
            let Some(path) = session.path_for(control.curve).and_then(|p| canvas.object(p)) else {
                continue;
            };
            let Some(curve) = session.engine().curve(control.curve) else {
                continue;
            };
            let Some(center) = canvas.object(control.handle).map(|o| o.center) else {
                continue;
            };
            let point = relative_coord(center, path);
            let cached = curve_point(&curve, control.point_index);
            let snap_back = object_to_canvas(cached, path);

            session
                .engine_mut()
                .update_vertex_coord(control.row, control.col, control.vertex, point, true);
            if let Err(err) = self.compute_split_points(session.engine()) {
                tracing::warn!("rejecting corner move: {}", err);
                session.engine_mut().update_vertex_coord(
                    control.row,
                    control.col,
                    control.vertex,
                    cached,
                    true,
                );
                if let Some(handle) = canvas.object_mut(control.handle) {
                    handle.center = snap_back;
                }
            }
            moved = true;
        }
        moved
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, canvas: &mut dyn Canvas) {
        if !event.is_primary() {
            return;
        }
        let on_selectable = event
            .target
            .and_then(|t| canvas.object(t))
            .is_some_and(|o| o.selectable);
        if on_selectable {
            return;
        }
        canvas.set_selection_enabled(false);
        self.resize = Some(Resize {
            start: canvas_coord(canvas.viewport_transform(), event.pointer),
            resized: false,
        });
    }

    fn on_pointer_move(
        &mut self,
        event: &PointerEvent,
        session: &mut Session,
        canvas: &mut dyn Canvas,
    ) -> Vec<Command> {
        let Some(resize) = self.resize else {
            return Vec::new();
        };
        let start = resize.start;
        let end = canvas_coord(canvas.viewport_transform(), event.pointer);
        let threshold = self.options.minimum_drag_threshold;
        let small = (end.x - start.x).abs() < threshold || (end.y - start.y).abs() < threshold;
        if !resize.resized && small {
            return Vec::new();
        }

        let Some(bounds) = session
            .engine()
            .region_boundary_curves()
            .first()
            .and_then(|row| row.first())
            .copied()
        else {
            return Vec::new();
        };
        let top = session.path_for(bounds.top).and_then(|p| canvas.object(p));
        let bottom = session.path_for(bounds.bottom).and_then(|p| canvas.object(p));
        let (Some(top), Some(bottom)) = (top, bottom) else {
            return Vec::new();
        };
        let lt = relative_coord(start, top);
        let rb = relative_coord(end, bottom);

        let engine = session.engine_mut();
        engine.update_vertex_coord(0, 0, VertexType::TopLeft, lt, true);
        engine.update_vertex_coord(0, 0, VertexType::TopRight, Point::new(rb.x, lt.y), true);
        engine.update_vertex_coord(0, 0, VertexType::BottomLeft, Point::new(lt.x, rb.y), true);
        engine.update_vertex_coord(0, 0, VertexType::BottomRight, rb, true);
        self.resize = Some(Resize {
            resized: true,
            ..resize
        });
        vec![Command::Render {
            structural: true,
            options: RenderOptions::skip_history(),
        }]
    }

    fn on_pointer_up(&mut self, canvas: &mut dyn Canvas) -> Vec<Command> {
        let Some(resize) = self.resize.take() else {
            return Vec::new();
        };
        canvas.set_selection_enabled(true);
        if resize.resized {
            vec![Command::Record]
        } else {
            Vec::new()
        }
    }
}

impl Mode for Perspective {
    fn name(&self) -> &str {
        "perspective"
    }

    fn base(&self) -> &BaseRenderer {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseRenderer {
        &mut self.base
    }

    fn split_strategy(&self) -> SplitStrategy {
        SplitStrategy::new(self.name(), strategy::perspective)
    }

    fn dirty_render(&mut self, session: &Session, canvas: &mut dyn Canvas) -> Option<AttachToken> {
        self.controls.clear();
        let engine = session.engine();
        for (row, cells) in engine.region_boundary_curves().iter().enumerate() {
            for (col, bounds) in cells.iter().enumerate() {
                for direction in Direction::ALL {
                    let id = bounds.get(direction);
                    let (vertex, point_index) = corner_of(direction);
                    let Some(curve) = engine.curve(id) else {
                        continue;
                    };
                    let Some(path) = session.path_for(id).and_then(|p| canvas.object(p)) else {
                        continue;
                    };
                    let center = object_to_canvas(curve_point(&curve, point_index), path);
                    let mut object = self.default_control(center);
                    self.base.apply_style(StyleTarget::Control, &mut object);
                    let handle = canvas.insert(object);
                    canvas.add(handle);
                    self.controls.push(CornerControl {
                        handle,
                        curve: id,
                        point_index,
                        row,
                        col,
                        vertex,
                    });
                }
            }
        }
        self.restore_order(canvas);
        Some(AttachToken::owned(Hook::Dirty, self.control_objects()))
    }

    fn release(&mut self, token: AttachToken, canvas: &mut dyn Canvas) {
        let hook = token.hook();
        token.release(canvas);
        if hook == Hook::Dirty {
            self.controls.clear();
        }
    }

    fn handle_event(
        &mut self,
        event: &CanvasEvent,
        session: &mut Session,
        canvas: &mut dyn Canvas,
    ) -> Vec<Command> {
        match event {
            CanvasEvent::KeyDown(key) => {
                self.constraint.on_key_down(key);
                Vec::new()
            }
            CanvasEvent::KeyUp(key) => {
                self.constraint.on_key_up(key);
                Vec::new()
            }
            CanvasEvent::ObjectMoving(moving) => {
                self.constraint.apply(canvas, moving);
                if self.drag_corners(moving, session, canvas) {
                    vec![
                        Command::Render {
                            structural: false,
                            options: RenderOptions::skip_history(),
                        },
                        Command::RestoreOrder,
                    ]
                } else {
                    Vec::new()
                }
            }
            CanvasEvent::ObjectModified {
                targets,
                action: TransformAction::Drag,
            } => {
                if targets.iter().any(|t| self.controls.iter().any(|c| c.handle == *t)) {
                    vec![Command::Record]
                } else {
                    Vec::new()
                }
            }
            CanvasEvent::PointerDown(e) if self.options.enable_drag_resize => {
                self.on_pointer_down(e, canvas);
                Vec::new()
            }
            CanvasEvent::PointerMove(e) if self.options.enable_drag_resize => {
                self.on_pointer_move(e, session, canvas)
            }
            CanvasEvent::PointerUp(_) if self.options.enable_drag_resize => {
                self.on_pointer_up(canvas)
            }
            _ => Vec::new(),
        }
    }

    fn restore_order(&mut self, canvas: &mut dyn Canvas) {
        for control in &self.controls {
            canvas.bring_to_front(control.handle);
        }
    }
}
