// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Free-mesh editing
//!
//! Every grid vertex gets a round handle; every curve end gets a square
//! tangent handle joined to its vertex by a guide line. Clicking the warped
//! image drops an insertion marker: a quick click on the marker splits the
//! region under it, a press-and-drag on it moves the whole mesh.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Duration;

use kurbo::{Affine, Line, Point, Vec2};

use super::{AttachToken, AxisConstraint, BaseRenderer, Command, Hook, Mode, StyleTarget};
use crate::canvas::{Canvas, CanvasEvent, MovingObject, PointerEvent, SceneObject, TransformAction};
use crate::coords::{
    affine_from_triangles, canvas_coord, invert, object_to_canvas, relative_coord,
    transform_vector,
};
use crate::engine::{CurveId, curve_point, set_curve_point};
use crate::model::{Direction, GridPosition, ObjectId, VertexType};
use crate::session::{RenderOptions, Session};
use crate::settings;
use crate::theme::{self, ThemeColors};

/// Free-mesh mode settings
#[derive(Debug, Clone)]
pub struct WarpOptions {
    pub theme: ThemeColors,
    /// Insertion marker, click-to-split and delete
    pub enable_grid_split: bool,
    /// Key that locks drags to one axis while held
    pub constraint_key: Option<String>,
    /// Longest press still treated as a click
    pub click_threshold: Duration,
}

impl Default for WarpOptions {
    fn default() -> Self {
        Self {
            theme: ThemeColors::default(),
            enable_grid_split: true,
            constraint_key: None,
            click_threshold: settings::interaction::CLICK_THRESHOLD,
        }
    }
}

/// Tangent handle of one curve end
#[derive(Debug, Clone, Copy)]
struct CurveControl {
    curve: CurveId,
    /// Control point index in the curve (1 or 2)
    index: usize,
    /// Endpoint index the handle belongs to (0 or 3)
    vertex_index: usize,
    handle: ObjectId,
    line: ObjectId,
}

/// Handles of one grid vertex
#[derive(Debug, Clone)]
struct VertexControl {
    major: ObjectId,
    /// Curve and region the vertex was first seen through
    curve: CurveId,
    row: usize,
    col: usize,
    vertex: VertexType,
    vertex_index: usize,
    /// Canvas position after the last processed move
    position: Point,
    curve_controls: Vec<CurveControl>,
}

/// Pending split picked by a click on the image
#[derive(Debug, Clone, Copy)]
struct SplitTarget {
    row: usize,
    col: usize,
    /// Unwarped curve-space point
    point: Point,
    /// Canvas position the marker goes to
    pointer: Point,
}

#[derive(Debug, Clone, Copy)]
struct Press {
    time: Duration,
    on_marker: bool,
    moved: bool,
}

/// Free-mesh deformation mode
#[derive(Debug)]
pub struct Warp {
    base: BaseRenderer,
    options: WarpOptions,
    controls: BTreeMap<GridPosition, VertexControl>,
    majors: HashMap<ObjectId, GridPosition>,
    curve_handles: HashMap<ObjectId, (GridPosition, usize)>,
    insert_marker: Option<ObjectId>,
    split_target: Option<SplitTarget>,
    press: Option<Press>,
    constraint: AxisConstraint,
}

impl Default for Warp {
    fn default() -> Self {
        Self::new(WarpOptions::default())
    }
}

impl Warp {
    pub fn new(options: WarpOptions) -> Self {
        Self {
            base: BaseRenderer::new(options.theme),
            constraint: AxisConstraint::new(options.constraint_key.clone()),
            options,
            controls: BTreeMap::new(),
            majors: HashMap::new(),
            curve_handles: HashMap::new(),
            insert_marker: None,
            split_target: None,
            press: None,
        }
    }

    pub fn options(&self) -> &WarpOptions {
        &self.options
    }

    /// Vertex handles in row-major vertex order
    pub fn control_objects(&self) -> Vec<ObjectId> {
        self.controls.values().map(|c| c.major).collect()
    }

    /// Tangent handles
    pub fn sub_control_objects(&self) -> Vec<ObjectId> {
        self.curve_controls().map(|c| c.handle).collect()
    }

    /// Guide lines, parallel to [`Self::sub_control_objects`]
    pub fn line_objects(&self) -> Vec<ObjectId> {
        self.curve_controls().map(|c| c.line).collect()
    }

    pub fn insert_control_object(&self) -> Option<ObjectId> {
        self.insert_marker
    }

    /// Vertex handle at a vertex-space position
    pub fn control_at(&self, position: GridPosition) -> Option<ObjectId> {
        self.controls.get(&position).map(|c| c.major)
    }

    /// Tangent handles around the vertex at `position`
    pub fn sub_controls_at(&self, position: GridPosition) -> Vec<ObjectId> {
        self.controls
            .get(&position)
            .map(|c| c.curve_controls.iter().map(|s| s.handle).collect())
            .unwrap_or_default()
    }

    fn curve_controls(&self) -> impl Iterator<Item = &CurveControl> {
        self.controls.values().flat_map(|c| c.curve_controls.iter())
    }

    fn interaction_objects(&self) -> Vec<ObjectId> {
        let mut out = Vec::new();
        for control in self.controls.values() {
            out.push(control.major);
            for sub in &control.curve_controls {
                out.push(sub.handle);
                out.push(sub.line);
            }
        }
        out
    }

    fn clear_controls(&mut self) {
        self.controls.clear();
        self.majors.clear();
        self.curve_handles.clear();
        self.insert_marker = None;
        self.split_target = None;
    }

    // ===== Default Handles =====

    fn default_control(&self, center: Point) -> SceneObject {
        let mut object = SceneObject::circle(theme::handle::RADIUS, center);
        object.fill = Some(self.base.theme.theme);
        object.stroke = Some(theme::handle::STROKE);
        object.stroke_width = theme::handle::STROKE_WIDTH;
        object.has_controls = false;
        object.has_borders = false;
        object
    }

    fn default_curve_control(center: Point) -> SceneObject {
        let size = theme::handle::CURVE_SIZE;
        let mut object = SceneObject::rect(size, size, center);
        object.fill = Some(theme::handle::CURVE_FILL);
        object.stroke = Some(theme::handle::GUIDE_LINE);
        object.visible = false;
        object.has_controls = false;
        object.has_borders = false;
        object
    }

    fn default_line(line: Line) -> SceneObject {
        let mut object = SceneObject::line(line);
        object.stroke = Some(theme::handle::GUIDE_LINE);
        object.stroke_width = theme::handle::GUIDE_LINE_WIDTH;
        object.visible = false;
        object.evented = false;
        object.selectable = false;
        object
    }

    fn default_insert_control(&self) -> SceneObject {
        let mut object = SceneObject::circle(theme::handle::INSERT_RADIUS, Point::ZERO);
        object.fill = Some(theme::handle::INSERT_FILL);
        object.stroke = Some(self.base.theme.theme);
        object.selectable = false;
        object.has_controls = false;
        object.has_borders = false;
        object
    }

    fn styled(&self, target: StyleTarget, mut object: SceneObject) -> SceneObject {
        self.base.apply_style(target, &mut object);
        object
    }

    // ===== Dragging =====

    /// Reshape the curve behind a tangent handle
    fn drag_curve_control(
        &mut self,
        id: ObjectId,
        session: &mut Session,
        canvas: &mut dyn Canvas,
    ) -> bool {
        let Some(&(position, index)) = self.curve_handles.get(&id) else {
            return false;
        };
        let Some(control) = self.controls.get(&position) else {
            return false;
        };
        let sub = control.curve_controls[index];
        let Some(mut curve) = session.engine().curve(sub.curve) else {
            return false;
        };
        let Some(path) = session.path_for(sub.curve).and_then(|p| canvas.object(p)) else {
            return false;
        };
        let Some(center) = canvas.object(sub.handle).map(|o| o.center) else {
            return false;
        };
        set_curve_point(&mut curve, sub.index, relative_coord(center, path));
        session.engine_mut().set_curve(sub.curve, curve);

        let major = canvas
            .object(control.major)
            .map_or(control.position, |o| o.center);
        let d = center - major;
        if let Some(handle) = canvas.object_mut(sub.handle) {
            handle.angle = 90.0 + d.y.atan2(d.x).to_degrees();
        }
        if let Some(line) = canvas.object_mut(sub.line) {
            line.set_line(Line::new(center, major));
        }
        true
    }

    /// Move the vertices behind dragged vertex handles, carrying their
    /// tangent handles along
    fn drag_controls(
        &mut self,
        moving: &[MovingObject],
        session: &mut Session,
        canvas: &mut dyn Canvas,
    ) -> bool {
        let mut moved = false;
        for m in moving {
            let Some(position) = self.majors.get(&m.id).copied() else {
                continue;
            };
            let Some(control) = self.controls.get_mut(&position) else {
                continue;
            };
            let Some(absolute) = canvas.object(control.major).map(|o| o.center) else {
                continue;
            };
            let Some(path) = session.path_for(control.curve).and_then(|p| canvas.object(p)) else {
                continue;
            };
            let Some(curve) = session.engine().curve(control.curve) else {
                continue;
            };
            let point = relative_coord(absolute, path);
            let relative_delta = point - curve_point(&curve, control.vertex_index);
            let absolute_delta = absolute - control.position;

            session.engine_mut().update_vertex_coord(
                control.row,
                control.col,
                control.vertex,
                point,
                false,
            );
            for sub in &control.curve_controls {
                if let Some(mut attached) = session.engine().curve(sub.curve) {
                    let p = curve_point(&attached, sub.index) + relative_delta;
                    set_curve_point(&mut attached, sub.index, p);
                    session.engine_mut().set_curve(sub.curve, attached);
                }
                let handle_center = canvas.object_mut(sub.handle).map(|o| {
                    o.translate(absolute_delta);
                    o.center
                });
                if let (Some(center), Some(line)) = (handle_center, canvas.object_mut(sub.line)) {
                    line.set_line(Line::new(center, absolute));
                }
            }
            control.position = absolute;
            moved = true;
        }
        moved
    }

    // ===== Insertion Marker =====

    fn marker_attached(&self, canvas: &dyn Canvas) -> Option<ObjectId> {
        self.insert_marker.filter(|m| canvas.contains(*m))
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, session: &Session, canvas: &mut dyn Canvas) {
        if !event.is_primary() {
            return;
        }
        let marker = self.marker_attached(canvas);
        let on_marker = marker.is_some() && event.target == marker;
        self.press = Some(Press {
            time: event.time,
            on_marker,
            moved: false,
        });
        if on_marker {
            canvas.set_selection_enabled(false);
            return;
        }

        self.split_target = None;
        if let Some(marker) = marker {
            canvas.remove(marker);
        }
        if event.target.is_none() || event.target != session.warp_object() {
            return;
        }
        let pointer = canvas_coord(canvas.viewport_transform(), event.pointer);
        let Some(path) = session.paths().first().and_then(|p| canvas.object(*p)) else {
            return;
        };
        let local = relative_coord(pointer, path);
        let Some(hit) = session.engine().hit_info(local) else {
            return;
        };
        // warped triangle back onto the unwarped one
        let Some(unwarp) = affine_from_triangles(hit.after_triangle(), hit.before_triangle()) else {
            return;
        };
        self.split_target = Some(SplitTarget {
            row: hit.row,
            col: hit.col,
            point: unwarp * local,
            pointer,
        });
    }

    fn on_pointer_move(
        &mut self,
        event: &PointerEvent,
        session: &mut Session,
        canvas: &mut dyn Canvas,
    ) -> Vec<Command> {
        let Some(press) = self.press else {
            return Vec::new();
        };
        if !press.on_marker || canvas.selection_enabled() {
            return Vec::new();
        }
        let Some(marker) = self.marker_attached(canvas) else {
            return Vec::new();
        };
        let Some(center) = canvas.object(marker).map(|o| o.center) else {
            return Vec::new();
        };
        let offset = canvas_coord(canvas.viewport_transform(), event.pointer) - center;
        if offset == Vec2::ZERO {
            return Vec::new();
        }
        let Some(inverse) = session
            .paths()
            .first()
            .and_then(|p| canvas.object(*p))
            .and_then(|o| invert(o.own_matrix()))
        else {
            return Vec::new();
        };

        let shift = Affine::translate(transform_vector(offset, inverse));
        let curves: BTreeSet<CurveId> = session
            .engine()
            .region_boundary_curves()
            .iter()
            .flatten()
            .flat_map(|b| Direction::ALL.map(|d| b.get(d)))
            .collect();
        for id in curves {
            if let Some(curve) = session.engine().curve(id) {
                session.engine_mut().set_curve(id, shift * curve);
            }
        }

        let mut cosmetic = vec![marker];
        cosmetic.extend(session.warp_object());
        cosmetic.extend(session.paths().iter().copied());
        cosmetic.extend(self.interaction_objects());
        for id in cosmetic {
            if let Some(object) = canvas.object_mut(id) {
                object.translate(offset);
            }
        }
        for control in self.controls.values_mut() {
            control.position += offset;
        }
        self.press = Some(Press {
            moved: true,
            ..press
        });
        vec![Command::RequestRender {
            structural: false,
            options: RenderOptions::skip_history(),
            restore_order: true,
        }]
    }

    fn on_pointer_up(
        &mut self,
        event: &PointerEvent,
        session: &mut Session,
        canvas: &mut dyn Canvas,
    ) -> Vec<Command> {
        let Some(press) = self.press.take() else {
            return Vec::new();
        };
        let mut commands = Vec::new();
        let is_click = event.time.saturating_sub(press.time) < self.options.click_threshold;
        if is_click && press.on_marker {
            if let Some(marker) = self.insert_marker {
                canvas.remove(marker);
            }
            if let Some(target) = self.split_target.take() {
                match session
                    .engine_mut()
                    .split_region_by_point(target.row, target.col, target.point)
                {
                    Ok(()) => commands.push(Command::Render {
                        structural: true,
                        options: RenderOptions::default(),
                    }),
                    Err(err) => tracing::warn!("split at {:?} failed: {}", target.point, err),
                }
            }
        } else if is_click
            && !press.on_marker
            && let Some(target) = self.split_target
            && let Some(marker) = self.insert_marker
        {
            if let Some(object) = canvas.object_mut(marker) {
                object.center = target.pointer;
            }
            canvas.add(marker);
            canvas.request_render_all();
        }
        if press.on_marker && press.moved {
            commands.push(Command::Record);
        }
        canvas.set_selection_enabled(true);
        commands
    }

    // ===== Selection and Delete =====

    fn update_selection(&self, canvas: &mut dyn Canvas) {
        let active = canvas.active_objects();
        let selected: HashSet<ObjectId> = active
            .iter()
            .copied()
            .filter(|id| self.majors.contains_key(id))
            .collect();
        for id in self.majors.keys() {
            if let Some(object) = canvas.object_mut(*id) {
                object.opacity = 1.0;
                object.fill = Some(if selected.contains(id) {
                    self.base.theme.sub_theme
                } else {
                    self.base.theme.theme
                });
            }
        }
        if !selected.is_empty() {
            for id in &active {
                if let Some(object) = canvas.object_mut(*id) {
                    object.per_pixel_target_find = true;
                    object.has_controls = false;
                    object.has_borders = false;
                }
            }
        }
        // tangent handles show while their vertex alone, or any sibling, is selected
        for control in self.controls.values() {
            let visible = active == [control.major]
                || control
                    .curve_controls
                    .iter()
                    .any(|s| active.contains(&s.handle));
            for sub in &control.curve_controls {
                for id in [sub.handle, sub.line] {
                    if let Some(object) = canvas.object_mut(id) {
                        object.visible = visible;
                    }
                }
            }
        }
        canvas.request_render_all();
    }

    fn delete_selected(&self, session: &mut Session, canvas: &dyn Canvas) -> Vec<Command> {
        let positions: Vec<GridPosition> = canvas
            .active_objects()
            .iter()
            .filter_map(|id| self.majors.get(id).copied())
            .collect();
        if positions.is_empty() {
            return Vec::new();
        }
        if session.engine_mut().remove_regions(&positions) {
            vec![Command::Render {
                structural: true,
                options: RenderOptions::default(),
            }]
        } else {
            tracing::debug!("nothing removed for {} selected vertices", positions.len());
            Vec::new()
        }
    }
}

impl Mode for Warp {
    fn name(&self) -> &str {
        "warp"
    }

    fn base(&self) -> &BaseRenderer {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseRenderer {
        &mut self.base
    }

    fn dirty_render(&mut self, session: &Session, canvas: &mut dyn Canvas) -> Option<AttachToken> {
        self.clear_controls();
        let engine = session.engine();
        let mut created = Vec::new();

        for (row, cells) in engine.region_boundary_curves().iter().enumerate() {
            for (col, bounds) in cells.iter().enumerate() {
                for direction in Direction::ALL {
                    let id = bounds.get(direction);
                    let Some(curve) = engine.curve(id) else {
                        continue;
                    };
                    let Some(path) = session.path_for(id).and_then(|p| canvas.object(p)) else {
                        continue;
                    };
                    let points = [0, 1, 2, 3].map(|i| object_to_canvas(curve_point(&curve, i), path));

                    for index in [1, 2] {
                        let (end, vertex_index) = if index == 1 { (0, 0) } else { (1, 3) };
                        let vertex = direction.endpoints()[end];
                        let position = vertex.position(row, col);
                        let vertex_point = points[vertex_index];

                        if !self.controls.contains_key(&position) {
                            let object = self.styled(
                                StyleTarget::Control,
                                self.default_control(vertex_point),
                            );
                            let major = canvas.insert(object);
                            canvas.add(major);
                            created.push(major);
                            self.majors.insert(major, position);
                            self.controls.insert(
                                position,
                                VertexControl {
                                    major,
                                    curve: id,
                                    row,
                                    col,
                                    vertex,
                                    vertex_index,
                                    position: vertex_point,
                                    curve_controls: Vec::new(),
                                },
                            );
                        }
                        let Some(control) = self.controls.get(&position) else {
                            continue;
                        };
                        if control
                            .curve_controls
                            .iter()
                            .any(|s| s.curve == id && s.vertex_index == vertex_index)
                        {
                            continue;
                        }

                        let handle = self.styled(
                            StyleTarget::CurveControl,
                            Self::default_curve_control(points[index]),
                        );
                        let line = self.styled(
                            StyleTarget::Line,
                            Self::default_line(Line::new(points[index], vertex_point)),
                        );
                        let line = canvas.insert(line);
                        let handle = canvas.insert(handle);
                        canvas.add(line);
                        canvas.add(handle);
                        created.push(line);
                        created.push(handle);

                        if let Some(control) = self.controls.get_mut(&position) {
                            self.curve_handles
                                .insert(handle, (position, control.curve_controls.len()));
                            control.curve_controls.push(CurveControl {
                                curve: id,
                                index,
                                vertex_index,
                                handle,
                                line,
                            });
                        }
                    }
                }
            }
        }

        if self.options.enable_grid_split {
            let marker = self.styled(StyleTarget::InsertControl, self.default_insert_control());
            let marker = canvas.insert(marker);
            self.insert_marker = Some(marker);
            created.push(marker);
        }
        self.restore_order(canvas);
        tracing::debug!(
            "created {} vertex and {} curve handles",
            self.controls.len(),
            self.curve_handles.len()
        );
        Some(AttachToken::owned(Hook::Dirty, created))
    }

    fn release(&mut self, token: AttachToken, canvas: &mut dyn Canvas) {
        let hook = token.hook();
        token.release(canvas);
        if hook == Hook::Dirty {
            self.clear_controls();
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
                let delete = settings::interaction::DELETE_KEYS.contains(&key.as_str());
                if delete && self.options.enable_grid_split {
                    return self.delete_selected(session, canvas);
                }
                Vec::new()
            }
            CanvasEvent::KeyUp(key) => {
                self.constraint.on_key_up(key);
                Vec::new()
            }
            CanvasEvent::ObjectMoving(moving) => {
                self.constraint.apply(canvas, moving);
                let mut moved = false;
                for m in moving {
                    if self.curve_handles.contains_key(&m.id) {
                        moved |= self.drag_curve_control(m.id, session, canvas);
                    }
                }
                moved |= self.drag_controls(moving, session, canvas);
                if moved {
                    vec![Command::RequestRender {
                        structural: false,
                        options: RenderOptions::skip_history(),
                        restore_order: true,
                    }]
                } else {
                    Vec::new()
                }
            }
            CanvasEvent::ObjectModified {
                targets,
                action: TransformAction::Drag,
            } => {
                let touched = targets
                    .iter()
                    .any(|t| self.majors.contains_key(t) || self.curve_handles.contains_key(t));
                if touched {
                    vec![Command::Record]
                } else {
                    Vec::new()
                }
            }
            CanvasEvent::SelectionChanged => {
                self.update_selection(canvas);
                Vec::new()
            }
            CanvasEvent::PointerDown(e) if self.options.enable_grid_split => {
                self.on_pointer_down(e, session, canvas);
                Vec::new()
            }
            CanvasEvent::PointerMove(e) if self.options.enable_grid_split => {
                self.on_pointer_move(e, session, canvas)
            }
            CanvasEvent::PointerUp(e) if self.options.enable_grid_split => {
                self.on_pointer_up(e, session, canvas)
            }
            _ => Vec::new(),
        }
    }

    /// Guide lines, then tangent handles, then vertex handles, then the marker
    fn restore_order(&mut self, canvas: &mut dyn Canvas) {
        canvas.set_render_on_add_remove(false);
        for sub in self.curve_controls() {
            canvas.bring_to_front(sub.line);
        }
        for sub in self.curve_controls() {
            canvas.bring_to_front(sub.handle);
        }
        for control in self.controls.values() {
            canvas.bring_to_front(control.major);
        }
        if let Some(marker) = self.insert_marker {
            canvas.bring_to_front(marker);
        }
        canvas.set_render_on_add_remove(true);
        canvas.request_render_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = WarpOptions::default();
        assert!(options.enable_grid_split);
        assert!(options.constraint_key.is_none());
        assert_eq!(options.click_threshold, Duration::from_millis(200));
    }

    #[test]
    fn default_handles_follow_theme() {
        let warp = Warp::default();
        let control = warp.default_control(Point::new(5.0, 5.0));
        assert_eq!(control.fill, Some(theme::mode::THEME));
        assert!(!control.has_controls && !control.has_borders);

        let sub = Warp::default_curve_control(Point::ZERO);
        assert!(!sub.visible);
        assert_eq!(sub.width, theme::handle::CURVE_SIZE);

        let line = Warp::default_line(Line::new((0.0, 0.0), (1.0, 1.0)));
        assert!(!line.visible && !line.evented && !line.selectable);

        let marker = warp.default_insert_control();
        assert!(!marker.selectable);
        assert_eq!(marker.fill, Some(theme::handle::INSERT_FILL));
    }

    #[test]
    fn style_setters_apply_to_new_handles() {
        let mut warp = Warp::default();
        warp.register_style_setter(
            StyleTarget::Control,
            Box::new(|o| o.stroke_width = 3.0),
        );
        let object = warp.styled(StyleTarget::Control, warp.default_control(Point::ZERO));
        assert_eq!(object.stroke_width, 3.0);
        assert!(warp.control_objects().is_empty());
        assert!(warp.insert_control_object().is_none());
    }
}
