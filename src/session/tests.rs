// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Controller scenarios driven through canvas events.
//!
//! The target is a 40×40 image centered at (100, 100), so curve point `q`
//! shows up on the canvas at `q + (80, 80)`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use kurbo::Point;

use super::*;
use crate::canvas::{MemoryCanvas, MovingObject, PointerEvent, TransformAction};
use crate::model::{GridPosition, VertexType};
use crate::modes::{Perspective, Warp};

type Controller = WarpController<MemoryCanvas>;

fn close(a: Point, b: Point) -> bool {
    (a - b).hypot() < 1e-6
}

/// Two lattice steps per region keeps the grids small
fn coarse(engine: &mut dyn MeshEngine) {
    let mut config = *engine.rendering_config();
    config.split_unit = 0.5;
    engine.set_rendering_config(config);
}

fn controller() -> (Controller, ObjectId) {
    let mut canvas = MemoryCanvas::new();
    let image = RgbaImage::from_pixel(40, 40, Rgba([200, 80, 40, 255]));
    let target = canvas.insert(SceneObject::image(image, Point::new(100.0, 100.0)));
    canvas.add(target);
    (WarpController::new(canvas, ControllerOptions::default()), target)
}

fn enter(mode: Box<dyn Mode>, setup: impl FnOnce(&mut dyn MeshEngine)) -> (Controller, ObjectId) {
    let (mut ctl, target) = controller();
    ctl.enter_editing_with(target, None, mode, |engine| {
        coarse(engine);
        setup(engine);
    })
    .unwrap();
    (ctl, target)
}

fn warp(ctl: &Controller) -> &Warp {
    ctl.mode_as::<Warp>().unwrap()
}

fn pointer(ctl: &Controller, x: f64, y: f64, ms: u64) -> PointerEvent {
    let at = Point::new(x, y);
    PointerEvent {
        pointer: at,
        target: ctl.canvas().hit_test(at),
        buttons: 1,
        time: Duration::from_millis(ms),
    }
}

fn click(ctl: &mut Controller, x: f64, y: f64, at_ms: u64) {
    let down = pointer(ctl, x, y, at_ms);
    ctl.handle_event(&CanvasEvent::PointerDown(down));
    let up = PointerEvent {
        time: Duration::from_millis(at_ms + 50),
        ..down
    };
    ctl.handle_event(&CanvasEvent::PointerUp(up));
}

/// Move a handle the way a host would during a drag, then end the drag
fn drag(ctl: &mut Controller, handle: ObjectId, to: Point) {
    let original = ctl.canvas().object(handle).unwrap().center;
    ctl.canvas_mut().object_mut(handle).unwrap().center = to;
    ctl.handle_event(&CanvasEvent::ObjectMoving(vec![MovingObject {
        id: handle,
        original,
    }]));
    ctl.on_animation_frame();
    ctl.handle_event(&CanvasEvent::ObjectModified {
        targets: vec![handle],
        action: TransformAction::Drag,
    });
}

fn rows_cols(ctl: &Controller) -> (usize, usize) {
    let engine = ctl.session().unwrap().engine();
    (engine.rows(), engine.cols())
}

// ===== Lifecycle =====

#[test]
fn entering_twice_is_rejected() {
    let (mut ctl, target) = enter(Box::new(Warp::default()), |_| {});
    let before = ctl.get_warp_state();
    let err = ctl.enter_editing(target, None, Box::new(Warp::default()));
    assert!(matches!(err, Err(WarpError::SessionActive)));
    assert_eq!(ctl.state(), SessionState::Active);
    assert_eq!(ctl.get_warp_state(), before);
    assert_eq!(ctl.get_mode().unwrap().name(), "warp");
}

#[test]
fn entering_on_a_missing_object_fails() {
    let (mut ctl, _) = controller();
    let missing = ObjectId::next();
    let err = ctl.enter_editing(missing, None, Box::new(Warp::default()));
    assert!(matches!(err, Err(WarpError::UnknownObject(id)) if id == missing));
    assert_eq!(ctl.state(), SessionState::Idle);
    assert!(ctl.session().is_none());
}

#[test]
fn snapshot_ignores_and_restores_the_target_transform() {
    let (mut ctl, target) = controller();
    {
        let object = ctl.canvas_mut().object_mut(target).unwrap();
        object.angle = 30.0;
        object.scale_x = 2.0;
        object.opacity = 0.5;
    }
    ctl.enter_editing(target, None, Box::new(Warp::default())).unwrap();
    let session = ctl.session().unwrap();
    assert_eq!(session.snapshot_size(), Size::new(40.0, 40.0));
    let object = ctl.canvas().object(target).unwrap();
    assert_eq!((object.angle, object.scale_x, object.opacity), (30.0, 2.0, 0.5));

    // the warped image copies the look of the target
    let image = ctl.canvas().object(session.warp_object().unwrap()).unwrap();
    assert_eq!(image.angle, 30.0);
    assert_eq!(image.opacity, 0.5);
    assert!(!image.selectable);
}

#[test]
fn leaving_removes_everything_the_session_attached() {
    let (mut ctl, target) = enter(Box::new(Warp::default()), |_| {});
    let (x, y) = (93.0, 113.0);
    click(&mut ctl, x, y, 0);
    assert!(ctl.canvas().attached().len() > 1);

    ctl.leave_editing();
    assert_eq!(ctl.canvas().attached(), &[target]);
    assert_eq!(ctl.canvas().stored(), 1);
    assert!(ctl.history().undo_stack().is_empty());
    assert!(ctl.history().redo_stack().is_empty());
    assert_eq!(ctl.state(), SessionState::Idle);
    assert!(ctl.get_mode().is_none());

    // everything is a no-op now
    ctl.undo();
    ctl.render(true, RenderOptions::default());
    ctl.leave_editing();
    assert!(ctl.get_warp_state().is_none());

    // and a new session can start
    ctl.enter_editing(target, None, Box::new(Perspective::default()))
        .unwrap();
    assert_eq!(ctl.history().undo_stack().len(), 1);
}

// ===== Rendering =====

#[test]
fn one_path_per_distinct_curve() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    // boundary plus one interior line each way
    assert_eq!(ctl.session().unwrap().paths().len(), 6);

    ctl.engine_mut()
        .unwrap()
        .split_region_by_point(0, 0, Point::new(20.0, 20.0))
        .unwrap();
    for _ in 0..2 {
        ctl.render(true, RenderOptions::skip_history());
        let session = ctl.session().unwrap();
        let mut distinct = std::collections::BTreeSet::new();
        for region in session.engine().region_curves().iter().flatten() {
            distinct.extend(region.horizontal.iter().chain(&region.vertical).copied());
        }
        assert_eq!(session.paths().len(), distinct.len());
        assert_eq!(distinct.len(), 20);
    }
}

#[test]
fn vertex_handles_sit_on_the_target_corners() {
    let (ctl, _) = enter(Box::new(Warp::default()), |_| {});
    let centers: Vec<Point> = warp(&ctl)
        .control_objects()
        .iter()
        .map(|id| ctl.canvas().object(*id).unwrap().center)
        .collect();
    let expected = [(80.0, 80.0), (120.0, 80.0), (80.0, 120.0), (120.0, 120.0)];
    assert_eq!(centers.len(), 4);
    for (got, want) in centers.iter().zip(expected) {
        assert!(close(*got, want.into()), "{got:?} vs {want:?}");
    }
    // eight curve ends, each with a guide line
    assert_eq!(warp(&ctl).sub_control_objects().len(), 8);
    assert_eq!(warp(&ctl).line_objects().len(), 8);
}

#[test]
fn default_density_keeps_the_mesh_at_target_size() {
    let (mut ctl, target) = controller();
    ctl.enter_editing(target, None, Box::new(Warp::default()))
        .unwrap();
    let session = ctl.session().unwrap();
    let scale = session.warp_scale().unwrap();
    assert!((scale.x - 1.0).abs() < 1e-9 && (scale.y - 1.0).abs() < 1e-9, "{scale:?}");

    let image = ctl.canvas().object(session.warp_object().unwrap()).unwrap();
    assert_eq!(image.pixels().unwrap().dimensions(), (40, 40));
    assert!((image.scale_x - 1.0).abs() < 1e-9 && (image.scale_y - 1.0).abs() < 1e-9);
    assert!(close(image.center, Point::new(100.0, 100.0)));

    let centers: Vec<Point> = warp(&ctl)
        .control_objects()
        .iter()
        .map(|id| ctl.canvas().object(*id).unwrap().center)
        .collect();
    let expected = [(80.0, 80.0), (120.0, 80.0), (80.0, 120.0), (120.0, 120.0)];
    assert_eq!(centers.len(), 4);
    for (got, want) in centers.iter().zip(expected) {
        assert!(close(*got, want.into()), "{got:?} vs {want:?}");
    }
}

#[test]
fn coalesced_renders_run_once_with_the_last_callback() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    let first = Rc::new(Cell::new(0));
    let second = Rc::new(Cell::new(0));
    let (a, b) = (first.clone(), second.clone());
    ctl.request_render(
        false,
        Some(Box::new(move |_: &mut Controller| a.set(a.get() + 1))),
        RenderOptions::default(),
    );
    ctl.request_render(
        false,
        Some(Box::new(move |_: &mut Controller| b.set(b.get() + 1))),
        RenderOptions::skip_history(),
    );
    assert!(ctl.has_pending_render());
    ctl.on_animation_frame();
    ctl.on_animation_frame();
    assert!(!ctl.has_pending_render());
    assert_eq!((first.get(), second.get()), (0, 1));
    // the replaced request would have recorded
    assert_eq!(ctl.history().undo_stack().len(), 1);
}

// ===== History =====

#[test]
fn undo_keeps_the_initial_state() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    assert_eq!(ctl.history().undo_stack().len(), 1);
    ctl.undo();
    ctl.undo();
    assert_eq!(ctl.history().undo_stack().len(), 1);
    ctl.redo();
    assert_eq!(ctl.history().undo_stack().len(), 1);
}

#[test]
fn undo_twice_then_redo_lands_on_the_second_render() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    let mut states = Vec::new();
    for step in 1..=3 {
        ctl.engine_mut().unwrap().update_vertex_coord(
            0,
            0,
            VertexType::BottomRight,
            Point::new(20.0 + step as f64, 20.0),
            false,
        );
        ctl.render(true, RenderOptions::default());
        states.push(ctl.get_warp_state().unwrap());
    }
    assert_eq!(ctl.history().undo_stack().len(), 4);

    ctl.undo();
    ctl.undo();
    ctl.redo();
    assert_eq!(ctl.get_warp_state().as_ref(), Some(&states[1]));

    // redo then undo is a round trip
    let before = ctl.get_warp_state();
    ctl.redo();
    ctl.undo();
    assert_eq!(ctl.get_warp_state(), before);
}

#[test]
fn listener_sees_both_stacks() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    ctl.on_history_change(move |records| {
        log.borrow_mut().push((records.undo.len(), records.redo.len()));
    });
    ctl.render(false, RenderOptions::default());
    ctl.undo();
    ctl.redo();
    ctl.record();
    assert_eq!(*seen.borrow(), vec![(2, 0), (1, 1), (2, 0), (3, 0)]);
}

#[test]
fn disabled_history_records_nothing() {
    let (ctl, target) = controller();
    let mut ctl = WarpController::new(
        ctl.canvas,
        ControllerOptions {
            enable_history: false,
        },
    );
    ctl.enter_editing(target, None, Box::new(Warp::default()))
        .unwrap();
    ctl.record();
    assert!(ctl.history().undo_stack().is_empty());
}

#[test]
fn reset_with_and_without_history() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    let initial = ctl.get_warp_state().unwrap();

    // nothing to reset yet
    ctl.reset(true);
    assert_eq!(ctl.history().undo_stack().len(), 1);

    let corner = warp(&ctl).control_at(GridPosition::new(1, 1)).unwrap();
    drag(&mut ctl, corner, Point::new(130.0, 125.0));
    assert_eq!(ctl.history().undo_stack().len(), 2);

    ctl.reset(true);
    assert!(ctl.session().unwrap().engine().is_unwarped());
    assert_eq!(ctl.history().undo_stack().len(), 3);

    ctl.undo();
    ctl.reset(false);
    assert_eq!(ctl.history().undo_stack().len(), 1);
    assert!(ctl.history().redo_stack().is_empty());
    assert!(ctl.get_warp_state().unwrap().approx_eq(&initial, 1e-9));
}

// ===== Warp mode =====

#[test]
fn dragging_a_vertex_and_back_restores_the_mesh() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    let initial = ctl.get_warp_state().unwrap();
    let corner = warp(&ctl).control_at(GridPosition::new(1, 1)).unwrap();

    drag(&mut ctl, corner, Point::new(130.0, 125.0));
    let engine = ctl.session().unwrap().engine();
    assert!(close(
        engine.vertex(GridPosition::new(1, 1)).unwrap(),
        Point::new(50.0, 45.0)
    ));
    assert_eq!(ctl.history().undo_stack().len(), 2);

    // the handle stays put across the position-only render
    assert_eq!(
        warp(&ctl).control_at(GridPosition::new(1, 1)),
        Some(corner)
    );

    drag(&mut ctl, corner, Point::new(120.0, 120.0));
    assert!(ctl.get_warp_state().unwrap().approx_eq(&initial, 1e-9));
    assert_eq!(ctl.history().undo_stack().len(), 3);
}

#[test]
fn dragging_a_tangent_handle_bends_only_its_curve() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    let initial = ctl.get_warp_state().unwrap();
    let sub = warp(&ctl).sub_controls_at(GridPosition::new(0, 0))[0];
    let at = ctl.canvas().object(sub).unwrap().center;

    drag(&mut ctl, sub, at + kurbo::Vec2::new(0.0, 5.0));
    let engine = ctl.session().unwrap().engine();
    assert!(!engine.is_unwarped());
    assert_eq!(engine.vertex(GridPosition::new(0, 0)), Some(Point::ZERO));
    assert_ne!(ctl.get_warp_state().unwrap(), initial);
}

#[test]
fn selecting_a_vertex_reveals_its_tangent_handles() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    let corner = warp(&ctl).control_at(GridPosition::new(0, 0)).unwrap();
    ctl.canvas_mut().set_active_objects(&[corner]);
    ctl.handle_event(&CanvasEvent::SelectionChanged);

    let mode = warp(&ctl);
    let own = mode.sub_controls_at(GridPosition::new(0, 0));
    let other = mode.sub_controls_at(GridPosition::new(1, 1));
    assert!(own.iter().all(|id| ctl.canvas().object(*id).unwrap().visible));
    assert!(other.iter().all(|id| !ctl.canvas().object(*id).unwrap().visible));
    let handle = ctl.canvas().object(corner).unwrap();
    assert_eq!(handle.fill, Some(crate::theme::mode::SUB_THEME));
    assert!(handle.per_pixel_target_find);
}

#[test]
fn clicking_the_marker_splits_the_region() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |engine| {
        engine
            .split_region_by_point(0, 0, Point::new(20.0, 20.0))
            .unwrap();
    });
    assert_eq!(rows_cols(&ctl), (2, 2));

    // a click on the image drops the marker there
    click(&mut ctl, 93.0, 113.0, 0);
    let marker = warp(&ctl).insert_control_object().unwrap();
    assert!(ctl.canvas().contains(marker));
    assert!(close(
        ctl.canvas().object(marker).unwrap().center,
        Point::new(93.0, 113.0)
    ));
    assert_eq!(ctl.canvas().hit_test(Point::new(93.0, 113.0)), Some(marker));

    // a click on the marker splits through it
    click(&mut ctl, 93.0, 113.0, 1000);
    assert_eq!(rows_cols(&ctl), (3, 3));
    assert!(ctl.canvas().object(marker).is_none());
    let fresh = warp(&ctl).insert_control_object().unwrap();
    assert!(!ctl.canvas().contains(fresh));
    assert_eq!(ctl.history().undo_stack().len(), 2);
    assert_eq!(warp(&ctl).control_objects().len(), 16);
}

#[test]
fn long_press_on_the_image_shows_no_marker() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    ctl.handle_event(&CanvasEvent::PointerDown(pointer(&ctl, 93.0, 113.0, 0)));
    ctl.handle_event(&CanvasEvent::PointerUp(pointer(&ctl, 93.0, 113.0, 1000)));
    let marker = warp(&ctl).insert_control_object().unwrap();
    assert!(!ctl.canvas().contains(marker));

    click(&mut ctl, 93.0, 113.0, 2000);
    assert!(ctl.canvas().contains(marker));
}

#[test]
fn dragging_the_marker_moves_the_whole_mesh() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    click(&mut ctl, 93.0, 113.0, 0);
    let marker = warp(&ctl).insert_control_object().unwrap();

    ctl.handle_event(&CanvasEvent::PointerDown(pointer(&ctl, 93.0, 113.0, 1000)));
    assert!(!ctl.canvas().selection_enabled());
    ctl.handle_event(&CanvasEvent::PointerMove(pointer(&ctl, 103.0, 113.0, 1100)));
    assert!(ctl.has_pending_render());
    ctl.on_animation_frame();
    ctl.handle_event(&CanvasEvent::PointerUp(pointer(&ctl, 103.0, 113.0, 1500)));

    let engine = ctl.session().unwrap().engine();
    assert_eq!(engine.rows(), 1);
    assert!(close(
        engine.vertex(GridPosition::new(0, 0)).unwrap(),
        Point::new(10.0, 0.0)
    ));
    assert!(close(
        ctl.canvas().object(marker).unwrap().center,
        Point::new(103.0, 113.0)
    ));
    assert!(ctl.canvas().selection_enabled());
    assert_eq!(ctl.history().undo_stack().len(), 2);
}

#[test]
fn deleting_interior_vertices_merges_regions() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |engine| {
        engine
            .split_region_by_point(0, 0, Point::new(13.0, 13.0))
            .unwrap();
        engine
            .split_region_by_point(1, 1, Point::new(27.0, 27.0))
            .unwrap();
    });
    assert_eq!(rows_cols(&ctl), (3, 3));

    let a = warp(&ctl).control_at(GridPosition::new(1, 1)).unwrap();
    let b = warp(&ctl).control_at(GridPosition::new(1, 2)).unwrap();
    ctl.canvas_mut().set_active_objects(&[a, b]);
    ctl.handle_event(&CanvasEvent::KeyDown("Delete".into()));
    assert_eq!(rows_cols(&ctl), (2, 1));
    assert!(ctl.canvas().object(a).is_none());
    assert_eq!(ctl.history().undo_stack().len(), 2);
}

#[test]
fn outer_corners_cannot_be_deleted() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |engine| {
        engine
            .split_region_by_point(0, 0, Point::new(20.0, 20.0))
            .unwrap();
    });
    let corner = warp(&ctl).control_at(GridPosition::new(0, 0)).unwrap();
    let handles = warp(&ctl).control_objects();
    ctl.canvas_mut().set_active_objects(&[corner]);
    ctl.handle_event(&CanvasEvent::KeyDown("Backspace".into()));
    assert_eq!(rows_cols(&ctl), (2, 2));
    assert_eq!(warp(&ctl).control_objects(), handles);
    assert_eq!(ctl.history().undo_stack().len(), 1);
}

#[test]
fn style_setters_apply_from_the_next_render() {
    let (mut ctl, _) = enter(Box::new(Warp::default()), |_| {});
    ctl.mode_as_mut::<Warp>().unwrap().register_style_setter(
        crate::modes::StyleTarget::Control,
        Box::new(|o| o.opacity = 0.3),
    );
    ctl.render(true, RenderOptions::skip_history());
    for id in warp(&ctl).control_objects() {
        assert_eq!(ctl.canvas().object(id).unwrap().opacity, 0.3);
    }
}

// ===== Perspective mode =====

#[test]
fn invalid_corner_drag_snaps_back() {
    let (mut ctl, _) = enter(Box::new(Perspective::default()), |_| {});
    let initial = ctl.get_warp_state().unwrap();
    let handles = ctl.mode_as::<Perspective>().unwrap().control_objects();
    assert_eq!(handles.len(), 4);
    let top_left = handles[0];
    assert!(close(
        ctl.canvas().object(top_left).unwrap().center,
        Point::new(80.0, 80.0)
    ));

    drag(&mut ctl, top_left, Point::new(130.0, 130.0));
    assert!(ctl.get_warp_state().unwrap().approx_eq(&initial, 1e-9));
    assert!(close(
        ctl.canvas().object(top_left).unwrap().center,
        Point::new(80.0, 80.0)
    ));
}

#[test]
fn valid_corner_drag_sticks_and_records() {
    let (mut ctl, _) = enter(Box::new(Perspective::default()), |_| {});
    let top_right = ctl.mode_as::<Perspective>().unwrap().control_objects()[1];

    drag(&mut ctl, top_right, Point::new(125.0, 85.0));
    let engine = ctl.session().unwrap().engine();
    assert!(close(
        engine.vertex(GridPosition::new(0, 1)).unwrap(),
        Point::new(45.0, 5.0)
    ));
    assert_eq!(ctl.history().undo_stack().len(), 2);

    drag(&mut ctl, top_right, Point::new(120.0, 80.0));
    assert!(ctl.session().unwrap().engine().is_unwarped());
}

#[test]
fn drag_resize_lays_out_a_rectangle() {
    let (mut ctl, _) = enter(Box::new(Perspective::default()), |_| {});
    // empty canvas, away from the image
    ctl.handle_event(&CanvasEvent::PointerDown(pointer(&ctl, 10.0, 10.0, 0)));
    // under the threshold: nothing yet
    ctl.handle_event(&CanvasEvent::PointerMove(pointer(&ctl, 30.0, 30.0, 10)));
    assert!(ctl.session().unwrap().engine().is_unwarped());

    ctl.handle_event(&CanvasEvent::PointerMove(pointer(&ctl, 70.0, 90.0, 20)));
    ctl.handle_event(&CanvasEvent::PointerUp(pointer(&ctl, 70.0, 90.0, 30)));

    let engine = ctl.session().unwrap().engine();
    assert!(close(
        engine.vertex(GridPosition::new(0, 0)).unwrap(),
        Point::new(-70.0, -70.0)
    ));
    assert!(close(
        engine.vertex(GridPosition::new(1, 1)).unwrap(),
        Point::new(-10.0, 10.0)
    ));
    assert_eq!(ctl.history().undo_stack().len(), 2);
    assert!(ctl.canvas().selection_enabled());
}
