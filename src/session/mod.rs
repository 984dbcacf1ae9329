// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Session controller
//!
//! [`WarpController`] owns one editing session at a time: it snapshots the
//! target, drives the mesh engine, rebuilds the warped image and boundary
//! paths after every engine render, calls the active mode's attach hooks
//! and keeps the undo/redo history.

mod history;
mod reconcile;
mod state;

#[cfg(test)]
mod tests;

pub use history::{History, HistoryRecords};
pub use state::{Session, SessionState};

use std::any::Any;

use image::RgbaImage;
use kurbo::Size;

use crate::canvas::{Canvas, CanvasEvent, SceneObject};
use crate::engine::{GridWarp, MeshEngine};
use crate::error::{WarpError, WarpResult};
use crate::model::{ObjectId, WarpState};
use crate::modes::{AttachToken, Command, Mode};
use crate::settings;

/// Per-render switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Leave the history untouched for this render
    pub skip_history: bool,
}

impl RenderOptions {
    pub fn skip_history() -> Self {
        Self { skip_history: true }
    }
}

/// Controller settings
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub enable_history: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            enable_history: true,
        }
    }
}

/// Runs after a coalesced render
pub type RenderCallback<C> = Box<dyn FnOnce(&mut WarpController<C>)>;

/// Told about every history change
pub type HistoryListener = Box<dyn FnMut(HistoryRecords<'_>)>;

/// Builds the engine for a session from the source pixels
pub type EngineFactory = Box<dyn Fn(RgbaImage) -> Box<dyn MeshEngine>>;

/// Render waiting for the next animation frame
struct PendingRender<C: Canvas> {
    structural: bool,
    options: RenderOptions,
    callback: Option<RenderCallback<C>>,
    restore_order: bool,
}

/// Target properties reset while taking the pixel snapshot
#[derive(Debug, Clone, Copy)]
struct Look {
    opacity: f64,
    visible: bool,
    angle: f64,
    scale_x: f64,
    scale_y: f64,
    flip_x: bool,
    flip_y: bool,
}

impl Look {
    const IDENTITY: Look = Look {
        opacity: 1.0,
        visible: true,
        angle: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        flip_x: false,
        flip_y: false,
    };

    fn of(object: &SceneObject) -> Self {
        Self {
            opacity: object.opacity,
            visible: object.visible,
            angle: object.angle,
            scale_x: object.scale_x,
            scale_y: object.scale_y,
            flip_x: object.flip_x,
            flip_y: object.flip_y,
        }
    }

    fn apply(self, object: &mut SceneObject) {
        object.opacity = self.opacity;
        object.visible = self.visible;
        object.angle = self.angle;
        object.scale_x = self.scale_x;
        object.scale_y = self.scale_y;
        object.flip_x = self.flip_x;
        object.flip_y = self.flip_y;
    }
}

/// Mesh-warp editing controller bound to one canvas
pub struct WarpController<C: Canvas> {
    canvas: C,
    options: ControllerOptions,
    listener: Option<HistoryListener>,
    engine_factory: EngineFactory,
    state: SessionState,
    session: Option<Session>,
    mode: Option<Box<dyn Mode>>,
    history: History,
    /// Outstanding attach of `Mode::render`
    render_token: Option<AttachToken>,
    /// Outstanding attach of `Mode::dirty_render`
    dirty_token: Option<AttachToken>,
    pending: Option<PendingRender<C>>,
}

impl<C: Canvas> WarpController<C> {
    pub fn new(canvas: C, options: ControllerOptions) -> Self {
        Self {
            canvas,
            options,
            listener: None,
            engine_factory: Box::new(|source| Box::new(GridWarp::new(source))),
            state: SessionState::Idle,
            session: None,
            mode: None,
            history: History::new(),
            render_token: None,
            dirty_token: None,
            pending: None,
        }
    }

    /// Use a different mesh engine for the following sessions
    pub fn with_engine_factory(
        mut self,
        factory: impl Fn(RgbaImage) -> Box<dyn MeshEngine> + 'static,
    ) -> Self {
        self.engine_factory = Box::new(factory);
        self
    }

    /// Replace the history listener
    pub fn on_history_change(&mut self, listener: impl FnMut(HistoryRecords<'_>) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    // ===== Accessors =====

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Engine of the active session, for configuration between renders
    pub fn engine_mut(&mut self) -> Option<&mut dyn MeshEngine> {
        self.session.as_mut().map(|s| s.engine_mut())
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn get_warp_state(&self) -> Option<WarpState> {
        self.session.as_ref().map(|s| s.engine.warp_state())
    }

    pub fn get_mode(&self) -> Option<&dyn Mode> {
        self.mode.as_deref()
    }

    /// Active mode as a concrete type
    pub fn mode_as<T: Mode>(&self) -> Option<&T> {
        let mode: &dyn Any = self.mode.as_deref()?;
        mode.downcast_ref::<T>()
    }

    pub fn mode_as_mut<T: Mode>(&mut self) -> Option<&mut T> {
        let mode: &mut dyn Any = self.mode.as_deref_mut()?;
        mode.downcast_mut::<T>()
    }

    pub fn has_pending_render(&self) -> bool {
        self.pending.is_some()
    }

    // ===== Lifecycle =====

    /// Start editing `target` with `mode`.
    ///
    /// `source` replaces the pixel snapshot of the target when given.
    pub fn enter_editing(
        &mut self,
        target: ObjectId,
        source: Option<RgbaImage>,
        mode: Box<dyn Mode>,
    ) -> WarpResult<()> {
        self.enter_editing_with(target, source, mode, |_| {})
    }

    /// Like [`Self::enter_editing`], configuring the engine before the
    /// first render
    pub fn enter_editing_with(
        &mut self,
        target: ObjectId,
        source: Option<RgbaImage>,
        mode: Box<dyn Mode>,
        before_first_render: impl FnOnce(&mut dyn MeshEngine),
    ) -> WarpResult<()> {
        if self.state != SessionState::Idle || self.session.is_some() {
            return Err(WarpError::SessionActive);
        }
        if self.canvas.object(target).is_none() {
            return Err(WarpError::UnknownObject(target));
        }

        self.state = SessionState::Entering;
        self.canvas.discard_active_object();
        let source = match source {
            Some(source) => source,
            None => match self.snapshot(target) {
                Some(pixels) => pixels,
                None => {
                    self.state = SessionState::Idle;
                    return Err(WarpError::UnknownObject(target));
                }
            },
        };
        let snapshot_size = Size::new(source.width() as f64, source.height() as f64);

        let mut engine = (self.engine_factory)(source);
        engine.set_input_limit_size(Size::new(
            settings::engine::INPUT_LIMIT_WIDTH,
            settings::engine::INPUT_LIMIT_HEIGHT,
        ));
        engine.set_split_strategy(mode.split_strategy());
        before_first_render(&mut *engine);

        tracing::info!(
            "entering {} editing on {:?} ({}x{})",
            mode.name(),
            target,
            snapshot_size.width,
            snapshot_size.height
        );
        self.session = Some(Session::new(target, snapshot_size, engine));
        self.mode = Some(mode);
        self.state = SessionState::Active;
        self.render(true, RenderOptions::default());
        Ok(())
    }

    /// End the session, removing everything it attached
    pub fn leave_editing(&mut self) {
        if self.session.is_none() {
            return;
        }
        self.state = SessionState::Leaving;
        self.pending = None;

        self.canvas.set_render_on_add_remove(false);
        self.release_tokens(true);
        if let Some(session) = self.session.take() {
            for path in session.paths {
                self.canvas.discard(path);
            }
            if let Some(image) = session.warp_object {
                self.canvas.discard(image);
            }
        }
        self.canvas.set_selection_enabled(true);
        self.canvas.set_render_on_add_remove(true);
        self.canvas.request_render_all();

        if let Some(mode) = self.mode.take() {
            tracing::info!("left {} editing", mode.name());
        }
        self.history.clear();
        self.state = SessionState::Idle;
    }

    /// Rasterize the target without its own transform or opacity
    fn snapshot(&mut self, target: ObjectId) -> Option<RgbaImage> {
        let object = self.canvas.object_mut(target)?;
        let saved = Look::of(object);
        Look::IDENTITY.apply(object);
        let pixels = self.canvas.rasterize(target);
        if let Some(object) = self.canvas.object_mut(target) {
            saved.apply(object);
        }
        pixels
    }

    // ===== Rendering =====

    /// Release the outstanding attaches; structural first
    fn release_tokens(&mut self, structural: bool) {
        let Some(mode) = self.mode.as_mut() else {
            return;
        };
        if structural && let Some(token) = self.dirty_token.take() {
            mode.release(token, &mut self.canvas);
        }
        if let Some(token) = self.render_token.take() {
            mode.release(token, &mut self.canvas);
        }
    }

    /// Render the engine's current state and rebuild the session visuals.
    ///
    /// `structural` also rebuilds the mode's interaction handles.
    pub fn render(&mut self, structural: bool, options: RenderOptions) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let output = match session.engine.render() {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!("warp render failed, keeping the previous frame: {}", err);
                return;
            }
        };
        if !options.skip_history {
            self.record();
        }

        self.canvas.set_render_on_add_remove(false);
        self.release_tokens(structural);
        if let (Some(session), Some(mode)) = (self.session.as_mut(), self.mode.as_mut()) {
            reconcile::rebuild_paths(session, &mut self.canvas);
            if reconcile::place(session, &mut self.canvas, output) {
                self.render_token = mode.render(session, &mut self.canvas);
                if structural {
                    self.dirty_token = mode.dirty_render(session, &mut self.canvas);
                }
            }
            tracing::debug!(
                "rendered {}x{} grid, {} paths, structural: {}",
                session.engine.rows(),
                session.engine.cols(),
                session.paths.len(),
                structural
            );
        }
        self.canvas.set_render_on_add_remove(true);
        self.canvas.request_render_all();
    }

    /// Queue a render for the next animation frame.
    ///
    /// A render already queued is replaced, callback included.
    pub fn request_render(
        &mut self,
        structural: bool,
        callback: Option<RenderCallback<C>>,
        options: RenderOptions,
    ) {
        if self.state != SessionState::Active {
            return;
        }
        if self.pending.is_some() {
            tracing::debug!("replacing pending render");
        }
        self.pending = Some(PendingRender {
            structural,
            options,
            callback,
            restore_order: false,
        });
    }

    /// Display refresh hook: run the queued render, if any
    pub fn on_animation_frame(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.render(pending.structural, pending.options);
        if pending.restore_order
            && let Some(mode) = self.mode.as_mut()
        {
            mode.restore_order(&mut self.canvas);
        }
        if let Some(callback) = pending.callback {
            callback(self);
        }
    }

    // ===== History =====

    fn notify(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener(self.history.records());
        }
    }

    /// Push the engine's current warp state
    pub fn record(&mut self) {
        if !self.options.enable_history {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        self.history.push(session.engine.warp_state());
        self.notify();
    }

    pub fn undo(&mut self) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(state) = self.history.undo() else {
            return;
        };
        session.engine.set_warp_state(state);
        tracing::info!("undo, {} states left", self.history.undo_stack().len());
        self.render(true, RenderOptions::skip_history());
        self.notify();
    }

    pub fn redo(&mut self) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(state) = self.history.redo() else {
            return;
        };
        session.engine.set_warp_state(state);
        tracing::info!("redo, {} states ahead", self.history.redo_stack().len());
        self.render(true, RenderOptions::skip_history());
        self.notify();
    }

    /// Drop the deformation.
    ///
    /// With `keep_history` the reset renders with history on, so it lands
    /// on the undo stack as a new state and can be undone like any edit. A
    /// mesh that is already unwarped is left alone. Without `keep_history`
    /// the history collapses back to the state the session started from.
    pub fn reset(&mut self, keep_history: bool) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if keep_history {
            if session.engine.is_unwarped() {
                return;
            }
            session.engine.reset_warp_state();
            tracing::info!("reset warp, keeping history");
            self.render(true, RenderOptions::default());
        } else {
            self.history.collapse();
            match self.history.initial() {
                Some(initial) => session.engine.set_warp_state(initial),
                None => session.engine.reset_warp_state(),
            }
            tracing::info!("reset warp and history");
            self.render(true, RenderOptions::skip_history());
            self.notify();
        }
    }

    // ===== Events =====

    /// Forward a canvas event to the active mode
    pub fn handle_event(&mut self, event: &CanvasEvent) {
        if self.state != SessionState::Active {
            return;
        }
        let (Some(session), Some(mode)) = (self.session.as_mut(), self.mode.as_mut()) else {
            return;
        };
        let commands = mode.handle_event(event, session, &mut self.canvas);
        for command in commands {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Render {
                structural,
                options,
            } => self.render(structural, options),
            Command::RequestRender {
                structural,
                options,
                restore_order,
            } => {
                self.request_render(structural, None, options);
                if let Some(pending) = self.pending.as_mut() {
                    pending.restore_order |= restore_order;
                }
            }
            Command::RestoreOrder => {
                if let Some(mode) = self.mode.as_mut() {
                    mode.restore_order(&mut self.canvas);
                }
            }
            Command::Record => self.record(),
        }
    }
}
