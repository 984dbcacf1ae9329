// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Deformation modes
//!
//! A mode supplies the split algorithm the engine runs and two attach
//! hooks the session controller calls after each reconciliation pass:
//! [`Mode::render`] on every pass and [`Mode::dirty_render`] only on
//! structural ones. Each hook hands back an [`AttachToken`] which the
//! controller passes to [`Mode::release`] before the next attach.

mod base;
mod constraint;
mod perspective;
mod warp;

pub use base::{BaseRenderer, StyleSetter, StyleTarget};
pub use constraint::AxisConstraint;
pub use perspective::{Perspective, PerspectiveOptions};
pub use warp::{Warp, WarpOptions};

use std::any::Any;

use crate::canvas::{Canvas, CanvasEvent, SceneObject};
use crate::engine::{MeshEngine, SplitPoints, SplitStrategy, strategy};
use crate::error::WarpResult;
use crate::model::ObjectId;
use crate::session::{RenderOptions, Session};

// ===== Attach Tokens =====

/// Which hook produced a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Render,
    Dirty,
}

/// Objects attached by one hook call.
///
/// Released exactly once through [`Mode::release`]. Detached objects stay
/// in the canvas store; owned objects are dropped from it.
#[must_use]
#[derive(Debug)]
pub struct AttachToken {
    hook: Hook,
    detach: Vec<ObjectId>,
    owned: Vec<ObjectId>,
}

impl AttachToken {
    /// Token whose objects outlive it (the warped image, session paths)
    pub fn detach(hook: Hook, objects: Vec<ObjectId>) -> Self {
        Self {
            hook,
            detach: objects,
            owned: Vec::new(),
        }
    }

    /// Token owning its objects (interaction handles)
    pub fn owned(hook: Hook, objects: Vec<ObjectId>) -> Self {
        Self {
            hook,
            detach: Vec::new(),
            owned: objects,
        }
    }

    pub fn hook(&self) -> Hook {
        self.hook
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectId> {
        self.detach.iter().chain(&self.owned)
    }

    /// Undo the attach
    pub fn release(self, canvas: &mut dyn Canvas) {
        for id in self.detach {
            canvas.remove(id);
        }
        for id in self.owned {
            canvas.discard(id);
        }
    }
}

// ===== Commands =====

/// Requests a mode hands back to the controller from an event handler
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Render now
    Render {
        structural: bool,
        options: RenderOptions,
    },
    /// Coalesced render on the next animation frame, optionally restoring
    /// handle z-order afterwards
    RequestRender {
        structural: bool,
        options: RenderOptions,
        restore_order: bool,
    },
    /// Put interaction handles back on top
    RestoreOrder,
    /// Push the current warp state onto the history
    Record,
}

// ===== Mode Trait =====

/// A deformation strategy
pub trait Mode: Any {
    /// Unique name, used as the engine's split strategy key
    fn name(&self) -> &str;

    fn base(&self) -> &BaseRenderer;

    fn base_mut(&mut self) -> &mut BaseRenderer;

    /// Split algorithm registered with the engine on enter
    fn split_strategy(&self) -> SplitStrategy {
        SplitStrategy::new(self.name(), strategy::warp)
    }

    /// Lattice for the engine's current curves
    fn compute_split_points(&self, engine: &dyn MeshEngine) -> WarpResult<SplitPoints> {
        self.split_strategy().execute(engine)
    }

    /// Attach the warped image and boundary paths
    fn render(&mut self, session: &Session, canvas: &mut dyn Canvas) -> Option<AttachToken> {
        self.base().attach(session, canvas)
    }

    /// Attach interaction handles after a structural change
    fn dirty_render(
        &mut self,
        _session: &Session,
        _canvas: &mut dyn Canvas,
    ) -> Option<AttachToken> {
        None
    }

    /// Undo an attach
    fn release(&mut self, token: AttachToken, canvas: &mut dyn Canvas) {
        token.release(canvas);
    }

    /// React to a canvas event while handles are attached
    fn handle_event(
        &mut self,
        _event: &CanvasEvent,
        _session: &mut Session,
        _canvas: &mut dyn Canvas,
    ) -> Vec<Command> {
        Vec::new()
    }

    /// Bring interaction handles back on top of the image and paths
    fn restore_order(&mut self, _canvas: &mut dyn Canvas) {}

    /// Customize the look of one kind of object; replaces an earlier setter
    /// for the same target and applies from the next render
    fn register_style_setter(
        &mut self,
        target: StyleTarget,
        setter: Box<dyn Fn(&mut SceneObject)>,
    ) {
        self.base_mut().register_style_setter(target, setter);
    }
}
