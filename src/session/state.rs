// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-session data owned by the controller

use std::collections::HashMap;

use kurbo::{Rect, Size, Vec2};

use crate::engine::{CurveId, MeshEngine};
use crate::model::ObjectId;

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Entering,
    Active,
    Leaving,
}

/// Warp bounds and scale captured on the first render.
///
/// Kept for the rest of the session so later renders only correct the
/// offset and never re-derive the scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Anchor {
    pub bounds: Rect,
    /// Canvas units per curve-space unit
    pub warp_scale: Vec2,
}

/// One editing session: the target, its engine and the visuals built from
/// the engine's curve grid
pub struct Session {
    pub(super) target: ObjectId,
    /// Untransformed size of the target's pixel snapshot
    pub(super) snapshot_size: Size,
    pub(super) engine: Box<dyn MeshEngine>,
    pub(super) warp_object: Option<ObjectId>,
    /// Boundary path objects, one per distinct curve
    pub(super) paths: Vec<ObjectId>,
    pub(super) curve_paths: HashMap<CurveId, ObjectId>,
    pub(super) path_curves: HashMap<ObjectId, CurveId>,
    pub(super) anchor: Option<Anchor>,
}

impl Session {
    pub(super) fn new(target: ObjectId, snapshot_size: Size, engine: Box<dyn MeshEngine>) -> Self {
        Self {
            target,
            snapshot_size,
            engine,
            warp_object: None,
            paths: Vec::new(),
            curve_paths: HashMap::new(),
            path_curves: HashMap::new(),
            anchor: None,
        }
    }

    /// The object being warped
    pub fn target(&self) -> ObjectId {
        self.target
    }

    pub fn snapshot_size(&self) -> Size {
        self.snapshot_size
    }

    pub fn engine(&self) -> &dyn MeshEngine {
        &*self.engine
    }

    pub fn engine_mut(&mut self) -> &mut dyn MeshEngine {
        &mut *self.engine
    }

    /// The warped image object, once rendered
    pub fn warp_object(&self) -> Option<ObjectId> {
        self.warp_object
    }

    pub fn paths(&self) -> &[ObjectId] {
        &self.paths
    }

    pub fn path_for(&self, curve: CurveId) -> Option<ObjectId> {
        self.curve_paths.get(&curve).copied()
    }

    pub fn curve_for(&self, path: ObjectId) -> Option<CurveId> {
        self.path_curves.get(&path).copied()
    }

    /// Scale fixed on the first render
    pub fn warp_scale(&self) -> Option<Vec2> {
        self.anchor.map(|a| a.warp_scale)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("target", &self.target)
            .field("snapshot_size", &self.snapshot_size)
            .field("rows", &self.engine.rows())
            .field("cols", &self.engine.cols())
            .field("warp_object", &self.warp_object)
            .field("paths", &self.paths.len())
            .field("anchor", &self.anchor)
            .finish()
    }
}
