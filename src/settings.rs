// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Interaction and engine configuration constants.
//!
//! This module holds non-visual settings. Visual styling (colors, handle
//! sizes) belongs in `theme.rs`.

// ============================================================================
// INTERACTION SETTINGS
// ============================================================================
/// Press-release shorter than this counts as a click rather than a drag
const CLICK_THRESHOLD_MS: u64 = 200;

/// Minimum drag distance (canvas px, per axis) before drag-resize kicks in
const MINIMUM_DRAG_THRESHOLD: f64 = 50.0;

/// Keys that delete the selected vertices
const DELETE_KEYS: [&str; 2] = ["Delete", "Backspace"];

/// Pointer button mask for the primary (left) button
const PRIMARY_BUTTON: u8 = 1;

// ============================================================================
// ENGINE SETTINGS
// ============================================================================
/// Source snapshots larger than this are downscaled before warping
const INPUT_LIMIT_WIDTH: f64 = 2000.0;
const INPUT_LIMIT_HEIGHT: f64 = 2000.0;

/// Rasterized output is never larger than this on either axis.
///
/// Past it the engine hands back a blank image instead of allocating.
const MAX_OUTPUT_DIMENSION: u32 = 8192;

/// Lattice step as a fraction of one region (0.1 = 10 quads per side)
const SPLIT_UNIT: f64 = 0.1;

/// Tolerance used when comparing curve geometry
const GEOMETRY_EPSILON: f64 = 1e-6;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Pointer and keyboard interaction settings
pub mod interaction {
    use std::time::Duration;

    /// Click vs. drag cutoff
    pub const CLICK_THRESHOLD: Duration = Duration::from_millis(super::CLICK_THRESHOLD_MS);

    /// Drag-resize threshold (perspective mode)
    pub const MINIMUM_DRAG_THRESHOLD: f64 = super::MINIMUM_DRAG_THRESHOLD;

    /// Delete/backspace key names
    pub const DELETE_KEYS: [&str; 2] = super::DELETE_KEYS;

    pub const PRIMARY_BUTTON: u8 = super::PRIMARY_BUTTON;
}

/// Mesh engine limits and defaults
pub mod engine {
    /// Input limit applied on entering a session
    pub const INPUT_LIMIT_WIDTH: f64 = super::INPUT_LIMIT_WIDTH;
    pub const INPUT_LIMIT_HEIGHT: f64 = super::INPUT_LIMIT_HEIGHT;

    /// Hard cap for rasterized output
    pub const MAX_OUTPUT_DIMENSION: u32 = super::MAX_OUTPUT_DIMENSION;

    /// Default lattice split unit
    pub const SPLIT_UNIT: f64 = super::SPLIT_UNIT;

    pub const EPSILON: f64 = super::GEOMETRY_EPSILON;
}
