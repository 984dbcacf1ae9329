// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Theme colors and handle metrics
//!
//! All colors use hexadecimal format: Color::from_rgba8(0xRR, 0xGG, 0xBB, 0xAA)

use peniko::Color;

// ============================================================================
// MODE THEME -- Boundary paths and unselected/selected handles
// ============================================================================
const THEME_COLOR: Color = Color::from_rgba8(0x33, 0x33, 0x33, 0x99);
const SUB_THEME_COLOR: Color = Color::from_rgba8(0x33, 0x33, 0x33, 0xff);

// ============================================================================
// HANDLES
// ============================================================================
const HANDLE_STROKE: Color = Color::from_rgba8(0xff, 0xff, 0xff, 0xff);
const HANDLE_RADIUS: f64 = 4.0;
const HANDLE_STROKE_WIDTH: f64 = 1.0;

// Curve (tangent) handles are small squares tied to a guide line
const CURVE_HANDLE_FILL: Color = Color::from_rgba8(0xff, 0xff, 0xff, 0xff);
const CURVE_HANDLE_SIZE: f64 = 6.0;
const GUIDE_LINE: Color = Color::from_rgba8(0xc8, 0xc8, 0xc8, 0xcc);
const GUIDE_LINE_WIDTH: f64 = 1.0;

// Insertion marker
const INSERT_HANDLE_FILL: Color = Color::from_rgba8(0xff, 0xff, 0xff, 0x33);
const INSERT_HANDLE_RADIUS: f64 = 4.0;

// ============================================================================
// BOUNDARY PATHS AND GRID OVERLAY
// ============================================================================
const PATH_STROKE_WIDTH: f64 = 1.0;
const GRID_OVERLAY: Color = Color::from_rgba8(0x99, 0x99, 0x99, 0xff);

// ============================================================================
// PUBLIC API
// ============================================================================

/// Mode-level theme colors
pub mod mode {
    use super::Color;
    pub const THEME: Color = super::THEME_COLOR;
    pub const SUB_THEME: Color = super::SUB_THEME_COLOR;
}

/// Vertex and tangent handles
pub mod handle {
    use super::Color;
    pub const STROKE: Color = super::HANDLE_STROKE;
    pub const RADIUS: f64 = super::HANDLE_RADIUS;
    pub const STROKE_WIDTH: f64 = super::HANDLE_STROKE_WIDTH;

    pub const CURVE_FILL: Color = super::CURVE_HANDLE_FILL;
    pub const CURVE_SIZE: f64 = super::CURVE_HANDLE_SIZE;

    pub const GUIDE_LINE: Color = super::GUIDE_LINE;
    pub const GUIDE_LINE_WIDTH: f64 = super::GUIDE_LINE_WIDTH;

    pub const INSERT_FILL: Color = super::INSERT_HANDLE_FILL;
    pub const INSERT_RADIUS: f64 = super::INSERT_HANDLE_RADIUS;
}

/// Boundary paths
pub mod path {
    pub const STROKE_WIDTH: f64 = super::PATH_STROKE_WIDTH;
}

/// Lattice overlay drawn by the reference engine
pub mod grid {
    use super::Color;
    pub const OVERLAY: Color = super::GRID_OVERLAY;
}

/// Theme pair carried by every mode
#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    /// Boundary paths and unselected handles
    pub theme: Color,
    /// Selected handles
    pub sub_theme: Color,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            theme: mode::THEME,
            sub_theme: mode::SUB_THEME,
        }
    }
}
