// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Warp data model

pub mod object_id;
pub mod warp_state;

pub use object_id::ObjectId;
pub use warp_state::{Direction, GridPosition, RegionBounds, VertexType, WarpState};
