// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Error type shared by the engine and session layers.
//!
//! Only `SessionActive` and `UnknownObject` ever reach callers of the
//! session controller. Shape and engine failures are absorbed where they
//! happen and logged.

use crate::model::ObjectId;

#[derive(thiserror::Error, Debug)]
pub enum WarpError {
    #[error("a warp session is already active; leave it before entering another")]
    SessionActive,

    #[error("object {0:?} is not in the canvas")]
    UnknownObject(ObjectId),

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("region ({row}, {col}) is outside the grid")]
    RegionOutOfRange { row: usize, col: usize },

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type WarpResult<T> = Result<T, WarpError>;

impl WarpError {
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        Self::InvalidShape(msg.into())
    }
}
