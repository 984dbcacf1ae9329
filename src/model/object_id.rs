// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Unique identifiers for scene objects.
//!
//! Each `ObjectId` is a monotonically increasing `u64` drawn from a global
//! atomic counter. Handles, paths and the warped image are all looked up by
//! id, so a handle that was discarded during a structural render can never
//! be confused with its replacement.

use std::sync::atomic::{AtomicU64, Ordering};

/// A unique identifier for a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

static OBJECT_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    /// Create a new unique object ID
    pub fn next() -> Self {
        Self(OBJECT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}
