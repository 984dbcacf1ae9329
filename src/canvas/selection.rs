// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Active-object set of a canvas.
//!
//! `Selection` wraps an `Arc<BTreeSet<ObjectId>>` so hosts can hand out
//! cheap copies to event handlers. The `BTreeSet` keeps iteration order
//! deterministic, which matters when several vertices are deleted at once.

use crate::model::ObjectId;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A set of active (selected) canvas objects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    inner: Arc<BTreeSet<ObjectId>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.inner.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectId> {
        self.inner.iter()
    }

    pub fn insert(&mut self, id: ObjectId) {
        Arc::make_mut(&mut self.inner).insert(id);
    }

    pub fn remove(&mut self, id: &ObjectId) {
        if self.inner.contains(id) {
            Arc::make_mut(&mut self.inner).remove(id);
        }
    }

    /// Keep only the ids matching `keep`
    pub fn retain(&mut self, keep: impl FnMut(&ObjectId) -> bool) {
        Arc::make_mut(&mut self.inner).retain(keep);
    }
}

impl FromIterator<ObjectId> for Selection {
    fn from_iter<I: IntoIterator<Item = ObjectId>>(iter: I) -> Self {
        Self {
            inner: Arc::new(iter.into_iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_duplicate_is_noop() {
        let mut sel = Selection::new();
        let id = ObjectId::next();
        sel.insert(id);
        sel.insert(id);
        assert_eq!(sel.len(), 1);
        assert!(sel.contains(&id));
    }

    #[test]
    fn clone_is_independent() {
        let mut sel = Selection::new();
        let id1 = ObjectId::next();
        let id2 = ObjectId::next();
        sel.insert(id1);

        let mut clone = sel.clone();
        clone.insert(id2);

        assert!(!sel.contains(&id2));
        assert!(clone.contains(&id2));
    }

    #[test]
    fn retain_drops_unmatched() {
        let ids: Vec<ObjectId> = (0..4).map(|_| ObjectId::next()).collect();
        let mut sel: Selection = ids.iter().copied().collect();
        sel.retain(|id| *id != ids[1]);
        assert_eq!(sel.len(), 3);
        assert!(!sel.contains(&ids[1]));
        sel.remove(&ids[0]);
        assert_eq!(sel.iter().copied().collect::<Vec<_>>(), vec![ids[2], ids[3]]);
    }
}
