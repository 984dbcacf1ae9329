// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Undo/redo stacks of warp states
//!
//! The top of the undo stack is the state currently shown. Its first entry
//! is the state the session started from and is never undone.

use crate::model::WarpState;

/// Borrowed view of both stacks, handed to history listeners.
///
/// In both slices the most recent entry is last.
#[derive(Debug, Clone, Copy)]
pub struct HistoryRecords<'a> {
    pub undo: &'a [WarpState],
    pub redo: &'a [WarpState],
}

#[derive(Debug, Clone, Default)]
pub struct History {
    undo: Vec<WarpState>,
    redo: Vec<WarpState>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new current state; invalidates redo
    pub fn push(&mut self, state: WarpState) {
        self.undo.push(state);
        self.redo.clear();
    }

    /// Step back, returning the state to restore
    pub fn undo(&mut self) -> Option<&WarpState> {
        if self.undo.len() <= 1 {
            return None;
        }
        let current = self.undo.pop()?;
        self.redo.push(current);
        self.undo.last()
    }

    /// Step forward, returning the state to restore
    pub fn redo(&mut self) -> Option<&WarpState> {
        let next = self.redo.pop()?;
        self.undo.push(next);
        self.undo.last()
    }

    /// Drop everything but the initial state
    pub fn collapse(&mut self) {
        self.undo.truncate(1);
        self.redo.clear();
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// State the session started from
    pub fn initial(&self) -> Option<&WarpState> {
        self.undo.first()
    }

    pub fn undo_stack(&self) -> &[WarpState] {
        &self.undo
    }

    pub fn redo_stack(&self) -> &[WarpState] {
        &self.redo
    }

    pub fn records(&self) -> HistoryRecords<'_> {
        HistoryRecords {
            undo: &self.undo,
            redo: &self.redo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn state(x: f64) -> WarpState {
        WarpState {
            split_points: vec![vec![Point::new(x, 0.0)]],
            region_bounds: Vec::new(),
        }
    }

    #[test]
    fn undo_never_drops_the_initial_state() {
        let mut history = History::new();
        assert!(history.undo().is_none());
        history.push(state(0.0));
        assert!(history.undo().is_none());
        history.push(state(1.0));
        assert_eq!(history.undo(), Some(&state(0.0)));
        assert!(history.undo().is_none());
        assert_eq!(history.undo_stack().len(), 1);
    }

    #[test]
    fn redo_then_undo_round_trips() {
        let mut history = History::new();
        for x in 0..3 {
            history.push(state(x as f64));
        }
        history.undo();
        history.undo();
        assert_eq!(history.redo(), Some(&state(1.0)));
        assert_eq!(history.undo(), Some(&state(0.0)));
        assert_eq!(history.redo_stack().len(), 2);
    }

    #[test]
    fn push_clears_redo_and_collapse_keeps_first() {
        let mut history = History::new();
        history.push(state(0.0));
        history.push(state(1.0));
        history.undo();
        history.push(state(2.0));
        assert!(history.redo_stack().is_empty());
        history.push(state(3.0));
        history.collapse();
        assert_eq!(history.undo_stack(), &[state(0.0)]);
        assert_eq!(history.initial(), Some(&state(0.0)));
        history.clear();
        assert!(history.records().undo.is_empty());
    }
}
