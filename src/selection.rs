//! Selection synchronization.
//!
//! Selection flows two ways: the host may impose a set of ids (the initial
//! selection), and the user changes the selection through the table. The
//! synchronizer makes both directions idempotent: a host update equal to
//! the current selection writes nothing, and a change notification goes out
//! only when the sorted id list differs from the last one sent.

use crate::state::RowSelection;
use log::trace;

#[derive(Debug, Clone, Default)]
pub struct SelectionSynchronizer {
    last_emitted: Vec<String>,
    last_external: Option<Vec<String>>,
}

impl SelectionSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ids to emit, or `None` when the selection is unchanged
    /// since the last emission. The new list is recorded before returning.
    pub fn observe(&mut self, selection: &RowSelection) -> Option<Vec<String>> {
        let ids: Vec<String> = selection.iter().cloned().collect();
        if ids == self.last_emitted {
            return None;
        }
        trace!("Selection changed: {} row(s)", ids.len());
        self.last_emitted = ids.clone();
        Some(ids)
    }

    pub fn last_emitted(&self) -> &[String] {
        &self.last_emitted
    }

    /// Applies an externally supplied id list.
    ///
    /// Returns the selection to store, or `None` when nothing should be
    /// written: either the external list is the same as last time, or the
    /// current selection already equals it. An empty list clears a
    /// non-empty selection.
    pub fn bulk_set(&mut self, current: &RowSelection, external: &[String]) -> Option<RowSelection> {
        if self.last_external.as_deref() == Some(external) {
            return None;
        }
        self.last_external = Some(external.to_vec());

        let target: RowSelection = external.iter().cloned().collect();
        if &target == current {
            None
        } else {
            Some(target)
        }
    }
}
