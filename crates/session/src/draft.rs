//! Local draft edits for presentation surfaces.
//!
//! Surfaces never mutate cells directly while the user types. They hold a
//! `CellDraft` and flush it through `update_cell` on an explicit commit
//! (blur, timer tick, keyboard shortcut) — an explicit scheduling contract
//! rather than implicit debouncing.

use crate::cell::{CellId, CellUpdate};
use crate::error::SessionError;
use crate::session::SessionCoordinator;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CellDraft {
    cell_id: CellId,
    text: String,
    dirty: bool,
}

impl CellDraft {
    pub fn new(cell_id: CellId, initial: impl Into<String>) -> Self {
        Self {
            cell_id,
            text: initial.into(),
            dirty: false,
        }
    }

    pub fn cell_id(&self) -> CellId {
        self.cell_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the draft text; marks the draft dirty only on actual change.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.dirty = true;
        }
    }

    /// Flush the draft into the session if dirty. Returns whether a commit
    /// happened. On success the draft is clean again; on failure (e.g. the
    /// cell was deleted underneath) it stays dirty for the surface to decide.
    pub fn commit(&mut self, session: &SessionCoordinator) -> Result<bool, SessionError> {
        if !self.dirty {
            return Ok(false);
        }
        session.update_cell(
            self.cell_id,
            CellUpdate {
                content: Some(Value::String(self.text.clone())),
                ..Default::default()
            },
        )?;
        self.dirty = false;
        Ok(true)
    }
}
