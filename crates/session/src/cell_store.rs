//! Ordered cell collection. Insertion order is document order is render order.
//!
//! Every mutating method is synchronous and atomic from the caller's point of
//! view; callers observing the store between calls never see a partial update.

use crate::cell::{Cell, CellId, CellMetadata, CellOutput, CellStatus, CellType, CellUpdate, ExecutionTiming};
use crate::error::SessionError;
use log::debug;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct CellStore {
    cells: Vec<Cell>,
}

impl CellStore {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read-only snapshot of all cells in document order.
    pub fn all(&self) -> Vec<Cell> {
        self.cells.clone()
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id == id)
    }

    pub fn position(&self, id: CellId) -> Option<usize> {
        self.cells.iter().position(|c| c.id == id)
    }

    /// Create a cell and insert it at `index`, or append when `index` is None.
    /// `index` must satisfy `0 <= index <= len`.
    pub fn add(
        &mut self,
        cell_type: CellType,
        content: Value,
        index: Option<usize>,
        metadata: Option<CellMetadata>,
    ) -> Result<CellId, SessionError> {
        let at = index.unwrap_or(self.cells.len());
        if at > self.cells.len() {
            return Err(SessionError::IndexOutOfRange {
                index: at,
                len: self.cells.len(),
            });
        }

        let cell = Cell::new(cell_type, content, metadata);
        let id = cell.id;
        self.cells.insert(at, cell);
        debug!("[store] Added {} cell {} at index {}", cell_type, id, at);
        Ok(id)
    }

    /// Merge `update` into the cell matching `id`. Never alters id or type.
    pub fn update(&mut self, id: CellId, update: CellUpdate) -> Result<(), SessionError> {
        let cell = self.get_mut(id)?;
        if let Some(content) = update.content {
            cell.content = content;
        }
        if let Some(outputs) = update.outputs {
            cell.outputs = outputs;
        }
        if let Some(status) = update.status {
            cell.status = status;
        }
        if let Some(metadata) = update.metadata {
            cell.metadata = metadata;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: CellId) -> Result<Cell, SessionError> {
        let idx = self.position(id).ok_or(SessionError::CellNotFound(id))?;
        let cell = self.cells.remove(idx);
        debug!("[store] Removed cell {} from index {}", id, idx);
        Ok(cell)
    }

    /// Relocate the cell at `from` to `to`, preserving the relative order of
    /// all other cells. Both indices must be valid positions.
    pub fn move_cell(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        let len = self.cells.len();
        if from >= len {
            return Err(SessionError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(SessionError::IndexOutOfRange { index: to, len });
        }
        if from != to {
            let cell = self.cells.remove(from);
            self.cells.insert(to, cell);
        }
        Ok(())
    }

    /// Replace the whole document, used when loading a notebook snapshot.
    pub fn replace_all(&mut self, cells: Vec<Cell>) {
        self.cells = cells;
    }

    pub fn set_status(&mut self, id: CellId, status: CellStatus) -> Result<(), SessionError> {
        self.get_mut(id)?.status = status;
        Ok(())
    }

    pub fn clear_outputs(&mut self, id: CellId) -> Result<(), SessionError> {
        let cell = self.get_mut(id)?;
        cell.outputs.clear();
        cell.execution_time = None;
        Ok(())
    }

    /// Apply a successful execution result in one atomic step: outputs
    /// replaced, status `success`, execution count bumped, timing recorded.
    pub fn finish_success(
        &mut self,
        id: CellId,
        outputs: Vec<CellOutput>,
        timing: ExecutionTiming,
    ) -> Result<(), SessionError> {
        let cell = self.get_mut(id)?;
        cell.outputs = outputs;
        cell.status = CellStatus::Success;
        cell.execution_count += 1;
        cell.execution_time = Some(timing);
        Ok(())
    }

    /// Apply a failed execution result: error output appended, status `error`,
    /// execution count unchanged.
    pub fn finish_error(
        &mut self,
        id: CellId,
        message: String,
        timing: ExecutionTiming,
    ) -> Result<(), SessionError> {
        let cell = self.get_mut(id)?;
        cell.outputs.push(CellOutput::Error { message });
        cell.status = CellStatus::Error;
        cell.execution_time = Some(timing);
        Ok(())
    }

    fn get_mut(&mut self, id: CellId) -> Result<&mut Cell, SessionError> {
        self.cells
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(SessionError::CellNotFound(id))
    }
}
