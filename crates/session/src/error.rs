use crate::cell::{CellId, CellType};
use thiserror::Error;

/// Structural errors surfaced synchronously to callers of the session façade.
///
/// Backend execution failures are never represented here: they are absorbed
/// into the cell (`status = error`, error output appended) and reported as an
/// error notification instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// An operation referenced a cell id that is not in the store.
    #[error("cell not found: {0}")]
    CellNotFound(CellId),

    /// An insert or move used an index outside the valid range.
    #[error("index {index} out of range for {len} cells")]
    IndexOutOfRange { index: usize, len: usize },

    /// Execution was requested for a cell type that cannot run.
    #[error("cells of type {0} cannot be executed")]
    NotRunnable(CellType),

    /// The persistence collaborator reported a failure on save or load.
    #[error("persistence failed: {0}")]
    Persistence(String),
}
