//! In-memory notebook session core: the authoritative model of cells, their
//! execution lifecycle, and the mutation operations every UI surface consumes
//! through a single coordination point.
//!
//! Rendering, chrome, and the actual kernel protocol live elsewhere; they
//! talk to [`SessionCoordinator`] and implement the [`ExecutionBackend`] and
//! [`NotebookStore`] collaborator traits.

pub mod cell;
pub mod cell_store;
pub mod draft;
pub mod error;
pub mod execution;
pub mod metadata;
pub mod notifications;
pub mod persistence;
pub mod selection;
pub mod session;

pub use cell::{Cell, CellId, CellMetadata, CellOutput, CellStatus, CellType, CellUpdate, ExecutionTiming};
pub use cell_store::CellStore;
pub use draft::CellDraft;
pub use error::SessionError;
pub use execution::{DetachedBackend, ExecutionBackend, ExecutionEngine, ExecutionHandle};
pub use metadata::{KernelSpec, NotebookMetadata, NotebookMetadataPatch, ResourceLimits, Theme, Visibility};
pub use notifications::{Notification, NotificationKind, NotificationQueue, MAX_NOTIFICATIONS, NOTIFICATION_TTL_MS};
pub use persistence::{InMemoryStore, JsonFileStore, NotebookSnapshot, NotebookStore};
pub use selection::{SelectionState, SidebarPanel};
pub use session::{SessionCoordinator, SessionEvent};
