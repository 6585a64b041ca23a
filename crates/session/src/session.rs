//! Session coordinator: the single façade every presentation surface talks
//! to. Owns the cell store, execution engine, notification queue, selection
//! state, and document metadata. Surfaces hold read-only snapshots plus local
//! drafts; there is no ambient/global lookup — a handle to the coordinator is
//! passed to each surface at construction.

use crate::cell::{Cell, CellId, CellMetadata, CellStatus, CellType, CellUpdate};
use crate::cell_store::CellStore;
use crate::error::SessionError;
use crate::execution::{DetachedBackend, ExecutionBackend, ExecutionEngine, ExecutionHandle};
use crate::metadata::{NotebookMetadata, NotebookMetadataPatch};
use crate::notifications::{Notification, NotificationKind, NotificationQueue};
use crate::persistence::{InMemoryStore, NotebookSnapshot, NotebookStore};
use crate::selection::{SelectionState, SidebarPanel};
use log::{info, warn};
use serde_json::Value;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Change feed for presentation surfaces; each variant says which snapshot to
/// re-read. Notifications are not mirrored here, they have their own queue.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    CellsChanged,
    CellStatusChanged { cell_id: CellId, status: CellStatus },
    SelectionChanged,
    MetadataChanged,
    NotebookLoaded,
}

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    notebook_id: StdMutex<String>,
    cells: Arc<StdMutex<CellStore>>,
    selection: StdMutex<SelectionState>,
    metadata: StdMutex<NotebookMetadata>,
    notifications: NotificationQueue,
    engine: ExecutionEngine,
    store: Arc<dyn NotebookStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionCoordinator {
    pub fn new(backend: Arc<dyn ExecutionBackend>, store: Arc<dyn NotebookStore>) -> Self {
        let cells = Arc::new(StdMutex::new(CellStore::new()));
        let notifications = NotificationQueue::new();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let engine = ExecutionEngine::new(
            cells.clone(),
            backend,
            notifications.clone(),
            events.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                notebook_id: StdMutex::new(Uuid::new_v4().to_string()),
                cells,
                selection: StdMutex::new(SelectionState::default()),
                metadata: StdMutex::new(NotebookMetadata::default()),
                notifications,
                engine,
                store,
                events,
            }),
        }
    }

    /// Session with no kernel and in-memory persistence; executions fail until
    /// a real backend is attached at construction time.
    pub fn detached() -> Self {
        Self::new(Arc::new(DetachedBackend), Arc::new(InMemoryStore::new()))
    }

    /// Subscribe to the change feed. Slow receivers may observe `Lagged` and
    /// should re-read full snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // ---- cell mutations ----

    /// Insert a cell (at `index`, or appended) and make it the active cell.
    pub fn add_cell(
        &self,
        cell_type: CellType,
        content: Value,
        index: Option<usize>,
        metadata: Option<CellMetadata>,
    ) -> Result<CellId, SessionError> {
        let id = self
            .inner
            .cells
            .lock()
            .unwrap()
            .add(cell_type, content, index, metadata)?;
        self.inner.selection.lock().unwrap().active_cell_id = Some(id);

        info!("[session] Added {} cell {}", cell_type, id);
        self.notify(NotificationKind::Info, format!("Added {cell_type} cell"));
        self.emit(SessionEvent::CellsChanged);
        self.emit(SessionEvent::SelectionChanged);
        Ok(id)
    }

    /// Merge fields into an existing cell. Id and type are never touched.
    pub fn update_cell(&self, id: CellId, update: CellUpdate) -> Result<(), SessionError> {
        self.inner.cells.lock().unwrap().update(id, update)?;
        self.notify(NotificationKind::Info, "Cell updated");
        self.emit(SessionEvent::CellsChanged);
        Ok(())
    }

    /// Delete a cell. Deleting the active cell clears the selection.
    pub fn delete_cell(&self, id: CellId) -> Result<(), SessionError> {
        self.inner.cells.lock().unwrap().remove(id)?;
        {
            let mut selection = self.inner.selection.lock().unwrap();
            if selection.active_cell_id == Some(id) {
                selection.active_cell_id = None;
            }
        }

        info!("[session] Deleted cell {}", id);
        self.notify(NotificationKind::Info, "Cell deleted");
        self.emit(SessionEvent::CellsChanged);
        Ok(())
    }

    pub fn move_cell(&self, from: usize, to: usize) -> Result<(), SessionError> {
        self.inner.cells.lock().unwrap().move_cell(from, to)?;
        self.notify(NotificationKind::Info, "Cell moved");
        self.emit(SessionEvent::CellsChanged);
        Ok(())
    }

    pub fn clear_outputs(&self, id: CellId) -> Result<(), SessionError> {
        self.inner.cells.lock().unwrap().clear_outputs(id)?;
        self.notify(NotificationKind::Info, "Outputs cleared");
        self.emit(SessionEvent::CellsChanged);
        Ok(())
    }

    // ---- execution ----

    /// Dispatch one cell for execution. Structural errors return here;
    /// backend failures land in cell state and the notification queue.
    pub fn execute_cell(&self, id: CellId) -> Result<ExecutionHandle, SessionError> {
        self.inner.engine.execute(id)
    }

    /// Dispatch every runnable cell in document order, best effort.
    pub fn run_all_cells(&self) -> Vec<ExecutionHandle> {
        let handles = self.inner.engine.run_all();
        self.notify(
            NotificationKind::Info,
            format!("Running {} cells", handles.len()),
        );
        handles
    }

    // ---- persistence ----

    pub async fn save_notebook(&self) -> Result<(), SessionError> {
        let snapshot = self.snapshot();
        match self.inner.store.save(&snapshot).await {
            Ok(()) => {
                self.notify(NotificationKind::Success, "Notebook saved");
                Ok(())
            }
            Err(e) => {
                warn!("[session] Save failed: {}", e);
                self.notify(NotificationKind::Error, format!("Save failed: {e}"));
                Err(SessionError::Persistence(e.to_string()))
            }
        }
    }

    /// Replace the whole session with a stored notebook. Selection state is
    /// reset to defaults.
    pub async fn load_notebook(&self, notebook_id: &str) -> Result<(), SessionError> {
        let snapshot = match self.inner.store.load(notebook_id).await {
            Ok(s) => s,
            Err(e) => {
                warn!("[session] Load failed: {}", e);
                self.notify(NotificationKind::Error, format!("Load failed: {e}"));
                return Err(SessionError::Persistence(e.to_string()));
            }
        };

        *self.inner.notebook_id.lock().unwrap() = snapshot.notebook_id;
        *self.inner.metadata.lock().unwrap() = snapshot.metadata;
        self.inner.cells.lock().unwrap().replace_all(snapshot.cells);
        *self.inner.selection.lock().unwrap() = SelectionState::default();

        info!("[session] Loaded notebook {}", notebook_id);
        self.notify(NotificationKind::Success, "Notebook loaded");
        self.emit(SessionEvent::NotebookLoaded);
        Ok(())
    }

    // ---- history (extension point) ----

    /// History is not implemented; always reports nothing to undo.
    pub fn undo(&self) -> bool {
        info!("[session] Undo requested, history not implemented");
        false
    }

    pub fn redo(&self) -> bool {
        info!("[session] Redo requested, history not implemented");
        false
    }

    // ---- selection intents ----

    pub fn set_active_cell(&self, id: Option<CellId>) -> Result<(), SessionError> {
        if let Some(id) = id {
            if self.inner.cells.lock().unwrap().get(id).is_none() {
                return Err(SessionError::CellNotFound(id));
            }
        }
        self.inner.selection.lock().unwrap().active_cell_id = id;
        self.emit(SessionEvent::SelectionChanged);
        Ok(())
    }

    pub fn toggle_command_palette(&self) -> bool {
        let open = {
            let mut selection = self.inner.selection.lock().unwrap();
            selection.command_palette_open = !selection.command_palette_open;
            selection.command_palette_open
        };
        self.emit(SessionEvent::SelectionChanged);
        open
    }

    pub fn toggle_ai_assistant(&self) -> bool {
        let open = {
            let mut selection = self.inner.selection.lock().unwrap();
            selection.ai_assistant_open = !selection.ai_assistant_open;
            selection.ai_assistant_open
        };
        self.emit(SessionEvent::SelectionChanged);
        open
    }

    pub fn set_search_term(&self, term: impl Into<String>) {
        self.inner.selection.lock().unwrap().global_search_term = term.into();
        self.emit(SessionEvent::SelectionChanged);
    }

    pub fn set_sidebar_panel(&self, panel: SidebarPanel) {
        self.inner.selection.lock().unwrap().active_sidebar_panel = panel;
        self.emit(SessionEvent::SelectionChanged);
    }

    // ---- metadata ----

    pub fn set_metadata(&self, metadata: NotebookMetadata) {
        *self.inner.metadata.lock().unwrap() = metadata;
        self.notify(NotificationKind::Info, "Notebook metadata updated");
        self.emit(SessionEvent::MetadataChanged);
    }

    pub fn patch_metadata(&self, patch: NotebookMetadataPatch) {
        patch.apply(&mut self.inner.metadata.lock().unwrap());
        self.notify(NotificationKind::Info, "Notebook metadata updated");
        self.emit(SessionEvent::MetadataChanged);
    }

    // ---- queries ----

    pub fn notebook_id(&self) -> String {
        self.inner.notebook_id.lock().unwrap().clone()
    }

    pub fn cells(&self) -> Vec<Cell> {
        self.inner.cells.lock().unwrap().all()
    }

    pub fn cell(&self, id: CellId) -> Option<Cell> {
        self.inner.cells.lock().unwrap().get(id).cloned()
    }

    pub fn selection(&self) -> SelectionState {
        self.inner.selection.lock().unwrap().clone()
    }

    pub fn metadata(&self) -> NotebookMetadata {
        self.inner.metadata.lock().unwrap().clone()
    }

    pub fn snapshot(&self) -> NotebookSnapshot {
        NotebookSnapshot {
            notebook_id: self.notebook_id(),
            metadata: self.metadata(),
            cells: self.cells(),
        }
    }

    pub fn latest_notification(&self) -> Option<Notification> {
        self.inner.notifications.latest()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.notifications.all()
    }

    pub fn mark_notification_read(&self, id: Uuid) -> bool {
        self.inner.notifications.mark_read(id)
    }

    pub fn mark_all_notifications_read(&self) {
        self.inner.notifications.mark_all_read()
    }

    fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        self.inner.notifications.push(kind, message, Some("session"));
    }

    fn emit(&self, event: SessionEvent) {
        // Send only fails with no subscribers, which is fine.
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellOutput;
    use async_trait::async_trait;

    struct EchoBackend;

    #[async_trait]
    impl ExecutionBackend for EchoBackend {
        async fn run(&self, cell: &Cell) -> anyhow::Result<Vec<CellOutput>> {
            if cell.content == Value::String("boom".into()) {
                anyhow::bail!("kaboom");
            }
            Ok(vec![CellOutput::Stream {
                text: "echo".into(),
            }])
        }
    }

    fn session() -> SessionCoordinator {
        SessionCoordinator::new(Arc::new(EchoBackend), Arc::new(InMemoryStore::new()))
    }

    fn add_code(session: &SessionCoordinator, content: &str) -> CellId {
        session
            .add_cell(CellType::Code, Value::String(content.into()), None, None)
            .unwrap()
    }

    // ==================== Cell Operations ====================

    #[tokio::test]
    async fn test_add_cell_becomes_active() {
        let session = session();
        let id = add_code(&session, "x = 1");

        assert_eq!(session.selection().active_cell_id, Some(id));
        assert_eq!(session.cells().len(), 1);
    }

    #[tokio::test]
    async fn test_add_cell_emits_notification() {
        let session = session();
        add_code(&session, "x = 1");

        let latest = session.latest_notification().unwrap();
        assert_eq!(latest.kind, NotificationKind::Info);
        assert_eq!(latest.message, "Added code cell");
    }

    #[tokio::test]
    async fn test_add_cell_bad_index_fails_without_side_effects() {
        let session = session();
        let err = session
            .add_cell(CellType::Code, Value::Null, Some(3), None)
            .unwrap_err();

        assert_eq!(err, SessionError::IndexOutOfRange { index: 3, len: 0 });
        assert!(session.cells().is_empty());
        assert!(session.selection().active_cell_id.is_none());
        assert!(session.latest_notification().is_none());
    }

    #[tokio::test]
    async fn test_delete_active_cell_clears_selection() {
        let session = session();
        let id = add_code(&session, "x = 1");

        session.delete_cell(id).unwrap();

        assert!(session.selection().active_cell_id.is_none());
        assert!(session.cells().is_empty());
    }

    #[tokio::test]
    async fn test_delete_other_cell_keeps_selection() {
        let session = session();
        let first = add_code(&session, "a");
        let second = add_code(&session, "b");

        session.delete_cell(first).unwrap();

        assert_eq!(session.selection().active_cell_id, Some(second));
    }

    #[tokio::test]
    async fn test_update_cell_merges_content() {
        let session = session();
        let id = add_code(&session, "old");

        session
            .update_cell(
                id,
                CellUpdate {
                    content: Some(Value::String("new".into())),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(session.cell(id).unwrap().content, Value::String("new".into()));
    }

    #[tokio::test]
    async fn test_move_cell_reorders() {
        let session = session();
        let a = add_code(&session, "a");
        let b = add_code(&session, "b");

        session.move_cell(1, 0).unwrap();

        let order: Vec<CellId> = session.cells().iter().map(|c| c.id).collect();
        assert_eq!(order, vec![b, a]);
    }

    // ==================== Execution ====================

    #[tokio::test]
    async fn test_execute_markdown_is_structural_error() {
        let session = session();
        let id = session
            .add_cell(CellType::Markdown, Value::String("# hi".into()), None, None)
            .unwrap();

        assert_eq!(
            session.execute_cell(id).unwrap_err(),
            SessionError::NotRunnable(CellType::Markdown)
        );
    }

    #[tokio::test]
    async fn test_execute_cell_success_path() {
        let session = session();
        let id = add_code(&session, "x = 1");

        let handle = session.execute_cell(id).unwrap();
        assert_eq!(session.cell(id).unwrap().status, CellStatus::Running);
        handle.wait().await;

        let cell = session.cell(id).unwrap();
        assert_eq!(cell.status, CellStatus::Success);
        assert_eq!(cell.execution_count, 1);
    }

    #[tokio::test]
    async fn test_execute_failure_never_throws_from_facade() {
        let session = session();
        let id = add_code(&session, "boom");

        let handle = session.execute_cell(id).expect("dispatch must succeed");
        handle.wait().await;

        let cell = session.cell(id).unwrap();
        assert_eq!(cell.status, CellStatus::Error);
        let latest = session.latest_notification().unwrap();
        assert_eq!(latest.kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn test_run_all_cells_dispatch_count() {
        let session = session();
        session
            .add_cell(CellType::Markdown, Value::String("# doc".into()), None, None)
            .unwrap();
        add_code(&session, "a");
        add_code(&session, "b");

        let handles = session.run_all_cells();
        assert_eq!(handles.len(), 2);
        for handle in handles {
            handle.wait().await;
        }
    }

    // ==================== Persistence ====================

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let store = Arc::new(InMemoryStore::new());
        let session = SessionCoordinator::new(Arc::new(EchoBackend), store.clone());
        let id = add_code(&session, "x = 1");
        let notebook_id = session.notebook_id();

        session.save_notebook().await.unwrap();

        let other = SessionCoordinator::new(Arc::new(EchoBackend), store);
        other.load_notebook(&notebook_id).await.unwrap();

        assert_eq!(other.notebook_id(), notebook_id);
        assert_eq!(other.cells().len(), 1);
        assert_eq!(other.cells()[0].id, id);
    }

    #[tokio::test]
    async fn test_load_resets_selection_state() {
        let store = Arc::new(InMemoryStore::new());
        let session = SessionCoordinator::new(Arc::new(EchoBackend), store);
        add_code(&session, "x = 1");
        session.save_notebook().await.unwrap();
        let notebook_id = session.notebook_id();

        session.toggle_command_palette();
        session.set_search_term("plots");
        session.set_sidebar_panel(SidebarPanel::Files);

        session.load_notebook(&notebook_id).await.unwrap();

        assert_eq!(session.selection(), SelectionState::default());
    }

    #[tokio::test]
    async fn test_load_missing_notebook_is_persistence_error() {
        let session = session();
        let err = session.load_notebook("ghost").await.unwrap_err();

        assert!(matches!(err, SessionError::Persistence(_)));
        let latest = session.latest_notification().unwrap();
        assert_eq!(latest.kind, NotificationKind::Error);
    }

    // ==================== Selection & Metadata ====================

    #[tokio::test]
    async fn test_set_active_cell_validates_existence() {
        let session = session();
        let ghost = CellId::new();
        assert_eq!(
            session.set_active_cell(Some(ghost)).unwrap_err(),
            SessionError::CellNotFound(ghost)
        );

        let id = add_code(&session, "x");
        session.set_active_cell(Some(id)).unwrap();
        session.set_active_cell(None).unwrap();
        assert!(session.selection().active_cell_id.is_none());
    }

    #[tokio::test]
    async fn test_palette_and_assistant_toggles() {
        let session = session();
        assert!(session.toggle_command_palette());
        assert!(!session.toggle_command_palette());
        assert!(session.toggle_ai_assistant());
        assert!(session.selection().ai_assistant_open);
    }

    #[tokio::test]
    async fn test_patch_metadata() {
        let session = session();
        session.patch_metadata(NotebookMetadataPatch {
            title: Some("Quarterly report".into()),
            ..Default::default()
        });

        assert_eq!(session.metadata().title, "Quarterly report");
    }

    #[tokio::test]
    async fn test_undo_redo_are_noops() {
        let session = session();
        add_code(&session, "x");
        assert!(!session.undo());
        assert!(!session.redo());
        assert_eq!(session.cells().len(), 1);
    }

    // ==================== Events ====================

    #[tokio::test]
    async fn test_subscribe_receives_cell_changes() {
        let session = session();
        let mut events = session.subscribe();

        add_code(&session, "x");

        let event = events.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::CellsChanged));
    }

    #[tokio::test]
    async fn test_execution_emits_status_events() {
        let session = session();
        let id = add_code(&session, "x");
        let mut events = session.subscribe();

        session.execute_cell(id).unwrap().wait().await;

        let mut statuses = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::CellStatusChanged { status, .. } = event {
                statuses.push(status);
            }
        }
        assert_eq!(statuses, vec![CellStatus::Running, CellStatus::Success]);
    }
}
