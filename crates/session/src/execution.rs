//! Execution engine: drives cells through the status state machine.
//!
//! Each accepted request flips the cell to `running` synchronously, then runs
//! the backend as an independent spawned task. The completion re-enters
//! through one atomic store update. A per-cell generation counter makes
//! superseded completions detectable: when a cell is re-executed while still
//! running, the earlier task's result is dropped instead of resurrecting
//! stale outputs.

use crate::cell::{Cell, CellId, CellOutput, CellStatus, ExecutionTiming};
use crate::cell_store::CellStore;
use crate::error::SessionError;
use crate::notifications::{NotificationKind, NotificationQueue};
use crate::session::SessionEvent;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;
use tokio::sync::broadcast;

/// The kernel collaborator: whatever actually computes a cell's result.
/// Its internal protocol (process, subprocess, remote call) is not this
/// crate's concern.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn run(&self, cell: &Cell) -> anyhow::Result<Vec<CellOutput>>;
}

/// Default backend for sessions without a kernel attached; every run fails.
pub struct DetachedBackend;

#[async_trait]
impl ExecutionBackend for DetachedBackend {
    async fn run(&self, _cell: &Cell) -> anyhow::Result<Vec<CellOutput>> {
        anyhow::bail!("no kernel attached")
    }
}

/// Handle to one in-flight execution, mainly so tests and callers can await
/// the completion having been applied.
#[derive(Debug)]
pub struct ExecutionHandle {
    cell_id: CellId,
    task: tokio::task::JoinHandle<()>,
}

impl ExecutionHandle {
    pub fn cell_id(&self) -> CellId {
        self.cell_id
    }

    /// Wait until the completion (success or failure) has been applied to the
    /// cell store.
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

pub struct ExecutionEngine {
    cells: Arc<StdMutex<CellStore>>,
    backend: Arc<dyn ExecutionBackend>,
    notifications: NotificationQueue,
    events: broadcast::Sender<SessionEvent>,
    generations: Arc<StdMutex<HashMap<CellId, u64>>>,
}

impl ExecutionEngine {
    pub fn new(
        cells: Arc<StdMutex<CellStore>>,
        backend: Arc<dyn ExecutionBackend>,
        notifications: NotificationQueue,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            cells,
            backend,
            notifications,
            events,
            generations: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Dispatch one cell. Structural failures (missing cell, non-runnable
    /// type) return synchronously and leave the cell untouched; backend
    /// failures are absorbed into cell state and a notification.
    pub fn execute(&self, cell_id: CellId) -> Result<ExecutionHandle, SessionError> {
        let cell = {
            let store = self.cells.lock().unwrap();
            store
                .get(cell_id)
                .cloned()
                .ok_or(SessionError::CellNotFound(cell_id))?
        };
        if !cell.cell_type.is_runnable() {
            return Err(SessionError::NotRunnable(cell.cell_type));
        }

        // Supersede any in-flight run of the same cell.
        let generation = {
            let mut generations = self.generations.lock().unwrap();
            let entry = generations.entry(cell_id).or_insert(0);
            *entry += 1;
            *entry
        };

        // Synchronous transition: the caller observes `running` immediately.
        {
            let mut store = self.cells.lock().unwrap();
            store.set_status(cell_id, CellStatus::Running)?;
        }
        let _ = self.events.send(SessionEvent::CellStatusChanged {
            cell_id,
            status: CellStatus::Running,
        });
        self.notifications.push(
            NotificationKind::Info,
            format!("Running {} cell", cell.cell_type),
            Some("execution"),
        );
        info!("[exec] Dispatching cell {} (gen {})", cell_id, generation);

        let started_at = Utc::now();
        let clock = Instant::now();
        let backend = self.backend.clone();
        let cells = self.cells.clone();
        let notifications = self.notifications.clone();
        let events = self.events.clone();
        let generations = self.generations.clone();

        let task = tokio::spawn(async move {
            let result = backend.run(&cell).await;
            let timing = ExecutionTiming {
                started_at,
                finished_at: Utc::now(),
                duration_ms: clock.elapsed().as_millis() as u64,
            };

            let current = generations
                .lock()
                .unwrap()
                .get(&cell_id)
                .copied()
                .unwrap_or(0);
            if current != generation {
                warn!(
                    "[exec] Dropping stale completion for cell {} (gen {}, current {})",
                    cell_id, generation, current
                );
                return;
            }

            let applied = {
                let mut store = cells.lock().unwrap();
                match result {
                    Ok(outputs) => store
                        .finish_success(cell_id, outputs, timing)
                        .map(|_| CellStatus::Success),
                    Err(e) => {
                        error!("[exec] Cell {} failed: {}", cell_id, e);
                        store
                            .finish_error(cell_id, e.to_string(), timing)
                            .map(|_| CellStatus::Error)
                    }
                }
            };

            match applied {
                Ok(CellStatus::Success) => {
                    notifications.push(
                        NotificationKind::Success,
                        "Cell executed".to_string(),
                        Some("execution"),
                    );
                    let _ = events.send(SessionEvent::CellStatusChanged {
                        cell_id,
                        status: CellStatus::Success,
                    });
                }
                Ok(_) => {
                    notifications.push(
                        NotificationKind::Error,
                        "Cell execution failed".to_string(),
                        Some("execution"),
                    );
                    let _ = events.send(SessionEvent::CellStatusChanged {
                        cell_id,
                        status: CellStatus::Error,
                    });
                }
                Err(_) => {
                    // Cell was deleted while running; nothing to update.
                    debug!("[exec] Cell {} gone at completion, skipping", cell_id);
                }
            }
        });

        Ok(ExecutionHandle { cell_id, task })
    }

    /// Dispatch every runnable cell in document order. Executions are
    /// independent; one failure neither cancels nor blocks the rest, and only
    /// dispatch order is guaranteed, not completion order.
    pub fn run_all(&self) -> Vec<ExecutionHandle> {
        let runnable: Vec<CellId> = {
            let store = self.cells.lock().unwrap();
            store
                .all()
                .iter()
                .filter(|c| c.cell_type.is_runnable())
                .map(|c| c.id)
                .collect()
        };

        info!("[exec] Run all: {} runnable cells", runnable.len());
        let mut handles = Vec::with_capacity(runnable.len());
        for cell_id in runnable {
            match self.execute(cell_id) {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!("[exec] Skipping cell {} in run-all: {}", cell_id, e),
            }
        }
        handles
    }
}
