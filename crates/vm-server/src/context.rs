//! Shared application context.
//!
//! [`AppContext`] is the struct shared across all route handlers via Axum
//! state and handed to the scheduler. Everything in it is behind an `Arc`,
//! so cloning is cheap.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use vm_core::config::Config;
use vm_core::events::{EventBus, TaskKind};
use vm_core::Catalog;

/// Central application state passed to every handler.
#[derive(Clone)]
pub struct AppContext {
    /// Catalog the engine reads and writes.
    pub catalog: Arc<dyn Catalog>,
    pub config: Arc<Config>,
    pub event_bus: Arc<EventBus>,
    /// One lock per batch operation.
    pub task_locks: Arc<TaskLocks>,
    /// Tripped on shutdown; running batches stop starting new groups.
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(catalog: Arc<dyn Catalog>, config: Config, shutdown: CancellationToken) -> Self {
        Self {
            catalog,
            config: Arc::new(config),
            event_bus: Arc::new(EventBus::default()),
            task_locks: Arc::new(TaskLocks::default()),
            shutdown,
        }
    }
}

/// Serializes runs of the same batch operation.
///
/// A second request for an operation that is already running waits for the
/// first to finish instead of racing it over the same groups.
#[derive(Debug, Default)]
pub struct TaskLocks {
    merge_movies: Mutex<()>,
    split_movies: Mutex<()>,
    merge_episodes: Mutex<()>,
    split_episodes: Mutex<()>,
}

impl TaskLocks {
    fn lock_for(&self, task: TaskKind) -> &Mutex<()> {
        match task {
            TaskKind::MergeMovies => &self.merge_movies,
            TaskKind::SplitMovies => &self.split_movies,
            TaskKind::MergeEpisodes => &self.merge_episodes,
            TaskKind::SplitEpisodes => &self.split_episodes,
        }
    }

    /// Wait until `task` is free and hold it for the guard's lifetime.
    pub async fn acquire(&self, task: TaskKind) -> MutexGuard<'_, ()> {
        let lock = self.lock_for(task);
        if let Ok(guard) = lock.try_lock() {
            return guard;
        }
        tracing::info!(task = %task, "Operation already running, waiting");
        lock.lock().await
    }

    /// True if `task` is currently running.
    pub fn is_running(&self, task: TaskKind) -> bool {
        self.lock_for(task).try_lock().is_err()
    }
}
