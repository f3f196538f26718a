use crate::domain::{CompletionRecord, Task};
use crate::persistence::TaskStore;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("local store write failed: {0:#}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote unreachable: {0}")]
    Unreachable(String),
    #[error("remote rejected task {task_id}: {reason}")]
    Rejected { task_id: String, reason: String },
}

/// Storage seam used by the engine and the focus session
pub trait TaskRepository: Send + Sync {
    /// Stream of the user's tasks, re-delivered after every write
    fn observe_tasks(&self, user_id: &str) -> watch::Receiver<Vec<Task>>;

    fn get_task(&self, id: &str) -> Option<Task>;

    /// Insert or replace by id
    fn upsert_task(&self, task: Task) -> Result<(), RepositoryError>;

    /// Remove by id, returning the removed task
    fn delete_task(&self, id: &str) -> Result<Option<Task>, RepositoryError>;
}

/// Fire-and-forget push to a remote backend
pub trait RemoteSync: Send + Sync {
    fn push_task(&self, task: &Task) -> Result<(), SyncError>;
    fn delete_task(&self, task_id: &str) -> Result<(), SyncError>;
}

/// Remote that accepts everything; used when no backend is configured
#[derive(Debug, Default)]
pub struct LocalOnly;

impl RemoteSync for LocalOnly {
    fn push_task(&self, _task: &Task) -> Result<(), SyncError> {
        Ok(())
    }

    fn delete_task(&self, _task_id: &str) -> Result<(), SyncError> {
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Local-first repository
///
/// Writes land in memory first, are broadcast to observers, then saved to the
/// JSON store and finally pushed to the remote at most once. Remote failures
/// are logged and dropped; there is no retry queue.
pub struct LocalRepository {
    store: Option<TaskStore>,
    /// Serializes writers so the saved file follows memory order.
    /// Lock order: `writes`, then `tasks`, then `watchers`
    writes: Mutex<()>,
    remote: Box<dyn RemoteSync>,
    tasks: Mutex<Vec<Task>>,
    watchers: Mutex<HashMap<String, watch::Sender<Vec<Task>>>>,
}

impl LocalRepository {
    /// Repository backed by JSON files in `store`
    pub fn open(store: TaskStore) -> anyhow::Result<Self> {
        let tasks = store.load_tasks()?;
        debug!(count = tasks.len(), dir = %store.dir().display(), "loaded tasks");
        Ok(Self {
            store: Some(store),
            writes: Mutex::new(()),
            remote: Box::new(LocalOnly),
            tasks: Mutex::new(tasks),
            watchers: Mutex::new(HashMap::new()),
        })
    }

    /// Repository that keeps everything in memory
    pub fn in_memory() -> Self {
        Self {
            store: None,
            writes: Mutex::new(()),
            remote: Box::new(LocalOnly),
            tasks: Mutex::new(Vec::new()),
            watchers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_remote(mut self, remote: impl RemoteSync + 'static) -> Self {
        self.remote = Box::new(remote);
        self
    }

    /// The user's tasks, newest first
    pub fn tasks_for(&self, user_id: &str) -> Vec<Task> {
        let mut tasks: Vec<Task> = lock(&self.tasks)
            .iter()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    /// Completion history of deleted tasks, most recent first
    pub fn history(&self, user_id: &str) -> anyhow::Result<Vec<CompletionRecord>> {
        let Some(store) = &self.store else {
            return Ok(Vec::new());
        };
        let mut records: Vec<CompletionRecord> = store
            .load_history()?
            .into_iter()
            .filter(|record| record.user_id == user_id)
            .collect();
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(records)
    }

    fn notify(&self, user_id: &str) {
        let snapshot = self.tasks_for(user_id);
        if let Some(tx) = lock(&self.watchers).get(user_id) {
            tx.send_replace(snapshot);
        }
    }

    /// Save the current memory state; callers hold `writes`
    fn persist(&self) -> Result<(), RepositoryError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let snapshot = lock(&self.tasks).clone();
        store.save_tasks(&snapshot)?;
        Ok(())
    }
}

impl TaskRepository for LocalRepository {
    fn observe_tasks(&self, user_id: &str) -> watch::Receiver<Vec<Task>> {
        let mut watchers = lock(&self.watchers);
        if let Some(tx) = watchers.get(user_id) {
            return tx.subscribe();
        }
        let (tx, rx) = watch::channel(self.tasks_for(user_id));
        watchers.insert(user_id.to_string(), tx);
        rx
    }

    fn get_task(&self, id: &str) -> Option<Task> {
        lock(&self.tasks).iter().find(|task| task.id == id).cloned()
    }

    fn upsert_task(&self, task: Task) -> Result<(), RepositoryError> {
        {
            let _writes = lock(&self.writes);
            {
                let mut tasks = lock(&self.tasks);
                match tasks.iter_mut().find(|existing| existing.id == task.id) {
                    Some(existing) => *existing = task.clone(),
                    None => tasks.push(task.clone()),
                }
            }
            self.notify(&task.user_id);
            self.persist()?;
        }

        if let Err(err) = self.remote.push_task(&task) {
            warn!(task_id = %task.id, error = %err, "remote push failed, keeping local copy");
        }
        Ok(())
    }

    /// Remove a task everywhere; a completed task also lands in the history
    ///
    /// Memory, observers and the task file always agree after this returns,
    /// even when the history write fails.
    fn delete_task(&self, id: &str) -> Result<Option<Task>, RepositoryError> {
        let task = {
            let _writes = lock(&self.writes);
            let removed = {
                let mut tasks = lock(&self.tasks);
                let index = tasks.iter().position(|task| task.id == id);
                index.map(|i| tasks.remove(i))
            };
            let Some(task) = removed else {
                return Ok(None);
            };

            self.notify(&task.user_id);
            self.persist()?;

            if let (Some(store), Some(record)) = (&self.store, CompletionRecord::from_task(&task)) {
                store.record_completion(record)?;
            }
            task
        };

        if let Err(err) = self.remote.delete_task(id) {
            warn!(task_id = %id, error = %err, "remote delete failed");
        }
        Ok(Some(task))
    }
}
