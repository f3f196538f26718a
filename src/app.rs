use crate::domain::propagation;
use crate::domain::{CompletionRecord, Priority, Subtask, SubtaskPath, Task, TimeBlock};
use crate::persistence::{config_file, load_config, save_config, AppConfig, TaskStore};
use crate::repository::{LocalRepository, RepositoryError, TaskRepository};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Field changes for creating or editing a task; None leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub block: Option<TimeBlock>,
    pub priority: Option<Priority>,
    pub hours: Option<i32>,
    pub minutes: Option<i32>,
    /// An empty string clears the notes
    pub notes: Option<String>,
}

impl TaskEdit {
    fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.trim().to_string();
        }
        if let Some(block) = self.block {
            task.block = block;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(hours) = self.hours {
            task.hours = hours.max(0);
        }
        if let Some(minutes) = self.minutes {
            task.minutes = minutes.max(0);
        }
        if let Some(notes) = &self.notes {
            let notes = notes.trim();
            task.notes = if notes.is_empty() {
                None
            } else {
                Some(notes.to_string())
            };
        }
    }
}

/// Task operations for one user over the local repository
pub struct App {
    repo: Arc<LocalRepository>,
    config: AppConfig,
    data_dir: Option<PathBuf>,
}

impl App {
    pub fn new(repo: Arc<LocalRepository>, config: AppConfig) -> Self {
        Self {
            repo,
            config,
            data_dir: None,
        }
    }

    /// Load config and tasks from a data directory
    pub fn open(dir: &Path) -> Result<Self> {
        let config = load_config(config_file(dir))?;
        let repo = LocalRepository::open(TaskStore::new(dir))
            .with_context(|| format!("Failed to open task store in {}", dir.display()))?;
        Ok(Self {
            repo: Arc::new(repo),
            config,
            data_dir: Some(dir.to_path_buf()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    /// Shared repository handle for the focus session
    pub fn repository(&self) -> Arc<dyn TaskRepository> {
        self.repo.clone()
    }

    /// Replace the config and write it back when backed by a data directory
    pub fn update_config(&mut self, config: AppConfig) -> Result<()> {
        if let Some(dir) = &self.data_dir {
            save_config(config_file(dir), &config)?;
        }
        self.config = config;
        Ok(())
    }

    /// The user's tasks, newest first
    pub fn tasks(&self) -> Vec<Task> {
        self.repo.tasks_for(self.user_id())
    }

    pub fn filter_tasks(&self, block: Option<TimeBlock>, priority: Option<Priority>) -> Vec<Task> {
        self.tasks()
            .into_iter()
            .filter(|task| block.map_or(true, |b| task.block == b))
            .filter(|task| priority.map_or(true, |p| task.priority == p))
            .collect()
    }

    /// Look a task up by full id or unique id prefix
    pub fn find_task(&self, id_or_prefix: &str) -> Result<Task> {
        let needle = id_or_prefix.trim();
        if needle.is_empty() {
            bail!("Task id is empty");
        }

        let tasks = self.tasks();
        if let Some(task) = tasks.iter().find(|task| task.id == needle) {
            return Ok(task.clone());
        }

        let mut matches = tasks.into_iter().filter(|task| task.id.starts_with(needle));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task),
            (Some(_), Some(_)) => bail!("Task id prefix '{}' is ambiguous", needle),
            (None, _) => bail!("No task matches '{}'", needle),
        }
    }

    pub fn add_task(&self, title: &str, edit: &TaskEdit) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            bail!("Task title cannot be empty");
        }

        let mut task = Task::new(self.user_id(), title);
        edit.apply_to(&mut task);
        self.repo.upsert_task(task.clone())?;
        info!(task_id = %task.id, "task added");
        Ok(task)
    }

    /// In-place edit; id, subtasks, completion and created_at are kept
    pub fn update_task(&self, id_or_prefix: &str, edit: &TaskEdit) -> Result<Task> {
        let mut task = self.find_task(id_or_prefix)?;
        edit.apply_to(&mut task);
        if task.title.is_empty() {
            bail!("Task title cannot be empty");
        }
        task.updated_at = Utc::now();
        self.repo.upsert_task(task.clone())?;
        Ok(task)
    }

    pub fn delete_task(&self, id_or_prefix: &str) -> Result<Task> {
        let task = self.find_task(id_or_prefix)?;
        self.repo.delete_task(&task.id)?;
        info!(task_id = %task.id, completed = task.completed, "task deleted");
        Ok(task)
    }

    /// Toggle the subtask at `path` and persist the propagated tree
    ///
    /// Never fails: a missing task yields None, a stale path leaves the task
    /// untouched, and a failed write is logged while the in-memory state keeps
    /// the toggle.
    pub fn toggle_subtask(&self, task_id: &str, path: &SubtaskPath) -> Option<Task> {
        let Some(task) = self.repo.get_task(task_id) else {
            debug!(task_id, "toggle on unknown task");
            return None;
        };

        let toggled = propagation::toggle(&task, path);
        if toggled == task {
            debug!(task_id, path = %path, "stale subtask path, nothing to toggle");
            return Some(task);
        }

        match self.commit(&task, toggled) {
            Ok(saved) => Some(saved),
            Err(err) => {
                warn!(task_id, error = %err, "failed to save subtask toggle");
                self.repo.get_task(task_id)
            }
        }
    }

    /// Task-level completion toggle
    pub fn toggle_task_complete(&self, id_or_prefix: &str) -> Result<Task> {
        let task = self.find_task(id_or_prefix)?;
        let toggled = propagation::toggle_task(&task);
        Ok(self.commit(&task, toggled)?)
    }

    pub fn add_subtask(
        &self,
        id_or_prefix: &str,
        parent: Option<&SubtaskPath>,
        title: &str,
        duration: i32,
    ) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            bail!("Subtask title cannot be empty");
        }

        let task = self.find_task(id_or_prefix)?;
        let node = Subtask::new(title, duration.max(0));
        let Some(updated) = propagation::add_subtask(&task, parent, node) else {
            bail!(
                "No subtask at {} in task {}",
                parent.map(|p| p.to_string()).unwrap_or_default(),
                task.id
            );
        };
        Ok(self.commit(&task, updated)?)
    }

    pub fn remove_subtask(&self, id_or_prefix: &str, path: &SubtaskPath) -> Result<Task> {
        let task = self.find_task(id_or_prefix)?;
        let Some(updated) = propagation::remove_subtask_at(&task, path) else {
            bail!("No subtask at {} in task {}", path, task.id);
        };
        Ok(self.commit(&task, updated)?)
    }

    /// Completed tasks that were deleted, most recent first
    pub fn history(&self) -> Result<Vec<CompletionRecord>> {
        self.repo.history(self.user_id())
    }

    /// Stamp timestamps on a changed task and write it
    fn commit(&self, before: &Task, mut after: Task) -> Result<Task, RepositoryError> {
        if &after == before {
            return Ok(after);
        }
        debug_assert!(after.is_consistent());
        let now = Utc::now();
        after.stamp_completion(before.completed, now);
        after.updated_at = now;
        self.repo.upsert_task(after.clone())?;
        Ok(after)
    }
}
