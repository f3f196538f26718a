use super::files::{atomic_write, ensure_dir, history_file, read_file, tasks_file};
use crate::domain::{CompletionRecord, Task};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// JSON files backing the local task repository
#[derive(Debug, Clone)]
pub struct TaskStore {
    dir: PathBuf,
}

impl TaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All stored tasks; an empty or missing file yields an empty list
    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        let path = tasks_file(&self.dir);
        let content = read_file(&path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse tasks: {}", path.display()))
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        ensure_dir(&self.dir)?;
        let json = serde_json::to_string_pretty(tasks)?;
        atomic_write(tasks_file(&self.dir), &json)
    }

    pub fn load_history(&self) -> Result<Vec<CompletionRecord>> {
        let path = history_file(&self.dir);
        let content = read_file(&path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse history: {}", path.display()))
    }

    /// Add a record, replacing any earlier one for the same task
    pub fn record_completion(&self, record: CompletionRecord) -> Result<()> {
        let mut history = self.load_history()?;
        history.retain(|r| !(r.task_id == record.task_id && r.user_id == record.user_id));
        history.push(record);
        ensure_dir(&self.dir)?;
        let json = serde_json::to_string_pretty(&history)?;
        atomic_write(history_file(&self.dir), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Subtask;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn test_missing_files_load_empty() {
        let temp_dir = tempdir().unwrap();
        let store = TaskStore::new(temp_dir.path());
        assert!(store.load_tasks().unwrap().is_empty());
        assert!(store.load_history().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_tasks() {
        let temp_dir = tempdir().unwrap();
        let store = TaskStore::new(temp_dir.path().join("data"));

        let mut task = Task::new("local", "Stored");
        task.subtasks = vec![Subtask::new("child", 5)];
        store.save_tasks(&[task.clone()]).unwrap();

        assert_eq!(store.load_tasks().unwrap(), vec![task]);
    }

    #[test]
    fn test_corrupt_tasks_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(tasks_file(temp_dir.path()), "{ nope").unwrap();
        let store = TaskStore::new(temp_dir.path());
        assert!(store.load_tasks().is_err());
    }

    #[test]
    fn test_record_completion_replaces_same_task() {
        let temp_dir = tempdir().unwrap();
        let store = TaskStore::new(temp_dir.path());

        let mut task = Task::new("local", "Finished");
        task.completed = true;
        task.completed_at = Some(Utc::now());
        let record = CompletionRecord::from_task(&task).unwrap();

        store.record_completion(record.clone()).unwrap();
        store.record_completion(record.clone()).unwrap();

        assert_eq!(store.load_history().unwrap(), vec![record]);
    }
}
