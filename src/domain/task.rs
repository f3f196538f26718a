use super::enums::{Priority, TimeBlock};
use super::subtask::{are_all_subtasks_complete, flatten_leaves, total_leaf_minutes, Subtask};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A task owning one subtask tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub block: TimeBlock,
    #[serde(default)]
    pub priority: Priority,
    /// Planned duration, used by the focus timer when there are no leaves
    #[serde(default)]
    pub hours: i32,
    #[serde(default)]
    pub minutes: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Derived from the tree whenever `subtasks` is non-empty
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            block: TimeBlock::default(),
            priority: Priority::default(),
            hours: 0,
            minutes: 0,
            notes: None,
            subtasks: Vec::new(),
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Planned minutes of the task itself (hours + minutes)
    pub fn planned_minutes(&self) -> i64 {
        i64::from(self.hours.max(0)) * 60 + i64::from(self.minutes.max(0))
    }

    /// Planned minutes across leaves, or the task's own estimate without leaves
    pub fn estimate_minutes(&self) -> i64 {
        if self.subtasks.is_empty() {
            self.planned_minutes()
        } else {
            total_leaf_minutes(&self.subtasks)
        }
    }

    /// (completed leaves, total leaves)
    pub fn leaf_progress(&self) -> (usize, usize) {
        let leaves = flatten_leaves(&self.subtasks);
        let done = leaves.iter().filter(|leaf| leaf.completed).count();
        (done, leaves.len())
    }

    /// Whether the completion flag agrees with the subtask tree
    pub fn is_consistent(&self) -> bool {
        self.subtasks.is_empty() || self.completed == are_all_subtasks_complete(&self.subtasks)
    }

    /// Keep `completed_at` in step with a change of the completion flag
    pub fn stamp_completion(&mut self, was_completed: bool, now: DateTime<Utc>) {
        match (was_completed, self.completed) {
            (false, true) => self.completed_at = Some(now),
            (true, false) => self.completed_at = None,
            _ => {}
        }
    }
}

/// Entry kept when a completed task is deleted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub user_id: String,
    pub task_id: String,
    pub title: String,
    pub block: TimeBlock,
    pub priority: Priority,
    pub completed_at: DateTime<Utc>,
    /// Day of completion as YYYY-MM-DD
    pub date_key: String,
}

impl CompletionRecord {
    /// Build a record for a deleted task; None unless it was completed
    pub fn from_task(task: &Task) -> Option<Self> {
        if !task.completed {
            return None;
        }
        let completed_at = task.completed_at?;
        Some(Self {
            user_id: task.user_id.clone(),
            task_id: task.id.clone(),
            title: task.title.clone(),
            block: task.block,
            priority: task.priority,
            completed_at,
            date_key: completed_at.format("%Y-%m-%d").to_string(),
        })
    }
}

/// Format minutes as "Xh Ym" (omits 0 values)
pub fn format_minutes(total_minutes: i64) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 && minutes > 0 {
        format!("{}h {}m", hours, minutes)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_task_new_defaults() {
        let task = Task::new("local", "Write report");
        assert_eq!(task.title, "Write report");
        assert_eq!(task.block, TimeBlock::Morning);
        assert_eq!(task.priority, Priority::Iap);
        assert!(task.subtasks.is_empty());
        assert!(!task.completed);
        assert!(task.is_consistent());
    }

    #[test]
    fn test_estimate_minutes() {
        let mut task = Task::new("local", "Plan");
        task.hours = 1;
        task.minutes = 30;
        assert_eq!(task.estimate_minutes(), 90);

        task.subtasks = vec![
            Subtask::new("a", 10),
            Subtask::new("b", 5).with_children(vec![Subtask::new("b1", 20)]),
        ];
        assert_eq!(task.estimate_minutes(), 30);
        assert_eq!(task.leaf_progress(), (0, 2));
    }

    #[test]
    fn test_stamp_completion() {
        let mut task = Task::new("local", "Stamp");
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        task.completed = true;
        task.stamp_completion(false, now);
        assert_eq!(task.completed_at, Some(now));

        task.completed = false;
        task.stamp_completion(true, now);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn test_completion_record_only_for_completed() {
        let mut task = Task::new("local", "Done thing");
        assert!(CompletionRecord::from_task(&task).is_none());

        task.completed = true;
        task.completed_at = Some(Utc.with_ymd_and_hms(2026, 3, 1, 22, 15, 0).unwrap());
        let record = CompletionRecord::from_task(&task).unwrap();
        assert_eq!(record.date_key, "2026-03-01");
        assert_eq!(record.task_id, task.id);
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(90), "1h 30m");
        assert_eq!(format_minutes(120), "2h");
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(0), "0m");
    }

    #[test]
    fn test_task_json_round_trip_keeps_tree() {
        let mut task = Task::new("u1", "Nested");
        task.subtasks = vec![Subtask::new("a", 5).with_children(vec![Subtask::new("a1", 5)])];
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }
}
