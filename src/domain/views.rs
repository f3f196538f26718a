use super::subtask::{Subtask, SubtaskPath};
use super::task::{format_minutes, Task};

/// A flattened row for printing a subtask tree
#[derive(Debug, Clone)]
pub struct FlatRow {
    /// Depth in the tree (0 = top-level subtask)
    pub depth: usize,
    /// Whether this is the last child of its parent
    pub is_last: bool,
    /// Path of the node, valid for the tree the rows were built from
    pub path: SubtaskPath,
    pub title: String,
    pub completed: bool,
    pub duration: i32,
    pub is_leaf: bool,
}

/// Flatten a subtask tree into pre-order rows (composites included)
pub fn flatten_rows(subtasks: &[Subtask]) -> Vec<FlatRow> {
    fn walk(nodes: &[Subtask], prefix: &SubtaskPath, depth: usize, rows: &mut Vec<FlatRow>) {
        let count = nodes.len();
        for (i, node) in nodes.iter().enumerate() {
            let path = prefix.child(i);
            rows.push(FlatRow {
                depth,
                is_last: i + 1 == count,
                path: path.clone(),
                title: node.title.clone(),
                completed: node.completed,
                duration: node.duration,
                is_leaf: node.is_leaf(),
            });
            walk(&node.children, &path, depth + 1, rows);
        }
    }

    let mut rows = Vec::new();
    walk(subtasks, &SubtaskPath::default(), 0, &mut rows);
    rows
}

/// Get tree connector for subtasks
pub fn tree_connector(is_last: bool) -> &'static str {
    if is_last {
        "└─"
    } else {
        "├─"
    }
}

/// Checkbox for a completion flag
pub fn checkbox(completed: bool) -> &'static str {
    if completed {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Format seconds as MM:SS (minutes may exceed 59)
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// One summary line per task for `list`
pub fn task_line(task: &Task) -> String {
    let (done, total) = task.leaf_progress();
    let progress = if total > 0 {
        format!(" ({}/{})", done, total)
    } else {
        String::new()
    };
    format!(
        "{} {} [{}|{}] {}{}  ~{}",
        checkbox(task.completed),
        short_id(&task.id),
        task.priority.to_tag(),
        task.block.to_tag(),
        task.title,
        progress,
        format_minutes(task.estimate_minutes())
    )
}

/// Full outline of a task and its subtask tree for `show`
pub fn render_task(task: &Task) -> String {
    let mut output = String::new();
    output.push_str(&format!("{} {}\n", checkbox(task.completed), task.title));
    output.push_str(&format!("  id: {}\n", task.id));
    output.push_str(&format!(
        "  block: {}  priority: {} ({})\n",
        task.block.to_tag(),
        task.priority.to_tag(),
        task.priority.label()
    ));
    output.push_str(&format!("  estimate: {}\n", format_minutes(task.estimate_minutes())));
    if let Some(completed) = task.completed_at {
        output.push_str(&format!("  completed: {}\n", completed.to_rfc3339()));
    }
    if let Some(notes) = task.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        output.push_str("  notes: |\n");
        for line in notes.lines() {
            output.push_str(&format!("    {}\n", line));
        }
    }

    let rows = flatten_rows(&task.subtasks);
    if !rows.is_empty() {
        output.push('\n');
    }
    for row in rows {
        let indent = "   ".repeat(row.depth);
        let duration = if row.is_leaf {
            format!("  {}", format_minutes(i64::from(row.duration)))
        } else {
            String::new()
        };
        output.push_str(&format!(
            "  {}{} {} {} {}{}\n",
            indent,
            tree_connector(row.is_last),
            row.path,
            checkbox(row.completed),
            row.title,
            duration
        ));
    }

    output
}

/// First 8 characters of an id, enough to pick a task from the CLI
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn create_test_task() -> Task {
        let mut task = Task::new("local", "Parent");
        task.subtasks = vec![
            Subtask::new("One", 10),
            Subtask::new("Two", 15).with_children(vec![Subtask::new("Two.a", 5)]),
        ];
        task
    }

    #[test]
    fn test_flatten_rows_includes_composites() {
        let rows = flatten_rows(&create_test_task().subtasks);
        let summary: Vec<(String, usize, bool)> = rows
            .iter()
            .map(|r| (r.path.to_string(), r.depth, r.is_last))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("0".to_string(), 0, false),
                ("1".to_string(), 0, true),
                ("1-0".to_string(), 1, true),
            ]
        );
        assert!(rows[0].is_leaf);
        assert!(!rows[1].is_leaf);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(25 * 60), "25:00");
        assert_eq!(format_clock(100 * 60 + 1), "100:01");
    }

    #[test]
    fn test_tree_connector() {
        assert_eq!(tree_connector(false), "├─");
        assert_eq!(tree_connector(true), "└─");
    }

    #[test]
    fn test_render_task_outline() {
        let output = render_task(&create_test_task());
        assert!(output.starts_with("[ ] Parent\n"));
        assert!(output.contains("├─ 0 [ ] One  10m"));
        assert!(output.contains("└─ 1 [ ] Two\n"));
        assert!(output.contains("   └─ 1-0 [ ] Two.a  5m"));
    }

    #[test]
    fn test_task_line_shows_leaf_progress() {
        let line = task_line(&create_test_task());
        assert!(line.contains("Parent (0/2)"));
        assert!(line.ends_with("~15m"));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("abcdef123456"), "abcdef12");
        assert_eq!(short_id("abc"), "abc");
    }
}
