pub mod enums;
pub mod propagation;
pub mod subtask;
pub mod task;
pub mod views;

pub use enums::{Priority, TimeBlock};
pub use subtask::{
    are_all_subtasks_complete, find_path, flatten_leaves, is_fully_complete, leaf_paths, resolve,
    set_completed, PathParseError, Subtask, SubtaskPath, DEFAULT_SUBTASK_MINUTES,
};
pub use task::{format_minutes, CompletionRecord, Task};
