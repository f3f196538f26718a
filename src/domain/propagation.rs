use super::subtask::{
    are_all_subtasks_complete, insert_subtask, is_fully_complete, remove_subtask, resolve,
    set_completed, set_subtree_completed, Subtask, SubtaskPath,
};
use super::task::Task;

/// Flip the completion of the node at `path` and propagate
///
/// Returns a new task; the snapshot passed in is never modified. A stale
/// path (one that no longer resolves) returns the task unchanged.
pub fn toggle(task: &Task, path: &SubtaskPath) -> Task {
    let Some(target) = resolve(&task.subtasks, path) else {
        return task.clone();
    };
    let new_state = !target.completed;
    apply(task, path, new_state)
}

/// Set the node at `path` to `state` and run the cascades
///
/// Order matters: the direct write comes first, then the downward cascade
/// (completing) or the ancestor invalidation (uncompleting), then the
/// bottom-up ancestor scan, and the task flag last.
pub fn apply(task: &Task, path: &SubtaskPath, state: bool) -> Task {
    if resolve(&task.subtasks, path).is_none() {
        return task.clone();
    }

    let mut tree = set_completed(&task.subtasks, path, state);

    if state {
        tree = set_subtree_completed(&tree, path, true);
        tree = complete_eligible_ancestors(&tree, path);
    } else {
        tree = invalidate_ancestors(&tree, path);
    }

    with_derived_completion(task, tree)
}

/// Uncomplete every strict ancestor of `path`
fn invalidate_ancestors(tree: &[Subtask], path: &SubtaskPath) -> Vec<Subtask> {
    path.ancestors()
        .iter()
        .fold(tree.to_vec(), |acc, ancestor| set_completed(&acc, ancestor, false))
}

/// Walk ancestors bottom-up, completing each whose children are all fully complete
///
/// A grandparent is only checked after its parent may have just been completed.
fn complete_eligible_ancestors(tree: &[Subtask], path: &SubtaskPath) -> Vec<Subtask> {
    let mut tree = tree.to_vec();
    for ancestor in path.ancestors() {
        let eligible = resolve(&tree, &ancestor)
            .map(|node| node.children.iter().all(is_fully_complete))
            .unwrap_or(false);
        if eligible {
            tree = set_completed(&tree, &ancestor, true);
        }
    }
    tree
}

fn with_derived_completion(task: &Task, subtasks: Vec<Subtask>) -> Task {
    let completed = are_all_subtasks_complete(&subtasks);
    Task {
        subtasks,
        completed,
        ..task.clone()
    }
}

/// Drive the whole task to completion
///
/// Every top-level node that is not yet fully complete gets the downward
/// cascade. A task without subtasks is completed directly. Never flips an
/// already completed task back.
pub fn complete_all(task: &Task) -> Task {
    if task.subtasks.is_empty() {
        return Task {
            completed: true,
            ..task.clone()
        };
    }

    let tree = (0..task.subtasks.len()).fold(task.subtasks.clone(), |acc, i| {
        if is_fully_complete(&acc[i]) {
            acc
        } else {
            set_subtree_completed(&acc, &SubtaskPath::new(vec![i]), true)
        }
    });
    with_derived_completion(task, tree)
}

/// Task-level toggle from the task list
///
/// Without subtasks the flag is user-controlled and simply flips. With
/// subtasks the tree follows, so the flag stays derived.
pub fn toggle_task(task: &Task) -> Task {
    if task.subtasks.is_empty() {
        return Task {
            completed: !task.completed,
            ..task.clone()
        };
    }

    if task.completed {
        let tree = (0..task.subtasks.len()).fold(task.subtasks.clone(), |acc, i| {
            set_subtree_completed(&acc, &SubtaskPath::new(vec![i]), false)
        });
        with_derived_completion(task, tree)
    } else {
        complete_all(task)
    }
}

/// Attach a new node under `parent` (top level for None)
///
/// An incomplete node invalidates its new ancestors the same way uncompleting
/// a descendant does. Returns None when the parent path is stale.
pub fn add_subtask(task: &Task, parent: Option<&SubtaskPath>, node: Subtask) -> Option<Task> {
    let incomplete = !is_fully_complete(&node);
    let mut tree = insert_subtask(&task.subtasks, parent, node)?;

    if incomplete {
        if let Some(parent) = parent {
            tree = set_completed(&tree, parent, false);
            tree = invalidate_ancestors(&tree, parent);
        }
    }
    Some(with_derived_completion(task, tree))
}

/// Detach the node at `path`; None when the path is stale
///
/// Removing the last subtask hands the flag back to the user unchanged.
pub fn remove_subtask_at(task: &Task, path: &SubtaskPath) -> Option<Task> {
    let tree = remove_subtask(&task.subtasks, path)?;
    if tree.is_empty() {
        return Some(Task {
            subtasks: tree,
            ..task.clone()
        });
    }
    Some(with_derived_completion(task, tree))
}
