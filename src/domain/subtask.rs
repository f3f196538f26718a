use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Default planned duration of a new subtask, in minutes
pub const DEFAULT_SUBTASK_MINUTES: i32 = 15;

/// A node in a task's subtask tree
///
/// A node with children is a composite; its completion flag is derived from
/// the children by the propagation engine. Nodes without children are leaves,
/// the unit of work a focus session times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    /// Planned duration in minutes
    #[serde(default = "default_duration")]
    pub duration: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub children: Vec<Subtask>,
}

fn default_duration() -> i32 {
    DEFAULT_SUBTASK_MINUTES
}

impl Subtask {
    pub fn new(title: impl Into<String>, duration: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            completed: false,
            duration,
            link: None,
            comment: None,
            children: Vec::new(),
        }
    }

    /// Builder-style helper for attaching children
    pub fn with_children(mut self, children: Vec<Subtask>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Error returned when a path string like "0-1-2" cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("subtask path is empty")]
    Empty,
    #[error("invalid path segment '{0}' (expected a non-negative index)")]
    InvalidSegment(String),
}

/// Location of a node in a subtask tree as a list of child indices
///
/// `path[0]` indexes the task's top-level subtasks, `path[1]` that node's
/// children, and so on. Paths go stale as soon as the tree is edited, so they
/// are recomputed for every lookup and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SubtaskPath(Vec<usize>);

impl SubtaskPath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the immediate parent, None for top-level nodes
    pub fn parent(&self) -> Option<SubtaskPath> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Strict ancestors from the immediate parent up to the top level
    pub fn ancestors(&self) -> Vec<SubtaskPath> {
        (1..self.0.len())
            .rev()
            .map(|depth| Self(self.0[..depth].to_vec()))
            .collect()
    }

    pub fn child(&self, index: usize) -> SubtaskPath {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

impl From<Vec<usize>> for SubtaskPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl FromStr for SubtaskPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PathParseError::Empty);
        }
        trimmed
            .split('-')
            .map(|segment| {
                segment
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| PathParseError::InvalidSegment(segment.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for SubtaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join("-"))
    }
}

/// Walk the tree along `path`; None if any index is out of range
pub fn resolve<'a>(tree: &'a [Subtask], path: &SubtaskPath) -> Option<&'a Subtask> {
    let (first, rest) = path.indices().split_first()?;
    let mut current = tree.get(*first)?;
    for index in rest {
        current = current.children.get(*index)?;
    }
    Some(current)
}

/// Copy of `tree` with `update` applied to the node at `path`
///
/// Nodes off the path are cloned unchanged; the input is never mutated. An
/// unresolvable path returns an unchanged copy.
fn update_at<F>(tree: &[Subtask], indices: &[usize], update: &F) -> Vec<Subtask>
where
    F: Fn(&Subtask) -> Subtask,
{
    let Some((first, rest)) = indices.split_first() else {
        return tree.to_vec();
    };
    tree.iter()
        .enumerate()
        .map(|(i, node)| {
            if i != *first {
                node.clone()
            } else if rest.is_empty() {
                update(node)
            } else {
                Subtask {
                    children: update_at(&node.children, rest, update),
                    ..node.clone()
                }
            }
        })
        .collect()
}

/// Replace the completion flag of the node at `path` only
pub fn set_completed(tree: &[Subtask], path: &SubtaskPath, value: bool) -> Vec<Subtask> {
    update_at(tree, path.indices(), &|node: &Subtask| Subtask {
        completed: value,
        ..node.clone()
    })
}

/// Set the flag on the node at `path` and every node below it
pub fn set_subtree_completed(tree: &[Subtask], path: &SubtaskPath, value: bool) -> Vec<Subtask> {
    update_at(tree, path.indices(), &|node: &Subtask| mark_subtree(node, value))
}

fn mark_subtree(node: &Subtask, value: bool) -> Subtask {
    Subtask {
        completed: value,
        children: node.children.iter().map(|c| mark_subtree(c, value)).collect(),
        ..node.clone()
    }
}

/// Leaves of the tree in depth-first, left-to-right order
///
/// Composite nodes contribute their descendants, never themselves.
pub fn flatten_leaves(tree: &[Subtask]) -> Vec<Subtask> {
    leaf_paths(tree).into_iter().map(|(_, leaf)| leaf).collect()
}

/// Leaves paired with their current paths, in `flatten_leaves` order
pub fn leaf_paths(tree: &[Subtask]) -> Vec<(SubtaskPath, Subtask)> {
    fn walk(nodes: &[Subtask], prefix: &SubtaskPath, out: &mut Vec<(SubtaskPath, Subtask)>) {
        for (i, node) in nodes.iter().enumerate() {
            let path = prefix.child(i);
            if node.is_leaf() {
                out.push((path, node.clone()));
            } else {
                walk(&node.children, &path, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(tree, &SubtaskPath::default(), &mut out);
    out
}

/// Current path of the node with the given id
pub fn find_path(tree: &[Subtask], id: &str) -> Option<SubtaskPath> {
    fn walk(nodes: &[Subtask], prefix: &SubtaskPath, id: &str) -> Option<SubtaskPath> {
        for (i, node) in nodes.iter().enumerate() {
            let path = prefix.child(i);
            if node.id == id {
                return Some(path);
            }
            if let Some(found) = walk(&node.children, &path, id) {
                return Some(found);
            }
        }
        None
    }

    walk(tree, &SubtaskPath::default(), id)
}

/// A node is fully complete when its own flag is set and every child is fully complete
pub fn is_fully_complete(node: &Subtask) -> bool {
    node.completed && node.children.iter().all(is_fully_complete)
}

/// True iff the tree is non-empty and every top-level node is fully complete
pub fn are_all_subtasks_complete(tree: &[Subtask]) -> bool {
    !tree.is_empty() && tree.iter().all(is_fully_complete)
}

/// Insert `node` as the last child of `parent` (or at the top level for None)
///
/// Returns None when the parent path does not resolve.
pub fn insert_subtask(
    tree: &[Subtask],
    parent: Option<&SubtaskPath>,
    node: Subtask,
) -> Option<Vec<Subtask>> {
    match parent {
        None => {
            let mut next = tree.to_vec();
            next.push(node);
            Some(next)
        }
        Some(parent) => {
            resolve(tree, parent)?;
            Some(update_at(tree, parent.indices(), &|target: &Subtask| {
                let mut children = target.children.clone();
                children.push(node.clone());
                Subtask {
                    children,
                    ..target.clone()
                }
            }))
        }
    }
}

/// Remove the node at `path`; None when the path does not resolve
pub fn remove_subtask(tree: &[Subtask], path: &SubtaskPath) -> Option<Vec<Subtask>> {
    resolve(tree, path)?;
    let (last, _) = path.indices().split_last()?;
    match path.parent() {
        None => {
            let mut next = tree.to_vec();
            next.remove(*last);
            Some(next)
        }
        Some(parent) => Some(update_at(tree, parent.indices(), &|target: &Subtask| {
            let mut children = target.children.clone();
            children.remove(*last);
            Subtask {
                children,
                ..target.clone()
            }
        })),
    }
}

/// Total planned minutes across all leaves
pub fn total_leaf_minutes(tree: &[Subtask]) -> i64 {
    flatten_leaves(tree)
        .iter()
        .map(|leaf| i64::from(leaf.duration.max(0)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leaf(title: &str, minutes: i32) -> Subtask {
        Subtask {
            id: title.to_lowercase(),
            ..Subtask::new(title, minutes)
        }
    }

    fn sample_tree() -> Vec<Subtask> {
        vec![
            leaf("X", 10),
            leaf("Y", 15).with_children(vec![leaf("Y1", 5), leaf("Y2", 5)]),
        ]
    }

    fn titles(nodes: &[Subtask]) -> Vec<&str> {
        nodes.iter().map(|n| n.title.as_str()).collect()
    }

    #[test]
    fn test_path_parse_and_display() {
        let path: SubtaskPath = "0-1-2".parse().unwrap();
        assert_eq!(path.indices(), &[0, 1, 2]);
        assert_eq!(path.to_string(), "0-1-2");

        assert_eq!("".parse::<SubtaskPath>(), Err(PathParseError::Empty));
        assert_eq!(
            "0-a".parse::<SubtaskPath>(),
            Err(PathParseError::InvalidSegment("a".to_string()))
        );
        assert!("-1".parse::<SubtaskPath>().is_err());
    }

    #[test]
    fn test_path_ancestors_bottom_up() {
        let path = SubtaskPath::new(vec![2, 0, 3]);
        assert_eq!(
            path.ancestors(),
            vec![SubtaskPath::new(vec![2, 0]), SubtaskPath::new(vec![2])]
        );
        assert_eq!(path.parent(), Some(SubtaskPath::new(vec![2, 0])));
        assert!(SubtaskPath::new(vec![1]).ancestors().is_empty());
        assert_eq!(SubtaskPath::new(vec![1]).parent(), None);
    }

    #[test]
    fn test_resolve() {
        let tree = sample_tree();
        assert_eq!(resolve(&tree, &SubtaskPath::new(vec![1, 1])).unwrap().title, "Y2");
        assert_eq!(resolve(&tree, &SubtaskPath::new(vec![1])).unwrap().title, "Y");
        assert!(resolve(&tree, &SubtaskPath::new(vec![2])).is_none());
        assert!(resolve(&tree, &SubtaskPath::new(vec![0, 0])).is_none());
        assert!(resolve(&tree, &SubtaskPath::default()).is_none());
    }

    #[test]
    fn test_set_completed_is_copy_on_write() {
        let tree = sample_tree();
        let next = set_completed(&tree, &SubtaskPath::new(vec![1, 0]), true);

        assert!(next[1].children[0].completed);
        assert!(!next[1].completed);
        assert!(!next[1].children[1].completed);
        // Original untouched
        assert!(!tree[1].children[0].completed);
        assert_eq!(next[0], tree[0]);
    }

    #[test]
    fn test_set_completed_stale_path_is_unchanged_copy() {
        let tree = sample_tree();
        let next = set_completed(&tree, &SubtaskPath::new(vec![5, 1]), true);
        assert_eq!(next, tree);
    }

    #[test]
    fn test_set_subtree_completed() {
        let tree = sample_tree();
        let next = set_subtree_completed(&tree, &SubtaskPath::new(vec![1]), true);
        assert!(next[1].completed);
        assert!(next[1].children.iter().all(|c| c.completed));
        assert!(!next[0].completed);
    }

    #[test]
    fn test_flatten_leaves_order() {
        let leaves = flatten_leaves(&sample_tree());
        assert_eq!(titles(&leaves), vec!["X", "Y1", "Y2"]);
    }

    #[test]
    fn test_flatten_leaves_deep_nesting() {
        let tree = vec![leaf("A", 5).with_children(vec![
            leaf("A1", 5).with_children(vec![leaf("A1a", 5)]),
            leaf("A2", 5),
        ])];
        let paths: Vec<String> = leaf_paths(&tree).iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["0-0-0", "0-1"]);
    }

    #[test]
    fn test_find_path_by_id() {
        let tree = sample_tree();
        assert_eq!(find_path(&tree, "y2"), Some(SubtaskPath::new(vec![1, 1])));
        assert_eq!(find_path(&tree, "x"), Some(SubtaskPath::new(vec![0])));
        assert_eq!(find_path(&tree, "missing"), None);
    }

    #[test]
    fn test_fully_complete_predicate() {
        let mut tree = sample_tree();
        tree[1].completed = true;
        // Composite flag set but a child still open
        assert!(!is_fully_complete(&tree[1]));

        tree[1].children[0].completed = true;
        tree[1].children[1].completed = true;
        assert!(is_fully_complete(&tree[1]));
        assert!(!are_all_subtasks_complete(&tree));

        tree[0].completed = true;
        assert!(are_all_subtasks_complete(&tree));
        assert!(!are_all_subtasks_complete(&[]));
    }

    #[test]
    fn test_insert_and_remove_subtask() {
        let tree = sample_tree();
        let parent = SubtaskPath::new(vec![1]);
        let grown = insert_subtask(&tree, Some(&parent), leaf("Y3", 5)).unwrap();
        assert_eq!(titles(&grown[1].children), vec!["Y1", "Y2", "Y3"]);

        let top = insert_subtask(&tree, None, leaf("Z", 5)).unwrap();
        assert_eq!(titles(&top), vec!["X", "Y", "Z"]);

        assert!(insert_subtask(&tree, Some(&SubtaskPath::new(vec![9])), leaf("Q", 5)).is_none());

        let shrunk = remove_subtask(&grown, &SubtaskPath::new(vec![1, 0])).unwrap();
        assert_eq!(titles(&shrunk[1].children), vec!["Y2", "Y3"]);
        let shrunk_top = remove_subtask(&tree, &SubtaskPath::new(vec![0])).unwrap();
        assert_eq!(titles(&shrunk_top), vec!["Y"]);
        assert!(remove_subtask(&tree, &SubtaskPath::new(vec![1, 7])).is_none());
    }

    #[test]
    fn test_total_leaf_minutes() {
        assert_eq!(total_leaf_minutes(&sample_tree()), 20);
    }

    #[test]
    fn test_subtask_deserialize_defaults() {
        let node: Subtask = serde_json::from_str(r#"{"title":"Read"}"#).unwrap();
        assert_eq!(node.duration, DEFAULT_SUBTASK_MINUTES);
        assert!(!node.completed);
        assert!(node.children.is_empty());
        assert_eq!(node.link, None);
    }
}
