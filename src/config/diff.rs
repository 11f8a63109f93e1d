//! Changesets between two configuration trees.
//!
//! A [`ConfigDiff`] records which settings were added, removed or
//! modified between a base tree and an overlay tree. Optional
//! configuration files are represented as deltas against a main tree:
//! an overlay cannot delete a base setting, so
//! [`ConfigDiff::get_as_opt_config`] renders removals as user-ignored
//! settings instead.

use std::collections::BTreeMap;

use crate::config::node::{Node, NodeState};

/// Path of a setting inside a tree, as owned segments.
pub type KeyPath = Vec<String>;

/// Snapshot of one node's content: value (options only), state, comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    /// The leaf value; `None` for sections.
    pub value: Option<String>,
    /// The node's ignore state.
    pub state: NodeState,
    /// The node's comment lines.
    pub comments: Vec<String>,
}

impl DiffEntry {
    fn of(node: &Node) -> Self {
        Self {
            value: node.value().map(ToString::to_string),
            state: node.state,
            comments: node.comments.clone(),
        }
    }

    fn to_node(&self) -> Node {
        let mut node = match &self.value {
            Some(value) => Node::leaf(value.clone()),
            None => Node::section(),
        };
        node.state = self.state;
        node.comments = self.comments.clone();
        node
    }
}

/// An added/removed/modified changeset between two trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    added: BTreeMap<KeyPath, DiffEntry>,
    removed: BTreeMap<KeyPath, DiffEntry>,
    modified: BTreeMap<KeyPath, (DiffEntry, DiffEntry)>,
}

impl ConfigDiff {
    /// An empty changeset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the changeset turning `base` into `overlay`.
    ///
    /// Keys present only in `overlay` are added; only in `base` are
    /// removed; present in both with a different (value, state,
    /// comments) triple are modified.
    #[must_use]
    pub fn set_from_configs(base: &Node, overlay: &Node) -> Self {
        let mut diff = Self::new();
        let base_entries: BTreeMap<KeyPath, DiffEntry> = base
            .walk()
            .into_iter()
            .map(|(path, node)| (path, DiffEntry::of(node)))
            .collect();
        let overlay_entries: BTreeMap<KeyPath, DiffEntry> = overlay
            .walk()
            .into_iter()
            .map(|(path, node)| (path, DiffEntry::of(node)))
            .collect();

        for (path, entry) in &overlay_entries {
            match base_entries.get(path) {
                None => {
                    diff.added.insert(path.clone(), entry.clone());
                }
                Some(before) if before != entry => {
                    diff.modified
                        .insert(path.clone(), (before.clone(), entry.clone()));
                }
                Some(_) => {}
            }
        }
        for (path, entry) in base_entries {
            if !overlay_entries.contains_key(&path) {
                diff.removed.insert(path, entry);
            }
        }
        diff
    }

    /// The changeset with added/removed swapped and each modified pair
    /// reversed.
    #[must_use]
    pub fn get_reversed(&self) -> Self {
        Self {
            added: self.removed.clone(),
            removed: self.added.clone(),
            modified: self
                .modified
                .iter()
                .map(|(path, (old, new))| {
                    (path.clone(), (new.clone(), old.clone()))
                })
                .collect(),
        }
    }

    /// Render the changeset as an overlay tree.
    ///
    /// Added and modified settings carry their new content; removed
    /// settings are present but user-ignored, since an overlay can only
    /// suppress a base setting, never delete it.
    #[must_use]
    pub fn get_as_opt_config(&self) -> Node {
        let mut root = Node::section();
        for (path, entry) in &self.added {
            set_path(&mut root, path, entry.to_node());
        }
        for (path, (_, new)) in &self.modified {
            set_path(&mut root, path, new.to_node());
        }
        for (path, entry) in &self.removed {
            let node = entry.to_node().with_state(NodeState::UserIgnored);
            set_path(&mut root, path, node);
        }
        root
    }

    /// Apply the changeset to `tree`: additions and modifications are
    /// written in, removals are taken out.
    pub fn apply_to(&self, tree: &mut Node) {
        for (path, entry) in &self.added {
            set_path(tree, path, entry.to_node());
        }
        for (path, (_, new)) in &self.modified {
            set_path(tree, path, new.to_node());
        }
        for (path, _) in self.removed.iter().rev() {
            let segments: Vec<&str> =
                path.iter().map(String::as_str).collect();
            tree.remove(&segments);
        }
    }

    /// Added settings, in path order.
    #[must_use]
    pub const fn added(&self) -> &BTreeMap<KeyPath, DiffEntry> {
        &self.added
    }

    /// Removed settings, in path order.
    #[must_use]
    pub const fn removed(&self) -> &BTreeMap<KeyPath, DiffEntry> {
        &self.removed
    }

    /// Modified settings as (before, after) pairs, in path order.
    #[must_use]
    pub const fn modified(
        &self,
    ) -> &BTreeMap<KeyPath, (DiffEntry, DiffEntry)> {
        &self.modified
    }

    /// Whether the changeset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
    }
}

fn set_path(tree: &mut Node, path: &[String], node: Node) {
    let segments: Vec<&str> = path.iter().map(String::as_str).collect();
    // A section entry may arrive after its options were already created
    // by `set`; merge state/comments rather than clobbering children.
    if node.value().is_none()
        && let Some(existing) = tree.get_mut(&segments)
    {
        existing.state = node.state;
        existing.comments = node.comments;
        return;
    }
    tree.set(&segments, node);
}
