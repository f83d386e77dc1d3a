use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::rollup::{Rollup, RollupIndex};
use crate::tree::{forest_preorder, TreeNode};

/// Collapsed and selected node identifiers for an interactive tree.
///
/// Keyed by identifier rather than node, so state survives rebuilding the
/// forest from the same roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ViewState {
    collapsed: BTreeSet<String>,
    selected: Option<String>,
}

impl ViewState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the collapsed state of `id`.
    pub fn toggle(&mut self, id: &str) {
        if !self.collapsed.remove(id) {
            self.collapsed.insert(id.to_string());
        }
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }

    /// Replace the collapsed set with `ids`.
    pub fn collapse_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collapsed = ids.into_iter().map(Into::into).collect();
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id.map(str::to_string);
    }

    #[must_use]
    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn collapsed_count(&self) -> usize {
        self.collapsed.len()
    }
}

/// Identifiers of every node that has at least one child.
#[must_use]
pub fn collapsible_ids<'a>(roots: &[TreeNode<'a>]) -> Vec<&'a str> {
    forest_preorder(roots)
        .filter(|(_, node)| node.has_children())
        .map(|(_, node)| node.id())
        .collect()
}

/// One displayed line of the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleRow<'a> {
    pub depth: usize,
    pub id: &'a str,
    pub has_children: bool,
    pub collapsed: bool,
    pub selected: bool,
}

/// Flatten the forest in display order, skipping everything below a collapsed
/// node.
#[must_use]
pub fn visible_rows<'a>(roots: &[TreeNode<'a>], state: &ViewState) -> Vec<VisibleRow<'a>> {
    let mut rows = Vec::new();
    let mut stack: Vec<(usize, &TreeNode<'a>)> =
        roots.iter().rev().map(|root| (0, root)).collect();

    while let Some((depth, node)) = stack.pop() {
        let id = node.id();
        let collapsed = state.is_collapsed(id);
        rows.push(VisibleRow {
            depth,
            id,
            has_children: node.has_children(),
            collapsed,
            selected: state.selected() == Some(id),
        });
        if !collapsed {
            stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        }
    }

    rows
}

/// Rollup for the currently selected node, if any.
#[must_use]
pub fn selected_rollup(state: &ViewState, rollups: &RollupIndex<'_>) -> Option<Rollup> {
    state.selected().and_then(|id| rollups.get(id))
}
