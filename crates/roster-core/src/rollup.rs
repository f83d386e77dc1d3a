use std::collections::{HashMap, HashSet};
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::model::Position;
use crate::tree::TreeNode;

/// Subtree totals for one node, self included.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Rollup {
    pub total_salary: u64,
    pub total_fte: usize,
    pub total_positions: usize,
    pub vacant_count: usize,
}

impl Rollup {
    /// The contribution of a single position.
    #[must_use]
    pub fn own(position: &Position) -> Self {
        let vacant = position.is_vacant();
        Self {
            total_salary: position.salary_or_zero(),
            total_fte: usize::from(!vacant),
            total_positions: 1,
            vacant_count: usize::from(vacant),
        }
    }
}

impl AddAssign for Rollup {
    fn add_assign(&mut self, rhs: Self) {
        self.total_salary = self.total_salary.saturating_add(rhs.total_salary);
        self.total_fte += rhs.total_fte;
        self.total_positions += rhs.total_positions;
        self.vacant_count += rhs.vacant_count;
    }
}

/// Rollups keyed by position identifier, kept apart from the tree so a rebuilt
/// tree can never observe stale totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollupIndex<'a> {
    by_id: HashMap<&'a str, Rollup>,
    roots: Vec<&'a str>,
    revisits: usize,
}

impl<'a> RollupIndex<'a> {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Rollup> {
        self.by_id.get(id).copied()
    }

    /// Sum over every counted root.
    #[must_use]
    pub fn total(&self) -> Rollup {
        let mut total = Rollup::default();
        for root in &self.roots {
            if let Some(rollup) = self.by_id.get(root) {
                total += *rollup;
            }
        }
        total
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Nodes skipped because their identifier had already been counted.
    #[must_use]
    pub fn revisits(&self) -> usize {
        self.revisits
    }
}

struct Frame<'t, 'a> {
    node: &'t TreeNode<'a>,
    next_child: usize,
    acc: Rollup,
}

/// Rollups for `root` and every node below it.
#[must_use]
pub fn compute_rollups<'a>(root: &TreeNode<'a>) -> RollupIndex<'a> {
    rollup_forest(std::slice::from_ref(root))
}

/// Post-order rollup over a whole forest.
///
/// Traversal uses an explicit stack. An identifier seen a second time
/// contributes nothing, so every position is counted at most once and the walk
/// terminates on any input. Each call starts from an empty index.
#[must_use]
pub fn rollup_forest<'a>(roots: &[TreeNode<'a>]) -> RollupIndex<'a> {
    let mut index = RollupIndex::default();
    let mut visited: HashSet<&'a str> = HashSet::new();

    for root in roots {
        if !visited.insert(root.id()) {
            index.revisits += 1;
            continue;
        }
        index.roots.push(root.id());

        let mut stack = vec![Frame { node: root, next_child: 0, acc: Rollup::own(root.position) }];
        while let Some(frame) = stack.last_mut() {
            let node = frame.node;
            if let Some(child) = node.children.get(frame.next_child) {
                frame.next_child += 1;
                if !visited.insert(child.id()) {
                    index.revisits += 1;
                    continue;
                }
                stack.push(Frame { node: child, next_child: 0, acc: Rollup::own(child.position) });
                continue;
            }

            let Some(done) = stack.pop() else {
                break;
            };
            index.by_id.insert(done.node.id(), done.acc);
            if let Some(parent) = stack.last_mut() {
                parent.acc += done.acc;
            }
        }
    }

    if index.revisits > 0 {
        tracing::debug!(revisits = index.revisits, "rollup skipped repeated position ids");
    }
    index
}
