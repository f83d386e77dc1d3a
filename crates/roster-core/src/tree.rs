use std::collections::{HashMap, HashSet};

use crate::model::Position;

/// A position plus the subtree it exclusively owns.
///
/// Nodes borrow their position from the roster slice the forest was built
/// from; the reports-to reference is only a join key during construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<'a> {
    pub position: &'a Position,
    pub children: Vec<TreeNode<'a>>,
}

impl<'a> TreeNode<'a> {
    #[must_use]
    pub fn leaf(position: &'a Position) -> Self {
        Self { position, children: Vec::new() }
    }

    #[must_use]
    pub fn id(&self) -> &'a str {
        &self.position.position_id
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Pre-order walk yielding `(depth, node)`, root at depth 0.
    #[must_use]
    pub fn preorder(&self) -> Preorder<'_, 'a> {
        Preorder { stack: vec![(0, self)] }
    }

    /// Number of nodes in this subtree, self included.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        self.preorder().count()
    }
}

pub struct Preorder<'t, 'a> {
    stack: Vec<(usize, &'t TreeNode<'a>)>,
}

impl<'t, 'a> Iterator for Preorder<'t, 'a> {
    type Item = (usize, &'t TreeNode<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push((depth + 1, child));
        }
        Some((depth, node))
    }
}

/// Pre-order walk over every root of a forest.
pub fn forest_preorder<'t, 'a>(
    roots: &'t [TreeNode<'a>],
) -> impl Iterator<Item = (usize, &'t TreeNode<'a>)> {
    roots.iter().flat_map(TreeNode::preorder)
}

/// The result of [`build_tree`]: ordered roots plus identifier lookups.
#[derive(Debug, Clone)]
pub struct Forest<'a> {
    pub roots: Vec<TreeNode<'a>>,
    by_id: HashMap<&'a str, &'a Position>,
    parent_of: HashMap<&'a str, &'a str>,
    cycle_breaks: Vec<&'a str>,
}

impl<'a> Forest<'a> {
    #[must_use]
    pub fn position(&self, id: &str) -> Option<&'a Position> {
        self.by_id.get(id).copied()
    }

    /// The identifier `id` is attached under, if it is not a root.
    #[must_use]
    pub fn parent(&self, id: &str) -> Option<&'a str> {
        self.parent_of.get(id).copied()
    }

    /// Ancestor identifiers of `id`, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: &str) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            // Attached parents form a forest, so the chain is bounded by the
            // number of identifiers; the check only matters for duplicate ids.
            if out.len() > self.parent_of.len() || out.contains(&parent) {
                break;
            }
            out.push(parent);
            cursor = self.parent(parent);
        }
        out
    }

    /// Identifiers promoted to roots to break reports-to cycles.
    #[must_use]
    pub fn cycle_breaks(&self) -> &[&'a str] {
        &self.cycle_breaks
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        forest_preorder(&self.roots).count()
    }
}

/// Build an owning forest from flat positions linked by `reporting_to_position_id`.
///
/// References that do not resolve inside `positions` (for example after unit
/// filtering) make the position a root. Positions caught in a reference cycle
/// are unreachable from any root after attachment; for each cycle the member
/// that comes first in input order is detached and promoted to a root, while
/// positions hanging below the cycle keep their edges. Every input position
/// appears exactly once.
#[must_use]
pub fn build_tree(positions: &[Position]) -> Forest<'_> {
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(positions.len());
    for (index, position) in positions.iter().enumerate() {
        index_of.entry(position.position_id.as_str()).or_insert(index);
    }

    let mut parent: Vec<Option<usize>> = vec![None; positions.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); positions.len()];
    let mut unresolved = 0_usize;
    for (index, position) in positions.iter().enumerate() {
        let Some(reference) = position.reporting_to_position_id.as_deref() else {
            continue;
        };
        match index_of.get(reference) {
            Some(&target) if target != index => {
                parent[index] = Some(target);
                children[target].push(index);
            }
            _ => unresolved += 1,
        }
    }

    let mut roots = (0..positions.len()).filter(|&i| parent[i].is_none()).collect::<Vec<_>>();
    let mut reached = vec![false; positions.len()];
    for &root in &roots {
        mark_reachable(root, &children, &mut reached);
    }

    let mut cycle_breaks = Vec::new();
    for index in 0..positions.len() {
        if reached[index] {
            continue;
        }
        let member = first_cycle_member(index, &parent);
        if let Some(old_parent) = parent[member].take() {
            children[old_parent].retain(|&child| child != member);
        }
        roots.push(member);
        cycle_breaks.push(positions[member].position_id.as_str());
        mark_reachable(member, &children, &mut reached);
    }
    roots.sort_unstable();

    for list in &mut children {
        list.sort_by(|&lhs, &rhs| {
            positions[rhs].classification_level.cmp(&positions[lhs].classification_level)
        });
    }

    let mut slots: Vec<Option<TreeNode<'_>>> = vec![None; positions.len()];
    for &root in &roots {
        for index in postorder(root, &children) {
            let node_children =
                children[index].iter().filter_map(|&child| slots[child].take()).collect();
            slots[index] = Some(TreeNode { position: &positions[index], children: node_children });
        }
    }

    let mut by_id = HashMap::with_capacity(positions.len());
    let mut parent_of = HashMap::new();
    for (index, position) in positions.iter().enumerate() {
        by_id.entry(position.position_id.as_str()).or_insert(position);
        if let Some(target) = parent[index] {
            parent_of
                .entry(position.position_id.as_str())
                .or_insert(positions[target].position_id.as_str());
        }
    }

    let roots = roots.into_iter().filter_map(|root| slots[root].take()).collect::<Vec<_>>();
    tracing::debug!(
        positions = positions.len(),
        roots = roots.len(),
        unresolved,
        cycle_breaks = cycle_breaks.len(),
        "built position forest"
    );
    if !cycle_breaks.is_empty() {
        tracing::debug!(?cycle_breaks, "promoted positions to roots to break reporting cycles");
    }

    Forest { roots, by_id, parent_of, cycle_breaks }
}

// `start` is unreachable from every root, so its parent chain ends in a cycle.
// Returns the cycle member that comes first in input order.
fn first_cycle_member(start: usize, parent: &[Option<usize>]) -> usize {
    let mut seen = HashSet::new();
    let mut cursor = start;
    while seen.insert(cursor) {
        match parent[cursor] {
            Some(next) => cursor = next,
            None => return cursor,
        }
    }

    let entry = cursor;
    let mut first = entry;
    while let Some(next) = parent[cursor] {
        if next == entry {
            break;
        }
        first = first.min(next);
        cursor = next;
    }
    first
}

fn mark_reachable(start: usize, children: &[Vec<usize>], reached: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(index) = stack.pop() {
        if reached[index] {
            continue;
        }
        reached[index] = true;
        stack.extend(children[index].iter().copied());
    }
}

fn postorder(root: usize, children: &[Vec<usize>]) -> Vec<usize> {
    let mut order = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((index, expanded)) = stack.pop() {
        if expanded {
            order.push(index);
            continue;
        }
        stack.push((index, true));
        for &child in children[index].iter().rev() {
            stack.push((child, false));
        }
    }
    order
}
