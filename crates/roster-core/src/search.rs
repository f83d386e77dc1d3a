use crate::criteria::TextQuery;
use crate::rollup::{rollup_forest, RollupIndex};
use crate::tree::TreeNode;

/// A pruned forest together with rollups computed over the pruned shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<'a> {
    pub roots: Vec<TreeNode<'a>>,
    pub rollups: RollupIndex<'a>,
    /// Nodes whose own fields matched, as opposed to kept ancestors.
    pub direct_matches: usize,
}

struct Frame<'t, 'a> {
    node: &'t TreeNode<'a>,
    next_child: usize,
    kept: Vec<TreeNode<'a>>,
}

/// Prune `root` to the nodes matching `query` plus their ancestors.
///
/// A blank query returns the subtree unchanged. `None` means nothing under
/// `root` matched.
#[must_use]
pub fn filter_tree<'a>(root: &TreeNode<'a>, query: &str) -> Option<TreeNode<'a>> {
    let Some(query) = TextQuery::new(query) else {
        return Some(root.clone());
    };
    prune(root, &query, &mut 0)
}

/// [`filter_tree`] applied to each root, dropping roots with no match.
#[must_use]
pub fn filter_forest<'a>(roots: &[TreeNode<'a>], query: &str) -> Vec<TreeNode<'a>> {
    let Some(query) = TextQuery::new(query) else {
        return roots.to_vec();
    };
    let mut direct = 0;
    roots.iter().filter_map(|root| prune(root, &query, &mut direct)).collect()
}

/// Filter the forest and recompute rollups over what remains.
#[must_use]
pub fn search_forest<'a>(roots: &[TreeNode<'a>], query: &str) -> SearchResult<'a> {
    let Some(text) = TextQuery::new(query) else {
        let roots = roots.to_vec();
        let rollups = rollup_forest(&roots);
        return SearchResult { roots, rollups, direct_matches: 0 };
    };

    let mut direct_matches = 0;
    let pruned = roots
        .iter()
        .filter_map(|root| prune(root, &text, &mut direct_matches))
        .collect::<Vec<_>>();
    let rollups = rollup_forest(&pruned);
    tracing::debug!(
        query = text.as_str(),
        direct_matches,
        kept = rollups.len(),
        "search pruned forest"
    );
    SearchResult { roots: pruned, rollups, direct_matches }
}

// Single post-order pass: a node's keep/drop decision is made once, after all
// of its children have been decided.
fn prune<'a>(root: &TreeNode<'a>, query: &TextQuery, direct: &mut usize) -> Option<TreeNode<'a>> {
    let mut stack = vec![Frame { node: root, next_child: 0, kept: Vec::new() }];
    let mut result = None;

    while let Some(frame) = stack.last_mut() {
        let node = frame.node;
        if let Some(child) = node.children.get(frame.next_child) {
            frame.next_child += 1;
            stack.push(Frame { node: child, next_child: 0, kept: Vec::new() });
            continue;
        }

        let Some(done) = stack.pop() else {
            break;
        };
        let own_match = query.matches(done.node.position);
        if own_match {
            *direct += 1;
        }
        let kept = (own_match || !done.kept.is_empty())
            .then(|| TreeNode { position: done.node.position, children: done.kept });

        match stack.last_mut() {
            Some(parent) => parent.kept.extend(kept),
            None => result = kept,
        }
    }

    result
}
