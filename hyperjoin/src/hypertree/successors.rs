/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::{Hypertree, NodeId, TreeBuilder};
use crate::hypergraph::{intersect, is_subset, vertices_of, Filter};
use std::collections::VecDeque;

/// Where the removed edge goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    /// A new leaf covering only the edge
    NewNode,
    /// Merged into the cover of this child
    PushInto(NodeId),
}

#[derive(Debug, Clone)]
struct Edit {
    target: NodeId,
    edge: usize,
    placement: Move,
}

/// Lazy sequence of the trees one local move away from a hypertree.
///
/// For every node with more than one cover edge (pre-order) and every edge `e`
/// of its cover (cover order), `e` is removed from the node and either put in
/// a new leaf below it or pushed into one of its children. Each item is an
/// independent arena. Calling [`Hypertree::successors`] again restarts the
/// sequence.
#[derive(Debug, Clone)]
pub struct Successors<'a> {
    tree: &'a Hypertree,
    order: Vec<NodeId>,
    next_node: usize,
    pending: VecDeque<Edit>,
}

impl<'a> Successors<'a> {
    pub(super) fn new(tree: &'a Hypertree) -> Self {
        Successors {
            tree,
            order: tree.dfs_pre(),
            next_node: 0,
            pending: VecDeque::new(),
        }
    }

    /// Queues every admissible edit of one node
    fn expand(&mut self, id: NodeId) {
        let node = self.tree.node(id);
        if node.cover.len() < 2 {
            return;
        }
        let parent_conn = match node.parent {
            Some(p) => intersect(&self.tree.node(p).bag, &node.bag),
            None => Vec::new(),
        };

        for (i, e) in node.cover.iter().enumerate() {
            let lambda_min = vertices_of(node.cover.iter().filter(|c| c.name != e.name));
            // later edges of this cover are not tried either
            if !is_subset(&parent_conn, &lambda_min) {
                break;
            }

            let vetoes: Vec<NodeId> = node
                .children
                .iter()
                .copied()
                .filter(|&c| !is_subset(&intersect(&node.bag, &self.tree.node(c).bag), &lambda_min))
                .collect();

            let edit = |placement| Edit {
                target: id,
                edge: i,
                placement,
            };
            match vetoes.as_slice() {
                [] => {
                    self.pending.push_back(edit(Move::NewNode));
                    for &c in &node.children {
                        self.pending.push_back(edit(Move::PushInto(c)));
                    }
                }
                [only] => self.pending.push_back(edit(Move::PushInto(*only))),
                _ => {}
            }
        }
    }

    fn apply(&self, edit: &Edit) -> Option<Hypertree> {
        let mut builder = TreeBuilder::new();
        self.copy(edit, self.tree.root(), None, &mut builder);

        let mut result = builder.build();
        if place_filters(&mut result, self.tree) {
            Some(result)
        } else {
            log::trace!("Skipping successor: a filter fits in no bag");
            None
        }
    }

    /// Copies the subtree at `old` under `parent`, applying `edit` on the way
    fn copy(&self, edit: &Edit, old: NodeId, parent: Option<NodeId>, builder: &mut TreeBuilder) {
        let node = self.tree.node(old);
        let moved = &self.tree.node(edit.target).cover[edit.edge];

        let mut cover = node.cover.clone();
        if old == edit.target {
            cover.retain(|c| c.name != moved.name);
        } else if edit.placement == Move::PushInto(old) && !cover.iter().any(|c| c.name == moved.name) {
            cover.push(moved.clone());
        }

        let id = builder.add_node(parent, cover, Vec::new());
        for &child in &node.children {
            self.copy(edit, child, Some(id), builder);
        }
        if old == edit.target && edit.placement == Move::NewNode {
            builder.add_node(Some(id), vec![moved.clone()], Vec::new());
        }
    }
}

/// Attaches every filter of `source` to the first pre-order node of `tree`
/// whose bag holds all of the filter's vertices
fn place_filters(tree: &mut Hypertree, source: &Hypertree) -> bool {
    let filters: Vec<Filter> = source
        .dfs_pre()
        .into_iter()
        .flat_map(|id| source.node(id).filters.iter().cloned())
        .collect();

    let order = tree.dfs_pre();
    for filter in filters {
        let vertices = filter.sorted_vertices();
        match order
            .iter()
            .find(|&&id| is_subset(&vertices, &tree.node(id).bag))
        {
            Some(&id) => tree.nodes[id].filters.push(filter),
            None => return false,
        }
    }
    true
}

impl<'a> Iterator for Successors<'a> {
    type Item = Hypertree;

    fn next(&mut self) -> Option<Hypertree> {
        loop {
            while let Some(edit) = self.pending.pop_front() {
                if let Some(tree) = self.apply(&edit) {
                    return Some(tree);
                }
            }
            let id = *self.order.get(self.next_node)?;
            self.next_node += 1;
            self.expand(id);
        }
    }
}
