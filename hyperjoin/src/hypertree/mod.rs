/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Generalized hypertree decompositions.
//!
//! A [`Hypertree`] is an arena of [`Node`]s addressed by [`NodeId`]. Trees are
//! never edited in place: every transformation builds a fresh arena, so two
//! trees never share nodes.

mod successors;

pub use successors::Successors;

use crate::error::{HyperjoinError, Result};
use crate::hypergraph::{intersect, is_subset, vertices_of, Edge, EdgeId, Filter, Hypergraph, Vertex};
use std::fmt::{self, Display};

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Node {
    /// Sorted vertex set, always the union of the cover's vertices
    pub bag: Vec<Vertex>,
    pub cover: Vec<Edge>,
    pub filters: Vec<Filter>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(cover: Vec<Edge>, filters: Vec<Filter>, parent: Option<NodeId>) -> Self {
        Node {
            bag: vertices_of(&cover),
            cover,
            filters,
            parent,
            children: Vec::new(),
        }
    }

    /// Sorted edge ids of the cover
    pub fn cover_ids(&self) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self.cover.iter().map(|e| e.name).collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Debug, Clone)]
pub struct Hypertree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Hypertree {
    /// The one-node decomposition: every edge, vertex and filter in the root
    pub fn trivial(hg: &Hypergraph) -> Self {
        let mut builder = TreeBuilder::new();
        builder.add_node(None, hg.edges().to_vec(), hg.filters().to_vec());
        builder.build()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn root_bag(&self) -> &[Vertex] {
        &self.nodes[self.root].bag
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    /// Pre-order, children in order
    pub fn dfs_pre(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut open = vec![self.root];
        while let Some(id) = open.pop() {
            order.push(id);
            open.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// Post-order: every node after all of its descendants
    pub fn dfs_post(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut open = vec![self.root];
        while let Some(id) = open.pop() {
            order.push(id);
            open.extend(self.nodes[id].children.iter());
        }
        order.reverse();
        order
    }

    pub fn successors(&self) -> Successors<'_> {
        Successors::new(self)
    }

    /// Checks edge coverage, bag/cover consistency and connectedness
    pub fn validate(&self, hg: &Hypergraph) -> Result<()> {
        let invalid = |msg: String| Err(HyperjoinError::InvalidDecomposition(msg));

        for (id, node) in self.nodes() {
            if node.bag != vertices_of(&node.cover) {
                return invalid(format!("bag of node {} differs from its cover's vertices", id));
            }
            for &child in &node.children {
                if self.nodes[child].parent != Some(id) {
                    return invalid(format!("node {} does not point back to parent {}", child, id));
                }
            }
        }
        if self.dfs_pre().len() != self.nodes.len() {
            return invalid("some nodes are unreachable from the root".to_string());
        }

        for edge in hg.edges() {
            if !self
                .nodes
                .iter()
                .any(|n| n.cover.iter().any(|e| e.name == edge.name))
            {
                return invalid(format!("edge {} is not covered", hg.edge_name(edge.name)?));
            }
        }

        for &v in hg.vertices() {
            // nodes holding v whose parent does not hold it; a connected
            // occurrence set has exactly one such top node
            let tops = self
                .nodes
                .iter()
                .filter(|n| n.bag.binary_search(&v).is_ok())
                .filter(|n| match n.parent {
                    Some(p) => self.nodes[p].bag.binary_search(&v).is_err(),
                    None => true,
                })
                .count();
            if tops > 1 {
                return invalid(format!(
                    "vertex {} does not induce a connected subtree",
                    hg.vertex_name(v)?
                ));
            }
        }
        Ok(())
    }

    /// Separator between a node and its parent
    pub fn separator(&self, id: NodeId) -> Vec<Vertex> {
        match self.nodes[id].parent {
            Some(p) => intersect(&self.nodes[id].bag, &self.nodes[p].bag),
            None => Vec::new(),
        }
    }

    /// Whether the root bag exposes every vertex of `output`
    pub fn covers_output(&self, output: &[Vertex]) -> bool {
        is_subset(output, self.root_bag())
    }

    /// Indented rendering with vertex and edge names
    pub fn render(&self, hg: &Hypergraph) -> String {
        let mut out = String::new();
        let mut open = vec![(self.root, 0usize)];
        while let Some((id, depth)) = open.pop() {
            let node = &self.nodes[id];
            let bag: Vec<&str> = node
                .bag
                .iter()
                .map(|&v| hg.dictionary().decode(v).unwrap_or("?"))
                .collect();
            out.push_str(&format!(
                "{}Bag: {{{}}}, Cover: {{{}}}\n",
                "    ".repeat(depth),
                bag.join(", "),
                hg.format_edges(&node.cover)
            ));
            open.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        out
    }

    /// GML graph with one labelled node per tree node
    pub fn to_gml(&self, hg: &Hypergraph) -> String {
        let decode = |id: u32| hg.dictionary().decode(id).unwrap_or("?");
        let mut out = String::from("graph [\n  directed 0\n");
        for id in self.dfs_pre() {
            let node = &self.nodes[id];
            let bag: Vec<&str> = node.bag.iter().map(|&v| decode(v)).collect();
            let cover: Vec<&str> = node.cover.iter().map(|e| decode(e.name)).collect();
            out.push_str(&format!(
                "  node [\n    id {}\n    label \"{{{}}} {{{}}}\"\n  ]\n",
                id,
                bag.join(", "),
                cover.join(", ")
            ));
        }
        for id in self.dfs_pre() {
            for &child in &self.nodes[id].children {
                out.push_str(&format!("  edge [\n    source {}\n    target {}\n  ]\n", id, child));
            }
        }
        out.push_str("]\n");
        out
    }
}

impl Display for Hypertree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut open = vec![(self.root, 0usize)];
        while let Some((id, depth)) = open.pop() {
            let node = &self.nodes[id];
            let cover: Vec<EdgeId> = node.cover.iter().map(|e| e.name).collect();
            writeln!(
                f,
                "{}Bag: {:?}, Cover: {:?}",
                "    ".repeat(depth),
                node.bag,
                cover
            )?;
            open.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        Ok(())
    }
}

/// Incremental arena construction. The first node added becomes the root.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node under `parent` and returns its id
    pub fn add_node(&mut self, parent: Option<NodeId>, cover: Vec<Edge>, filters: Vec<Filter>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(cover, filters, parent));
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        id
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn build(self) -> Hypertree {
        Hypertree {
            nodes: self.nodes,
            root: 0,
        }
    }
}
