/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::error::{HyperjoinError, Result};
use shared::dictionary::Dictionary;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

pub type Vertex = u32;
pub type EdgeId = u32;

/// A named hyperedge. Vertex order is the attribute order of the relation
/// the edge stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub name: EdgeId,
    pub vertices: Vec<Vertex>,
}

impl Edge {
    pub fn new(name: EdgeId, vertices: Vec<Vertex>) -> Self {
        Edge { name, vertices }
    }
}

/// Sorted, deduplicated union of the vertices of `edges`
pub fn vertices_of<'a, I>(edges: I) -> Vec<Vertex>
where
    I: IntoIterator<Item = &'a Edge>,
{
    let mut vertices: Vec<Vertex> = edges
        .into_iter()
        .flat_map(|e| e.vertices.iter().copied())
        .collect();
    vertices.sort_unstable();
    vertices.dedup();
    vertices
}

/// Whether every element of `sub` is in the sorted slice `sup`
pub fn is_subset(sub: &[Vertex], sup: &[Vertex]) -> bool {
    sub.iter().all(|v| sup.binary_search(v).is_ok())
}

/// Intersection of two sorted slices
pub fn intersect(a: &[Vertex], b: &[Vertex]) -> Vec<Vertex> {
    a.iter().copied().filter(|v| b.binary_search(v).is_ok()).collect()
}

/// Predicate over the values bound to a filter's vertices, in filter order
#[derive(Clone)]
pub struct Condition(Arc<dyn Fn(&[&str]) -> bool + Send + Sync>);

impl Condition {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[&str]) -> bool + Send + Sync + 'static,
    {
        Condition(Arc::new(f))
    }

    pub fn call(&self, values: &[&str]) -> bool {
        (self.0)(values)
    }
}

impl Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Condition(<function>)")
    }
}

/// A selection applied at the first node whose bag holds all its vertices
#[derive(Debug, Clone)]
pub struct Filter {
    pub vertices: Vec<Vertex>,
    pub condition: Condition,
    pub selectivity: Option<f64>,
}

impl Filter {
    pub fn new(vertices: Vec<Vertex>, condition: Condition) -> Self {
        Filter {
            vertices,
            condition,
            selectivity: None,
        }
    }

    pub fn with_selectivity(mut self, selectivity: f64) -> Self {
        self.selectivity = Some(selectivity);
        self
    }

    /// Vertices in sorted order, for bag containment tests
    pub fn sorted_vertices(&self) -> Vec<Vertex> {
        let mut vertices = self.vertices.clone();
        vertices.sort_unstable();
        vertices.dedup();
        vertices
    }
}

/// The query hypergraph: one edge per relation occurrence, one vertex per
/// variable. Vertex and edge names share one dictionary.
#[derive(Debug, Clone)]
pub struct Hypergraph {
    edges: Vec<Edge>,
    vertices: Vec<Vertex>,
    filters: Vec<Filter>,
    output: Vec<Vertex>,
    dictionary: Dictionary,
}

impl Hypergraph {
    pub fn new(edges: Vec<Edge>, dictionary: Dictionary) -> Self {
        let vertices = vertices_of(&edges);
        Hypergraph {
            edges,
            vertices,
            filters: Vec::new(),
            output: Vec::new(),
            dictionary,
        }
    }

    /// Builds a hypergraph from `(relation, variables)` pairs
    pub fn from_edges<S: AsRef<str>>(edges: &[(S, &[S])]) -> Result<Self> {
        let mut dictionary = Dictionary::new();
        let mut encoded = Vec::with_capacity(edges.len());
        for (name, vars) in edges {
            let name = name.as_ref();
            if encoded.iter().any(|e: &Edge| dictionary.decode(e.name) == Some(name)) {
                return Err(HyperjoinError::Parse(format!(
                    "edge '{}' is declared more than once",
                    name
                )));
            }
            let id = dictionary.encode(name);
            let mut vertices = Vec::with_capacity(vars.len());
            for var in vars.iter() {
                let v = dictionary.encode(var.as_ref());
                if vertices.contains(&v) {
                    return Err(HyperjoinError::Parse(format!(
                        "vertex '{}' is repeated in edge '{}'",
                        var.as_ref(),
                        name
                    )));
                }
                vertices.push(v);
            }
            encoded.push(Edge::new(id, vertices));
        }
        Ok(Hypergraph::new(encoded, dictionary))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn output(&self) -> &[Vertex] {
        &self.output
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn edge(&self, name: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.name == name)
    }

    pub fn edge_name(&self, name: EdgeId) -> Result<&str> {
        self.dictionary
            .decode(name)
            .ok_or(HyperjoinError::UnknownEdge(name))
    }

    pub fn vertex_name(&self, v: Vertex) -> Result<&str> {
        self.dictionary
            .decode(v)
            .ok_or_else(|| HyperjoinError::UnknownVertex(v.to_string()))
    }

    /// Id of a vertex of this hypergraph
    pub fn vertex_id(&self, name: &str) -> Result<Vertex> {
        self.dictionary
            .lookup(name)
            .filter(|v| self.vertices.binary_search(v).is_ok())
            .ok_or_else(|| HyperjoinError::UnknownVertex(name.to_string()))
    }

    pub fn vertex_names(&self, vertices: &[Vertex]) -> Result<Vec<String>> {
        vertices
            .iter()
            .map(|&v| self.vertex_name(v).map(str::to_string))
            .collect()
    }

    /// Marks the variables that must appear in the root bag of a decomposition
    pub fn with_output<S: AsRef<str>>(mut self, vars: &[S]) -> Result<Self> {
        let mut output = vars
            .iter()
            .map(|v| self.vertex_id(v.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        output.sort_unstable();
        output.dedup();
        self.output = output;
        Ok(self)
    }

    pub fn add_filter(&mut self, filter: Filter) -> Result<()> {
        if let Some(v) = filter
            .vertices
            .iter()
            .find(|v| self.vertices.binary_search(v).is_err())
        {
            return Err(HyperjoinError::UnknownVertex(v.to_string()));
        }
        self.filters.push(filter);
        Ok(())
    }

    /// Adds a filter over the named variables
    pub fn filter_on<S, F>(mut self, vars: &[S], condition: F) -> Result<Self>
    where
        S: AsRef<str>,
        F: Fn(&[&str]) -> bool + Send + Sync + 'static,
    {
        let vertices = vars
            .iter()
            .map(|v| self.vertex_id(v.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.add_filter(Filter::new(vertices, Condition::new(condition)))?;
        Ok(self)
    }

    /// `R(x,y), S(y,z).` rendering of a set of edges
    pub fn format_edges<'a, I>(&self, edges: I) -> String
    where
        I: IntoIterator<Item = &'a Edge>,
    {
        let decode = |id: u32| self.dictionary.decode(id).unwrap_or("?");
        edges
            .into_iter()
            .map(|e| {
                let vars: Vec<&str> = e.vertices.iter().map(|&v| decode(v)).collect();
                format!("{}({})", decode(e.name), vars.join(","))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Display for Hypergraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.", self.format_edges(&self.edges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_helpers() {
        assert!(is_subset(&[1, 3], &[1, 2, 3]));
        assert!(!is_subset(&[4], &[1, 2, 3]));
        assert!(is_subset(&[], &[]));
        assert_eq!(intersect(&[1, 2, 5], &[2, 3, 5]), vec![2, 5]);
        let edges = vec![Edge::new(0, vec![3, 1]), Edge::new(1, vec![1, 2])];
        assert_eq!(vertices_of(&edges), vec![1, 2, 3]);
    }

    #[test]
    fn test_from_edges() {
        let hg = Hypergraph::from_edges(&[("R", &["x", "y"][..]), ("S", &["y", "z"][..])]).unwrap();
        assert_eq!(hg.edges().len(), 2);
        assert_eq!(hg.vertices().len(), 3);
        assert_eq!(hg.edge_name(hg.edges()[1].name).unwrap(), "S");
        assert_eq!(hg.to_string(), "R(x,y), S(y,z).");
    }

    #[test]
    fn test_rejects_repeated_names() {
        assert!(Hypergraph::from_edges(&[("R", &["x", "x"][..])]).is_err());
        assert!(Hypergraph::from_edges(&[("R", &["x"][..]), ("R", &["y"][..])]).is_err());
    }

    #[test]
    fn test_output_and_filters_need_known_vertices() {
        let hg = Hypergraph::from_edges(&[("R", &["x", "y"][..])]).unwrap();
        assert!(hg.clone().with_output(&["x"]).is_ok());
        assert!(matches!(
            hg.clone().with_output(&["R"]),
            Err(HyperjoinError::UnknownVertex(_))
        ));
        let filtered = hg.filter_on(&["y", "x"], |vals| vals[0] != vals[1]).unwrap();
        assert_eq!(filtered.filters().len(), 1);
        assert!(filtered.filters()[0].condition.call(&["a", "b"]));
    }
}
