/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Cost models for hypertree decompositions. Lower is better.

use crate::config::Config;
use crate::error::{HyperjoinError, Result};
use crate::hypergraph::{EdgeId, Hypergraph, Vertex};
use crate::hypertree::{Hypertree, Node};
use crate::stats_db::StatisticsDB;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use shared::operators::{distinct, project};
use shared::statistics::{estimate_join_size, estimate_selection_size, estimate_semijoin_size};
use shared::table::{Database, Table};
use std::fmt;
use std::str::FromStr;

pub type Cost = i64;

pub trait Evaluator {
    fn eval(&mut self, tree: &Hypertree) -> Result<Cost>;

    fn name(&self) -> &'static str;
}

fn to_cost(value: u64) -> Cost {
    Cost::try_from(value).unwrap_or(Cost::MAX)
}

/// Sum over nodes of the product of the bag vertices' sizes
fn sum_of_bag_products<F>(tree: &Hypertree, mut size: F) -> Result<Cost>
where
    F: FnMut(Vertex) -> Result<u64>,
{
    let mut cost: Cost = 0;
    for id in tree.dfs_pre() {
        let mut product: u64 = 1;
        for &v in &tree.node(id).bag {
            product = product.saturating_mul(size(v)?);
        }
        cost = cost.saturating_add(to_cost(product));
    }
    Ok(cost)
}

/// Scores a tree by minus its node count.
///
/// This rewards splitting nodes; on its own it drives the search towards one
/// node per edge.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumNodes;

impl Evaluator for NumNodes {
    fn eval(&mut self, tree: &Hypertree) -> Result<Cost> {
        Ok(-(tree.len() as Cost))
    }

    fn name(&self) -> &'static str {
        "num_nodes"
    }
}

/// Product of vertex domain sizes per bag, summed over nodes
#[derive(Debug, Clone)]
pub struct TrivialGroundEval {
    domains: FxHashMap<Vertex, u64>,
    names: FxHashMap<Vertex, String>,
}

impl TrivialGroundEval {
    pub fn new(hg: &Hypergraph, domains: FxHashMap<Vertex, u64>) -> Result<Self> {
        let names = hg
            .vertices()
            .iter()
            .map(|&v| Ok((v, hg.vertex_name(v)?.to_string())))
            .collect::<Result<_>>()?;
        Ok(TrivialGroundEval { domains, names })
    }

    /// Domain sizes given by variable name
    pub fn from_names<S: AsRef<str>>(hg: &Hypergraph, domains: &[(S, u64)]) -> Result<Self> {
        let domains = domains
            .iter()
            .map(|(name, size)| Ok((hg.vertex_id(name.as_ref())?, *size)))
            .collect::<Result<_>>()?;
        Self::new(hg, domains)
    }

    /// Takes each vertex's domain size as the largest distinct-value count of
    /// the columns it labels
    pub fn from_database(db: &Database, hg: &Hypergraph) -> Result<Self> {
        let mut domains: FxHashMap<Vertex, u64> = FxHashMap::default();
        for edge in hg.edges() {
            let Some(stats) = db.get(hg.edge_name(edge.name)?).and_then(Table::stats) else {
                continue;
            };
            for (&v, column) in edge.vertices.iter().zip(stats.columns()) {
                let size = domains.entry(v).or_insert(0);
                *size = (*size).max(column.distinct as u64);
            }
        }
        Self::new(hg, domains)
    }
}

impl Evaluator for TrivialGroundEval {
    fn eval(&mut self, tree: &Hypertree) -> Result<Cost> {
        sum_of_bag_products(tree, |v| {
            self.domains.get(&v).copied().ok_or_else(|| {
                HyperjoinError::MissingDomain(self.names.get(&v).cloned().unwrap_or_else(|| v.to_string()))
            })
        })
    }

    fn name(&self) -> &'static str {
        "trivial_ground"
    }
}

/// Like [`TrivialGroundEval`], with each variable's domain taken as the
/// distinct values of the same-named attribute across every base table
#[derive(Debug, Clone)]
pub struct NaiveGroundEval {
    sizes: FxHashMap<Vertex, u64>,
    names: FxHashMap<Vertex, String>,
}

impl NaiveGroundEval {
    pub fn new(db: &Database, hg: &Hypergraph) -> Result<Self> {
        let mut domains: FxHashMap<String, Table> = FxHashMap::default();
        for (_, table) in db.iter() {
            for attr in table.attributes() {
                let domain = match domains.remove(attr) {
                    Some(mut domain) => {
                        domain.add_tuples(project(table, attr)?.into_tuples())?;
                        distinct(&domain, &[attr])?
                    }
                    None => distinct(table, &[attr])?,
                };
                domains.insert(attr.clone(), domain);
            }
        }

        let mut sizes = FxHashMap::default();
        let mut names = FxHashMap::default();
        for &v in hg.vertices() {
            let name = hg.vertex_name(v)?;
            if let Some(domain) = domains.get(name) {
                sizes.insert(v, domain.size() as u64);
            }
            names.insert(v, name.to_string());
        }
        log::debug!("Domains for {} of {} variables", sizes.len(), names.len());
        Ok(NaiveGroundEval { sizes, names })
    }
}

impl Evaluator for NaiveGroundEval {
    fn eval(&mut self, tree: &Hypertree) -> Result<Cost> {
        sum_of_bag_products(tree, |v| {
            self.sizes.get(&v).copied().ok_or_else(|| {
                HyperjoinError::MissingDomain(self.names.get(&v).cloned().unwrap_or_else(|| v.to_string()))
            })
        })
    }

    fn name(&self) -> &'static str {
        "naive_ground"
    }
}

/// One pass up the tree: sums the estimated join size of every node's cover,
/// reduced by the node's filters.
///
/// Estimates for covers seen before are served from the [`StatisticsDB`];
/// entries touched during one evaluation are restored afterwards.
#[derive(Debug, Clone)]
pub struct StatisticsEval {
    stats: StatisticsDB,
    edge_names: FxHashMap<EdgeId, String>,
    filter_selectivity: f64,
}

impl StatisticsEval {
    pub fn new(db: &Database, hg: &Hypergraph, config: &Config) -> Result<Self> {
        let edge_names = hg
            .edges()
            .iter()
            .map(|e| Ok((e.name, hg.edge_name(e.name)?.to_string())))
            .collect::<Result<_>>()?;
        Ok(StatisticsEval {
            stats: StatisticsDB::from_database(db, hg)?,
            edge_names,
            filter_selectivity: config.filter_selectivity,
        })
    }

    pub fn statistics(&self) -> &StatisticsDB {
        &self.stats
    }

    fn missing(&self, edges: &[EdgeId]) -> HyperjoinError {
        HyperjoinError::MissingStatistics(
            edges
                .iter()
                .map(|e| self.edge_names.get(e).cloned().unwrap_or_else(|| e.to_string()))
                .collect(),
        )
    }

    /// Estimated size of the join of a node's cover, before filters
    fn eval_node(&mut self, node: &Node) -> Result<usize> {
        let cover = node.cover_ids();
        if let Some(stats) = self.stats.stats(&cover) {
            return Ok(stats.size());
        }

        let mut inputs = Vec::with_capacity(cover.len());
        for &e in &cover {
            inputs.push(self.stats.stats(&[e]).ok_or_else(|| self.missing(&[e]))?);
        }
        let (size, estimate) = estimate_join_size(&inputs);
        self.stats.put(&cover, estimate);
        Ok(size)
    }

    fn eval_node_with_filters(&mut self, node: &Node) -> Result<usize> {
        let size = self.eval_node(node)?;
        if node.filters.is_empty() {
            return Ok(size);
        }

        let cover = node.cover_ids();
        let mut stats = self
            .stats
            .stats(&cover)
            .cloned()
            .ok_or_else(|| self.missing(&cover))?;
        for filter in &node.filters {
            let selectivity = filter.selectivity.unwrap_or(self.filter_selectivity);
            stats = estimate_selection_size(&stats, selectivity).1;
        }
        Ok(stats.size())
    }

    /// Refines the parent's estimate by a semijoin with the child's.
    ///
    /// Not part of [`Evaluator::eval`]; the refined entry stays in the cache.
    pub fn eval_edge(&mut self, parent: &Node, child: &Node) -> Result<usize> {
        let parent_cover = parent.cover_ids();
        let child_cover = child.cover_ids();
        let parent_stats = self
            .stats
            .stats(&parent_cover)
            .ok_or_else(|| self.missing(&parent_cover))?;
        let child_stats = self
            .stats
            .stats(&child_cover)
            .ok_or_else(|| self.missing(&child_cover))?;

        let (size, refined) = estimate_semijoin_size(parent_stats, child_stats);
        self.stats.put(&parent_cover, refined);
        Ok(size)
    }
}

impl Evaluator for StatisticsEval {
    fn eval(&mut self, tree: &Hypertree) -> Result<Cost> {
        let mut cost: Cost = 0;
        let mut outcome = Ok(());
        for id in tree.dfs_post() {
            let node = tree.node(id);
            match self.eval_node_with_filters(node) {
                Ok(size) => cost = cost.saturating_add(to_cost(size as u64)),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
            self.stats.save(&node.cover_ids());
        }
        self.stats.restore();
        outcome.map(|_| cost)
    }

    fn name(&self) -> &'static str {
        "statistics"
    }
}

/// Cost model selection, by name in configuration and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    NumNodes,
    TrivialGround,
    NaiveGround,
    Statistics,
}

impl EvaluatorKind {
    pub const ALL: [EvaluatorKind; 4] = [
        EvaluatorKind::NumNodes,
        EvaluatorKind::TrivialGround,
        EvaluatorKind::NaiveGround,
        EvaluatorKind::Statistics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluatorKind::NumNodes => "num_nodes",
            EvaluatorKind::TrivialGround => "trivial_ground",
            EvaluatorKind::NaiveGround => "naive_ground",
            EvaluatorKind::Statistics => "statistics",
        }
    }
}

impl fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluatorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        EvaluatorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = EvaluatorKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown evaluator '{}', expected one of {}", s, known.join(", "))
            })
    }
}

/// Builds the evaluator for `kind`.
///
/// Every model except [`NumNodes`] needs data; without a database the
/// search falls back to [`NumNodes`].
pub fn evaluator_for(
    kind: EvaluatorKind,
    hg: &Hypergraph,
    db: Option<&Database>,
    config: &Config,
) -> Result<Box<dyn Evaluator>> {
    let Some(db) = db else {
        if kind != EvaluatorKind::NumNodes {
            log::warn!("No database for the {} evaluator, counting nodes instead", kind);
        }
        return Ok(Box::new(NumNodes));
    };

    Ok(match kind {
        EvaluatorKind::NumNodes => Box::new(NumNodes),
        EvaluatorKind::TrivialGround => Box::new(TrivialGroundEval::from_database(db, hg)?),
        EvaluatorKind::NaiveGround => Box::new(NaiveGroundEval::new(db, hg)?),
        EvaluatorKind::Statistics => Box::new(StatisticsEval::new(db, hg, config)?),
    })
}
