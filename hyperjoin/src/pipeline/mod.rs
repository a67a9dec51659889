/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Tree-shaped dataflow evaluation of a decomposition.
//!
//! Every hypertree node gets a producer thread, which materializes the join
//! of the node's cover, and a stage thread, which joins that relation with
//! the solutions streamed up by the child stages. An aggregator collects the
//! producers' completion signals so that an empty node short-circuits the
//! whole query. All threads watch one shared `done` channel; dropping the
//! [`SolutionStream`] closes it and joins them.

mod producer;
mod stage;

pub use producer::{Completion, LocalMessage};
pub use stage::PartialSolution;

use crate::config::Config;
use crate::error::{HyperjoinError, Result};
use crate::hypergraph::Hypergraph;
use crate::hypertree::{Hypertree, NodeId};
use crate::solution::Solution;
use crossbeam::channel::{bounded, select, Receiver, Select, Sender};
use log::{debug, error, info};
use producer::{NodeFilter, Producer};
use shared::table::Database;
use stage::{ChildLink, Stage};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Sends `value` unless the pipeline is cancelled first. Returns false when
/// the value was not delivered.
pub(crate) fn send_or_cancel<T>(tx: &Sender<T>, value: T, done: &Receiver<()>) -> bool {
    select! {
        send(tx, value) -> res => res.is_ok(),
        recv(done) -> _ => false,
    }
}

/// What a node's threads need, resolved to names before anything is spawned
struct NodePlan {
    id: NodeId,
    relations: Vec<String>,
    filters: Vec<NodeFilter>,
    children: Vec<(NodeId, Vec<String>)>,
}

#[derive(Debug, Clone, Default)]
pub struct Solver {
    config: Config,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Solver { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn plan(&self, hg: &Hypergraph, tree: &Hypertree, db: &Database) -> Result<Vec<NodePlan>> {
        tree.validate(hg)?;

        let mut plans = Vec::with_capacity(tree.len());
        for id in tree.dfs_pre() {
            let node = tree.node(id);
            if node.cover.is_empty() {
                return Err(HyperjoinError::InvalidDecomposition(format!(
                    "node {} has an empty cover",
                    id
                )));
            }

            let mut relations = Vec::with_capacity(node.cover.len());
            for edge in &node.cover {
                let name = hg.edge_name(edge.name)?;
                let table = db.table(name)?;
                let expected = hg.vertex_names(&edge.vertices)?;
                let mut found = table.attributes().to_vec();
                let mut wanted = expected.clone();
                found.sort();
                wanted.sort();
                if found != wanted {
                    return Err(HyperjoinError::SchemaMismatch {
                        relation: name.to_string(),
                        expected,
                        found: table.attributes().to_vec(),
                    });
                }
                relations.push(name.to_string());
            }

            let mut filters = Vec::with_capacity(node.filters.len());
            for filter in &node.filters {
                if filter.vertices.iter().any(|v| node.bag.binary_search(v).is_err()) {
                    return Err(HyperjoinError::InvalidDecomposition(format!(
                        "filter over {} is outside the bag of node {}",
                        hg.vertex_names(&filter.vertices)?.join(", "),
                        id
                    )));
                }
                filters.push(NodeFilter {
                    vars: hg.vertex_names(&filter.vertices)?,
                    condition: filter.condition.clone(),
                });
            }

            let mut children = Vec::with_capacity(node.children.len());
            for &child in &node.children {
                children.push((child, hg.vertex_names(&tree.separator(child))?));
            }

            plans.push(NodePlan {
                id,
                relations,
                filters,
                children,
            });
        }
        Ok(plans)
    }

    /// Starts the pipeline for `tree` over `db`.
    ///
    /// Missing relations, schema mismatches and malformed trees are reported
    /// here, before any thread exists.
    pub fn solve(&self, hg: &Hypergraph, tree: &Hypertree, db: Arc<Database>) -> Result<SolutionStream> {
        self.config.validate()?;
        let plans = self.plan(hg, tree, &db)?;
        let capacity = self.config.channel_capacity;

        let (done_tx, done_rx) = bounded::<()>(0);
        let mut handles = Vec::with_capacity(2 * plans.len() + 1);
        let mut completions = Vec::with_capacity(plans.len());
        let mut outputs: Vec<Option<Receiver<Solution>>> = (0..tree.len()).map(|_| None).collect();

        // children before parents, so their output receivers exist
        for plan in plans.into_iter().rev() {
            let (completion_tx, completion_rx) = bounded(capacity);
            let (local_tx, local_rx) = bounded(capacity);
            let (output_tx, output_rx) = bounded(capacity);
            completions.push((plan.id, completion_rx));

            let producer = Producer {
                node: plan.id,
                relations: plan.relations,
                filters: plan.filters,
                db: Arc::clone(&db),
                completion: completion_tx,
                local: local_tx,
                done: done_rx.clone(),
            };
            handles.push(
                thread::Builder::new()
                    .name(format!("producer-{}", plan.id))
                    .spawn(move || producer.run())?,
            );

            let mut children = Vec::with_capacity(plan.children.len());
            for (child, separator) in plan.children {
                let input = outputs[child].take().ok_or_else(|| {
                    HyperjoinError::InvalidDecomposition(format!("node {} has two parents", child))
                })?;
                children.push(ChildLink {
                    node: child,
                    separator,
                    input,
                });
            }
            let stage = Stage {
                node: plan.id,
                local: local_rx,
                children,
                output: output_tx,
                done: done_rx.clone(),
            };
            handles.push(
                thread::Builder::new()
                    .name(format!("stage-{}", plan.id))
                    .spawn(move || stage.run())?,
            );
            outputs[plan.id] = Some(output_rx);
        }

        let output = outputs[tree.root()].take().ok_or_else(|| {
            HyperjoinError::InvalidDecomposition("the root has no stage".to_string())
        })?;

        let (aggregate_tx, aggregate_rx) = bounded(1);
        let done = done_rx.clone();
        handles.push(
            thread::Builder::new()
                .name("aggregator".to_string())
                .spawn(move || aggregate(completions, aggregate_tx, done))?,
        );

        info!("Started pipeline with {} threads", handles.len());
        Ok(SolutionStream {
            aggregate: aggregate_rx,
            output,
            state: StreamState::Waiting,
            done: Some(done_tx),
            handles,
        })
    }
}

/// Evaluates `tree` over `db` with the default configuration
pub fn solve(hg: &Hypergraph, tree: &Hypertree, db: Arc<Database>) -> Result<SolutionStream> {
    Solver::new().solve(hg, tree, db)
}

/// Fans in every producer's completion into one signal
fn aggregate(
    mut pending: Vec<(NodeId, Receiver<Completion>)>,
    result: Sender<Completion>,
    done: Receiver<()>,
) {
    while !pending.is_empty() {
        let (index, received) = {
            let mut sel = Select::new();
            sel.recv(&done);
            for (_, rx) in &pending {
                sel.recv(rx);
            }

            let oper = sel.select();
            let index = oper.index();
            if index == 0 {
                let _ = oper.recv(&done);
                return;
            }
            (index, oper.recv(&pending[index - 1].1))
        };

        let (node, _) = pending.swap_remove(index - 1);
        match received {
            Ok(Completion::Empty) => {
                debug!("Node {} has no local tuples", node);
                send_or_cancel(&result, Completion::Empty, &done);
                return;
            }
            Ok(Completion::Ready) => {}
            Err(_) => debug!("Node {} stopped without reporting", node),
        }
    }
    send_or_cancel(&result, Completion::Ready, &done);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Waiting,
    Streaming,
    Finished,
}

/// Unordered stream of the query's solutions.
///
/// A query without answers yields exactly one [`Solution::empty_marker`].
/// Dropping the stream cancels the pipeline and waits for its threads.
#[derive(Debug)]
pub struct SolutionStream {
    aggregate: Receiver<Completion>,
    output: Receiver<Solution>,
    state: StreamState,
    done: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl SolutionStream {
    /// Stops every pipeline thread and waits for them
    pub fn cancel(&mut self) {
        self.state = StreamState::Finished;
        self.done.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("A pipeline thread panicked");
            }
        }
    }
}

impl Iterator for SolutionStream {
    type Item = Solution;

    fn next(&mut self) -> Option<Solution> {
        loop {
            match self.state {
                StreamState::Waiting => match self.aggregate.recv() {
                    Ok(Completion::Empty) => {
                        self.state = StreamState::Finished;
                        return Some(Solution::empty_marker());
                    }
                    Ok(Completion::Ready) => self.state = StreamState::Streaming,
                    Err(_) => self.state = StreamState::Finished,
                },
                StreamState::Streaming => match self.output.recv() {
                    Ok(solution) => return Some(solution),
                    Err(_) => self.state = StreamState::Finished,
                },
                StreamState::Finished => return None,
            }
        }
    }
}

impl Drop for SolutionStream {
    fn drop(&mut self) {
        self.cancel();
    }
}
