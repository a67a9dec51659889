/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::send_or_cancel;
use crate::hypergraph::Condition;
use crate::hypertree::NodeId;
use crate::solution::Solution;
use crossbeam::channel::{Receiver, Sender};
use log::{debug, warn};
use shared::operators::{join_all, select};
use shared::table::{Database, Table};
use std::sync::Arc;

/// Outcome of computing one node's local relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The relation has no tuples, so the whole query has none
    Empty,
    Ready,
}

/// One tuple of a node's local relation
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMessage {
    pub tuple: Solution,
    /// Set once the producer knows how many tuples are left
    pub trust_left: bool,
    /// Tuples still to come after this one, when trusted
    pub remaining: usize,
}

impl LocalMessage {
    pub fn is_last(&self) -> bool {
        self.trust_left && self.remaining == 0
    }
}

/// A filter resolved to variable names
#[derive(Debug, Clone)]
pub(crate) struct NodeFilter {
    pub vars: Vec<String>,
    pub condition: Condition,
}

/// Computes a node's local relation and streams it to the node's stage
pub(crate) struct Producer {
    pub node: NodeId,
    pub relations: Vec<String>,
    pub filters: Vec<NodeFilter>,
    pub db: Arc<Database>,
    pub completion: Sender<Completion>,
    pub local: Sender<LocalMessage>,
    pub done: Receiver<()>,
}

impl Producer {
    fn local_relation(&self) -> Option<Table> {
        let tables: Vec<&Table> = self
            .relations
            .iter()
            .filter_map(|name| self.db.get(name))
            .collect();
        let mut relation = join_all(&tables)?;

        for filter in &self.filters {
            let positions: Option<Vec<usize>> =
                filter.vars.iter().map(|v| relation.position(v)).collect();
            let Some(positions) = positions else {
                warn!("Node {}: filter over {:?} does not fit its bag", self.node, filter.vars);
                continue;
            };
            select(&mut relation, |tuple| {
                let values: Vec<&str> = positions.iter().map(|&p| tuple[p].as_str()).collect();
                filter.condition.call(&values)
            });
        }
        Some(relation)
    }

    pub fn run(self) {
        let relation = self.local_relation();
        let size = relation.as_ref().map_or(0, Table::size);
        debug!("Node {}: local relation of {} tuples", self.node, size);

        let Some(relation) = relation.filter(|r| !r.is_empty()) else {
            send_or_cancel(&self.completion, Completion::Empty, &self.done);
            return;
        };
        if !send_or_cancel(&self.completion, Completion::Ready, &self.done) {
            return;
        }

        let attributes = relation.attributes().to_vec();
        for (i, tuple) in relation.into_tuples().into_iter().enumerate() {
            let message = LocalMessage {
                tuple: Solution::from_tuple(&attributes, &tuple),
                trust_left: true,
                remaining: size - i - 1,
            };
            if !send_or_cancel(&self.local, message, &self.done) {
                debug!("Node {}: producer cancelled", self.node);
                return;
            }
        }
    }
}
