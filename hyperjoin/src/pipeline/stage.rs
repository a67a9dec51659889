/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::producer::LocalMessage;
use super::send_or_cancel;
use crate::hypertree::NodeId;
use crate::solution::Solution;
use crossbeam::channel::{Receiver, Select, Sender};
use log::{debug, trace, warn};
use rustc_hash::FxHashMap;

/// A local tuple together with the child solutions that agree with it so far
#[derive(Debug, Clone, PartialEq)]
pub struct PartialSolution {
    pub local: Solution,
    /// One match list per child, in child order
    pub matches: Vec<Vec<Solution>>,
}

impl PartialSolution {
    pub fn new(local: Solution, children: usize) -> Self {
        PartialSolution {
            local,
            matches: vec![Vec::new(); children],
        }
    }

    /// True once every child has at least one match
    pub fn is_complete(&self) -> bool {
        self.matches.iter().all(|m| !m.is_empty())
    }

    /// Records a match for `child` and returns the joined solutions that
    /// contain it. Earlier combinations are not produced again.
    pub fn add_match(&mut self, child: usize, solution: Solution) -> Vec<Solution> {
        self.matches[child].push(solution);
        if !self.is_complete() {
            return Vec::new();
        }

        let lens: Vec<usize> = self.matches.iter().map(Vec::len).collect();
        let mut index = vec![0; lens.len()];
        index[child] = lens[child] - 1;

        let mut out = Vec::new();
        loop {
            match self.combine(&index) {
                Ok(joined) => out.push(joined),
                Err(e) => trace!("Dropping inconsistent combination: {}", e),
            }

            // mixed-radix increment over every position but `child`
            let mut pos = 0;
            loop {
                if pos == lens.len() {
                    return out;
                }
                if pos != child {
                    index[pos] += 1;
                    if index[pos] < lens[pos] {
                        break;
                    }
                    index[pos] = 0;
                }
                pos += 1;
            }
        }
    }

    fn combine(&self, index: &[usize]) -> crate::error::Result<Solution> {
        let mut joined = self.local.clone();
        for (matches, &i) in self.matches.iter().zip(index) {
            joined = joined.extend(&matches[i])?;
        }
        Ok(joined)
    }
}

/// Join state of one inner node
#[derive(Debug)]
pub(crate) struct StageState {
    separators: Vec<Vec<String>>,
    partials: Vec<PartialSolution>,
    /// Per child: separator key -> partial solutions with that key
    index: Vec<FxHashMap<Vec<String>, Vec<usize>>>,
    /// Per child: messages kept for local tuples that have not arrived yet
    buffer: Option<Vec<FxHashMap<Vec<String>, Vec<Solution>>>>,
}

impl StageState {
    pub fn new(separators: Vec<Vec<String>>) -> Self {
        let children = separators.len();
        StageState {
            separators,
            partials: Vec::new(),
            index: vec![FxHashMap::default(); children],
            buffer: Some(vec![FxHashMap::default(); children]),
        }
    }

    pub fn children(&self) -> usize {
        self.separators.len()
    }

    pub fn partials(&self) -> &[PartialSolution] {
        &self.partials
    }

    /// Registers a local tuple, replaying buffered child messages against it
    pub fn on_local(&mut self, local: Solution) -> Vec<Solution> {
        if self.children() == 0 {
            return vec![local];
        }

        let id = self.partials.len();
        let mut keys = Vec::with_capacity(self.children());
        for separator in &self.separators {
            let Some(key) = local.project(separator) else {
                warn!("Local tuple {} lacks separator {:?}", local, separator);
                return Vec::new();
            };
            keys.push(key);
        }
        self.partials.push(PartialSolution::new(local, keys.len()));

        let mut out = Vec::new();
        for (child, key) in keys.into_iter().enumerate() {
            if let Some(buffered) = self.buffer.as_ref().and_then(|b| b[child].get(&key)) {
                for solution in buffered {
                    out.extend(self.partials[id].add_match(child, solution.clone()));
                }
            }
            self.index[child].entry(key).or_default().push(id);
        }
        out
    }

    /// Probes the child's index with its separator projection
    pub fn on_child(&mut self, child: usize, solution: Solution) -> Vec<Solution> {
        let Some(key) = solution.project(&self.separators[child]) else {
            warn!("Child solution {} lacks separator {:?}", solution, self.separators[child]);
            return Vec::new();
        };

        let mut out = Vec::new();
        if let Some(ids) = self.index[child].get(&key) {
            for &id in ids {
                out.extend(self.partials[id].add_match(child, solution.clone()));
            }
        }
        if let Some(buffer) = self.buffer.as_mut() {
            buffer[child].entry(key).or_default().push(solution);
        }
        out
    }

    /// Drops the replay buffer once no further local tuples can arrive
    pub fn close_local(&mut self) {
        self.buffer = None;
    }
}

pub(crate) struct ChildLink {
    pub node: NodeId,
    pub separator: Vec<String>,
    pub input: Receiver<Solution>,
}

/// Joins a node's local stream with its children's solution streams
pub(crate) struct Stage {
    pub node: NodeId,
    pub local: Receiver<LocalMessage>,
    pub children: Vec<ChildLink>,
    pub output: Sender<Solution>,
    pub done: Receiver<()>,
}

enum Source {
    Done,
    Local,
    Child(usize),
}

impl Stage {
    fn emit(&self, solutions: Vec<Solution>) -> bool {
        solutions
            .into_iter()
            .all(|s| send_or_cancel(&self.output, s, &self.done))
    }

    pub fn run(self) {
        let mut state = StageState::new(self.children.iter().map(|c| c.separator.clone()).collect());
        let mut local_open = true;
        let mut child_open = vec![true; self.children.len()];
        let mut emitted = 0usize;

        loop {
            if !local_open && (state.children() == 0 || state.partials().is_empty()) {
                break;
            }
            if !local_open && child_open.iter().all(|open| !open) {
                break;
            }

            let mut sel = Select::new();
            let mut sources = Vec::with_capacity(self.children.len() + 2);
            sel.recv(&self.done);
            sources.push(Source::Done);
            if local_open {
                sel.recv(&self.local);
                sources.push(Source::Local);
            }
            for (i, link) in self.children.iter().enumerate() {
                if child_open[i] {
                    sel.recv(&link.input);
                    sources.push(Source::Child(i));
                }
            }

            let oper = sel.select();
            let out = match sources[oper.index()] {
                Source::Done => {
                    let _ = oper.recv(&self.done);
                    debug!("Stage {} cancelled", self.node);
                    return;
                }
                Source::Local => match oper.recv(&self.local) {
                    Ok(message) => {
                        let last = message.is_last();
                        let out = state.on_local(message.tuple);
                        if last {
                            local_open = false;
                            state.close_local();
                        }
                        out
                    }
                    Err(_) => {
                        local_open = false;
                        state.close_local();
                        Vec::new()
                    }
                },
                Source::Child(i) => match oper.recv(&self.children[i].input) {
                    Ok(solution) => state.on_child(i, solution),
                    Err(_) => {
                        trace!("Stage {}: child {} finished", self.node, self.children[i].node);
                        child_open[i] = false;
                        Vec::new()
                    }
                },
            };

            emitted += out.len();
            if !self.emit(out) {
                debug!("Stage {} cancelled while sending", self.node);
                return;
            }
        }
        debug!("Stage {} finished after {} solutions", self.node, emitted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sol(pairs: &[(&str, &str)]) -> Solution {
        pairs.iter().copied().collect()
    }

    fn sep(vars: &[&str]) -> Vec<String> {
        vars.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_add_match_emits_only_new_combinations() {
        let mut partial = PartialSolution::new(sol(&[("x", "1"), ("y", "2")]), 2);
        assert!(partial.add_match(0, sol(&[("x", "1"), ("a", "a1")])).is_empty());
        assert!(!partial.is_complete());

        let first = partial.add_match(1, sol(&[("y", "2"), ("b", "b1")]));
        assert_eq!(first.len(), 1);

        let second = partial.add_match(0, sol(&[("x", "1"), ("a", "a2")]));
        assert_eq!(second, vec![sol(&[("x", "1"), ("y", "2"), ("a", "a2"), ("b", "b1")])]);

        // b2 pairs with both a1 and a2
        let third = partial.add_match(1, sol(&[("y", "2"), ("b", "b2")]));
        assert_eq!(third.len(), 2);
        assert!(third.iter().all(|s| s.get("b") == Some("b2")));
    }

    #[test]
    fn test_leaf_forwards_local_tuples() {
        let mut state = StageState::new(Vec::new());
        let local = sol(&[("x", "1")]);
        assert_eq!(state.on_local(local.clone()), vec![local]);
        assert!(state.partials().is_empty());
    }

    #[test]
    fn test_buffered_child_messages_are_replayed() {
        let mut state = StageState::new(vec![sep(&["y"])]);
        assert!(state.on_child(0, sol(&[("y", "b"), ("z", "1")])).is_empty());
        assert!(state.on_child(0, sol(&[("y", "c"), ("z", "2")])).is_empty());

        let out = state.on_local(sol(&[("x", "a"), ("y", "b")]));
        assert_eq!(out, vec![sol(&[("x", "a"), ("y", "b"), ("z", "1")])]);

        let out = state.on_child(0, sol(&[("y", "b"), ("z", "3")]));
        assert_eq!(out, vec![sol(&[("x", "a"), ("y", "b"), ("z", "3")])]);
    }

    #[test]
    fn test_buffer_is_dropped_after_local_completion() {
        let mut state = StageState::new(vec![sep(&["y"])]);
        state.on_local(sol(&[("x", "a"), ("y", "b")]));
        state.close_local();
        assert!(state.buffer.is_none());

        assert!(state.on_child(0, sol(&[("y", "c"), ("z", "1")])).is_empty());
        assert_eq!(state.on_child(0, sol(&[("y", "b"), ("z", "2")])).len(), 1);
    }
}
