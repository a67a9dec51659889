/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::config::Config;
use crate::error::{HyperjoinError, Result};
use crate::evaluator::{Cost, Evaluator};
use crate::hypergraph::Hypergraph;
use crate::hypertree::Hypertree;
use log::{debug, info, trace};

/// Hill-climbing search for a cheap decomposition
#[derive(Debug, Clone, Default)]
pub struct Decomposer {
    max_rounds: Option<usize>,
}

impl Decomposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &Config) -> Self {
        Decomposer {
            max_rounds: config.max_rounds,
        }
    }

    /// Starts from the one-node tree and repeatedly moves to the cheapest
    /// successor that exposes the output vertices at the root, as long as
    /// that strictly lowers the cost.
    pub fn run(&self, hg: &Hypergraph, evaluator: &mut dyn Evaluator) -> Result<Hypertree> {
        if hg.edges().is_empty() {
            return Err(HyperjoinError::InvalidDecomposition(
                "the hypergraph has no edges".to_string(),
            ));
        }

        let mut best = Hypertree::trivial(hg);
        let mut best_cost = evaluator.eval(&best)?;
        debug!("Initial cost with {}: {}", evaluator.name(), best_cost);

        let mut round = 0;
        loop {
            if self.max_rounds.is_some_and(|max| round >= max) {
                debug!("Stopping after {} rounds", round);
                break;
            }
            round += 1;

            let mut improved: Option<(Hypertree, Cost)> = None;
            let mut candidates = 0;
            for succ in best.successors() {
                if !succ.covers_output(hg.output()) {
                    continue;
                }
                candidates += 1;
                let cost = evaluator.eval(&succ)?;
                trace!("Candidate with {} nodes costs {}", succ.len(), cost);
                let threshold = improved.as_ref().map_or(best_cost, |(_, c)| *c);
                if cost < threshold {
                    improved = Some((succ, cost));
                }
            }

            match improved {
                Some((tree, cost)) => {
                    debug!(
                        "Round {}: {} candidates, cost {} -> {}",
                        round, candidates, best_cost, cost
                    );
                    best = tree;
                    best_cost = cost;
                }
                None => {
                    debug!("Round {}: no improvement among {} candidates", round, candidates);
                    break;
                }
            }
        }

        info!(
            "Decomposition with {} nodes, cost {} ({})",
            best.len(),
            best_cost,
            evaluator.name()
        );
        Ok(best)
    }
}

/// Decomposes `hg` with the default search settings
pub fn decompose(hg: &Hypergraph, evaluator: &mut dyn Evaluator) -> Result<Hypertree> {
    Decomposer::new().run(hg, evaluator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::NumNodes;

    #[test]
    fn test_round_limit() {
        let hg = Hypergraph::parse("R(x,y), S(y,z), T(z,w).").unwrap();
        let config = Config::default().set_max_rounds(Some(1));
        let tree = Decomposer::with_config(&config).run(&hg, &mut NumNodes).unwrap();
        assert_eq!(tree.len(), 2);

        let unbounded = decompose(&hg, &mut NumNodes).unwrap();
        assert_eq!(unbounded.len(), 3);
    }

    #[test]
    fn test_output_vertices_stay_in_root() {
        let hg = Hypergraph::parse("R(x,y), S(y,z), T(z,w).")
            .unwrap()
            .with_output(&["x", "w"])
            .unwrap();
        let tree = decompose(&hg, &mut NumNodes).unwrap();
        assert!(tree.covers_output(hg.output()));
        assert!(tree.validate(&hg).is_ok());
    }

    #[test]
    fn test_empty_hypergraph_is_rejected() {
        let hg = Hypergraph::from_edges::<&str>(&[]).unwrap();
        assert!(decompose(&hg, &mut NumNodes).is_err());
    }
}
