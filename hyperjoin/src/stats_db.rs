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
use crate::hypergraph::{EdgeId, Hypergraph};
use rustc_hash::{FxHashMap, FxHasher};
use shared::statistics::Statistics;
use shared::table::Database;
use std::hash::{Hash, Hasher};

/// Order-independent key of an edge set
pub fn fingerprint(edges: &[EdgeId]) -> u64 {
    let mut sorted = edges.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut hasher = FxHasher::default();
    sorted.hash(&mut hasher);
    hasher.finish()
}

/// Size estimates for joins of edge sets, owned by one evaluator.
///
/// Entries touched while scoring a tree can be snapshotted with [`save`] and
/// rolled back with [`restore`], so scoring one candidate never leaks into
/// the next.
///
/// [`save`]: StatisticsDB::save
/// [`restore`]: StatisticsDB::restore
#[derive(Debug, Clone, Default)]
pub struct StatisticsDB {
    entries: FxHashMap<u64, Statistics>,
    snapshots: FxHashMap<u64, Statistics>,
    saved: Vec<u64>,
}

impl StatisticsDB {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds single-edge entries from the base tables of `hg`'s edges.
    ///
    /// Columns are named after the edge's vertices, positionally. Edges whose
    /// relation is missing or has no statistics get no entry.
    pub fn from_database(db: &Database, hg: &Hypergraph) -> Result<Self> {
        let mut stats_db = StatisticsDB::new();
        for edge in hg.edges() {
            let name = hg.edge_name(edge.name)?;
            let Some(stats) = db.get(name).and_then(|t| t.stats()) else {
                log::warn!("No statistics for relation {}", name);
                continue;
            };

            let vertices = hg.vertex_names(&edge.vertices)?;
            let found: Vec<String> = stats.attributes().map(str::to_string).collect();
            if found.len() != vertices.len() {
                return Err(HyperjoinError::SchemaMismatch {
                    relation: name.to_string(),
                    expected: vertices,
                    found,
                });
            }

            let columns: Vec<(&str, usize)> = vertices
                .iter()
                .zip(stats.columns())
                .map(|(v, c)| (v.as_str(), c.distinct))
                .collect();
            stats_db.put(&[edge.name], Statistics::estimated(stats.size(), &columns));
        }
        Ok(stats_db)
    }

    pub fn put(&mut self, edges: &[EdgeId], stats: Statistics) {
        self.entries.insert(fingerprint(edges), stats);
    }

    pub fn stats(&self, edges: &[EdgeId]) -> Option<&Statistics> {
        self.entries.get(&fingerprint(edges))
    }

    pub fn contains(&self, edges: &[EdgeId]) -> bool {
        self.entries.contains_key(&fingerprint(edges))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshots the current entry for `edges`. The first snapshot since the
    /// last restore wins. Returns false when there is no entry.
    pub fn save(&mut self, edges: &[EdgeId]) -> bool {
        let key = fingerprint(edges);
        let Some(current) = self.entries.get(&key) else {
            return false;
        };
        if !self.snapshots.contains_key(&key) {
            self.snapshots.insert(key, current.clone());
            self.saved.push(key);
        }
        true
    }

    /// Writes every snapshot back and forgets them
    pub fn restore(&mut self) {
        for key in self.saved.drain(..) {
            if let Some(old) = self.snapshots.remove(&key) {
                self.entries.insert(key, old);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_ignores_order() {
        assert_eq!(fingerprint(&[3, 1, 2]), fingerprint(&[1, 2, 3]));
        assert_ne!(fingerprint(&[1, 2]), fingerprint(&[1, 3]));
    }

    #[test]
    fn test_save_and_restore() {
        let mut db = StatisticsDB::new();
        db.put(&[1, 2], Statistics::estimated(10, &[("x", 5)]));
        assert!(db.save(&[2, 1]));
        assert!(!db.save(&[7]));

        db.put(&[1, 2], Statistics::estimated(3, &[("x", 3)]));
        assert!(db.save(&[1, 2]));
        assert_eq!(db.stats(&[1, 2]).unwrap().size(), 3);

        db.restore();
        assert_eq!(db.stats(&[1, 2]).unwrap().size(), 10);
    }

    #[test]
    fn test_from_database_renames_columns() {
        let hg = Hypergraph::parse("R(x,y).").unwrap();
        let data = Database::load_from_str("r,R,a,b\nt,1,2\nt,1,3\n").unwrap();
        let db = StatisticsDB::from_database(&data, &hg).unwrap();
        let r = hg.edges()[0].name;
        let stats = db.stats(&[r]).unwrap();
        assert_eq!(stats.size(), 2);
        assert_eq!(stats.ndv("x"), Some(1));
        assert_eq!(stats.ndv("y"), Some(2));
    }
}
