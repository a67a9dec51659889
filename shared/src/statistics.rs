/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Cardinality statistics and size estimation.
//!
//! Statistics attached to base tables track the set of values seen per
//! attribute and are maintained incrementally as tuples are added. Statistics
//! produced by the estimators only carry counts: they describe relations that
//! were never materialized.

use rustc_hash::FxHashSet;

/// Per-attribute distinct-value statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub name: String,
    pub distinct: usize,
    // None for estimated columns
    values: Option<FxHashSet<String>>,
}

impl ColumnStats {
    fn tracked(name: &str) -> Self {
        Self {
            name: name.to_string(),
            distinct: 0,
            values: Some(FxHashSet::default()),
        }
    }

    fn estimated(name: &str, distinct: usize) -> Self {
        Self {
            name: name.to_string(),
            distinct,
            values: None,
        }
    }
}

/// Cardinality and distinct-value counts of a (possibly virtual) relation
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    size: usize,
    columns: Vec<ColumnStats>,
}

impl Statistics {
    /// Creates empty statistics that track every value added for `attrs`
    pub fn new<S: AsRef<str>>(attrs: &[S]) -> Self {
        Self {
            size: 0,
            columns: attrs.iter().map(|a| ColumnStats::tracked(a.as_ref())).collect(),
        }
    }

    /// Creates count-only statistics, as produced by the estimators
    pub fn estimated<S: AsRef<str>>(size: usize, columns: &[(S, usize)]) -> Self {
        Self {
            size,
            columns: columns
                .iter()
                .map(|(name, distinct)| ColumnStats::estimated(name.as_ref(), *distinct))
                .collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn columns(&self) -> &[ColumnStats] {
        &self.columns
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Distinct-value count of an attribute
    pub fn ndv(&self, attr: &str) -> Option<usize> {
        self.columns.iter().find(|c| c.name == attr).map(|c| c.distinct)
    }

    /// Accounts for one more tuple. The caller guarantees the arity.
    pub fn add_tuple(&mut self, tuple: &[String]) {
        self.size += 1;
        for (column, value) in self.columns.iter_mut().zip(tuple) {
            if let Some(values) = column.values.as_mut() {
                if values.insert(value.clone()) {
                    column.distinct = values.len();
                }
            }
        }
    }

    fn cap_to_size(&mut self) {
        let size = self.size;
        for column in &mut self.columns {
            column.distinct = column.distinct.min(size);
        }
    }

    fn to_estimate(&self) -> Statistics {
        Statistics {
            size: self.size,
            columns: self
                .columns
                .iter()
                .map(|c| ColumnStats::estimated(&c.name, c.distinct))
                .collect(),
        }
    }
}

/// Estimates the size of the natural join of the given relations.
///
/// Relations are folded left to right; each pairwise step uses
/// `|L| * |R| / prod(max(ndv_L(a), ndv_R(a)))` over the common attributes.
pub fn estimate_join_size(stats: &[&Statistics]) -> (usize, Statistics) {
    let mut iter = stats.iter();
    let mut acc = match iter.next() {
        Some(first) => first.to_estimate(),
        None => return (0, Statistics::estimated::<&str>(0, &[])),
    };
    for next in iter {
        acc = join_pair(&acc, next);
    }
    (acc.size, acc)
}

fn join_pair(left: &Statistics, right: &Statistics) -> Statistics {
    let mut columns: Vec<ColumnStats> = left
        .columns
        .iter()
        .map(|c| ColumnStats::estimated(&c.name, c.distinct))
        .collect();
    let mut denominator = 1.0_f64;

    for column in &right.columns {
        match columns.iter_mut().find(|c| c.name == column.name) {
            Some(common) => {
                denominator *= common.distinct.max(column.distinct).max(1) as f64;
                common.distinct = common.distinct.min(column.distinct);
            }
            None => columns.push(ColumnStats::estimated(&column.name, column.distinct)),
        }
    }

    let product = left.size as f64 * right.size as f64;
    let mut result = Statistics {
        size: (product / denominator).ceil() as usize,
        columns,
    };
    result.cap_to_size();
    result
}

/// Estimates the size of `parent` after a semijoin with `child`.
pub fn estimate_semijoin_size(parent: &Statistics, child: &Statistics) -> (usize, Statistics) {
    let mut result = parent.to_estimate();
    let mut factor = 1.0_f64;

    for column in &mut result.columns {
        if let Some(child_ndv) = child.ndv(&column.name) {
            let kept = column.distinct.min(child_ndv);
            factor *= if column.distinct == 0 {
                0.0
            } else {
                kept as f64 / column.distinct as f64
            };
            column.distinct = kept;
        }
    }

    result.size = (parent.size as f64 * factor).ceil() as usize;
    result.cap_to_size();
    (result.size, result)
}

/// Estimates the size of a selection with the given selectivity in `[0, 1]`.
pub fn estimate_selection_size(stats: &Statistics, selectivity: f64) -> (usize, Statistics) {
    let mut result = stats.to_estimate();
    result.size = (stats.size as f64 * selectivity.clamp(0.0, 1.0)).ceil() as usize;
    result.cap_to_size();
    (result.size, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_incremental_distinct_counts() {
        let mut stats = Statistics::new(&["x", "y"]);
        stats.add_tuple(&tuple(&["a", "b"]));
        stats.add_tuple(&tuple(&["a", "c"]));
        stats.add_tuple(&tuple(&["a", "c"]));
        assert_eq!(stats.size(), 3);
        assert_eq!(stats.ndv("x"), Some(1));
        assert_eq!(stats.ndv("y"), Some(2));
        assert_eq!(stats.ndv("z"), None);
    }

    #[test]
    fn test_join_estimate_on_common_attribute() {
        let r = Statistics::estimated(100, &[("x", 10), ("y", 50)]);
        let s = Statistics::estimated(200, &[("y", 20), ("z", 200)]);
        let (size, joined) = estimate_join_size(&[&r, &s]);
        assert_eq!(size, 400);
        assert_eq!(joined.ndv("y"), Some(20));
        assert_eq!(joined.ndv("z"), Some(200));
        assert_eq!(joined.attributes().collect::<Vec<_>>(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_join_estimate_without_common_attributes_is_a_product() {
        let r = Statistics::estimated(3, &[("x", 3)]);
        let s = Statistics::estimated(4, &[("y", 2)]);
        let (size, _) = estimate_join_size(&[&r, &s]);
        assert_eq!(size, 12);
    }

    #[test]
    fn test_join_estimate_with_empty_relation() {
        let r = Statistics::estimated(0, &[("x", 0)]);
        let s = Statistics::estimated(10, &[("x", 5)]);
        let (size, joined) = estimate_join_size(&[&r, &s]);
        assert_eq!(size, 0);
        assert_eq!(joined.ndv("x"), Some(0));
    }

    #[test]
    fn test_semijoin_estimate_scales_parent() {
        let parent = Statistics::estimated(100, &[("x", 10), ("y", 40)]);
        let child = Statistics::estimated(7, &[("y", 4)]);
        let (size, reduced) = estimate_semijoin_size(&parent, &child);
        assert_eq!(size, 10);
        assert_eq!(reduced.ndv("y"), Some(4));
        assert_eq!(reduced.ndv("x"), Some(10));
    }

    #[test]
    fn test_selection_estimate() {
        let stats = Statistics::estimated(100, &[("x", 80)]);
        let (size, selected) = estimate_selection_size(&stats, 0.1);
        assert_eq!(size, 10);
        assert_eq!(selected.ndv("x"), Some(10));
    }
}
