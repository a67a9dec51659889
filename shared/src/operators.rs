/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Relational operators over [`Table`]s.
//!
//! `join`, `project` and `distinct` build new tables. `semijoin` and `select`
//! filter their input in place and report whether any tuple was removed.

use crate::error::Result;
use crate::table::{Table, Tuple};
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Position pairs `(left, right)` of the attributes both tables share, in
/// left schema order
pub fn common_attributes(left: &Table, right: &Table) -> Vec<(usize, usize)> {
    left.attributes()
        .iter()
        .enumerate()
        .filter_map(|(i, attr)| right.position(attr).map(|j| (i, j)))
        .collect()
}

#[inline]
fn matches(left: &Tuple, right: &Tuple, pairs: &[(usize, usize)]) -> bool {
    pairs.iter().all(|&(i, j)| left[i] == right[j])
}

/// Natural join of two tables.
///
/// The larger table drives the nested loop (ties keep `left`); the output
/// schema is the driver's attributes followed by the other side's remaining
/// attributes. Without common attributes this is a cartesian product.
pub fn join(left: &Table, right: &Table) -> Table {
    let (outer, inner) = if left.size() < right.size() {
        (right, left)
    } else {
        (left, right)
    };

    let pairs = common_attributes(outer, inner);
    let extra: Vec<usize> = inner
        .attributes()
        .iter()
        .enumerate()
        .filter(|(_, attr)| outer.position(attr).is_none())
        .map(|(j, _)| j)
        .collect();

    let mut attributes = outer.attributes().to_vec();
    attributes.extend(extra.iter().map(|&j| inner.attributes()[j].clone()));

    let tuples: Vec<Tuple> = outer
        .tuples()
        .par_iter()
        .flat_map_iter(|o| {
            inner
                .tuples()
                .iter()
                .filter(|i| matches(o, i, &pairs))
                .map(|i| {
                    let mut joined = Vec::with_capacity(o.len() + extra.len());
                    joined.extend(o.iter().cloned());
                    joined.extend(extra.iter().map(|&j| i[j].clone()));
                    joined
                })
                .collect::<Vec<_>>()
        })
        .collect();

    Table::with_tuples(attributes, tuples)
}

/// Joins all tables pairwise, in order. With three or more tables the
/// smaller ones are joined first. Returns `None` for an empty slice.
pub fn join_all(tables: &[&Table]) -> Option<Table> {
    let mut ordered: Vec<&Table> = tables.to_vec();
    if ordered.len() > 2 {
        ordered.sort_by_key(|t| t.size());
    }

    let (first, rest) = ordered.split_first()?;
    let mut acc = (*first).clone();
    for table in rest {
        acc = join(&acc, table);
    }
    Some(acc)
}

/// Removes every tuple of `left` without a match in `right` on their common
/// attributes. Tables without common attributes are left unchanged.
pub fn semijoin(left: &mut Table, right: &Table) -> bool {
    let pairs = common_attributes(left, right);
    if pairs.is_empty() {
        return false;
    }

    let keep: Vec<bool> = left
        .tuples()
        .par_iter()
        .map(|l| right.tuples().iter().any(|r| matches(l, r, &pairs)))
        .collect();

    let mut keep = keep.into_iter();
    left.retain(|_| keep.next().unwrap_or(true))
}

/// Removes every tuple for which `condition` does not hold
pub fn select<F>(table: &mut Table, condition: F) -> bool
where
    F: Fn(&[String]) -> bool,
{
    table.retain(|tuple| condition(tuple.as_slice()))
}

/// Single-column table holding the values of `attr`, duplicates retained
pub fn project(table: &Table, attr: &str) -> Result<Table> {
    let position = table.require_position(attr)?;
    let mut result = Table::new(&[attr], true)?;
    result.add_tuples(table.tuples().iter().map(|t| vec![t[position].clone()]))?;
    Ok(result)
}

/// Distinct projection of `table` onto `attrs` (all attributes when empty),
/// in lexicographic order
pub fn distinct<S: AsRef<str>>(table: &Table, attrs: &[S]) -> Result<Table> {
    let attrs: Vec<String> = if attrs.is_empty() {
        table.attributes().to_vec()
    } else {
        attrs.iter().map(|a| a.as_ref().to_string()).collect()
    };
    let positions = attrs
        .iter()
        .map(|a| table.require_position(a))
        .collect::<Result<Vec<_>>>()?;

    let mut heap: BinaryHeap<Reverse<Tuple>> = table
        .tuples()
        .iter()
        .map(|t| Reverse(positions.iter().map(|&p| t[p].clone()).collect()))
        .collect();

    let mut result = Table::new(&attrs, true)?;
    let mut last: Option<Tuple> = None;
    while let Some(Reverse(current)) = heap.pop() {
        if last.as_ref() != Some(&current) {
            result.add_tuple(current.clone())?;
            last = Some(current);
        }
    }
    Ok(result)
}
