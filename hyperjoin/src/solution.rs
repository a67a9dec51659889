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
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Variable bindings of one answer. The binding-free solution doubles as the
/// marker for "no answers at all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Solution(BTreeMap<String, String>);

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical marker for an instance without solutions
    pub fn empty_marker() -> Self {
        Self::default()
    }

    /// Pairs attributes with tuple values. Both have the same length.
    pub fn from_tuple(attributes: &[String], tuple: &[String]) -> Self {
        Solution(
            attributes
                .iter()
                .cloned()
                .zip(tuple.iter().cloned())
                .collect(),
        )
    }

    pub fn get(&self, var: &str) -> Option<&str> {
        self.0.get(var).map(String::as_str)
    }

    pub fn insert(&mut self, var: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(var.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Values of `vars`, in order. Missing variables yield `None`.
    pub fn project(&self, vars: &[String]) -> Option<Vec<String>> {
        vars.iter().map(|v| self.0.get(v).cloned()).collect()
    }

    /// Union of both bindings; fails when they disagree on a shared variable
    pub fn extend(&self, other: &Solution) -> Result<Solution> {
        let mut merged = self.0.clone();
        for (var, value) in &other.0 {
            match merged.get(var) {
                Some(existing) if existing != value => {
                    return Err(HyperjoinError::Conflict {
                        var: var.clone(),
                        left: existing.clone(),
                        right: value.clone(),
                    })
                }
                Some(_) => {}
                None => {
                    merged.insert(var.clone(), value.clone());
                }
            }
        }
        Ok(Solution(merged))
    }
}

impl From<BTreeMap<String, String>> for Solution {
    fn from(map: BTreeMap<String, String>) -> Self {
        Solution(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Solution {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Solution(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// `x y z -> a b 1`
impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars: Vec<&str> = self.0.keys().map(String::as_str).collect();
        let values: Vec<&str> = self.0.values().map(String::as_str).collect();
        write!(f, "{} -> {}", vars.join(" "), values.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sol(pairs: &[(&str, &str)]) -> Solution {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_extend_unions_agreeing_solutions() {
        let s1 = sol(&[("x", "a"), ("y", "b")]);
        let s2 = sol(&[("y", "b"), ("z", "1")]);
        assert_eq!(s1.extend(&s2).unwrap(), sol(&[("x", "a"), ("y", "b"), ("z", "1")]));
    }

    #[test]
    fn test_extend_fails_on_disagreement() {
        let s1 = sol(&[("x", "a"), ("y", "b")]);
        let s2 = sol(&[("y", "c")]);
        assert!(matches!(
            s1.extend(&s2),
            Err(HyperjoinError::Conflict { var, .. }) if var == "y"
        ));
    }

    #[test]
    fn test_equality_is_by_bindings() {
        assert_eq!(sol(&[("x", "a"), ("y", "b")]), sol(&[("y", "b"), ("x", "a")]));
        assert_ne!(sol(&[("x", "a")]), sol(&[("x", "a"), ("y", "b")]));
        assert!(Solution::empty_marker().is_empty());
    }

    #[test]
    fn test_display_and_json() {
        let s = sol(&[("y", "b"), ("x", "a")]);
        assert_eq!(s.to_string(), "x y -> a b");
        assert_eq!(serde_json::to_string(&s).unwrap(), r#"{"x":"a","y":"b"}"#);
    }
}
