/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::error::{RelationError, Result};
use crate::statistics::Statistics;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub type Tuple = Vec<String>;

/// An append-only relation with a fixed, ordered schema.
///
/// Every tuple has exactly one value per attribute. Duplicate tuples are
/// allowed. When statistics are attached they are updated on every insertion
/// but are left untouched by removals.
#[derive(Debug, Clone)]
pub struct Table {
    attributes: Vec<String>,
    positions: FxHashMap<String, usize>,
    tuples: Vec<Tuple>,
    stats: Option<Statistics>,
}

impl Table {
    pub fn new<S: AsRef<str>>(attributes: &[S], with_stats: bool) -> Result<Self> {
        if attributes.is_empty() {
            return Err(RelationError::EmptySchema);
        }

        let attributes: Vec<String> = attributes.iter().map(|a| a.as_ref().to_string()).collect();
        let mut positions = FxHashMap::default();
        for (i, attr) in attributes.iter().enumerate() {
            if positions.insert(attr.clone(), i).is_some() {
                return Err(RelationError::DuplicateAttribute(attr.clone()));
            }
        }

        let stats = with_stats.then(|| Statistics::new(&attributes));
        Ok(Table {
            attributes,
            positions,
            tuples: Vec::new(),
            stats,
        })
    }

    /// Builds a statistics-free table from tuples already known to fit the schema
    pub(crate) fn with_tuples(attributes: Vec<String>, tuples: Vec<Tuple>) -> Self {
        let positions = attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.clone(), i))
            .collect();
        Table {
            attributes,
            positions,
            tuples,
            stats: None,
        }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn position(&self, attr: &str) -> Option<usize> {
        self.positions.get(attr).copied()
    }

    pub fn require_position(&self, attr: &str) -> Result<usize> {
        self.position(attr).ok_or_else(|| RelationError::UnknownAttribute {
            attr: attr.to_string(),
            attributes: self.attributes.clone(),
        })
    }

    pub fn size(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn into_tuples(self) -> Vec<Tuple> {
        self.tuples
    }

    pub fn stats(&self) -> Option<&Statistics> {
        self.stats.as_ref()
    }

    pub fn add_tuple(&mut self, tuple: Tuple) -> Result<()> {
        if tuple.len() != self.attributes.len() {
            return Err(RelationError::ArityMismatch {
                expected: self.attributes.len(),
                found: tuple.len(),
                tuple,
            });
        }
        if let Some(stats) = self.stats.as_mut() {
            stats.add_tuple(&tuple);
        }
        self.tuples.push(tuple);
        Ok(())
    }

    pub fn add_tuples<I: IntoIterator<Item = Tuple>>(&mut self, tuples: I) -> Result<()> {
        for tuple in tuples {
            self.add_tuple(tuple)?;
        }
        Ok(())
    }

    /// Removes the tuples at the given positions, in any order.
    ///
    /// Returns whether anything was removed. Statistics are not recomputed.
    pub fn remove_tuples(&mut self, positions: &[usize]) -> Result<bool> {
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        positions.dedup();
        if let Some(&position) = positions.iter().find(|&&p| p >= self.tuples.len()) {
            return Err(RelationError::PositionOutOfRange {
                position,
                size: self.tuples.len(),
            });
        }
        if positions.is_empty() {
            return Ok(false);
        }

        let mut doomed = positions.into_iter().peekable();
        let mut index = 0usize;
        self.tuples.retain(|_| {
            let drop = doomed.next_if_eq(&index).is_some();
            index += 1;
            !drop
        });
        Ok(true)
    }

    /// Keeps the tuples for which `keep` holds, returning whether any was removed
    pub fn retain<F: FnMut(&Tuple) -> bool>(&mut self, keep: F) -> bool {
        let before = self.tuples.len();
        self.tuples.retain(keep);
        self.tuples.len() != before
    }
}

/// Relation name to table
#[derive(Debug, Clone, Default)]
pub struct Database {
    tables: BTreeMap<String, Table>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: Table) -> Option<Table> {
        self.tables.insert(name.into(), table)
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.get(name)
            .ok_or_else(|| RelationError::MissingTable(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Reads the line-oriented database format.
    ///
    /// `r,<name>,<attr>...` starts a relation, `t,<value>...` adds a tuple to
    /// the most recently started relation. Base tables carry statistics.
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut db = Database::new();
        let mut current: Option<String> = None;

        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let mut fields = record.iter();
            match fields.next() {
                Some("r") => {
                    let name = fields.next().ok_or_else(|| RelationError::MalformedRecord {
                        line,
                        reason: "relation header without a name".to_string(),
                    })?;
                    let attributes: Vec<&str> = fields.collect();
                    db.insert(name, Table::new(&attributes, true)?);
                    log::trace!("Relation {} with attributes {:?}", name, attributes);
                    current = Some(name.to_string());
                }
                Some("t") => {
                    let name = current.as_deref().ok_or_else(|| RelationError::MalformedRecord {
                        line,
                        reason: "tuple before any relation header".to_string(),
                    })?;
                    let table = db
                        .tables
                        .get_mut(name)
                        .ok_or_else(|| RelationError::MissingTable(name.to_string()))?;
                    table.add_tuple(fields.map(str::to_string).collect())?;
                }
                Some(kind) => return Err(RelationError::InvalidRecordKind(kind.to_string())),
                None => continue,
            }
        }

        log::debug!("Loaded {} relations", db.len());
        Ok(db)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(File::open(path)?)
    }

    pub fn load_from_str(text: &str) -> Result<Self> {
        Self::load(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Tuple {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_schema_is_validated() {
        assert!(matches!(
            Table::new::<&str>(&[], false),
            Err(RelationError::EmptySchema)
        ));
        assert!(matches!(
            Table::new(&["x", "x"], false),
            Err(RelationError::DuplicateAttribute(a)) if a == "x"
        ));
    }

    #[test]
    fn test_add_tuple_checks_arity_and_updates_stats() {
        let mut table = Table::new(&["x", "y"], true).unwrap();
        table.add_tuple(row(&["a", "b"])).unwrap();
        table.add_tuple(row(&["a", "c"])).unwrap();
        assert!(matches!(
            table.add_tuple(row(&["a"])),
            Err(RelationError::ArityMismatch { expected: 2, found: 1, .. })
        ));
        assert_eq!(table.size(), 2);
        let stats = table.stats().unwrap();
        assert_eq!(stats.size(), 2);
        assert_eq!(stats.ndv("x"), Some(1));
        assert_eq!(stats.ndv("y"), Some(2));
    }

    #[test]
    fn test_remove_tuples_leaves_stats_stale() {
        let mut table = Table::new(&["x"], true).unwrap();
        table
            .add_tuples(vec![row(&["1"]), row(&["2"]), row(&["3"]), row(&["4"])])
            .unwrap();
        assert!(table.remove_tuples(&[0, 2]).unwrap());
        assert_eq!(table.tuples(), &[row(&["2"]), row(&["4"])]);
        assert_eq!(table.stats().unwrap().size(), 4);
        assert!(!table.remove_tuples(&[]).unwrap());
        assert!(table.remove_tuples(&[5]).is_err());
    }

    #[test]
    fn test_remove_tuples_in_any_order() {
        let mut table = Table::new(&["x"], false).unwrap();
        table
            .add_tuples(vec![row(&["1"]), row(&["2"]), row(&["3"]), row(&["4"])])
            .unwrap();
        assert!(table.remove_tuples(&[2, 0, 2]).unwrap());
        assert_eq!(table.tuples(), &[row(&["2"]), row(&["4"])]);
    }

    #[test]
    fn test_load_database() {
        let db = Database::load_from_str("r,R,x,y\nt,a,b\nt,a,c\nr,S,y\nt,b\n").unwrap();
        assert_eq!(db.len(), 2);
        let r = db.table("R").unwrap();
        assert_eq!(r.attributes(), &["x".to_string(), "y".to_string()]);
        assert_eq!(r.size(), 2);
        assert_eq!(db.table("S").unwrap().size(), 1);
        assert!(matches!(db.table("T"), Err(RelationError::MissingTable(_))));
    }

    #[test]
    fn test_load_rejects_bad_records() {
        assert!(matches!(
            Database::load_from_str("x,R,a\n"),
            Err(RelationError::InvalidRecordKind(k)) if k == "x"
        ));
        assert!(matches!(
            Database::load_from_str("t,a\n"),
            Err(RelationError::MalformedRecord { .. })
        ));
        assert!(matches!(
            Database::load_from_str("r,R,x\nt,a,b\n"),
            Err(RelationError::ArityMismatch { .. })
        ));
    }
}
