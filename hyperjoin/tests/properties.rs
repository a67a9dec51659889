use hyperjoin::evaluator::NumNodes;
use hyperjoin::{decompose, solve, Hypergraph, Solution};
use proptest::prelude::*;
use shared::operators::join_all;
use shared::table::{Database, Table};
use std::sync::Arc;

fn rows_strategy() -> impl Strategy<Value = Vec<(u8, u8)>> {
    proptest::collection::vec((0u8..4, 0u8..4), 0..8)
}

fn database(relations: &[(&str, &str, &str, &[(u8, u8)])]) -> Database {
    let mut facts = String::new();
    for (name, a, b, rows) in relations {
        facts.push_str(&format!("r,{},{},{}\n", name, a, b));
        for (x, y) in rows.iter() {
            facts.push_str(&format!("t,{},{}\n", x, y));
        }
    }
    Database::load_from_str(&facts).unwrap()
}

/// The bag of solutions a full join produces, or the marker when a relation is empty
fn expected(db: &Database, relations: &[&str]) -> Vec<Solution> {
    let tables: Vec<&Table> = relations.iter().map(|r| db.table(r).unwrap()).collect();
    if tables.iter().any(|t| t.is_empty()) {
        return vec![Solution::empty_marker()];
    }
    let joined = join_all(&tables).unwrap();
    let mut solutions: Vec<Solution> = joined
        .tuples()
        .iter()
        .map(|t| Solution::from_tuple(joined.attributes(), t))
        .collect();
    solutions.sort();
    solutions
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pipeline_matches_full_join_on_paths(
        r in rows_strategy(),
        s in rows_strategy(),
        t in rows_strategy(),
    ) {
        let hg = Hypergraph::parse("R(x,y), S(y,z), T(z,w).").unwrap();
        let db = database(&[
            ("R", "x", "y", r.as_slice()),
            ("S", "y", "z", s.as_slice()),
            ("T", "z", "w", t.as_slice()),
        ]);
        let want = expected(&db, &["R", "S", "T"]);

        let tree = decompose(&hg, &mut NumNodes).unwrap();
        let mut found: Vec<Solution> = solve(&hg, &tree, Arc::new(db)).unwrap().collect();
        found.sort();
        prop_assert_eq!(found, want);
    }
}
