use proptest::prelude::*;
use shared::operators::{distinct, join};
use shared::table::Table;
use std::collections::BTreeSet;

fn table_strategy(attrs: &'static [&'static str]) -> impl Strategy<Value = Table> {
    let arity = attrs.len();
    proptest::collection::vec(proptest::collection::vec(0u8..4, arity), 0..12).prop_map(
        move |rows| {
            let mut table = Table::new(attrs, true).unwrap();
            for row in rows {
                table
                    .add_tuple(row.into_iter().map(|v| v.to_string()).collect())
                    .unwrap();
            }
            table
        },
    )
}

/// Tuples as attribute-name keyed rows, so tables with permuted schemas compare equal
fn as_set(table: &Table) -> BTreeSet<Vec<(String, String)>> {
    table
        .tuples()
        .iter()
        .map(|tuple| {
            let mut row: Vec<(String, String)> = table
                .attributes()
                .iter()
                .cloned()
                .zip(tuple.iter().cloned())
                .collect();
            row.sort();
            row
        })
        .collect()
}

proptest! {
    #[test]
    fn join_is_commutative(a in table_strategy(&["x", "y"]), b in table_strategy(&["y", "z"])) {
        prop_assert_eq!(as_set(&join(&a, &b)), as_set(&join(&b, &a)));
    }

    #[test]
    fn join_is_associative(
        a in table_strategy(&["x", "y"]),
        b in table_strategy(&["y", "z"]),
        c in table_strategy(&["z", "x"]),
    ) {
        let left = join(&join(&a, &b), &c);
        let right = join(&a, &join(&b, &c));
        prop_assert_eq!(as_set(&left), as_set(&right));
    }

    #[test]
    fn distinct_is_idempotent(a in table_strategy(&["x", "y", "z"])) {
        let once = distinct::<&str>(&a, &[]).unwrap();
        let twice = distinct::<&str>(&once, &[]).unwrap();
        prop_assert_eq!(once.attributes(), twice.attributes());
        prop_assert_eq!(once.tuples(), twice.tuples());
    }

    #[test]
    fn distinct_projection_has_no_duplicates(a in table_strategy(&["x", "y"])) {
        let xs = distinct(&a, &["x"]).unwrap();
        let unique: BTreeSet<_> = xs.tuples().iter().collect();
        prop_assert_eq!(unique.len(), xs.size());
    }
}
