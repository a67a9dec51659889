extern crate criterion;
extern crate hyperjoin;

use criterion::*;
use hyperjoin::evaluator::{NumNodes, StatisticsEval};
use hyperjoin::*;
use shared::table::Database;
use std::sync::Arc;

fn chain_query(len: usize) -> Hypergraph {
    let atoms: Vec<String> = (0..len).map(|i| format!("R{}(v{},v{})", i, i, i + 1)).collect();
    Hypergraph::parse(&atoms.join(", ")).unwrap()
}

/// Each relation maps `rows` keys onto `fanout` values
fn chain_database(len: usize, rows: usize, fanout: usize) -> Database {
    let mut facts = String::new();
    for i in 0..len {
        facts.push_str(&format!("r,R{},v{},v{}\n", i, i, i + 1));
        for k in 0..rows {
            facts.push_str(&format!("t,{},{}\n", k, k % fanout));
        }
    }
    Database::load_from_str(&facts).unwrap()
}

fn my_benchmark(c: &mut Criterion) {
    let hg = chain_query(6);
    let db = chain_database(6, 200, 20);
    let config = Config::default();

    c.bench_function("decompose_num_nodes", |b| {
        b.iter(|| decompose(black_box(&hg), &mut NumNodes).unwrap())
    });

    c.bench_function("decompose_statistics", |b| {
        b.iter(|| {
            let mut evaluator = StatisticsEval::new(&db, &hg, &config).unwrap();
            decompose(black_box(&hg), &mut evaluator).unwrap()
        })
    });

    let tree = decompose(&hg, &mut NumNodes).unwrap();
    let shared_db = Arc::new(db);
    c.bench_function("solve_chain", |b| {
        b.iter(|| solve(&hg, &tree, Arc::clone(&shared_db)).unwrap().count())
    });
}

criterion_group!(benches, my_benchmark);
criterion_main!(benches);
