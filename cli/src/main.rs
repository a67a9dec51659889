/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::Parser;
use hyperjoin::decompose::Decomposer;
use hyperjoin::{evaluator_for, Config, EvaluatorKind, Hypergraph, Result, Solver};
use log::{info, warn};
use shared::table::Database;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "hyperjoin-cli",
    version = "0.1.0",
    author = "Volodymyr Kadzhaia <vkadzhaia@gmail.com>",
    author = "Pieter Bonte <pieter.bonte@kuleuven.be>",
    about = "Decompose a conjunctive query and evaluate it over a database",
    long_about = "hyperjoin CLI - searches a cost-guided hypertree decomposition for a conjunctive query and evaluates the query over a fact file with a concurrent streaming join."
)]
struct Args {
    #[arg(short, long, help = "Query file: `ans(x) :- R(x,y), S(y,z).` or a plain atom list", value_name = "FILE")]
    rule: String,

    #[arg(short, long, help = "Fact file with `r,...` relation and `t,...` tuple records", value_name = "FILE")]
    facts: Option<String>,

    #[arg(short, long, help = "Cost model: num_nodes, trivial_ground, naive_ground or statistics", value_name = "NAME")]
    evaluator: Option<EvaluatorKind>,

    #[arg(long, help = "Stop after printing the decomposition")]
    only_decomp: bool,

    #[arg(long, help = "Write the decomposition as GML", value_name = "FILE")]
    gml: Option<String>,

    #[arg(long, help = "Print every solution")]
    print_sol: bool,

    #[arg(long, help = "Stop after this many solutions", value_name = "N")]
    limit: Option<usize>,

    #[arg(long, help = "Print solutions as JSON lines")]
    json: bool,

    #[arg(long, help = "JSON configuration file", value_name = "FILE")]
    config: Option<String>,
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn load_query(path: &str) -> Result<Hypergraph> {
    let text = std::fs::read_to_string(path)?;
    Hypergraph::from_rule(&text).or_else(|_| Hypergraph::parse(&text))
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(kind) = args.evaluator {
        config = config.set_evaluator(kind);
    }
    config.validate()?;

    let start = Instant::now();
    let hg = load_query(&args.rule)?;
    let db = args.facts.as_deref().map(Database::load_from_file).transpose()?;
    info!(
        "Loaded {} edges and {} relations in {:?}",
        hg.edges().len(),
        db.as_ref().map_or(0, Database::len),
        start.elapsed()
    );

    let start = Instant::now();
    let mut evaluator = evaluator_for(config.evaluator, &hg, db.as_ref(), &config)?;
    let tree = Decomposer::with_config(&config).run(&hg, evaluator.as_mut())?;
    info!("Decomposed in {:?}", start.elapsed());
    print!("{}", tree.render(&hg));

    if let Some(path) = &args.gml {
        std::fs::write(path, tree.to_gml(&hg))?;
        info!("Wrote {}", path);
    }
    if args.only_decomp {
        return Ok(());
    }
    let Some(db) = db else {
        warn!("No fact file given, nothing to solve");
        return Ok(());
    };

    let start = Instant::now();
    let stream = Solver::with_config(config).solve(&hg, &tree, Arc::new(db))?;
    let limit = args.limit.unwrap_or(usize::MAX);
    let mut count = 0usize;
    for solution in stream.take(limit) {
        if solution.is_empty() {
            info!("The query has no solutions");
            break;
        }
        count += 1;
        if args.json {
            println!("{}", serde_json::to_string(&solution)?);
        } else if args.print_sol {
            println!("{}", solution);
        }
    }
    info!("{} solutions in {:?}", count, start.elapsed());
    if !args.json {
        println!("Solutions: {}", count);
    }
    Ok(())
}

fn main() -> ExitCode {
    install_tracing_subscriber();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
