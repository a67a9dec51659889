/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod config;
pub mod decompose;
pub mod error;
pub mod evaluator;
pub mod hypergraph;
pub mod hypertree;
pub mod parser;
pub mod pipeline;
pub mod solution;
pub mod stats_db;

pub use config::Config;
pub use decompose::{decompose, Decomposer};
pub use error::{HyperjoinError, Result};
pub use evaluator::{evaluator_for, Evaluator, EvaluatorKind};
pub use hypergraph::{Filter, Hypergraph};
pub use hypertree::Hypertree;
pub use pipeline::{solve, SolutionStream, Solver};
pub use solution::Solution;
pub use stats_db::StatisticsDB;
