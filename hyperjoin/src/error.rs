/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use shared::error::RelationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HyperjoinError {
    #[error(transparent)]
    Relation(#[from] RelationError),

    #[error("{0}")]
    Parse(String),

    #[error("no statistics for edge set {0:?}")]
    MissingStatistics(Vec<String>),

    #[error("unknown vertex '{0}'")]
    UnknownVertex(String),

    #[error("unknown edge {0}")]
    UnknownEdge(u32),

    #[error("no domain size for vertex '{0}'")]
    MissingDomain(String),

    #[error("solutions disagree on '{var}': '{left}' vs '{right}'")]
    Conflict {
        var: String,
        left: String,
        right: String,
    },

    #[error("relation '{relation}' has attributes {found:?}, but its edge expects {expected:?}")]
    SchemaMismatch {
        relation: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("invalid decomposition: {0}")]
    InvalidDecomposition(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HyperjoinError>;
