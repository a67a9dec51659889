/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use thiserror::Error;

/// Schema and loading errors raised by the relation store.
///
/// These indicate a malformed instance or a converter bug; callers are not
/// expected to recover from them.
#[derive(Debug, Error)]
pub enum RelationError {
    #[error("a relation needs at least one attribute")]
    EmptySchema,

    #[error("attribute '{0}' appears more than once in the schema")]
    DuplicateAttribute(String),

    #[error("attribute '{attr}' doesn't exist in {attributes:?}")]
    UnknownAttribute {
        attr: String,
        attributes: Vec<String>,
    },

    #[error("{tuple:?} is not a valid tuple: expected {expected} values, got {found}")]
    ArityMismatch {
        tuple: Vec<String>,
        expected: usize,
        found: usize,
    },

    #[error("cannot remove tuple at position {position} from a table of {size}")]
    PositionOutOfRange { position: usize, size: usize },

    #[error("table '{0}' is not in the database")]
    MissingTable(String),

    #[error("'{0}' is not a valid record kind")]
    InvalidRecordKind(String),

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelationError>;
