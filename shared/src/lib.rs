/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod dictionary;
pub mod error;
pub mod operators;
pub mod statistics;
pub mod table;

pub use dictionary::Dictionary;
pub use error::{RelationError, Result};
pub use statistics::Statistics;
pub use table::{Database, Table, Tuple};
