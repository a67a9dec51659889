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
use crate::evaluator::EvaluatorKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_FILTER_SELECTIVITY: f64 = 0.1;

/// Settings for decomposition and solving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cost model used by the decomposition search
    pub evaluator: EvaluatorKind,
    /// Capacity of every pipeline queue; 0 means rendezvous
    pub channel_capacity: usize,
    /// Upper bound on hill-climbing rounds
    pub max_rounds: Option<usize>,
    /// Selectivity assumed for filters without an estimate of their own
    pub filter_selectivity: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorKind::Statistics,
            channel_capacity: 0,
            max_rounds: None,
            filter_selectivity: DEFAULT_FILTER_SELECTIVITY,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_evaluator(mut self, evaluator: EvaluatorKind) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn set_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn set_max_rounds(mut self, rounds: Option<usize>) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn set_filter_selectivity(mut self, selectivity: f64) -> Self {
        self.filter_selectivity = selectivity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.filter_selectivity) {
            return Err(HyperjoinError::Config(format!(
                "filter_selectivity must be within [0, 1], got {}",
                self.filter_selectivity
            )));
        }
        Ok(())
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
