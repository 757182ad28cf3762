// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::analysis::cost::{CostModel, CONNECTION_BASE_COST, UNBOUNDED_LIST_MULTIPLIER};
use crate::analysis::ValidationOptions;
use crate::error::ConfigError;

/// Environment variable overriding [Limits::max_depth].
pub const DEPTH_LIMIT_VAR: &str = "GRAPHQL_DEPTH_LIMIT";

/// Environment variable overriding [Limits::max_cost].
pub const COST_LIMIT_VAR: &str = "GRAPHQL_COST_LIMIT";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct GatewayConfig {
    pub limits: Limits,
    pub cost: CostConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Limits {
    /// Maximum nesting of selection sets, after fragments are inlined. Queries that are deeper
    /// than this are rejected before they are executed.
    pub max_depth: usize,

    /// Maximum estimated cost of a query, see [CostModel] for how the estimate is produced.
    pub max_cost: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct CostConfig {
    /// Weight of a field that looks like it returns a list or a connection.
    pub connection_base_cost: u64,

    /// Page size assumed for list-like fields that do not ask for a literal page size.
    pub unbounded_list_multiplier: u64,

    /// Arguments whose literal integer value is taken as the page size, in priority order.
    pub pagination_arguments: Vec<String>,
}

impl GatewayConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Read the config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        Self::from_toml_str(&contents)
    }

    /// Apply limit overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply limit overrides looked up through `lookup`, so that callers (and tests) can decide
    /// where variables come from.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(depth) = parse_var(&lookup, DEPTH_LIMIT_VAR)? {
            self.limits.max_depth = depth;
        }

        if let Some(cost) = parse_var(&lookup, COST_LIMIT_VAR)? {
            self.limits.max_cost = cost;
        }

        Ok(self)
    }
}

impl Limits {
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            max_depth: self.max_depth,
            max_cost: self.max_cost,
        }
    }
}

impl CostConfig {
    pub fn cost_model(&self) -> CostModel {
        CostModel {
            connection_base_cost: self.connection_base_cost,
            unbounded_list_multiplier: self.unbounded_list_multiplier,
            pagination_arguments: self.pagination_arguments.clone(),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_cost: 1000,
        }
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            connection_base_cost: CONNECTION_BASE_COST,
            unbounded_list_multiplier: UNBOUNDED_LIST_MULTIPLIER,
            pagination_arguments: vec!["first".to_owned(), "last".to_owned()],
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(None);
    };

    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}
