// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use async_graphql::{ErrorExtensionValues, ErrorExtensions, Response, ServerError};

use crate::analysis::ValidationResult;

/// Error codes for the `extensions.code` field of a GraphQL error produced by the gateway rather
/// than by a resolver.
/// `<https://www.apollographql.com/docs/apollo-server/data/errors/#built-in-error-codes>`
pub mod code {
    pub const QUERY_COMPLEXITY_EXCEEDED: &str = "QUERY_COMPLEXITY_EXCEEDED";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}

/// HTTP status a transport should answer with when a query is rejected for its complexity.
pub const REJECTION_STATUS: u16 = 400;

/// Message used when a validator reports an invalid verdict without explaining it.
const FALLBACK_REJECTION: &str = "Query complexity exceeds the configured limits";

/// A query was rejected before execution because it was too deep or too expensive.
///
/// Only the first violation is surfaced as the message, but the error always carries the full
/// measurements so that clients and logs retain the whole picture.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ComplexityError {
    pub message: String,
    pub depth: usize,
    pub cost: u64,
    pub max_depth: usize,
    pub max_cost: u64,
}

/// Failures that can come out of the request pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Rejected(#[from] ComplexityError),

    /// Whatever the executor failed with, passed through untouched.
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value:?} is not a non-negative integer")]
    InvalidEnv { var: &'static str, value: String },
}

impl ComplexityError {
    /// Build the rejection for a failed verdict, keeping only its first message.
    pub fn from_result(result: &ValidationResult) -> Self {
        Self {
            message: result
                .errors
                .first()
                .cloned()
                .unwrap_or_else(|| FALLBACK_REJECTION.to_owned()),
            depth: result.depth,
            cost: result.cost,
            max_depth: result.max_depth,
            max_cost: result.max_cost,
        }
    }

    pub fn status_code(&self) -> u16 {
        REJECTION_STATUS
    }
}

impl ErrorExtensions for ComplexityError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.message.clone()).extend_with(|_, e| {
            e.set("code", code::QUERY_COMPLEXITY_EXCEEDED);
            e.set("depth", self.depth as u64);
            e.set("cost", self.cost);
            e.set("maxDepth", self.max_depth as u64);
            e.set("maxCost", self.max_cost);
        })
    }
}

impl From<ComplexityError> for ServerError {
    fn from(err: ComplexityError) -> Self {
        let async_graphql::Error {
            message,
            source,
            extensions,
        } = err.extend();

        ServerError {
            message,
            source,
            locations: vec![],
            path: vec![],
            extensions,
        }
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Rejected(e) => e.into(),

            // Failures from the engine reach clients as internal errors, without a path since
            // they did not come from a resolver.
            PipelineError::Execution(e) => {
                let mut extensions = ErrorExtensionValues::default();
                extensions.set("code", code::INTERNAL_SERVER_ERROR);

                let mut error = ServerError::new(e.to_string(), None);
                error.extensions = Some(extensions);
                error
            }
        }
    }
}

/// Create a GraphQL Response for an error raised by the pipeline (outside of any resolver).
pub fn graphql_error_response(err: PipelineError) -> Response {
    Response::from_errors(vec![err.into()])
}
