// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Static analysis of GraphQL documents, performed before they are executed, to decide whether
//! they should be admitted.

use async_graphql::parser::types::ExecutableDocument;
use serde::{Deserialize, Serialize};

use self::cost::CostModel;

pub mod cost;
pub mod depth;
pub(crate) mod fragments;

pub use cost::estimate_cost;
pub use depth::calculate_depth;

/// Limits a document is validated against.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOptions {
    pub max_depth: usize,
    pub max_cost: u64,
}

/// The outcome of validating a document, including its measurements whether or not it passed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub depth: usize,
    pub cost: u64,
    pub max_depth: usize,
    pub max_cost: u64,
    pub errors: Vec<String>,
}

/// Decides whether a document may be executed.
pub trait QueryValidator: Send + Sync {
    fn validate(
        &self,
        document: &ExecutableDocument,
        options: &ValidationOptions,
    ) -> ValidationResult;
}

/// Validates documents by their depth and their estimated cost.
#[derive(Clone, Debug, Default)]
pub struct ComplexityValidator {
    model: CostModel,
}

/// Validate `document` against `options` using the default cost model.
pub fn validate_query(document: &ExecutableDocument, options: &ValidationOptions) -> ValidationResult {
    ComplexityValidator::default().validate(document, options)
}

impl ComplexityValidator {
    pub fn new(model: CostModel) -> Self {
        Self { model }
    }
}

impl QueryValidator for ComplexityValidator {
    fn validate(
        &self,
        document: &ExecutableDocument,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let &ValidationOptions {
            max_depth,
            max_cost,
        } = options;

        let depth = calculate_depth(document);
        let cost = self.model.estimate(document);

        let mut errors = vec![];
        if depth > max_depth {
            errors.push(format!(
                "Query depth of {depth} exceeds maximum allowed depth of {max_depth}"
            ));
        }

        if cost > max_cost {
            errors.push(format!(
                "Query cost of {cost} exceeds maximum allowed cost of {max_cost}"
            ));
        }

        ValidationResult {
            valid: errors.is_empty(),
            depth,
            cost,
            max_depth,
            max_cost,
            errors,
        }
    }
}
