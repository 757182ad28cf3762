// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_graphql::parser::types::ExecutableDocument;
use tracing::warn;

use crate::context::{GatewayState, RequestContext};
use crate::error::ComplexityError;
use crate::pipeline::{Next, Outcome, Stage};

/// Admission control: rejects documents that are too deep or too expensive before any work is
/// spent executing them. Requests without a document (because parsing failed earlier) are let
/// through untouched.
pub struct Admission {
    state: Arc<GatewayState>,
}

impl Admission {
    pub fn new(state: Arc<GatewayState>) -> Self {
        Self { state }
    }

    /// Validate `document` against the configured limits. A rejection is logged before it is
    /// returned.
    pub fn check(&self, document: &ExecutableDocument) -> Result<(), ComplexityError> {
        let result = self.state.validator.validate(document, &self.state.options);
        if result.valid {
            return Ok(());
        }

        warn!(
            parent: &self.state.span,
            depth = result.depth,
            cost = result.cost,
            max_depth = result.max_depth,
            max_cost = result.max_cost,
            errors = ?result.errors,
            "GraphQL query rejected due to complexity"
        );

        Err(ComplexityError::from_result(&result))
    }
}

#[async_trait::async_trait]
impl Stage for Admission {
    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> Outcome {
        if let Some(document) = &ctx.document {
            self.check(document)?;
        }

        next.run(ctx).await
    }
}
