// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_graphql::ServerError;
use serde_json::json;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::context::{GatewayState, OperationKind, RequestContext};
use crate::pipeline::{Next, Outcome, Stage};

/// Times the rest of the pipeline and logs how the operation concluded. Outcomes are passed back
/// unchanged, including failures.
pub struct Timing {
    state: Arc<GatewayState>,
}

impl Timing {
    pub fn new(state: Arc<GatewayState>) -> Self {
        Self { state }
    }
}

/// Milliseconds elapsed since `start`, rounded to two decimal places.
fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// The response's errors as a JSON list of `{message, path}`. Event fields are flat, so the list is
/// logged as one JSON string field.
fn summarize(errors: &[ServerError]) -> String {
    let errors: Vec<_> = errors
        .iter()
        .map(|e| json!({ "message": e.message, "path": e.path }))
        .collect();

    serde_json::to_string(&errors).unwrap_or_default()
}

#[async_trait::async_trait]
impl Stage for Timing {
    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> Outcome {
        let (start, name, ty, span) = match &ctx.trace {
            Some(trace) => (
                trace.start,
                trace.operation_name.clone(),
                trace.operation_type,
                trace.span.clone(),
            ),
            None => (
                Instant::now(),
                "unknown".to_owned(),
                OperationKind::Unknown,
                self.state.span.clone(),
            ),
        };

        let outcome = next.run(ctx).await;
        let duration_ms = elapsed_ms(start);

        match &outcome {
            Ok(response) if response.is_err() => warn!(
                parent: &span,
                duration_ms,
                errors = %summarize(&response.errors),
                "GraphQL {ty} {name} completed with errors in {duration_ms}ms"
            ),

            Ok(_) => info!(
                parent: &span,
                duration_ms,
                "GraphQL {ty} {name} completed in {duration_ms}ms"
            ),

            Err(e) => error!(
                parent: &span,
                duration_ms,
                error.message = %e,
                error.stack = ?e,
                "GraphQL {ty} {name} failed after {duration_ms}ms"
            ),
        }

        outcome
    }
}
