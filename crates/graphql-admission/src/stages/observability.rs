// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_graphql::parser::types::ExecutableDocument;
use tokio::time::Instant;
use tracing::{debug, info_span, Instrument};

use crate::context::{GatewayState, OperationKind, OperationTrace, RequestContext};
use crate::pipeline::{Next, Outcome, Stage};

/// Annotates the request with what is needed to correlate and time its log lines: a trace id, a
/// span carrying the operation's name and type, and the time at which handling started. This stage
/// never fails the request.
pub struct Observability {
    state: Arc<GatewayState>,
}

impl Observability {
    pub fn new(state: Arc<GatewayState>) -> Self {
        Self { state }
    }
}

/// The name and type of the operation that will be executed.
///
/// If the client named an operation that the document defines, that is the one. Otherwise it is
/// the first operation in the document (in source order).
pub fn operation_details(
    document: Option<&ExecutableDocument>,
    requested: Option<&str>,
) -> (String, OperationKind) {
    let unknown = || {
        (
            requested.unwrap_or("unknown").to_owned(),
            OperationKind::Unknown,
        )
    };

    let Some(document) = document else {
        return unknown();
    };

    if let Some(requested) = requested {
        let found = document
            .operations
            .iter()
            .find(|(name, _)| name.is_some_and(|n| n.as_str() == requested));

        if let Some((_, op)) = found {
            return (requested.to_owned(), op.node.ty.into());
        }
    }

    let first = document
        .operations
        .iter()
        .min_by_key(|(_, op)| (op.pos.line, op.pos.column));

    match first {
        Some((name, op)) => (
            name.map_or("anonymous", |n| n.as_str()).to_owned(),
            op.node.ty.into(),
        ),
        None => unknown(),
    }
}

#[async_trait::async_trait]
impl Stage for Observability {
    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> Outcome {
        let trace_id = ctx.hints.trace_id();
        let (operation_name, operation_type) =
            operation_details(ctx.document.as_ref(), ctx.operation_name.as_deref());

        let parent = ctx.hints.span().unwrap_or_else(|| self.state.span.clone());
        let span = info_span!(
            parent: &parent,
            "graphql",
            trace_id = %trace_id,
            operation_name = %operation_name,
            operation_type = %operation_type,
        );

        debug!(
            parent: &span,
            variables = %serde_json::to_string(&ctx.variables).unwrap_or_default(),
            "GraphQL {operation_type} {operation_name} started"
        );

        ctx.trace = Some(OperationTrace {
            trace_id,
            span: span.clone(),
            start: Instant::now(),
            operation_name,
            operation_type,
        });

        next.run(ctx).instrument(span).await
    }
}
