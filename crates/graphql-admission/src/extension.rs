// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_graphql::{
    extensions::{Extension, ExtensionContext, ExtensionFactory, NextExecute, NextParseQuery},
    parser::types::ExecutableDocument,
    Response, ServerError, ServerResult, Variables,
};
use tokio::sync::Mutex;

use crate::config::GatewayConfig;
use crate::context::{CorrelationHints, GatewayState, RequestContext};
use crate::error::graphql_error_response;
use crate::pipeline::Pipeline;
use crate::stages::Admission;

/// Plugs the gateway into a schema. Documents are checked against the limits as soon as they are
/// parsed, which covers every way a schema can run an operation (including streamed queries and
/// subscriptions). Executions then pass through a [Pipeline] of stages.
///
/// Transports can attach [CorrelationHints] to the request's data, to supply a request id or a
/// span for the operation's logs.
#[derive(Clone)]
pub struct Gateway {
    admission: Arc<Admission>,
    pipeline: Arc<Pipeline>,
}

struct GatewayExt {
    admission: Arc<Admission>,
    pipeline: Arc<Pipeline>,
    parsed: Mutex<Option<(ExecutableDocument, Variables)>>,
}

impl Gateway {
    /// Admit documents according to `state`, and run executions through `pipeline`.
    pub fn new(state: Arc<GatewayState>, pipeline: Pipeline) -> Self {
        Self {
            admission: Arc::new(Admission::new(state)),
            pipeline: Arc::new(pipeline),
        }
    }

    /// The standard gateway, configured by `config`.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let state = Arc::new(GatewayState::new(config));
        Self::new(state.clone(), Pipeline::instrumented(state))
    }
}

impl ExtensionFactory for Gateway {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(GatewayExt {
            admission: self.admission.clone(),
            pipeline: self.pipeline.clone(),
            parsed: Mutex::new(None),
        })
    }
}

#[async_trait::async_trait]
impl Extension for GatewayExt {
    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let document = next.run(ctx, query, variables).await?;
        self.admission.check(&document).map_err(ServerError::from)?;

        *self.parsed.lock().await = Some((document.clone(), variables.clone()));
        Ok(document)
    }

    /// Runs once per execution, which for subscriptions means once per event.
    async fn execute(
        &self,
        ctx: &ExtensionContext<'_>,
        operation_name: Option<&str>,
        next: NextExecute<'_>,
    ) -> Response {
        let (document, variables) = match self.parsed.lock().await.as_ref() {
            Some((document, variables)) => (Some(document.clone()), variables.clone()),
            None => (None, Variables::default()),
        };

        let hints = ctx
            .data_opt::<CorrelationHints>()
            .cloned()
            .unwrap_or_default();

        let mut request = RequestContext::new(document)
            .with_variables(variables)
            .with_hints(hints);

        if let Some(name) = operation_name {
            request = request.with_operation_name(name);
        }

        self.pipeline
            .execute(&mut request, move |_| async move {
                Ok(next.run(ctx, operation_name).await)
            })
            .await
            .unwrap_or_else(graphql_error_response)
    }
}
