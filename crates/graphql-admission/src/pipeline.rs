// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{future::Future, sync::Arc};

use async_graphql::Response;
use futures::future::{BoxFuture, FutureExt};

use crate::context::{GatewayState, RequestContext};
use crate::error::PipelineError;
use crate::stages::{Admission, Observability, Timing};

pub type Outcome = Result<Response, PipelineError>;

type Executor<'a> = Box<dyn FnOnce(&RequestContext) -> BoxFuture<'a, Outcome> + Send + 'a>;

/// One step in the handling of a request. A stage can inspect and annotate the request context,
/// and then either hand over to the rest of the pipeline by running `next`, or fail the request by
/// returning an error without running it.
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> Outcome;
}

/// The remainder of the pipeline, from the point of view of a stage: the stages after it, and the
/// executor that performs the operation once all stages have been passed.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    executor: Executor<'a>,
}

/// An ordered list of stages that every request is passed through before it is executed.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Next<'_> {
    pub async fn run(self, ctx: &mut RequestContext) -> Outcome {
        let Next { stages, executor } = self;
        match stages.split_first() {
            Some((stage, rest)) => {
                stage
                    .run(
                        ctx,
                        Next {
                            stages: rest,
                            executor,
                        },
                    )
                    .await
            }

            None => executor(ctx).await,
        }
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The gateway's stages: admission control, then request annotation, then timing of the
    /// execution itself.
    pub fn gateway(state: Arc<GatewayState>) -> Self {
        Self::new()
            .stage(Admission::new(state.clone()))
            .stage(Observability::new(state.clone()))
            .stage(Timing::new(state))
    }

    /// The gateway's stages without admission control, for callers that check documents as soon
    /// as they are parsed.
    pub fn instrumented(state: Arc<GatewayState>) -> Self {
        Self::new()
            .stage(Observability::new(state.clone()))
            .stage(Timing::new(state))
    }

    /// Append `stage` to the pipeline. It runs after all stages added before it.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Pass `ctx` through every stage, and then through `executor`, unless a stage stops the
    /// request first.
    pub async fn execute<'a, F, Fut>(&'a self, ctx: &mut RequestContext, executor: F) -> Outcome
    where
        F: FnOnce(&RequestContext) -> Fut + Send + 'a,
        Fut: Future<Output = Outcome> + Send + 'a,
    {
        let executor: Executor<'a> =
            Box::new(move |ctx: &RequestContext| -> BoxFuture<'a, Outcome> {
                executor(ctx).boxed()
            });

        Next {
            stages: self.stages.as_slice(),
            executor,
        }
        .run(ctx)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::ComplexityError;

    /// Records that it ran, and optionally stops the request.
    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        reject: bool,
    }

    #[async_trait::async_trait]
    impl Stage for Probe {
        async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> Outcome {
            self.log.lock().unwrap().push(self.name);
            if self.reject {
                return Err(ComplexityError {
                    message: format!("{} says no", self.name),
                    depth: 0,
                    cost: 0,
                    max_depth: 0,
                    max_cost: 0,
                }
                .into());
            }

            let outcome = next.run(ctx).await;
            self.log.lock().unwrap().push(self.name);
            outcome
        }
    }

    fn probe(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str, reject: bool) -> Probe {
        Probe {
            name,
            log: log.clone(),
            reject,
        }
    }

    #[tokio::test]
    async fn test_stages_wrap_executor_in_order() {
        let log = Arc::new(Mutex::new(vec![]));
        let pipeline = Pipeline::new()
            .stage(probe(&log, "a", false))
            .stage(probe(&log, "b", false));

        let mut ctx = RequestContext::new(None);
        let executed = log.clone();
        let outcome = pipeline
            .execute(&mut ctx, move |_| async move {
                executed.lock().unwrap().push("exec");
                Ok(Response::default())
            })
            .await;

        assert!(outcome.is_ok());
        assert_eq!(*log.lock().unwrap(), ["a", "b", "exec", "b", "a"]);
    }

    #[tokio::test]
    async fn test_rejection_short_circuits() {
        let log = Arc::new(Mutex::new(vec![]));
        let pipeline = Pipeline::new()
            .stage(probe(&log, "a", false))
            .stage(probe(&log, "b", true))
            .stage(probe(&log, "c", false));

        let mut ctx = RequestContext::new(None);
        let executed = log.clone();
        let outcome = pipeline
            .execute(&mut ctx, move |_| async move {
                executed.lock().unwrap().push("exec");
                Ok(Response::default())
            })
            .await;

        let Err(PipelineError::Rejected(err)) = outcome else {
            panic!("Expected the second stage to reject the request");
        };

        assert_eq!(err.message, "b says no");
        assert_eq!(*log.lock().unwrap(), ["a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_executes() {
        let mut ctx = RequestContext::new(None).with_operation_name("Op");
        let outcome = Pipeline::new()
            .execute(&mut ctx, |ctx| {
                let name = ctx.operation_name.clone();
                async move {
                    assert_eq!(name.as_deref(), Some("Op"));
                    Ok(Response::default())
                }
            })
            .await;

        assert!(outcome.is_ok());
    }
}
