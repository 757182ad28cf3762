// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Admission control and request observability for a GraphQL gateway.
//!
//! Documents are measured (depth and estimated cost) and rejected before execution if they exceed
//! the configured limits. Admitted operations are annotated with a trace id and timed, and their
//! outcome is logged. [extension::Gateway] plugs admission control and a [pipeline::Pipeline] into
//! an `async_graphql::Schema`.

pub mod analysis;
pub mod config;
pub mod context;
pub mod error;
pub mod extension;
pub mod pipeline;
pub mod stages;

#[cfg(test)]
mod testing;

pub use analysis::{
    calculate_depth, estimate_cost, validate_query, ComplexityValidator, QueryValidator,
    ValidationOptions, ValidationResult,
};
pub use config::GatewayConfig;
pub use context::{CorrelationHints, GatewayState, RequestContext, TransportRequest};
pub use error::{ComplexityError, PipelineError};
pub use extension::Gateway;
pub use pipeline::{Next, Outcome, Pipeline, Stage};
