// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, sync::Arc};

use async_graphql::{
    parser::types::{ExecutableDocument, OperationType},
    Variables,
};
use tokio::time::Instant;
use tracing::Span;
use uuid::Uuid;

use crate::analysis::{ComplexityValidator, QueryValidator, ValidationOptions};
use crate::config::GatewayConfig;

/// Header carrying a correlation id chosen by the client or by an upstream proxy.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Looks up the value of a request header by (lower-case) name.
pub type HeaderReader = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// The transport's view of the request being served, if the operation arrived over one.
pub trait TransportRequest: Send + Sync {
    /// The identifier the transport assigned to this request, as a string.
    fn id(&self) -> Option<String>;

    /// A span the transport opened for this request. Operation spans are nested under it.
    fn span(&self) -> Option<Span> {
        None
    }
}

/// Where a correlation id for the request can come from, besides generating a fresh one.
#[derive(Clone, Default)]
pub struct CorrelationHints {
    pub request: Option<Arc<dyn TransportRequest>>,
    pub headers: Option<HeaderReader>,
}

/// Process-wide state shared by every request: the limits queries are held to, how they are
/// measured, and the span that stands in for a request logger when the transport does not offer
/// one. It is built once at start-up and only read after that.
#[derive(Clone)]
pub struct GatewayState {
    pub options: ValidationOptions,
    pub validator: Arc<dyn QueryValidator>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
    Unknown,
}

/// Everything the pipeline knows about one GraphQL operation. Each request owns its context, and
/// the context does not outlive the request.
pub struct RequestContext {
    /// The parsed document, if parsing succeeded.
    pub document: Option<ExecutableDocument>,
    /// The operation name the client asked for, if any.
    pub operation_name: Option<String>,
    pub variables: Variables,
    pub hints: CorrelationHints,
    /// Set once the observability stage has run.
    pub trace: Option<OperationTrace>,
}

/// Request-scoped annotations used to correlate and time the operation's log lines.
#[derive(Clone, Debug)]
pub struct OperationTrace {
    pub trace_id: String,
    pub span: Span,
    pub start: Instant,
    pub operation_name: String,
    pub operation_type: OperationKind,
}

impl CorrelationHints {
    pub fn with_request(self, request: impl TransportRequest + 'static) -> Self {
        Self {
            request: Some(Arc::new(request)),
            ..self
        }
    }

    pub fn with_header_reader(
        self,
        headers: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            headers: Some(Arc::new(headers)),
            ..self
        }
    }

    /// The correlation id for this request: the transport's own request id if there is one,
    /// otherwise the `x-request-id` header, otherwise a freshly generated id.
    pub fn trace_id(&self) -> String {
        self.request
            .as_ref()
            .and_then(|r| r.id())
            .or_else(|| self.headers.as_ref().and_then(|h| h(REQUEST_ID_HEADER)))
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// The span the transport opened for this request, if any.
    pub fn span(&self) -> Option<Span> {
        self.request.as_ref().and_then(|r| r.span())
    }
}

impl GatewayState {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            options: config.limits.validation_options(),
            validator: Arc::new(ComplexityValidator::new(config.cost.cost_model())),
            span: tracing::info_span!("graphql_gateway"),
        }
    }

    pub fn with_validator(self, validator: impl QueryValidator + 'static) -> Self {
        Self {
            validator: Arc::new(validator),
            ..self
        }
    }

    /// Use `span` as the parent of operations that do not come with a span of their own.
    pub fn with_span(self, span: Span) -> Self {
        Self { span, ..self }
    }
}

impl RequestContext {
    pub fn new(document: Option<ExecutableDocument>) -> Self {
        Self {
            document,
            operation_name: None,
            variables: Variables::default(),
            hints: CorrelationHints::default(),
            trace: None,
        }
    }

    pub fn with_operation_name(self, name: impl Into<String>) -> Self {
        Self {
            operation_name: Some(name.into()),
            ..self
        }
    }

    pub fn with_variables(self, variables: Variables) -> Self {
        Self { variables, ..self }
    }

    pub fn with_hints(self, hints: CorrelationHints) -> Self {
        Self { hints, ..self }
    }
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
            Self::Unknown => "unknown",
        }
    }
}

impl From<OperationType> for OperationKind {
    fn from(ty: OperationType) -> Self {
        match ty {
            OperationType::Query => Self::Query,
            OperationType::Mutation => Self::Mutation,
            OperationType::Subscription => Self::Subscription,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for CorrelationHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationHints")
            .field("request_id", &self.request.as_ref().and_then(|r| r.id()))
            .field("headers", &self.headers.is_some())
            .finish()
    }
}
