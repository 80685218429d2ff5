//! Endpoint schema: routable URLs, their methods and streaming modes.
//!
//! # Design Decisions
//! - Endpoints are shared as `Arc<Endpoint>`; registration on an operator is
//!   identity based, so replacing an endpoint de-registers the old instance
//! - Route equality (`same_route`) is URL plus method-set equality
//! - Every endpoint carries a gRPC mode; plain HTTP endpoints stay `Unary`

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::util::set_equals;

/// Transport protocol of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum Protocol {
    #[default]
    Http,
    WebSockets,
    Grpc,
}

/// HTTP verbs an endpoint can support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method policy of a fan-out action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum ActionMethod {
    /// Reuse the method of the request that triggered the action.
    #[default]
    Inherit,
    Explicit(HttpMethod),
}

impl ActionMethod {
    /// Resolve the concrete method given the inbound one.
    pub fn resolve(&self, inbound: HttpMethod) -> HttpMethod {
        match self {
            ActionMethod::Inherit => inbound,
            ActionMethod::Explicit(method) => *method,
        }
    }
}

/// gRPC call shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum GrpcMode {
    #[default]
    Unary,
    ClientStreaming,
    ServerStreaming,
    BidirectionalStreaming,
}

/// A downstream target an endpoint fans out to.
#[derive(Debug, Clone, Default)]
pub struct EndpointAction {
    /// Target endpoint. Actions without a target are skipped.
    pub endpoint: Option<Arc<Endpoint>>,
    pub method: ActionMethod,
}

impl EndpointAction {
    pub fn new(endpoint: Arc<Endpoint>, method: ActionMethod) -> Self {
        Self {
            endpoint: Some(endpoint),
            method,
        }
    }
}

/// A routable address.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub protocol: Protocol,
    pub supported_methods: Vec<HttpMethod>,
    pub grpc_mode: GrpcMode,
    pub actions: Vec<EndpointAction>,
}

impl Endpoint {
    /// Create an HTTP endpoint.
    pub fn new(url: impl Into<String>, supported_methods: Vec<HttpMethod>) -> Self {
        Self {
            url: url.into(),
            protocol: Protocol::Http,
            supported_methods,
            grpc_mode: GrpcMode::Unary,
            actions: Vec::new(),
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_grpc_mode(mut self, mode: GrpcMode) -> Self {
        self.grpc_mode = mode;
        self
    }

    pub fn with_action(mut self, action: EndpointAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn supports(&self, method: HttpMethod) -> bool {
        self.supported_methods.contains(&method)
    }

    /// Same route iff URLs match and method sets are set-equal.
    pub fn same_route(&self, other: &Endpoint) -> bool {
        self.url == other.url && set_equals(&self.supported_methods, &other.supported_methods)
    }

    /// Whether this endpoint pushes frames back to a streaming caller.
    pub fn is_server_push(&self) -> bool {
        matches!(
            self.grpc_mode,
            GrpcMode::ServerStreaming | GrpcMode::BidirectionalStreaming
        ) || self.protocol == Protocol::WebSockets
    }
}

/// An endpoint plus the concrete method used by one message.
#[derive(Debug, Clone)]
pub struct EndpointRef {
    pub endpoint: Arc<Endpoint>,
    pub method: HttpMethod,
}

impl EndpointRef {
    pub fn new(endpoint: Arc<Endpoint>, method: HttpMethod) -> Self {
        Self { endpoint, method }
    }
}
