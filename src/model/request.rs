//! The message envelope exchanged between operators.

use serde_json::Value;

use crate::model::endpoint::{EndpointRef, Protocol};
use crate::net::Connection;

/// Envelope header.
#[derive(Debug, Clone, Default)]
pub struct Header {
    pub protocol: Protocol,
    pub endpoint: Option<EndpointRef>,
    /// Frame belongs to a stream (client stream frame or server push).
    pub stream: bool,
}

/// One message travelling across a connection.
///
/// `request_id` correlates a request with its eventual response; a response
/// carries the original request id in `response_id`.
#[derive(Debug, Clone, Default)]
pub struct RequestData {
    pub header: Header,
    pub data: Value,
    /// Connection the message arrived on or must be returned via.
    pub origin: Option<Connection>,
    /// Id of the operator that created the message.
    pub origin_id: String,
    pub request_id: String,
    pub response_id: String,
}

impl RequestData {
    /// Build a request for `endpoint` with an empty JSON object payload.
    pub fn request(endpoint: EndpointRef, request_id: impl Into<String>) -> Self {
        Self {
            header: Header {
                protocol: endpoint.endpoint.protocol,
                endpoint: Some(endpoint),
                stream: false,
            },
            data: Value::Object(Default::default()),
            request_id: request_id.into(),
            ..Default::default()
        }
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.header.stream = stream;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_origin(mut self, origin: Connection) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn is_response(&self) -> bool {
        !self.response_id.is_empty()
    }

    /// URL of the referenced endpoint, if any.
    pub fn url(&self) -> Option<&str> {
        self.header.endpoint.as_ref().map(|e| e.endpoint.url.as_str())
    }
}
