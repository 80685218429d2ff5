//! Client: originates requests and stream frames into the topology.
//!
//! # Responsibilities
//! - Send requests over the first outgoing connection
//! - Reuse a request id for further frames of a stream
//! - Record every response that comes back

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::{OperatorError, OperatorResult};
use crate::events::EventDispatcher;
use crate::model::{Endpoint, EndpointRef, RequestData};
use crate::net::Port;
use crate::operator::{DataOperator, OperatorKind};
use crate::util::new_id;

/// A request originator.
pub struct Client {
    origin_id: String,
    input_port: Arc<Port>,
    output_port: Arc<Port>,
    responses: Mutex<Vec<RequestData>>,
    receive_data_dispatcher: EventDispatcher<RequestData>,
}

impl Client {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Client>| {
            let parent: Weak<dyn DataOperator> = me.clone();
            Self {
                origin_id: new_id(),
                input_port: Port::new(parent.clone(), false, true),
                output_port: Port::new(parent, true, false),
                responses: Mutex::new(Vec::new()),
                receive_data_dispatcher: EventDispatcher::new(),
            }
        })
    }

    /// Send a new request; returns its request id.
    pub async fn send(&self, endpoint: EndpointRef, data: Value, stream: bool) -> OperatorResult<String> {
        let request_id = new_id();
        self.send_frame(&request_id, endpoint, data, stream).await?;
        Ok(request_id)
    }

    /// Send a frame under an explicit request id.
    pub async fn send_frame(
        &self,
        request_id: &str,
        endpoint: EndpointRef,
        data: Value,
        stream: bool,
    ) -> OperatorResult<()> {
        let connection = self
            .output_port
            .connections()
            .into_iter()
            .next()
            .ok_or_else(|| OperatorError::NotConnected(self.origin_id.clone()))?;

        let mut request = RequestData::request(endpoint, request_id)
            .with_stream(stream)
            .with_data(data)
            .with_origin(connection.clone());
        request.origin_id = self.origin_id.clone();

        tracing::debug!(request_id = %request_id, url = ?request.url(), stream, "Client frame");
        if !self.output_port.send_data(request, &connection).await? {
            return Err(OperatorError::NotConnected(self.origin_id.clone()));
        }
        Ok(())
    }

    /// Every response received so far, in arrival order.
    pub fn responses(&self) -> Vec<RequestData> {
        self.lock().clone()
    }

    pub fn responses_for(&self, request_id: &str) -> Vec<RequestData> {
        self.lock()
            .iter()
            .filter(|r| r.response_id == request_id)
            .cloned()
            .collect()
    }

    pub fn clear_responses(&self) {
        self.lock().clear();
    }

    pub fn on_receive_data<F>(&self, handler: F)
    where
        F: Fn(&RequestData) + Send + Sync + 'static,
    {
        self.receive_data_dispatcher.register(handler);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RequestData>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DataOperator for Client {
    fn origin_id(&self) -> &str {
        &self.origin_id
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Client
    }

    fn port(&self, output: bool) -> Arc<Port> {
        if output {
            self.output_port.clone()
        } else {
            self.input_port.clone()
        }
    }

    fn available_endpoints(&self) -> Vec<Arc<Endpoint>> {
        Vec::new()
    }

    fn receive_data(&self, data: RequestData, _from_output: bool) -> BoxFuture<'_, OperatorResult<()>> {
        Box::pin(async move {
            tracing::debug!(response_id = %data.response_id, stream = data.header.stream, "Client received");
            self.lock().push(data.clone());
            self.receive_data_dispatcher.fire(&data);
            Ok(())
        })
    }

    fn destroy(&self) {
        self.input_port.remove_connections();
        self.output_port.remove_connections();
        self.receive_data_dispatcher.clear();
    }
}
