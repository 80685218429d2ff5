//! API operator: the request-routing and streaming protocol engine.
//!
//! # Data Flow
//! ```text
//! receive_data(data, from_output=true)            (response from downstream)
//!     → complete correlation → notify listeners
//!
//! receive_data(data, from_output=false)           (request from upstream)
//!     → validate id / endpoint
//!     → routing::resolve ── miss ──▶ status event (404 / 405)
//!     → correlation bound? ──▶ stream continuation (forward / terminate / violation)
//!     → bind correlation → notify listeners
//!     → client stream start? ──▶ wait for frames
//!     → server push? ──▶ spawn stream task
//!     → fan-out to actions over the output port
//!     → respond to origin (unless consumer)
//! ```
//!
//! # Design Decisions
//! - Options are swapped wholesale (ArcSwap); readers never block writers
//! - Side effects within one call keep their order: notify, fan-out, respond
//! - Routing misses are events, not errors

mod stream;
mod table;

pub use stream::StreamRegistry;
pub use table::{CorrelationTable, Slot};

use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::config::{ApiConfig, ApiType, SimulatorConfig};
use crate::error::{OperatorError, OperatorResult};
use crate::events::EventDispatcher;
use crate::model::{Endpoint, EndpointRef, GrpcMode, Header, HttpStatus, Protocol, RequestData};
use crate::net::{Connection, Port};
use crate::observability::metrics;
use crate::operator::{peer_operator, DataOperator, OperatorKind};
use crate::routing::{self, RouteMatch};
use crate::util::new_id;

/// User-editable options of an API operator.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub title: String,
    pub endpoints: Vec<Arc<Endpoint>>,
    /// Set while a message queue is the API's only input.
    pub is_consumer: bool,
    pub api_type: ApiType,
}

/// The API operator.
pub struct Api {
    me: Weak<Api>,
    origin_id: String,
    input_port: Arc<Port>,
    output_port: Arc<Port>,
    table: CorrelationTable,
    options: ArcSwap<ApiOptions>,
    config: ApiConfig,
    stream_interval_ms: u64,
    streams: StreamRegistry,
    receive_data_dispatcher: EventDispatcher<RequestData>,
    show_status_code_dispatcher: EventDispatcher<HttpStatus>,
}

impl Api {
    /// Create an API with the default `api/posts` endpoint.
    pub fn new() -> Arc<Self> {
        Self::with_config(&SimulatorConfig::default())
    }

    pub fn with_config(config: &SimulatorConfig) -> Arc<Self> {
        let options = ApiOptions {
            title: config.api.title.clone(),
            endpoints: vec![default_endpoint(&config.api)],
            is_consumer: false,
            api_type: config.api.api_type,
        };

        Arc::new_cyclic(|me: &Weak<Api>| {
            let parent: Weak<dyn DataOperator> = me.clone();
            Self {
                me: me.clone(),
                origin_id: new_id(),
                input_port: Port::new(parent.clone(), false, true),
                output_port: Port::new(parent, true, true),
                table: CorrelationTable::new(),
                options: ArcSwap::from_pointee(options),
                config: config.api.clone(),
                stream_interval_ms: config.stream.interval_ms,
                streams: StreamRegistry::new(),
                receive_data_dispatcher: EventDispatcher::new(),
                show_status_code_dispatcher: EventDispatcher::new(),
            }
        })
    }

    pub fn options(&self) -> Arc<ApiOptions> {
        self.options.load_full()
    }

    /// Endpoints currently served.
    pub fn endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.options.load().endpoints.clone()
    }

    /// Replace the endpoint table. Streams serving a removed endpoint stop on their next tick.
    pub fn set_endpoints(&self, endpoints: Vec<Arc<Endpoint>>) {
        self.options.rcu(|options| ApiOptions {
            endpoints: endpoints.clone(),
            ..(**options).clone()
        });
    }

    /// Current state of a correlation id.
    pub fn correlation(&self, id: &str) -> Option<Slot> {
        self.table.slot(id)
    }

    /// Number of running server-push streams.
    pub fn active_streams(&self) -> usize {
        self.streams.len()
    }

    pub fn on_receive_data<F>(&self, handler: F)
    where
        F: Fn(&RequestData) + Send + Sync + 'static,
    {
        self.receive_data_dispatcher.register(handler);
    }

    pub fn on_show_status_code<F>(&self, handler: F)
    where
        F: Fn(&HttpStatus) + Send + Sync + 'static,
    {
        self.show_status_code_dispatcher.register(handler);
    }

    /// Send a response back to the origin of the request it answers.
    ///
    /// The correlation is completed unless the response is a stream frame. A
    /// stream frame that can no longer be delivered ends the stream.
    pub async fn send_data(&self, response: RequestData) -> OperatorResult<()> {
        let id = response.response_id.clone();
        let streaming = response.header.stream;
        let connection = if streaming {
            self.table.bound(&id)
        } else {
            self.table.complete(&id)
        }
        .ok_or_else(|| OperatorError::MissingTargetConnection(id.clone()))?;

        let delivered = self.input_port.send_data(response, &connection).await?;
        if !delivered && streaming {
            tracing::debug!(request_id = %id, "Stream peer gone, closing correlation");
            self.terminate(&id);
        }
        Ok(())
    }

    /// Switch into consumer mode behind the queue on `consumer_connection`.
    pub fn initiate_consumer(&self, consumer_connection: &Connection) {
        for connection in self.input_port.connections() {
            if connection != *consumer_connection {
                self.input_port.remove_connection(&connection, true, false);
            }
        }

        let queue_endpoint = peer_operator(&self.input_port, consumer_connection)
            .and_then(|queue| queue.available_endpoints().into_iter().next());

        self.input_port.set_multiple_connections(false);
        self.options.rcu(|options| ApiOptions {
            is_consumer: true,
            endpoints: queue_endpoint.iter().cloned().collect(),
            ..(**options).clone()
        });

        tracing::info!(
            api = %self.origin_id,
            endpoint = ?queue_endpoint.as_ref().map(|e| e.url.as_str()),
            "API switched to consumer mode"
        );
    }

    /// True iff the only input connection leads to a message queue.
    pub fn is_consumer(&self) -> bool {
        let connections = self.input_port.connections();
        match connections.as_slice() {
            [only] => peer_operator(&self.input_port, only)
                .map(|peer| peer.kind() == OperatorKind::MessageQueue)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Endpoint adopted from the queue while in consumer mode.
    pub fn consuming_endpoint(&self) -> Option<Arc<Endpoint>> {
        if !self.options.load().is_consumer {
            return None;
        }
        let connection = self.input_port.connections().into_iter().next()?;
        peer_operator(&self.input_port, &connection)?
            .available_endpoints()
            .into_iter()
            .next()
    }

    fn revert_consumer(&self) {
        self.input_port.set_multiple_connections(true);
        let endpoint = default_endpoint(&self.config);
        self.options.rcu(|options| ApiOptions {
            is_consumer: false,
            endpoints: vec![endpoint.clone()],
            ..(**options).clone()
        });
        tracing::info!(api = %self.origin_id, "API left consumer mode");
    }

    async fn route(&self, data: RequestData, from_output: bool) -> OperatorResult<()> {
        if from_output {
            return self.accept_response(data);
        }
        self.accept_request(data).await
    }

    fn accept_response(&self, data: RequestData) -> OperatorResult<()> {
        if self.table.complete(&data.response_id).is_none() {
            return Err(OperatorError::MissingTargetConnection(data.response_id));
        }
        tracing::debug!(request_id = %data.response_id, "Downstream response received");
        self.receive_data_dispatcher.fire(&data);
        Ok(())
    }

    async fn accept_request(&self, data: RequestData) -> OperatorResult<()> {
        if data.request_id.is_empty() {
            return Err(OperatorError::InvalidRequestId);
        }
        let Some(endpoint_ref) = data.header.endpoint.clone() else {
            return Err(OperatorError::MissingEndpoint);
        };

        let options = self.options.load_full();
        let endpoint = match routing::resolve(&options.endpoints, &endpoint_ref.endpoint.url, endpoint_ref.method) {
            RouteMatch::Found(endpoint) => endpoint,
            miss => {
                if let Some(status) = miss.miss_status() {
                    self.show_status_code(status, &data);
                }
                return Ok(());
            }
        };

        let Some(origin) = data.origin.clone() else {
            if self.table.is_bound(&data.request_id) {
                return self.continue_stream(&endpoint, &data);
            }
            return Err(OperatorError::MissingOrigin(data.request_id));
        };
        if self.table.try_bind(&data.request_id, origin).is_err() {
            return self.continue_stream(&endpoint, &data);
        }
        metrics::record_request(OperatorKind::Api.as_str());
        tracing::debug!(
            request_id = %data.request_id,
            url = %endpoint.url,
            method = %endpoint_ref.method,
            stream = data.header.stream,
            "Request accepted"
        );
        self.receive_data_dispatcher.fire(&data);

        if data.header.stream && endpoint.grpc_mode == GrpcMode::ClientStreaming {
            return Ok(());
        }
        if data.header.stream && endpoint.is_server_push() {
            self.start_stream(&data, endpoint);
            return Ok(());
        }

        self.fan_out(&endpoint, &endpoint_ref).await?;

        if !self.options.load().is_consumer {
            let response = RequestData {
                header: Header {
                    protocol: data.header.protocol,
                    endpoint: data.header.endpoint.clone(),
                    stream: false,
                },
                data: Value::Object(Default::default()),
                origin: data.origin.clone(),
                origin_id: self.origin_id.clone(),
                request_id: new_id(),
                response_id: data.request_id.clone(),
            };
            self.send_data(response).await?;
        }
        Ok(())
    }

    /// A frame arrived for a correlation that is still bound.
    fn continue_stream(&self, endpoint: &Endpoint, data: &RequestData) -> OperatorResult<()> {
        let stream = data.header.stream;
        let id = &data.request_id;

        if endpoint.protocol == Protocol::WebSockets {
            if stream {
                self.receive_data_dispatcher.fire(data);
            } else {
                self.terminate(id);
            }
            return Ok(());
        }

        match endpoint.grpc_mode {
            GrpcMode::Unary => Err(OperatorError::ProtocolViolation {
                url: endpoint.url.clone(),
                reason: "client is connected to a stream but the endpoint is unary".into(),
            }),
            GrpcMode::ClientStreaming => {
                self.receive_data_dispatcher.fire(data);
                Ok(())
            }
            GrpcMode::ServerStreaming if stream => Err(OperatorError::ProtocolViolation {
                url: endpoint.url.clone(),
                reason: "client sent a stream frame to a server-only stream".into(),
            }),
            GrpcMode::BidirectionalStreaming if stream => {
                self.receive_data_dispatcher.fire(data);
                Ok(())
            }
            GrpcMode::ServerStreaming | GrpcMode::BidirectionalStreaming => {
                self.terminate(id);
                Ok(())
            }
        }
    }

    fn terminate(&self, id: &str) {
        self.table.complete(id);
        self.streams.stop(id);
        tracing::debug!(request_id = %id, "Stream terminated");
    }

    fn start_stream(&self, data: &RequestData, endpoint: Arc<Endpoint>) {
        let frame = RequestData {
            header: Header {
                protocol: data.header.protocol,
                endpoint: data.header.endpoint.clone(),
                stream: true,
            },
            data: Value::Object(Default::default()),
            origin: data.origin.clone(),
            origin_id: self.origin_id.clone(),
            request_id: String::new(),
            response_id: data.request_id.clone(),
        };

        let (generation, stop) = self.streams.register(&data.request_id);
        tokio::spawn(stream::run_stream(
            self.me.clone(),
            frame,
            endpoint,
            self.stream_interval_ms,
            generation,
            stop,
        ));
    }

    /// Stream tick check: correlation bound, endpoint still pushes and is still registered.
    fn should_keep_streaming(&self, id: &str, endpoint: &Arc<Endpoint>) -> bool {
        self.table.is_bound(id)
            && endpoint.is_server_push()
            && self
                .options
                .load()
                .endpoints
                .iter()
                .any(|registered| Arc::ptr_eq(registered, endpoint))
    }

    async fn fan_out(&self, endpoint: &Endpoint, inbound: &EndpointRef) -> OperatorResult<()> {
        for action in &endpoint.actions {
            let Some(target) = &action.endpoint else {
                continue;
            };
            if target.url.is_empty() {
                continue;
            }
            let Some(connection) = routing::select_connection(&self.output_port, target) else {
                tracing::debug!(url = %target.url, "No downstream operator serves action target");
                continue;
            };

            let method = action.method.resolve(inbound.method);
            let mut request = RequestData::request(EndpointRef::new(target.clone(), method), new_id());
            request.origin = Some(connection.clone());
            request.origin_id = self.origin_id.clone();

            self.table.bind(&request.request_id, connection.clone());
            metrics::record_fan_out(&target.url);
            tracing::debug!(
                request_id = %request.request_id,
                url = %target.url,
                method = %method,
                connection_id = %connection.id(),
                "Fan-out to action"
            );
            self.output_port.send_data(request, &connection).await?;
        }
        Ok(())
    }

    fn show_status_code(&self, status: HttpStatus, data: &RequestData) {
        tracing::info!(
            request_id = %data.request_id,
            url = ?data.url(),
            status = status.code(),
            "Routing miss"
        );
        metrics::record_status(status.code());
        self.show_status_code_dispatcher.fire(&status);
    }
}

impl DataOperator for Api {
    fn origin_id(&self) -> &str {
        &self.origin_id
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Api
    }

    fn port(&self, output: bool) -> Arc<Port> {
        if output {
            self.output_port.clone()
        } else {
            self.input_port.clone()
        }
    }

    fn available_endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.endpoints()
    }

    fn receive_data(&self, data: RequestData, from_output: bool) -> BoxFuture<'_, OperatorResult<()>> {
        Box::pin(self.route(data, from_output))
    }

    fn connect_to(
        &self,
        operator: &dyn DataOperator,
        connecting_with_output: bool,
        connecting_to_output: bool,
    ) -> Option<Connection> {
        let target = operator.port(connecting_to_output);
        if connecting_with_output {
            return self.output_port.connect_to(&target);
        }
        let connection = self.input_port.connect_to(&target)?;
        if operator.kind() == OperatorKind::MessageQueue {
            self.initiate_consumer(&connection);
        }
        Some(connection)
    }

    fn on_connection_remove(&self, _was_output: bool) {
        if self.options.load().is_consumer && !self.is_consumer() {
            self.revert_consumer();
        }
    }

    fn destroy(&self) {
        self.input_port.remove_connections();
        self.output_port.remove_connections();
        self.streams.stop_all();
        self.receive_data_dispatcher.clear();
        self.show_status_code_dispatcher.clear();
    }
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("origin_id", &self.origin_id)
            .field("input_port", &self.input_port)
            .field("output_port", &self.output_port)
            .field("options", &self.options.load())
            .field("streams", &self.streams.len())
            .finish()
    }
}

fn default_endpoint(config: &ApiConfig) -> Arc<Endpoint> {
    Arc::new(
        Endpoint::new(config.default_endpoint_url.clone(), config.default_methods.clone())
            .with_protocol(Protocol::Http),
    )
}
