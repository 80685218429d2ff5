//! Message queue: buffers produced messages and hands them to consumers.
//!
//! # Responsibilities
//! - Accept producer messages on the input port and acknowledge them
//! - Deliver buffered messages to consumers on the output port
//! - Advertise the endpoint a consuming API adopts
//!
//! # Design Decisions
//! - Consumers are picked round-robin
//! - With no consumer attached messages stay buffered until the next dispatch
//! - A message whose consumer vanished or failed mid-send goes back to the front

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::config::QueueConfig;
use crate::error::{OperatorError, OperatorResult};
use crate::events::EventDispatcher;
use crate::model::{Endpoint, EndpointRef, Header, RequestData};
use crate::net::{Connection, Port};
use crate::observability::metrics;
use crate::operator::{DataOperator, OperatorKind};
use crate::util::new_id;

/// A message queue operator.
pub struct MessageQueue {
    origin_id: String,
    title: String,
    input_port: Arc<Port>,
    output_port: Arc<Port>,
    endpoints: ArcSwap<Vec<Arc<Endpoint>>>,
    queue: Mutex<VecDeque<RequestData>>,
    counter: AtomicUsize,
    receive_data_dispatcher: EventDispatcher<RequestData>,
}

impl MessageQueue {
    pub fn new() -> Arc<Self> {
        Self::with_config(&QueueConfig::default())
    }

    pub fn with_config(config: &QueueConfig) -> Arc<Self> {
        let endpoint = Arc::new(Endpoint::new(config.endpoint_url.clone(), config.methods.clone()));
        let title = config.title.clone();
        Arc::new_cyclic(|me: &Weak<MessageQueue>| {
            let parent: Weak<dyn DataOperator> = me.clone();
            Self {
                origin_id: new_id(),
                title,
                input_port: Port::new(parent.clone(), false, true),
                output_port: Port::new(parent, true, true),
                endpoints: ArcSwap::from_pointee(vec![endpoint]),
                queue: Mutex::new(VecDeque::new()),
                counter: AtomicUsize::new(0),
                receive_data_dispatcher: EventDispatcher::new(),
            }
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Replace the advertised endpoints. Only the first is adopted by consumers.
    pub fn set_endpoints(&self, endpoints: Vec<Arc<Endpoint>>) {
        self.endpoints.store(Arc::new(endpoints));
    }

    /// Number of buffered messages.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    pub fn on_receive_data<F>(&self, handler: F)
    where
        F: Fn(&RequestData) + Send + Sync + 'static,
    {
        self.receive_data_dispatcher.register(handler);
    }

    /// Deliver buffered messages to consumers; returns how many were delivered.
    pub async fn dispatch(&self) -> OperatorResult<usize> {
        let mut delivered = 0;
        loop {
            let next = self.lock().pop_front();
            let Some(message) = next else {
                break;
            };
            let Some(connection) = self.next_consumer() else {
                self.lock().push_front(message);
                break;
            };
            let Some(request) = self.consumer_request(&message, &connection) else {
                self.lock().push_front(message);
                break;
            };

            tracing::debug!(
                queue = %self.title,
                request_id = %request.request_id,
                connection_id = %connection.id(),
                "Dispatching message"
            );
            match self.output_port.send_data(request, &connection).await {
                Ok(true) => delivered += 1,
                Ok(false) => {
                    self.lock().push_front(message);
                    break;
                }
                Err(e) => {
                    tracing::warn!(queue = %self.title, error = %e, "Consumer rejected message, keeping it queued");
                    self.lock().push_front(message);
                    return Err(e);
                }
            }
        }
        Ok(delivered)
    }

    fn consumer_request(&self, message: &RequestData, connection: &Connection) -> Option<RequestData> {
        let endpoint = self.endpoints.load().first().cloned()?;
        let method = message
            .header
            .endpoint
            .as_ref()
            .map(|e| e.method)
            .filter(|m| endpoint.supports(*m))
            .or_else(|| endpoint.supported_methods.first().copied())?;

        Some(RequestData {
            header: Header {
                protocol: endpoint.protocol,
                endpoint: Some(EndpointRef::new(endpoint.clone(), method)),
                stream: false,
            },
            data: message.data.clone(),
            origin: Some(connection.clone()),
            origin_id: self.origin_id.clone(),
            request_id: new_id(),
            response_id: String::new(),
        })
    }

    /// Round-robin over the output connections.
    fn next_consumer(&self) -> Option<Connection> {
        let connections = self.output_port.connections();
        if connections.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % connections.len();
        connections.into_iter().nth(index)
    }

    async fn route(&self, data: RequestData, from_output: bool) -> OperatorResult<()> {
        if from_output {
            tracing::debug!(queue = %self.title, response_id = %data.response_id, "Consumer reply dropped");
            return Ok(());
        }
        if data.request_id.is_empty() {
            return Err(OperatorError::InvalidRequestId);
        }

        metrics::record_request(OperatorKind::MessageQueue.as_str());
        self.receive_data_dispatcher.fire(&data);
        self.lock().push_back(data.clone());

        if let Some(origin) = &data.origin {
            let ack = RequestData {
                header: Header {
                    protocol: data.header.protocol,
                    endpoint: data.header.endpoint.clone(),
                    stream: false,
                },
                data: Value::Object(Default::default()),
                origin: Some(origin.clone()),
                origin_id: self.origin_id.clone(),
                request_id: new_id(),
                response_id: data.request_id.clone(),
            };
            self.input_port.send_data(ack, origin).await?;
        }

        self.dispatch().await?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<RequestData>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DataOperator for MessageQueue {
    fn origin_id(&self) -> &str {
        &self.origin_id
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::MessageQueue
    }

    fn port(&self, output: bool) -> Arc<Port> {
        if output {
            self.output_port.clone()
        } else {
            self.input_port.clone()
        }
    }

    fn available_endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.endpoints.load().as_ref().clone()
    }

    fn receive_data(&self, data: RequestData, from_output: bool) -> BoxFuture<'_, OperatorResult<()>> {
        Box::pin(self.route(data, from_output))
    }

    fn destroy(&self) {
        self.input_port.remove_connections();
        self.output_port.remove_connections();
        self.receive_data_dispatcher.clear();
    }
}
