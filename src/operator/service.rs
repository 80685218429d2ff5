//! Downstream service: an endpoint operator that echoes requests.
//!
//! # Responsibilities
//! - Advertise endpoints so upstream APIs can route actions to it
//! - Answer every request through the connection it arrived on

use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;

use crate::error::{OperatorError, OperatorResult};
use crate::events::EventDispatcher;
use crate::model::{Endpoint, Header, RequestData};
use crate::net::Port;
use crate::observability::metrics;
use crate::operator::{DataOperator, OperatorKind};
use crate::util::new_id;

/// An echoing endpoint operator.
pub struct Service {
    origin_id: String,
    title: String,
    input_port: Arc<Port>,
    output_port: Arc<Port>,
    endpoints: ArcSwap<Vec<Arc<Endpoint>>>,
    receive_data_dispatcher: EventDispatcher<RequestData>,
}

impl Service {
    pub fn new(title: impl Into<String>, endpoints: Vec<Arc<Endpoint>>) -> Arc<Self> {
        let title = title.into();
        Arc::new_cyclic(|me: &Weak<Service>| {
            let parent: Weak<dyn DataOperator> = me.clone();
            Self {
                origin_id: new_id(),
                title,
                input_port: Port::new(parent.clone(), false, true),
                output_port: Port::new(parent, true, true),
                endpoints: ArcSwap::from_pointee(endpoints),
                receive_data_dispatcher: EventDispatcher::new(),
            }
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_endpoints(&self, endpoints: Vec<Arc<Endpoint>>) {
        self.endpoints.store(Arc::new(endpoints));
    }

    pub fn on_receive_data<F>(&self, handler: F)
    where
        F: Fn(&RequestData) + Send + Sync + 'static,
    {
        self.receive_data_dispatcher.register(handler);
    }

    async fn route(&self, data: RequestData, from_output: bool) -> OperatorResult<()> {
        if from_output {
            self.receive_data_dispatcher.fire(&data);
            return Ok(());
        }
        if data.request_id.is_empty() {
            return Err(OperatorError::InvalidRequestId);
        }
        let Some(origin) = data.origin.clone() else {
            return Err(OperatorError::MissingOrigin(data.request_id));
        };

        metrics::record_request(OperatorKind::Service.as_str());
        tracing::debug!(service = %self.title, request_id = %data.request_id, url = ?data.url(), "Service request");
        self.receive_data_dispatcher.fire(&data);

        let response = RequestData {
            header: Header {
                protocol: data.header.protocol,
                endpoint: data.header.endpoint.clone(),
                stream: false,
            },
            data: data.data.clone(),
            origin: Some(origin.clone()),
            origin_id: self.origin_id.clone(),
            request_id: new_id(),
            response_id: data.request_id.clone(),
        };
        self.input_port.send_data(response, &origin).await?;
        Ok(())
    }
}

impl DataOperator for Service {
    fn origin_id(&self) -> &str {
        &self.origin_id
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Service
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
