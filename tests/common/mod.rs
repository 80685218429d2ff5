//! Shared topology builders for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use api_topology::model::{ActionMethod, Endpoint, EndpointAction, EndpointRef, HttpMethod, HttpStatus, RequestData};
use api_topology::{Api, Client, DataOperator, Service, SimulatorConfig};

/// Client → API → echo service.
pub struct Topology {
    pub client: Arc<Client>,
    pub api: Arc<Api>,
    pub service: Arc<Service>,
    pub echo: Arc<Endpoint>,
}

impl Topology {
    /// The API's first endpoint.
    pub fn api_endpoint(&self) -> Arc<Endpoint> {
        self.api.endpoints()[0].clone()
    }

    pub fn get(&self) -> EndpointRef {
        EndpointRef::new(self.api_endpoint(), HttpMethod::Get)
    }
}

pub fn echo_endpoint() -> Arc<Endpoint> {
    Arc::new(Endpoint::new("echo", vec![HttpMethod::Get, HttpMethod::Post]))
}

/// Default API whose `api/posts` endpoint fans out to an echo service.
pub fn echo_topology(method: ActionMethod) -> Topology {
    echo_topology_with(&SimulatorConfig::default(), method)
}

pub fn echo_topology_with(config: &SimulatorConfig, method: ActionMethod) -> Topology {
    let echo = echo_endpoint();
    let service = Service::new("echo", vec![echo.clone()]);
    let api = Api::with_config(config);

    let endpoint = (*api.options().endpoints[0]).clone().with_action(EndpointAction::new(echo.clone(), method));
    api.set_endpoints(vec![Arc::new(endpoint)]);

    assert!(api.connect_to(service.as_ref(), true, false).is_some());
    let client = Client::new();
    assert!(client.connect_to(api.as_ref(), true, false).is_some());

    Topology { client, api, service, echo }
}

/// API with a single endpoint and a connected client.
pub fn streaming_topology(endpoint: Endpoint) -> (Arc<Api>, Arc<Client>, Arc<Endpoint>) {
    let mut config = SimulatorConfig::default();
    config.stream.interval_ms = 700;
    let api = Api::with_config(&config);
    let endpoint = Arc::new(endpoint);
    api.set_endpoints(vec![endpoint.clone()]);

    let client = Client::new();
    assert!(client.connect_to(api.as_ref(), true, false).is_some());
    (api, client, endpoint)
}

pub fn record_statuses(api: &Api) -> Arc<Mutex<Vec<HttpStatus>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    api.on_show_status_code(move |status| sink.lock().unwrap().push(*status));
    seen
}

pub fn record_api_data(api: &Api) -> Arc<Mutex<Vec<RequestData>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    api.on_receive_data(move |data| sink.lock().unwrap().push(data.clone()));
    seen
}

pub fn record_service_data(service: &Service) -> Arc<Mutex<Vec<RequestData>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    service.on_receive_data(move |data| sink.lock().unwrap().push(data.clone()));
    seen
}
