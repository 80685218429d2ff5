//! Consumer mode: an API whose only input is a message queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use futures_util::future::BoxFuture;
use serde_json::json;

use api_topology::model::{ActionMethod, Endpoint, EndpointAction, EndpointRef, HttpMethod, RequestData};
use api_topology::net::Port;
use api_topology::operator::api::Slot;
use api_topology::{Api, Client, DataOperator, MessageQueue, OperatorError, OperatorKind, OperatorResult, Service};

mod common;

/// Queue whose advertised endpoint fans out to the echo service.
fn forwarding_queue(echo: &Arc<Endpoint>) -> Arc<MessageQueue> {
    let queue = MessageQueue::new();
    let endpoint = Endpoint::new("queue/messages", vec![HttpMethod::Post])
        .with_action(EndpointAction::new(echo.clone(), ActionMethod::Inherit));
    queue.set_endpoints(vec![Arc::new(endpoint)]);
    queue
}

/// Consumer that rejects messages until switched on.
struct FlakyConsumer {
    input_port: Arc<Port>,
    output_port: Arc<Port>,
    failing: AtomicBool,
    received: Mutex<Vec<RequestData>>,
}

impl FlakyConsumer {
    fn new() -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<FlakyConsumer>| {
            let parent: Weak<dyn DataOperator> = me.clone();
            Self {
                input_port: Port::new(parent.clone(), false, true),
                output_port: Port::new(parent, true, true),
                failing: AtomicBool::new(true),
                received: Mutex::new(Vec::new()),
            }
        })
    }
}

impl DataOperator for FlakyConsumer {
    fn origin_id(&self) -> &str {
        "flaky"
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
        Vec::new()
    }

    fn receive_data(&self, data: RequestData, _from_output: bool) -> BoxFuture<'_, OperatorResult<()>> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(OperatorError::NotConnected("flaky".into()));
            }
            self.received.lock().unwrap().push(data);
            Ok(())
        })
    }
}

fn detach(api: &Api) {
    let port = api.port(false);
    for connection in port.connections() {
        assert!(port.remove_connection(&connection, true, true));
    }
}

#[tokio::test]
async fn test_attaching_queue_enters_consumer_mode() {
    let api = Api::new();
    let client = Client::new();
    assert!(client.connect_to(api.as_ref(), true, false).is_some());

    let queue = MessageQueue::new();
    assert!(api.connect_to(queue.as_ref(), false, true).is_some());

    assert!(api.is_consumer());
    assert!(api.options().is_consumer);
    assert!(client.port(true).connections().is_empty(), "Other inputs are pruned");
    assert_eq!(api.port(false).connection_count(), 1);
    assert!(!api.port(false).has_multiple_connections());

    let endpoints = api.options().endpoints.clone();
    assert_eq!(endpoints.len(), 1);
    assert!(Arc::ptr_eq(&endpoints[0], &queue.available_endpoints()[0]));
    assert!(Arc::ptr_eq(&api.consuming_endpoint().unwrap(), &endpoints[0]));

    // The single input slot is taken.
    let late = Client::new();
    assert!(late.connect_to(api.as_ref(), true, false).is_none());
}

#[tokio::test]
async fn test_detaching_queue_restores_defaults() {
    let api = Api::new();
    let queue = MessageQueue::new();

    for _ in 0..2 {
        assert!(api.connect_to(queue.as_ref(), false, true).is_some());
        assert!(api.options().is_consumer);

        detach(&api);
        assert!(!api.is_consumer());
        assert!(!api.options().is_consumer);
        assert!(api.port(false).has_multiple_connections());
        assert!(api.consuming_endpoint().is_none());

        let endpoint = api.options().endpoints[0].clone();
        assert_eq!(api.options().endpoints.len(), 1);
        assert_eq!(endpoint.url, "api/posts");
        assert_eq!(
            endpoint.supported_methods,
            vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete]
        );
    }
}

#[tokio::test]
async fn test_plain_client_does_not_trigger_consumer_mode() {
    let api = Api::new();
    let client = Client::new();
    assert!(client.connect_to(api.as_ref(), true, false).is_some());

    assert!(!api.is_consumer());
    assert!(!api.options().is_consumer);
    assert!(api.consuming_endpoint().is_none());
}

#[tokio::test]
async fn test_produced_message_reaches_downstream_service() {
    let echo = common::echo_endpoint();
    let service = Service::new("echo", vec![echo.clone()]);
    let received = common::record_service_data(&service);

    let queue = forwarding_queue(&echo);
    let api = Api::new();
    let api_data = common::record_api_data(&api);
    assert!(api.connect_to(queue.as_ref(), false, true).is_some());
    assert!(api.connect_to(service.as_ref(), true, false).is_some());

    let producer = Client::new();
    assert!(producer.connect_to(queue.as_ref(), true, false).is_some());
    let queue_ref = EndpointRef::new(queue.available_endpoints()[0].clone(), HttpMethod::Post);
    let id = producer.send(queue_ref, json!({ "order": 7 }), false).await.unwrap();

    // The queue acknowledged the producer.
    let acks = producer.responses_for(&id);
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].origin_id, queue.origin_id());

    // The payload reaches the consuming API; fan-out requests carry an empty body.
    let downstream = received.lock().unwrap().clone();
    assert_eq!(downstream.len(), 1);
    assert_eq!(downstream[0].data, json!({}));
    assert_eq!(downstream[0].header.endpoint.as_ref().unwrap().method, HttpMethod::Post);
    assert_eq!(queue.pending(), 0);

    // A consumer never answers the queue: its inbound correlation stays open.
    let seen = api_data.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].origin_id, queue.origin_id());
    assert_eq!(seen[0].data, json!({ "order": 7 }));
    assert!(matches!(api.correlation(&seen[0].request_id), Some(Slot::Bound(_))));
    assert_eq!(api.correlation(&downstream[0].request_id), Some(Slot::Completed));
}

#[tokio::test]
async fn test_messages_buffer_until_dispatch() {
    let echo = common::echo_endpoint();
    let service = Service::new("echo", vec![echo.clone()]);
    let received = common::record_service_data(&service);
    let queue = forwarding_queue(&echo);
    let api = Api::new();
    let api_data = common::record_api_data(&api);

    let producer = Client::new();
    assert!(producer.connect_to(queue.as_ref(), true, false).is_some());
    let queue_ref = EndpointRef::new(queue.available_endpoints()[0].clone(), HttpMethod::Post);
    for n in 0..2 {
        producer.send(queue_ref.clone(), json!({ "n": n }), false).await.unwrap();
    }
    assert_eq!(queue.pending(), 2);
    assert_eq!(producer.responses().len(), 2);

    assert!(api.connect_to(queue.as_ref(), false, true).is_some());
    assert!(api.connect_to(service.as_ref(), true, false).is_some());
    assert_eq!(queue.pending(), 2, "Attaching a consumer does not flush");

    assert_eq!(queue.dispatch().await.unwrap(), 2);
    assert_eq!(queue.pending(), 0);
    let consumed: Vec<_> = api_data
        .lock()
        .unwrap()
        .iter()
        .filter(|r| !r.is_response())
        .map(|r| r.data.clone())
        .collect();
    assert_eq!(consumed, vec![json!({ "n": 0 }), json!({ "n": 1 })]);
    assert_eq!(received.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_queue_round_robins_consumers() {
    let queue = MessageQueue::new();
    let first = Api::new();
    let second = Api::new();
    let first_data = common::record_api_data(&first);
    let second_data = common::record_api_data(&second);
    assert!(first.connect_to(queue.as_ref(), false, true).is_some());
    assert!(second.connect_to(queue.as_ref(), false, true).is_some());

    let producer = Client::new();
    assert!(producer.connect_to(queue.as_ref(), true, false).is_some());
    let queue_ref = EndpointRef::new(queue.available_endpoints()[0].clone(), HttpMethod::Post);
    for _ in 0..4 {
        producer.send(queue_ref.clone(), json!({}), false).await.unwrap();
    }

    assert_eq!(first_data.lock().unwrap().len(), 2);
    assert_eq!(second_data.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rejected_message_stays_queued() {
    let queue = MessageQueue::new();
    let consumer = FlakyConsumer::new();
    assert!(consumer.connect_to(queue.as_ref(), false, true).is_some());

    let producer = Client::new();
    assert!(producer.connect_to(queue.as_ref(), true, false).is_some());
    let queue_ref = EndpointRef::new(queue.available_endpoints()[0].clone(), HttpMethod::Post);

    let err = producer.send(queue_ref, json!({ "n": 1 }), false).await.unwrap_err();
    assert_eq!(err, OperatorError::NotConnected("flaky".into()));
    assert_eq!(producer.responses().len(), 1, "Producer was acked before dispatch");
    assert_eq!(queue.pending(), 1);

    consumer.failing.store(false, Ordering::SeqCst);
    assert_eq!(queue.dispatch().await.unwrap(), 1);
    assert_eq!(queue.pending(), 0);
    let received = consumer.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].data, json!({ "n": 1 }));
}
