//! Routing, fan-out and correlation tests for the API operator.

use std::sync::Arc;

use serde_json::json;

use api_topology::model::{ActionMethod, Endpoint, EndpointAction, EndpointRef, HttpMethod, HttpStatus, RequestData};
use api_topology::operator::api::Slot;
use api_topology::{Api, Client, DataOperator, OperatorError, Service};

mod common;

#[tokio::test]
async fn test_unknown_url_reports_404_once() {
    let topo = common::echo_topology(ActionMethod::Inherit);
    let statuses = common::record_statuses(&topo.api);
    let received = common::record_service_data(&topo.service);

    let missing = Arc::new(Endpoint::new("api/comments", vec![HttpMethod::Get]));
    let id = topo
        .client
        .send(EndpointRef::new(missing, HttpMethod::Get), json!({}), false)
        .await
        .unwrap();

    assert_eq!(*statuses.lock().unwrap(), vec![HttpStatus::NotFound]);
    assert!(received.lock().unwrap().is_empty(), "No fan-out on 404");
    assert!(topo.client.responses().is_empty());
    assert_eq!(topo.api.correlation(&id), None);
}

#[tokio::test]
async fn test_unsupported_method_reports_405() {
    let topo = common::echo_topology(ActionMethod::Inherit);
    let statuses = common::record_statuses(&topo.api);
    let received = common::record_service_data(&topo.service);

    topo.client
        .send(EndpointRef::new(topo.api_endpoint(), HttpMethod::Patch), json!({}), false)
        .await
        .unwrap();

    assert_eq!(*statuses.lock().unwrap(), vec![HttpStatus::MethodNotAllowed]);
    assert!(received.lock().unwrap().is_empty(), "No fan-out on 405");
    assert!(topo.client.responses().is_empty());
}

#[tokio::test]
async fn test_get_fans_out_and_responds() {
    let topo = common::echo_topology(ActionMethod::Inherit);
    let received = common::record_service_data(&topo.service);
    let api_data = common::record_api_data(&topo.api);

    let id = topo.client.send(topo.get(), json!({ "q": 1 }), false).await.unwrap();

    // One request reached the echo service, with the inherited method.
    let downstream = received.lock().unwrap().clone();
    assert_eq!(downstream.len(), 1);
    let forwarded = downstream[0].header.endpoint.as_ref().unwrap();
    assert_eq!(forwarded.endpoint.url, "echo");
    assert_eq!(forwarded.method, HttpMethod::Get);
    assert_eq!(downstream[0].origin_id, topo.api.origin_id());
    assert_ne!(downstream[0].request_id, id);

    // The API saw the inbound request first, then the echo response.
    let seen = api_data.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].request_id, id);
    assert_eq!(seen[1].response_id, downstream[0].request_id);
    assert_eq!(topo.api.correlation(&downstream[0].request_id), Some(Slot::Completed));

    // Exactly one empty-payload response went back to the client.
    let responses = topo.client.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].response_id, id);
    assert_eq!(responses[0].data, json!({}));
    assert!(!responses[0].header.stream);
    assert_eq!(topo.api.correlation(&id), Some(Slot::Completed));
}

#[tokio::test]
async fn test_second_response_to_completed_id_fails() {
    let topo = common::echo_topology(ActionMethod::Inherit);
    let id = topo.client.send(topo.get(), json!({}), false).await.unwrap();

    let mut late = RequestData::request(topo.get(), "late");
    late.response_id = id.clone();
    let err = topo.api.send_data(late).await.unwrap_err();
    assert_eq!(err, OperatorError::MissingTargetConnection(id));
    assert_eq!(topo.client.responses().len(), 1);
}

#[tokio::test]
async fn test_explicit_action_method() {
    let topo = common::echo_topology(ActionMethod::Explicit(HttpMethod::Post));
    let received = common::record_service_data(&topo.service);

    topo.client.send(topo.get(), json!({}), false).await.unwrap();

    let downstream = received.lock().unwrap().clone();
    assert_eq!(downstream[0].header.endpoint.as_ref().unwrap().method, HttpMethod::Post);
}

#[tokio::test]
async fn test_action_without_serving_operator_is_skipped() {
    let api = Api::new();
    let elsewhere = Arc::new(Endpoint::new("nowhere", vec![HttpMethod::Get]));
    let narrower = Arc::new(Endpoint::new("echo", vec![HttpMethod::Get]));
    let endpoint = (*api.options().endpoints[0])
        .clone()
        .with_action(EndpointAction::new(elsewhere, ActionMethod::Inherit))
        .with_action(EndpointAction::new(narrower, ActionMethod::Inherit))
        .with_action(EndpointAction::default());
    api.set_endpoints(vec![Arc::new(endpoint)]);

    // The service serves echo with GET+POST; the action wants GET only.
    let service = Service::new("echo", vec![common::echo_endpoint()]);
    let received = common::record_service_data(&service);
    api.connect_to(service.as_ref(), true, false).unwrap();
    let client = Client::new();
    client.connect_to(api.as_ref(), true, false).unwrap();

    let get = EndpointRef::new(api.options().endpoints[0].clone(), HttpMethod::Get);
    let id = client.send(get, json!({}), false).await.unwrap();

    assert!(received.lock().unwrap().is_empty());
    assert_eq!(client.responses_for(&id).len(), 1);
}

#[tokio::test]
async fn test_fan_out_picks_serving_connection() {
    let topo = common::echo_topology(ActionMethod::Inherit);
    let other = Service::new("other", vec![Arc::new(Endpoint::new("other", vec![HttpMethod::Get]))]);
    let other_seen = common::record_service_data(&other);
    let echo_seen = common::record_service_data(&topo.service);

    // Connected after the echo service, but must not receive echo traffic.
    topo.api.connect_to(other.as_ref(), true, false).unwrap();
    topo.client.send(topo.get(), json!({}), false).await.unwrap();

    assert_eq!(echo_seen.lock().unwrap().len(), 1);
    assert!(other_seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_validation_errors_leave_no_state() {
    let topo = common::echo_topology(ActionMethod::Inherit);
    let api_data = common::record_api_data(&topo.api);
    let origin = topo.client.port(true).connections()[0].clone();

    let no_id = RequestData::request(topo.get(), "").with_origin(origin.clone());
    assert_eq!(
        topo.api.receive_data(no_id, false).await.unwrap_err(),
        OperatorError::InvalidRequestId
    );

    let mut no_endpoint = RequestData::request(topo.get(), "r-1").with_origin(origin);
    no_endpoint.header.endpoint = None;
    assert_eq!(
        topo.api.receive_data(no_endpoint, false).await.unwrap_err(),
        OperatorError::MissingEndpoint
    );

    let no_origin = RequestData::request(topo.get(), "r-2");
    assert_eq!(
        topo.api.receive_data(no_origin, false).await.unwrap_err(),
        OperatorError::MissingOrigin("r-2".into())
    );

    assert!(api_data.lock().unwrap().is_empty());
    assert_eq!(topo.api.correlation("r-1"), None);
    assert_eq!(topo.api.correlation("r-2"), None);
}

#[tokio::test]
async fn test_unknown_response_id_fails() {
    let api = Api::new();
    let mut response = RequestData::default();
    response.response_id = "never-sent".into();

    let err = api.receive_data(response, true).await.unwrap_err();
    assert_eq!(err, OperatorError::MissingTargetConnection("never-sent".into()));
}

#[tokio::test]
async fn test_client_without_connection() {
    let client = Client::new();
    let endpoint = Arc::new(Endpoint::new("api/posts", vec![HttpMethod::Get]));
    let err = client
        .send(EndpointRef::new(endpoint, HttpMethod::Get), json!({}), false)
        .await
        .unwrap_err();
    assert!(matches!(err, OperatorError::NotConnected(_)));
}

#[tokio::test]
async fn test_destroy_severs_both_ports() {
    let topo = common::echo_topology(ActionMethod::Inherit);
    let statuses = common::record_statuses(&topo.api);
    topo.api.destroy();

    assert_eq!(topo.api.port(false).connection_count(), 0);
    assert_eq!(topo.api.port(true).connection_count(), 0);
    assert_eq!(topo.client.port(true).connection_count(), 0);
    assert_eq!(topo.service.port(false).connection_count(), 0);

    // Listeners were torn down with the operator.
    let missing = Arc::new(Endpoint::new("x", vec![HttpMethod::Get]));
    let api = topo.api.clone();
    let client = Client::new();
    client.connect_to(api.as_ref(), true, false).unwrap();
    client
        .send(EndpointRef::new(missing, HttpMethod::Get), json!({}), false)
        .await
        .unwrap();
    assert!(statuses.lock().unwrap().is_empty());
}
