//! API topology simulator (demo runner)
//!
//! Builds a small in-process topology and drives one scenario through it.
//!
//! ```text
//!   Client ──▶ API ──▶ Service (echo)
//!              ▲
//!   Producer ──▶ MessageQueue   (consumer scenario)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;

use api_topology::config::{load_config, SimulatorConfig};
use api_topology::model::{ActionMethod, Endpoint, EndpointAction, EndpointRef, GrpcMode, HttpMethod, Protocol};
use api_topology::observability::{logging, metrics};
use api_topology::{Api, Client, DataOperator, MessageQueue, Service};

#[derive(Parser)]
#[command(name = "api-topology")]
#[command(about = "Drive a simulated API topology", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    scenario: Scenario,
}

#[derive(Subcommand)]
enum Scenario {
    /// Client → API → echo service, one GET
    Rest,
    /// WebSocket stream, then close it
    Websocket {
        /// How long to keep the stream open, in milliseconds
        #[arg(long, default_value_t = 2500)]
        duration_ms: u64,
    },
    /// gRPC server-streaming call
    GrpcServerStream {
        #[arg(long, default_value_t = 2500)]
        duration_ms: u64,
    },
    /// Producer → queue → consuming API → echo service
    Consumer {
        #[arg(long, default_value_t = 3)]
        messages: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SimulatorConfig::default(),
    };
    logging::init_logging(&config.observability);
    metrics::set_enabled(config.observability.metrics_enabled);

    tracing::info!(
        stream_interval_ms = config.stream.interval_ms,
        default_endpoint = %config.api.default_endpoint_url,
        "Configuration loaded"
    );

    match cli.scenario {
        Scenario::Rest => run_rest(&config).await?,
        Scenario::Websocket { duration_ms } => {
            let endpoint = Endpoint::new("ws/feed", vec![HttpMethod::Get]).with_protocol(Protocol::WebSockets);
            run_stream(&config, endpoint, duration_ms).await?
        }
        Scenario::GrpcServerStream { duration_ms } => {
            let endpoint = Endpoint::new("grpc/prices", vec![HttpMethod::Post])
                .with_protocol(Protocol::Grpc)
                .with_grpc_mode(GrpcMode::ServerStreaming);
            run_stream(&config, endpoint, duration_ms).await?
        }
        Scenario::Consumer { messages } => run_consumer(&config, messages).await?,
    }

    tracing::info!("Scenario complete");
    Ok(())
}

/// API whose default endpoint fans out to an echo service.
fn api_with_echo(config: &SimulatorConfig) -> (Arc<Api>, Arc<Service>) {
    let echo = Arc::new(Endpoint::new("echo", vec![HttpMethod::Get, HttpMethod::Post]));
    let service = Service::new("echo", vec![echo.clone()]);
    let api = Api::with_config(config);

    let endpoints = api
        .options()
        .endpoints
        .iter()
        .map(|ep| Arc::new((**ep).clone().with_action(EndpointAction::new(echo.clone(), ActionMethod::Inherit))))
        .collect();
    api.set_endpoints(endpoints);
    api.connect_to(service.as_ref(), true, false);
    (api, service)
}

fn log_api_events(api: &Api) {
    api.on_receive_data(|data| {
        tracing::info!(request_id = %data.request_id, response_id = %data.response_id, "API received data");
    });
    api.on_show_status_code(|status| tracing::info!(status = %status, "API status"));
}

async fn run_rest(config: &SimulatorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (api, _service) = api_with_echo(config);
    log_api_events(&api);
    let client = Client::new();
    client.connect_to(api.as_ref(), true, false);

    let endpoint = api.options().endpoints[0].clone();
    let id = client.send(EndpointRef::new(endpoint, HttpMethod::Get), json!({}), false).await?;
    tracing::info!(request_id = %id, responses = client.responses_for(&id).len(), "GET finished");

    let missing = Arc::new(Endpoint::new("api/missing", vec![HttpMethod::Get]));
    client.send(EndpointRef::new(missing, HttpMethod::Get), json!({}), false).await?;

    api.destroy();
    Ok(())
}

async fn run_stream(
    config: &SimulatorConfig,
    endpoint: Endpoint,
    duration_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = Arc::new(endpoint);
    let api = Api::with_config(config);
    api.set_endpoints(vec![endpoint.clone()]);
    log_api_events(&api);

    let client = Client::new();
    client.connect_to(api.as_ref(), true, false);
    client.on_receive_data(|frame| tracing::info!(response_id = %frame.response_id, "Frame pushed"));

    let method = endpoint.supported_methods[0];
    let id = client.send(EndpointRef::new(endpoint.clone(), method), json!({}), true).await?;
    tokio::time::sleep(Duration::from_millis(duration_ms)).await;

    client
        .send_frame(&id, EndpointRef::new(endpoint, method), json!({}), false)
        .await?;
    tracing::info!(frames = client.responses_for(&id).len(), "Stream closed");

    api.destroy();
    Ok(())
}

async fn run_consumer(config: &SimulatorConfig, messages: usize) -> Result<(), Box<dyn std::error::Error>> {
    let queue = MessageQueue::with_config(&config.queue);
    let (api, service) = api_with_echo(config);
    api.connect_to(queue.as_ref(), false, true);
    tracing::info!(is_consumer = api.is_consumer(), "Queue attached");

    // Consumer mode swapped the endpoints; route the queue endpoint to the echo service again.
    let echo = service.available_endpoints()[0].clone();
    let queue_endpoint = api.options().endpoints[0].clone();
    let routed = Arc::new((*queue_endpoint).clone().with_action(EndpointAction::new(echo, ActionMethod::Explicit(HttpMethod::Post))));
    queue.set_endpoints(vec![routed.clone()]);
    api.set_endpoints(vec![routed.clone()]);

    service.on_receive_data(|data| tracing::info!(payload = %data.data, "Service consumed message"));

    let producer = Client::new();
    producer.connect_to(queue.as_ref(), true, false);
    for n in 0..messages {
        producer
            .send(EndpointRef::new(routed.clone(), HttpMethod::Post), json!({ "n": n }), false)
            .await?;
    }
    tracing::info!(pending = queue.pending(), acks = producer.responses().len(), "Messages produced");

    api.destroy();
    Ok(())
}
