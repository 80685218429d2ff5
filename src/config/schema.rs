//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the simulator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::model::HttpMethod;

/// Root configuration for the simulator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SimulatorConfig {
    /// API operator defaults.
    pub api: ApiConfig,

    /// Server-push stream settings.
    pub stream: StreamConfig,

    /// Message queue defaults.
    pub queue: QueueConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Informational API flavour shown by the options panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum ApiType {
    #[default]
    Rest,
    GraphQl,
    Grpc,
    WebSocket,
}

/// API operator defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Display title.
    pub title: String,

    /// URL of the endpoint every API starts with (and reverts to).
    pub default_endpoint_url: String,

    /// Methods supported by the default endpoint.
    pub default_methods: Vec<HttpMethod>,

    pub api_type: ApiType,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            default_endpoint_url: "api/posts".to_string(),
            default_methods: vec![
                HttpMethod::Get,
                HttpMethod::Post,
                HttpMethod::Put,
                HttpMethod::Delete,
            ],
            api_type: ApiType::Rest,
        }
    }
}

/// Server-push stream settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Delay between pushed frames in milliseconds.
    pub interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { interval_ms: 700 }
    }
}

/// Message queue defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub title: String,

    /// URL of the endpoint a queue advertises to its consumer.
    pub endpoint_url: String,

    pub methods: Vec<HttpMethod>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            title: "Message Queue".to_string(),
            endpoint_url: "queue/messages".to_string(),
            methods: vec![HttpMethod::Post],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record metrics through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}
