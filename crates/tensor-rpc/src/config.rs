//! Client and worker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tensor_rpc_protocol::ProtocolConfig;

/// Configuration for a [`MasterClient`](crate::MasterClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Encoder settings for outgoing calls.
    pub protocol: ProtocolConfig,

    /// How long [`call_with_reply`](crate::MasterClient::call_with_reply)
    /// waits for the worker's answer. `None` waits forever.
    ///
    /// A worker sends nothing back when a handler fails, so without a limit
    /// the master would block on that call indefinitely.
    pub reply_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            reply_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Configuration for a [`Worker`](crate::Worker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Name used in log output.
    pub name: String,

    /// How long to wait for the next message before giving up on the
    /// master. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "worker".to_string(),
            idle_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl WorkerConfig {
    /// Default config with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
