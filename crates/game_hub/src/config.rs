//! Runtime configuration of the hub library.

use crate::connection::ConnectionConfig;
use crate::registry::DEFAULT_MAILBOX_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by the HTTP surface, the registry and every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Address the server binds to
    pub bind_address: String,
    /// Per-client outbound queue capacity before a client is evicted
    pub outbound_queue_capacity: usize,
    /// Per-session event mailbox capacity
    pub event_queue_capacity: usize,
    /// Largest accepted inbound frame, in bytes
    pub max_message_size: usize,
    /// Deadline for a single transport write, in seconds
    pub write_wait_secs: u64,
    /// Deadline for receiving a liveness acknowledgment, in seconds
    pub pong_wait_secs: u64,
    /// Origins allowed to open a game connection. Empty accepts any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            outbound_queue_capacity: 256,
            event_queue_capacity: DEFAULT_MAILBOX_CAPACITY,
            max_message_size: 512,
            write_wait_secs: 10,
            pong_wait_secs: 60,
            allowed_origins: Vec::new(),
        }
    }
}

impl HubConfig {
    /// Per-connection settings. Probes go out at nine tenths of the
    /// liveness deadline.
    pub fn connection_config(&self) -> ConnectionConfig {
        let pong_wait = Duration::from_secs(self.pong_wait_secs);
        ConnectionConfig {
            outbound_capacity: self.outbound_queue_capacity,
            write_wait: Duration::from_secs(self.write_wait_secs),
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            max_message_size: self.max_message_size,
        }
    }

    /// Whether an upgrade request from `origin` may proceed.
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|origin| self.allowed_origins.iter().any(|allowed| allowed == origin))
    }
}
