//! Monitor protocol boundary.
//!
//! A monitor endpoint is an independent process that tracks master liveness
//! and announces promotions. The router needs two things from it: resolve
//! the current address of a named master, and a subscription that delivers
//! failover notifications.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::connection::MessageStream;
use crate::error::Result;

/// Channel carrying failover notifications.
pub const FAILOVER_CHANNEL: &str = "+switch-master";

/// A live connection to one monitor endpoint.
#[async_trait]
pub trait MonitorConnection: Send + Sync {
    /// Resolve the current master address for `name`.
    ///
    /// `Ok(None)` means this monitor does not know the master; the caller
    /// moves on to the next endpoint.
    async fn master_addr(&self, name: &str) -> Result<Option<(String, u16)>>;

    /// Subscribe to [`FAILOVER_CHANNEL`].
    async fn subscribe_failover(&self) -> Result<MessageStream>;
}

/// Builds monitor connections on demand.
#[async_trait]
pub trait MonitorConnector: Send + Sync {
    async fn connect(
        &self,
        addr: &str,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn MonitorConnection>>;
}

/// A parsed failover notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverEvent {
    pub master: String,
    pub old_addr: String,
    pub new_addr: String,
}

impl FailoverEvent {
    /// Parse the space-delimited payload carried on [`FAILOVER_CHANNEL`]:
    /// `<master> <old-host> <old-port> <new-host> <new-port>`.
    ///
    /// Returns `None` for anything that does not fit that shape; the caller
    /// logs and drops such payloads.
    pub fn parse(payload: &str) -> Option<Self> {
        let parts: Vec<&str> = payload.split(' ').collect();
        if parts.len() != 5 {
            return None;
        }
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        // Ports must at least be numeric; hosts are left uninterpreted.
        parts[2].parse::<u16>().ok()?;
        parts[4].parse::<u16>().ok()?;
        Some(Self {
            master: parts[0].to_string(),
            old_addr: format!("{}:{}", parts[1], parts[2]),
            new_addr: format!("{}:{}", parts[3], parts[4]),
        })
    }
}

/// Join a resolved `(host, port)` pair into the address form used
/// throughout the router.
pub(crate) fn join_host_port(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}
