//! Router and connection configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};

/// Per-connection tuning forwarded to the connection factories.
///
/// The router never interprets these itself; they exist so one config block
/// can drive every backend and monitor connection the router creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Command retries inside the backend connection (0 = none).
    pub max_retries: u32,
    /// Minimum retry backoff in milliseconds.
    pub min_retry_backoff_ms: u64,
    /// Maximum retry backoff in milliseconds.
    pub max_retry_backoff_ms: u64,
    /// Dial timeout in milliseconds.
    pub dial_timeout_ms: u64,
    /// Read timeout in milliseconds.
    pub read_timeout_ms: u64,
    /// Write timeout in milliseconds.
    pub write_timeout_ms: u64,
    /// Connection pool size per backend.
    pub pool_size: usize,
    /// Wait timeout for a pooled connection in milliseconds.
    pub pool_timeout_ms: u64,
    /// Minimum idle connections kept per backend.
    pub min_idle_conns: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            min_retry_backoff_ms: 8,
            max_retry_backoff_ms: 512,
            dial_timeout_ms: 5_000,
            read_timeout_ms: 3_000,
            write_timeout_ms: 3_000,
            pool_size: 10,
            pool_timeout_ms: 4_000,
            min_idle_conns: 0,
        }
    }
}

/// Configuration for a [`FailoverRouter`](crate::router::FailoverRouter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Monitor endpoint addresses, tried in this order during discovery.
    pub monitor_addrs: Vec<String>,
    /// Master names, one shard per name.
    pub master_names: Vec<String>,
    /// Compatibility flag: leave shard names empty so deployments that
    /// predate named shards keep their operator-facing labels unchanged.
    #[serde(default)]
    pub empty_shard_names: bool,
    /// Routing weight assigned to every shard.
    pub shard_weight: u32,
    /// Virtual nodes per unit of weight on the hash ring.
    pub ring_replicas: usize,
    /// Pause before a watcher reconnects after losing its subscription, ms.
    pub resubscribe_delay_ms: u64,
    /// Tuning forwarded to backend and monitor connections.
    pub connection: ConnectionConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            monitor_addrs: Vec::new(),
            master_names: Vec::new(),
            empty_shard_names: false,
            shard_weight: 1,
            ring_replicas: 32,
            resubscribe_delay_ms: 1_000,
            connection: ConnectionConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Reject configurations the router cannot start from.
    pub fn validate(&self) -> Result<()> {
        if self.monitor_addrs.is_empty() {
            return Err(RouterError::InvalidConfig(
                "at least one monitor endpoint is required".to_string(),
            ));
        }
        if self.master_names.is_empty() {
            return Err(RouterError::InvalidConfig(
                "at least one master name is required".to_string(),
            ));
        }
        if self.shard_weight == 0 {
            return Err(RouterError::InvalidConfig(
                "shard_weight must be at least 1".to_string(),
            ));
        }
        if self.ring_replicas == 0 {
            return Err(RouterError::InvalidConfig(
                "ring_replicas must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Shard name for `master`, subject to the compatibility flag.
    pub fn shard_name(&self, master: &str) -> String {
        if self.empty_shard_names {
            String::new()
        } else {
            master.to_string()
        }
    }
}
