//! Router error types.

use std::fmt;

/// Errors that can cross the router boundary.
///
/// Internal routing decisions (which monitor answered, whether a failover
/// event was stale) are resolved locally and never surface here; only
/// startup failures and dispatch-time backend errors do.
#[derive(Debug)]
pub enum RouterError {
    /// Configuration rejected before any I/O.
    InvalidConfig(String),
    /// The client was built with an empty shard set.
    NoShards,
    /// Every monitor endpoint failed to resolve a master's address.
    DiscoveryExhausted { master: String },
    /// Monitor transport failure (query or subscription).
    Monitor(String),
    /// Backend transport failure, propagated verbatim from the connection.
    Connection(String),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::NoShards => write!(f, "no shards configured"),
            Self::DiscoveryExhausted { master } => {
                write!(f, "all monitors failed to resolve master {master:?}")
            }
            Self::Monitor(msg) => write!(f, "monitor: {msg}"),
            Self::Connection(msg) => write!(f, "connection: {msg}"),
        }
    }
}

impl std::error::Error for RouterError {}

/// Result alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
