//! Shardlink — sharded key-value client with automatic master failover.
//!
//! Keys are partitioned across independently replicated backend clusters by
//! a weighted consistent-hash ring. A set of monitor endpoints is watched
//! for master promotions; when one fires, the affected shard's connection is
//! rebound in place while the routing table stays untouched.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  Caller (dispatch)                │
//! ├──────────────────────────────────────────────────┤
//! │  FailoverRouter                                   │
//! │   ├─ ShardedClient                                │
//! │   │   ├─ HashRing (key → shard id)                │
//! │   │   └─ shard id → BackendConnection (hot-swap)  │
//! │   ├─ MasterDiscovery (monitor quorum)             │
//! │   └─ FailoverWatcher ×N (one per monitor)         │
//! ├──────────────────────────────────────────────────┤
//! │  BackendConnection / MonitorConnection (traits)   │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The backend wire protocol is deliberately out of scope: callers supply a
//! [`ConnectionFactory`] and [`MonitorConnector`] implementing the two
//! capability traits, and the router only ever speaks through those seams.

pub mod config;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod monitor;
pub mod router;
pub mod routing;

pub use config::{ConnectionConfig, RouterConfig};
pub use connection::{BackendConnection, Command, ConnectionFactory, MessageStream, Reply};
pub use error::{Result, RouterError};
pub use monitor::{FailoverEvent, MonitorConnection, MonitorConnector, FAILOVER_CHANNEL};
pub use router::FailoverRouter;
pub use routing::client::{ShardInfo, ShardRebind, ShardedClient};
pub use routing::ring::HashRing;
