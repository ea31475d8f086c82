//! Master discovery and failover watching over the monitor endpoints.

pub mod resolve;
pub mod watch;
