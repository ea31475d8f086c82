//! Key routing: consistent-hash ring and the sharded client facade.

pub mod client;
pub mod ring;
