//! ShardedClient — key-routed command dispatch with hot-swappable bindings.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::connection::{BackendConnection, Command, Reply};
use crate::error::{Result, RouterError};
use crate::routing::ring::HashRing;

/// One shard: stable routing identity plus its current backend binding.
///
/// `id` and `weight` feed the hash ring and never change across failovers;
/// `conn` is the only mutable piece and is replaced, never shared, through
/// [`ShardedClient::change_shard_info`].
#[derive(Clone)]
pub struct ShardInfo {
    pub id: String,
    /// Operator-facing label; may be forced empty by the compatibility flag.
    pub name: String,
    pub weight: u32,
    pub conn: Arc<dyn BackendConnection>,
}

impl ShardInfo {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        weight: u32,
        conn: Arc<dyn BackendConnection>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight,
            conn,
        }
    }
}

/// The narrow capability a failover watcher needs: rebind one shard.
pub trait ShardRebind: Send + Sync {
    /// Replace the descriptor bound to `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not an existing shard id. Shard ids are fixed at
    /// construction; rebinding an unknown id is a programming error.
    fn change_shard_info(&self, id: &str, info: ShardInfo);
}

/// Facade routing each command to the shard owning its key.
///
/// The ring is immutable after construction; the `id → ShardInfo` bindings
/// live behind a read-favoring lock so dispatch stays cheap while failovers
/// swap connections underneath it.
pub struct ShardedClient {
    ring: HashRing,
    shards: RwLock<HashMap<String, Arc<ShardInfo>>>,
}

impl ShardedClient {
    /// Build a client from the full shard set.
    pub fn new(shards: Vec<ShardInfo>, replicas: usize) -> Result<Self> {
        if shards.is_empty() {
            return Err(RouterError::NoShards);
        }
        let pairs: Vec<(String, u32)> = shards
            .iter()
            .map(|s| (s.id.clone(), s.weight))
            .collect();
        let ring = HashRing::new(&pairs, replicas);
        let map = shards
            .into_iter()
            .map(|s| (s.id.clone(), Arc::new(s)))
            .collect();
        Ok(Self {
            ring,
            shards: RwLock::new(map),
        })
    }

    /// Shard id owning `key`.
    pub fn owner_of(&self, key: &str) -> Result<&str> {
        self.ring.owner_of(key).ok_or(RouterError::NoShards)
    }

    /// Route `cmd` to the shard owning `key` and forward it.
    ///
    /// Backend errors propagate verbatim; the router never retries a
    /// command. A dispatch racing a failover completes against whichever
    /// connection it captured.
    pub async fn dispatch(&self, key: &str, cmd: Command) -> Result<Reply> {
        let conn = self.connection_for(key)?;
        conn.execute(cmd).await
    }

    /// Current connection for the shard owning `key`.
    ///
    /// The read guard is dropped before any await, so swaps never wait on
    /// in-flight round trips.
    pub fn connection_for(&self, key: &str) -> Result<Arc<dyn BackendConnection>> {
        let id = self.owner_of(key)?;
        let shards = self.shards.read();
        let info = shards
            .get(id)
            .unwrap_or_else(|| panic!("shard id {id:?} on ring but unbound"));
        Ok(Arc::clone(&info.conn))
    }

    /// All shard ids, unordered.
    pub fn shard_ids(&self) -> Vec<String> {
        self.shards.read().keys().cloned().collect()
    }

    /// Address currently bound to `id`, if the shard exists.
    pub fn shard_addr(&self, id: &str) -> Option<String> {
        self.shards
            .read()
            .get(id)
            .map(|s| s.conn.addr().to_string())
    }
}

impl ShardRebind for ShardedClient {
    fn change_shard_info(&self, id: &str, info: ShardInfo) {
        let mut shards = self.shards.write();
        assert!(
            shards.contains_key(id),
            "change_shard_info: unknown shard id {id:?}"
        );
        shards.insert(id.to_string(), Arc::new(info));
    }
}
