//! FailoverRouter — assembly and lifecycle of the sharded failover client.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::RouterConfig;
use crate::connection::{Command, ConnectionFactory, Reply};
use crate::discovery::resolve::MasterDiscovery;
use crate::discovery::watch::FailoverWatcher;
use crate::error::Result;
use crate::monitor::MonitorConnector;
use crate::routing::client::{ShardInfo, ShardRebind, ShardedClient};

/// A sharded client wired to its monitor endpoints.
///
/// Construction resolves every configured master through the monitor
/// quorum, builds one shard per master, and starts one failover watcher per
/// monitor endpoint. After that the routing table never changes; failovers
/// only rebind connections.
pub struct FailoverRouter {
    client: Arc<ShardedClient>,
    watcher: Arc<FailoverWatcher>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl FailoverRouter {
    /// Discover all masters, build the sharded client, and start watching.
    ///
    /// Fails if the configuration is unusable, if any master cannot be
    /// resolved by any monitor, or if the initial connection to a resolved
    /// master cannot be built. These are the only fatal conditions; once
    /// running, the router heals itself.
    pub async fn connect(
        config: RouterConfig,
        monitors: Arc<dyn MonitorConnector>,
        backends: Arc<dyn ConnectionFactory>,
    ) -> Result<Self> {
        config.validate()?;

        let discovery = Arc::new(MasterDiscovery::new(
            monitors,
            config.monitor_addrs.clone(),
            config.connection.clone(),
        ));
        let master_addrs = discovery.resolve_all(&config.master_names).await?;

        let mut shards = Vec::with_capacity(config.master_names.len());
        for master in &config.master_names {
            let addr = &master_addrs[master];
            let conn = backends.connect(addr, &config.connection).await?;
            shards.push(ShardInfo::new(
                master.clone(),
                config.shard_name(master),
                config.shard_weight,
                conn,
            ));
        }
        let client = Arc::new(ShardedClient::new(shards, config.ring_replicas)?);
        info!(
            "router: serving {} masters through {} monitors",
            config.master_names.len(),
            config.monitor_addrs.len()
        );

        let watcher = FailoverWatcher::new(
            config,
            discovery,
            backends,
            Arc::clone(&client) as Arc<dyn ShardRebind>,
            master_addrs,
        );
        let cancel = CancellationToken::new();
        let tasks = watcher.spawn_all(&cancel);

        Ok(Self {
            client,
            watcher,
            cancel,
            tasks,
        })
    }

    /// The routing facade.
    pub fn client(&self) -> &Arc<ShardedClient> {
        &self.client
    }

    /// Route `cmd` to the shard owning `key`.
    pub async fn dispatch(&self, key: &str, cmd: Command) -> Result<Reply> {
        self.client.dispatch(key, cmd).await
    }

    /// Snapshot of the last-known master addresses.
    pub async fn master_addrs(&self) -> HashMap<String, String> {
        self.watcher.master_addrs().await
    }

    /// Stop all watcher tasks and wait for them to finish.
    ///
    /// In-flight dispatches are not cancelled; they complete against the
    /// connections they captured.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("router: watcher task ended abnormally: {e}");
            }
        }
        info!("router: shut down");
    }
}
