//! FailoverWatcher — long-lived monitor subscriptions driving hot-swaps.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RouterConfig;
use crate::connection::{ConnectionFactory, MessageStream};
use crate::discovery::resolve::MasterDiscovery;
use crate::error::Result;
use crate::monitor::FailoverEvent;
use crate::routing::client::{ShardInfo, ShardRebind};

/// Per-endpoint subscription state.
enum WatcherState {
    /// No subscription; waiting out the reconnect pause.
    Disconnected,
    /// (Re)dialing the monitor and opening the failover subscription.
    Subscribing,
    /// Consuming failover notifications.
    Listening(MessageStream),
}

/// Watches every monitor endpoint for failover notifications and rebinds
/// the affected shard through the [`ShardRebind`] capability.
///
/// One task runs per endpoint; all of them funnel into [`apply_event`],
/// whose exclusivity lock over the master address map makes concurrent and
/// duplicate notifications idempotent. A lost subscription is re-established
/// forever; a misbehaving endpoint never affects the others.
///
/// [`apply_event`]: Self::apply_event
pub struct FailoverWatcher {
    config: RouterConfig,
    discovery: Arc<MasterDiscovery>,
    factory: Arc<dyn ConnectionFactory>,
    client: Arc<dyn ShardRebind>,
    /// Exclusivity lock: serializes staleness check, connection build, and
    /// hot-swap. Dispatchers never touch this lock.
    master_addrs: Mutex<HashMap<String, String>>,
}

impl FailoverWatcher {
    pub fn new(
        config: RouterConfig,
        discovery: Arc<MasterDiscovery>,
        factory: Arc<dyn ConnectionFactory>,
        client: Arc<dyn ShardRebind>,
        initial_addrs: HashMap<String, String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            discovery,
            factory,
            client,
            master_addrs: Mutex::new(initial_addrs),
        })
    }

    /// Snapshot of the last-known master addresses.
    pub async fn master_addrs(&self) -> HashMap<String, String> {
        self.master_addrs.lock().await.clone()
    }

    /// Spawn one watcher task per monitor endpoint.
    pub fn spawn_all(self: &Arc<Self>, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        self.discovery
            .endpoints()
            .iter()
            .map(|endpoint| {
                let watcher = Arc::clone(self);
                let endpoint = endpoint.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { watcher.run(endpoint, cancel).await })
            })
            .collect()
    }

    /// Reconnect-and-resubscribe loop for one endpoint. Runs until
    /// cancelled; no failure here is fatal.
    async fn run(self: Arc<Self>, endpoint: String, cancel: CancellationToken) {
        let delay = Duration::from_millis(self.config.resubscribe_delay_ms);
        let mut state = WatcherState::Subscribing;

        'run: loop {
            if cancel.is_cancelled() {
                break;
            }
            state = match state {
                WatcherState::Disconnected => {
                    tokio::select! {
                        _ = cancel.cancelled() => break 'run,
                        _ = sleep(delay) => WatcherState::Subscribing,
                    }
                }
                WatcherState::Subscribing => match self.subscribe(&endpoint).await {
                    Ok(stream) => {
                        info!("watcher {endpoint}: subscribed to failover notifications");
                        WatcherState::Listening(stream)
                    }
                    Err(e) => {
                        warn!("watcher {endpoint}: subscribe failed: {e}");
                        self.discovery.invalidate(&endpoint).await;
                        WatcherState::Disconnected
                    }
                },
                WatcherState::Listening(mut stream) => {
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => break 'run,
                            msg = stream.recv() => match msg {
                                Some(payload) => self.apply_event(&endpoint, &payload).await,
                                None => break,
                            },
                        }
                    }
                    info!("watcher {endpoint}: subscription ended, reconnecting");
                    self.discovery.invalidate(&endpoint).await;
                    WatcherState::Disconnected
                }
            };
        }
        debug!("watcher {endpoint}: shut down");
    }

    async fn subscribe(&self, endpoint: &str) -> Result<MessageStream> {
        let monitor = self.discovery.monitor(endpoint).await?;
        monitor.subscribe_failover().await
    }

    /// Validate one failover notification and, if it is news, rebind the
    /// shard to the promoted master.
    ///
    /// The whole check-build-swap sequence runs under the exclusivity lock,
    /// so identical events from multiple monitors build exactly one new
    /// connection; the rest are dropped as stale.
    pub async fn apply_event(&self, endpoint: &str, payload: &str) {
        let Some(event) = FailoverEvent::parse(payload) else {
            warn!("watcher {endpoint}: malformed failover payload {payload:?}");
            return;
        };
        if !self.config.master_names.contains(&event.master) {
            warn!(
                "watcher {endpoint}: ignoring failover for unconfigured master {:?}",
                event.master
            );
            return;
        }

        let mut addrs = self.master_addrs.lock().await;
        if addrs.get(&event.master).map(String::as_str) == Some(event.new_addr.as_str()) {
            warn!(
                "watcher {endpoint}: master {:?} already at {}, dropping duplicate",
                event.master, event.new_addr
            );
            return;
        }

        match self
            .factory
            .connect(&event.new_addr, &self.config.connection)
            .await
        {
            Ok(conn) => {
                let info = ShardInfo::new(
                    event.master.clone(),
                    self.config.shard_name(&event.master),
                    self.config.shard_weight,
                    conn,
                );
                self.client.change_shard_info(&event.master, info);
                addrs.insert(event.master.clone(), event.new_addr.clone());
                info!(
                    "watcher {endpoint}: switched master {:?} from {} to {}",
                    event.master, event.old_addr, event.new_addr
                );
            }
            // Address map deliberately not advanced: the next notification
            // for this address retries instead of reading as stale.
            Err(e) => error!(
                "watcher {endpoint}: cannot reach promoted master {:?} at {}: {e}",
                event.master, event.new_addr
            ),
        }
    }
}
