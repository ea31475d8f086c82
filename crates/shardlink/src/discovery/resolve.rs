//! MasterDiscovery — resolve master addresses through the monitor quorum.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::ConnectionConfig;
use crate::error::{Result, RouterError};
use crate::monitor::{join_host_port, MonitorConnection, MonitorConnector};

/// Resolves master addresses by asking monitor endpoints in configuration
/// order, and owns the lazily healed set of monitor connections.
///
/// Endpoints are never removed from the set; a dead connection is dropped
/// with [`invalidate`](Self::invalidate) and redialed on next use.
pub struct MasterDiscovery {
    connector: Arc<dyn MonitorConnector>,
    endpoints: Vec<String>,
    config: ConnectionConfig,
    monitors: Mutex<HashMap<String, Arc<dyn MonitorConnection>>>,
}

impl MasterDiscovery {
    pub fn new(
        connector: Arc<dyn MonitorConnector>,
        endpoints: Vec<String>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            connector,
            endpoints,
            config,
            monitors: Mutex::new(HashMap::new()),
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Connection to `addr`, dialing if none is cached.
    ///
    /// The endpoint-set lock is never held across the dial, so a hanging
    /// endpoint cannot stall discovery or the other watchers. Two racing
    /// dials to the same endpoint are tolerated; the first insertion wins.
    pub async fn monitor(&self, addr: &str) -> Result<Arc<dyn MonitorConnection>> {
        if let Some(conn) = self.monitors.lock().await.get(addr) {
            return Ok(Arc::clone(conn));
        }
        let conn = self.connector.connect(addr, &self.config).await?;
        let mut monitors = self.monitors.lock().await;
        let entry = monitors
            .entry(addr.to_string())
            .or_insert_with(|| Arc::clone(&conn));
        Ok(Arc::clone(entry))
    }

    /// Drop the cached connection to `addr` so the next use redials.
    pub async fn invalidate(&self, addr: &str) {
        self.monitors.lock().await.remove(addr);
    }

    /// Resolve the current address of `master`.
    ///
    /// Monitors are tried in configuration order; any per-endpoint failure
    /// is logged and the next one is tried. Only exhausting every endpoint
    /// is an error, and that error is fatal to startup.
    pub async fn resolve(&self, master: &str) -> Result<String> {
        for addr in &self.endpoints {
            let monitor = match self.monitor(addr).await {
                Ok(m) => m,
                Err(e) => {
                    warn!("discovery: monitor {addr} unreachable: {e}");
                    continue;
                }
            };
            match monitor.master_addr(master).await {
                Ok(Some((host, port))) => {
                    let resolved = join_host_port(&host, port);
                    info!("discovery: master {master:?} at {resolved} (via {addr})");
                    return Ok(resolved);
                }
                Ok(None) => {
                    warn!("discovery: monitor {addr} does not know master {master:?}");
                }
                Err(e) => {
                    warn!("discovery: query to {addr} for master {master:?} failed: {e}");
                    // The connection may be wedged; heal it before reuse.
                    self.invalidate(addr).await;
                }
            }
        }
        Err(RouterError::DiscoveryExhausted {
            master: master.to_string(),
        })
    }

    /// Resolve every configured master, seeding the master address map.
    pub async fn resolve_all(&self, masters: &[String]) -> Result<HashMap<String, String>> {
        let mut addrs = HashMap::with_capacity(masters.len());
        for master in masters {
            let addr = self.resolve(master).await?;
            addrs.insert(master.clone(), addr);
        }
        Ok(addrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::connection::MessageStream;

    /// Monitor that knows a fixed set of masters, or fails every call.
    struct ScriptedMonitor {
        masters: HashMap<String, (String, u16)>,
        broken: bool,
    }

    #[async_trait]
    impl MonitorConnection for ScriptedMonitor {
        async fn master_addr(&self, name: &str) -> Result<Option<(String, u16)>> {
            if self.broken {
                return Err(RouterError::Monitor("scripted failure".to_string()));
            }
            Ok(self.masters.get(name).cloned())
        }

        async fn subscribe_failover(&self) -> Result<MessageStream> {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            Ok(rx)
        }
    }

    struct ScriptedConnector {
        monitors: HashMap<String, (HashMap<String, (String, u16)>, bool)>,
        dials: AtomicUsize,
    }

    #[async_trait]
    impl MonitorConnector for ScriptedConnector {
        async fn connect(
            &self,
            addr: &str,
            _config: &ConnectionConfig,
        ) -> Result<Arc<dyn MonitorConnection>> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            match self.monitors.get(addr) {
                Some((masters, broken)) => Ok(Arc::new(ScriptedMonitor {
                    masters: masters.clone(),
                    broken: *broken,
                })),
                None => Err(RouterError::Monitor(format!("no route to {addr}"))),
            }
        }
    }

    fn connector(
        entries: &[(&str, &[(&str, &str, u16)], bool)],
    ) -> Arc<ScriptedConnector> {
        let monitors = entries
            .iter()
            .map(|(addr, masters, broken)| {
                let masters = masters
                    .iter()
                    .map(|(name, host, port)| (name.to_string(), (host.to_string(), *port)))
                    .collect();
                (addr.to_string(), (masters, *broken))
            })
            .collect();
        Arc::new(ScriptedConnector {
            monitors,
            dials: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_resolve_falls_through_failed_monitor() {
        // Monitor A errors on every query; B knows m1.
        let connector = connector(&[
            ("a:26379", &[], true),
            ("b:26379", &[("m1", "10.0.0.1", 6379)], false),
        ]);
        let discovery = MasterDiscovery::new(
            connector,
            vec!["a:26379".to_string(), "b:26379".to_string()],
            ConnectionConfig::default(),
        );

        let addr = discovery.resolve("m1").await.unwrap();
        assert_eq!(addr, "10.0.0.1:6379");
    }

    #[tokio::test]
    async fn test_resolve_skips_unknown_master_answer() {
        let connector = connector(&[
            ("a:26379", &[("other", "10.0.0.5", 6379)], false),
            ("b:26379", &[("m1", "10.0.0.1", 6379)], false),
        ]);
        let discovery = MasterDiscovery::new(
            connector,
            vec!["a:26379".to_string(), "b:26379".to_string()],
            ConnectionConfig::default(),
        );

        assert_eq!(discovery.resolve("m1").await.unwrap(), "10.0.0.1:6379");
    }

    #[tokio::test]
    async fn test_resolve_exhaustion_is_fatal() {
        let connector = connector(&[("a:26379", &[], true)]);
        let discovery = MasterDiscovery::new(
            connector,
            vec!["a:26379".to_string(), "down:26379".to_string()],
            ConnectionConfig::default(),
        );

        match discovery.resolve("m1").await {
            Err(RouterError::DiscoveryExhausted { master }) => assert_eq!(master, "m1"),
            other => panic!("expected DiscoveryExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_monitor_connections_are_cached_and_healed() {
        let connector = connector(&[("a:26379", &[("m1", "10.0.0.1", 6379)], false)]);
        let dials = Arc::clone(&connector);
        let discovery = MasterDiscovery::new(
            connector,
            vec!["a:26379".to_string()],
            ConnectionConfig::default(),
        );

        discovery.resolve("m1").await.unwrap();
        discovery.resolve("m1").await.unwrap();
        assert_eq!(dials.dials.load(Ordering::SeqCst), 1);

        discovery.invalidate("a:26379").await;
        discovery.resolve("m1").await.unwrap();
        assert_eq!(dials.dials.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_all_covers_every_master() {
        let connector = connector(&[(
            "a:26379",
            &[("m1", "10.0.0.1", 6379), ("m2", "10.0.0.2", 6379)],
            false,
        )]);
        let discovery = MasterDiscovery::new(
            connector,
            vec!["a:26379".to_string()],
            ConnectionConfig::default(),
        );

        let addrs = discovery
            .resolve_all(&["m1".to_string(), "m2".to_string()])
            .await
            .unwrap();
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs["m1"], "10.0.0.1:6379");
        assert_eq!(addrs["m2"], "10.0.0.2:6379");
    }

    /// Connector whose dial to one endpoint never completes.
    struct StuckConnector {
        stuck_addr: String,
        inner: Arc<ScriptedConnector>,
    }

    #[async_trait]
    impl MonitorConnector for StuckConnector {
        async fn connect(
            &self,
            addr: &str,
            config: &ConnectionConfig,
        ) -> Result<Arc<dyn MonitorConnection>> {
            if addr == self.stuck_addr {
                std::future::pending::<()>().await;
            }
            self.inner.connect(addr, config).await
        }
    }

    #[tokio::test]
    async fn test_hanging_dial_does_not_block_other_endpoints() {
        let connector = Arc::new(StuckConnector {
            stuck_addr: "a:26379".to_string(),
            inner: connector(&[("b:26379", &[("m1", "10.0.0.1", 6379)], false)]),
        });
        let discovery = Arc::new(MasterDiscovery::new(
            connector,
            vec!["a:26379".to_string(), "b:26379".to_string()],
            ConnectionConfig::default(),
        ));

        // Park a dial to the stuck endpoint mid-flight.
        let stuck = Arc::clone(&discovery);
        tokio::spawn(async move {
            let _ = stuck.monitor("a:26379").await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        // The healthy endpoint must still answer promptly.
        let conn = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            discovery.monitor("b:26379"),
        )
        .await
        .expect("healthy endpoint stalled behind a hanging dial")
        .unwrap();
        assert_eq!(
            conn.master_addr("m1").await.unwrap(),
            Some(("10.0.0.1".to_string(), 6379))
        );
    }
}
