//! Mirrors receiver state into a key-value store.
//!
//! Every parsed field is written under its field name. Write requests found
//! in the store are applied to the receiver while connected. After a close
//! the bridge waits the configured reconnect delay and connects again.

use crate::config::Config;
use crate::error::BridgeError;
use crate::store::StatusStore;
use crate::write::WriteRequest;
use avrlink_client::{Client, ClientEvent};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, MissedTickBehavior};

/// Bridges one receiver to one store.
pub struct Bridge {
    config: Config,
    client: Arc<Client>,
    store: Arc<dyn StatusStore>,
}

impl Bridge {
    pub fn new(config: Config, store: Arc<dyn StatusStore>) -> Self {
        Self {
            config,
            client: Arc::new(Client::new()),
            store,
        }
    }

    pub fn client(&self) -> Arc<Client> {
        self.client.clone()
    }

    /// Runs until `shutdown` resolves.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<(), BridgeError> {
        self.config.validate()?;
        tokio::pin!(shutdown);

        let mut events = self.client.subscribe();
        let mut writes = tokio::time::interval(self.config.store.poll_interval());
        writes.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reconnect_at: Option<Instant> = None;

        self.connect().await;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutting down bridge");
                    self.client.disconnect().await;
                    return Ok(());
                }
                event = events.recv() => match event {
                    Ok(ClientEvent::Closed) => {
                        let delay = self.config.receiver.reconnect_delay();
                        tracing::info!(
                            "Connection closed, reconnecting in {:.1}s...",
                            delay.as_secs_f64()
                        );
                        reconnect_at = Some(Instant::now() + delay);
                    }
                    Ok(event) => self.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Bridge fell behind, {} events skipped", skipped);
                    }
                    Err(RecvError::Closed) => return Ok(()),
                },
                _ = writes.tick(), if self.client.is_connected() => self.apply_writes().await,
                _ = tokio::time::sleep_until(reconnect_at.unwrap_or_else(Instant::now)),
                    if reconnect_at.is_some() =>
                {
                    reconnect_at = None;
                    self.connect().await;
                }
            }
        }
    }

    async fn connect(&self) {
        let connection = self.config.receiver.connection();
        tracing::info!("Connecting to {}", connection.addr());
        self.client.connect(connection).await;
    }

    async fn handle_event(&self, event: ClientEvent) {
        match event {
            ClientEvent::Connected => tracing::info!("Connected"),
            ClientEvent::Parsed(field, value) => {
                let result = match serde_json::to_value(&value) {
                    Ok(json) => self.store.set(field.name(), json).await,
                    Err(e) => Err(e.into()),
                };
                if let Err(e) = result {
                    tracing::error!("Failed to store {}: {}", field, e);
                }
            }
            ClientEvent::Errored(e) => tracing::error!("Connection error: {}", e),
            ClientEvent::TimedOut => tracing::debug!("Receiver idle"),
            ClientEvent::Unrecognized(line) => tracing::trace!("Could not parse: {:?}", line),
            ClientEvent::Closed => {}
        }
    }

    /// Applies pending write requests from the store.
    async fn apply_writes(&self) {
        let entries = match self.store.take_writes().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read write requests: {}", e);
                return;
            }
        };

        for (key, value) in entries {
            match WriteRequest::from_entry(&key, &value) {
                Ok(Some(request)) => {
                    tracing::debug!("Applying {:?}", request);
                    if let Err(e) = request.apply(&self.client).await {
                        tracing::warn!("Failed to apply {}: {}", key, e);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Dropping write request: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    const HANDSHAKE: &[u8] = b"PW?\rMV?\rZ2?\rCV?\rNSE\r";

    async fn accept(listener: &TcpListener) -> TcpStream {
        let (mut stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
            .await
            .expect("bridge did not connect")
            .unwrap();
        let mut buf = vec![0u8; HANDSHAKE.len()];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, HANDSHAKE);
        stream
    }

    async fn wait_for(store: &MemoryStore, key: &str, expected: serde_json::Value) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.get(key).as_ref() != Some(&expected) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{} never became {}", key, expected));
    }

    async fn test_bridge() -> (TcpListener, Arc<MemoryStore>, Bridge) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = Config::default();
        config.receiver.host = "127.0.0.1".to_string();
        config.receiver.port = listener.local_addr().unwrap().port();
        config.receiver.connect_timeout_ms = 5000;
        config.receiver.poll_interval_ms = 60_000;
        config.receiver.reconnect_delay_ms = 50;
        config.store.poll_interval_ms = 10;

        let store = Arc::new(MemoryStore::new());
        let bridge = Bridge::new(config, store.clone());
        (listener, store, bridge)
    }

    #[tokio::test]
    async fn test_mirrors_fields_and_applies_writes() {
        let (listener, store, bridge) = test_bridge().await;
        let bridge = Arc::new(bridge);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let runner = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .run(async {
                        let _ = stop_rx.await;
                    })
                    .await
            })
        };

        let mut receiver = accept(&listener).await;
        receiver
            .write_all(b"PWON\rMV300\rNSE2Radiohead\rNSE4x\r")
            .await
            .unwrap();

        wait_for(&store, "masterPower", json!(true)).await;
        wait_for(&store, "masterVolume", json!(0.5)).await;
        wait_for(&store, "artist", json!("adiohead")).await;
        wait_for(&store, "album", serde_json::Value::Null).await;

        store.insert("setMasterVolume", json!(0.5));
        let mut buf = [0u8; 5];
        receiver.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"MV30\r");
        assert!(store.get("setMasterVolume").is_none());

        store.insert("setPlaying", json!(true));
        receiver.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"NS9A\r");

        // Invalid values are dropped without reaching the receiver.
        store.insert("setMasterPower", json!("on"));
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.get("setMasterPower").is_some() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        stop_tx.send(()).unwrap();
        runner.await.unwrap().unwrap();
        assert!(!bridge.client().is_connected());
    }

    #[tokio::test]
    async fn test_reconnects_after_close() {
        let (listener, store, bridge) = test_bridge().await;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let runner = tokio::spawn(async move {
            bridge
                .run(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        let receiver = accept(&listener).await;
        drop(receiver);

        let mut receiver = accept(&listener).await;
        receiver.write_all(b"Z2OFF\r").await.unwrap();
        wait_for(&store, "slavePower", json!(false)).await;

        stop_tx.send(()).unwrap();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let bridge = Bridge::new(Config::default(), Arc::new(MemoryStore::new()));
        let result = bridge.run(std::future::pending()).await;
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }
}
