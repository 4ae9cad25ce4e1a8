//! MQTT listener feeding the ingestion queue
//!
//! The listener only moves `(topic, payload)` pairs from the broker into a
//! bounded channel; all interpretation happens in [`crate::ingest`]. rumqttc
//! reconnects on the next poll after an error, and every `ConnAck` re-issues the
//! subscription so a broker restart does not silently end delivery.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::{broadcast, mpsc};

use crate::config::BusConfig;
use crate::ingest::BusMessage;
use crate::signals::ShutdownSignal;

/// Requests buffered between the client handle and its event loop
const CLIENT_CAPACITY: usize = 64;

/// Build MQTT connection options from config
pub fn mqtt_options(config: &BusConfig) -> MqttOptions {
    let client_id = config
        .client_id
        .clone()
        .unwrap_or_else(|| format!("loghub-{}", uuid::Uuid::new_v4().simple()));

    let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.max(5)));
    options.set_clean_session(true);
    options
}

/// Run the bus listener until shutdown or until the ingestion side is gone
pub async fn run_bus_listener(
    config: BusConfig,
    sink: mpsc::Sender<BusMessage>,
    mut shutdown: broadcast::Receiver<ShutdownSignal>,
) {
    let (client, mut eventloop) = AsyncClient::new(mqtt_options(&config), CLIENT_CAPACITY);
    let reconnect_delay = Duration::from_millis(config.reconnect_delay_ms);

    tracing::info!(
        broker = %format!("{}:{}", config.host, config.port),
        filter = %config.topic_filter,
        "Connecting to MQTT broker"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Shutdown signal received, disconnecting from MQTT broker");
                if let Err(e) = client.disconnect().await {
                    tracing::debug!(error = %e, "MQTT disconnect request failed");
                }
                break;
            }

            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("Connected to MQTT broker");
                    if let Err(e) = client.subscribe(config.topic_filter.as_str(), QoS::AtLeastOnce).await {
                        tracing::error!(filter = %config.topic_filter, error = %e, "Failed to subscribe");
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    tracing::info!(filter = %config.topic_filter, "Subscribed to bus topics");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = BusMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    };
                    if sink.send(message).await.is_err() {
                        tracing::warn!("Ingestion queue closed, stopping bus listener");
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "MQTT connection error, retrying in {:?}", reconnect_delay);
                    tokio::time::sleep(reconnect_delay).await;
                }
            }
        }
    }

    tracing::info!("Bus listener stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mqtt_options_from_config() {
        let config = BusConfig {
            client_id: Some("loghub-test".to_string()),
            host: "broker.local".to_string(),
            port: 1884,
            ..Default::default()
        };

        let options = mqtt_options(&config);
        assert_eq!(options.client_id(), "loghub-test");
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 1884));
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
    }

    #[test]
    fn test_mqtt_options_generates_client_id() {
        let options = mqtt_options(&BusConfig::default());
        assert!(options.client_id().starts_with("loghub-"));
    }

    #[tokio::test]
    async fn test_listener_stops_on_shutdown() {
        let config = BusConfig {
            // Nothing listens here; the listener keeps retrying until shutdown
            host: "127.0.0.1".to_string(),
            port: 1,
            reconnect_delay_ms: 10,
            ..Default::default()
        };
        let (tx, _rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(run_bus_listener(config, tx, shutdown_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(ShutdownSignal::Graceful).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("listener did not stop")
            .unwrap();
    }
}
