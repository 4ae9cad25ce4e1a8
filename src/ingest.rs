//! Ingestion pipeline: bus message to stored row to live observers
//!
//! One message is fully processed (validate, parse, normalize, persist,
//! broadcast) before the next is taken, so writes and broadcasts follow bus
//! delivery order. No fault here stops the pipeline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::broadcast::BroadcastHub;
use crate::context::AppContext;
use crate::models::IncomingMessage;
use crate::storage::LogStorage;
use crate::topic::is_valid_topic;

/// Longest payload excerpt written to the log for malformed messages
const MAX_LOGGED_PAYLOAD: usize = 256;

/// A message as delivered by the bus
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// What happened to one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Topic is not a valid table identifier; dropped
    InvalidTopic,
    /// Payload could not be parsed; dropped
    Malformed,
    /// Stored with this id and broadcast
    Persisted { id: i64 },
    /// `persist: false`; broadcast only
    Suppressed,
    /// Storage failed; still broadcast
    PersistFailed,
}

#[derive(Clone)]
pub struct Ingestor {
    storage: Arc<dyn LogStorage>,
    hub: Arc<BroadcastHub>,
}

impl Ingestor {
    pub fn new(context: &AppContext) -> Self {
        Self {
            storage: Arc::clone(&context.storage),
            hub: Arc::clone(&context.hub),
        }
    }

    /// Process one bus message
    pub async fn ingest(&self, topic: &str, raw: &[u8]) -> IngestOutcome {
        crate::metrics::record_received();

        if !is_valid_topic(topic) {
            tracing::warn!(
                topic = %topic,
                "Invalid table name: topics must only contain alphanumeric characters and underscores"
            );
            crate::metrics::record_dropped("invalid_topic");
            return IngestOutcome::InvalidTopic;
        }

        let message = match IncomingMessage::from_slice(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    topic = %topic,
                    error = %e,
                    payload = %excerpt(raw),
                    "Could not parse message"
                );
                crate::metrics::record_dropped("malformed");
                return IngestOutcome::Malformed;
            }
        };

        let persist = message.should_persist();
        let mut record = message.into_record();

        let outcome = if persist {
            match self.persist(topic, &record).await {
                Some(id) => {
                    record.id = Some(id);
                    IngestOutcome::Persisted { id }
                }
                None => IngestOutcome::PersistFailed,
            }
        } else {
            tracing::debug!(topic = %topic, "Persistence suppressed by message");
            IngestOutcome::Suppressed
        };

        let report = self.hub.publish(topic, &record);
        tracing::debug!(
            topic = %topic,
            delivered = report.delivered,
            lagging = report.lagging,
            "Broadcast event"
        );

        outcome
    }

    /// Ensure the topic table exists and insert; failures are logged, never retried
    async fn persist(&self, topic: &str, record: &crate::models::LogRecord) -> Option<i64> {
        if let Err(e) = self.storage.ensure_topic_table(topic).await {
            tracing::error!(topic = %topic, error = %e, "Failed to create topic table");
            crate::metrics::record_persist_failure();
            return None;
        }

        match self.storage.insert(topic, record).await {
            Ok(id) => {
                crate::metrics::record_persisted(topic);
                Some(id)
            }
            Err(e) => {
                tracing::error!(topic = %topic, error = %e, "Failed to insert log");
                crate::metrics::record_persist_failure();
                None
            }
        }
    }

    /// Drain the bus queue until every sender is gone
    pub async fn run(self, mut rx: mpsc::Receiver<BusMessage>) {
        while let Some(message) = rx.recv().await {
            self.ingest(&message.topic, &message.payload).await;
        }

        tracing::info!("Ingestion task shutting down");
    }

    /// Spawn [`run`](Self::run) on the runtime
    pub fn spawn(self, rx: mpsc::Receiver<BusMessage>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }
}

fn excerpt(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if text.chars().count() <= MAX_LOGGED_PAYLOAD {
        text.into_owned()
    } else {
        let mut cut: String = text.chars().take(MAX_LOGGED_PAYLOAD).collect();
        cut.push_str("...");
        cut
    }
}
