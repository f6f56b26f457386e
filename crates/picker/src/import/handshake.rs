//! Cross-window import handshake.
//!
//! The scraper window (opener) collects subjects and opens the picker with an
//! import-pending query flag. The picker (consumer) announces readiness, the
//! opener sends the subjects, and the consumer acknowledges. Messages may be
//! lost in either direction, so the opener re-sends on a fixed interval until
//! acknowledged or out of attempts, and the consumer re-announces readiness
//! until data arrives or its wait window closes.

use super::{parse_value, ImportBatch};
use crate::error::ImportError;
use crate::schedule::RawScheduleSource;
use crate::store::{KeyValueStore, SelectionStore};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

/// Query parameter marking a window opened for import.
pub const IMPORT_PENDING_PARAM: &str = "edison-import";

/// Source name used when reporting rejected entries from a message.
const MESSAGE_SOURCE: &str = "edison-data";

/// Messages exchanged between the two windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HandshakeMessage {
    ReadyForImport,
    #[serde(rename = "edison-data")]
    ScheduleData {
        subjects: Value,
    },
    ImportSuccess,
}

/// Retry and wait limits for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConfig {
    pub retry_interval: Duration,
    pub max_attempts: u32,
    pub consumer_timeout: Duration,
}

impl HandshakeConfig {
    /// Retry period for the tick loops, never zero.
    fn retry_period(&self) -> Duration {
        self.retry_interval.max(Duration::from_millis(1))
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(500),
            max_attempts: 30,
            consumer_timeout: Duration::from_secs(15),
        }
    }
}

/// One end of a bidirectional, lossy message link.
#[derive(Debug)]
pub struct MessagePort {
    tx: mpsc::Sender<HandshakeMessage>,
    rx: mpsc::Receiver<HandshakeMessage>,
}

impl MessagePort {
    /// Posts a message without waiting. A full or closed link drops it.
    pub fn post(&self, message: HandshakeMessage) -> bool {
        self.tx.try_send(message).is_ok()
    }

    pub async fn recv(&mut self) -> Option<HandshakeMessage> {
        self.rx.recv().await
    }
}

/// Creates a connected pair of ports.
pub fn message_channel(capacity: usize) -> (MessagePort, MessagePort) {
    let (a_tx, a_rx) = mpsc::channel(capacity);
    let (b_tx, b_rx) = mpsc::channel(capacity);
    (
        MessagePort { tx: a_tx, rx: b_rx },
        MessagePort { tx: b_tx, rx: a_rx },
    )
}

/// Builds the URL the opener navigates to, with the import-pending flag set.
pub fn import_url(app_url: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(app_url)?;
    url.query_pairs_mut().append_pair(IMPORT_PENDING_PARAM, "1");
    Ok(url)
}

/// Returns true if the window was opened with the import-pending flag.
pub fn is_import_pending(url: &Url) -> bool {
    url.query_pairs()
        .any(|(k, v)| k == IMPORT_PENDING_PARAM && v == "1")
}

/// Opener side: delivers `subjects` and waits for the acknowledgement.
///
/// Returns the number of send attempts made.
pub async fn send_subjects(
    port: &mut MessagePort,
    subjects: &[RawScheduleSource],
    config: HandshakeConfig,
) -> Result<u32, ImportError> {
    let correlation_id = generate_correlation_id();
    let payload = HandshakeMessage::ScheduleData {
        subjects: serde_json::to_value(subjects).map_err(|e| ImportError::InvalidJson {
            source_name: MESSAGE_SOURCE.to_string(),
            message: e.to_string(),
        })?,
    };

    info!(
        correlation_id = %correlation_id,
        subjects = subjects.len(),
        "Waiting for picker to accept import"
    );

    let start = Instant::now();
    let mut attempts = 0u32;
    let mut interval = tokio::time::interval(config.retry_period());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            message = port.recv() => match message {
                Some(HandshakeMessage::ReadyForImport) => {
                    attempts += 1;
                    debug!(correlation_id = %correlation_id, "Picker ready, sending subjects");
                    port.post(payload.clone());
                }
                Some(HandshakeMessage::ImportSuccess) => {
                    info!(
                        correlation_id = %correlation_id,
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Import acknowledged"
                    );
                    return Ok(attempts);
                }
                Some(other) => debug!(correlation_id = %correlation_id, ?other, "Ignoring message"),
                None => return Err(ImportError::ChannelClosed),
            },
            _ = interval.tick() => {
                if attempts >= config.max_attempts {
                    warn!(
                        correlation_id = %correlation_id,
                        attempts,
                        "Timed out waiting for picker"
                    );
                    return Err(ImportError::HandshakeTimeout {
                        attempts,
                        elapsed_secs: start.elapsed().as_secs_f64(),
                    });
                }
                attempts += 1;
                port.post(payload.clone());
            }
        }
    }
}

/// Consumer side: announces readiness and waits for subject data.
///
/// On data, validates it, acknowledges when anything was importable and
/// returns the batch. On timeout the caller's state is left untouched.
pub async fn receive_import(
    port: &mut MessagePort,
    config: HandshakeConfig,
) -> Result<ImportBatch, ImportError> {
    let start = Instant::now();
    let deadline = tokio::time::Instant::now() + config.consumer_timeout;
    let mut announcements = 0u32;
    let mut interval = tokio::time::interval(config.retry_period());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                warn!(announcements, "No import data received");
                return Err(ImportError::HandshakeTimeout {
                    attempts: announcements,
                    elapsed_secs: start.elapsed().as_secs_f64(),
                });
            }
            _ = interval.tick() => {
                announcements += 1;
                port.post(HandshakeMessage::ReadyForImport);
            }
            message = port.recv() => match message {
                Some(HandshakeMessage::ScheduleData { subjects }) => {
                    let batch = parse_value(subjects, MESSAGE_SOURCE);
                    if !batch.is_empty() {
                        port.post(HandshakeMessage::ImportSuccess);
                    }
                    info!(
                        subjects = batch.subjects.len(),
                        rejected = batch.errors.len(),
                        "Received import data"
                    );
                    return Ok(batch);
                }
                Some(other) => debug!(?other, "Ignoring message"),
                None => return Err(ImportError::ChannelClosed),
            },
        }
    }
}

/// Consumer side, end to end: waits for data and merges whatever was
/// importable into `store`.
///
/// On timeout or a closed link the store is not touched. Persistence failures
/// are logged; the in-memory merge still stands.
pub async fn import_via_handshake<S: KeyValueStore>(
    store: &mut SelectionStore<S>,
    port: &mut MessagePort,
    config: HandshakeConfig,
) -> Result<ImportBatch, ImportError> {
    let batch = receive_import(port, config).await?;
    if batch.is_empty() {
        return Ok(batch);
    }

    if let Err(e) = store.import_subjects(batch.subjects.clone()) {
        warn!(error = %e, "Import not persisted");
    }
    Ok(batch)
}

/// Generates a short id tying together the log lines of one handshake.
fn generate_correlation_id() -> String {
    let random: u32 = rand::thread_rng().gen();
    format!("import-{:08x}", random)
}
