//! Live-update fan-out for placement events.
//!
//! DESIGN
//! ======
//! Writers publish accepted placements onto one bounded queue with
//! `try_send` and move on; a background fan-out task drains the queue,
//! coalesces events inside a short window, and delivers the batch to each
//! viewer's own bounded channel. Delivery to one connection preserves
//! emission order; no ordering is promised across connections.
//!
//! BACKPRESSURE
//! ============
//! A viewer whose outbound buffer is full is disconnected on the spot: its
//! sender is dropped from the registry, which ends the socket task. A slow
//! consumer can therefore never block the queue, other viewers, or writers.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::{RwLock, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::canvas::{CanvasWire, PlaceResult};
use crate::config::Config;

// =============================================================================
// WIRE MESSAGES
// =============================================================================

/// One placement as seen by live viewers. The owner is a truncated digest,
/// not the raw identity.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PixelEvent {
    pub x: u32,
    pub y: u32,
    pub color: String,
    pub user_id: String,
    /// Milliseconds since Unix epoch.
    pub timestamp: i64,
}

impl PixelEvent {
    #[must_use]
    pub fn from_result(result: &PlaceResult) -> Self {
        Self {
            x: result.coord.x,
            y: result.coord.y,
            color: result.record.color.as_str().to_string(),
            user_id: hash_user_id(result.record.owner),
            timestamp: result.record.placed_at,
        }
    }
}

/// Messages pushed to live viewers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full state, sent once when a viewer connects.
    CanvasUpdate { canvas: CanvasWire, total_pixels: i64 },
    /// A single placement.
    PixelPlaced(PixelEvent),
    /// Two or more placements coalesced within the batch window, in
    /// emission order.
    PixelBatch(Vec<PixelEvent>),
}

/// Short digest of a user id for broadcast payloads.
#[must_use]
pub fn hash_user_id(user_id: Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    let bytes = hasher.finalize();
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()[..8]
        .to_string()
}

// =============================================================================
// BROADCASTER
// =============================================================================

type ViewerMap = Arc<RwLock<HashMap<Uuid, mpsc::Sender<ServerMessage>>>>;

#[derive(Clone)]
pub struct Broadcaster {
    viewers: ViewerMap,
    queue_tx: mpsc::Sender<PixelEvent>,
    viewer_buffer: usize,
}

impl Broadcaster {
    /// Build the broadcaster and spawn its fan-out task.
    #[must_use]
    pub fn spawn(config: &Config) -> Self {
        let viewers: ViewerMap = Arc::new(RwLock::new(HashMap::new()));
        let (queue_tx, queue_rx) = mpsc::channel(config.event_queue_capacity);

        tokio::spawn(run_fanout(
            queue_rx,
            Arc::clone(&viewers),
            config.pixel_batch_size,
            config.pixel_batch_delay,
        ));

        Self { viewers, queue_tx, viewer_buffer: config.viewer_buffer }
    }

    /// Enqueue an accepted placement for delivery. Non-blocking: if the
    /// shared queue is full the event is dropped for live viewers (they
    /// converge via snapshot on reconnect) rather than stalling the writer.
    pub fn publish(&self, event: PixelEvent) {
        match self.queue_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("event queue full; dropping live update");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("event queue closed; dropping live update");
            }
        }
    }

    /// Register a viewer and return its outbound message stream.
    pub async fn subscribe(&self, viewer_id: Uuid) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(self.viewer_buffer);
        let mut viewers = self.viewers.write().await;
        viewers.insert(viewer_id, tx);
        info!(%viewer_id, viewers = viewers.len(), "viewer connected");
        rx
    }

    pub async fn unsubscribe(&self, viewer_id: Uuid) {
        let mut viewers = self.viewers.write().await;
        if viewers.remove(&viewer_id).is_some() {
            info!(%viewer_id, viewers = viewers.len(), "viewer disconnected");
        }
    }

    #[cfg(test)]
    pub(crate) async fn viewer_count(&self) -> usize {
        self.viewers.read().await.len()
    }
}

// =============================================================================
// FAN-OUT TASK
// =============================================================================

async fn run_fanout(
    mut queue_rx: mpsc::Receiver<PixelEvent>,
    viewers: ViewerMap,
    batch_size: usize,
    batch_delay: std::time::Duration,
) {
    while let Some(first) = queue_rx.recv().await {
        let mut batch = vec![first];

        // Coalesce whatever else arrives inside the window, up to the cap.
        let deadline = tokio::time::sleep(batch_delay);
        tokio::pin!(deadline);
        while batch.len() < batch_size {
            tokio::select! {
                () = &mut deadline => break,
                next = queue_rx.recv() => {
                    let Some(event) = next else { break };
                    batch.push(event);
                }
            }
        }

        let message = if batch.len() == 1 {
            let Some(event) = batch.pop() else { continue };
            ServerMessage::PixelPlaced(event)
        } else {
            ServerMessage::PixelBatch(batch)
        };

        deliver(&viewers, &message).await;
    }
}

/// Push one message to every live viewer. Full or closed channels drop the
/// viewer from the registry, which ends its socket task.
async fn deliver(viewers: &ViewerMap, message: &ServerMessage) {
    let mut slow = Vec::new();
    {
        let current = viewers.read().await;
        for (viewer_id, tx) in current.iter() {
            match tx.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%viewer_id, "viewer buffer full; disconnecting slow consumer");
                    slow.push(*viewer_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    slow.push(*viewer_id);
                }
            }
        }
    }

    if !slow.is_empty() {
        let mut current = viewers.write().await;
        for viewer_id in slow {
            current.remove(&viewer_id);
        }
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
