//! Snapshot persistence — periodic checkpoint hand-off.
//!
//! DESIGN
//! ======
//! A background task periodically copies the grid and hands it to a
//! `SnapshotSink` collaborator. The default sink writes the wire-format
//! JSON to disk through a temp-file rename, so a crash mid-write never
//! leaves a torn checkpoint. The on-disk shape is an adapter detail; the
//! store contract is only `snapshot()`.
//!
//! ERROR HANDLING
//! ==============
//! A failed checkpoint is logged and retried on the next tick. Persistence
//! never affects placements or reads.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::canvas::Snapshot;
use crate::state::AppState;

/// Durable-storage collaborator fed by the checkpoint task.
#[async_trait::async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn persist(&self, snapshot: &Snapshot) -> io::Result<()>;
}

// =============================================================================
// JSON FILE SINK
// =============================================================================

/// Writes each checkpoint as wire-format JSON, atomically via rename.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl SnapshotSink for JsonFileSink {
    async fn persist(&self, snapshot: &Snapshot) -> io::Result<()> {
        let json = serde_json::to_vec(&snapshot.to_wire()).map_err(io::Error::other)?;

        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// =============================================================================
// CHECKPOINT TASK
// =============================================================================

/// Spawn the periodic checkpoint task. Returns a handle for shutdown.
pub fn spawn_snapshot_task(state: AppState, sink: std::sync::Arc<dyn SnapshotSink>, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "snapshot checkpoint task configured");
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            checkpoint(&state, sink.as_ref()).await;
        }
    })
}

async fn checkpoint(state: &AppState, sink: &dyn SnapshotSink) {
    let snapshot = state.canvas.snapshot();
    let cells = snapshot.len();
    match sink.persist(&snapshot).await {
        Ok(()) => info!(cells, "canvas checkpoint written"),
        Err(e) => warn!(error = %e, "canvas checkpoint failed; will retry next tick"),
    }
}

#[cfg(test)]
pub(crate) async fn checkpoint_for_tests(state: &AppState, sink: &dyn SnapshotSink) {
    checkpoint(state, sink).await;
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
