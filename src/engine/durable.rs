use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::limits::WAL_CHANNEL_CAPACITY;
use crate::model::*;
use crate::wal::Wal;

use super::store::{ReservationIndex, ReservationStore};
use super::EngineError;

// ── Group-commit WAL channel ─────────────────────────────

struct AppendCommand {
    event: Event,
    response: oneshot::Sender<io::Result<()>>,
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Apply the batch to the index, then respond to all senders.
///
/// The index is updated here rather than by callers, so a caller that stops
/// waiting cannot leave a durable record invisible.
async fn wal_writer_loop(
    mut wal: Wal,
    index: Arc<ReservationIndex>,
    mut rx: mpsc::Receiver<AppendCommand>,
) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];

        // Drain all immediately available appends
        while let Ok(cmd) = rx.try_recv() {
            batch.push(cmd);
        }

        metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
        let flush_start = std::time::Instant::now();
        let result = flush_batch(&mut wal, &batch);
        metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());

        match &result {
            Ok(()) => {
                for cmd in &batch {
                    index.apply(&cmd.event);
                }
                debug!(batch = batch.len(), "wal batch committed");
            }
            Err(e) => {
                metrics::counter!(crate::observability::WAL_FLUSH_FAILURES_TOTAL).increment(1);
                error!(path = %wal.path().display(), "wal flush failed: {e}");
                if let Err(e) = wal.rollback() {
                    error!(path = %wal.path().display(), "wal rollback failed: {e}");
                }
            }
        }
        respond_batch(batch, &result);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[AppendCommand]) -> io::Result<()> {
    for cmd in batch {
        wal.append_buffered(&cmd.event)?;
    }
    wal.flush_sync()
}

fn respond_batch(batch: Vec<AppendCommand>, result: &io::Result<()>) {
    for cmd in batch {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = cmd.response.send(r);
    }
}

/// Store backed by an append-only WAL file.
///
/// The file is replayed into memory on open; reads are served from memory and
/// only ever see batches that were fsynced.
pub struct WalStore {
    index: Arc<ReservationIndex>,
    wal_tx: mpsc::Sender<AppendCommand>,
    path: PathBuf,
}

impl WalStore {
    /// Replay `path` and start the writer task. Must be called inside a tokio runtime.
    pub fn open(path: &Path) -> io::Result<Self> {
        let (events, valid_len) = Wal::replay(path)?;
        let wal = Wal::open(path, valid_len)?;

        let index = Arc::new(ReservationIndex::new());
        for event in &events {
            index.apply(event);
        }
        debug!(path = %path.display(), replayed = events.len(), "wal replayed");

        let (wal_tx, wal_rx) = mpsc::channel(WAL_CHANNEL_CAPACITY);
        tokio::spawn(wal_writer_loop(wal, index.clone(), wal_rx));

        Ok(Self {
            index,
            wal_tx,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[async_trait]
impl ReservationStore for WalStore {
    async fn all_of(&self, category: &str) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.index.category(category))
    }

    async fn all(&self) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.index.all())
    }

    async fn append(&self, reservation: Reservation) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(AppendCommand {
                event: Event::ReservationCommitted(reservation),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::Durability("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Durability("WAL writer dropped response".into()))?
            .map_err(EngineError::from)
    }
}
