//! Background key enumeration
//!
//! A producer task walks the select-all cursor and hands decoded CIDs to the
//! consumer over a bounded channel. Malformed keys are logged and skipped.
//! A cursor failure closes the channel early; the consumer only sees a short
//! stream unless it asks [`KeyStream::finish`] how the run ended.

use std::pin::Pin;
use std::task::{Context, Poll};

use blocklite_core::{Cid, cid_from_raw_key};
use futures_util::{Stream, StreamExt};
use sqlx::Sqlite;
use sqlx::pool::PoolConnection;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::Statement;
use crate::error::{Result, StorageError};

/// How an enumeration ended.
#[derive(Debug)]
pub enum EnumerationState {
    /// Every row was visited.
    Completed,
    /// The cancel signal fired or the consumer went away.
    Cancelled,
    /// The cursor failed part way; the stream was truncated.
    Failed(StorageError),
}

#[derive(Debug)]
pub struct EnumerationReport {
    pub state: EnumerationState,
    /// Keys handed to the channel.
    pub produced: u64,
    /// Rows whose key could not be decoded.
    pub skipped: u64,
}

impl EnumerationReport {
    fn new(state: EnumerationState, produced: u64, skipped: u64) -> Self {
        Self {
            state,
            produced,
            skipped,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, EnumerationState::Completed)
    }
}

/// Lazily produced sequence of every stored key, as raw CIDv1s.
pub struct KeyStream {
    rx: mpsc::Receiver<Cid>,
    task: JoinHandle<EnumerationReport>,
}

impl KeyStream {
    pub(crate) fn spawn(
        conn: PoolConnection<Sqlite>,
        cancel: watch::Receiver<bool>,
        capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let task = tokio::spawn(produce(conn, cancel, tx));
        Self { rx, task }
    }

    /// Next key, or `None` once the producer has stopped.
    pub async fn recv(&mut self) -> Option<Cid> {
        self.rx.recv().await
    }

    /// Stop consuming and wait for the producer's report.
    ///
    /// Keys still buffered in the channel are discarded. If the producer was
    /// still running it observes the closed channel and reports `Cancelled`.
    pub async fn finish(self) -> Result<EnumerationReport> {
        let KeyStream { rx, task } = self;
        drop(rx);

        task.await
            .map_err(|e| StorageError::Other(anyhow::anyhow!("key enumeration task failed: {e}")))
    }
}

impl Stream for KeyStream {
    type Item = Cid;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Cid>> {
        self.rx.poll_recv(cx)
    }
}

/// Resolves once `cancel` reads `true`. A dropped sender never cancels.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let sender_gone = cancel.wait_for(|stop| *stop).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

async fn produce(
    mut conn: PoolConnection<Sqlite>,
    mut cancel: watch::Receiver<bool>,
    tx: mpsc::Sender<Cid>,
) -> EnumerationReport {
    let mut produced: u64 = 0;
    let mut skipped: u64 = 0;

    let mut rows = sqlx::query_scalar::<_, Vec<u8>>(Statement::SelectAll.sql()).fetch(&mut *conn);

    loop {
        let row = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                debug!("Key enumeration cancelled after {} keys", produced);
                return EnumerationReport::new(EnumerationState::Cancelled, produced, skipped);
            }
            row = rows.next() => row,
        };

        let key = match row {
            None => {
                return EnumerationReport::new(EnumerationState::Completed, produced, skipped);
            }
            Some(Ok(key)) => key,
            Some(Err(e @ sqlx::Error::ColumnDecode { .. })) => {
                warn!("Skipping undecodable key column during enumeration: {}", e);
                skipped += 1;
                continue;
            }
            Some(Err(e)) => {
                warn!("Stopping key enumeration after {} keys: {}", produced, e);
                return EnumerationReport::new(
                    EnumerationState::Failed(StorageError::Enumeration(e)),
                    produced,
                    skipped,
                );
            }
        };

        let cid = match cid_from_raw_key(&key) {
            Ok(cid) => cid,
            Err(e) => {
                warn!("Skipping malformed key during enumeration: {}", e);
                skipped += 1;
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                debug!("Key enumeration cancelled after {} keys", produced);
                return EnumerationReport::new(EnumerationState::Cancelled, produced, skipped);
            }
            sent = tx.send(cid) => {
                if sent.is_err() {
                    debug!("Key stream dropped after {} keys", produced);
                    return EnumerationReport::new(EnumerationState::Cancelled, produced, skipped);
                }
                produced += 1;
            }
        }
    }
}
