//! Durable recording of download grants.
//!
//! A granted download redirects the customer immediately; the quota counter
//! lands afterwards. Grants go through an unbounded channel to a single
//! worker that retries transient database failures, so a grant is recorded
//! at least once unless the process dies with the queue non-empty.

use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::mpsc;

use paperfold_core::OrderId;

use crate::db::OrderRepository;

const MAX_ATTEMPTS: u32 = 3;

/// One download grant awaiting persistence.
#[derive(Debug, Clone, Copy)]
pub struct UsageEvent {
    pub order_id: OrderId,
    pub position: i32,
}

/// Handle for enqueueing download grants.
#[derive(Debug, Clone)]
pub struct UsageRecorder {
    tx: mpsc::UnboundedSender<UsageEvent>,
}

impl UsageRecorder {
    /// Spawn the recording worker and return a handle to it.
    #[must_use]
    pub fn spawn(pool: PgPool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(worker(pool, rx));
        Self { tx }
    }

    /// Enqueue a grant. Never blocks; a closed worker is logged and the
    /// grant is dropped rather than failing the download.
    pub fn record(&self, event: UsageEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!(
                order_id = %event.order_id,
                position = event.position,
                "Usage recorder is gone, download grant not counted"
            );
        }
    }
}

async fn worker(pool: PgPool, mut rx: mpsc::UnboundedReceiver<UsageEvent>) {
    while let Some(event) = rx.recv().await {
        record_with_retry(&pool, event).await;
    }
    tracing::debug!("Usage recorder drained, shutting down");
}

async fn record_with_retry(pool: &PgPool, event: UsageEvent) {
    let orders = OrderRepository::new(pool);

    for attempt in 1..=MAX_ATTEMPTS {
        match orders.record_download(event.order_id, event.position).await {
            Ok(true) => {
                tracing::debug!(
                    order_id = %event.order_id,
                    position = event.position,
                    "Recorded download"
                );
                return;
            }
            Ok(false) => {
                // The conditional update found no headroom. The grant raced
                // with another download that spent the last slot.
                tracing::debug!(
                    order_id = %event.order_id,
                    position = event.position,
                    "Download not counted, quota already spent"
                );
                return;
            }
            Err(error) if attempt < MAX_ATTEMPTS => {
                let delay = Duration::from_millis(200 * 5_u64.pow(attempt - 1));
                tracing::warn!(
                    error = %error,
                    order_id = %event.order_id,
                    position = event.position,
                    attempt,
                    "Failed to record download, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                tracing::error!(
                    error = %error,
                    order_id = %event.order_id,
                    position = event.position,
                    "Giving up on recording download after {MAX_ATTEMPTS} attempts"
                );
            }
        }
    }
}
