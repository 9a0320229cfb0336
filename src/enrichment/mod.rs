//! Asynchronous enrichment pipeline
//!
//! Novel alerts are handed to a bounded work queue consumed by a fixed
//! pool of worker tasks. Each job runs the full oracle round trip off
//! the request path: assess, persist, notify. Failures never propagate
//! anywhere; they degrade to the fallback verdict or a logged no-op.

pub mod oracle;

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::events::{DashboardEvent, EventBroadcaster};
use crate::models::Alert;

pub use oracle::{ScoringOracle, Verdict};

type JobReceiver = Arc<Mutex<mpsc::Receiver<Alert>>>;

/// Handle for scheduling enrichment jobs
#[derive(Clone)]
pub struct EnrichmentQueue {
    tx: mpsc::Sender<Alert>,
}

impl EnrichmentQueue {
    /// Spawn the worker pool and return the scheduling handle.
    pub fn start(
        config: &Config,
        pool: PgPool,
        oracle: ScoringOracle,
        events: EventBroadcaster,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.enrichment_queue_size);
        let rx: JobReceiver = Arc::new(Mutex::new(rx));

        for worker_id in 0..config.enrichment_workers {
            tokio::spawn(worker_loop(
                worker_id,
                rx.clone(),
                pool.clone(),
                oracle.clone(),
                events.clone(),
            ));
        }

        info!(
            "Enrichment pool started: {} workers, queue depth {}",
            config.enrichment_workers, config.enrichment_queue_size
        );

        Self { tx }
    }

    /// Schedule at-most-once enrichment for a freshly persisted alert.
    ///
    /// Never blocks the caller. A full (or shut down) queue drops the
    /// job with a warning; the alert simply keeps its default
    /// `ml_score = 0` state.
    pub fn schedule(&self, alert: Alert) {
        let id = alert.id;
        if let Err(e) = self.tx.try_send(alert) {
            warn!("Enrichment queue rejected alert {}: {}", id, e);
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: JobReceiver,
    pool: PgPool,
    oracle: ScoringOracle,
    events: EventBroadcaster,
) {
    debug!("Enrichment worker {} started", worker_id);
    loop {
        // Hold the lock only to pull the next job, not for its duration
        let job = { rx.lock().await.recv().await };
        match job {
            Some(alert) => enrich(&pool, &oracle, &events, alert).await,
            None => {
                debug!("Enrichment worker {} stopping, queue closed", worker_id);
                break;
            }
        }
    }
}

/// One enrichment round trip: oracle call, update-in-place, notify.
async fn enrich(pool: &PgPool, oracle: &ScoringOracle, events: &EventBroadcaster, alert: Alert) {
    let verdict = match oracle.assess(&alert).await {
        Ok(v) => v,
        Err(e) => {
            warn!("Oracle assessment failed for alert {}: {}", alert.id, e);
            Verdict::fallback()
        }
    };

    match Alert::update_enrichment(pool, alert.id, verdict.score, &verdict.explanation).await {
        Ok(Some(updated)) => {
            debug!("Alert {} enriched, ml_score {}", updated.id, updated.ml_score);
            events.broadcast_lossy(DashboardEvent::ScoreUpdate {
                id: updated.id,
                ml_score: updated.ml_score,
                explanation: updated.explanation,
            });
        }
        // Row deleted out from under us; nothing to notify about
        Ok(None) => warn!("Alert {} vanished before enrichment write", alert.id),
        Err(e) => error!("Failed to persist enrichment for alert {}: {}", alert.id, e),
    }
}
