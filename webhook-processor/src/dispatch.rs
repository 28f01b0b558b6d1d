//! Bounded queue + worker pool in front of the processor.
//!
//! `enqueue` copies the payload and does a non-blocking push; a full queue
//! is a typed error the HTTP layer maps to 503. Workers share the receiver
//! behind an async mutex and exit when the shutdown signal fires; the job
//! in flight always runs to completion.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{WebhookError, WebhookResult};
use crate::processor::Processor;

/// Queue and worker-pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct AsyncConfig {
    pub queue_size: usize,
    pub workers: usize,
}

impl Default for AsyncConfig {
    fn default() -> Self {
        Self {
            queue_size: 100,
            workers: 1,
        }
    }
}

struct Job {
    event_type: String,
    payload: Vec<u8>,
    delivery_id: String,
}

/// Accepts webhook jobs and drains them on a worker pool.
pub struct AsyncProcessor {
    tx: mpsc::Sender<Job>,
    /// Keeps the channel open even after every worker has exited, so a
    /// post-shutdown enqueue reports backpressure, not a closed queue.
    _rx: Arc<AsyncMutex<mpsc::Receiver<Job>>>,
    shutdown: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl AsyncProcessor {
    /// Spawns the worker pool. Sizes below 1 are clamped to 1.
    pub fn new(processor: Processor, cfg: AsyncConfig) -> Self {
        let queue_size = cfg.queue_size.max(1);
        let workers = cfg.workers.max(1);

        let (tx, rx) = mpsc::channel(queue_size);
        let rx = Arc::new(AsyncMutex::new(rx));
        let (shutdown_tx, _) = watch::channel(false);
        let processor = Arc::new(processor);

        let handles = (0..workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    processor.clone(),
                    rx.clone(),
                    shutdown_tx.subscribe(),
                    worker_id,
                ))
            })
            .collect();

        Self {
            tx,
            _rx: rx,
            shutdown: shutdown_tx,
            handles: Mutex::new(handles),
        }
    }

    /// Copies the payload and pushes it without blocking. A full queue
    /// yields [`WebhookError::QueueFull`].
    pub fn enqueue(
        &self,
        event_type: &str,
        payload: &[u8],
        delivery_id: &str,
    ) -> WebhookResult<()> {
        let job = Job {
            event_type: event_type.to_string(),
            payload: payload.to_vec(),
            delivery_id: delivery_id.to_string(),
        };

        self.tx.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => WebhookError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => WebhookError::Stopped,
        })
    }

    /// Signals shutdown and waits for the workers until `deadline`.
    /// An already-expired deadline is a deadline error even when the pool
    /// is idle.
    pub async fn stop(&self, deadline: Instant) -> WebhookResult<()> {
        let _ = self.shutdown.send(true);

        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.handles.lock().unwrap_or_else(|e| e.into_inner());
            guard.drain(..).collect()
        };

        let remaining = match deadline.checked_duration_since(Instant::now()) {
            Some(remaining) if !remaining.is_zero() => remaining,
            _ => return Err(WebhookError::StopDeadline),
        };

        tokio::time::timeout(remaining, futures::future::join_all(handles))
            .await
            .map_err(|_| WebhookError::StopDeadline)?;

        Ok(())
    }
}

async fn worker_loop(
    processor: Arc<Processor>,
    rx: Arc<AsyncMutex<mpsc::Receiver<Job>>>,
    mut shutdown: watch::Receiver<bool>,
    worker_id: usize,
) {
    loop {
        if *shutdown.borrow() {
            debug!(worker = worker_id, "worker exiting");
            return;
        }

        let job = {
            let mut rx = rx.lock().await;
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!(worker = worker_id, "worker exiting");
                    return;
                }
                job = rx.recv() => match job {
                    Some(job) => job,
                    None => return,
                },
            }
        };

        if let Err(err) = processor
            .process(&job.event_type, &job.payload, &job.delivery_id)
            .await
        {
            warn!(
                worker = worker_id,
                event = %job.event_type,
                delivery = %job.delivery_id,
                %err,
                "webhook job failed"
            );
        }
    }
}
