//! Background worker that sanitizes queued element payloads.
//!
//! This module is internal -- users interact with it indirectly through
//! [`EngineHandle`](crate::EngineHandle).

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::{mpsc, oneshot};

use crate::engine::Engine;
use crate::handle::Job;

pub async fn run(
    mut rx: mpsc::Receiver<Job>,
    mut shutdown_rx: oneshot::Receiver<()>,
    engine: Arc<Engine>,
    concurrency: usize,
    deadline: Duration,
) {
    let mut in_flight = FuturesUnordered::new();

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => {
                tracing::info!("Shutdown signal received, draining queue");
                rx.close();
                while let Some(job) = rx.recv().await {
                    if in_flight.len() >= concurrency {
                        in_flight.next().await;
                    }
                    in_flight.push(process(engine.clone(), job, deadline));
                }
                while in_flight.next().await.is_some() {}
                tracing::info!("Worker shut down");
                return;
            }

            Some(()) = in_flight.next(), if !in_flight.is_empty() => {}

            job = rx.recv(), if in_flight.len() < concurrency => match job {
                Some(job) => in_flight.push(process(engine.clone(), job, deadline)),
                None => {
                    while in_flight.next().await.is_some() {}
                    tracing::info!("All senders dropped, worker shut down");
                    return;
                }
            },
        }
    }
}

async fn process(engine: Arc<Engine>, job: Job, deadline: Duration) {
    let Job { payload, reply } = job;
    let task = tokio::task::spawn_blocking(move || engine.sanitize_element_data(&payload));

    let tree = match tokio::time::timeout(deadline, task).await {
        Ok(Ok(tree)) => tree,
        Ok(Err(e)) => {
            tracing::error!("Sanitization task failed: {e}");
            None
        }
        Err(_) => {
            tracing::warn!("Sanitization exceeded its {deadline:?} deadline, payload rejected");
            None
        }
    };

    if reply.send(tree).is_err() {
        tracing::debug!("Caller went away before the sanitized tree was ready");
    }
}
