//! Execution queue
//!
//! Fire-and-forget submission of pending executions. Callers get control back
//! as soon as the execution id is queued. A worker task spawns one run per
//! execution; run outcomes that are not a clean terminal status are sent to a
//! separate failure channel, which marks orphaned executions as failed.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use relay_core::domain::execution::Execution;

use crate::error::EngineError;
use crate::service::ExecutionEngine;

/// A run that did not finish normally
#[derive(Debug, Clone)]
pub struct RunFailure {
    pub execution_id: Uuid,
    pub kind: RunFailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFailureKind {
    /// The engine returned an error (storage or state machine)
    Error,
    /// The run task panicked or was aborted
    Panic,
}

/// Handle for submitting executions
#[derive(Clone)]
pub struct ExecutionQueue {
    engine: Arc<ExecutionEngine>,
    tx: mpsc::Sender<Uuid>,
}

impl ExecutionQueue {
    /// Starts the worker and failure-handler tasks
    ///
    /// The worker stops once every queue handle is dropped and all in-flight
    /// runs have finished.
    pub fn start(engine: Arc<ExecutionEngine>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();

        let failures = tokio::spawn(handle_failures(Arc::clone(&engine), failure_rx));
        let worker = tokio::spawn(run_worker(Arc::clone(&engine), rx, failure_tx));

        let handle = tokio::spawn(async move {
            if let Err(e) = worker.await {
                error!("Execution queue worker stopped unexpectedly: {}", e);
            }
            if let Err(e) = failures.await {
                error!("Execution failure handler stopped unexpectedly: {}", e);
            }
        });

        (Self { engine, tx }, handle)
    }

    /// Queues a pending execution without waiting for it to run
    pub async fn submit(&self, execution_id: Uuid) -> Result<(), EngineError> {
        self.tx
            .send(execution_id)
            .await
            .map_err(|_| EngineError::InvalidState("execution queue is closed".to_string()))?;
        debug!("Execution {} queued", execution_id);
        Ok(())
    }

    /// Creates a pending execution and queues it
    pub async fn trigger(
        &self,
        pipeline_id: Uuid,
        input: JsonValue,
    ) -> Result<Execution, EngineError> {
        let execution = self.engine.create_execution(pipeline_id, input).await?;

        if let Err(e) = self.submit(execution.id).await {
            if let Err(fail_err) = self
                .engine
                .fail_orphaned(execution.id, format!("Could not queue execution: {}", e))
                .await
            {
                warn!(
                    "Could not mark unqueued execution {} as failed: {}",
                    execution.id, fail_err
                );
            }
            return Err(e);
        }

        Ok(execution)
    }
}

async fn run_worker(
    engine: Arc<ExecutionEngine>,
    mut rx: mpsc::Receiver<Uuid>,
    failures: mpsc::UnboundedSender<RunFailure>,
) {
    info!("Execution queue worker started");
    let mut running: JoinSet<Option<RunFailure>> = JoinSet::new();

    loop {
        tokio::select! {
            next = rx.recv() => {
                let Some(execution_id) = next else { break };
                let engine = Arc::clone(&engine);
                running.spawn(async move {
                    let outcome = tokio::spawn(async move { engine.run(execution_id).await }).await;
                    classify(execution_id, outcome)
                });
            }
            Some(done) = running.join_next(), if !running.is_empty() => {
                report(done, &failures);
            }
        }
    }

    while let Some(done) = running.join_next().await {
        report(done, &failures);
    }
    info!("Execution queue worker stopped");
}

fn classify(
    execution_id: Uuid,
    outcome: Result<Result<Execution, EngineError>, tokio::task::JoinError>,
) -> Option<RunFailure> {
    match outcome {
        Ok(Ok(execution)) => {
            debug!("Execution {} settled as {}", execution_id, execution.status);
            None
        }
        Ok(Err(e)) => Some(RunFailure {
            execution_id,
            kind: RunFailureKind::Error,
            message: e.to_string(),
        }),
        Err(e) => Some(RunFailure {
            execution_id,
            kind: RunFailureKind::Panic,
            message: if e.is_panic() {
                "Execution run panicked".to_string()
            } else {
                "Execution run was aborted".to_string()
            },
        }),
    }
}

fn report(
    done: Result<Option<RunFailure>, tokio::task::JoinError>,
    failures: &mpsc::UnboundedSender<RunFailure>,
) {
    match done {
        Ok(None) => {}
        Ok(Some(failure)) => {
            if failures.send(failure).is_err() {
                warn!("Execution failure handler is gone; dropping failure report");
            }
        }
        Err(e) => error!("Execution queue task failed: {}", e),
    }
}

async fn handle_failures(
    engine: Arc<ExecutionEngine>,
    mut rx: mpsc::UnboundedReceiver<RunFailure>,
) {
    while let Some(failure) = rx.recv().await {
        error!(
            "Execution {} failed outside the state machine ({:?}): {}",
            failure.execution_id, failure.kind, failure.message
        );

        if let Err(e) = engine
            .fail_orphaned(failure.execution_id, failure.message.clone())
            .await
        {
            warn!(
                "Could not mark execution {} as failed: {}",
                failure.execution_id, e
            );
        }
    }
}
