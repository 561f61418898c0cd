//! Progress notifier
//!
//! Streams the state of one execution to one subscriber by re-reading the
//! stored record on a timer. The subscriber sees `connected` once, an
//! `execution-update` whenever the record changed, then exactly one `done`
//! when the execution is terminal, or one `error` if reads keep failing.
//! Dropping the receiver stops the poller.

use std::sync::Arc;
use std::time::Duration;

use relay_core::dto::execution::ExecutionUpdate;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::store::ExecutionStore;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Connected,
    Update(ExecutionUpdate),
    Done,
    Error(String),
}

impl ProgressEvent {
    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::Connected => "connected",
            ProgressEvent::Update(_) => "execution-update",
            ProgressEvent::Done => "done",
            ProgressEvent::Error(_) => "error",
        }
    }
}

#[derive(Clone)]
pub struct ProgressNotifier {
    store: Arc<dyn ExecutionStore>,
    poll_interval: Duration,
    max_failures: u32,
}

impl ProgressNotifier {
    pub fn new(store: Arc<dyn ExecutionStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            poll_interval: config.progress_poll_interval,
            max_failures: config.progress_max_failures,
        }
    }

    /// Starts polling `execution_id` for a new subscriber
    pub fn subscribe(&self, execution_id: Uuid) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let notifier = self.clone();
        tokio::spawn(async move { notifier.poll(execution_id, tx).await });
        rx
    }

    async fn poll(self, execution_id: Uuid, tx: mpsc::Sender<ProgressEvent>) {
        if tx.send(ProgressEvent::Connected).await.is_err() {
            return;
        }

        let mut interval = time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        let mut last: Option<ExecutionUpdate> = None;
        let mut failures = 0u32;

        loop {
            tokio::select! {
                _ = tx.closed() => {
                    debug!("Progress subscriber for {} disconnected", execution_id);
                    return;
                }
                _ = interval.tick() => {}
            }

            let execution = match self.store.find_execution(execution_id).await {
                Ok(Some(execution)) => {
                    failures = 0;
                    execution
                }
                Ok(None) => {
                    let _ = tx
                        .send(ProgressEvent::Error(format!(
                            "execution {} not found",
                            execution_id
                        )))
                        .await;
                    return;
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        "Progress read {}/{} for {} failed: {}",
                        failures, self.max_failures, execution_id, e
                    );
                    if failures >= self.max_failures {
                        let _ = tx
                            .send(ProgressEvent::Error(format!(
                                "giving up after {} failed reads: {}",
                                failures, e
                            )))
                            .await;
                        return;
                    }
                    continue;
                }
            };

            let update = ExecutionUpdate::from(&execution);
            if last.as_ref() != Some(&update) {
                if tx.send(ProgressEvent::Update(update.clone())).await.is_err() {
                    return;
                }
                last = Some(update);
            }

            if execution.status.is_terminal() {
                let _ = tx.send(ProgressEvent::Done).await;
                debug!("Progress stream for {} finished", execution_id);
                return;
            }
        }
    }
}
