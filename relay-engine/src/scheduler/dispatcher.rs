//! Scheduler dispatcher
//!
//! On every tick, finds pipelines that should run and submits them to the
//! execution queue without waiting for them. Two trigger paths:
//! - Explicit schedules whose `next_run_at` has passed
//! - Flow-style pipelines whose cron expression matches the current minute
//!
//! A failing trigger is recorded in the report and never stops the others.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use relay_core::cron;
use relay_core::domain::schedule::Schedule;
use relay_core::dto::schedule::{DispatchFailure, DispatchReport};
use serde_json::json;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::scheduler::queue::ExecutionQueue;
use crate::store::Store;

pub struct SchedulerDispatcher {
    store: Arc<dyn Store>,
    queue: ExecutionQueue,
    /// Minute the flow-style path last fired for, so a minute fires once
    last_flow_minute: Mutex<Option<DateTime<Utc>>>,
}

impl SchedulerDispatcher {
    pub fn new(store: Arc<dyn Store>, queue: ExecutionQueue) -> Self {
        Self {
            store,
            queue,
            last_flow_minute: Mutex::new(None),
        }
    }

    /// Fires everything due at `now`
    pub async fn dispatch(&self, now: DateTime<Utc>) -> DispatchReport {
        let mut report = DispatchReport::default();

        self.dispatch_schedules(now, &mut report).await;
        self.dispatch_flows(now, &mut report).await;

        if report.triggered > 0 || !report.failures.is_empty() {
            info!(
                "Dispatch at {}: {} triggered, {} failed",
                now,
                report.triggered,
                report.failures.len()
            );
        } else {
            debug!("Dispatch at {}: nothing due", now);
        }

        report
    }

    /// Ticks forever at `period`
    pub async fn run_periodic(self: Arc<Self>, period: Duration) {
        info!("Starting scheduler dispatcher (interval: {:?})", period);

        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            self.dispatch(Utc::now()).await;
        }
    }

    async fn dispatch_schedules(&self, now: DateTime<Utc>, report: &mut DispatchReport) {
        let due = match self.store.list_due_schedules(now).await {
            Ok(due) => due,
            Err(e) => {
                error!("Failed to load due schedules: {}", e);
                return;
            }
        };

        for schedule in due {
            let mut fired = schedule.clone();
            fired.mark_fired(now);

            // Advance first; only the dispatcher whose claim lands fires
            match self
                .store
                .claim_schedule(schedule.id, schedule.next_run_at, fired.next_run_at, now)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Schedule {} already claimed by another tick", schedule.id);
                    continue;
                }
                Err(e) => {
                    error!("Failed to advance schedule {}: {}", schedule.id, e);
                    report
                        .failures
                        .push(failure(&schedule, format!("could not advance schedule: {}", e)));
                    continue;
                }
            }

            let input = schedule.input_template.clone().unwrap_or_else(|| json!({}));

            match self.queue.trigger(schedule.pipeline_id, input).await {
                Ok(execution) => {
                    report.triggered += 1;
                    info!(
                        "Schedule {} fired execution {} for pipeline {}",
                        schedule.id, execution.id, schedule.pipeline_id
                    );
                }
                Err(e) => {
                    warn!(
                        "Schedule {} could not trigger pipeline {}: {}",
                        schedule.id, schedule.pipeline_id, e
                    );
                    report.failures.push(failure(&schedule, e.to_string()));
                }
            }
        }
    }

    async fn dispatch_flows(&self, now: DateTime<Utc>, report: &mut DispatchReport) {
        let minute = now
            .duration_trunc(TimeDelta::minutes(1))
            .unwrap_or(now);
        if self.flow_minute_done(minute) {
            debug!("Flow triggers already evaluated for {}", minute);
            return;
        }

        let pipelines = match self.store.list_cron_pipelines().await {
            Ok(pipelines) => pipelines,
            Err(e) => {
                error!("Failed to load cron pipelines: {}", e);
                return;
            }
        };

        // A failed load leaves the minute open for the next tick
        {
            let mut last = self.lock_flow_minute();
            if *last == Some(minute) {
                debug!("Flow triggers for {} taken by a concurrent tick", minute);
                return;
            }
            *last = Some(minute);
        }

        for pipeline in pipelines {
            let Some(expr) = pipeline.cron_expression.as_deref() else {
                continue;
            };
            if !cron::matches(expr, now) {
                continue;
            }

            match self.queue.trigger(pipeline.id, json!({})).await {
                Ok(execution) => {
                    report.triggered += 1;
                    info!(
                        "Pipeline '{}' fired execution {} on cron '{}'",
                        pipeline.name, execution.id, expr
                    );
                }
                Err(e) => {
                    warn!("Pipeline {} could not be triggered: {}", pipeline.id, e);
                    report.failures.push(DispatchFailure {
                        pipeline_id: pipeline.id,
                        schedule_id: None,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    fn flow_minute_done(&self, minute: DateTime<Utc>) -> bool {
        *self.lock_flow_minute() == Some(minute)
    }

    fn lock_flow_minute(&self) -> MutexGuard<'_, Option<DateTime<Utc>>> {
        self.last_flow_minute.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn failure(schedule: &Schedule, error: String) -> DispatchFailure {
    DispatchFailure {
        pipeline_id: schedule.pipeline_id,
        schedule_id: Some(schedule.id),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;
    use crate::agent::EchoAgentRunner;
    use crate::service::{DelegationService, ExecutionEngine};
    use crate::store::PipelineStore;
    use crate::store::testing::FaultyStore;
    use chrono::TimeZone;
    use relay_core::domain::pipeline::{Pipeline, Strategy};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_failed_flow_load_retries_within_minute() {
        let store = Arc::new(FaultyStore::default());
        let dyn_store: Arc<dyn Store> = store.clone();
        let runner = Arc::new(EchoAgentRunner);
        let delegation = Arc::new(DelegationService::new(dyn_store.clone(), runner.clone()));
        let engine = Arc::new(ExecutionEngine::new(
            dyn_store.clone(),
            runner,
            delegation,
            EngineConfig::default(),
        ));
        let (queue, _worker) = ExecutionQueue::start(engine, 8);
        let dispatcher = SchedulerDispatcher::new(dyn_store, queue);

        let pipeline = Pipeline {
            id: Uuid::new_v4(),
            name: "heartbeat".to_string(),
            description: None,
            owner_id: "owner-1".to_string(),
            strategy: Strategy::Sequential,
            steps: Vec::new(),
            cron_expression: Some("* * * * *".to_string()),
            is_active: true,
            version: 1,
            created_at: Utc::now(),
        };
        store.insert_pipeline(&pipeline).await.unwrap();

        let minute = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        store.fail_cron_loads(1);

        assert_eq!(dispatcher.dispatch(minute).await.triggered, 0);
        assert_eq!(
            dispatcher.dispatch(minute + TimeDelta::seconds(20)).await.triggered,
            1
        );
        assert_eq!(
            dispatcher.dispatch(minute + TimeDelta::seconds(40)).await.triggered,
            0
        );
    }
}
