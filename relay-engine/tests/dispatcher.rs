mod common;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use relay_core::cron;
use relay_core::domain::execution::ExecutionStatus;
use relay_core::domain::pipeline::Strategy;
use relay_core::domain::schedule::Schedule;
use relay_core::dto::pipeline::CreatePipeline;
use relay_engine::agent::AgentInvocation;
use relay_engine::scheduler::{ExecutionQueue, SchedulerDispatcher};
use relay_engine::service::PipelineService;
use relay_engine::store::{ExecutionStore, PipelineStore, ScheduleStore, Store};
use serde_json::json;
use uuid::Uuid;

use common::*;

struct Fixture {
    h: Harness,
    dispatcher: SchedulerDispatcher,
}

fn fixture(runner: Arc<ScriptedRunner>) -> Fixture {
    let h = harness(runner);
    let (queue, _worker) = ExecutionQueue::start(h.engine.clone(), 16);
    let store: Arc<dyn Store> = h.store.clone();
    let dispatcher = SchedulerDispatcher::new(store, queue);
    Fixture { h, dispatcher }
}

fn schedule(pipeline_id: Uuid, expression: &str, next_run_at: DateTime<Utc>) -> Schedule {
    Schedule {
        id: Uuid::new_v4(),
        pipeline_id,
        cron_expression: expression.to_string(),
        label: None,
        input_template: None,
        next_run_at,
        last_run_at: None,
        is_active: true,
        created_at: Utc::now(),
    }
}

fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, second).unwrap()
}

#[tokio::test]
async fn test_due_schedule_fires_and_advances() {
    let f = fixture(ScriptedRunner::by_model());
    let agent = seed_agent(&f.h.store, "Writer", true).await;
    let pipeline = seed_pipeline(&f.h.store, Strategy::Sequential, vec![agent_step(&agent, "Writer")]).await;

    let now = at(9, 0, 0);
    let mut s = schedule(pipeline.id, "*/15 * * * *", now - TimeDelta::minutes(1));
    s.input_template = Some(json!("weekly digest"));
    f.h.store.insert_schedule(&s).await.unwrap();

    let report = f.dispatcher.dispatch(now).await;
    assert_eq!(report.triggered, 1);
    assert!(report.failures.is_empty());

    let stored = f.h.store.find_schedule(s.id).await.unwrap().unwrap();
    assert_eq!(stored.last_run_at, Some(now));
    assert_eq!(stored.next_run_at, cron::next_run_at("*/15 * * * *", now));
    assert_eq!(stored.next_run_at, at(9, 15, 0));

    let executions = f.h.store.list_executions_for_pipeline(pipeline.id).await.unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].input, json!("weekly digest"));

    let done = wait_terminal(&f.h.store, executions[0].id).await;
    assert_eq!(done.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_schedule_without_template_gets_empty_object() {
    let f = fixture(ScriptedRunner::by_model());
    let agent = seed_agent(&f.h.store, "Writer", true).await;
    let pipeline = seed_pipeline(&f.h.store, Strategy::Sequential, vec![agent_step(&agent, "Writer")]).await;

    let now = at(9, 0, 0);
    f.h.store
        .insert_schedule(&schedule(pipeline.id, "0 9 * * *", now))
        .await
        .unwrap();

    f.dispatcher.dispatch(now).await;

    let executions = f.h.store.list_executions_for_pipeline(pipeline.id).await.unwrap();
    assert_eq!(executions[0].input, json!({}));
}

#[tokio::test]
async fn test_failed_trigger_does_not_block_other_schedules() {
    let f = fixture(ScriptedRunner::by_model());
    let agent = seed_agent(&f.h.store, "Writer", true).await;
    let pipeline = seed_pipeline(&f.h.store, Strategy::Sequential, vec![agent_step(&agent, "Writer")]).await;

    let now = at(12, 30, 0);
    let orphan = schedule(Uuid::new_v4(), "* * * * *", now - TimeDelta::minutes(5));
    let healthy = schedule(pipeline.id, "* * * * *", now - TimeDelta::minutes(5));
    f.h.store.insert_schedule(&orphan).await.unwrap();
    f.h.store.insert_schedule(&healthy).await.unwrap();

    let report = f.dispatcher.dispatch(now).await;

    assert_eq!(report.triggered, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].schedule_id, Some(orphan.id));
    assert!(report.failures[0].error.contains("not found"));

    for id in [orphan.id, healthy.id] {
        let stored = f.h.store.find_schedule(id).await.unwrap().unwrap();
        assert_eq!(stored.next_run_at, at(12, 31, 0));
    }
}

#[tokio::test]
async fn test_schedules_not_yet_due_or_inactive_are_skipped() {
    let f = fixture(ScriptedRunner::by_model());
    let agent = seed_agent(&f.h.store, "Writer", true).await;
    let pipeline = seed_pipeline(&f.h.store, Strategy::Sequential, vec![agent_step(&agent, "Writer")]).await;

    let now = at(8, 0, 0);
    let later = schedule(pipeline.id, "0 9 * * *", at(9, 0, 0));
    let mut paused = schedule(pipeline.id, "* * * * *", now - TimeDelta::minutes(1));
    paused.is_active = false;
    f.h.store.insert_schedule(&later).await.unwrap();
    f.h.store.insert_schedule(&paused).await.unwrap();

    let report = f.dispatcher.dispatch(now).await;

    assert_eq!(report.triggered, 0);
    assert!(f.h.store.list_executions_for_pipeline(pipeline.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cron_pipeline_fires_once_per_minute() {
    let f = fixture(ScriptedRunner::by_model());
    let agent = seed_agent(&f.h.store, "Writer", true).await;
    let pipeline = seed_cron_pipeline(
        &f.h.store,
        Strategy::Sequential,
        vec![agent_step(&agent, "Writer")],
        Some("*/5 * * * *"),
    )
    .await;

    assert_eq!(f.dispatcher.dispatch(at(10, 5, 0)).await.triggered, 1);
    assert_eq!(f.dispatcher.dispatch(at(10, 5, 30)).await.triggered, 0);
    assert_eq!(f.dispatcher.dispatch(at(10, 6, 0)).await.triggered, 0);
    assert_eq!(f.dispatcher.dispatch(at(10, 10, 1)).await.triggered, 1);

    let executions = f.h.store.list_executions_for_pipeline(pipeline.id).await.unwrap();
    assert_eq!(executions.len(), 2);
    assert!(executions.iter().all(|e| e.input == json!({})));
}

#[tokio::test]
async fn test_inactive_cron_pipeline_is_ignored() {
    let f = fixture(ScriptedRunner::by_model());
    let agent = seed_agent(&f.h.store, "Writer", true).await;
    let pipeline = seed_cron_pipeline(
        &f.h.store,
        Strategy::Sequential,
        vec![agent_step(&agent, "Writer")],
        Some("* * * * *"),
    )
    .await;
    f.h.store.set_pipeline_active(pipeline.id, false).await.unwrap();

    let report = f.dispatcher.dispatch(at(10, 0, 0)).await;
    assert_eq!(report.triggered, 0);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_panicking_run_is_marked_failed() {
    let runner = ScriptedRunner::new(|_: &AgentInvocation| panic!("runner blew up"));
    let f = fixture(runner);
    let agent = seed_agent(&f.h.store, "Writer", true).await;
    let pipeline = seed_pipeline(&f.h.store, Strategy::Sequential, vec![agent_step(&agent, "Writer")]).await;

    let now = at(7, 0, 0);
    f.h.store
        .insert_schedule(&schedule(pipeline.id, "0 7 * * *", now))
        .await
        .unwrap();

    let report = f.dispatcher.dispatch(now).await;
    assert_eq!(report.triggered, 1);

    let executions = f.h.store.list_executions_for_pipeline(pipeline.id).await.unwrap();
    let done = wait_terminal(&f.h.store, executions[0].id).await;
    assert_eq!(done.status, ExecutionStatus::Failed);
    assert!(done.error.unwrap().contains("panicked"));
}

#[tokio::test]
async fn test_new_version_keeps_schedules_firing() {
    let f = fixture(ScriptedRunner::by_model());
    let agent = seed_agent(&f.h.store, "Writer", true).await;
    let original = seed_pipeline(&f.h.store, Strategy::Sequential, vec![agent_step(&agent, "Writer")]).await;

    let now = at(9, 0, 0);
    let s = schedule(original.id, "0 9 * * *", now);
    f.h.store.insert_schedule(&s).await.unwrap();

    let store: Arc<dyn Store> = f.h.store.clone();
    let next = PipelineService::new(store)
        .new_version(
            original.id,
            CreatePipeline {
                name: "launch".to_string(),
                description: Some("tighter copy".to_string()),
                owner_id: "owner-1".to_string(),
                strategy: Strategy::Sequential,
                steps: vec![agent_step(&agent, "Writer")],
                cron_expression: None,
                is_active: true,
            },
        )
        .await
        .unwrap();

    let report = f.dispatcher.dispatch(now).await;
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.triggered, 1);

    let stored = f.h.store.find_schedule(s.id).await.unwrap().unwrap();
    assert_eq!(stored.pipeline_id, next.id);
    assert!(f.h.store.list_executions_for_pipeline(original.id).await.unwrap().is_empty());
    assert_eq!(f.h.store.list_executions_for_pipeline(next.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_ticks_fire_schedule_once() {
    let f = fixture(ScriptedRunner::by_model());
    let agent = seed_agent(&f.h.store, "Writer", true).await;
    let pipeline = seed_pipeline(&f.h.store, Strategy::Sequential, vec![agent_step(&agent, "Writer")]).await;
    let dispatcher = Arc::new(f.dispatcher);
    f.h.store
        .insert_schedule(&schedule(pipeline.id, "0 9 * * *", at(9, 0, 0)))
        .await
        .unwrap();

    // Each round the schedule is due again one day later
    for round in 0..20 {
        let now = at(9, 0, 0) + TimeDelta::days(round);

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.dispatch(now).await }
        });
        let second = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.dispatch(now).await }
        });

        let triggered = first.await.unwrap().triggered + second.await.unwrap().triggered;
        assert_eq!(triggered, 1, "round {}", round);
    }

    let executions = f.h.store.list_executions_for_pipeline(pipeline.id).await.unwrap();
    assert_eq!(executions.len(), 20);
}
