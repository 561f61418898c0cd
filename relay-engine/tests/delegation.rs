mod common;

use relay_core::domain::delegation::DelegationStatus;
use relay_engine::agent::{AgentError, AgentInvocation, DelegationIntent};
use relay_engine::service::{DelegationRequest, MAX_DELEGATION_DEPTH};
use relay_engine::store::DelegationStore;
use uuid::Uuid;

use common::*;

fn request(from: Uuid, to: Uuid, depth: u32) -> DelegationRequest {
    DelegationRequest {
        from_agent_id: from,
        to_agent_id: to,
        caller_user_id: "user-7".to_string(),
        message: "summarize the findings".to_string(),
        depth,
    }
}

#[tokio::test]
async fn test_depth_limit_refuses_without_calling_or_recording() {
    let runner = ScriptedRunner::new(|_: &AgentInvocation| Ok(reply("should not run")));
    let h = harness(runner.clone());
    let from = seed_agent(&h.store, "Lead", true).await;
    let to = seed_agent(&h.store, "Helper", true).await;

    let text = h
        .delegation
        .delegate(request(from.id, to.id, MAX_DELEGATION_DEPTH))
        .await;

    assert!(text.contains("maximum delegation depth of 3"));
    assert_eq!(runner.call_count(), 0);
    assert!(h.store.list_delegations_for_agent(to.id).await.unwrap().is_empty());
    assert!(h.store.list_delegations_for_agent(from.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disabled_target_is_refused_without_record() {
    let runner = ScriptedRunner::by_model();
    let h = harness(runner.clone());
    let from = seed_agent(&h.store, "Lead", true).await;
    let to = seed_agent(&h.store, "Helper", false).await;

    let text = h.delegation.delegate(request(from.id, to.id, 0)).await;

    assert!(text.contains("disabled"));
    assert_eq!(runner.call_count(), 0);
    assert!(h.store.list_delegations_for_agent(to.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_target_is_reported_as_text() {
    let runner = ScriptedRunner::by_model();
    let h = harness(runner.clone());
    let from = seed_agent(&h.store, "Lead", true).await;
    let missing = Uuid::new_v4();

    let text = h.delegation.delegate(request(from.id, missing, 0)).await;

    assert!(text.contains("does not exist"));
    assert_eq!(runner.call_count(), 0);
    assert!(h.store.list_delegations_for_agent(from.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_successful_delegation_is_recorded_once() {
    let runner = ScriptedRunner::new(|_: &AgentInvocation| Ok(reply("three key findings")));
    let h = harness(runner.clone());
    let from = seed_agent(&h.store, "Lead", true).await;
    let to = seed_agent(&h.store, "Helper", true).await;

    let text = h.delegation.delegate(request(from.id, to.id, 0)).await;
    assert_eq!(text, "three key findings");

    let records = h.store.list_delegations_for_agent(to.id).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, DelegationStatus::Completed);
    assert_eq!(record.response.as_deref(), Some("three key findings"));
    assert_eq!(record.depth, 0);
    assert_eq!(record.from_agent_id, from.id);
    assert_eq!(record.caller_user_id, "user-7");
    assert!(record.completed_at.is_some());

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].depth, 1);
    assert_eq!(calls[0].prompt, "summarize the findings");
    assert_eq!(calls[0].instructions, "You are the Helper.");
}

#[tokio::test]
async fn test_upstream_failure_marks_record_failed() {
    let runner = ScriptedRunner::new(|_: &AgentInvocation| {
        Err(AgentError::Upstream("503 from model host".to_string()))
    });
    let h = harness(runner);
    let from = seed_agent(&h.store, "Lead", true).await;
    let to = seed_agent(&h.store, "Helper", true).await;

    let text = h.delegation.delegate(request(from.id, to.id, 1)).await;
    assert!(text.contains("503 from model host"));

    let records = h.store.list_delegations_for_agent(to.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DelegationStatus::Failed);
    assert_eq!(records[0].depth, 1);
    assert!(records[0].response.as_deref().unwrap().contains("503 from model host"));
}

#[tokio::test]
async fn test_self_delegation_loop_stops_at_depth_limit() {
    let runner = ScriptedRunner::new(|inv: &AgentInvocation| {
        let mut r = reply(format!("level {}", inv.depth));
        r.delegations.push(DelegationIntent {
            to_agent_id: inv.agent_id,
            message: "go deeper".to_string(),
        });
        Ok(r)
    });
    let h = harness(runner.clone());
    let agent = seed_agent(&h.store, "Looper", true).await;

    let text = h.delegation.delegate(request(agent.id, agent.id, 0)).await;

    assert_eq!(runner.call_count(), 3);
    let depths: Vec<u32> = runner.calls().iter().map(|c| c.depth).collect();
    assert_eq!(depths, vec![1, 2, 3]);

    let records = h.store.list_delegations_for_agent(agent.id).await.unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.status == DelegationStatus::Completed));

    assert!(text.starts_with("level 1"));
    assert!(text.contains("level 2"));
    assert!(text.contains("level 3"));
    assert!(text.contains("maximum delegation depth"));
}
