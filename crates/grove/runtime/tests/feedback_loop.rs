//! End-to-end runs of the Grove feedback loop against the in-memory
//! store and a scripted model.

use grove_model::ScriptedModel;
use grove_runtime::{Caller, Grove, AUDIT_PIPELINE, IMPROVEMENT_CYCLE, KNOWLEDGE_SYNC};
use grove_store::{
    AgentStore, CollaborationStore, KnowledgeStore, LearningStore, MemoryStore, MessageStore,
    ProposalStore,
};
use grove_types::{
    Agent, AgentId, CoreError, Learning, LearningKind, LearningOutcome, ProposalPriority,
    ProposalStatus, RunStatus, SharedContext,
};
use serde_json::json;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("grove=debug")
        .with_test_writer()
        .try_init();
}

struct Harness {
    store: Arc<MemoryStore>,
    model: Arc<ScriptedModel>,
    grove: Grove,
    caller: Caller,
}

fn harness() -> Harness {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(ScriptedModel::new());
    let grove = Grove::builder(store.clone(), model.clone())
        .build()
        .expect("grove builds");
    Harness {
        store,
        model,
        grove,
        caller: Caller::new("operator-1"),
    }
}

async fn seed_agent(store: &MemoryStore, name: &str) -> AgentId {
    let agent = Agent::new(name, format!("{name} helps users"));
    let id = agent.id.clone();
    store.create_agent(agent).await.unwrap();
    id
}

fn script_suggestion_reply(model: &ScriptedModel) {
    model.push_structured(json!({
        "suggestions": [
            {
                "field": "description",
                "current_value": "scout helps users",
                "suggested_value": "scout finds, ranks, and summarizes documents",
                "reason": "description is too generic",
                "priority": "high"
            }
        ],
        "overall_assessment": "needs a sharper description"
    }));
}

fn script_passing_scenario(model: &ScriptedModel) {
    model.push_text("happy to help");
    model.push_structured(json!({
        "passed": true,
        "quality_score": 90.0,
        "feedback": "meets expectations"
    }));
}

#[tokio::test]
async fn audit_pipeline_end_to_end_spawns_a_medium_proposal() {
    let h = harness();
    let agent_id = seed_agent(&h.store, "scout").await;

    // Step 1: audit scores 60 (< 70), which triggers the proposal hook;
    // the hook's create consumes a suggestion reply.
    h.model.push_structured(json!({
        "score": 60.0,
        "findings": [],
        "suggestions": [],
        "summary": "weak configuration"
    }));
    script_suggestion_reply(&h.model);
    // Step 2: three passing scenarios keep the pass rate at 100.
    for _ in 0..3 {
        script_passing_scenario(&h.model);
    }
    // Step 3: analyze extracts nothing new.
    h.model
        .push_structured(json!({"learnings": [], "summary": "nothing new"}));
    // Step 4: suggest for the pipeline's own output.
    script_suggestion_reply(&h.model);

    let outcome = h
        .grove
        .run_workflow(
            Some(&h.caller),
            AUDIT_PIPELINE,
            Some(&agent_id),
            json!({}),
        )
        .await
        .unwrap();

    assert_eq!(outcome.steps_completed, 4);

    let collaboration = h
        .store
        .get_collaboration(&outcome.collaboration_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(collaboration.status, RunStatus::Completed);
    assert!(collaboration
        .steps
        .iter()
        .all(|s| s.status == RunStatus::Completed));
    assert_eq!(
        collaboration
            .shared_context
            .get(SharedContext::AUDIT_RESULT)
            .and_then(|v| v.get("score")),
        Some(&json!(60.0))
    );

    // The side-effect proposal: gap 10 below threshold 70 is medium.
    let proposal = h
        .store
        .pending_proposal_for(&agent_id)
        .await
        .unwrap()
        .expect("audit below threshold spawns a proposal");
    assert_eq!(proposal.priority, ProposalPriority::Medium);
    assert_eq!(proposal.trigger_value, 60.0);
    assert_eq!(proposal.suggestions.len(), 1);
    assert!(proposal.collaboration_id.is_some());
}

#[tokio::test]
async fn repeated_checks_never_duplicate_pending_proposals() {
    let h = harness();
    let agent_id = seed_agent(&h.store, "scout").await;

    script_suggestion_reply(&h.model);
    let first = h
        .grove
        .check_agent(Some(&h.caller), &agent_id, Some(55.0), None)
        .await
        .unwrap();
    assert!(first.triggered);
    assert_eq!(first.proposals.len(), 1);

    // Same signal again: suppressed by the pending-review invariant.
    let second = h
        .grove
        .check_agent(Some(&h.caller), &agent_id, Some(55.0), None)
        .await
        .unwrap();
    assert!(!second.triggered);
    assert!(second.proposals.is_empty());

    let proposals = h.store.list_proposals().await.unwrap();
    assert_eq!(proposals.len(), 1);
}

#[tokio::test]
async fn improvement_cycle_applies_an_approved_proposal() {
    let h = harness();
    let agent_id = seed_agent(&h.store, "scout").await;

    // Create and approve a proposal.
    script_suggestion_reply(&h.model);
    let check = h
        .grove
        .check_agent(Some(&h.caller), &agent_id, Some(60.0), None)
        .await
        .unwrap();
    let proposal_id = check.proposals[0].id.clone();
    h.grove
        .review_proposal(Some(&h.caller), &proposal_id, true)
        .await
        .unwrap();

    // Cycle: audit (85, above threshold), apply, simulate (passing),
    // validate.
    h.model
        .push_structured(json!({"score": 85.0, "summary": "improved"}));
    for _ in 0..3 {
        script_passing_scenario(&h.model);
    }

    let outcome = h
        .grove
        .run_workflow(
            Some(&h.caller),
            IMPROVEMENT_CYCLE,
            Some(&agent_id),
            json!({"proposalId": proposal_id}),
        )
        .await
        .unwrap();

    assert_eq!(outcome.steps_completed, 4);

    // The suggestion landed on the agent.
    let agent = h.store.get_agent(&agent_id).await.unwrap().unwrap();
    assert_eq!(agent.description, "scout finds, ranks, and summarizes documents");

    let proposal = h.store.get_proposal(&proposal_id).await.unwrap().unwrap();
    assert_eq!(proposal.status, ProposalStatus::Applied);

    // validate saw both signals above threshold.
    let validate_output = &outcome.results[3].result;
    assert_eq!(validate_output["validated"], json!(true));
}

#[tokio::test]
async fn knowledge_sync_distributes_consolidated_insights() {
    let h = harness();

    for insight in ["tight descriptions win", "always set a personality"] {
        let mut learning = Learning::new(LearningKind::Pattern, "history", insight, 80);
        learning.outcome = LearningOutcome::Positive;
        h.store.create_learning(learning).await.unwrap();
    }

    h.model.push_structured(json!({
        "consolidated_insights": [
            "Be specific about the agent's scope",
            "Personality fields reduce failure rates"
        ],
        "key_patterns": ["specificity"]
    }));

    let outcome = h
        .grove
        .run_workflow(Some(&h.caller), KNOWLEDGE_SYNC, None, json!({}))
        .await
        .unwrap();

    assert_eq!(outcome.steps_completed, 3);
    assert_eq!(outcome.results[2].result, json!({"distributed": 2}));

    let items = h.store.list_knowledge(10).await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|k| k.validated && k.confidence_score == 75));
}

#[tokio::test]
async fn operations_require_a_caller_identity() {
    let h = harness();
    let agent_id = seed_agent(&h.store, "scout").await;

    let err = h
        .grove
        .run_workflow(None, AUDIT_PIPELINE, Some(&agent_id), json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized));

    let err = h.grove.scan_agents(None).await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized));

    let err = h
        .grove
        .apply_proposal(None, &grove_types::ProposalId::new("p1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized));
}

#[tokio::test]
async fn unknown_workflow_type_is_rejected() {
    let h = harness();
    let err = h
        .grove
        .run_workflow(Some(&h.caller), "mystery_flow", None, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));
}

#[tokio::test]
async fn workflow_messages_form_an_audit_trail() {
    let h = harness();

    h.model
        .push_structured(json!({"consolidated_insights": [], "key_patterns": []}));
    let outcome = h
        .grove
        .run_workflow(Some(&h.caller), KNOWLEDGE_SYNC, None, json!({}))
        .await
        .unwrap();

    let messages = h.store.list_messages().await.unwrap();
    let for_run: Vec<_> = messages
        .iter()
        .filter(|m| m.collaboration_id.as_ref() == Some(&outcome.collaboration_id))
        .collect();
    // Three steps, each tracing a request and a response.
    assert_eq!(for_run.len(), 6);
}
