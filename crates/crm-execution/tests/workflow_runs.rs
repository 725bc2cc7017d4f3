use crm_application::{ActionExecutor, VerificationPolicy};
use crm_core::audit::ActionStatus;
use crm_core::auth::{AuthContext, Role};
use crm_core::directory::{DirectoryReader, DirectoryStore, DirectoryTransaction, User};
use crm_core::intent::Intent;
use crm_core::workflow::{
    ConditionOperator, RunStatus, StepCondition, StepType, WorkflowDefinition, WorkflowRepository,
    WorkflowStep,
};
use crm_execution::{ThinkingEventLayer, WorkflowEngine, WorkflowError};
use crm_infrastructure::{InMemoryActionLog, InMemoryDirectory, TomlWorkflowRepository};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::layer::SubscriberExt;

struct Fixture {
    directory: Arc<InMemoryDirectory>,
    audit: Arc<InMemoryActionLog>,
    engine: WorkflowEngine,
    auth: AuthContext,
}

fn fixture() -> Fixture {
    let directory = Arc::new(InMemoryDirectory::new());
    let audit = Arc::new(InMemoryActionLog::new());
    let executor = ActionExecutor::new(directory.clone(), audit.clone()).with_verification(
        VerificationPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            multiplier: 2,
        },
    );
    Fixture {
        directory,
        audit,
        engine: WorkflowEngine::new(Arc::new(executor)),
        auth: AuthContext::new("ws-1", "scheduler", Role::Owner),
    }
}

fn action(id: &str, intent: Intent) -> WorkflowStep {
    WorkflowStep::new(id, StepType::Action(intent))
}

/// A creates a group, B's condition is false, C reports.
fn skip_to_report() -> WorkflowDefinition {
    WorkflowDefinition::new("onboarding", "Onboarding", "A")
        .with_variable("vip_only", json!(false))
        .with_step(
            action("A", Intent::GroupCreate)
                .with_param("name", json!("Sales"))
                .on_success("B"),
        )
        .with_step(
            action("B", Intent::LabelCreate)
                .with_param("name", json!("VIP"))
                .with_param("color", json!("gold"))
                .with_condition(StepCondition {
                    field: "vip_only".into(),
                    operator: ConditionOperator::Equals,
                    value: json!(true),
                })
                .on_success("C")
                .on_error("C"),
        )
        .with_step(WorkflowStep::new("C", StepType::Report))
}

#[tokio::test]
async fn test_false_condition_is_skipped_to_on_error() {
    let f = fixture();
    let state = f.engine.run(&f.auth, &skip_to_report()).await.expect("Run should start");

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.visited, vec!["A", "B", "C"]);
    let mut recorded: Vec<&str> = state.step_results.keys().map(String::as_str).collect();
    recorded.sort();
    assert_eq!(recorded, vec!["A", "C"]);
    assert!(state.step_results["A"].success);

    let report = &state.step_results["C"].output;
    assert!(report.get("A").is_some());
    assert!(report.get("B").is_none());
    assert!(f.directory.snapshot("ws-1").await.labels().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_start_fails_before_running() {
    let f = fixture();
    let definition = WorkflowDefinition::new("broken", "Broken", "nowhere")
        .with_step(action("A", Intent::GroupCreate).with_param("name", json!("Sales")));

    let err = f.engine.run(&f.auth, &definition).await.unwrap_err();
    assert!(matches!(err, WorkflowError::MissingStart { .. }), "got {err:?}");
    assert!(f.audit.all().await.is_empty());
}

#[tokio::test]
async fn test_unknown_edge_fails_the_run() {
    let f = fixture();
    let definition = WorkflowDefinition::new("dangling", "Dangling", "A").with_step(
        action("A", Intent::GroupCreate)
            .with_param("name", json!("Sales"))
            .on_success("ghost"),
    );

    let state = f.engine.run(&f.auth, &definition).await.unwrap();
    assert_eq!(state.status, RunStatus::Failed);
    assert!(state.error.as_deref().unwrap().contains("ghost"));
    assert!(state.step_results["A"].success);
}

#[tokio::test]
async fn test_absent_edges_terminate_in_one_pass() {
    let f = fixture();
    let ok = WorkflowDefinition::new("ok", "Ok", "A")
        .with_step(action("A", Intent::GroupCreate).with_param("name", json!("Sales")));
    let state = f.engine.run(&f.auth, &ok).await.unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.visited.len(), 1);

    // Creating it again is a no-op error and there is no onError edge.
    let state = f.engine.run(&f.auth, &ok).await.unwrap();
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.visited.len(), 1);
    assert!(state.error.as_deref().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_failures_follow_on_error() {
    let f = fixture();
    let definition = WorkflowDefinition::new("recover", "Recover", "A")
        .with_step(
            action("A", Intent::LabelCreate)
                .with_param("name", json!("VIP"))
                .with_param("color", json!("not-a-color"))
                .on_error("B"),
        )
        .with_step(
            action("B", Intent::LabelCreate)
                .with_param("name", json!("VIP"))
                .with_param("color", json!("purple")),
        );

    let state = f.engine.run(&f.auth, &definition).await.unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert!(!state.step_results["A"].success);
    assert!(state.step_results["B"].success);

    let statuses: Vec<ActionStatus> = f.audit.all().await.into_iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![ActionStatus::Failed, ActionStatus::Success]);
    assert!(f.audit.all().await.iter().all(|r| r.session_id.as_deref() == Some(state.run_id.as_str())));
}

#[tokio::test]
async fn test_saved_results_feed_later_params() {
    let f = fixture();
    let mut tx = f.directory.begin("ws-1").await.unwrap();
    tx.save_user(User::new("Ali", "09120000000")).await.unwrap();
    tx.commit().await.unwrap();

    let definition = WorkflowDefinition::new("team", "Team", "A")
        .with_variable("who", json!("Ali"))
        .with_step(
            action("A", Intent::GroupCreate)
                .with_param("name", json!("Sales"))
                .with_param("saveAs", json!("group"))
                .on_success("B"),
        )
        .with_step(
            action("B", Intent::GroupAddMember)
                .with_param("group", json!("${group.data.id}"))
                .with_param("user", json!("${who}")),
        );

    let state = f.engine.run(&f.auth, &definition).await.unwrap();
    assert_eq!(state.status, RunStatus::Completed, "error: {:?}", state.error);
    assert_eq!(state.variables["group"]["data"]["name"], "Sales");

    let group = f.directory.snapshot("ws-1").await.groups().await.unwrap().remove(0);
    assert_eq!(group.member_ids.len(), 1);
}

#[tokio::test]
async fn test_delay_suspends_only_its_run() {
    let f = fixture();
    let definition = WorkflowDefinition::new("wait", "Wait", "A")
        .with_step(WorkflowStep::new("A", StepType::Delay).with_delay(30).on_success("B"))
        .with_step(WorkflowStep::new("B", StepType::Report));

    let started = Instant::now();
    let other = WorkflowDefinition::new("quick", "Quick", "R")
        .with_step(WorkflowStep::new("R", StepType::Report));
    let (slow, quick) = tokio::join!(f.engine.run(&f.auth, &definition), async {
        let state = f.engine.run(&f.auth, &other).await;
        (state, started.elapsed())
    });

    let slow = slow.unwrap();
    assert_eq!(slow.status, RunStatus::Completed);
    assert_eq!(slow.step_results["A"].output, json!({"delayedMs": 30}));
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(quick.0.unwrap().status, RunStatus::Completed);
    assert!(quick.1 < Duration::from_millis(30));
}

#[tokio::test]
async fn test_step_limit_stops_self_loops() {
    let f = fixture();
    let engine = f.engine.with_max_steps(Some(5));
    let definition = WorkflowDefinition::new("loop", "Loop", "A")
        .with_step(WorkflowStep::new("A", StepType::Condition).on_success("A"));

    let state = engine.run(&f.auth, &definition).await.unwrap();
    assert_eq!(state.status, RunStatus::Failed);
    assert_eq!(state.visited.len(), 5);
    assert_eq!(state.error.as_deref(), Some("step limit of 5 exceeded"));
}

#[tokio::test]
async fn test_runs_stream_thinking_events() {
    let (layer, mut rx) = ThinkingEventLayer::channel();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));

    let f = fixture();
    let state = f.engine.run(&f.auth, &skip_to_report()).await.unwrap();

    let mut phases = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.run_id, state.run_id);
        assert_eq!(event.workflow_id, "onboarding");
        phases.push(event.phase);
    }
    for expected in ["start", "step_start", "step_execute", "step_complete", "condition_check", "report", "complete"] {
        assert!(phases.iter().any(|p| p == expected), "missing {expected} in {phases:?}");
    }
    assert_eq!(phases.first().map(String::as_str), Some("start"));
    assert_eq!(phases.last().map(String::as_str), Some("complete"));
}

#[tokio::test]
async fn test_definitions_run_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let repository = TomlWorkflowRepository::new(dir.path());
    repository.save(&skip_to_report()).await.unwrap();

    let f = fixture();
    let state = f
        .engine
        .run_by_id(&repository, &f.auth, "onboarding")
        .await
        .unwrap();
    assert_eq!(state.status, RunStatus::Completed);

    let missing = f.engine.run_by_id(&repository, &f.auth, "nope").await.unwrap_err();
    assert!(matches!(missing, WorkflowError::Repository(_)));
}
