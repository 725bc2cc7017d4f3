mod support;

use crm_application::{ActionExecutor, VerificationPolicy};
use crm_core::action::{ActionError, ActionRequest};
use crm_core::audit::ActionStatus;
use crm_core::directory::{
    DirectoryReader, DirectoryStore, DirectoryTransaction, Group, Label, User,
};
use crm_core::intent::Intent;
use crm_core::slots::IntentData;
use crm_infrastructure::InMemoryActionLog;
use serde_json::{Value, json};
use std::sync::Arc;
use support::{LaggingDirectory, LostCommitDirectory, admin, fast_verification};

fn data(intent: Intent, fields: Value) -> IntentData {
    IntentData::from_extracted(intent, fields.as_object().expect("Fields should be an object"))
        .expect("Fields should parse")
}

async fn lagging_executor(
    lag: usize,
    policy: VerificationPolicy,
) -> (Arc<LaggingDirectory>, Arc<InMemoryActionLog>, ActionExecutor) {
    let directory = Arc::new(LaggingDirectory::new(lag));
    let mut tx = directory.inner().begin("ws-1").await.unwrap();
    tx.save_label(Label::new("VIP", "#3b82f6")).await.unwrap();
    tx.save_user(User::new("Ali", "09120000000")).await.unwrap();
    tx.commit().await.unwrap();

    let audit = Arc::new(InMemoryActionLog::new());
    let executor = ActionExecutor::new(directory.clone(), audit.clone()).with_verification(policy);
    (directory, audit, executor)
}

fn success_rows(rows: &[crm_core::audit::ActionLog]) -> usize {
    rows.iter().filter(|r| r.status == ActionStatus::Success).count()
}

#[tokio::test]
async fn test_repeated_update_is_a_noop() {
    let (_, audit, executor) = lagging_executor(0, fast_verification(3)).await;
    let update = data(Intent::LabelUpdate, json!({"identifier": "VIP", "field": "color", "value": "orange"}));

    executor
        .execute(&admin(), ActionRequest::confirmed(update.clone()), None)
        .await
        .expect("First update should apply");
    let second = executor
        .execute(&admin(), ActionRequest::confirmed(update), None)
        .await;
    assert!(matches!(second, Err(ActionError::NoOp(_))), "got {second:?}");

    let rows = audit.all().await;
    assert_eq!(success_rows(&rows), 1);
}

#[tokio::test]
async fn test_confirmation_gate_mutates_exactly_once() {
    let (directory, audit, executor) = lagging_executor(0, fast_verification(3)).await;
    let update = data(Intent::UserUpdate, json!({"identifier": "Ali", "field": "email", "value": "ali@example.com"}));

    for _ in 0..3 {
        let pending = executor
            .execute(&admin(), ActionRequest::new(update.clone()), None)
            .await
            .unwrap_err();
        assert!(pending.is_confirmation());
    }
    let user = directory.inner().snapshot("ws-1").await.users().await.unwrap().remove(0);
    assert_eq!(user.email, None);

    executor
        .execute(&admin(), ActionRequest::confirmed(update), None)
        .await
        .unwrap();
    let user = directory.inner().snapshot("ws-1").await.users().await.unwrap().remove(0);
    assert_eq!(user.email.as_deref(), Some("ali@example.com"));
    assert_eq!(success_rows(&audit.all().await), 1);
}

#[tokio::test]
async fn test_lagging_reads_are_retried_until_visible() {
    let (_, audit, executor) = lagging_executor(2, fast_verification(4)).await;
    let update = data(Intent::LabelUpdate, json!({"identifier": "VIP", "field": "color", "value": "orange"}));

    let outcome = executor
        .execute(&admin(), ActionRequest::confirmed(update), None)
        .await
        .expect("Update should be verified on the third read");
    assert_eq!(outcome.verification_reads, 3);

    let rows = audit.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(success_rows(&rows), 1);
}

#[tokio::test]
async fn test_exhausted_verification_is_a_consistency_error() {
    let (directory, audit, executor) = lagging_executor(10, fast_verification(3)).await;
    let create = data(Intent::GroupCreate, json!({"name": "Sales"}));

    let err = executor
        .execute(&admin(), ActionRequest::new(create), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Consistency(_)), "got {err:?}");
    assert!(err.to_string().starts_with("Changes not applied"));

    // The write itself went through; only its observation failed.
    assert_eq!(directory.inner().snapshot("ws-1").await.groups().await.unwrap().len(), 1);
    let rows = audit.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, ActionStatus::Failed);
}

#[tokio::test]
async fn test_label_sets_are_read_back_after_commit() {
    let (directory, audit, executor) = lagging_executor(2, fast_verification(4)).await;
    let set = data(Intent::UserSetLabels, json!({"user": "Ali", "labels": ["VIP"]}));

    let outcome = executor
        .execute(&admin(), ActionRequest::new(set), None)
        .await
        .expect("Label set should be observed on the third read");
    assert_eq!(outcome.verification_reads, 3);
    let user = directory.inner().snapshot("ws-1").await.users().await.unwrap().remove(0);
    assert_eq!(user.label_ids.len(), 1);
    assert_eq!(success_rows(&audit.all().await), 1);
}

#[tokio::test]
async fn test_lagging_delete_is_retried() {
    let (directory, _, executor) = lagging_executor(1, fast_verification(3)).await;
    let delete = data(Intent::UserDelete, json!({"identifier": "Ali"}));

    let outcome = executor
        .execute(&admin(), ActionRequest::confirmed(delete), None)
        .await
        .expect("Delete should be observed on the second read");
    assert_eq!(outcome.verification_reads, 2);
    assert!(directory.inner().snapshot("ws-1").await.users().await.unwrap().is_empty());
}

async fn lost_commit_executor() -> (Arc<LostCommitDirectory>, Arc<InMemoryActionLog>, ActionExecutor) {
    let directory = Arc::new(LostCommitDirectory::new());
    let mut tx = directory.inner().begin("ws-1").await.unwrap();
    tx.save_label(Label::new("VIP", "#3b82f6")).await.unwrap();
    tx.save_user(User::new("Ali", "09120000000")).await.unwrap();
    tx.save_group(Group::new("Sales")).await.unwrap();
    tx.commit().await.unwrap();

    let audit = Arc::new(InMemoryActionLog::new());
    let executor = ActionExecutor::new(directory.clone(), audit.clone())
        .with_verification(fast_verification(3));
    (directory, audit, executor)
}

#[tokio::test]
async fn test_lost_relational_writes_are_consistency_errors() {
    let (directory, audit, executor) = lost_commit_executor().await;
    let requests = [
        ActionRequest::new(data(Intent::UserSetLabels, json!({"user": "Ali", "labels": ["VIP"]}))),
        ActionRequest::new(data(Intent::GroupAddMember, json!({"group": "Sales", "user": "Ali"}))),
        ActionRequest::confirmed(data(Intent::LabelDelete, json!({"identifier": "VIP"}))),
    ];

    for request in requests {
        let intent = request.intent();
        let err = executor
            .execute(&admin(), request, None)
            .await
            .expect_err("A write that never becomes visible should not succeed");
        assert!(matches!(err, ActionError::Consistency(_)), "{intent}: got {err:?}");
    }

    let snapshot = directory.inner().snapshot("ws-1").await;
    assert!(snapshot.users().await.unwrap()[0].label_ids.is_empty());
    assert!(snapshot.groups().await.unwrap()[0].member_ids.is_empty());
    assert_eq!(snapshot.labels().await.unwrap().len(), 1);
    let rows = audit.all().await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.status == ActionStatus::Failed));
}
