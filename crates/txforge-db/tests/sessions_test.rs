//! Integration tests for transaction session persistence.
//!
//! These tests run against the shared PostgreSQL from `txforge-test-utils`
//! (`TXFORGE_TEST_PG_URL`, or a testcontainers instance when unset). Each
//! test creates its own database and drops it on completion.

use sqlx::{Executor, Row};
use uuid::Uuid;

use txforge_db::models::{ChainType, MetadataEntry, SessionStatus, StepType, TransactionStep};
use txforge_db::queries::sessions;
use txforge_test_utils::{create_test_db, drop_test_db};

fn step(title: &str) -> TransactionStep {
    TransactionStep {
        title: title.into(),
        description: "test step".into(),
        to: "0x1111111111111111111111111111111111111111".into(),
        data: "0x095ea7b3".into(),
        function_name: Some("approve".into()),
        args: Vec::new(),
        abi: None,
        value: "0".into(),
        step_type: StepType::Approve,
    }
}

// ===========================================================================
// Insert and fetch
// ===========================================================================

#[tokio::test]
async fn insert_then_fetch_round_trips_payload() {
    let (pool, db_name) = create_test_db().await;

    let id = Uuid::new_v4();
    let steps = vec![step("Approve"), step("Swap")];
    let metadata = vec![MetadataEntry::new("action", "swap")];
    let inserted = sessions::insert_session(
        &pool,
        id,
        ChainType::Ethereum,
        31337,
        &steps,
        &metadata,
        Some("user-1"),
    )
    .await
    .unwrap()
    .expect("fresh id inserts");

    assert_eq!(inserted.id, id);
    assert_eq!(inserted.status, SessionStatus::Pending);

    let fetched = sessions::get_session(&pool, id).await.unwrap().unwrap();
    assert_eq!(fetched.steps.0, steps, "step order is preserved");
    assert_eq!(fetched.metadata_value("action"), Some("swap"));
    assert_eq!(fetched.chain_id, 31337);
    assert_eq!(fetched.user_id.as_deref(), Some("user-1"));

    assert!(
        sessions::get_session(&pool, Uuid::new_v4())
            .await
            .unwrap()
            .is_none()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn colliding_id_returns_none_and_keeps_original() {
    let (pool, db_name) = create_test_db().await;

    let id = Uuid::new_v4();
    sessions::insert_session(&pool, id, ChainType::Ethereum, 1, &[step("First")], &[], None)
        .await
        .unwrap()
        .unwrap();

    let second =
        sessions::insert_session(&pool, id, ChainType::Ethereum, 1, &[step("Second")], &[], None)
            .await
            .unwrap();
    assert!(second.is_none());

    let stored = sessions::get_session(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.steps[0].title, "First");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn list_for_user_filters_by_owner() {
    let (pool, db_name) = create_test_db().await;

    for user in ["alice", "alice", "bob"] {
        sessions::insert_session(
            &pool,
            Uuid::new_v4(),
            ChainType::Ethereum,
            1,
            &[step("Call")],
            &[],
            Some(user),
        )
        .await
        .unwrap()
        .unwrap();
    }

    assert_eq!(
        sessions::list_sessions_for_user(&pool, "alice")
            .await
            .unwrap()
            .len(),
        2
    );
    assert!(
        sessions::list_sessions_for_user(&pool, "carol")
            .await
            .unwrap()
            .is_empty()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

// ===========================================================================
// Status transitions
// ===========================================================================

#[tokio::test]
async fn transition_is_compare_and_set() {
    let (pool, db_name) = create_test_db().await;

    let id = Uuid::new_v4();
    sessions::insert_session(&pool, id, ChainType::Ethereum, 1, &[step("Call")], &[], None)
        .await
        .unwrap()
        .unwrap();

    let moved = sessions::transition_session_status(
        &pool,
        id,
        SessionStatus::Pending,
        SessionStatus::Confirmed,
    )
    .await
    .unwrap();
    assert_eq!(moved, 1);

    let again = sessions::transition_session_status(
        &pool,
        id,
        SessionStatus::Pending,
        SessionStatus::Failed,
    )
    .await
    .unwrap();
    assert_eq!(again, 0, "a confirmed session cannot be failed");

    let stored = sessions::get_session(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Confirmed);
    assert!(stored.updated_at >= stored.created_at);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn payload_columns_reject_updates() {
    let (pool, db_name) = create_test_db().await;

    let id = Uuid::new_v4();
    sessions::insert_session(&pool, id, ChainType::Ethereum, 1, &[step("Call")], &[], None)
        .await
        .unwrap()
        .unwrap();

    let stmt = format!("UPDATE transaction_sessions SET steps = '[]'::jsonb WHERE id = '{id}'");
    let err = pool.execute(stmt.as_str()).await.unwrap_err();
    assert!(err.to_string().contains("immutable"), "got: {err}");

    let row = sqlx::query("SELECT jsonb_array_length(steps) AS n FROM transaction_sessions WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    let n: i32 = row.get("n");
    assert_eq!(n, 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}
