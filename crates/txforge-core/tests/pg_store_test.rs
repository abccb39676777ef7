//! End-to-end flows over [`PgStore`] against a real PostgreSQL.
//!
//! Uses the shared database from `txforge-test-utils`; each test gets its
//! own database and drops it on completion.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use txforge_core::error::{Error, PreconditionError};
use txforge_core::planner::{AddLiquidityRequest, NATIVE_TOKEN, SwapRequest};
use txforge_core::store::PgStore;
use txforge_core::template::NewTemplate;
use txforge_core::{ErrorKind, Forge};
use txforge_db::models::{DeploymentStatus, SessionStatus, StepType};
use txforge_db::queries::{deployments, pools};
use txforge_test_utils::{create_test_db, drop_test_db};

use common::{CHAIN_ID, FakeCompiler, PAIR_A, ROUTER, TOKEN_A, TOKEN_B, USER, WETH, chain};

async fn seed_reference(pool: &sqlx::PgPool) {
    deployments::insert_deployment(
        pool,
        CHAIN_ID as i64,
        "v2",
        Some(ROUTER),
        None,
        Some(WETH),
        DeploymentStatus::Confirmed,
    )
    .await
    .unwrap();
    pools::insert_pool(
        pool,
        CHAIN_ID as i64,
        TOKEN_A,
        TOKEN_A,
        WETH,
        Some(PAIR_A),
        DeploymentStatus::Confirmed,
    )
    .await
    .unwrap();
}

fn forge(pool: sqlx::PgPool) -> Forge {
    Forge::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(FakeCompiler::new()),
        chain(),
        "https://sign.example",
    )
}

// ===========================================================================
// Sessions
// ===========================================================================

#[tokio::test]
async fn token_swap_is_persisted_and_confirmed_once() {
    let (pool, db_name) = create_test_db().await;
    seed_reference(&pool).await;
    let forge = forge(pool.clone());

    let ticket = forge
        .swap(
            &SwapRequest {
                from_token: TOKEN_A.into(),
                to_token: TOKEN_B.into(),
                amount_in: "1000".into(),
                slippage: "1".into(),
                recipient: USER.into(),
                expected_amount_out: Some("2000".into()),
            },
            Some("user-1".into()),
        )
        .await
        .unwrap();

    let stored = forge.session(ticket.session.id).await.unwrap();
    let kinds: Vec<StepType> = stored.steps.iter().map(|s| s.step_type).collect();
    assert_eq!(kinds, vec![StepType::Approve, StepType::Swap]);
    assert_eq!(stored.metadata_value("min_amount_out"), Some("1980"));
    assert_eq!(forge.sessions_for_user("user-1").await.unwrap().len(), 1);

    let confirmed = forge
        .mark_session(ticket.session.id, SessionStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, SessionStatus::Confirmed);
    let err = forge
        .mark_session(ticket.session.id, SessionStatus::Failed)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn native_add_liquidity_reads_pool_from_database() {
    let (pool, db_name) = create_test_db().await;
    seed_reference(&pool).await;
    let forge = forge(pool.clone());

    let ticket = forge
        .add_liquidity(
            &AddLiquidityRequest {
                token_address: TOKEN_A.to_lowercase(),
                token_amount: "500".into(),
                paired_amount: "100".into(),
                slippage: "0".into(),
                recipient: USER.into(),
            },
            None,
        )
        .await
        .unwrap();

    assert!(ticket.plan.native_leg);
    let stored = forge.session(ticket.session.id).await.unwrap();
    assert_eq!(stored.steps.len(), 2);
    assert_eq!(stored.steps[1].value, "100");
    assert_eq!(stored.metadata_value("action"), Some("add_liquidity"));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn swap_without_deployment_is_a_precondition_error() {
    let (pool, db_name) = create_test_db().await;
    let forge = forge(pool.clone());

    let err = forge
        .swap(
            &SwapRequest {
                from_token: NATIVE_TOKEN.into(),
                to_token: TOKEN_A.into(),
                amount_in: "1".into(),
                slippage: "0.5".into(),
                recipient: USER.into(),
                expected_amount_out: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionError::NoActiveDeployment { .. })
    ));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transaction_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0, "nothing is persisted when planning fails");

    pool.close().await;
    drop_test_db(&db_name).await;
}

// ===========================================================================
// Templates
// ===========================================================================

#[tokio::test]
async fn template_survives_round_trip_through_database() {
    let (pool, db_name) = create_test_db().await;
    let forge = forge(pool.clone());

    let created = forge
        .create_template(NewTemplate {
            name: "Counter".into(),
            description: String::new(),
            chain_type: "ethereum".into(),
            contract_name: "T".into(),
            source_code: "pragma solidity ^0.8.0; contract T { uint256 public x = {{.X}}; }"
                .into(),
            metadata_schema: BTreeMap::from([("X".to_owned(), String::new())]),
            sample_values: BTreeMap::from([("X".to_owned(), "5".to_owned())]),
        })
        .await
        .unwrap();

    let fetched = forge.template(created.id).await.unwrap();
    assert_eq!(fetched.compiled_abi, created.compiled_abi);
    assert_eq!(fetched.sample_values.0.get("X").map(String::as_str), Some("5"));

    let rendered = forge
        .render_template(created.id, &BTreeMap::new())
        .await
        .unwrap();
    assert!(rendered.contains("x = 5;"));

    let missing = forge.template(uuid::Uuid::new_v4()).await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    pool.close().await;
    drop_test_db(&db_name).await;
}
