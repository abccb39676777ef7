//! Swap and liquidity planning against seeded in-memory reference data.

mod common;

use std::sync::Arc;

use txforge_core::ErrorKind;
use txforge_core::error::{Error, PreconditionError, ValidationError};
use txforge_core::planner::{
    ActiveChain, AddLiquidityRequest, MinOutBasis, NATIVE_TOKEN, PlanContext,
    RemoveLiquidityRequest, SwapRequest, plan_add_liquidity, plan_remove_liquidity, plan_swap,
};
use txforge_core::store::MemoryStore;
use txforge_db::models::{AbiValue, ChainType, DeploymentStatus, StepType};

use common::{
    CHAIN_ID, CountingReference, PAIR_A, ROUTER, TOKEN_A, TOKEN_B, USER, WETH, add_deployment,
    checksum, context, seeded_store,
};

const ONE_ETH: &str = "1000000000000000000";

fn swap(from: &str, to: &str) -> SwapRequest {
    SwapRequest {
        from_token: from.into(),
        to_token: to.into(),
        amount_in: ONE_ETH.into(),
        slippage: "0.5".into(),
        recipient: USER.into(),
        expected_amount_out: None,
    }
}

fn add(token: &str) -> AddLiquidityRequest {
    AddLiquidityRequest {
        token_address: token.into(),
        token_amount: "5000".into(),
        paired_amount: "2000".into(),
        slippage: "1".into(),
        recipient: USER.into(),
    }
}

fn remove(token: &str) -> RemoveLiquidityRequest {
    RemoveLiquidityRequest {
        token_address: token.into(),
        liquidity: "300".into(),
        min_token_amount: "100".into(),
        min_paired_amount: "0".into(),
        recipient: USER.into(),
    }
}

fn path_arg(addrs: &[&str]) -> AbiValue {
    AbiValue::Array(
        addrs
            .iter()
            .map(|a| AbiValue::Address(checksum(a)))
            .collect(),
    )
}

// ===========================================================================
// Swaps
// ===========================================================================

#[tokio::test]
async fn native_to_token_is_a_single_valued_step() {
    let store = seeded_store().await;
    let plan = plan_swap(&swap(NATIVE_TOKEN, TOKEN_A), &context(), &*store)
        .await
        .unwrap();

    assert_eq!(plan.steps.len(), 1, "native input needs no approval");
    let step = &plan.steps[0];
    assert_eq!(step.step_type, StepType::Swap);
    assert_eq!(step.function_name.as_deref(), Some("swapExactETHForTokens"));
    assert_eq!(step.value, ONE_ETH);
    assert_eq!(step.to, checksum(ROUTER));
    assert!(step.data.starts_with("0x7ff36ab5"));
    assert_eq!(step.args[1], path_arg(&[WETH, TOKEN_A]));
    assert_eq!(step.args[3], AbiValue::Uint("1700000600".into()));
}

#[tokio::test]
async fn token_to_token_approves_then_swaps_through_wrapped() {
    let store = seeded_store().await;
    let plan = plan_swap(&swap(TOKEN_A, TOKEN_B), &context(), &*store)
        .await
        .unwrap();

    assert_eq!(plan.steps.len(), 2);
    let approve = &plan.steps[0];
    assert_eq!(approve.step_type, StepType::Approve);
    assert_eq!(approve.to, checksum(TOKEN_A));
    assert_eq!(approve.args[0], AbiValue::Address(checksum(ROUTER)));
    assert_eq!(
        approve.args[1],
        AbiValue::Uint(alloy::primitives::U256::MAX.to_string())
    );

    let swap_step = &plan.steps[1];
    assert_eq!(
        swap_step.function_name.as_deref(),
        Some("swapExactTokensForTokens")
    );
    assert_eq!(swap_step.value, "0");
    assert_eq!(swap_step.args[2], path_arg(&[TOKEN_A, WETH, TOKEN_B]));
    assert_eq!(
        plan.path.iter().map(|a| a.to_checksum(None)).collect::<Vec<_>>(),
        vec![checksum(TOKEN_A), checksum(WETH), checksum(TOKEN_B)]
    );
}

#[tokio::test]
async fn swaps_succeed_in_both_directions() {
    let store = seeded_store().await;
    for (from, to) in [
        (TOKEN_A, TOKEN_B),
        (TOKEN_B, TOKEN_A),
        (NATIVE_TOKEN, TOKEN_B),
        (TOKEN_B, NATIVE_TOKEN),
    ] {
        plan_swap(&swap(from, to), &context(), &*store)
            .await
            .unwrap_or_else(|e| panic!("{from} -> {to} failed: {e}"));
    }
}

#[tokio::test]
async fn token_to_native_uses_eth_exit() {
    let store = seeded_store().await;
    let plan = plan_swap(&swap(TOKEN_A, NATIVE_TOKEN), &context(), &*store)
        .await
        .unwrap();
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(
        plan.steps[1].function_name.as_deref(),
        Some("swapExactTokensForETH")
    );
    assert_eq!(plan.steps[1].args[2], path_arg(&[TOKEN_A, WETH]));
}

#[tokio::test]
async fn same_token_fails_before_any_lookup() {
    let reference = CountingReference::new(seeded_store().await);
    for (from, to) in [
        (TOKEN_A, TOKEN_A),
        (WETH, &WETH.to_ascii_lowercase()[..]),
        (NATIVE_TOKEN, NATIVE_TOKEN),
    ] {
        let err = plan_swap(&swap(from, to), &context(), &reference)
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Validation(ValidationError::SameToken { .. })),
            "got {err}"
        );
    }
    assert_eq!(reference.lookups(), 0);
}

#[tokio::test]
async fn bad_slippage_fails_before_any_lookup() {
    let reference = CountingReference::new(seeded_store().await);
    let mut request = swap(TOKEN_A, TOKEN_B);
    request.slippage = "100.5".into();
    let err = plan_swap(&request, &context(), &reference)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(reference.lookups(), 0);
}

#[tokio::test]
async fn min_out_without_quote_is_tagged() {
    let store = seeded_store().await;
    let plan = plan_swap(&swap(TOKEN_A, TOKEN_B), &context(), &*store)
        .await
        .unwrap();
    assert_eq!(plan.min_out_basis, MinOutBasis::AmountIn);
    assert_eq!(plan.min_amount_out.to_string(), "995000000000000000");
    let basis = plan
        .metadata
        .iter()
        .find(|m| m.key == "min_out_basis")
        .map(|m| m.value.as_str());
    assert_eq!(basis, Some("amount_in"));
}

#[tokio::test]
async fn min_out_uses_quote_when_given() {
    let store = seeded_store().await;
    let mut request = swap(TOKEN_A, TOKEN_B);
    request.expected_amount_out = Some("2000".into());
    request.slippage = "1".into();
    let plan = plan_swap(&request, &context(), &*store).await.unwrap();
    assert_eq!(plan.min_out_basis, MinOutBasis::Quote);
    assert_eq!(plan.min_amount_out.to_string(), "1980");
    assert_eq!(plan.steps[1].args[1], AbiValue::Uint("1980".into()));
}

#[tokio::test]
async fn swap_preconditions() {
    let empty = MemoryStore::new();
    let err = plan_swap(&swap(TOKEN_A, TOKEN_B), &context(), &empty)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::Precondition(PreconditionError::NoActiveDeployment { chain_id: CHAIN_ID })
        ),
        "got {err}"
    );

    let no_wrapped = MemoryStore::new();
    no_wrapped
        .add_deployment(
            CHAIN_ID as i64,
            Some(ROUTER),
            None,
            None,
            DeploymentStatus::Confirmed,
        )
        .await;
    let err = plan_swap(&swap(TOKEN_A, TOKEN_B), &context(), &no_wrapped)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::Precondition(PreconditionError::MissingWrappedNative { .. })
        ),
        "got {err}"
    );
}

#[tokio::test]
async fn native_to_wrapped_is_degenerate() {
    let store = seeded_store().await;
    let err = plan_swap(&swap(NATIVE_TOKEN, WETH), &context(), &*store)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::DegenerateRoute { .. })
    ));
}

// ===========================================================================
// Liquidity preconditions
// ===========================================================================

fn assert_precondition(err: &Error, expected: &str) {
    let name = match err {
        Error::Precondition(PreconditionError::PoolNotFound { .. }) => "not_found",
        Error::Precondition(PreconditionError::PoolNotConfirmed { .. }) => "not_confirmed",
        Error::Precondition(PreconditionError::MissingPairAddress { .. }) => "missing_pair",
        Error::Precondition(PreconditionError::NoActiveDeployment { .. }) => "no_deployment",
        Error::Precondition(PreconditionError::MissingRouterAddress { .. }) => "missing_router",
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(name, expected, "got {err}");
}

#[tokio::test]
async fn add_liquidity_precondition_order() {
    // Each fixture breaks one precondition and every later one, so the
    // reported error shows which check runs first.

    let nothing = MemoryStore::new();
    let err = plan_add_liquidity(&add(TOKEN_A), &context(), &nothing)
        .await
        .unwrap_err();
    assert_precondition(&err, "not_found");

    let pending = MemoryStore::new();
    pending
        .add_pool(CHAIN_ID as i64, TOKEN_A, TOKEN_A, WETH, None, DeploymentStatus::Pending)
        .await;
    let err = plan_add_liquidity(&add(TOKEN_A), &context(), &pending)
        .await
        .unwrap_err();
    assert_precondition(&err, "not_confirmed");

    let no_pair = MemoryStore::new();
    no_pair
        .add_pool(CHAIN_ID as i64, TOKEN_A, TOKEN_A, WETH, Some(""), DeploymentStatus::Confirmed)
        .await;
    let err = plan_add_liquidity(&add(TOKEN_A), &context(), &no_pair)
        .await
        .unwrap_err();
    assert_precondition(&err, "missing_pair");

    let no_deployment = MemoryStore::new();
    no_deployment
        .add_pool(CHAIN_ID as i64, TOKEN_A, TOKEN_A, WETH, Some(PAIR_A), DeploymentStatus::Confirmed)
        .await;
    let err = plan_add_liquidity(&add(TOKEN_A), &context(), &no_deployment)
        .await
        .unwrap_err();
    assert_precondition(&err, "no_deployment");

    let no_router = MemoryStore::new();
    no_router
        .add_pool(CHAIN_ID as i64, TOKEN_A, TOKEN_A, WETH, Some(PAIR_A), DeploymentStatus::Confirmed)
        .await;
    no_router
        .add_deployment(CHAIN_ID as i64, None, None, Some(WETH), DeploymentStatus::Confirmed)
        .await;
    let err = plan_add_liquidity(&add(TOKEN_A), &context(), &no_router)
        .await
        .unwrap_err();
    assert_precondition(&err, "missing_router");
}

/// One liquidity setup. The default passes every precondition for TOKEN_A.
struct PoolFixture {
    pool: bool,
    status: DeploymentStatus,
    pair: Option<&'static str>,
    deployment: bool,
    router: Option<&'static str>,
}

impl Default for PoolFixture {
    fn default() -> Self {
        Self {
            pool: true,
            status: DeploymentStatus::Confirmed,
            pair: Some(PAIR_A),
            deployment: true,
            router: Some(ROUTER),
        }
    }
}

impl PoolFixture {
    async fn build(&self) -> MemoryStore {
        let store = MemoryStore::new();
        if self.pool {
            store
                .add_pool(CHAIN_ID as i64, TOKEN_A, TOKEN_A, WETH, self.pair, self.status)
                .await;
        } else {
            store
                .add_pool(
                    CHAIN_ID as i64,
                    TOKEN_B,
                    TOKEN_B,
                    WETH,
                    Some(PAIR_A),
                    DeploymentStatus::Confirmed,
                )
                .await;
        }
        if self.deployment {
            store
                .add_deployment(
                    CHAIN_ID as i64,
                    self.router,
                    None,
                    Some(WETH),
                    DeploymentStatus::Confirmed,
                )
                .await;
        }
        store
    }
}

#[tokio::test]
async fn each_liquidity_precondition_fires_on_its_own() {
    let cases = [
        (
            "only the pool is missing",
            PoolFixture {
                pool: false,
                ..PoolFixture::default()
            },
            "not_found",
        ),
        (
            "only the status is pending",
            PoolFixture {
                status: DeploymentStatus::Pending,
                ..PoolFixture::default()
            },
            "not_confirmed",
        ),
        (
            "only the status is failed",
            PoolFixture {
                status: DeploymentStatus::Failed,
                ..PoolFixture::default()
            },
            "not_confirmed",
        ),
        (
            "only the pair is absent",
            PoolFixture {
                pair: None,
                ..PoolFixture::default()
            },
            "missing_pair",
        ),
        (
            "only the pair is blank",
            PoolFixture {
                pair: Some("  "),
                ..PoolFixture::default()
            },
            "missing_pair",
        ),
        (
            "only the deployment is absent",
            PoolFixture {
                deployment: false,
                ..PoolFixture::default()
            },
            "no_deployment",
        ),
        (
            "only the router is absent",
            PoolFixture {
                router: None,
                ..PoolFixture::default()
            },
            "missing_router",
        ),
    ];

    for (label, fixture, expected) in cases {
        let store = fixture.build().await;
        let err = plan_add_liquidity(&add(TOKEN_A), &context(), &store)
            .await
            .expect_err(label);
        assert_precondition(&err, expected);
        let err = plan_remove_liquidity(&remove(TOKEN_A), &context(), &store)
            .await
            .expect_err(label);
        assert_precondition(&err, expected);
    }

    let store = PoolFixture::default().build().await;
    plan_add_liquidity(&add(TOKEN_A), &context(), &store)
        .await
        .expect("the unmodified fixture passes");
    plan_remove_liquidity(&remove(TOKEN_A), &context(), &store)
        .await
        .expect("the unmodified fixture passes");
}

#[tokio::test]
async fn non_ethereum_chain_is_rejected_first() {
    let reference = CountingReference::new(Arc::new(MemoryStore::new()));
    let ctx = PlanContext::new(ActiveChain {
        chain_type: ChainType::Solana,
        chain_id: 101,
        rpc_url: "https://api.mainnet-beta.solana.com".into(),
    });
    let err = plan_add_liquidity(&add(TOKEN_A), &ctx, &reference)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::UnsupportedChain { .. })
    ));
    let err = plan_remove_liquidity(&remove(TOKEN_A), &ctx, &reference)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(reference.lookups(), 0);
}

#[tokio::test]
async fn pool_without_token_leg_is_a_mismatch() {
    let store = Arc::new(MemoryStore::new());
    add_deployment(&store).await;
    store
        .add_pool(CHAIN_ID as i64, TOKEN_A, TOKEN_B, WETH, Some(PAIR_A), DeploymentStatus::Confirmed)
        .await;
    let err = plan_add_liquidity(&add(TOKEN_A), &context(), &*store)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionError::PoolTokenMismatch { .. })
    ));
}

// ===========================================================================
// Liquidity plans
// ===========================================================================

#[tokio::test]
async fn add_liquidity_against_wrapped_native_uses_eth_variant() {
    let store = seeded_store().await;
    let plan = plan_add_liquidity(&add(TOKEN_A), &context(), &*store)
        .await
        .unwrap();

    assert!(plan.native_leg);
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.steps[0].step_type, StepType::Approve);
    assert_eq!(plan.steps[0].to, checksum(TOKEN_A));

    let act = &plan.steps[1];
    assert_eq!(act.function_name.as_deref(), Some("addLiquidityETH"));
    assert_eq!(act.value, "2000");
    // token min and ETH min are the desired amounts less 1%
    assert_eq!(act.args[2], AbiValue::Uint("4950".into()));
    assert_eq!(act.args[3], AbiValue::Uint("1980".into()));

    let keys: Vec<&str> = plan.metadata.iter().map(|m| m.key.as_str()).collect();
    for key in [
        "action",
        "pool_id",
        "pair_address",
        "protocol_version",
        "token_address",
        "token_amount",
        "paired_amount",
        "deadline",
    ] {
        assert!(keys.contains(&key), "missing metadata key {key}");
    }
}

#[tokio::test]
async fn add_liquidity_between_tokens_approves_both_legs() {
    let store = seeded_store().await;
    let plan = plan_add_liquidity(&add(TOKEN_B), &context(), &*store)
        .await
        .unwrap();

    assert!(!plan.native_leg);
    let kinds: Vec<StepType> = plan.steps.iter().map(|s| s.step_type).collect();
    assert_eq!(
        kinds,
        vec![StepType::Approve, StepType::Approve, StepType::AddLiquidity]
    );
    assert_eq!(plan.steps[0].to, checksum(TOKEN_B));
    assert_eq!(plan.steps[1].to, checksum(TOKEN_A));
    assert_eq!(plan.steps[2].function_name.as_deref(), Some("addLiquidity"));
    assert_eq!(plan.steps[2].value, "0");
}

#[tokio::test]
async fn remove_liquidity_approves_lp_token_first() {
    let store = seeded_store().await;
    let plan = plan_remove_liquidity(&remove(TOKEN_A), &context(), &*store)
        .await
        .unwrap();

    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.steps[0].to, checksum(PAIR_A));
    assert_eq!(plan.steps[0].args[0], AbiValue::Address(checksum(ROUTER)));
    let act = &plan.steps[1];
    assert_eq!(act.function_name.as_deref(), Some("removeLiquidityETH"));
    assert_eq!(act.args[1], AbiValue::Uint("300".into()));
    assert_eq!(act.args[2], AbiValue::Uint("100".into()));
    assert_eq!(act.args[3], AbiValue::Uint("0".into()));

    let action = plan
        .metadata
        .iter()
        .find(|m| m.key == "action")
        .map(|m| m.value.as_str());
    assert_eq!(action, Some("remove_liquidity"));
}

#[tokio::test]
async fn remove_liquidity_between_tokens_uses_plain_variant() {
    let store = seeded_store().await;
    let plan = plan_remove_liquidity(&remove(TOKEN_B), &context(), &*store)
        .await
        .unwrap();
    assert_eq!(
        plan.steps[1].function_name.as_deref(),
        Some("removeLiquidity")
    );
    assert_eq!(plan.steps[1].args[1], AbiValue::Address(checksum(TOKEN_A)));
}

#[tokio::test]
async fn zero_liquidity_is_rejected() {
    let store = seeded_store().await;
    let mut request = remove(TOKEN_A);
    request.liquidity = "0".into();
    let err = plan_remove_liquidity(&request, &context(), &*store)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::ZeroAmount { field: "liquidity" })
    ));
}
