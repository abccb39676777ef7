//! Uniswap V2 add/remove liquidity against a token's registered pool.

use alloy::primitives::{Address, U256};
use tracing::info;
use uuid::Uuid;

use txforge_db::models::{DeploymentStatus, LiquidityPool, MetadataEntry, StepType, TransactionStep};

use super::{PlanContext, StepSequence, resolve_router};
use crate::abi::{address_arg, router_abi, uint_arg};
use crate::error::{PreconditionError, Result};
use crate::store::ReferenceData;
use crate::validate::{chain_id_to_i64, parse_address, parse_amount, parse_slippage, parse_wei};

/// Caller intent for adding liquidity. Amounts are decimal wei strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityRequest {
    pub token_address: String,
    pub token_amount: String,
    /// Amount of the pool's other leg (native currency when that leg is
    /// the wrapped native asset).
    pub paired_amount: String,
    pub slippage: String,
    pub recipient: String,
}

/// Caller intent for removing liquidity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLiquidityRequest {
    pub token_address: String,
    /// LP token amount to burn.
    pub liquidity: String,
    pub min_token_amount: String,
    pub min_paired_amount: String,
    pub recipient: String,
}

/// A planned liquidity operation.
#[derive(Debug, Clone)]
pub struct LiquidityPlan {
    pub pool_id: Uuid,
    pub pair_address: Address,
    pub paired_token: Address,
    /// The other leg is the wrapped native asset (the `*ETH` router calls).
    pub native_leg: bool,
    pub deadline: U256,
    pub steps: Vec<TransactionStep>,
    pub metadata: Vec<MetadataEntry>,
}

/// Everything the preconditions established about a pool.
struct PoolTarget {
    pool: LiquidityPool,
    pair: Address,
    router: Address,
    paired: Address,
    native_leg: bool,
    protocol_version: String,
}

/// Check, in order: ethereum chain, pool exists, pool confirmed, pair
/// address present, active deployment, router present.
async fn resolve_pool(
    token: Address,
    ctx: &PlanContext,
    reference: &dyn ReferenceData,
) -> Result<PoolTarget> {
    ctx.require_ethereum()?;
    let token_str = token.to_checksum(None);

    let pool = reference
        .pool_by_token(chain_id_to_i64(ctx.chain.chain_id)?, &token_str)
        .await?
        .ok_or_else(|| PreconditionError::PoolNotFound {
            token: token_str.clone(),
        })?;
    if pool.status != DeploymentStatus::Confirmed {
        return Err(PreconditionError::PoolNotConfirmed {
            token: token_str,
            status: pool.status,
        }
        .into());
    }
    let pair_raw = pool
        .pair_address
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| PreconditionError::MissingPairAddress {
            token: token_str.clone(),
        })?;
    let pair = parse_address("pair_address", pair_raw)?;

    let target = resolve_router(ctx, reference).await?;

    let token0 = parse_address("token0", &pool.token0)?;
    let token1 = parse_address("token1", &pool.token1)?;
    let paired = if token0 == token {
        token1
    } else if token1 == token {
        token0
    } else {
        return Err(PreconditionError::PoolTokenMismatch {
            pool_id: pool.id.to_string(),
            token: token_str,
        }
        .into());
    };
    let native_leg = target.wrapped_native()? == Some(paired);

    Ok(PoolTarget {
        pool,
        pair,
        router: target.router,
        paired,
        native_leg,
        protocol_version: target.deployment.version,
    })
}

/// Plan an add-liquidity for `request.token_address`'s pool.
///
/// Uses `addLiquidityETH` (value = paired amount) when the other leg is
/// the wrapped native asset, `addLiquidity` with both legs approved
/// otherwise. Minimums are the desired amounts less slippage.
pub async fn plan_add_liquidity(
    request: &AddLiquidityRequest,
    ctx: &PlanContext,
    reference: &dyn ReferenceData,
) -> Result<LiquidityPlan> {
    let token = parse_address("token_address", &request.token_address)?;
    let token_amount = parse_amount("token_amount", &request.token_amount)?;
    let paired_amount = parse_amount("paired_amount", &request.paired_amount)?;
    let slippage = parse_slippage(&request.slippage)?;
    let recipient = parse_address("recipient", &request.recipient)?;

    let target = resolve_pool(token, ctx, reference).await?;
    let deadline = ctx.deadline();
    let token_min = slippage.apply_min(token_amount);
    let paired_min = slippage.apply_min(paired_amount);

    let mut seq = StepSequence::new();
    seq.approve(token, target.router, "token")?;
    if target.native_leg {
        seq.call(
            target.router,
            router_abi(),
            "addLiquidityETH",
            vec![
                address_arg(token),
                uint_arg(token_amount),
                uint_arg(token_min),
                uint_arg(paired_min),
                address_arg(recipient),
                uint_arg(deadline),
            ],
            paired_amount,
            "Add liquidity",
            format!("Add {token_amount} wei of token and {paired_amount} wei of native currency"),
            StepType::AddLiquidity,
        )?;
    } else {
        seq.approve(target.paired, target.router, "paired token")?.call(
            target.router,
            router_abi(),
            "addLiquidity",
            vec![
                address_arg(token),
                address_arg(target.paired),
                uint_arg(token_amount),
                uint_arg(paired_amount),
                uint_arg(token_min),
                uint_arg(paired_min),
                address_arg(recipient),
                uint_arg(deadline),
            ],
            U256::ZERO,
            "Add liquidity",
            format!("Add {token_amount} wei of token and {paired_amount} wei of paired token"),
            StepType::AddLiquidity,
        )?;
    }

    let mut metadata = base_metadata("add_liquidity", &target, token, deadline);
    metadata.extend([
        MetadataEntry::new("token_amount", token_amount.to_string()),
        MetadataEntry::new("paired_amount", paired_amount.to_string()),
        MetadataEntry::new("slippage", slippage.to_string()),
    ]);

    info!(
        pool_id = %target.pool.id,
        native_leg = target.native_leg,
        steps = seq.len(),
        "add liquidity planned"
    );
    Ok(finish(target, deadline, seq, metadata))
}

/// Plan a remove-liquidity for `request.token_address`'s pool.
///
/// The LP token is approved to the router first; minimum outputs are taken
/// from the request as given.
pub async fn plan_remove_liquidity(
    request: &RemoveLiquidityRequest,
    ctx: &PlanContext,
    reference: &dyn ReferenceData,
) -> Result<LiquidityPlan> {
    let token = parse_address("token_address", &request.token_address)?;
    let liquidity = parse_amount("liquidity", &request.liquidity)?;
    let min_token = parse_wei("min_token_amount", &request.min_token_amount)?;
    let min_paired = parse_wei("min_paired_amount", &request.min_paired_amount)?;
    let recipient = parse_address("recipient", &request.recipient)?;

    let target = resolve_pool(token, ctx, reference).await?;
    let deadline = ctx.deadline();

    let mut seq = StepSequence::new();
    seq.approve(target.pair, target.router, "LP token")?;
    if target.native_leg {
        seq.call(
            target.router,
            router_abi(),
            "removeLiquidityETH",
            vec![
                address_arg(token),
                uint_arg(liquidity),
                uint_arg(min_token),
                uint_arg(min_paired),
                address_arg(recipient),
                uint_arg(deadline),
            ],
            U256::ZERO,
            "Remove liquidity",
            format!("Burn {liquidity} LP tokens for token and native currency"),
            StepType::RemoveLiquidity,
        )?;
    } else {
        seq.call(
            target.router,
            router_abi(),
            "removeLiquidity",
            vec![
                address_arg(token),
                address_arg(target.paired),
                uint_arg(liquidity),
                uint_arg(min_token),
                uint_arg(min_paired),
                address_arg(recipient),
                uint_arg(deadline),
            ],
            U256::ZERO,
            "Remove liquidity",
            format!("Burn {liquidity} LP tokens for token and paired token"),
            StepType::RemoveLiquidity,
        )?;
    }

    let mut metadata = base_metadata("remove_liquidity", &target, token, deadline);
    metadata.extend([
        MetadataEntry::new("liquidity", liquidity.to_string()),
        MetadataEntry::new("min_token_amount", min_token.to_string()),
        MetadataEntry::new("min_paired_amount", min_paired.to_string()),
    ]);

    info!(
        pool_id = %target.pool.id,
        native_leg = target.native_leg,
        "remove liquidity planned"
    );
    Ok(finish(target, deadline, seq, metadata))
}

fn base_metadata(
    action: &str,
    target: &PoolTarget,
    token: Address,
    deadline: U256,
) -> Vec<MetadataEntry> {
    vec![
        MetadataEntry::new("action", action),
        MetadataEntry::new("pool_id", target.pool.id.to_string()),
        MetadataEntry::new("pair_address", target.pair.to_checksum(None)),
        MetadataEntry::new("protocol_version", target.protocol_version.clone()),
        MetadataEntry::new("token_address", token.to_checksum(None)),
        MetadataEntry::new("paired_token", target.paired.to_checksum(None)),
        MetadataEntry::new("deadline", deadline.to_string()),
    ]
}

fn finish(
    target: PoolTarget,
    deadline: U256,
    seq: StepSequence,
    metadata: Vec<MetadataEntry>,
) -> LiquidityPlan {
    LiquidityPlan {
        pool_id: target.pool.id,
        pair_address: target.pair,
        paired_token: target.paired,
        native_leg: target.native_leg,
        deadline,
        steps: seq.finish(),
        metadata,
    }
}
