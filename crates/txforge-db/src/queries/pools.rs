//! Read access to the `liquidity_pools` reference table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::{DeploymentStatus, LiquidityPool};

/// Fetch the most recent pool recorded for `token_address` on `chain_id`.
///
/// Addresses are compared case-insensitively.
pub async fn get_pool_by_token(
    pool: &PgPool,
    chain_id: i64,
    token_address: &str,
) -> Result<Option<LiquidityPool>> {
    let row = sqlx::query_as::<_, LiquidityPool>(
        "SELECT * FROM liquidity_pools \
         WHERE chain_id = $1 AND lower(token_address) = lower($2) \
         ORDER BY created_at DESC \
         LIMIT 1",
    )
    .bind(chain_id)
    .bind(token_address)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to fetch liquidity pool for token {token_address}"))?;

    Ok(row)
}

/// Record a pool. Used to seed reference data.
pub async fn insert_pool(
    pool: &PgPool,
    chain_id: i64,
    token_address: &str,
    token0: &str,
    token1: &str,
    pair_address: Option<&str>,
    status: DeploymentStatus,
) -> Result<LiquidityPool> {
    let row = sqlx::query_as::<_, LiquidityPool>(
        "INSERT INTO liquidity_pools (chain_id, token_address, token0, token1, pair_address, status) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(chain_id)
    .bind(token_address)
    .bind(token0)
    .bind(token1)
    .bind(pair_address)
    .bind(status)
    .fetch_one(pool)
    .await
    .context("failed to insert liquidity pool")?;

    Ok(row)
}
