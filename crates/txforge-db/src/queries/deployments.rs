//! Read access to the `uniswap_deployments` reference table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::{DeploymentStatus, UniswapDeployment};

/// Fetch the newest confirmed Uniswap deployment on `chain_id`.
pub async fn get_active_deployment(
    pool: &PgPool,
    chain_id: i64,
) -> Result<Option<UniswapDeployment>> {
    let row = sqlx::query_as::<_, UniswapDeployment>(
        "SELECT * FROM uniswap_deployments \
         WHERE chain_id = $1 AND status = $2 \
         ORDER BY created_at DESC \
         LIMIT 1",
    )
    .bind(chain_id)
    .bind(DeploymentStatus::Confirmed)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to fetch uniswap deployment for chain {chain_id}"))?;

    Ok(row)
}

/// Record a deployment. Used to seed reference data.
pub async fn insert_deployment(
    pool: &PgPool,
    chain_id: i64,
    version: &str,
    router_address: Option<&str>,
    factory_address: Option<&str>,
    wrapped_native_address: Option<&str>,
    status: DeploymentStatus,
) -> Result<UniswapDeployment> {
    let row = sqlx::query_as::<_, UniswapDeployment>(
        "INSERT INTO uniswap_deployments \
         (chain_id, version, router_address, factory_address, wrapped_native_address, status) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(chain_id)
    .bind(version)
    .bind(router_address)
    .bind(factory_address)
    .bind(wrapped_native_address)
    .bind(status)
    .fetch_one(pool)
    .await
    .context("failed to insert uniswap deployment")?;

    Ok(row)
}
