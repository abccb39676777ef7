//! Database query functions for the `transaction_sessions` table.
//!
//! Nothing here rewrites `steps` or `metadata`. Once a row is inserted only
//! `status` moves; the schema trigger rejects any other update.

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{ChainType, MetadataEntry, SessionStatus, TransactionSession, TransactionStep};

/// Insert a new session under `id`.
///
/// Returns `None` when `id` is already taken, so the caller can pick a fresh
/// id and try again without ever touching the existing row.
pub async fn insert_session(
    pool: &PgPool,
    id: Uuid,
    chain_type: ChainType,
    chain_id: i64,
    steps: &[TransactionStep],
    metadata: &[MetadataEntry],
    user_id: Option<&str>,
) -> Result<Option<TransactionSession>> {
    let row = sqlx::query_as::<_, TransactionSession>(
        "INSERT INTO transaction_sessions (id, chain_type, chain_id, steps, metadata, user_id) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (id) DO NOTHING \
         RETURNING *",
    )
    .bind(id)
    .bind(chain_type)
    .bind(chain_id)
    .bind(Json(steps))
    .bind(Json(metadata))
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to insert transaction session")?;

    Ok(row)
}

/// Fetch a session by its ID.
pub async fn get_session(pool: &PgPool, id: Uuid) -> Result<Option<TransactionSession>> {
    let row = sqlx::query_as::<_, TransactionSession>(
        "SELECT * FROM transaction_sessions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch transaction session")?;

    Ok(row)
}

/// List sessions created for a user, newest first.
pub async fn list_sessions_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<TransactionSession>> {
    let rows = sqlx::query_as::<_, TransactionSession>(
        "SELECT * FROM transaction_sessions WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list transaction sessions")?;

    Ok(rows)
}

/// Compare-and-set the status of a session.
///
/// Only updates when the current status equals `from`. Returns the number of
/// rows affected (0 or 1).
pub async fn transition_session_status(
    pool: &PgPool,
    id: Uuid,
    from: SessionStatus,
    to: SessionStatus,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE transaction_sessions \
         SET status = $3, updated_at = now() \
         WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .execute(pool)
    .await
    .with_context(|| format!("failed to transition session {id} from {from} to {to}"))?;

    Ok(result.rows_affected())
}
