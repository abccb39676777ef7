//! Transaction session lifecycle.
//!
//! A session is written once (steps and metadata) and afterwards only its
//! status moves, `pending` to `confirmed` or `failed`, exactly once.

use tracing::{debug, info};
use uuid::Uuid;

use txforge_db::models::{
    ChainType, MetadataEntry, SessionStatus, TransactionSession, TransactionStep,
};

use crate::error::{Error, Result, ValidationError};
use crate::store::{NewSession, SessionStore};
use crate::validate::chain_id_to_i64;

/// Attempts at drawing a fresh id before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

/// Which signing page a session is rendered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFamily {
    Transaction,
    RemoveLiquidity,
}

/// Build the URL a user opens to sign `id`.
pub fn signing_url(server_base: &str, family: SessionFamily, id: Uuid) -> String {
    let base = server_base.trim_end_matches('/');
    match family {
        SessionFamily::Transaction => format!("{base}/tx/{id}"),
        SessionFamily::RemoveLiquidity => format!("{base}/liquidity/remove/{id}"),
    }
}

/// Persist a new pending session and return it.
pub async fn create_transaction_session(
    store: &dyn SessionStore,
    chain_type: ChainType,
    chain_id: u64,
    steps: Vec<TransactionStep>,
    metadata: Vec<MetadataEntry>,
    user_id: Option<String>,
) -> Result<TransactionSession> {
    if steps.is_empty() {
        return Err(ValidationError::EmptySession.into());
    }
    let new = NewSession {
        chain_type,
        chain_id: chain_id_to_i64(chain_id)?,
        steps,
        metadata,
        user_id,
    };

    for attempt in 1..=MAX_ID_ATTEMPTS {
        let id = Uuid::new_v4();
        if let Some(session) = store.insert_session(id, &new).await? {
            info!(
                session_id = %session.id,
                chain_type = %session.chain_type,
                chain_id = session.chain_id,
                steps = session.steps.len(),
                "transaction session created"
            );
            return Ok(session);
        }
        debug!(%id, attempt, "session id already taken, retrying");
    }
    Err(Error::Storage(anyhow::anyhow!(
        "could not allocate a unique session id after {MAX_ID_ATTEMPTS} attempts"
    )))
}

pub async fn get_transaction_session(
    store: &dyn SessionStore,
    id: Uuid,
) -> Result<TransactionSession> {
    store
        .get_session(id)
        .await?
        .ok_or_else(|| Error::not_found("transaction session", id))
}

/// Move a pending session to `status`. Any other starting state is a
/// conflict.
pub async fn mark_session_status(
    store: &dyn SessionStore,
    id: Uuid,
    status: SessionStatus,
) -> Result<TransactionSession> {
    let moved = if status == SessionStatus::Pending {
        0
    } else {
        store
            .transition_session_status(id, SessionStatus::Pending, status)
            .await?
    };

    let session = get_transaction_session(store, id).await?;
    if moved == 0 {
        return Err(Error::InvalidTransition {
            id: id.to_string(),
            current: session.status,
            requested: status,
        });
    }
    info!(session_id = %id, %status, "session status updated");
    Ok(session)
}
