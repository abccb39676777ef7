//! Persistence seams.
//!
//! Services take these traits as `&dyn` so the same pipeline runs against
//! PostgreSQL ([`PgStore`]) or the in-process [`MemoryStore`].

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use txforge_db::models::{
    ChainType, LiquidityPool, MetadataEntry, SessionStatus, Template, TransactionSession,
    TransactionStep, UniswapDeployment,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Template rows.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn insert_template(&self, template: &Template) -> Result<Template>;

    async fn get_template(&self, id: Uuid) -> Result<Option<Template>>;

    /// Overwrite a template's mutable columns. `None` if it no longer exists.
    async fn update_template(&self, template: &Template) -> Result<Option<Template>>;

    async fn list_templates(&self) -> Result<Vec<Template>>;
}

/// Session payload before an id is assigned.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub chain_type: ChainType,
    pub chain_id: i64,
    pub steps: Vec<TransactionStep>,
    pub metadata: Vec<MetadataEntry>,
    pub user_id: Option<String>,
}

/// Transaction session rows.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert under `id`. Returns `None` if `id` is already taken.
    async fn insert_session(
        &self,
        id: Uuid,
        session: &NewSession,
    ) -> Result<Option<TransactionSession>>;

    async fn get_session(&self, id: Uuid) -> Result<Option<TransactionSession>>;

    async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<TransactionSession>>;

    /// Compare-and-set on status. Returns the number of rows moved (0 or 1).
    async fn transition_session_status(
        &self,
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<u64>;
}

/// Read-only pool and deployment lookups.
#[async_trait]
pub trait ReferenceData: Send + Sync {
    /// Newest pool for `token` on `chain_id`; addresses compare case-insensitively.
    async fn pool_by_token(&self, chain_id: i64, token: &str) -> Result<Option<LiquidityPool>>;

    /// Newest confirmed Uniswap deployment on `chain_id`.
    async fn active_deployment(&self, chain_id: i64) -> Result<Option<UniswapDeployment>>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn TemplateStore, _: &dyn SessionStore, _: &dyn ReferenceData) {}
};
