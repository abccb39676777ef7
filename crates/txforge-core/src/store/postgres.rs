use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use txforge_db::models::{
    LiquidityPool, SessionStatus, Template, TransactionSession, UniswapDeployment,
};
use txforge_db::queries::{deployments, pools, sessions, templates};

use super::{NewSession, ReferenceData, SessionStore, TemplateStore};

/// Store backed by the `txforge-db` query layer.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TemplateStore for PgStore {
    async fn insert_template(&self, template: &Template) -> Result<Template> {
        templates::insert_template(&self.pool, template).await
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<Template>> {
        templates::get_template(&self.pool, id).await
    }

    async fn update_template(&self, template: &Template) -> Result<Option<Template>> {
        templates::update_template(&self.pool, template).await
    }

    async fn list_templates(&self) -> Result<Vec<Template>> {
        templates::list_templates(&self.pool).await
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(
        &self,
        id: Uuid,
        session: &NewSession,
    ) -> Result<Option<TransactionSession>> {
        sessions::insert_session(
            &self.pool,
            id,
            session.chain_type,
            session.chain_id,
            &session.steps,
            &session.metadata,
            session.user_id.as_deref(),
        )
        .await
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<TransactionSession>> {
        sessions::get_session(&self.pool, id).await
    }

    async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<TransactionSession>> {
        sessions::list_sessions_for_user(&self.pool, user_id).await
    }

    async fn transition_session_status(
        &self,
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<u64> {
        sessions::transition_session_status(&self.pool, id, from, to).await
    }
}

#[async_trait]
impl ReferenceData for PgStore {
    async fn pool_by_token(&self, chain_id: i64, token: &str) -> Result<Option<LiquidityPool>> {
        pools::get_pool_by_token(&self.pool, chain_id, token).await
    }

    async fn active_deployment(&self, chain_id: i64) -> Result<Option<UniswapDeployment>> {
        deployments::get_active_deployment(&self.pool, chain_id).await
    }
}
