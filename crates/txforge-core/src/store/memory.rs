use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use txforge_db::models::{
    DeploymentStatus, LiquidityPool, SessionStatus, Template, TransactionSession,
    UniswapDeployment,
};

use super::{NewSession, ReferenceData, SessionStore, TemplateStore};

/// In-process store for tests and dry runs. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    templates: RwLock<HashMap<Uuid, Template>>,
    sessions: RwLock<HashMap<Uuid, TransactionSession>>,
    pools: RwLock<Vec<LiquidityPool>>,
    deployments: RwLock<Vec<UniswapDeployment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a liquidity pool.
    pub async fn add_pool(
        &self,
        chain_id: i64,
        token_address: &str,
        token0: &str,
        token1: &str,
        pair_address: Option<&str>,
        status: DeploymentStatus,
    ) -> LiquidityPool {
        let pool = LiquidityPool {
            id: Uuid::new_v4(),
            chain_id,
            token_address: token_address.to_owned(),
            token0: token0.to_owned(),
            token1: token1.to_owned(),
            pair_address: pair_address.map(str::to_owned),
            reserve0: "0".to_owned(),
            reserve1: "0".to_owned(),
            status,
            created_at: Utc::now(),
        };
        self.pools.write().await.push(pool.clone());
        pool
    }

    /// Seed a Uniswap V2 deployment.
    pub async fn add_deployment(
        &self,
        chain_id: i64,
        router_address: Option<&str>,
        factory_address: Option<&str>,
        wrapped_native_address: Option<&str>,
        status: DeploymentStatus,
    ) -> UniswapDeployment {
        let deployment = UniswapDeployment {
            id: Uuid::new_v4(),
            chain_id,
            version: "v2".to_owned(),
            router_address: router_address.map(str::to_owned),
            factory_address: factory_address.map(str::to_owned),
            wrapped_native_address: wrapped_native_address.map(str::to_owned),
            deployer_address: None,
            status,
            created_at: Utc::now(),
        };
        self.deployments.write().await.push(deployment.clone());
        deployment
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn insert_template(&self, template: &Template) -> Result<Template> {
        let mut templates = self.templates.write().await;
        anyhow::ensure!(
            !templates.contains_key(&template.id),
            "duplicate template id {}",
            template.id
        );
        templates.insert(template.id, template.clone());
        Ok(template.clone())
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<Template>> {
        Ok(self.templates.read().await.get(&id).cloned())
    }

    async fn update_template(&self, template: &Template) -> Result<Option<Template>> {
        let mut templates = self.templates.write().await;
        let Some(existing) = templates.get_mut(&template.id) else {
            return Ok(None);
        };
        existing.name = template.name.clone();
        existing.description = template.description.clone();
        existing.contract_name = template.contract_name.clone();
        existing.source_code = template.source_code.clone();
        existing.metadata_schema = template.metadata_schema.clone();
        existing.sample_values = template.sample_values.clone();
        existing.compiled_abi = template.compiled_abi.clone();
        existing.updated_at = template.updated_at;
        Ok(Some(existing.clone()))
    }

    async fn list_templates(&self) -> Result<Vec<Template>> {
        let mut all: Vec<Template> = self.templates.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(
        &self,
        id: Uuid,
        session: &NewSession,
    ) -> Result<Option<TransactionSession>> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Ok(None);
        }
        let now = Utc::now();
        let row = TransactionSession {
            id,
            chain_type: session.chain_type,
            chain_id: session.chain_id,
            steps: Json(session.steps.clone()),
            metadata: Json(session.metadata.clone()),
            status: SessionStatus::Pending,
            user_id: session.user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        sessions.insert(id, row.clone());
        Ok(Some(row))
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<TransactionSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<TransactionSession>> {
        let mut rows: Vec<TransactionSession> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn transition_session_status(
        &self,
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(row) if row.status == from => {
                row.status = to;
                row.updated_at = Utc::now();
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[async_trait]
impl ReferenceData for MemoryStore {
    async fn pool_by_token(&self, chain_id: i64, token: &str) -> Result<Option<LiquidityPool>> {
        Ok(self
            .pools
            .read()
            .await
            .iter()
            .rev()
            .find(|p| p.chain_id == chain_id && p.token_address.eq_ignore_ascii_case(token))
            .cloned())
    }

    async fn active_deployment(&self, chain_id: i64) -> Result<Option<UniswapDeployment>> {
        Ok(self
            .deployments
            .read()
            .await
            .iter()
            .rev()
            .find(|d| d.chain_id == chain_id && d.status == DeploymentStatus::Confirmed)
            .cloned())
    }
}
