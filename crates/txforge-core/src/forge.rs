//! One handle over the whole pipeline, as the CLI uses it.

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use txforge_db::models::{MetadataEntry, SessionStatus, Template, TransactionSession, TransactionStep};

use crate::compiler::ContractCompiler;
use crate::error::{Error, Result};
use crate::planner::{
    self, ActiveChain, AddLiquidityRequest, LiquidityPlan, PlanContext, RemoveLiquidityRequest,
    SwapPlan, SwapRequest,
};
use crate::session::{self, SessionFamily, signing_url};
use crate::store::{ReferenceData, SessionStore, TemplateStore};
use crate::template::{self, DeployPlan, DeployRequest, NewTemplate, TemplateUpdate};

/// A stored session together with the plan that produced it.
#[derive(Debug, Clone)]
pub struct SessionTicket<P> {
    pub plan: P,
    pub session: TransactionSession,
    pub signing_url: String,
}

/// Pipeline facade bound to one store, one compiler and one active chain.
#[derive(Clone)]
pub struct Forge {
    templates: Arc<dyn TemplateStore>,
    sessions: Arc<dyn SessionStore>,
    reference: Arc<dyn ReferenceData>,
    compiler: Arc<dyn ContractCompiler>,
    chain: ActiveChain,
    server_base_url: String,
}

impl Forge {
    pub fn new<S>(
        store: Arc<S>,
        compiler: Arc<dyn ContractCompiler>,
        chain: ActiveChain,
        server_base_url: impl Into<String>,
    ) -> Self
    where
        S: TemplateStore + SessionStore + ReferenceData + 'static,
    {
        Self {
            templates: store.clone(),
            sessions: store.clone(),
            reference: store,
            compiler,
            chain,
            server_base_url: server_base_url.into(),
        }
    }

    pub fn chain(&self) -> &ActiveChain {
        &self.chain
    }

    fn context(&self) -> PlanContext {
        PlanContext::new(self.chain.clone())
    }

    // -- templates ----------------------------------------------------------

    pub async fn create_template(&self, new: NewTemplate) -> Result<Template> {
        template::create_template(self.templates.as_ref(), self.compiler.as_ref(), new).await
    }

    pub async fn update_template(&self, id: Uuid, update: TemplateUpdate) -> Result<Template> {
        template::update_template(self.templates.as_ref(), self.compiler.as_ref(), id, update)
            .await
    }

    pub async fn render_template(
        &self,
        id: Uuid,
        values: &BTreeMap<String, String>,
    ) -> Result<String> {
        template::render_template(self.templates.as_ref(), id, values).await
    }

    pub async fn template(&self, id: Uuid) -> Result<Template> {
        self.templates
            .get_template(id)
            .await?
            .ok_or_else(|| Error::not_found("template", id))
    }

    pub async fn list_templates(&self) -> Result<Vec<Template>> {
        Ok(self.templates.list_templates().await?)
    }

    // -- planning -----------------------------------------------------------

    /// Compile template `id` with `request` and open a session holding its
    /// creation transaction.
    pub async fn deploy_template(
        &self,
        id: Uuid,
        request: &DeployRequest,
        user_id: Option<String>,
    ) -> Result<SessionTicket<DeployPlan>> {
        let plan = template::plan_deploy(
            self.templates.as_ref(),
            self.compiler.as_ref(),
            &self.chain,
            id,
            request,
        )
        .await?;
        let (steps, metadata) = (plan.steps.clone(), plan.metadata.clone());
        self.open_session(plan, steps, metadata, user_id, SessionFamily::Transaction)
            .await
    }

    pub async fn swap(
        &self,
        request: &SwapRequest,
        user_id: Option<String>,
    ) -> Result<SessionTicket<SwapPlan>> {
        let plan = planner::plan_swap(request, &self.context(), self.reference.as_ref()).await?;
        let (steps, metadata) = (plan.steps.clone(), plan.metadata.clone());
        self.open_session(plan, steps, metadata, user_id, SessionFamily::Transaction)
            .await
    }

    pub async fn add_liquidity(
        &self,
        request: &AddLiquidityRequest,
        user_id: Option<String>,
    ) -> Result<SessionTicket<LiquidityPlan>> {
        let plan =
            planner::plan_add_liquidity(request, &self.context(), self.reference.as_ref()).await?;
        let (steps, metadata) = (plan.steps.clone(), plan.metadata.clone());
        self.open_session(plan, steps, metadata, user_id, SessionFamily::Transaction)
            .await
    }

    pub async fn remove_liquidity(
        &self,
        request: &RemoveLiquidityRequest,
        user_id: Option<String>,
    ) -> Result<SessionTicket<LiquidityPlan>> {
        let plan =
            planner::plan_remove_liquidity(request, &self.context(), self.reference.as_ref())
                .await?;
        let (steps, metadata) = (plan.steps.clone(), plan.metadata.clone());
        self.open_session(plan, steps, metadata, user_id, SessionFamily::RemoveLiquidity)
            .await
    }

    async fn open_session<P>(
        &self,
        plan: P,
        steps: Vec<TransactionStep>,
        metadata: Vec<MetadataEntry>,
        user_id: Option<String>,
        family: SessionFamily,
    ) -> Result<SessionTicket<P>> {
        let session = session::create_transaction_session(
            self.sessions.as_ref(),
            self.chain.chain_type,
            self.chain.chain_id,
            steps,
            metadata,
            user_id,
        )
        .await?;
        let signing_url = signing_url(&self.server_base_url, family, session.id);
        Ok(SessionTicket {
            plan,
            session,
            signing_url,
        })
    }

    // -- sessions -----------------------------------------------------------

    pub async fn session(&self, id: Uuid) -> Result<TransactionSession> {
        session::get_transaction_session(self.sessions.as_ref(), id).await
    }

    pub async fn mark_session(&self, id: Uuid, status: SessionStatus) -> Result<TransactionSession> {
        session::mark_session_status(self.sessions.as_ref(), id, status).await
    }

    pub async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<TransactionSession>> {
        Ok(self.sessions.list_sessions_for_user(user_id).await?)
    }

    /// Signing URL for an existing session, chosen by its `action` metadata.
    pub fn signing_url_for(&self, session: &TransactionSession) -> String {
        let family = match session.metadata_value("action") {
            Some("remove_liquidity") => SessionFamily::RemoveLiquidity,
            _ => SessionFamily::Transaction,
        };
        signing_url(&self.server_base_url, family, session.id)
    }
}
