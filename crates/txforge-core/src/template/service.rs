//! Template create/update/render, and deployment planning.
//!
//! Every check (schema, render, compile, ABI selection) completes before the
//! single store write, so a failed call leaves nothing behind.

use std::collections::BTreeMap;

use alloy::primitives::U256;
use chrono::Utc;
use sqlx::types::Json;
use tracing::{debug, info};
use uuid::Uuid;

use txforge_db::models::{AbiValue, ChainType, MetadataEntry, Template, TransactionStep};

use super::render::{render, render_with, variables};
use super::schema::{check_schema_matches, check_solana_structure, validate_schema};
use crate::abi::parse_json_abi;
use crate::compiler::{ContractCompiler, bind_abi, select_contract};
use crate::error::{Error, Result, ValidationError};
use crate::planner::{ActiveChain, StepSequence};
use crate::store::TemplateStore;
use crate::validate::{parse_chain_type, parse_wei, require_non_empty};

/// Input for [`create_template`].
#[derive(Debug, Clone, Default)]
pub struct NewTemplate {
    pub name: String,
    pub description: String,
    pub chain_type: String,
    pub contract_name: String,
    pub source_code: String,
    pub metadata_schema: BTreeMap<String, String>,
    pub sample_values: BTreeMap<String, String>,
}

/// Partial update for [`update_template`]; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub contract_name: Option<String>,
    pub source_code: Option<String>,
    pub metadata_schema: Option<BTreeMap<String, String>>,
    pub sample_values: Option<BTreeMap<String, String>>,
}

/// Compile `source` (already rendered) and return the ABI to store.
///
/// Ethereum sources go through `compiler` and yield `Some({"abi": [...]})`
/// for `contract_name`. Solana sources are only checked for the Anchor
/// program markers and yield `None`.
pub async fn compile_and_bind_abi(
    compiler: &dyn ContractCompiler,
    source: &str,
    chain_type: ChainType,
    contract_name: &str,
) -> Result<Option<serde_json::Value>> {
    match chain_type {
        ChainType::Ethereum => {
            debug!(
                contract_name,
                version = compiler.language_version(),
                "compiling template source"
            );
            let output = compiler.compile(source).await?;
            let abi = bind_abi(&output, contract_name)?;
            info!(
                contract_name,
                contracts = output.contracts.len(),
                "ABI bound"
            );
            Ok(Some(abi))
        }
        ChainType::Solana => {
            check_solana_structure(source)?;
            Ok(None)
        }
    }
}

/// Validate, compile and persist a new template.
pub async fn create_template(
    store: &dyn TemplateStore,
    compiler: &dyn ContractCompiler,
    new: NewTemplate,
) -> Result<Template> {
    require_non_empty("name", &new.name)?;
    require_non_empty("source_code", &new.source_code)?;
    let chain_type = parse_chain_type(&new.chain_type)?;
    if chain_type == ChainType::Ethereum {
        require_non_empty("contract_name", &new.contract_name)?;
    }

    validate_schema(&new.metadata_schema)?;
    check_schema_matches(&new.metadata_schema, &variables(&new.source_code)?)?;

    let rendered = render(&new.source_code, &BTreeMap::new(), &new.sample_values)?;
    let compiled_abi =
        compile_and_bind_abi(compiler, &rendered, chain_type, new.contract_name.trim()).await?;

    let now = Utc::now();
    let template = Template {
        id: Uuid::new_v4(),
        name: new.name,
        description: new.description,
        chain_type,
        contract_name: new.contract_name.trim().to_owned(),
        source_code: new.source_code,
        metadata_schema: Json(new.metadata_schema),
        sample_values: Json(new.sample_values),
        compiled_abi,
        created_at: now,
        updated_at: now,
    };
    let stored = store.insert_template(&template).await?;
    info!(template_id = %stored.id, name = %stored.name, chain_type = %stored.chain_type, "template created");
    Ok(stored)
}

/// Apply `update` to template `id`.
///
/// The source is recompiled only when the source changes or a different
/// contract name is given; otherwise the stored ABI is kept as is.
pub async fn update_template(
    store: &dyn TemplateStore,
    compiler: &dyn ContractCompiler,
    id: Uuid,
    update: TemplateUpdate,
) -> Result<Template> {
    let existing = store
        .get_template(id)
        .await?
        .ok_or_else(|| Error::not_found("template", id))?;

    if let Some(name) = &update.name {
        require_non_empty("name", name)?;
    }
    if let Some(source) = &update.source_code {
        require_non_empty("source_code", source)?;
    }
    if let Some(contract_name) = &update.contract_name {
        if existing.chain_type == ChainType::Ethereum {
            require_non_empty("contract_name", contract_name)?;
        }
    }

    let source_changed = update
        .source_code
        .as_ref()
        .is_some_and(|s| *s != existing.source_code);
    let contract_changed = update
        .contract_name
        .as_ref()
        .is_some_and(|c| c.trim() != existing.contract_name);

    let mut template = existing;
    if let Some(name) = update.name {
        template.name = name;
    }
    if let Some(description) = update.description {
        template.description = description;
    }
    if let Some(contract_name) = update.contract_name {
        template.contract_name = contract_name.trim().to_owned();
    }
    if let Some(source) = update.source_code {
        template.source_code = source;
    }
    let schema_changed = update.metadata_schema.is_some();
    if let Some(schema) = update.metadata_schema {
        validate_schema(&schema)?;
        template.metadata_schema = Json(schema);
    }
    if let Some(samples) = update.sample_values {
        template.sample_values = Json(samples);
    }

    if schema_changed || source_changed {
        check_schema_matches(&template.metadata_schema, &variables(&template.source_code)?)?;
    }

    if source_changed || contract_changed {
        let rendered = render(
            &template.source_code,
            &BTreeMap::new(),
            &template.sample_values,
        )?;
        template.compiled_abi = compile_and_bind_abi(
            compiler,
            &rendered,
            template.chain_type,
            &template.contract_name,
        )
        .await?;
        debug!(template_id = %id, "template recompiled");
    }

    template.updated_at = Utc::now();
    let stored = store
        .update_template(&template)
        .await?
        .ok_or_else(|| Error::not_found("template", id))?;
    info!(template_id = %id, recompiled = source_changed || contract_changed, "template updated");
    Ok(stored)
}

/// Render template `id` with caller `values`, falling back to its samples
/// and then to dummy values.
pub async fn render_template(
    store: &dyn TemplateStore,
    id: Uuid,
    values: &BTreeMap<String, String>,
) -> Result<String> {
    let template = store
        .get_template(id)
        .await?
        .ok_or_else(|| Error::not_found("template", id))?;
    Ok(render(&template.source_code, values, &template.sample_values)?)
}

/// Input for [`plan_deploy`].
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    /// Placeholder values; unset ones fall back to the stored samples.
    pub values: BTreeMap<String, String>,
    pub constructor_args: Vec<AbiValue>,
    /// Wei sent with the creation, decimal. Empty means zero.
    pub value: String,
}

/// A single contract-creation step for a rendered template.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub template_id: Uuid,
    pub contract_name: String,
    /// Length of the creation code, constructor arguments excluded.
    pub bytecode_size: usize,
    pub steps: Vec<TransactionStep>,
    pub metadata: Vec<MetadataEntry>,
}

/// Render template `id`, compile it and encode its creation transaction.
///
/// Unlike [`render_template`], every placeholder must be resolved by
/// `request.values` or the stored samples; dummies are never deployed.
/// Bytecode is used for the step only and never stored on the template.
pub async fn plan_deploy(
    store: &dyn TemplateStore,
    compiler: &dyn ContractCompiler,
    chain: &ActiveChain,
    id: Uuid,
    request: &DeployRequest,
) -> Result<DeployPlan> {
    if chain.chain_type != ChainType::Ethereum {
        return Err(ValidationError::UnsupportedChain {
            chain_type: chain.chain_type,
        }
        .into());
    }
    let value = if request.value.trim().is_empty() {
        U256::ZERO
    } else {
        parse_wei("value", &request.value)?
    };
    let template = store
        .get_template(id)
        .await?
        .ok_or_else(|| Error::not_found("template", id))?;
    if template.chain_type != ChainType::Ethereum {
        return Err(ValidationError::UnsupportedChain {
            chain_type: template.chain_type,
        }
        .into());
    }

    let source = render_with(&template.source_code, |name| {
        request
            .values
            .get(name)
            .or_else(|| template.sample_values.get(name))
            .map(String::as_str)
    })?;
    let output = compiler.compile(&source).await?;
    let contract = select_contract(&output, &template.contract_name)?;
    let abi = parse_json_abi(&contract.abi)?;
    let bytecode_size = contract.bytecode.trim_start_matches("0x").len() / 2;

    let mut seq = StepSequence::new();
    seq.deploy(
        &contract.bytecode,
        &abi,
        request.constructor_args.clone(),
        value,
        format!("Deploy {}", template.contract_name),
        format!(
            "Create contract {} from template {}",
            template.contract_name, template.name
        ),
    )?;

    let metadata = vec![
        MetadataEntry::new("action", "deploy"),
        MetadataEntry::new("template_id", template.id.to_string()),
        MetadataEntry::new("template_name", template.name.clone()),
        MetadataEntry::new("contract_name", template.contract_name.clone()),
        MetadataEntry::new("compiler_version", compiler.language_version()),
        MetadataEntry::new("bytecode_size", bytecode_size.to_string()),
        MetadataEntry::new("value", value.to_string()),
    ];

    info!(
        template_id = %id,
        contract_name = %template.contract_name,
        bytecode_size,
        "deployment planned"
    );
    Ok(DeployPlan {
        template_id: template.id,
        contract_name: template.contract_name,
        bytecode_size,
        steps: seq.finish(),
        metadata,
    })
}
