//! CLI handlers for `txforge template` subcommands.
//!
//! Implements:
//! - `txforge template create`        -- validate, compile and store a template
//! - `txforge template update <id>`   -- change fields, recompiling when needed
//! - `txforge template show [id]`     -- show one template or list all
//! - `txforge template render <id>`   -- substitute values into the source
//! - `txforge template deploy <id>`   -- build a deployment signing session

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use uuid::Uuid;

use txforge_core::Forge;
use txforge_core::abi::function_names;
use txforge_core::template::{DeployRequest, NewTemplate, TemplateUpdate, variables};
use txforge_db::models::{AbiValue, Template};

use crate::TemplateCommands;
use crate::session_cmds::{print_session_header, print_steps};

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `TemplateCommands` variant to the appropriate handler.
pub async fn run_template_command(command: TemplateCommands, forge: &Forge) -> Result<()> {
    match command {
        TemplateCommands::Create {
            name,
            source,
            chain_type,
            contract_name,
            description,
            vars,
            samples,
        } => {
            let source_code = read_source(&source)?;
            let metadata_schema: BTreeMap<String, String> = if vars.is_empty() {
                variables(&source_code)
                    .with_context(|| format!("failed to scan placeholders in {}", source.display()))?
                    .into_iter()
                    .map(|v| (v, String::new()))
                    .collect()
            } else {
                schema_from(vars)
            };
            let new = NewTemplate {
                name,
                description: description.unwrap_or_default(),
                chain_type,
                contract_name,
                source_code,
                metadata_schema,
                sample_values: samples.into_iter().collect(),
            };
            let template = forge.create_template(new).await?;
            println!("Template created successfully.");
            println!();
            print_template(&template);
            Ok(())
        }
        TemplateCommands::Update {
            template_id,
            name,
            description,
            contract_name,
            source,
            vars,
            samples,
        } => {
            let id = parse_template_id(&template_id)?;
            let source_code = source.as_deref().map(read_source).transpose()?;
            let update = TemplateUpdate {
                name,
                description,
                contract_name,
                source_code,
                metadata_schema: (!vars.is_empty()).then(|| schema_from(vars)),
                sample_values: (!samples.is_empty()).then(|| samples.into_iter().collect()),
            };
            let template = forge.update_template(id, update).await?;
            println!("Template updated.");
            println!();
            print_template(&template);
            Ok(())
        }
        TemplateCommands::Show { template_id } => match template_id {
            Some(id) => {
                let template = forge.template(parse_template_id(&id)?).await?;
                print_template(&template);
                println!();
                println!("Source:");
                println!("{}", template.source_code);
                Ok(())
            }
            None => cmd_list(forge).await,
        },
        TemplateCommands::Deploy {
            template_id,
            values,
            args,
            value,
            user,
        } => {
            let id = parse_template_id(&template_id)?;
            let request = DeployRequest {
                values: values.into_iter().collect(),
                constructor_args: parse_constructor_args(args.as_deref())?,
                value,
            };
            let ticket = forge.deploy_template(id, &request, user).await?;
            println!("Deployment session created.");
            println!();
            print_session_header(&ticket.session, &ticket.signing_url);
            println!("  Contract:     {}", ticket.plan.contract_name);
            println!("  Bytecode:     {} bytes", ticket.plan.bytecode_size);
            println!();
            print_steps(&ticket.session.steps);
            Ok(())
        }
        TemplateCommands::Render {
            template_id,
            values,
            output,
        } => {
            let id = parse_template_id(&template_id)?;
            let values: BTreeMap<String, String> = values.into_iter().collect();
            let rendered = forge.render_template(id, &values).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Rendered source written to {}", path.display());
                }
                None => print!("{rendered}"),
            }
            Ok(())
        }
    }
}

fn parse_template_id(template_id: &str) -> Result<Uuid> {
    Uuid::parse_str(template_id).with_context(|| format!("invalid template ID: {template_id}"))
}

fn parse_constructor_args(raw: Option<&str>) -> Result<Vec<AbiValue>> {
    match raw {
        Some(json) => serde_json::from_str(json)
            .context("constructor arguments must be a JSON array of {\"type\", \"value\"} objects"),
        None => Ok(Vec::new()),
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read source file: {}", path.display()))
}

/// Placeholder names become schema keys with empty values.
fn schema_from(vars: Vec<String>) -> BTreeMap<String, String> {
    vars.into_iter().map(|v| (v, String::new())).collect()
}

// -----------------------------------------------------------------------
// txforge template show (list all)
// -----------------------------------------------------------------------

async fn cmd_list(forge: &Forge) -> Result<()> {
    let templates = forge.list_templates().await?;

    if templates.is_empty() {
        println!("No templates found. Use `txforge template create` to create one.");
        return Ok(());
    }

    let name_w = templates
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!("{:<36}  {:<name_w$}  {:<8}  CONTRACT", "ID", "NAME", "CHAIN");
    for t in &templates {
        println!(
            "{:<36}  {:<name_w$}  {:<8}  {}",
            t.id,
            t.name,
            t.chain_type.to_string(),
            if t.contract_name.is_empty() {
                "-"
            } else {
                t.contract_name.as_str()
            },
        );
    }

    Ok(())
}

fn print_template(template: &Template) {
    println!("  Template ID:  {}", template.id);
    println!("  Name:         {}", template.name);
    if !template.description.is_empty() {
        println!("  Description:  {}", template.description);
    }
    println!("  Chain:        {}", template.chain_type);
    if !template.contract_name.is_empty() {
        println!("  Contract:     {}", template.contract_name);
    }
    let keys: Vec<&str> = template.metadata_schema.keys().map(String::as_str).collect();
    println!("  Variables:    {}", keys.join(", "));
    if !template.sample_values.is_empty() {
        let samples: Vec<String> = template
            .sample_values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("  Samples:      {}", samples.join(", "));
    }
    if let Some(abi) = &template.compiled_abi {
        let names: Vec<String> = function_names(abi).into_iter().collect();
        println!("  Functions:    {}", names.join(", "));
    }
    println!(
        "  Updated:      {}",
        template.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
}
