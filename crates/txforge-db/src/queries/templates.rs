//! Database query functions for the `templates` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Template;

/// Insert a fully built template row. Returns the row as stored.
pub async fn insert_template(pool: &PgPool, template: &Template) -> Result<Template> {
    let row = sqlx::query_as::<_, Template>(
        "INSERT INTO templates \
         (id, name, description, chain_type, contract_name, source_code, \
          metadata_schema, sample_values, compiled_abi, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING *",
    )
    .bind(template.id)
    .bind(&template.name)
    .bind(&template.description)
    .bind(template.chain_type)
    .bind(&template.contract_name)
    .bind(&template.source_code)
    .bind(&template.metadata_schema)
    .bind(&template.sample_values)
    .bind(&template.compiled_abi)
    .bind(template.created_at)
    .bind(template.updated_at)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert template {:?}", template.name))?;

    Ok(row)
}

/// Fetch a template by its ID.
pub async fn get_template(pool: &PgPool, id: Uuid) -> Result<Option<Template>> {
    let row = sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch template")?;

    Ok(row)
}

/// List all templates, newest first.
pub async fn list_templates(pool: &PgPool) -> Result<Vec<Template>> {
    let rows = sqlx::query_as::<_, Template>("SELECT * FROM templates ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
        .context("failed to list templates")?;

    Ok(rows)
}

/// Overwrite the mutable columns of an existing template in one statement.
///
/// Returns `None` when no row with `template.id` exists.
pub async fn update_template(pool: &PgPool, template: &Template) -> Result<Option<Template>> {
    let row = sqlx::query_as::<_, Template>(
        "UPDATE templates \
         SET name = $2, description = $3, contract_name = $4, source_code = $5, \
             metadata_schema = $6, sample_values = $7, compiled_abi = $8, \
             updated_at = $9 \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(template.id)
    .bind(&template.name)
    .bind(&template.description)
    .bind(&template.contract_name)
    .bind(&template.source_code)
    .bind(&template.metadata_schema)
    .bind(&template.sample_values)
    .bind(&template.compiled_abi)
    .bind(template.updated_at)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to update template {}", template.id))?;

    Ok(row)
}
