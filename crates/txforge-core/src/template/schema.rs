//! Metadata schema and chain-specific structural checks.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ValidationError;

/// Reject schemas with an empty key or a non-empty value.
///
/// The schema describes shape only: every value must be `""`.
pub fn validate_schema(schema: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    for (key, value) in schema {
        if key.trim().is_empty() {
            return Err(ValidationError::EmptySchemaKey);
        }
        if !value.is_empty() {
            return Err(ValidationError::NonEmptySchemaValue {
                key: key.clone(),
                value: value.clone(),
            });
        }
    }
    Ok(())
}

/// Require the schema's keys to be exactly the template's variables.
pub fn check_schema_matches(
    schema: &BTreeMap<String, String>,
    variables: &BTreeSet<String>,
) -> Result<(), ValidationError> {
    let missing: Vec<String> = variables
        .iter()
        .filter(|v| !schema.contains_key(*v))
        .cloned()
        .collect();
    let extra: Vec<String> = schema
        .keys()
        .filter(|k| !variables.contains(*k))
        .cloned()
        .collect();

    if missing.is_empty() && extra.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::SchemaMismatch { missing, extra })
    }
}

/// Markers an Anchor-style Solana program must contain.
pub const SOLANA_MARKERS: [&str; 3] = ["declare_id!", "#[program]", "#[derive(Accounts)]"];

/// Structural check for Solana sources. No compilation happens.
pub fn check_solana_structure(source: &str) -> Result<(), ValidationError> {
    let missing: Vec<&'static str> = SOLANA_MARKERS
        .iter()
        .copied()
        .filter(|marker| !source.contains(marker))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingProgramMarkers { missing })
    }
}
