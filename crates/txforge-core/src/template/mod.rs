//! Parameterized contract templates: rendering, schema checks, the
//! create/update/render operations and deployment planning.

pub mod render;
pub mod schema;
pub mod service;

pub use render::{dummy_value, render, render_strict, render_with, variables};
pub use schema::{check_schema_matches, check_solana_structure, validate_schema};
pub use service::{
    DeployPlan, DeployRequest, NewTemplate, TemplateUpdate, compile_and_bind_abi,
    create_template, plan_deploy, render_template, update_template,
};
