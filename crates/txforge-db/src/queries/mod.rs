//! Query functions, one module per table.

pub mod deployments;
pub mod pools;
pub mod sessions;
pub mod templates;
