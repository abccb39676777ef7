//! Error taxonomy for the pipeline.
//!
//! Every public operation returns [`Error`]. Callers branch on
//! [`Error::kind`] rather than on message text.

use thiserror::Error;

use txforge_db::models::{ChainType, ChainTypeParseError, DeploymentStatus, SessionStatus};

use crate::abi::AbiError;
use crate::compiler::CompilerError;

/// Malformed caller input.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("invalid address for {field}: {value:?} (expected 0x followed by 40 hex digits)")]
    InvalidAddress { field: &'static str, value: String },

    #[error(transparent)]
    InvalidChainType(#[from] ChainTypeParseError),

    #[error("chain id {0} does not fit in a signed 64-bit integer")]
    ChainIdOutOfRange(u64),

    #[error("invalid slippage {value:?} (expected a decimal percentage with at most 4 decimal places)")]
    InvalidSlippage { value: String },

    #[error("slippage {value:?} is outside the allowed range 0 to 100 percent")]
    SlippageOutOfRange { value: String },

    #[error("invalid amount for {field}: {value:?} (expected a decimal wei amount)")]
    InvalidAmount { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroAmount { field: &'static str },

    #[error("cannot swap token {token} for itself")]
    SameToken { token: String },

    #[error("route for {token} collapses to a single hop through the wrapped native asset")]
    DegenerateRoute { token: String },

    #[error("operation requires an ethereum chain, got {chain_type}")]
    UnsupportedChain { chain_type: ChainType },

    #[error("metadata schema contains an empty key")]
    EmptySchemaKey,

    #[error("metadata schema value for {key:?} must be the empty string, got {value:?}")]
    NonEmptySchemaValue { key: String, value: String },

    #[error(
        "metadata schema does not match template variables \
         (missing from schema: [{}]; not in template: [{}])",
        .missing.join(", "),
        .extra.join(", ")
    )]
    SchemaMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("solana program source is missing required markers: {}", .missing.join(", "))]
    MissingProgramMarkers { missing: Vec<&'static str> },

    #[error("transaction session must contain at least one step")]
    EmptySession,
}

/// Placeholder resolution failure while rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("unterminated placeholder starting at byte {offset}")]
    Unterminated { offset: usize },

    #[error("malformed placeholder at byte {offset}: {snippet:?} (expected {{{{.Name}}}})")]
    Malformed { offset: usize, snippet: String },

    #[error("no value supplied for template variable {name:?}")]
    Unresolved { name: String },
}

/// Missing or unusable reference data (pools, deployments).
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("no liquidity pool found for token {token}")]
    PoolNotFound { token: String },

    #[error("liquidity pool for token {token} is {status}, expected confirmed")]
    PoolNotConfirmed {
        token: String,
        status: DeploymentStatus,
    },

    #[error("liquidity pool for token {token} has no pair address")]
    MissingPairAddress { token: String },

    #[error("liquidity pool {pool_id} does not contain token {token}")]
    PoolTokenMismatch { pool_id: String, token: String },

    #[error("no active uniswap deployment on chain {chain_id}")]
    NoActiveDeployment { chain_id: u64 },

    #[error("uniswap deployment on chain {chain_id} has no router address")]
    MissingRouterAddress { chain_id: u64 },

    #[error("uniswap deployment on chain {chain_id} has no wrapped native address")]
    MissingWrappedNative { chain_id: u64 },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Render,
    Compilation,
    ContractNotFound,
    Precondition,
    NotFound,
    Conflict,
    CompilerUnavailable,
    Encoding,
    Storage,
}

/// Top-level pipeline error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("compilation failed:\n{diagnostic}")]
    Compilation { diagnostic: String },

    #[error(
        "contract {requested:?} not found in compiled output; available contracts: [{}]",
        .available.join(", ")
    )]
    ContractNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("session {id} is {current}, cannot move to {requested}")]
    InvalidTransition {
        id: String,
        current: SessionStatus,
        requested: SessionStatus,
    },

    /// The compiler could not be run (spawn failure, timeout, version
    /// mismatch, unreadable output). Distinct from [`Error::Compilation`].
    #[error("compiler unavailable: {0}")]
    Compiler(CompilerError),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Render(_) => ErrorKind::Render,
            Self::Compilation { .. } => ErrorKind::Compilation,
            Self::ContractNotFound { .. } => ErrorKind::ContractNotFound,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTransition { .. } => ErrorKind::Conflict,
            Self::Compiler(_) => ErrorKind::CompilerUnavailable,
            Self::Abi(_) => ErrorKind::Encoding,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<CompilerError> for Error {
    fn from(err: CompilerError) -> Self {
        match err {
            CompilerError::Diagnostic(diagnostic) => Self::Compilation { diagnostic },
            other => Self::Compiler(other),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_not_found_lists_available_names() {
        let err = Error::ContractNotFound {
            requested: "Token".into(),
            available: vec!["Ownable".into(), "TokenV2".into()],
        };
        assert_eq!(err.kind(), ErrorKind::ContractNotFound);
        let msg = err.to_string();
        assert!(msg.contains("Ownable, TokenV2"), "got: {msg}");
    }

    #[test]
    fn compiler_diagnostic_maps_to_compilation_kind() {
        let err: Error = CompilerError::Diagnostic("ParserError: expected ';'".into()).into();
        assert_eq!(err.kind(), ErrorKind::Compilation);

        let err: Error = CompilerError::Timeout(std::time::Duration::from_secs(3)).into();
        assert_eq!(err.kind(), ErrorKind::CompilerUnavailable);
    }

    #[test]
    fn render_and_compilation_are_distinct_kinds() {
        let render: Error = RenderError::Unterminated { offset: 4 }.into();
        let compile = Error::Compilation {
            diagnostic: "boom".into(),
        };
        assert_ne!(render.kind(), compile.kind());
    }

    #[test]
    fn schema_mismatch_message_lists_both_sides() {
        let err = ValidationError::SchemaMismatch {
            missing: vec!["Owner".into()],
            extra: vec!["Supply".into(), "Symbol".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing from schema: [Owner]"), "got: {msg}");
        assert!(msg.contains("not in template: [Supply, Symbol]"), "got: {msg}");
    }
}
