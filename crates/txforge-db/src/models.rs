use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Blockchain family a template or session targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    Ethereum,
    Solana,
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ethereum => "ethereum",
            Self::Solana => "solana",
        };
        f.write_str(s)
    }
}

impl FromStr for ChainType {
    type Err = ChainTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ethereum" => Ok(Self::Ethereum),
            "solana" => Ok(Self::Solana),
            other => Err(ChainTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ChainType`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid chain type: {0:?} (expected ethereum or solana)")]
pub struct ChainTypeParseError(pub String);

// ---------------------------------------------------------------------------

/// Lifecycle of a transaction session.
///
/// Sessions start `pending` and move to `confirmed` or `failed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for SessionStatus {
    type Err = SessionStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            other => Err(SessionStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`SessionStatus`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid session status: {0:?}")]
pub struct SessionStatusParseError(pub String);

// ---------------------------------------------------------------------------

/// Status of externally deployed reference data (pools, Uniswap deployments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    Confirmed,
    Failed,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for DeploymentStatus {
    type Err = DeploymentStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            other => Err(DeploymentStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`DeploymentStatus`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid deployment status: {0:?}")]
pub struct DeploymentStatusParseError(pub String);

// ---------------------------------------------------------------------------

/// What a single transaction step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Approve,
    Swap,
    AddLiquidity,
    RemoveLiquidity,
    Deploy,
    Call,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Approve => "approve",
            Self::Swap => "swap",
            Self::AddLiquidity => "add_liquidity",
            Self::RemoveLiquidity => "remove_liquidity",
            Self::Deploy => "deploy",
            Self::Call => "call",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Step payload types
// ---------------------------------------------------------------------------

/// A tagged ABI argument, one variant per Solidity type class.
///
/// Integers are carried as decimal strings so that full 256-bit values
/// survive JSON round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AbiValue {
    Address(String),
    Uint(String),
    Int(String),
    Bool(bool),
    /// Hex-encoded bytes, with or without a `0x` prefix.
    Bytes(String),
    String(String),
    Array(Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// Name of the Solidity type class this value belongs to.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Uint(_) => "uint",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Tuple(_) => "tuple",
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(s) | Self::Uint(s) | Self::Int(s) | Self::Bytes(s) => f.write_str(s),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Array(items) | Self::Tuple(items) => {
                let (open, close) = if matches!(self, Self::Array(_)) {
                    ('[', ']')
                } else {
                    ('(', ')')
                };
                write!(f, "{open}")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "{close}")
            }
        }
    }
}

/// One concrete on-chain call inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStep {
    pub title: String,
    pub description: String,
    /// Target contract address; empty for a contract creation.
    pub to: String,
    /// `0x`-prefixed ABI-encoded call data.
    pub data: String,
    pub function_name: Option<String>,
    #[serde(default)]
    pub args: Vec<AbiValue>,
    /// JSON ABI fragment for `function_name`, for signers that re-encode.
    pub abi: Option<serde_json::Value>,
    /// Native value in wei, as a decimal string.
    pub value: String,
    pub step_type: StepType,
}

/// Ordered key/value pair attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A parameterized contract template.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub chain_type: ChainType,
    pub contract_name: String,
    pub source_code: String,
    pub metadata_schema: Json<BTreeMap<String, String>>,
    pub sample_values: Json<BTreeMap<String, String>>,
    /// `{"abi": [...]}` for ethereum templates, `None` otherwise.
    pub compiled_abi: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted, ordered list of steps awaiting external signing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionSession {
    pub id: Uuid,
    pub chain_type: ChainType,
    pub chain_id: i64,
    pub steps: Json<Vec<TransactionStep>>,
    pub metadata: Json<Vec<MetadataEntry>>,
    pub status: SessionStatus,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionSession {
    /// Look up a metadata value by key (first match).
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }
}

/// An AMM pair deployed for a token (reference data, read-only here).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LiquidityPool {
    pub id: Uuid,
    pub chain_id: i64,
    pub token_address: String,
    pub token0: String,
    pub token1: String,
    pub pair_address: Option<String>,
    pub reserve0: String,
    pub reserve1: String,
    pub status: DeploymentStatus,
    pub created_at: DateTime<Utc>,
}

/// A Uniswap V2 deployment on one chain (reference data, read-only here).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UniswapDeployment {
    pub id: Uuid,
    pub chain_id: i64,
    pub version: String,
    pub router_address: Option<String>,
    pub factory_address: Option<String>,
    pub wrapped_native_address: Option<String>,
    pub deployer_address: Option<String>,
    pub status: DeploymentStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
