//! External contract compiler interface and ABI selection.
//!
//! ```text
//! rendered source --compile()--> CompilerOutput { name -> (abi, bytecode) }
//!                                      |
//!                      bind_abi(contract_name)
//!                                      |
//!                                      v
//!                              {"abi": [...]}   (bytecode dropped)
//! ```

pub mod solc;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::error::Error;

pub use solc::{SolcCompiler, SolcConfig};

/// One compiled top-level contract.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledContract {
    pub abi: serde_json::Value,
    pub bytecode: String,
}

/// Everything the compiler produced for a single source unit, keyed by
/// contract name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerOutput {
    pub contracts: BTreeMap<String, CompiledContract>,
}

impl CompilerOutput {
    /// Contract names in sorted order.
    pub fn contract_names(&self) -> Vec<String> {
        self.contracts.keys().cloned().collect()
    }
}

/// Failure modes of a compiler invocation.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// The source was rejected. Carries the compiler's own diagnostic text.
    #[error("{0}")]
    Diagnostic(String),

    #[error("failed to run compiler {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compiler did not finish within {0:?}")]
    Timeout(Duration),

    #[error("compiler version mismatch: expected {expected}, binary reports {found:?}")]
    VersionMismatch { expected: String, found: String },

    #[error("compiler exited with status {status:?}: {stderr}")]
    ProcessFailed { status: Option<i32>, stderr: String },

    #[error("unreadable compiler output: {0}")]
    MalformedOutput(String),
}

/// Adapter interface for a contract compiler.
///
/// Object-safe so services can hold `&dyn ContractCompiler`.
#[async_trait]
pub trait ContractCompiler: Send + Sync {
    /// The fixed language version this compiler targets.
    fn language_version(&self) -> &str;

    /// Compile a single, fully rendered source unit.
    async fn compile(&self, source: &str) -> Result<CompilerOutput, CompilerError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn ContractCompiler) {}
};

/// The compiled contract named exactly `contract_name`.
pub fn select_contract<'o>(
    output: &'o CompilerOutput,
    contract_name: &str,
) -> Result<&'o CompiledContract, Error> {
    output
        .contracts
        .get(contract_name)
        .ok_or_else(|| Error::ContractNotFound {
            requested: contract_name.to_owned(),
            available: output.contract_names(),
        })
}

/// Select the ABI for `contract_name` and wrap it as `{"abi": [...]}`.
pub fn bind_abi(output: &CompilerOutput, contract_name: &str) -> Result<serde_json::Value, Error> {
    let contract = select_contract(output, contract_name)?;
    Ok(json!({ "abi": contract.abi }))
}
