//! `solc --standard-json` adapter.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::OnceCell;

use super::{CompiledContract, CompilerError, CompilerOutput, ContractCompiler};

/// File name the rendered source is submitted under.
pub const SOURCE_UNIT: &str = "Template.sol";

/// How to invoke solc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolcConfig {
    pub binary: PathBuf,
    /// Expected `X.Y.Z`; the binary's `--version` output must match.
    pub version: String,
    pub timeout: Duration,
}

impl SolcConfig {
    pub const DEFAULT_BINARY: &'static str = "solc";
    pub const DEFAULT_VERSION: &'static str = "0.8.24";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
}

impl Default for SolcConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(Self::DEFAULT_BINARY),
            version: Self::DEFAULT_VERSION.to_owned(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Runs a local solc binary. The version is verified on first use and
/// cached for the lifetime of the compiler.
#[derive(Debug)]
pub struct SolcCompiler {
    config: SolcConfig,
    verified: OnceCell<String>,
}

impl SolcCompiler {
    pub fn new(config: SolcConfig) -> Self {
        Self {
            config,
            verified: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &SolcConfig {
        &self.config
    }

    async fn ensure_version(&self) -> Result<&str, CompilerError> {
        let found = self
            .verified
            .get_or_try_init(|| async {
                let (status, stdout, stderr) = self.run(&["--version"], None).await?;
                if !status.success() {
                    return Err(CompilerError::ProcessFailed {
                        status: status.code(),
                        stderr,
                    });
                }
                let found = parse_version(&stdout).unwrap_or_default();
                if found != self.config.version {
                    return Err(CompilerError::VersionMismatch {
                        expected: self.config.version.clone(),
                        found,
                    });
                }
                tracing::debug!(binary = %self.config.binary.display(), version = %found, "solc version verified");
                Ok::<String, CompilerError>(found)
            })
            .await?;
        Ok(found.as_str())
    }

    /// Spawn the binary, feed `input` on stdin, and collect its output
    /// under the configured timeout.
    async fn run(
        &self,
        args: &[&str],
        input: Option<&[u8]>,
    ) -> Result<(ExitStatus, String, String), CompilerError> {
        let binary = self.config.binary.display().to_string();
        let mut child = Command::new(&self.config.binary)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CompilerError::Spawn {
                binary: binary.clone(),
                source,
            })?;

        let mut stdin_pipe = child.stdin.take();
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let write_stdin = async {
            if let (Some(pipe), Some(bytes)) = (stdin_pipe.as_mut(), input) {
                // A compiler that exits early closes the pipe; its exit
                // status and stderr carry the real failure.
                pipe.write_all(bytes).await.ok();
                pipe.shutdown().await.ok();
            }
            drop(stdin_pipe.take());
        };
        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stdout_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };
        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stderr_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        match tokio::time::timeout(self.config.timeout, async {
            let ((), status, stdout, stderr) =
                tokio::join!(write_stdin, child.wait(), read_stdout, read_stderr);
            (status, stdout, stderr)
        })
        .await
        {
            Ok((Ok(status), stdout, stderr)) => Ok((status, stdout, stderr)),
            Ok((Err(source), _, _)) => Err(CompilerError::Spawn { binary, source }),
            Err(_) => {
                let _ = child.kill().await;
                tracing::warn!(binary = %binary, timeout = ?self.config.timeout, "solc timed out");
                Err(CompilerError::Timeout(self.config.timeout))
            }
        }
    }
}

#[async_trait]
impl ContractCompiler for SolcCompiler {
    fn language_version(&self) -> &str {
        &self.config.version
    }

    async fn compile(&self, source: &str) -> Result<CompilerOutput, CompilerError> {
        self.ensure_version().await?;

        let input = standard_json_input(source);
        let input = serde_json::to_vec(&input)
            .map_err(|e| CompilerError::MalformedOutput(format!("cannot encode input: {e}")))?;

        let (status, stdout, stderr) = self.run(&["--standard-json"], Some(&input)).await?;
        let parsed: StandardJsonOutput = match serde_json::from_str(&stdout) {
            Ok(parsed) => parsed,
            Err(_) if !status.success() => {
                return Err(CompilerError::ProcessFailed {
                    status: status.code(),
                    stderr,
                });
            }
            Err(e) => return Err(CompilerError::MalformedOutput(e.to_string())),
        };
        parse_output(parsed)
    }
}

fn standard_json_input(source: &str) -> serde_json::Value {
    json!({
        "language": "Solidity",
        "sources": { SOURCE_UNIT: { "content": source } },
        "settings": {
            "outputSelection": {
                "*": { "*": ["abi", "evm.bytecode.object"] }
            }
        }
    })
}

/// Extract `X.Y.Z` from `solc --version` output
/// (`Version: 0.8.24+commit.e11b9ed9.Linux.g++`).
fn parse_version(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("Version:")?;
        let version = rest.trim().split(['+', '-']).next()?;
        Some(version.to_owned())
    })
}

#[derive(Debug, Deserialize)]
struct StandardJsonOutput {
    #[serde(default)]
    errors: Vec<SolcDiagnostic>,
    #[serde(default)]
    contracts: BTreeMap<String, BTreeMap<String, SolcContract>>,
}

#[derive(Debug, Deserialize)]
struct SolcDiagnostic {
    severity: String,
    #[serde(rename = "formattedMessage")]
    formatted_message: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SolcContract {
    #[serde(default)]
    abi: serde_json::Value,
    evm: Option<SolcEvm>,
}

#[derive(Debug, Deserialize)]
struct SolcEvm {
    bytecode: Option<SolcBytecode>,
}

#[derive(Debug, Deserialize)]
struct SolcBytecode {
    #[serde(default)]
    object: String,
}

fn parse_output(output: StandardJsonOutput) -> Result<CompilerOutput, CompilerError> {
    let errors: Vec<String> = output
        .errors
        .into_iter()
        .filter(|d| d.severity.eq_ignore_ascii_case("error"))
        .map(|d| d.formatted_message.unwrap_or(d.message))
        .collect();
    if !errors.is_empty() {
        return Err(CompilerError::Diagnostic(errors.join("\n")));
    }

    let contracts = output
        .contracts
        .into_iter()
        .filter(|(unit, _)| unit == SOURCE_UNIT)
        .flat_map(|(_, contracts)| contracts)
        .map(|(name, contract)| {
            let bytecode = contract
                .evm
                .and_then(|evm| evm.bytecode)
                .map(|b| b.object)
                .unwrap_or_default();
            let abi = if contract.abi.is_null() {
                json!([])
            } else {
                contract.abi
            };
            (name, CompiledContract { abi, bytecode })
        })
        .collect();
    Ok(CompilerOutput { contracts })
}
