//! Configuration file management for txforge.
//!
//! Provides a TOML-based config file at `~/.config/txforge/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use txforge_core::compiler::SolcConfig;
use txforge_core::planner::ActiveChain;
use txforge_core::validate::parse_chain_type;
use txforge_db::config::DbConfig;

/// Environment variable overriding the signing server base URL.
pub const SERVER_URL_ENV: &str = "TXFORGE_SERVER_URL";

/// Environment variable overriding the solc binary path.
pub const SOLC_ENV: &str = "TXFORGE_SOLC";

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_CHAIN_ID: u64 = 31337;
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub chain: ChainSection,
    #[serde(default)]
    pub compiler: CompilerSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainSection {
    /// `ethereum` or `solana`.
    #[serde(rename = "type")]
    pub chain_type: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            chain_type: "ethereum".to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            rpc_url: DEFAULT_RPC_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSection {
    pub solc_path: String,
    pub solc_version: String,
    pub timeout_secs: u64,
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            solc_path: SolcConfig::DEFAULT_BINARY.to_string(),
            solc_version: SolcConfig::DEFAULT_VERSION.to_string(),
            timeout_secs: SolcConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSection {
    /// Base URL of the signing server; session links are built under it.
    pub base_url: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the txforge config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/txforge` or `~/.config/txforge`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("txforge");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("txforge")
}

/// Return the path to the txforge config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<ConfigFile> {
    toml::from_str(contents).context("failed to parse config file")
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line, highest precedence.
#[derive(Debug, Default)]
pub struct CliOverrides<'a> {
    pub database_url: Option<&'a str>,
    pub server_url: Option<&'a str>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct TxforgeConfig {
    pub db_config: DbConfig,
    pub chain: ActiveChain,
    pub solc: SolcConfig,
    pub server_base_url: String,
}

impl TxforgeConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `--database-url` > `TXFORGE_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Server URL: `--server-url` > `TXFORGE_SERVER_URL` > `server.base_url` > `DEFAULT_SERVER_URL`
    /// - solc binary: `TXFORGE_SOLC` > `compiler.solc_path` > `solc`
    ///
    /// Chain and compiler version/timeout come from the file or defaults only.
    pub fn resolve(cli: &CliOverrides<'_>) -> Result<Self> {
        Self::resolve_with(cli, load_config().ok())
    }

    pub fn resolve_with(cli: &CliOverrides<'_>, file_config: Option<ConfigFile>) -> Result<Self> {
        let db_url = if let Some(url) = cli.database_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let server_base_url = if let Some(url) = cli.server_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.server.base_url.clone()
        } else {
            DEFAULT_SERVER_URL.to_string()
        };

        let (chain_section, compiler_section) = match file_config {
            Some(cfg) => (cfg.chain, cfg.compiler),
            None => (ChainSection::default(), CompilerSection::default()),
        };

        let chain_type = parse_chain_type(&chain_section.chain_type)
            .with_context(|| format!("invalid chain.type in config: {}", chain_section.chain_type))?;
        let chain = ActiveChain {
            chain_type,
            chain_id: chain_section.chain_id,
            rpc_url: chain_section.rpc_url,
        };

        let binary = std::env::var(SOLC_ENV).unwrap_or(compiler_section.solc_path);
        let solc = SolcConfig {
            binary: PathBuf::from(binary),
            version: compiler_section.solc_version,
            timeout: Duration::from_secs(compiler_section.timeout_secs),
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
            chain,
            solc,
            server_base_url,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
