mod config;
mod liquidity_cmds;
mod session_cmds;
mod swap_cmd;
mod template_cmds;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use txforge_core::Forge;
use txforge_core::compiler::SolcCompiler;
use txforge_core::planner::SwapRequest;
use txforge_core::store::PgStore;
use txforge_db::pool;

use config::{CliOverrides, TxforgeConfig};

#[derive(Parser)]
#[command(
    name = "txforge",
    about = "Compile contract templates and build Uniswap V2 transaction sessions"
)]
struct Cli {
    /// Database URL (overrides TXFORGE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Signing server base URL (overrides TXFORGE_SERVER_URL env var)
    #[arg(long, global = true)]
    server_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a txforge config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/txforge")]
        db_url: String,
        /// Chain id of the active EVM chain
        #[arg(long, default_value_t = config::DEFAULT_CHAIN_ID)]
        chain_id: u64,
        /// JSON-RPC endpoint of the active chain
        #[arg(long, default_value = config::DEFAULT_RPC_URL)]
        rpc_url: String,
        /// Base URL signing links are built under
        #[arg(long, default_value = config::DEFAULT_SERVER_URL)]
        base_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the txforge database and run migrations
    DbInit,
    /// Contract template management
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Plan a swap and create a signing session
    Swap {
        /// Token to sell (address, or the native sentinel)
        #[arg(long)]
        from: String,
        /// Token to buy (address, or the native sentinel)
        #[arg(long)]
        to: String,
        /// Amount to sell, in wei
        #[arg(long)]
        amount: String,
        /// Slippage tolerance in percent
        #[arg(long, default_value = "0.5")]
        slippage: String,
        /// Address receiving the output
        #[arg(long)]
        recipient: String,
        /// Quoted output amount; the minimum is discounted from this when given
        #[arg(long)]
        expected_out: Option<String>,
        /// Owner recorded on the session
        #[arg(long)]
        user: Option<String>,
    },
    /// Uniswap V2 liquidity
    Liquidity {
        #[command(subcommand)]
        command: LiquidityCommands,
    },
    /// Inspect and resolve signing sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Create a template from a source file
    Create {
        /// Template name
        #[arg(long)]
        name: String,
        /// Path to the templated source file
        #[arg(long)]
        source: PathBuf,
        /// Chain type: ethereum or solana
        #[arg(long, default_value = "ethereum")]
        chain_type: String,
        /// Contract whose ABI is stored (ethereum only)
        #[arg(long, default_value = "")]
        contract_name: String,
        /// Human-readable description
        #[arg(long)]
        description: Option<String>,
        /// Placeholder name (repeatable). Inferred from the source when omitted.
        #[arg(long = "var")]
        vars: Vec<String>,
        /// Sample value as KEY=VALUE (repeatable)
        #[arg(long = "sample", value_parser = parse_key_val)]
        samples: Vec<(String, String)>,
    },
    /// Update fields of an existing template
    Update {
        /// Template ID
        template_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        contract_name: Option<String>,
        /// Path to a new templated source file
        #[arg(long)]
        source: Option<PathBuf>,
        /// Replacement placeholder list (repeatable)
        #[arg(long = "var")]
        vars: Vec<String>,
        /// Replacement sample values as KEY=VALUE (repeatable)
        #[arg(long = "sample", value_parser = parse_key_val)]
        samples: Vec<(String, String)>,
    },
    /// Show template details (or list all templates)
    Show {
        /// Template ID to show (omit to list all)
        template_id: Option<String>,
    },
    /// Compile a template and create a session holding its deployment
    Deploy {
        /// Template ID
        template_id: String,
        /// Value as KEY=VALUE (repeatable); unset keys use the template samples
        #[arg(long = "set", value_parser = parse_key_val)]
        values: Vec<(String, String)>,
        /// Constructor arguments as a JSON array of tagged values,
        /// e.g. '[{"type":"uint","value":"5"}]'
        #[arg(long)]
        args: Option<String>,
        /// Wei sent with the deployment (payable constructors only)
        #[arg(long, default_value = "0")]
        value: String,
        /// Owner recorded on the session
        #[arg(long)]
        user: Option<String>,
    },
    /// Render a template's source with concrete values
    Render {
        /// Template ID
        template_id: String,
        /// Value as KEY=VALUE (repeatable)
        #[arg(long = "set", value_parser = parse_key_val)]
        values: Vec<(String, String)>,
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum LiquidityCommands {
    /// Plan adding liquidity to a confirmed pool
    Add {
        /// Pool token address
        #[arg(long)]
        token: String,
        /// Amount of the pool token, in wei
        #[arg(long)]
        token_amount: String,
        /// Amount of the paired asset, in wei
        #[arg(long)]
        paired_amount: String,
        /// Slippage tolerance in percent
        #[arg(long, default_value = "0.5")]
        slippage: String,
        /// Address receiving the LP tokens
        #[arg(long)]
        recipient: String,
        /// Owner recorded on the session
        #[arg(long)]
        user: Option<String>,
    },
    /// Plan removing liquidity from a confirmed pool
    Remove {
        /// Pool token address
        #[arg(long)]
        token: String,
        /// LP tokens to burn, in wei
        #[arg(long)]
        liquidity: String,
        /// Minimum pool token returned, in wei
        #[arg(long, default_value = "0")]
        min_token: String,
        /// Minimum paired asset returned, in wei
        #[arg(long, default_value = "0")]
        min_paired: String,
        /// Address receiving both assets
        #[arg(long)]
        recipient: String,
        /// Owner recorded on the session
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Show a session's steps, metadata and signing URL
    Show {
        /// Session ID
        session_id: String,
    },
    /// List sessions created for a user
    List {
        #[arg(long)]
        user: String,
    },
    /// Mark a pending session as confirmed
    Confirm {
        /// Session ID
        session_id: String,
    },
    /// Mark a pending session as failed
    Fail {
        /// Session ID
        session_id: String,
    },
}

/// Parse a `KEY=VALUE` argument. Only the first `=` splits.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Execute the `txforge init` command: write config file.
fn cmd_init(
    db_url: &str,
    chain_id: u64,
    rpc_url: &str,
    base_url: &str,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        chain: config::ChainSection {
            chain_id,
            rpc_url: rpc_url.to_string(),
            ..Default::default()
        },
        compiler: config::CompilerSection::default(),
        server: config::ServerSection {
            base_url: base_url.to_string(),
        },
    };

    let path = config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url    = {db_url}");
    println!("  chain.chain_id  = {chain_id}");
    println!("  chain.rpc_url   = {rpc_url}");
    println!("  server.base_url = {base_url}");
    println!();
    println!("Next: run `txforge db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `txforge db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &TxforgeConfig) -> anyhow::Result<()> {
    println!("Initializing txforge database...");

    if pool::ensure_database_exists(&resolved.db_config).await? {
        println!("Created database.");
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("txforge db-init complete.");
    Ok(())
}

/// Connect to the database and bind a [`Forge`] to it.
///
/// The returned store shares the forge's pool; close it when done.
async fn connect(overrides: &CliOverrides<'_>) -> anyhow::Result<(Forge, Arc<PgStore>)> {
    let resolved = TxforgeConfig::resolve(overrides)?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    tracing::debug!(
        chain_id = resolved.chain.chain_id,
        solc = %resolved.solc.binary.display(),
        "connected to database"
    );
    let store = Arc::new(PgStore::new(db_pool));
    let forge = Forge::new(
        store.clone(),
        Arc::new(SolcCompiler::new(resolved.solc)),
        resolved.chain,
        resolved.server_base_url,
    );
    Ok((forge, store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = CliOverrides {
        database_url: cli.database_url.as_deref(),
        server_url: cli.server_url.as_deref(),
    };

    match cli.command {
        Commands::Init {
            db_url,
            chain_id,
            rpc_url,
            base_url,
            force,
        } => {
            cmd_init(&db_url, chain_id, &rpc_url, &base_url, force)?;
        }
        Commands::DbInit => {
            let resolved = TxforgeConfig::resolve(&overrides)?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Template { command } => {
            let (forge, store) = connect(&overrides).await?;
            let result = template_cmds::run_template_command(command, &forge).await;
            store.pool().close().await;
            result?;
        }
        Commands::Swap {
            from,
            to,
            amount,
            slippage,
            recipient,
            expected_out,
            user,
        } => {
            let request = SwapRequest {
                from_token: from,
                to_token: to,
                amount_in: amount,
                slippage,
                recipient,
                expected_amount_out: expected_out,
            };
            let (forge, store) = connect(&overrides).await?;
            let result = swap_cmd::run_swap(&forge, &request, user).await;
            store.pool().close().await;
            result?;
        }
        Commands::Liquidity { command } => {
            let (forge, store) = connect(&overrides).await?;
            let result = liquidity_cmds::run_liquidity_command(command, &forge).await;
            store.pool().close().await;
            result?;
        }
        Commands::Session { command } => {
            let (forge, store) = connect(&overrides).await?;
            let result = session_cmds::run_session_command(command, &forge).await;
            store.pool().close().await;
            result?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "txforge", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that mutate process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}
