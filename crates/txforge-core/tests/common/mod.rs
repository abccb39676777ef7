//! Shared fixtures for txforge-core integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use regex::Regex;
use serde_json::json;

use txforge_core::compiler::{CompiledContract, CompilerError, CompilerOutput, ContractCompiler};
use txforge_core::planner::{ActiveChain, PlanContext};
use txforge_core::store::{MemoryStore, ReferenceData};
use txforge_db::models::{ChainType, DeploymentStatus, LiquidityPool, UniswapDeployment};

pub const CHAIN_ID: u64 = 31337;
pub const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";
pub const TOKEN_A: &str = "0x1111111111111111111111111111111111111111";
pub const TOKEN_B: &str = "0x2222222222222222222222222222222222222222";
pub const PAIR_A: &str = "0x3333333333333333333333333333333333333333";
pub const PAIR_B: &str = "0x5555555555555555555555555555555555555555";
pub const USER: &str = "0x4444444444444444444444444444444444444444";

// ===========================================================================
// Fake compiler
// ===========================================================================

/// Stand-in for solc: finds `contract`/`interface`/`library` blocks and reports a getter for
/// every `public` state variable and an entry for every `function`.
/// Unbalanced braces produce a parser diagnostic.
#[derive(Debug, Default)]
pub struct FakeCompiler {
    calls: AtomicUsize,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractCompiler for FakeCompiler {
    fn language_version(&self) -> &str {
        "0.8.24"
    }

    async fn compile(&self, source: &str) -> Result<CompilerOutput, CompilerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        fake_compile(source)
    }
}

pub fn fake_compile(source: &str) -> Result<CompilerOutput, CompilerError> {
    if source.matches('{').count() != source.matches('}').count() {
        return Err(CompilerError::Diagnostic(
            "ParserError: Expected '}' but got end of source\n --> Template.sol".into(),
        ));
    }

    let contract_re = Regex::new(r"\b(?:contract|interface|library)\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    let getter_re = Regex::new(r"(\w+)\s+public\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    let function_re = Regex::new(r"\bfunction\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap();

    let starts: Vec<(usize, String)> = contract_re
        .captures_iter(source)
        .map(|c| (c.get(0).unwrap().start(), c[1].to_owned()))
        .collect();

    let mut contracts = BTreeMap::new();
    for (i, (start, name)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map_or(source.len(), |(s, _)| *s);
        let body = &source[*start..end];

        let mut abi = Vec::new();
        for cap in getter_re.captures_iter(body) {
            abi.push(json!({
                "type": "function",
                "name": &cap[2],
                "inputs": [],
                "outputs": [{"name": "", "type": &cap[1], "internalType": &cap[1]}],
                "stateMutability": "view"
            }));
        }
        for cap in function_re.captures_iter(body) {
            abi.push(json!({
                "type": "function",
                "name": &cap[1],
                "inputs": [],
                "outputs": [],
                "stateMutability": "nonpayable"
            }));
        }
        contracts.insert(
            name.clone(),
            CompiledContract {
                abi: serde_json::Value::Array(abi),
                bytecode: "0x6080604052".into(),
            },
        );
    }
    Ok(CompilerOutput { contracts })
}

// ===========================================================================
// Reference data
// ===========================================================================

/// Wraps a [`MemoryStore`] and counts every lookup.
pub struct CountingReference {
    pub inner: Arc<MemoryStore>,
    lookups: AtomicUsize,
}

impl CountingReference {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReferenceData for CountingReference {
    async fn pool_by_token(
        &self,
        chain_id: i64,
        token: &str,
    ) -> anyhow::Result<Option<LiquidityPool>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.pool_by_token(chain_id, token).await
    }

    async fn active_deployment(&self, chain_id: i64) -> anyhow::Result<Option<UniswapDeployment>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.active_deployment(chain_id).await
    }
}

pub fn chain() -> ActiveChain {
    ActiveChain {
        chain_type: ChainType::Ethereum,
        chain_id: CHAIN_ID,
        rpc_url: "http://127.0.0.1:8545".into(),
    }
}

/// Planning context frozen at 2023-11-14T22:13:20Z.
pub fn context() -> PlanContext {
    PlanContext::at(chain(), Utc.timestamp_opt(1_700_000_000, 0).unwrap())
}

pub async fn add_deployment(store: &MemoryStore) {
    store
        .add_deployment(
            CHAIN_ID as i64,
            Some(ROUTER),
            Some("0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f"),
            Some(WETH),
            DeploymentStatus::Confirmed,
        )
        .await;
}

/// Deployment plus two confirmed pools: TOKEN_A/WETH and TOKEN_B/TOKEN_A.
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    add_deployment(&store).await;
    store
        .add_pool(
            CHAIN_ID as i64,
            TOKEN_A,
            TOKEN_A,
            WETH,
            Some(PAIR_A),
            DeploymentStatus::Confirmed,
        )
        .await;
    store
        .add_pool(
            CHAIN_ID as i64,
            TOKEN_B,
            TOKEN_B,
            TOKEN_A,
            Some(PAIR_B),
            DeploymentStatus::Confirmed,
        )
        .await;
    store
}

pub fn checksum(addr: &str) -> String {
    addr.parse::<alloy::primitives::Address>()
        .unwrap()
        .to_checksum(None)
}
