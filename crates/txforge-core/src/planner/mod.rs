//! DeFi operation planning: swaps and Uniswap V2 liquidity.
//!
//! Planners read pools and deployments through [`ReferenceData`] and
//! produce ordered steps; they never write anything.

pub mod liquidity;
pub mod steps;
pub mod swap;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};

use txforge_db::models::{ChainType, UniswapDeployment};

use crate::error::{PreconditionError, Result, ValidationError};
use crate::store::ReferenceData;
use crate::validate::{chain_id_to_i64, parse_address};

pub use liquidity::{
    AddLiquidityRequest, LiquidityPlan, RemoveLiquidityRequest, plan_add_liquidity,
    plan_remove_liquidity,
};
pub use steps::StepSequence;
pub use swap::{AMOUNT_IN_BASIS_WARNING, MinOutBasis, SwapPlan, SwapRequest, plan_swap};

/// Sentinel address standing in for the chain's native currency.
pub const NATIVE_TOKEN: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// Seconds from planning time until a router call expires.
pub const DEADLINE_WINDOW_SECS: u64 = 600;

/// The chain all planning targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveChain {
    pub chain_type: ChainType,
    pub chain_id: u64,
    pub rpc_url: String,
}

/// Inputs every planner shares besides the request itself.
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub chain: ActiveChain,
    pub now: DateTime<Utc>,
}

impl PlanContext {
    pub fn new(chain: ActiveChain) -> Self {
        Self {
            chain,
            now: Utc::now(),
        }
    }

    pub fn at(chain: ActiveChain, now: DateTime<Utc>) -> Self {
        Self { chain, now }
    }

    /// Unix timestamp after which router calls revert.
    pub fn deadline(&self) -> U256 {
        let now = u64::try_from(self.now.timestamp()).unwrap_or(0);
        U256::from(now.saturating_add(DEADLINE_WINDOW_SECS))
    }

    fn require_ethereum(&self) -> Result<(), ValidationError> {
        if self.chain.chain_type != ChainType::Ethereum {
            return Err(ValidationError::UnsupportedChain {
                chain_type: self.chain.chain_type,
            });
        }
        Ok(())
    }
}

/// One side of a swap: the native currency or an ERC-20.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Native,
    Token(Address),
}

impl Asset {
    /// Parse an address, recognising [`NATIVE_TOKEN`] in any case.
    pub fn parse(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        if value.trim().eq_ignore_ascii_case(NATIVE_TOKEN) {
            return Ok(Self::Native);
        }
        parse_address(field, value).map(Self::Token)
    }

    pub fn display_address(&self) -> String {
        match self {
            Self::Native => NATIVE_TOKEN.to_owned(),
            Self::Token(addr) => addr.to_checksum(None),
        }
    }
}

/// The router half of an active deployment.
#[derive(Debug, Clone)]
pub(crate) struct RouterTarget {
    pub deployment: UniswapDeployment,
    pub router: Address,
}

impl RouterTarget {
    /// Wrapped native address if the deployment has one.
    pub fn wrapped_native(&self) -> Result<Option<Address>, ValidationError> {
        match non_empty(self.deployment.wrapped_native_address.as_deref()) {
            Some(raw) => parse_address("wrapped_native_address", raw).map(Some),
            None => Ok(None),
        }
    }
}

/// Active deployment on the context chain with a populated router.
pub(crate) async fn resolve_router(
    ctx: &PlanContext,
    reference: &dyn ReferenceData,
) -> Result<RouterTarget> {
    let chain_id = ctx.chain.chain_id;
    let deployment = reference
        .active_deployment(chain_id_to_i64(chain_id)?)
        .await?
        .ok_or(PreconditionError::NoActiveDeployment { chain_id })?;
    let raw = non_empty(deployment.router_address.as_deref())
        .ok_or(PreconditionError::MissingRouterAddress { chain_id })?;
    let router = parse_address("router_address", raw)?;
    Ok(RouterTarget { deployment, router })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
