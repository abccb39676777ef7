//! Exact-input swaps through the Uniswap V2 router.

use std::fmt;

use alloy::primitives::{Address, U256};
use tracing::{info, warn};

use txforge_db::models::{AbiValue, MetadataEntry, StepType, TransactionStep};

use super::{Asset, PlanContext, StepSequence, resolve_router};
use crate::abi::{address_arg, router_abi, uint_arg};
use crate::error::{PreconditionError, Result, ValidationError};
use crate::store::ReferenceData;
use crate::validate::{parse_address, parse_amount, parse_slippage};

/// Caller intent for a swap. Amounts are decimal wei strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub from_token: String,
    pub to_token: String,
    pub amount_in: String,
    /// Percentage, e.g. `"0.5"`.
    pub slippage: String,
    pub recipient: String,
    /// Expected output from an off-chain quote.
    pub expected_amount_out: Option<String>,
}

/// What the minimum output was discounted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinOutBasis {
    Quote,
    AmountIn,
}

impl fmt::Display for MinOutBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Quote => "quote",
            Self::AmountIn => "amount_in",
        })
    }
}

/// Shown whenever the minimum output falls back to [`MinOutBasis::AmountIn`].
pub const AMOUNT_IN_BASIS_WARNING: &str = "no expected output supplied; minimum output \
     derived from amount_in, which is meaningless when the two assets use different \
     decimals (e.g. a 6-decimal token against 18-decimal ETH)";

/// A planned swap, ready to be stored as a session.
#[derive(Debug, Clone)]
pub struct SwapPlan {
    pub path: Vec<Address>,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub min_out_basis: MinOutBasis,
    pub deadline: U256,
    pub steps: Vec<TransactionStep>,
    pub metadata: Vec<MetadataEntry>,
}

/// Plan a swap of `amount_in` from one asset to another.
///
/// ```text
/// native -> token : [WETH, to]        swapExactETHForTokens    (value = amount_in)
/// token  -> native: [from, WETH]      swapExactTokensForETH    (approve first)
/// token  -> token : [from, WETH, to]  swapExactTokensForTokens (approve first)
/// ```
pub async fn plan_swap(
    request: &SwapRequest,
    ctx: &PlanContext,
    reference: &dyn ReferenceData,
) -> Result<SwapPlan> {
    let from = Asset::parse("from_token", &request.from_token)?;
    let to = Asset::parse("to_token", &request.to_token)?;
    let amount_in = parse_amount("amount_in", &request.amount_in)?;
    let slippage = parse_slippage(&request.slippage)?;
    let recipient = parse_address("recipient", &request.recipient)?;
    let quote = request
        .expected_amount_out
        .as_deref()
        .map(|q| parse_amount("expected_amount_out", q))
        .transpose()?;

    if from == to {
        return Err(ValidationError::SameToken {
            token: from.display_address(),
        }
        .into());
    }
    ctx.require_ethereum()?;

    let target = resolve_router(ctx, reference).await?;
    let wrapped = target
        .wrapped_native()?
        .ok_or(PreconditionError::MissingWrappedNative {
            chain_id: ctx.chain.chain_id,
        })?;

    let path = build_path(from, to, wrapped)?;

    let (basis_amount, min_out_basis) = match quote {
        Some(q) => (q, MinOutBasis::Quote),
        None => (amount_in, MinOutBasis::AmountIn),
    };
    let min_amount_out = slippage.apply_min(basis_amount);
    if min_out_basis == MinOutBasis::AmountIn {
        warn!(
            from = %from.display_address(),
            to = %to.display_address(),
            "{AMOUNT_IN_BASIS_WARNING}"
        );
    }
    let deadline = ctx.deadline();
    let path_args = address_arg_list(&path);

    let mut seq = StepSequence::new();
    let (function, args, value) = match (from, to) {
        (Asset::Native, _) => (
            "swapExactETHForTokens",
            vec![
                uint_arg(min_amount_out),
                path_args,
                address_arg(recipient),
                uint_arg(deadline),
            ],
            amount_in,
        ),
        (Asset::Token(_), Asset::Native) => (
            "swapExactTokensForETH",
            vec![
                uint_arg(amount_in),
                uint_arg(min_amount_out),
                path_args,
                address_arg(recipient),
                uint_arg(deadline),
            ],
            U256::ZERO,
        ),
        (Asset::Token(_), Asset::Token(_)) => (
            "swapExactTokensForTokens",
            vec![
                uint_arg(amount_in),
                uint_arg(min_amount_out),
                path_args,
                address_arg(recipient),
                uint_arg(deadline),
            ],
            U256::ZERO,
        ),
    };
    seq.approve_asset(from, target.router, "input token")?.call(
        target.router,
        router_abi(),
        function,
        args,
        value,
        "Swap",
        format!(
            "Swap {amount_in} wei of {} for at least {min_amount_out} wei of {}",
            from.display_address(),
            to.display_address()
        ),
        StepType::Swap,
    )?;

    let metadata = vec![
        MetadataEntry::new("action", "swap"),
        MetadataEntry::new("from_token", from.display_address()),
        MetadataEntry::new("to_token", to.display_address()),
        MetadataEntry::new("amount_in", amount_in.to_string()),
        MetadataEntry::new("min_amount_out", min_amount_out.to_string()),
        MetadataEntry::new("min_out_basis", min_out_basis.to_string()),
        MetadataEntry::new("slippage", slippage.to_string()),
        MetadataEntry::new(
            "path",
            path.iter()
                .map(|a| a.to_checksum(None))
                .collect::<Vec<_>>()
                .join(","),
        ),
        MetadataEntry::new("router_address", target.router.to_checksum(None)),
        MetadataEntry::new("protocol_version", target.deployment.version.clone()),
        MetadataEntry::new("deadline", deadline.to_string()),
    ];

    info!(
        chain_id = ctx.chain.chain_id,
        function,
        hops = path.len(),
        steps = seq.len(),
        "swap planned"
    );

    Ok(SwapPlan {
        path,
        amount_in,
        min_amount_out,
        min_out_basis,
        deadline,
        steps: seq.finish(),
        metadata,
    })
}

/// Route every swap through the wrapped native asset, dropping repeated
/// hops (e.g. WETH -> token).
fn build_path(from: Asset, to: Asset, wrapped: Address) -> Result<Vec<Address>, ValidationError> {
    let resolve = |asset: Asset| match asset {
        Asset::Native => wrapped,
        Asset::Token(addr) => addr,
    };
    let mut path = vec![resolve(from)];
    for hop in [wrapped, resolve(to)] {
        if path.last() != Some(&hop) {
            path.push(hop);
        }
    }
    if path.len() < 2 {
        return Err(ValidationError::DegenerateRoute {
            token: wrapped.to_checksum(None),
        });
    }
    Ok(path)
}

fn address_arg_list(path: &[Address]) -> AbiValue {
    AbiValue::Array(path.iter().copied().map(address_arg).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn paths_route_through_wrapped_native() {
        let w = a(0xee);
        assert_eq!(build_path(Asset::Native, Asset::Token(a(1)), w).unwrap(), vec![w, a(1)]);
        assert_eq!(build_path(Asset::Token(a(1)), Asset::Native, w).unwrap(), vec![a(1), w]);
        assert_eq!(
            build_path(Asset::Token(a(1)), Asset::Token(a(2)), w).unwrap(),
            vec![a(1), w, a(2)]
        );
    }

    #[test]
    fn wrapped_endpoint_is_not_repeated() {
        let w = a(0xee);
        assert_eq!(build_path(Asset::Token(w), Asset::Token(a(2)), w).unwrap(), vec![w, a(2)]);
        assert_eq!(build_path(Asset::Token(a(1)), Asset::Token(w), w).unwrap(), vec![a(1), w]);
    }

    #[test]
    fn amount_in_warning_mentions_decimals() {
        assert!(AMOUNT_IN_BASIS_WARNING.contains("amount_in"));
        assert!(AMOUNT_IN_BASIS_WARNING.contains("decimals"));
    }

    #[test]
    fn native_to_wrapped_is_degenerate() {
        let w = a(0xee);
        assert!(matches!(
            build_path(Asset::Native, Asset::Token(w), w),
            Err(ValidationError::DegenerateRoute { .. })
        ));
    }
}
