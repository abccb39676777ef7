//! Stateless input validators.
//!
//! Everything here runs before any store or compiler is touched.

use std::fmt;

use alloy::primitives::{Address, U256};

use txforge_db::models::ChainType;

use crate::error::ValidationError;

/// Parse a `0x`-prefixed, 20-byte hex address.
///
/// Any letter case is accepted; the EIP-55 checksum is not verified, so
/// addresses copied from lowercase sources and from block explorers both
/// parse.
pub fn parse_address(field: &'static str, value: &str) -> Result<Address, ValidationError> {
    let invalid = || ValidationError::InvalidAddress {
        field,
        value: value.to_owned(),
    };
    let trimmed = value.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(invalid)?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    hex_part.parse::<Address>().map_err(|_| invalid())
}

/// Parse a chain type name, ignoring surrounding whitespace and case.
pub fn parse_chain_type(value: &str) -> Result<ChainType, ValidationError> {
    Ok(value.trim().to_ascii_lowercase().parse::<ChainType>()?)
}

/// Convert a chain id to the signed representation the store uses.
pub fn chain_id_to_i64(chain_id: u64) -> Result<i64, ValidationError> {
    i64::try_from(chain_id).map_err(|_| ValidationError::ChainIdOutOfRange(chain_id))
}

/// Parse a decimal wei amount that must be strictly positive.
pub fn parse_amount(field: &'static str, value: &str) -> Result<U256, ValidationError> {
    let amount = parse_wei(field, value)?;
    if amount.is_zero() {
        return Err(ValidationError::ZeroAmount { field });
    }
    Ok(amount)
}

/// Parse a decimal wei amount that may be zero (e.g. a minimum-output bound).
pub fn parse_wei(field: &'static str, value: &str) -> Result<U256, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidAmount {
            field,
            value: value.to_owned(),
        });
    }
    U256::from_str_radix(trimmed, 10).map_err(|_| ValidationError::InvalidAmount {
        field,
        value: value.to_owned(),
    })
}

/// A slippage tolerance in parts per million (100% = 1_000_000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Slippage {
    ppm: u32,
}

impl Slippage {
    const SCALE: u32 = 1_000_000;
    const MAX_DECIMALS: usize = 4;

    pub fn from_ppm(ppm: u32) -> Option<Self> {
        (ppm <= Self::SCALE).then_some(Self { ppm })
    }

    pub fn ppm(&self) -> u32 {
        self.ppm
    }

    /// Discount `amount` by this tolerance, rounding down.
    ///
    /// Computed as `q * k + r * k / SCALE` with `amount = q * SCALE + r` so
    /// the intermediate never overflows.
    pub fn apply_min(&self, amount: U256) -> U256 {
        let scale = U256::from(Self::SCALE);
        let keep = U256::from(Self::SCALE - self.ppm);
        let q = amount / scale;
        let r = amount % scale;
        q * keep + r * keep / scale
    }
}

impl fmt::Display for Slippage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.ppm / 10_000;
        let frac = self.ppm % 10_000;
        if frac == 0 {
            write!(f, "{whole}%")
        } else {
            let frac = format!("{frac:04}");
            write!(f, "{whole}.{}%", frac.trim_end_matches('0'))
        }
    }
}

/// Parse a slippage percentage such as `"0.5"` or `"3"`, bounded to
/// `[0, 100]` inclusive.
pub fn parse_slippage(value: &str) -> Result<Slippage, ValidationError> {
    let trimmed = value.trim();
    let invalid = || ValidationError::InvalidSlippage {
        value: value.to_owned(),
    };
    let out_of_range = || ValidationError::SlippageOutOfRange {
        value: value.to_owned(),
    };

    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };
    let well_formed = !(whole.is_empty() && frac.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(invalid());
    }
    if frac.len() > Slippage::MAX_DECIMALS {
        return Err(invalid());
    }

    let whole_value: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| out_of_range())?
    };
    let frac_value: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = Slippage::MAX_DECIMALS);
        padded.parse().map_err(|_| invalid())?
    };

    let ppm = whole_value
        .checked_mul(10_000)
        .and_then(|w| w.checked_add(frac_value))
        .ok_or_else(out_of_range)?;

    if negative && ppm > 0 {
        return Err(out_of_range());
    }
    let ppm = u32::try_from(ppm).map_err(|_| out_of_range())?;
    Slippage::from_ppm(ppm).ok_or_else(out_of_range)
}

/// Reject an empty (or whitespace-only) required string field.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}
