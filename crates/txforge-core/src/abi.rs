//! ABI coercion, call-data encoding and the fixed Uniswap V2 / ERC-20 ABIs.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use alloy::dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier};
use alloy::json_abi::{Constructor, Function, JsonAbi, Param, StateMutability};
use alloy::primitives::{Address, B256, I256, U256};
use thiserror::Error;

use txforge_db::models::{AbiValue, StepType, TransactionStep};

/// Failures while matching caller arguments to an ABI and encoding them.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("function {name:?} is not in the ABI")]
    UnknownFunction { name: String },

    #[error("function {name} takes {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("argument {path} expects {expected}, got a {got} value")]
    TypeMismatch {
        path: String,
        expected: String,
        got: &'static str,
    },

    #[error("argument {path} value {value:?} is not a valid {expected}: {reason}")]
    InvalidValue {
        path: String,
        expected: String,
        value: String,
        reason: String,
    },

    #[error("invalid ABI: {0}")]
    InvalidAbi(String),

    #[error("invalid creation bytecode: {0}")]
    InvalidBytecode(String),

    #[error("constructor is not payable but {value} wei was attached")]
    NonPayableConstructor { value: U256 },
}

static ERC20_ABI: LazyLock<JsonAbi> = LazyLock::new(|| {
    JsonAbi::parse([
        "function approve(address spender, uint256 amount) returns (bool)",
        "function allowance(address owner, address spender) view returns (uint256)",
        "function balanceOf(address account) view returns (uint256)",
    ])
    .expect("erc20 signatures are valid")
});

static ROUTER_ABI: LazyLock<JsonAbi> = LazyLock::new(|| {
    JsonAbi::parse([
        "function swapExactETHForTokens(uint256 amountOutMin, address[] path, address to, uint256 deadline) payable returns (uint256[] amounts)",
        "function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) returns (uint256[] amounts)",
        "function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) returns (uint256[] amounts)",
        "function addLiquidity(address tokenA, address tokenB, uint256 amountADesired, uint256 amountBDesired, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) returns (uint256 amountA, uint256 amountB, uint256 liquidity)",
        "function addLiquidityETH(address token, uint256 amountTokenDesired, uint256 amountTokenMin, uint256 amountETHMin, address to, uint256 deadline) payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity)",
        "function removeLiquidity(address tokenA, address tokenB, uint256 liquidity, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) returns (uint256 amountA, uint256 amountB)",
        "function removeLiquidityETH(address token, uint256 liquidity, uint256 amountTokenMin, uint256 amountETHMin, address to, uint256 deadline) returns (uint256 amountToken, uint256 amountETH)",
    ])
    .expect("router signatures are valid")
});

/// The ERC-20 subset used for approvals.
pub fn erc20_abi() -> &'static JsonAbi {
    &ERC20_ABI
}

/// The Uniswap V2 router subset used for swaps and liquidity.
pub fn router_abi() -> &'static JsonAbi {
    &ROUTER_ABI
}

/// Parse a stored ABI, either `{"abi": [...]}` or a bare array.
pub fn parse_json_abi(value: &serde_json::Value) -> Result<JsonAbi, AbiError> {
    let entries = value.get("abi").unwrap_or(value);
    serde_json::from_value(entries.clone()).map_err(|e| AbiError::InvalidAbi(e.to_string()))
}

/// Names of every `function` entry in a stored ABI.
pub fn function_names(value: &serde_json::Value) -> BTreeSet<String> {
    let entries = value.get("abi").unwrap_or(value);
    entries
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(|t| t.as_str()) == Some("function"))
                .filter_map(|item| item.get("name").and_then(|n| n.as_str()))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Tag an address for a step's argument list.
pub fn address_arg(address: Address) -> AbiValue {
    AbiValue::Address(address.to_checksum(None))
}

/// Tag a uint256 for a step's argument list.
pub fn uint_arg(value: U256) -> AbiValue {
    AbiValue::Uint(value.to_string())
}

/// A fully encoded contract call.
#[derive(Debug, Clone)]
pub struct EncodedCall {
    pub to: Address,
    /// Selector followed by the encoded arguments.
    pub data: Vec<u8>,
    pub value: U256,
    pub function: Function,
}

impl EncodedCall {
    pub fn data_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.data))
    }

    /// Turn this call into a session step carrying `args` for display.
    pub fn into_step(
        self,
        title: impl Into<String>,
        description: impl Into<String>,
        args: Vec<AbiValue>,
        step_type: StepType,
    ) -> Result<TransactionStep, AbiError> {
        let fragment = serde_json::to_value([&self.function])
            .map_err(|e| AbiError::InvalidAbi(e.to_string()))?;
        Ok(TransactionStep {
            title: title.into(),
            description: description.into(),
            to: self.to.to_checksum(None),
            data: self.data_hex(),
            function_name: Some(self.function.name.clone()),
            args,
            abi: Some(fragment),
            value: self.value.to_string(),
            step_type,
        })
    }
}

/// Encode a call to `function_name` on `to`.
///
/// Overloads are disambiguated by argument count.
pub fn encode_call(
    to: Address,
    function_name: &str,
    args: &[AbiValue],
    abi: &JsonAbi,
    value: U256,
) -> Result<EncodedCall, AbiError> {
    let overloads = abi
        .function(function_name)
        .ok_or_else(|| AbiError::UnknownFunction {
            name: function_name.to_owned(),
        })?;
    let function = overloads
        .iter()
        .find(|f| f.inputs.len() == args.len())
        .ok_or_else(|| AbiError::ArityMismatch {
            name: function_name.to_owned(),
            expected: overloads.first().map_or(0, |f| f.inputs.len()),
            got: args.len(),
        })?;

    let values = coerce_params(&function.inputs, args)?;
    let data = function
        .abi_encode_input(&values)
        .map_err(|e| AbiError::InvalidAbi(e.to_string()))?;
    Ok(EncodedCall {
        to,
        data,
        value,
        function: function.clone(),
    })
}

fn coerce_params(inputs: &[Param], args: &[AbiValue]) -> Result<Vec<DynSolValue>, AbiError> {
    let mut values = Vec::with_capacity(args.len());
    for (i, (param, arg)) in inputs.iter().zip(args).enumerate() {
        let ty = param
            .resolve()
            .map_err(|e| AbiError::InvalidAbi(format!("{}: {e}", param.ty)))?;
        let path = if param.name.is_empty() {
            format!("#{i}")
        } else {
            param.name.clone()
        };
        values.push(coerce(arg, &ty, &path)?);
    }
    Ok(values)
}

/// A contract-creation payload.
#[derive(Debug, Clone)]
pub struct EncodedDeploy {
    /// Creation bytecode followed by the encoded constructor arguments.
    pub data: Vec<u8>,
    pub value: U256,
    pub constructor: Option<Constructor>,
}

impl EncodedDeploy {
    pub fn data_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.data))
    }

    /// Turn this payload into a `deploy` step. The step has no `to`.
    pub fn into_step(
        self,
        title: impl Into<String>,
        description: impl Into<String>,
        args: Vec<AbiValue>,
    ) -> Result<TransactionStep, AbiError> {
        let fragment = self
            .constructor
            .as_ref()
            .map(|c| serde_json::to_value([c]))
            .transpose()
            .map_err(|e| AbiError::InvalidAbi(e.to_string()))?;
        Ok(TransactionStep {
            title: title.into(),
            description: description.into(),
            to: String::new(),
            data: self.data_hex(),
            function_name: None,
            args,
            abi: fragment,
            value: self.value.to_string(),
            step_type: StepType::Deploy,
        })
    }
}

/// Append ABI-encoded constructor arguments to hex `bytecode`.
///
/// A contract without a constructor accepts no arguments and no value.
pub fn encode_deploy(
    bytecode: &str,
    abi: &JsonAbi,
    args: &[AbiValue],
    value: U256,
) -> Result<EncodedDeploy, AbiError> {
    let mut data = decode_hex(bytecode).map_err(AbiError::InvalidBytecode)?;
    if data.is_empty() {
        return Err(AbiError::InvalidBytecode(
            "contract has no creation code (abstract or interface?)".into(),
        ));
    }

    let constructor = abi.constructor().cloned();
    let inputs = constructor.as_ref().map_or(&[][..], |c| c.inputs.as_slice());
    if inputs.len() != args.len() {
        return Err(AbiError::ArityMismatch {
            name: "constructor".into(),
            expected: inputs.len(),
            got: args.len(),
        });
    }
    let payable = constructor
        .as_ref()
        .is_some_and(|c| c.state_mutability == StateMutability::Payable);
    if !value.is_zero() && !payable {
        return Err(AbiError::NonPayableConstructor { value });
    }

    if let Some(ctor) = &constructor {
        let values = coerce_params(&ctor.inputs, args)?;
        let encoded = ctor
            .abi_encode_input(&values)
            .map_err(|e| AbiError::InvalidAbi(e.to_string()))?;
        data.extend_from_slice(&encoded);
    }
    Ok(EncodedDeploy {
        data,
        value,
        constructor,
    })
}

/// Convert a tagged argument into a value of the declared Solidity type.
pub fn coerce(value: &AbiValue, ty: &DynSolType, path: &str) -> Result<DynSolValue, AbiError> {
    let mismatch = || AbiError::TypeMismatch {
        path: path.to_owned(),
        expected: ty.sol_type_name().into_owned(),
        got: value.class(),
    };
    let invalid = |raw: &str, reason: String| AbiError::InvalidValue {
        path: path.to_owned(),
        expected: ty.sol_type_name().into_owned(),
        value: raw.to_owned(),
        reason,
    };

    match (ty, value) {
        (DynSolType::Address, AbiValue::Address(raw)) => raw
            .trim()
            .parse::<Address>()
            .map(DynSolValue::Address)
            .map_err(|e| invalid(raw, e.to_string())),

        (DynSolType::Bool, AbiValue::Bool(b)) => Ok(DynSolValue::Bool(*b)),

        (DynSolType::Uint(bits), AbiValue::Uint(raw)) => {
            let n = raw
                .trim()
                .parse::<U256>()
                .map_err(|e| invalid(raw, e.to_string()))?;
            if n.bit_len() > *bits {
                return Err(invalid(raw, format!("does not fit in {bits} bits")));
            }
            Ok(DynSolValue::Uint(n, *bits))
        }

        (DynSolType::Int(bits), AbiValue::Int(raw)) => {
            let n = I256::from_dec_str(raw.trim()).map_err(|e| invalid(raw, e.to_string()))?;
            if *bits < 256 {
                let max = I256::from_raw((U256::from(1u8) << (bits - 1)) - U256::from(1u8));
                let min = -max - I256::ONE;
                if n > max || n < min {
                    return Err(invalid(raw, format!("does not fit in {bits} bits")));
                }
            }
            Ok(DynSolValue::Int(n, *bits))
        }

        (DynSolType::Bytes, AbiValue::Bytes(raw)) => {
            let bytes = decode_hex(raw).map_err(|reason| invalid(raw, reason))?;
            Ok(DynSolValue::Bytes(bytes))
        }

        (DynSolType::FixedBytes(size), AbiValue::Bytes(raw)) => {
            let bytes = decode_hex(raw).map_err(|reason| invalid(raw, reason))?;
            if bytes.len() != *size {
                return Err(invalid(
                    raw,
                    format!("expected {size} bytes, got {}", bytes.len()),
                ));
            }
            Ok(DynSolValue::FixedBytes(
                B256::right_padding_from(&bytes),
                *size,
            ))
        }

        (DynSolType::String, AbiValue::String(s)) => Ok(DynSolValue::String(s.clone())),

        (DynSolType::Array(inner), AbiValue::Array(items)) => {
            let values = coerce_all(items, |_| inner.as_ref(), path)?;
            Ok(DynSolValue::Array(values))
        }

        (DynSolType::FixedArray(inner, len), AbiValue::Array(items)) => {
            if items.len() != *len {
                return Err(invalid(
                    &value.to_string(),
                    format!("expected {len} elements, got {}", items.len()),
                ));
            }
            let values = coerce_all(items, |_| inner.as_ref(), path)?;
            Ok(DynSolValue::FixedArray(values))
        }

        (DynSolType::Tuple(types), AbiValue::Tuple(items)) => {
            if items.len() != types.len() {
                return Err(invalid(
                    &value.to_string(),
                    format!("expected {} components, got {}", types.len(), items.len()),
                ));
            }
            let values = coerce_all(items, |i| &types[i], path)?;
            Ok(DynSolValue::Tuple(values))
        }

        _ => Err(mismatch()),
    }
}

fn coerce_all<'t, F>(items: &[AbiValue], ty_at: F, path: &str) -> Result<Vec<DynSolValue>, AbiError>
where
    F: Fn(usize) -> &'t DynSolType,
{
    items
        .iter()
        .enumerate()
        .map(|(i, item)| coerce(item, ty_at(i), &format!("{path}[{i}]")))
        .collect()
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| e.to_string())
}
