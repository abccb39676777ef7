//! Approve-then-act step assembly shared by every planner.

use std::collections::HashSet;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, U256};

use txforge_db::models::{AbiValue, StepType, TransactionStep};

use super::Asset;
use crate::abi::{AbiError, address_arg, encode_call, encode_deploy, erc20_abi, uint_arg};

/// Ordered step builder.
///
/// Approvals are unlimited, skipped for the native currency and emitted at
/// most once per `(token, spender)`.
#[derive(Debug, Default)]
pub struct StepSequence {
    steps: Vec<TransactionStep>,
    approved: HashSet<(Address, Address)>,
}

impl StepSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Approve `spender` to pull `token` unless already approved here.
    pub fn approve(
        &mut self,
        token: Address,
        spender: Address,
        label: &str,
    ) -> Result<&mut Self, AbiError> {
        if !self.approved.insert((token, spender)) {
            return Ok(self);
        }
        let args = vec![address_arg(spender), uint_arg(U256::MAX)];
        let step = encode_call(token, "approve", &args, erc20_abi(), U256::ZERO)?.into_step(
            format!("Approve {label}"),
            format!(
                "Allow {} to spend {label} ({})",
                spender.to_checksum(None),
                token.to_checksum(None)
            ),
            args,
            StepType::Approve,
        )?;
        self.steps.push(step);
        Ok(self)
    }

    /// Approve an asset leg; native legs need nothing.
    pub fn approve_asset(
        &mut self,
        asset: Asset,
        spender: Address,
        label: &str,
    ) -> Result<&mut Self, AbiError> {
        match asset {
            Asset::Native => Ok(self),
            Asset::Token(token) => self.approve(token, spender, label),
        }
    }

    /// Append the action itself.
    #[allow(clippy::too_many_arguments)]
    pub fn call(
        &mut self,
        to: Address,
        abi: &JsonAbi,
        function: &str,
        args: Vec<AbiValue>,
        value: U256,
        title: impl Into<String>,
        description: impl Into<String>,
        step_type: StepType,
    ) -> Result<&mut Self, AbiError> {
        let step = encode_call(to, function, &args, abi, value)?.into_step(
            title,
            description,
            args,
            step_type,
        )?;
        self.steps.push(step);
        Ok(self)
    }

    /// Append a contract creation from hex `bytecode`.
    pub fn deploy(
        &mut self,
        bytecode: &str,
        abi: &JsonAbi,
        constructor_args: Vec<AbiValue>,
        value: U256,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<&mut Self, AbiError> {
        let step = encode_deploy(bytecode, abi, &constructor_args, value)?.into_step(
            title,
            description,
            constructor_args,
        )?;
        self.steps.push(step);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn finish(self) -> Vec<TransactionStep> {
        self.steps
    }
}
