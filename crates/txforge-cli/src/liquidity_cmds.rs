//! CLI handlers for `txforge liquidity` subcommands.
//!
//! Implements:
//! - `txforge liquidity add`    -- approve both legs, then addLiquidity(ETH)
//! - `txforge liquidity remove` -- approve the LP token, then removeLiquidity(ETH)

use anyhow::Result;

use txforge_core::planner::{AddLiquidityRequest, LiquidityPlan, RemoveLiquidityRequest};
use txforge_core::{Forge, SessionTicket};

use crate::LiquidityCommands;
use crate::session_cmds::{print_session_header, print_steps};

/// Dispatch a `LiquidityCommands` variant to the appropriate handler.
pub async fn run_liquidity_command(command: LiquidityCommands, forge: &Forge) -> Result<()> {
    match command {
        LiquidityCommands::Add {
            token,
            token_amount,
            paired_amount,
            slippage,
            recipient,
            user,
        } => {
            let request = AddLiquidityRequest {
                token_address: token,
                token_amount,
                paired_amount,
                slippage,
                recipient,
            };
            let ticket = forge.add_liquidity(&request, user).await?;
            print_ticket("Add-liquidity", &ticket);
        }
        LiquidityCommands::Remove {
            token,
            liquidity,
            min_token,
            min_paired,
            recipient,
            user,
        } => {
            let request = RemoveLiquidityRequest {
                token_address: token,
                liquidity,
                min_token_amount: min_token,
                min_paired_amount: min_paired,
                recipient,
            };
            let ticket = forge.remove_liquidity(&request, user).await?;
            print_ticket("Remove-liquidity", &ticket);
        }
    }
    Ok(())
}

fn print_ticket(kind: &str, ticket: &SessionTicket<LiquidityPlan>) {
    let plan = &ticket.plan;

    println!("{kind} session created.");
    println!();
    print_session_header(&ticket.session, &ticket.signing_url);
    println!("  Pool ID:      {}", plan.pool_id);
    println!("  Pair:         {}", plan.pair_address.to_checksum(None));
    let paired = plan.paired_token.to_checksum(None);
    if plan.native_leg {
        println!("  Paired with:  {paired} (native)");
    } else {
        println!("  Paired with:  {paired}");
    }
    println!("  Deadline:     {}", plan.deadline);
    println!();
    print_steps(&ticket.session.steps);
}
