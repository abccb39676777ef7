//! CLI handler for `txforge swap`.

use anyhow::Result;

use txforge_core::Forge;
use txforge_core::planner::{AMOUNT_IN_BASIS_WARNING, MinOutBasis, SwapRequest};

use crate::session_cmds::{print_session_header, print_steps};

/// Plan the swap, store it as a session and print the signing link.
pub async fn run_swap(forge: &Forge, request: &SwapRequest, user: Option<String>) -> Result<()> {
    let ticket = forge.swap(request, user).await?;
    let plan = &ticket.plan;

    println!("Swap session created.");
    println!();
    print_session_header(&ticket.session, &ticket.signing_url);
    let path: Vec<String> = plan.path.iter().map(|a| a.to_checksum(None)).collect();
    println!("  Path:         {}", path.join(" -> "));
    println!("  Amount in:    {}", plan.amount_in);
    println!(
        "  Min out:      {} (from {})",
        plan.min_amount_out, plan.min_out_basis
    );
    println!("  Deadline:     {}", plan.deadline);

    if plan.min_out_basis == MinOutBasis::AmountIn {
        println!();
        println!("Warning: {AMOUNT_IN_BASIS_WARNING}.");
        println!("Pass --expected-out with a quoted output amount to avoid this.");
    }

    println!();
    print_steps(&ticket.session.steps);
    Ok(())
}
