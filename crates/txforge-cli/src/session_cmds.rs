//! CLI handlers for `txforge session` subcommands, plus the step and
//! session printers the planning commands share.

use anyhow::{Context, Result};
use uuid::Uuid;

use txforge_core::Forge;
use txforge_db::models::{MetadataEntry, SessionStatus, TransactionSession, TransactionStep};

use crate::SessionCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `SessionCommands` variant to the appropriate handler.
pub async fn run_session_command(command: SessionCommands, forge: &Forge) -> Result<()> {
    match command {
        SessionCommands::Show { session_id } => cmd_show(forge, &session_id).await,
        SessionCommands::List { user } => cmd_list(forge, &user).await,
        SessionCommands::Confirm { session_id } => {
            cmd_mark(forge, &session_id, SessionStatus::Confirmed).await
        }
        SessionCommands::Fail { session_id } => {
            cmd_mark(forge, &session_id, SessionStatus::Failed).await
        }
    }
}

pub fn parse_session_id(session_id: &str) -> Result<Uuid> {
    Uuid::parse_str(session_id).with_context(|| format!("invalid session ID: {session_id}"))
}

// -----------------------------------------------------------------------
// txforge session show <id>
// -----------------------------------------------------------------------

async fn cmd_show(forge: &Forge, session_id: &str) -> Result<()> {
    let id = parse_session_id(session_id)?;
    let session = forge.session(id).await?;

    print_session_header(&session, &forge.signing_url_for(&session));
    println!();
    print_metadata(&session.metadata);
    println!();
    print_steps(&session.steps);

    Ok(())
}

// -----------------------------------------------------------------------
// txforge session list --user <user>
// -----------------------------------------------------------------------

async fn cmd_list(forge: &Forge, user: &str) -> Result<()> {
    let sessions = forge.sessions_for_user(user).await?;

    if sessions.is_empty() {
        println!("No sessions found for {user}.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<9}  {:<16}  {:>5}  CREATED",
        "ID", "STATUS", "ACTION", "STEPS"
    );
    for s in &sessions {
        println!(
            "{:<36}  {:<9}  {:<16}  {:>5}  {}",
            s.id,
            s.status,
            s.metadata_value("action").unwrap_or("-"),
            s.steps.len(),
            s.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// txforge session confirm|fail <id>
// -----------------------------------------------------------------------

async fn cmd_mark(forge: &Forge, session_id: &str, status: SessionStatus) -> Result<()> {
    let id = parse_session_id(session_id)?;
    let session = forge
        .mark_session(id, status)
        .await
        .with_context(|| format!("failed to mark session {id} as {status}"))?;
    println!("Session {} is now {}.", session.id, session.status);
    Ok(())
}

// -----------------------------------------------------------------------
// Printers
// -----------------------------------------------------------------------

pub fn print_session_header(session: &TransactionSession, signing_url: &str) {
    println!("  Session ID:   {}", session.id);
    println!("  Status:       {}", session.status);
    println!(
        "  Chain:        {} ({})",
        session.chain_type, session.chain_id
    );
    if let Some(user) = &session.user_id {
        println!("  User:         {user}");
    }
    println!("  Signing URL:  {signing_url}");
}

pub fn print_metadata(metadata: &[MetadataEntry]) {
    if metadata.is_empty() {
        return;
    }
    let key_w = metadata.iter().map(|m| m.key.len()).max().unwrap_or(0);
    println!("Metadata:");
    for entry in metadata {
        println!("  {:<key_w$}  {}", entry.key, entry.value);
    }
}

pub fn print_steps(steps: &[TransactionStep]) {
    println!("Steps:");
    for (i, step) in steps.iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, step.step_type, step.title);
        println!("     {}", step.description);
        if step.to.is_empty() {
            println!("     to:    (contract creation)");
        } else {
            println!("     to:    {}", step.to);
        }
        if step.value != "0" {
            println!("     value: {}", step.value);
        }
        if let Some(function) = &step.function_name {
            let args: Vec<String> = step.args.iter().map(ToString::to_string).collect();
            println!("     call:  {function}({})", args.join(", "));
        } else if !step.args.is_empty() {
            let args: Vec<String> = step.args.iter().map(ToString::to_string).collect();
            println!("     args:  {}", args.join(", "));
        }
        println!("     data:  {}", step.data);
    }
}
