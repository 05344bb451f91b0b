//! Session lifecycle commands: new, list, reset.

use clap::Subcommand;

use crate::{model::Session, storage::Storage};

use super::format::format_phase;

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Create a new session. Prints the session ID.
    New,

    /// List sessions.
    List,

    /// Clear everything a session has produced. Requires `--session`.
    Reset,
}

pub(super) fn cmd_new(storage: &Storage) -> Result<(), String> {
    let session = Session::start();

    storage
        .create_session(&session)
        .map_err(|e| format!("failed to create session: {e}"))?;

    println!("{}", session.id);
    Ok(())
}

pub(super) fn cmd_list(storage: &Storage) -> Result<(), String> {
    let sessions = storage
        .list_sessions()
        .map_err(|e| format!("failed to list sessions: {e}"))?;

    if sessions.is_empty() {
        println!("No sessions");
        return Ok(());
    }

    for s in &sessions {
        let phase = format_phase(s.state.phase());
        let input = s.state.input.as_deref().unwrap_or("(no input)");
        println!("{}  [{phase}]  {input}", s.short_id());
    }

    Ok(())
}

pub(super) fn cmd_reset(storage: &Storage, session: &mut Session) -> Result<(), String> {
    session.state.reset();
    storage
        .update_session(session)
        .map_err(|e| format!("failed to update session: {e}"))?;

    eprintln!("Session {} reset", session.short_id());
    Ok(())
}
