use crate::runtime::Runtime;
use anyhow::{Context, Result};
use colored::Colorize;
use crm_core::auth::AuthContext;
use crm_core::session::group_by_title;

/// Prints the operator's sessions, most recent first, grouped by title.
pub async fn list(runtime: &Runtime, auth: &AuthContext) -> Result<()> {
    let sessions = runtime
        .sessions
        .list_sessions(&auth.workspace_id, &auth.user_id)
        .await
        .context("Failed to list sessions")?;

    if sessions.is_empty() {
        println!("{}", "No sessions yet.".bright_black());
        return Ok(());
    }

    for (title, members) in group_by_title(sessions) {
        let heading = if title.is_empty() { "(untitled)" } else { title.as_str() };
        println!("{}", heading.bold());
        for session in members {
            println!(
                "  {}  {}  {}",
                session.id.bright_black(),
                session.last_message_at.format("%Y-%m-%d %H:%M"),
                format!("{:?}", session.state()).to_lowercase()
            );
        }
    }
    Ok(())
}
