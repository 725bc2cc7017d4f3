use crate::commands::sessions;
use crate::helper::{COMMANDS, CliHelper};
use crate::runtime::Runtime;
use anyhow::Result;
use colored::{ColoredString, Colorize};
use crm_application::TurnReply;
use crm_core::action::QuickReply;
use crm_core::auth::AuthContext;
use rustyline::Editor;
use rustyline::error::ReadlineError;

/// Interactive chat loop over the conversation controller.
pub async fn run(runtime: &Runtime, auth: &AuthContext, session: Option<String>) -> Result<()> {
    let controller = runtime.controller();
    let mut session_id = session;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::default()));

    println!("{}", "=== CRM Chat ===".bright_magenta().bold());
    println!(
        "{}",
        format!("Workspace '{}' as {} ({}). Type '/help' for commands or 'quit' to exit.", auth.workspace_id, auth.user_id, auth.role)
            .bright_black()
    );
    if !runtime.has_oracle() {
        println!(
            "{}",
            "No intent oracle configured (set oracle.endpoint or CRM_ORACLE_ENDPOINT); messages will not be understood."
                .yellow()
        );
    }
    println!();

    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "quit" || trimmed == "exit" {
            println!("{}", "Goodbye!".bright_green());
            break;
        }
        let _ = rl.add_history_entry(trimmed);

        match trimmed {
            "/new" => {
                if let Some(previous) = session_id.take() {
                    match controller.close_session(auth, &previous).await {
                        Ok(Some(status)) => {
                            println!("{}", format!("Closed session {previous} ({status:?}).").bright_black());
                        }
                        Ok(None) => {}
                        Err(err) => eprintln!("{}", format!("Error: {err:#}").red()),
                    }
                }
                println!("{}", "Started a new session.".bright_black());
                continue;
            }
            "/session" => {
                let current = session_id.as_deref().unwrap_or("(none yet)");
                println!("{}", format!("Session: {current}").bright_black());
                continue;
            }
            "/sessions" => {
                if let Err(err) = sessions::list(runtime, auth).await {
                    eprintln!("{}", format!("Error: {err:#}").red());
                }
                continue;
            }
            "/help" => {
                println!("{}", format!("Commands: {}", COMMANDS.join(", ")).bright_black());
                continue;
            }
            _ => {}
        }

        match controller.handle_turn(auth, session_id.as_deref(), trimmed).await {
            Ok(turn) => {
                print_turn(&turn);
                if let Some(helper) = rl.helper_mut() {
                    helper.set_quick_replies(turn.quick_replies.iter().map(|q| q.value.clone()).collect());
                }
                session_id = Some(turn.session_id);
            }
            Err(err) => {
                tracing::error!("Turn failed: {:#}", err);
                eprintln!("{}", format!("Error: {err:#}").red());
            }
        }
    }

    Ok(())
}

fn print_turn(turn: &TurnReply) {
    let text = if turn.is_error {
        turn.reply.red()
    } else {
        turn.reply.bright_blue()
    };
    println!("{text}");

    if !turn.missing_fields.is_empty() {
        println!(
            "{}",
            format!("still needed: {}", turn.missing_fields.join(", ")).bright_black()
        );
    }
    if !turn.quick_replies.is_empty() {
        let options: Vec<String> = turn.quick_replies.iter().map(|q| quick_reply(q).to_string()).collect();
        println!("{}", options.join("  "));
    }
    println!();
}

fn quick_reply(option: &QuickReply) -> ColoredString {
    let text = format!("[{} → {}]", option.label, option.value);
    match option.color.as_deref() {
        Some("green") => text.green(),
        Some("red") => text.red(),
        Some("yellow") => text.yellow(),
        _ => text.bright_yellow(),
    }
}
