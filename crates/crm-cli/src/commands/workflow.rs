use crate::runtime::Runtime;
use anyhow::{Context, Result};
use colored::Colorize;
use crm_core::auth::AuthContext;
use crm_core::workflow::{RunStatus, WorkflowRepository};
use crm_execution::ThinkingEvent;
use tokio::sync::mpsc::UnboundedReceiver;

/// Runs one workflow, printing its thinking events as they arrive.
pub async fn run(
    runtime: &Runtime,
    auth: &AuthContext,
    workflow_id: &str,
    mut thinking: UnboundedReceiver<ThinkingEvent>,
) -> Result<()> {
    let engine = runtime.workflow_engine();
    let run = engine.run_by_id(&runtime.workflows, auth, workflow_id);
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            biased;
            Some(event) = thinking.recv() => print_event(&event),
            result = &mut run => break result,
        }
    };
    while let Ok(event) = thinking.try_recv() {
        print_event(&event);
    }

    let state = result.with_context(|| format!("Workflow '{workflow_id}' could not run"))?;
    println!();
    match state.status {
        RunStatus::Completed => println!(
            "{}",
            format!("Completed after {} steps ({}).", state.visited.len(), state.visited.join(" -> ")).bright_green()
        ),
        _ => println!(
            "{}",
            format!(
                "Failed at {}: {}",
                state.current_step_id.as_deref().unwrap_or("?"),
                state.error.as_deref().unwrap_or("unknown error")
            )
            .red()
        ),
    }
    println!("{}", format!("run id: {}", state.run_id).bright_black());
    Ok(())
}

/// Lists stored workflow definitions.
pub async fn list(runtime: &Runtime) -> Result<()> {
    let definitions = runtime
        .workflows
        .list()
        .await
        .context("Failed to list workflows")?;

    if definitions.is_empty() {
        println!(
            "{}",
            format!("No workflows in {}", runtime.workflows.dir().display()).bright_black()
        );
        return Ok(());
    }
    for definition in definitions {
        println!(
            "{}  {} ({} steps)",
            definition.id.bold(),
            definition.name,
            definition.steps.len()
        );
        if let Some(description) = &definition.description {
            println!("    {}", description.bright_black());
        }
    }
    Ok(())
}

fn print_event(event: &ThinkingEvent) {
    let step = event.step_id.as_deref().unwrap_or("-");
    let line = format!("[{}] {:<16} {}", step, event.phase, event.message);
    match event.phase.as_str() {
        "error" | "failed" => println!("{}", line.red()),
        "complete" => println!("{}", line.bright_green()),
        "condition_check" => println!("{}", line.yellow()),
        _ => println!("{}", line.bright_black()),
    }
}
