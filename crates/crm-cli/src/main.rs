use anyhow::Result;
use clap::{Parser, Subcommand};
use crm_core::auth::{AuthContext, Role};
use std::path::PathBuf;

mod commands;
mod helper;
mod runtime;
mod telemetry;

#[derive(Parser)]
#[command(name = "crm")]
#[command(about = "Conversational CRM console: chat commands, workflow runs and session history", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.config/crm-agent/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace the operator acts in
    #[arg(long, global = true, default_value = "default")]
    workspace: String,

    /// Operator id recorded on sessions and audit rows
    #[arg(long, global = true, default_value = "operator")]
    user: String,

    /// Operator role (owner, admin, member, viewer)
    #[arg(long, global = true, default_value = "admin")]
    role: Role,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Resume an existing session
        #[arg(long)]
        session: Option<String>,
    },
    /// Run or list workflow definitions
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },
    /// List past sessions grouped by title
    Sessions,
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// Run a workflow by id, streaming its progress
    Run { id: String },
    /// List stored workflow definitions
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let thinking = telemetry::init();

    let runtime = runtime::Runtime::load(cli.config.as_deref()).await?;
    let auth = AuthContext::new(cli.workspace, cli.user, cli.role);

    match cli.command {
        Commands::Chat { session } => commands::chat::run(&runtime, &auth, session).await?,
        Commands::Workflow { action } => match action {
            WorkflowAction::Run { id } => commands::workflow::run(&runtime, &auth, &id, thinking).await?,
            WorkflowAction::List => commands::workflow::list(&runtime).await?,
        },
        Commands::Sessions => commands::sessions::list(&runtime, &auth).await?,
    }

    Ok(())
}
