use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod commands;
mod helper;
mod render;

use app::{BootstrapOptions, bootstrap};

#[derive(Parser)]
#[command(name = "polyagent")]
#[command(about = "PolyAgent - chat with crypto market, trade and shopping agents", long_about = None)]
#[command(version)]
struct Cli {
    /// Agent backend base URL (overrides config.toml)
    #[arg(long, global = true, env = "POLYAGENT_BACKEND_URL")]
    backend_url: Option<String>,

    /// Directory holding config.toml and stored conversations
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep conversations in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive chat (default)
    Chat {
        /// Agent to talk to
        #[arg(short, long)]
        agent: Option<String>,
    },
    /// Send one message and print the reply
    Send {
        /// Agent to talk to, defaults to the configured agent
        #[arg(short, long)]
        agent: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        message: String,
    },
    /// Manage stored conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },
    /// List available agents
    Agents,
    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
enum ConversationAction {
    /// List conversations, most recent first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print a conversation by id or list position
    Show {
        reference: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete a conversation by id or list position
    Delete { reference: String },
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("polyagent=warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let ctx = bootstrap(BootstrapOptions {
        backend_url: cli.backend_url,
        data_dir: cli.data_dir,
        ephemeral: cli.ephemeral,
    })
    .await?;

    match cli.command.unwrap_or(Commands::Chat { agent: None }) {
        Commands::Chat { agent } => commands::chat::run(ctx, agent).await?,
        Commands::Send {
            agent,
            json,
            message,
        } => {
            let agent = agent.unwrap_or_else(|| ctx.config.default_agent.clone());
            commands::send::send(ctx, &agent, &message, json).await?
        }
        Commands::Conversations { action } => match action {
            ConversationAction::List { json } => commands::conversations::list(&ctx, json).await?,
            ConversationAction::Show { reference, json } => {
                commands::conversations::show(&ctx, &reference, json).await?
            }
            ConversationAction::Delete { reference } => {
                commands::conversations::delete(&ctx, &reference).await?
            }
        },
        Commands::Agents => commands::agents::agents(&ctx),
        Commands::Config => commands::agents::config(&ctx)?,
    }

    Ok(())
}
