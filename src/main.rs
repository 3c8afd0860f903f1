use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use polyglot::config::{Overrides, Settings};
use polyglot::context::AppContext;
use polyglot::prompt::cliclack::CliclackPrompt;
use polyglot::session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model to use (can also be set via POLYGLOT_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint (can also be set via POLYGLOT_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Keep talking to the agent that answered last instead of re-triaging every message
    #[arg(long)]
    sticky: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load(&Overrides {
        model: cli.model,
        base_url: cli.base_url,
        stick_to_last_agent: cli.sticky,
    })?;

    let context = AppContext::from_settings(settings)?;
    tracing::info!(conversation_id = %context.conversation_id(), "starting session");

    let outcome = Session::new(&context, Box::new(CliclackPrompt::new()))
        .start()
        .await;
    context.close();

    let summary = outcome?;
    tracing::info!(turns = summary.turns, "goodbye");
    Ok(())
}

fn init_tracing() {
    // stdout belongs to the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
