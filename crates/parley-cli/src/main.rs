use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use parley::agent::Agent;
use parley::orders::order_registry;
use parley::providers::configs::OpenAiProviderConfig;
use parley::providers::openai::OpenAiProvider;

mod session;

use session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// OpenAI API key (can also be set via OPENAI_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Completion service host
    #[arg(long, default_value = "https://api.openai.com")]
    host: String,

    /// Model to use
    #[arg(short, long, default_value = "gpt-4o-mini")]
    model: String,

    /// Directory for per-run log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let log_file = init_logging(&cli.log_dir)?;

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .context("API key must be provided via --api-key or OPENAI_API_KEY environment variable")?;

    let config = OpenAiProviderConfig {
        host: cli.host,
        api_key,
        model: cli.model,
        temperature: None,
        max_tokens: None,
    };
    let provider = OpenAiProvider::new(config)?;
    let agent = Agent::new(Box::new(provider), order_registry()?);

    println!("{}", style("parley order support").bold());
    println!(
        "{}",
        style(format!("Recording to {}", log_file.display())).dim()
    );
    println!("{}", style("Type 'exit' to quit.").dim());
    println!();

    Session::new(agent).start().await
}

/// Open a per-run log file and install it as the tracing sink.
fn init_logging(log_dir: &Path) -> Result<PathBuf> {
    let (path, file) = create_log_file(log_dir)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("parley=debug")),
        )
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}

fn create_log_file(log_dir: &Path) -> Result<(PathBuf, fs::File)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let path = log_dir.join(format!(
        "parley-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));
    let file = fs::File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    Ok((path, file))
}
