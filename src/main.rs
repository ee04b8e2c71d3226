mod config;
mod error;
mod server;
mod store;
mod suggest;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use std::io::Read;
use std::sync::Arc;
use suggest::service::SuggestionService;
use suggest::upstream::AzureConfig;
use suggest::SuggestionRequest;

#[derive(Parser)]
#[command(name = "unconf")]
#[command(about = "Unconference session board - submit, upvote and schedule talks, with AI title suggestions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the session board HTTP server
    Serve {
        /// Address to bind (defaults to the config file value)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Ask a running server for a session title and description
    Suggest {
        /// Server base URL (defaults to the config file value)
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        track: Option<String>,
        #[arg(long)]
        presenter: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| config.server.bind_addr.clone());
            serve(&config, &bind_addr)?;
        }
        Commands::Suggest {
            server,
            track,
            presenter,
            title,
            description,
        } => {
            let request = SuggestionRequest {
                track,
                presenter,
                title,
                description,
            };
            let server_url = server.unwrap_or_else(|| config.suggest.server_url.clone());
            suggest(&config, &server_url, request)?;
        }
    }

    Ok(())
}

fn serve(config: &Config, bind_addr: &str) -> Result<()> {
    let suggester = SuggestionService::new(AzureConfig::from_env(), config.suggest.timeout())
        .context("Failed to create completion client")?;
    let state = Arc::new(server::AppState::new(store::seed_sessions(), suggester));

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(server::run_server(bind_addr, state))
}

fn suggest(config: &Config, server_url: &str, request: SuggestionRequest) -> Result<()> {
    let request = if request.is_empty() {
        request_from_stdin()?.unwrap_or(request)
    } else {
        request
    };

    eprintln!("Requesting suggestion from: {}", server_url);

    let result = suggest::requester::request_suggestion(server_url, &request, config.suggest.timeout());

    let json = serde_json::to_string_pretty(&result).context("Failed to serialize suggestion")?;
    println!("{}", json);

    Ok(())
}

/// Read a JSON suggestion request from piped stdin, if there is one
fn request_from_stdin() -> Result<Option<SuggestionRequest>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    read_request(std::io::stdin().lock())
}

/// Parse a JSON suggestion request; empty input means no request
fn read_request(mut reader: impl Read) -> Result<Option<SuggestionRequest>> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .context("Failed to read stdin")?;

    if content.trim().is_empty() {
        return Ok(None);
    }

    let request = serde_json::from_str(&content).context("Failed to parse suggestion request from stdin")?;
    Ok(Some(request))
}
