use anyhow::Result;
use clap::Parser;
use gotenberg_client::{ClientOptions, GotenbergClient, StringPresence};
use log::debug;
use std::path::PathBuf;

/// gotenberg-client - Gotenberg service client
///
/// Talks to a Gotenberg document-conversion service, retrying transient
/// failures according to the configured retry policy.
///
/// Examples:
///   gotenberg-client --url http://localhost:3000 health
///   gotenberg-client --config client.json config
#[derive(Parser, Debug)]
#[command(author, version = env!("GOTENBERG_CLIENT_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON client options file (also via GOTENBERG_CONFIG)
    #[arg(
        long = "config",
        short = 'c',
        env = "GOTENBERG_CONFIG",
        value_name = "PATH",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// Service URL, overrides ServiceUrl from the options file (also via GOTENBERG_URL)
    #[arg(long = "url", env = "GOTENBERG_URL", value_name = "URL", global = true)]
    pub url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Check that the service is up
    Health,

    /// Print the resolved client options
    Config,
}

/// Loads options from the file (or defaults) and applies the URL override.
fn resolve_options(config: Option<&PathBuf>, url: Option<&String>) -> Result<ClientOptions> {
    let mut options = match config {
        Some(path) => ClientOptions::load(path)?,
        None => ClientOptions::default(),
    };

    if let Some(url) = url.filter(|url| url.is_present()) {
        debug!("Overriding service URL with {}", url);
        options.service_url = url.trim().to_string();
    }

    options.validate()?;
    Ok(options)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let options = resolve_options(cli.config.as_ref(), cli.url.as_ref())?;

    match cli.command {
        Commands::Health => {
            let client = reqwest::Client::builder()
                .user_agent("gotenberg-client")
                .build()?;
            let client = GotenbergClient::new(client, options);
            let health = client.health().await?;
            println!("{}", health.status);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&options)?);
        }
    }
    Ok(())
}
