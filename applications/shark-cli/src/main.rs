/// Shark CLI - issue calls against the Shark API from the command line
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use shark_client::{FileStore, SharkClient};
use shark_cli::{commands, config::CliConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shark-cli")]
#[command(about = "Shark API command-line client", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SHARK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for songs
    Search {
        /// Search query
        query: String,
    },
    /// Call an arbitrary API method
    Call {
        /// Method name
        method: String,
        /// Parameters as key=value
        #[arg(short, long = "param")]
        params: Vec<String>,
        /// The method requires a logged-in user
        #[arg(long)]
        auth: bool,
    },
    /// Log in and remember the user
    Login {
        /// Username
        #[arg(short, long)]
        username: String,
        /// Password
        #[arg(short, long, env = "SHARK_PASSWORD")]
        password: String,
    },
    /// Log out and forget the user
    Logout,
    /// Show the persisted session state
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shark_client=info,shark_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref())?;
    config.validate()?;

    tracing::debug!(api_url = %config.api_url, preset = %config.preset, "Loaded configuration");

    let store = FileStore::open(&config.settings_path).with_context(|| {
        format!(
            "Failed to open settings at {}",
            config.settings_path.display()
        )
    })?;
    let client = SharkClient::new(config.client_config()?, Arc::new(store))?;

    match cli.command {
        Commands::Search { query } => {
            let result = client
                .call("getResultsFromSearch", commands::search_params(&query), false)
                .await?;
            print_json(&result)?;
        }
        Commands::Call {
            method,
            params,
            auth,
        } => {
            let params = commands::parse_params(&params)?;
            let result = client.call(&method, params, auth).await?;
            print_json(&result)?;
        }
        Commands::Login { username, password } => {
            let user_id = client.login(&username, &password).await?;
            println!("Logged in as {} (user id {})", username, user_id);
        }
        Commands::Logout => {
            client.logout().await?;
            println!("Logged out");
        }
        Commands::Status => {
            println!("{}", commands::format_status(&client.status()));
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
