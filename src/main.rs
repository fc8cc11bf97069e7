mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use desk_core::config::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "frontdesk",
    about = "Chat-session dashboard for an AI receptionist's message log",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/frontdesk/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the conversation log endpoint
    #[arg(long, global = true)]
    conversations_url: Option<String>,

    /// Override the customer directory endpoint
    #[arg(long, global = true)]
    customers_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,
        /// Bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// List a customer's chat sessions, newest first
    Sessions {
        /// Customer phone id (waId)
        customer: String,
        /// Earliest date to show (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Latest date to show (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Print the view state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one customer's conversation as a transcript
    Conversation {
        /// Customer phone id (waId)
        phone: String,
        /// Only messages from this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Print a markdown session report for a customer
    Report {
        /// Customer phone id (waId)
        customer: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },

    /// Search the customer directory
    Customers {
        /// Name or phone fragment
        #[arg(short, long)]
        query: Option<String>,
        /// List the SMS agent's customers for this account uid instead
        #[arg(long)]
        sms_uid: Option<String>,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "frontdesk=info,warn".into()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config.
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Apply CLI overrides.
    if let Some(url) = &cli.conversations_url {
        config.upstream.conversations_url = url.clone();
    }
    if let Some(url) = &cli.customers_url {
        config.upstream.customers_url = url.clone();
    }

    tracing::debug!(
        "Upstream conversations: {}, customers: {}",
        config.upstream.conversations_url,
        config.upstream.customers_url,
    );

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(h) = host {
                config.server.host = h;
            }
            if let Some(p) = port {
                config.server.port = p;
            }
            desk_server::serve(config).await?;
        }
        Commands::Sessions {
            customer,
            from,
            to,
            json,
        } => {
            commands::sessions(&config, &customer, from.as_deref(), to.as_deref(), json).await?;
        }
        Commands::Conversation { phone, date } => {
            commands::conversation(&config, &phone, date.as_deref()).await?;
        }
        Commands::Report { customer, from, to } => {
            commands::report(&config, &customer, from.as_deref(), to.as_deref()).await?;
        }
        Commands::Customers { query, sms_uid } => {
            commands::customers(&config, query.as_deref(), sms_uid.as_deref()).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, &config)?;
        }
    }

    Ok(())
}

fn handle_config_command(action: Option<ConfigAction>, config: &AppConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            let path = AppConfig::default_path();
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                config.save()?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", AppConfig::default_path().display());
        }
    }
    Ok(())
}
