//! leadsync CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use leadsync::{
    commands::{
        cmd_export, cmd_init, cmd_status, cmd_sync, print_init, print_status, print_sync,
        ExportOptions, InitOptions,
    },
    config::Config,
    error::Result,
    gads::ConversionSync,
    leads::LeadStore,
    server,
};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "leadsync")]
#[command(version, about = "Lead capture API, CRM backend and Google Ads conversion sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the lead database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP service
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Show configuration and conversion sync status
    Status,

    /// Upload all pending conversions to Google Ads
    Sync {
        /// Maximum number of leads to upload (defaults to leads.sync_all_limit)
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Export conversions as a Google Ads offline import CSV
    Export {
        /// Only leads with this status
        #[arg(long)]
        status: Option<String>,

        /// Created on or after this date (YYYY-MM-DD)
        #[arg(long)]
        date_from: Option<String>,

        /// Created on or before this date (YYYY-MM-DD)
        #[arg(long)]
        date_to: Option<String>,

        /// Conversion name column value
        #[arg(long)]
        conversion_name: Option<String>,

        /// Currency code column value
        #[arg(long)]
        currency: Option<String>,

        /// Skip leads already synced through the API
        #[arg(long)]
        exclude_synced: bool,

        /// Only won leads
        #[arg(long)]
        only_converted: bool,

        /// Output file or directory (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool, json_logs: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    // Handle completions command (doesn't need config or database)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "leadsync", &mut std::io::stdout());
        return Ok(());
    }

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_config_path);

    if let Commands::Init { force } = cli.command {
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(Config::default_base_dir);
        let report = cmd_init(InitOptions {
            base_dir,
            config_path,
            force,
        })
        .await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_init(&report);
        }
        return Ok(());
    }

    let mut config = load_config(&config_path)?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            server::serve(&config).await?;
        }

        Commands::Status => {
            let store = LeadStore::open(&config).await?;
            let status = cmd_status(&config, &store).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Sync { limit } => {
            let store = LeadStore::open(&config).await?;
            let sync = ConversionSync::from_config(&config.google_ads)?;
            let response = cmd_sync(&config, &store, &sync, limit).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_sync(&response);
            }
        }

        Commands::Export {
            status,
            date_from,
            date_to,
            conversion_name,
            currency,
            exclude_synced,
            only_converted,
            output,
        } => {
            let store = LeadStore::open(&config).await?;
            let options = ExportOptions {
                status,
                date_from,
                date_to,
                conversion_name,
                currency,
                exclude_synced,
                only_converted,
                output,
            };
            let (export, path) = cmd_export(&config, &store, &options).await?;
            if let Some(path) = path {
                if cli.json {
                    println!(
                        "{}",
                        serde_json::json!({ "rows": export.rows, "path": path.display().to_string() })
                    );
                } else {
                    println!("✓ Exported {} conversions to {}", export.rows, path.display());
                }
            }
        }
    }

    Ok(())
}

fn load_config(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        eprintln!(
            "Config file not found: {}\nRun 'leadsync init' first.",
            config_path.display()
        );
        std::process::exit(1);
    }

    Config::load(config_path)
}
