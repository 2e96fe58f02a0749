//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod catalog;
mod init;
mod orders;
mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Template storefront: catalog, contact, and order site")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Start the web server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default from config, else 127.0.0.1:3030)
        bind: Option<String>,
    },

    /// Show catalog and order counts
    Status,

    /// Manage the template catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },

    /// Inspect submitted orders
    Orders {
        #[command(subcommand)]
        command: OrderCommands,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// List all templates, active or not
    List,
    /// Import templates from a JSON, TOML, or YAML file (upsert by slug)
    Import {
        /// Catalog file
        file: PathBuf,
    },
    /// Hide a template from the site
    Deactivate {
        /// Template slug
        slug: String,
    },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Show the most recent orders
    List {
        /// Maximum number of orders to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

/// Parse arguments, load settings, and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let (settings, _config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            serve::cmd_serve(&settings, &bind).await
        }
        Commands::Status => status::cmd_status(&settings).await,
        Commands::Catalog { command } => match command {
            CatalogCommands::List => catalog::cmd_catalog_list(&settings).await,
            CatalogCommands::Import { file } => catalog::cmd_catalog_import(&settings, &file).await,
            CatalogCommands::Deactivate { slug } => {
                catalog::cmd_catalog_deactivate(&settings, &slug).await
            }
        },
        Commands::Orders { command } => match command {
            OrderCommands::List { limit } => orders::cmd_orders_list(&settings, limit).await,
        },
    }
}
