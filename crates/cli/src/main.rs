//! Bakery Orders CLI - local order book, gist sync and server tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply server database migrations
//! bakery migrate
//!
//! # Manage the local order book
//! bakery orders add -n "Rosa" -d 2026-11-02 -t 08:30 -i "Pan de campo:2"
//! bakery orders list
//!
//! # Sync the local order book with a private gist
//! bakery sync configure --token ghp_xxx
//! bakery sync pull
//!
//! # Talk to a running server
//! bakery server list --status pendiente
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `orders` - Local order book
//! - `sync` - Gist synchronization
//! - `server` - Server API client

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use bakery_core::OrderId;
use bakery_local::{FileStore, OrderBook, ServerClient};
use clap::{Parser, Subcommand};

mod commands;

use commands::orders::OrderFields;

#[derive(Parser)]
#[command(name = "bakery")]
#[command(author, version, about = "Bakery Orders CLI")]
struct Cli {
    /// Directory holding the local store
    #[arg(long, global = true, env = "BAKERY_DATA_DIR", default_value = ".bakery")]
    data_dir: PathBuf,

    /// Server root for `server` commands
    #[arg(
        long,
        global = true,
        env = "BAKERY_SERVER_URL",
        default_value = "http://127.0.0.1:3000"
    )]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the local order book
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Synchronize the local order book with a gist
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
    /// Work with a running server
    Server {
        #[command(subcommand)]
        action: ServerAction,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Create an order
    Add(OrderFields),
    /// List orders, earliest delivery first
    List {
        /// Only this status
        #[arg(long)]
        status: Option<String>,
        /// Only this delivery date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Show one order
    Show { id: String },
    /// Change an order
    Edit {
        id: String,
        #[command(flatten)]
        fields: OrderFields,
    },
    /// Move an order to its next status
    Advance { id: String },
    /// Delete an order
    Delete { id: String },
}

#[derive(Subcommand)]
enum SyncAction {
    /// Store a GitHub token after verifying it
    Configure {
        /// Personal access token with the `gist` scope
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: String,
        /// Link an existing gist; without it the next push creates a new one
        #[arg(long)]
        gist_id: Option<String>,
    },
    /// Upload the local order book
    Push,
    /// Download and merge the remote order book
    Pull,
    /// Show sync configuration
    Status,
}

#[derive(Subcommand)]
enum ServerAction {
    /// Check server health
    Health,
    /// List orders (cached copy when offline)
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Move an order to its next status
    Advance { id: String },
    /// Delete an order
    Delete { id: String },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bakery_cli=info,bakery_local=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let now = chrono::Utc::now();

    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Orders { action } => {
            let store = FileStore::open(&cli.data_dir)?;
            let mut book = OrderBook::open(&store)?;
            commands::sync::auto_pull(&mut book, now).await;
            let changed = match action {
                OrdersAction::Add(fields) => {
                    commands::orders::add(&mut book, fields, now)?;
                    true
                }
                OrdersAction::List { status, date } => {
                    commands::orders::list(&book, status.as_deref(), date)?;
                    false
                }
                OrdersAction::Show { id } => {
                    commands::orders::show(&book, &OrderId::new(id))?;
                    false
                }
                OrdersAction::Edit { id, fields } => {
                    commands::orders::edit(&mut book, &OrderId::new(id), fields, now)?;
                    true
                }
                OrdersAction::Advance { id } => {
                    commands::orders::advance(&mut book, &OrderId::new(id), now)?;
                    true
                }
                OrdersAction::Delete { id } => {
                    commands::orders::delete(&mut book, &OrderId::new(id))?;
                    true
                }
            };
            if changed {
                commands::sync::auto_push(&mut book, now).await;
            }
        }
        Commands::Sync { action } => {
            let store = FileStore::open(&cli.data_dir)?;
            let mut book = OrderBook::open(&store)?;
            match action {
                SyncAction::Configure { token, gist_id } => {
                    commands::sync::configure(&mut book, &token, gist_id, now).await?;
                }
                SyncAction::Push => commands::sync::push(&mut book, now).await?,
                SyncAction::Pull => commands::sync::pull(&mut book, now).await?,
                SyncAction::Status => commands::sync::status(&book)?,
            }
        }
        Commands::Server { action } => {
            let client = ServerClient::new(&cli.server_url)?;
            match action {
                ServerAction::Health => commands::server::health(&client).await?,
                ServerAction::List {
                    status,
                    date,
                    page,
                    limit,
                } => {
                    let store = FileStore::open(&cli.data_dir)?;
                    commands::server::list(&client, &store, status.as_deref(), date, page, limit)
                        .await?;
                }
                ServerAction::Advance { id } => {
                    commands::server::advance(&client, &OrderId::new(id)).await?;
                }
                ServerAction::Delete { id } => {
                    commands::server::delete(&client, &OrderId::new(id)).await?;
                }
            }
        }
    }
    Ok(())
}
