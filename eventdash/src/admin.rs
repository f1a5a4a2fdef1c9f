//! eventdash-admin - write operations on event data
//!
//! Commands:
//! - `import <file.json>`: upsert rows from a `{ "<table>": [rows] }` document
//! - `publish <event-id>`: mark an event as published
//! - `ticket-save` / `ticket-delete`: manage ticket types
//!
//! Every write reports failure on stderr and exits non-zero.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eventdash_core::store::{delete_ticket, import_document, publish_event, save_ticket, TicketDraft};
use eventdash_core::{open_store, Config, RowStore};

#[derive(Parser)]
#[command(name = "eventdash-admin")]
#[command(about = "Import and modify event data")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import rows from a JSON document keyed by table name
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Publish an event
    Publish {
        /// Event ID
        event_id: String,
    },

    /// Create a ticket type, or update it when --id matches one
    TicketSave {
        /// Event ID
        event_id: String,

        /// Ticket name
        #[arg(long)]
        name: String,

        /// Unit price
        #[arg(long)]
        price: f64,

        /// Tickets on sale
        #[arg(long)]
        quantity: i64,

        /// Existing ticket ID
        #[arg(long)]
        id: Option<String>,
    },

    /// Delete a ticket type
    TicketDelete {
        /// Event ID
        event_id: String,

        /// Ticket ID
        ticket_id: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        eventdash_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let store = open_store(&config.store).context("failed to open store")?;

    match args.command {
        Command::Import { file } => cmd_import(store.as_ref(), &file),
        Command::Publish { event_id } => cmd_publish(store.as_ref(), &event_id),
        Command::TicketSave {
            event_id,
            name,
            price,
            quantity,
            id,
        } => {
            if name.trim().is_empty() {
                anyhow::bail!("ticket name must not be empty");
            }
            if price < 0.0 || quantity < 0 {
                anyhow::bail!("price and quantity must not be negative");
            }
            let draft = TicketDraft {
                id,
                name,
                price,
                quantity,
            };
            cmd_ticket_save(store.as_ref(), &event_id, &draft)
        }
        Command::TicketDelete {
            event_id,
            ticket_id,
        } => {
            delete_ticket(store.as_ref(), &event_id, &ticket_id)
                .with_context(|| format!("failed to delete ticket '{}'", ticket_id))?;
            println!("Deleted ticket {}", ticket_id);
            Ok(())
        }
    }
}

fn cmd_import(store: &dyn RowStore, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let document: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", file.display()))?;

    let summary = import_document(store, &document).context("import failed")?;

    for (table, rows) in &summary.tables {
        println!("  {:<26} {}", table.as_str(), rows);
    }
    println!("Imported {} rows", summary.total());
    Ok(())
}

fn cmd_publish(store: &dyn RowStore, event_id: &str) -> Result<()> {
    publish_event(store, event_id)
        .with_context(|| format!("failed to publish event '{}'", event_id))?;
    println!("Published event {}", event_id);
    Ok(())
}

fn cmd_ticket_save(store: &dyn RowStore, event_id: &str, draft: &TicketDraft) -> Result<()> {
    let ticket_id =
        save_ticket(store, event_id, draft).context("failed to save ticket")?;
    println!("Saved ticket {}", ticket_id);
    Ok(())
}
