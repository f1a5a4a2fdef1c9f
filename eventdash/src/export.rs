//! eventdash-export - export the rows of one event entity as CSV
//!
//! Writes `event-<id>-<entity>-<date>.csv` into the export directory
//! (`[export] dir` in config.toml, or `$XDG_DATA_HOME/eventdash/exports`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use eventdash_core::export::{entity_table, to_csv, write_export, EXPORT_ENTITIES};
use eventdash_core::store::Direction;
use eventdash_core::{open_store, Config, Query, RowStore};

#[derive(Parser)]
#[command(name = "eventdash-export")]
#[command(about = "Export event data as CSV")]
#[command(version)]
struct Args {
    /// Event ID
    event_id: String,

    /// Entity to export (attendees, tickets, sessions, checkins, meetings,
    /// feedback, exhibitors, sponsors, activity)
    entity: String,

    /// Directory to write into (default: from config)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Print the CSV to stdout instead of writing a file
    #[arg(long)]
    stdout: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let table = entity_table(&args.entity).with_context(|| {
        let names: Vec<&str> = EXPORT_ENTITIES.iter().map(|(name, _)| *name).collect();
        format!("expected one of: {}", names.join(", "))
    })?;

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        eventdash_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let store = open_store(&config.store).context("failed to open store")?;

    let query = Query::for_event(table, &args.event_id).order("created_at", Direction::Asc);
    let rows = store
        .select(&query)
        .with_context(|| format!("failed to read {}", args.entity))?;

    if args.stdout {
        println!("{}", to_csv(&rows).context("failed to render CSV")?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No {} found for event '{}'.", args.entity, args.event_id);
        return Ok(());
    }

    let dir = args
        .out_dir
        .unwrap_or_else(|| config.export.export_dir());
    let path = write_export(
        &dir,
        &args.event_id,
        &args.entity,
        Utc::now().date_naive(),
        &rows,
    )
    .context("failed to write export")?;

    println!("Exported {} {} to {}", rows.len(), args.entity, path.display());
    Ok(())
}
