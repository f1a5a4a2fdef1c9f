//! CSV export
//!
//! Records are flat JSON objects. The header is the key list of the first
//! record in its original order; later records are projected onto it.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::Table;

/// Entities that can be exported, with the table they come from.
pub const EXPORT_ENTITIES: &[(&str, Table)] = &[
    ("attendees", Table::Attendees),
    ("tickets", Table::Tickets),
    ("sessions", Table::Sessions),
    ("checkins", Table::Checkins),
    ("meetings", Table::Meetings),
    ("feedback", Table::Feedback),
    ("exhibitors", Table::Exhibitors),
    ("sponsors", Table::Sponsors),
    ("activity", Table::ActivityLog),
];

/// Table for an export entity name.
pub fn entity_table(entity: &str) -> Result<Table> {
    EXPORT_ENTITIES
        .iter()
        .find(|(name, _)| *name == entity)
        .map(|(_, table)| *table)
        .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
}

/// Default string form of a cell; null and missing cells are empty.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Serialize records to CSV text without a trailing line break.
///
/// Yields an empty string when there are no records or the first record
/// has no keys.
pub fn to_csv(records: &[Value]) -> Result<String> {
    let headers: Vec<&String> = match records.first().and_then(Value::as_object) {
        Some(first) if !first.is_empty() => first.keys().collect(),
        _ => return Ok(String::new()),
    };

    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(vec![]);

    wtr.write_record(&headers)?;
    for record in records {
        wtr.write_record(headers.iter().map(|h| cell(record.get(h.as_str()))))?;
    }

    let bytes = wtr.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    let mut text = String::from_utf8(bytes)
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// `event-<eventId>-<entity>-<YYYY-MM-DD>.csv`
pub fn export_filename(event_id: &str, entity: &str, date: NaiveDate) -> String {
    format!("event-{}-{}-{}.csv", event_id, entity, date.format("%Y-%m-%d"))
}

/// Write `records` as a CSV file into `dir`, returning the file path.
pub fn write_export(
    dir: &Path,
    event_id: &str,
    entity: &str,
    date: NaiveDate,
    records: &[Value],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(event_id, entity, date));
    std::fs::write(&path, to_csv(records)?)?;
    tracing::info!(
        path = %path.display(),
        rows = records.len(),
        entity,
        "CSV export written"
    );
    Ok(path)
}
