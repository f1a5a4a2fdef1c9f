//! Row store layer
//!
//! The dashboard only ever talks to its data through [`RowStore`]: filtered
//! selects that return raw JSON rows, plus keyed insert/update/delete.
//! Two implementations ship here:
//! - [`Database`]: a local SQLite file holding one JSON document table per entity
//! - [`RemoteStore`]: a PostgREST-compatible HTTP endpoint
//!
//! Rows stay untyped at this layer; [`crate::normalize`] turns them into records.

pub mod remote;
pub mod schema;
pub mod sqlite;

pub use remote::RemoteStore;
pub use sqlite::Database;

use chrono::Utc;
use serde_json::{json, Value};

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{Error, Result};

/// Tables the dashboard reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Events,
    Tickets,
    Attendees,
    Sessions,
    Checkins,
    Meetings,
    Feedback,
    Exhibitors,
    Sponsors,
    ActivityLog,
}

impl Table {
    pub const ALL: [Table; 10] = [
        Table::Events,
        Table::Tickets,
        Table::Attendees,
        Table::Sessions,
        Table::Checkins,
        Table::Meetings,
        Table::Feedback,
        Table::Exhibitors,
        Table::Sponsors,
        Table::ActivityLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Events => "events",
            Table::Tickets => "event_tickets",
            Table::Attendees => "event_attendees",
            Table::Sessions => "event_sessions",
            Table::Checkins => "event_checkins",
            Table::Meetings => "event_b2b_meetings",
            Table::Feedback => "event_feedback_responses",
            Table::Exhibitors => "event_exhibitors",
            Table::Sponsors => "event_sponsors",
            Table::ActivityLog => "event_activity_log",
        }
    }

    /// Column that scopes a row to its event.
    pub fn event_column(&self) -> &'static str {
        match self {
            Table::Events => "id",
            _ => "event_id",
        }
    }
}

impl std::str::FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Table::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownTable(s.to_string()))
    }
}

/// Sort direction for [`Query::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// A `select(columns).eq(..).order(..).limit(..)` read.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    /// Empty means every column
    pub columns: Vec<String>,
    pub filters: Vec<(String, Value)>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    /// Start a query; `columns` is `"*"` or a comma-separated list.
    pub fn select(table: Table, columns: &str) -> Self {
        let columns = columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "*")
            .map(str::to_string)
            .collect();
        Self {
            table,
            columns,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Every row of `table` that belongs to `event_id`.
    pub fn for_event(table: Table, event_id: &str) -> Self {
        Self::select(table, "*").eq(table.event_column(), event_id)
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Keep only the selected columns of a row.
    pub fn project(&self, row: Value) -> Value {
        if self.columns.is_empty() {
            return row;
        }
        match row {
            Value::Object(mut map) => {
                let mut projected = serde_json::Map::new();
                for column in &self.columns {
                    if let Some(value) = map.remove(column) {
                        projected.insert(column.clone(), value);
                    }
                }
                Value::Object(projected)
            }
            other => other,
        }
    }
}

/// The thin client every dashboard tab reads through.
pub trait RowStore: Send + Sync {
    /// Run one read.
    fn select(&self, query: &Query) -> Result<Vec<Value>>;

    /// Run a batch of independent reads; results come back in input order.
    ///
    /// Stores that can overlap requests override this.
    fn select_many(&self, queries: &[Query]) -> Vec<Result<Vec<Value>>> {
        queries.iter().map(|q| self.select(q)).collect()
    }

    /// Insert a row, replacing any row with the same id. Returns the stored row.
    fn insert(&self, table: Table, row: Value) -> Result<Value>;

    /// Merge `patch` into the row keyed by id and event. Returns rows affected.
    fn update(&self, table: Table, id: &str, event_id: &str, patch: Value) -> Result<usize>;

    /// Delete the row keyed by id and event. Returns rows affected.
    fn delete(&self, table: Table, id: &str, event_id: &str) -> Result<usize>;
}

/// Open the store selected in configuration.
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn RowStore>> {
    config.validate()?;
    match config.backend {
        StoreBackend::Sqlite => {
            let db = Database::open(&config.database_path())?;
            db.migrate()?;
            Ok(Box::new(db))
        }
        StoreBackend::Remote => Ok(Box::new(RemoteStore::new(config)?)),
    }
}

/// Mark an event as published.
pub fn publish_event(store: &dyn RowStore, event_id: &str) -> Result<()> {
    let patch = json!({
        "status": "published",
        "published_at": Utc::now().to_rfc3339(),
    });
    let affected = store.update(Table::Events, event_id, event_id, patch)?;
    if affected == 0 {
        return Err(Error::EventNotFound(event_id.to_string()));
    }
    tracing::info!(event_id, "Event published");
    Ok(())
}

/// Fields an organizer edits on a ticket type.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketDraft {
    /// Existing ticket to update; a new one is created when None or unknown.
    /// An id owned by another event is rejected.
    pub id: Option<String>,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

/// Create or update a ticket type and record it in the activity log.
///
/// Updates keep `quantity_sold`; new tickets start unsold and active.
/// Fails with a 409 store error when `draft.id` names another event's ticket.
pub fn save_ticket(store: &dyn RowStore, event_id: &str, draft: &TicketDraft) -> Result<String> {
    let fields = json!({
        "name": draft.name,
        "price": draft.price,
        "quantity_total": draft.quantity,
    });

    let updated = match &draft.id {
        Some(id) => {
            let updated = store.update(Table::Tickets, id, event_id, fields.clone())? > 0;
            let owner = Query::select(Table::Tickets, "id")
                .eq("id", id.as_str())
                .limit(1);
            if !updated && !store.select(&owner)?.is_empty() {
                return Err(Error::Store {
                    status: 409,
                    message: format!("ticket {} belongs to another event", id),
                });
            }
            updated
        }
        None => false,
    };

    let (ticket_id, action) = if updated {
        (draft.id.clone().unwrap_or_default(), "ticket_updated")
    } else {
        let mut row = fields;
        row["event_id"] = json!(event_id);
        row["quantity_sold"] = json!(0);
        row["status"] = json!("active");
        if let Some(id) = &draft.id {
            row["id"] = json!(id);
        }
        let stored = store.insert(Table::Tickets, row)?;
        let id = stored
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        (id, "ticket_created")
    };

    log_activity(
        store,
        event_id,
        action,
        &format!("{} ({})", draft.name, ticket_id),
    )?;
    tracing::info!(event_id, ticket_id = %ticket_id, action, "Ticket saved");
    Ok(ticket_id)
}

/// Remove a ticket type from an event.
pub fn delete_ticket(store: &dyn RowStore, event_id: &str, ticket_id: &str) -> Result<()> {
    if store.delete(Table::Tickets, ticket_id, event_id)? == 0 {
        return Err(Error::Store {
            status: 404,
            message: format!("ticket {} not found in event {}", ticket_id, event_id),
        });
    }
    log_activity(store, event_id, "ticket_deleted", ticket_id)?;
    tracing::info!(event_id, ticket_id, "Ticket deleted");
    Ok(())
}

/// Append an entry to the overview activity feed.
pub fn log_activity(store: &dyn RowStore, event_id: &str, action: &str, description: &str) -> Result<()> {
    store.insert(
        Table::ActivityLog,
        json!({
            "event_id": event_id,
            "action": action,
            "description": description,
        }),
    )?;
    Ok(())
}

/// Rows written per table by [`import_document`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub tables: Vec<(Table, usize)>,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

/// Upsert every row of a `{ "<table>": [row, ...], ... }` document.
///
/// Unknown table names fail before anything is written. Events go first so
/// later rows can reference them.
pub fn import_document(store: &dyn RowStore, document: &Value) -> Result<ImportSummary> {
    let object = document.as_object().ok_or_else(|| Error::Store {
        status: 400,
        message: "import document must be an object of table arrays".to_string(),
    })?;

    let mut batches = Vec::with_capacity(object.len());
    for (name, rows) in object {
        let table: Table = name.parse()?;
        let rows = rows.as_array().ok_or_else(|| Error::Store {
            status: 400,
            message: format!("{} must be an array of rows", name),
        })?;
        batches.push((table, rows));
    }
    batches.sort_by_key(|(table, _)| *table != Table::Events);

    let mut summary = ImportSummary::default();
    for (table, rows) in batches {
        for row in rows {
            store.insert(table, row.clone())?;
        }
        tracing::info!(table = table.as_str(), rows = rows.len(), "Imported rows");
        summary.tables.push((table, rows.len()));
    }
    Ok(summary)
}

/// Fetch one event row.
pub fn get_event(store: &dyn RowStore, event_id: &str) -> Result<Value> {
    let rows = store.select(&Query::for_event(Table::Events, event_id).limit(1))?;
    rows.into_iter()
        .next()
        .ok_or_else(|| Error::EventNotFound(event_id.to_string()))
}
