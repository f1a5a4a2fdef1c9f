//! SQLite-backed row store
//!
//! Rows are kept whole as JSON documents. `id`, `event_id` and `created_at`
//! are mirrored into real columns; filters and ordering on any other column
//! go through `json_extract`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde_json::{Map, Value};

use super::{Direction, Query, RowStore, Table};
use crate::error::{Error, Result};

/// Columns stored outside the JSON document.
const KEY_COLUMNS: [&str; 3] = ["id", "event_id", "created_at"];

/// Database handle (single connection)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock();
        super::schema::run_migrations(&conn)
    }

    /// A poisoned lock only means another caller panicked mid-query; the
    /// connection itself is still usable.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count rows of a table for an event.
    pub fn count_rows(&self, table: Table, event_id: &str) -> Result<i64> {
        let conn = self.lock();
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE event_id = ?",
            table.as_str()
        );
        let count = conn.query_row(&sql, [event_id], |r| r.get(0))?;
        Ok(count)
    }

    fn load_document(
        conn: &Connection,
        table: Table,
        id: &str,
        event_id: &str,
    ) -> Result<Option<Map<String, Value>>> {
        let sql = format!(
            "SELECT data FROM {} WHERE id = ?1 AND event_id = ?2",
            table.as_str()
        );
        let data: Option<String> = conn
            .query_row(&sql, params![id, event_id], |r| r.get(0))
            .optional()?;
        match data {
            Some(text) => match serde_json::from_str(&text)? {
                Value::Object(map) => Ok(Some(map)),
                _ => Ok(Some(Map::new())),
            },
            None => Ok(None),
        }
    }
}

/// Bind a JSON scalar the way `json_extract` would return it.
fn sql_param(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::String(s) => Box::new(s.clone()),
        Value::Bool(b) => Box::new(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Box::new(i),
            None => Box::new(n.as_f64().unwrap_or(0.0)),
        },
        other => Box::new(other.to_string()),
    }
}

/// SQL expression for a column, plus its bound JSON path if any.
fn column_expr(column: &str) -> (String, Option<String>) {
    if KEY_COLUMNS.contains(&column) {
        (column.to_string(), None)
    } else {
        ("json_extract(data, ?)".to_string(), Some(format!("$.{}", column)))
    }
}

fn string_field(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl RowStore for Database {
    fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let conn = self.lock();

        let mut sql = format!("SELECT data FROM {} WHERE 1=1", query.table.as_str());
        let mut params: Vec<Box<dyn ToSql>> = vec![];

        for (column, value) in &query.filters {
            let (expr, path) = column_expr(column);
            if let Some(path) = path {
                params.push(Box::new(path));
            }
            if value.is_null() {
                sql.push_str(&format!(" AND {} IS NULL", expr));
            } else {
                sql.push_str(&format!(" AND {} = ?", expr));
                params.push(sql_param(value));
            }
        }

        match &query.order {
            Some((column, direction)) => {
                let (expr, path) = column_expr(column);
                if let Some(path) = path {
                    params.push(Box::new(path));
                }
                let dir = match direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                sql.push_str(&format!(" ORDER BY {} {}, rowid ASC", expr, dir));
            }
            None => sql.push_str(" ORDER BY rowid ASC"),
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        tracing::debug!(table = query.table.as_str(), %sql, "select");

        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let documents = stmt
            .query_map(params_refs.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        documents
            .iter()
            .map(|text| Ok(query.project(serde_json::from_str(text)?)))
            .collect()
    }

    fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let mut row = match row {
            Value::Object(map) => map,
            _ => {
                return Err(Error::Store {
                    status: 400,
                    message: format!("{}: row must be a JSON object", table.as_str()),
                })
            }
        };

        let id = string_field(&row, "id").unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        row.insert("id".to_string(), Value::String(id.clone()));

        let event_id = match table {
            Table::Events => id.clone(),
            _ => string_field(&row, "event_id").ok_or_else(|| Error::Store {
                status: 400,
                message: format!("{}: event_id is required", table.as_str()),
            })?,
        };

        let created_at = string_field(&row, "created_at").unwrap_or_else(|| {
            let now = Utc::now().to_rfc3339();
            row.insert("created_at".to_string(), Value::String(now.clone()));
            now
        });

        let data = Value::Object(row);
        let conn = self.lock();
        let affected = conn.execute(
            &format!(
                r#"
                INSERT INTO {table} (id, event_id, created_at, data)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    created_at = excluded.created_at,
                    data = excluded.data
                WHERE {table}.event_id = excluded.event_id
                "#,
                table = table.as_str()
            ),
            params![id, event_id, created_at, data.to_string()],
        )?;
        if affected == 0 {
            return Err(Error::Store {
                status: 409,
                message: format!(
                    "{}: id {} belongs to another event",
                    table.as_str(),
                    id
                ),
            });
        }
        Ok(data)
    }

    fn update(&self, table: Table, id: &str, event_id: &str, patch: Value) -> Result<usize> {
        let patch = match patch {
            Value::Object(map) => map,
            _ => {
                return Err(Error::Store {
                    status: 400,
                    message: format!("{}: patch must be a JSON object", table.as_str()),
                })
            }
        };

        let conn = self.lock();
        let Some(mut document) = Self::load_document(&conn, table, id, event_id)? else {
            return Ok(0);
        };
        for (key, value) in patch {
            if KEY_COLUMNS.contains(&key.as_str()) {
                continue;
            }
            document.insert(key, value);
        }

        let affected = conn.execute(
            &format!(
                "UPDATE {} SET data = ?1 WHERE id = ?2 AND event_id = ?3",
                table.as_str()
            ),
            params![Value::Object(document).to_string(), id, event_id],
        )?;
        Ok(affected)
    }

    fn delete(&self, table: Table, id: &str, event_id: &str) -> Result<usize> {
        let conn = self.lock();
        let affected = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1 AND event_id = ?2", table.as_str()),
            params![id, event_id],
        )?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_insert_assigns_id_and_created_at() {
        let db = test_db();
        let row = db
            .insert(Table::Tickets, json!({"event_id": "e1", "name": "VIP"}))
            .unwrap();
        assert!(row["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(row["created_at"].as_str().is_some());
        assert_eq!(db.count_rows(Table::Tickets, "e1").unwrap(), 1);
    }

    #[test]
    fn test_insert_requires_event_id() {
        let db = test_db();
        let err = db
            .insert(Table::Tickets, json!({"name": "VIP"}))
            .unwrap_err();
        assert!(matches!(err, Error::Store { status: 400, .. }));
        assert!(db.insert(Table::Tickets, json!([1, 2])).is_err());
    }

    #[test]
    fn test_insert_is_upsert() {
        let db = test_db();
        db.insert(Table::Tickets, json!({"id": "t1", "event_id": "e1", "price": 10}))
            .unwrap();
        db.insert(Table::Tickets, json!({"id": "t1", "event_id": "e1", "price": 20}))
            .unwrap();
        let rows = db.select(&Query::for_event(Table::Tickets, "e1")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["price"], json!(20));
    }

    #[test]
    fn test_upsert_never_moves_rows_between_events() {
        let db = test_db();
        db.insert(
            Table::Tickets,
            json!({"id": "t1", "event_id": "e1", "quantity_sold": 40}),
        )
        .unwrap();

        let err = db
            .insert(Table::Tickets, json!({"id": "t1", "event_id": "e2"}))
            .unwrap_err();
        assert!(matches!(err, Error::Store { status: 409, .. }));

        assert_eq!(db.count_rows(Table::Tickets, "e1").unwrap(), 1);
        assert_eq!(db.count_rows(Table::Tickets, "e2").unwrap(), 0);
        let rows = db.select(&Query::for_event(Table::Tickets, "e1")).unwrap();
        assert_eq!(rows[0]["quantity_sold"], 40);
    }

    #[test]
    fn test_select_filters_order_limit() {
        let db = test_db();
        for (id, event, kind, ts) in [
            ("c1", "e1", "session", "2025-03-01T10:00:00Z"),
            ("c2", "e1", "b2b", "2025-03-01T09:00:00Z"),
            ("c3", "e1", "session", "2025-03-02T08:00:00Z"),
            ("c4", "e2", "session", "2025-03-01T08:00:00Z"),
        ] {
            db.insert(
                Table::Checkins,
                json!({"id": id, "event_id": event, "kind": kind, "checked_in_at": ts}),
            )
            .unwrap();
        }

        let e1 = db.select(&Query::for_event(Table::Checkins, "e1")).unwrap();
        assert_eq!(e1.len(), 3);
        assert_eq!(e1[0]["id"], "c1");

        let sessions = db
            .select(
                &Query::select(Table::Checkins, "id")
                    .eq("event_id", "e1")
                    .eq("kind", "session")
                    .order("checked_in_at", Direction::Desc)
                    .limit(1),
            )
            .unwrap();
        assert_eq!(sessions, vec![json!({"id": "c3"})]);
    }

    #[test]
    fn test_select_on_numbers_and_bools() {
        let db = test_db();
        db.insert(
            Table::Attendees,
            json!({"id": "a1", "event_id": "e1", "checked_in": true, "age": 30}),
        )
        .unwrap();
        db.insert(
            Table::Attendees,
            json!({"id": "a2", "event_id": "e1", "checked_in": false, "age": null}),
        )
        .unwrap();

        let checked = db
            .select(&Query::for_event(Table::Attendees, "e1").eq("checked_in", true))
            .unwrap();
        assert_eq!(checked.len(), 1);
        assert_eq!(checked[0]["id"], "a1");

        let aged = db
            .select(&Query::for_event(Table::Attendees, "e1").eq("age", 30))
            .unwrap();
        assert_eq!(aged.len(), 1);

        let unknown_age = db
            .select(&Query::for_event(Table::Attendees, "e1").eq("age", Value::Null))
            .unwrap();
        assert_eq!(unknown_age.len(), 1);
        assert_eq!(unknown_age[0]["id"], "a2");
    }

    #[test]
    fn test_update_merges_and_keeps_keys() {
        let db = test_db();
        db.insert(
            Table::Tickets,
            json!({"id": "t1", "event_id": "e1", "name": "VIP", "price": 100}),
        )
        .unwrap();

        let affected = db
            .update(
                Table::Tickets,
                "t1",
                "e1",
                json!({"price": 120, "event_id": "hijack"}),
            )
            .unwrap();
        assert_eq!(affected, 1);

        let rows = db.select(&Query::for_event(Table::Tickets, "e1")).unwrap();
        assert_eq!(rows[0]["price"], json!(120));
        assert_eq!(rows[0]["name"], "VIP");
        assert_eq!(rows[0]["event_id"], "e1");

        // Wrong event scope touches nothing
        assert_eq!(
            db.update(Table::Tickets, "t1", "e2", json!({"price": 1}))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_delete_scoped_to_event() {
        let db = test_db();
        db.insert(Table::Sponsors, json!({"id": "s1", "event_id": "e1"}))
            .unwrap();
        assert_eq!(db.delete(Table::Sponsors, "s1", "e2").unwrap(), 0);
        assert_eq!(db.delete(Table::Sponsors, "s1", "e1").unwrap(), 1);
        assert_eq!(db.count_rows(Table::Sponsors, "e1").unwrap(), 0);
    }

    #[test]
    fn test_events_are_their_own_scope() {
        let db = test_db();
        db.insert(Table::Events, json!({"id": "e1", "name": "Expo", "status": "draft"}))
            .unwrap();
        crate::store::publish_event(&db, "e1").unwrap();

        let event = crate::store::get_event(&db, "e1").unwrap();
        assert_eq!(event["status"], "published");
        assert!(event["published_at"].is_string());

        assert!(matches!(
            crate::store::publish_event(&db, "missing"),
            Err(Error::EventNotFound(_))
        ));
    }

    #[test]
    fn test_select_many_keeps_order() {
        let db = test_db();
        db.insert(Table::Tickets, json!({"id": "t1", "event_id": "e1"}))
            .unwrap();
        let results = db.select_many(&[
            Query::for_event(Table::Sessions, "e1"),
            Query::for_event(Table::Tickets, "e1"),
        ]);
        assert_eq!(results[0].as_ref().unwrap().len(), 0);
        assert_eq!(results[1].as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/data.db");
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        assert!(path.exists());
    }
}
