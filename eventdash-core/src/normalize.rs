//! Row normalization
//!
//! Raw rows arrive as loosely shaped JSON objects: columns may be missing,
//! null, stringly typed or spelled differently between tables. This module is
//! the one place that reads them. Numbers coerce the way a `Number(x) || 0`
//! would, strings default to `""`, timestamps that do not parse become `None`.
//! Nothing here fails and nothing is deduplicated or cross-checked.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::types::*;

// ============================================
// Field coercion
// ============================================

/// First non-null value among `keys`.
fn field<'a>(row: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| row.get(*key))
        .find(|value| !value.is_null())
}

/// Coerce any JSON value to a finite number, defaulting to 0.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Parse the timestamp shapes the store hands out.
pub fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn number(row: &Value, keys: &[&str]) -> f64 {
    field(row, keys).map(coerce_number).unwrap_or(0.0)
}

/// Non-negative integer count.
fn count(row: &Value, keys: &[&str]) -> i64 {
    (number(row, keys) as i64).max(0)
}

fn text(row: &Value, keys: &[&str]) -> String {
    match field(row, keys) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn optional_text(row: &Value, keys: &[&str]) -> Option<String> {
    Some(text(row, keys)).filter(|s| !s.is_empty())
}

fn timestamp(row: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    field(row, keys).and_then(coerce_timestamp)
}

fn flag(row: &Value, keys: &[&str]) -> bool {
    match field(row, keys) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.as_str(), "true" | "yes" | "1"),
        Some(other) => coerce_number(other) != 0.0,
        None => false,
    }
}

/// Rating within `[min, max]`, rounded. Out-of-range values count as absent.
fn rating(value: Option<&Value>, min: u8, max: u8) -> Option<u8> {
    let value = value?;
    if matches!(value, Value::String(s) if s.trim().is_empty()) {
        return None;
    }
    let n = coerce_number(value).round();
    if n >= f64::from(min) && n <= f64::from(max) {
        Some(n as u8)
    } else {
        None
    }
}

// ============================================
// Entities
// ============================================

pub fn normalize_event(row: &Value) -> EventRow {
    EventRow {
        id: text(row, &["id"]),
        name: text(row, &["name", "title"]),
        status: text(row, &["status"]),
        starts_at: timestamp(row, &["start_date", "starts_at", "start_time"]),
        ends_at: timestamp(row, &["end_date", "ends_at", "end_time"]),
    }
}

pub fn normalize_ticket(row: &Value) -> TicketRow {
    TicketRow {
        id: text(row, &["id"]),
        name: text(row, &["name", "title"]),
        price: number(row, &["price"]),
        quantity_sold: count(row, &["quantity_sold", "sold"]),
        quantity_total: count(row, &["quantity_total", "quantity", "capacity"]),
        status: text(row, &["status"]),
        created_at: timestamp(row, &["created_at"]),
    }
}

pub fn normalize_tickets(rows: &[Value]) -> Vec<TicketRow> {
    rows.iter().map(normalize_ticket).collect()
}

pub fn normalize_attendee(row: &Value) -> AttendeeRow {
    let name = optional_text(row, &["name", "full_name"]).unwrap_or_else(|| {
        let first = text(row, &["first_name"]);
        let last = text(row, &["last_name"]);
        format!("{} {}", first, last).trim().to_string()
    });
    AttendeeRow {
        id: text(row, &["id"]),
        name,
        email: text(row, &["email"]),
        created_at: timestamp(row, &["created_at", "registered_at"]),
        checked_in: flag(row, &["checked_in"]),
        check_in_at: timestamp(row, &["check_in_at", "checked_in_at"]),
    }
}

pub fn normalize_attendees(rows: &[Value]) -> Vec<AttendeeRow> {
    rows.iter().map(normalize_attendee).collect()
}

pub fn normalize_checkin(row: &Value) -> CheckinRow {
    CheckinRow {
        id: text(row, &["id"]),
        attendee_id: text(row, &["attendee_id"]),
        session_id: optional_text(row, &["session_id"]),
        meeting_id: optional_text(row, &["meeting_id", "b2b_meeting_id"]),
        checked_in_at: timestamp(row, &["checked_in_at", "created_at"]),
    }
}

pub fn normalize_checkins(rows: &[Value]) -> Vec<CheckinRow> {
    rows.iter().map(normalize_checkin).collect()
}

/// Sessions with `attendance_count` joined from session check-ins.
pub fn normalize_sessions(rows: &[Value], checkins: &[CheckinRow]) -> Vec<SessionRow> {
    let mut attendance: std::collections::HashMap<&str, i64> = std::collections::HashMap::new();
    for checkin in checkins.iter().filter(|c| c.is_session()) {
        if let Some(session_id) = checkin.session_id.as_deref() {
            *attendance.entry(session_id).or_insert(0) += 1;
        }
    }

    rows.iter()
        .map(|row| {
            let id = text(row, &["id"]);
            let attendance_count = attendance.get(id.as_str()).copied().unwrap_or(0);
            let rating = field(row, &["rating", "average_rating"])
                .map(coerce_number)
                .filter(|r| *r > 0.0);
            SessionRow {
                title: text(row, &["title", "name"]),
                capacity: count(row, &["capacity", "max_attendees"]),
                attendance_count,
                rating,
                starts_at: timestamp(row, &["start_time", "starts_at"]),
                id,
            }
        })
        .collect()
}

pub fn normalize_meeting(row: &Value) -> MeetingRow {
    MeetingRow {
        id: text(row, &["id"]),
        from_attendee_id: text(row, &["from_attendee_id", "requester_id"]),
        to_attendee_id: text(row, &["to_attendee_id", "recipient_id"]),
        status: text(row, &["status"])
            .to_lowercase()
            .parse()
            .unwrap_or(MeetingStatus::Pending),
        starts_at: timestamp(row, &["starts_at", "start_time", "scheduled_at"]),
        ends_at: timestamp(row, &["ends_at", "end_time"]),
        topic: text(row, &["type", "category", "purpose", "topic"]),
    }
}

pub fn normalize_meetings(rows: &[Value]) -> Vec<MeetingRow> {
    rows.iter().map(normalize_meeting).collect()
}

pub fn normalize_feedback_row(row: &Value) -> FeedbackRow {
    let nested = row.get("category_ratings").filter(|v| v.is_object());
    let category = |name: &str| {
        let flat = format!("{}_rating", name);
        let value = nested
            .and_then(|obj| obj.get(name))
            .filter(|v| !v.is_null())
            .or_else(|| row.get(flat.as_str()).filter(|v| !v.is_null()));
        rating(value, 1, 5)
    };

    FeedbackRow {
        overall_rating: rating(field(row, &["overall_rating", "rating"]), 1, 5),
        nps_score: rating(field(row, &["nps_score", "nps"]), 0, 10),
        categories: CategoryRatings {
            venue: category("venue"),
            content: category("content"),
            networking: category("networking"),
            organization: category("organization"),
            value: category("value"),
        },
        comment: optional_text(row, &["comment", "comments", "comment_text"]),
    }
}

pub fn normalize_feedback(rows: &[Value]) -> Vec<FeedbackRow> {
    rows.iter().map(normalize_feedback_row).collect()
}

pub fn normalize_partners(rows: &[Value]) -> Vec<PartnerRow> {
    rows.iter()
        .map(|row| PartnerRow {
            id: text(row, &["id"]),
            name: text(row, &["name", "company_name"]),
            tier: text(row, &["tier", "level", "package"]),
        })
        .collect()
}

pub fn normalize_activity(rows: &[Value]) -> Vec<ActivityRow> {
    rows.iter()
        .map(|row| ActivityRow {
            id: text(row, &["id"]),
            action: text(row, &["action", "type"]),
            description: text(row, &["description", "message"]),
            created_at: timestamp(row, &["created_at"]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(12.5)), 12.5);
        assert_eq!(coerce_number(&json!("42")), 42.0);
        assert_eq!(coerce_number(&json!(" 7.25 ")), 7.25);
        assert_eq!(coerce_number(&json!("abc")), 0.0);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&json!(null)), 0.0);
        assert_eq!(coerce_number(&json!(true)), 1.0);
        assert_eq!(coerce_number(&json!({"a": 1})), 0.0);
        assert_eq!(coerce_number(&json!("NaN")), 0.0);
    }

    #[test]
    fn test_coerce_timestamp_formats() {
        let rfc = coerce_timestamp(&json!("2025-03-10T09:30:00+02:00")).unwrap();
        assert_eq!(rfc.to_rfc3339(), "2025-03-10T07:30:00+00:00");

        let sql = coerce_timestamp(&json!("2025-03-10 09:30:00")).unwrap();
        assert_eq!(sql.to_rfc3339(), "2025-03-10T09:30:00+00:00");

        let date = coerce_timestamp(&json!("2025-03-10")).unwrap();
        assert_eq!(date.to_rfc3339(), "2025-03-10T00:00:00+00:00");

        assert!(coerce_timestamp(&json!("yesterday")).is_none());
        assert!(coerce_timestamp(&json!(1234)).is_none());
    }

    #[test]
    fn test_normalize_ticket_defaults() {
        let ticket = normalize_ticket(&json!({
            "name": null,
            "price": "49.90",
            "quantity_sold": null,
            "quantity": "100",
        }));
        assert_eq!(ticket.name, "");
        assert_eq!(ticket.price, 49.9);
        assert_eq!(ticket.quantity_sold, 0);
        assert_eq!(ticket.quantity_total, 100);
        assert!(ticket.created_at.is_none());

        let empty = normalize_ticket(&json!({}));
        assert_eq!(empty, TicketRow::default());
    }

    #[test]
    fn test_negative_counts_clamp_to_zero() {
        let ticket = normalize_ticket(&json!({"quantity_sold": -4, "quantity_total": 10}));
        assert_eq!(ticket.quantity_sold, 0);
    }

    #[test]
    fn test_normalize_attendee_name_fallback() {
        let attendee = normalize_attendee(&json!({
            "id": "a1",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "checked_in_at": "2025-03-10T10:00:00Z",
        }));
        assert_eq!(attendee.name, "Ada Lovelace");
        assert!(!attendee.checked_in);
        assert!(attendee.is_checked_in());
    }

    #[test]
    fn test_sessions_join_checkins() {
        let checkins = normalize_checkins(&[
            json!({"id": "c1", "attendee_id": "a1", "session_id": "s1"}),
            json!({"id": "c2", "attendee_id": "a2", "session_id": "s1"}),
            json!({"id": "c3", "attendee_id": "a2", "session_id": "s1", "meeting_id": "m1"}),
            json!({"id": "c4", "attendee_id": "a3", "session_id": "missing"}),
        ]);
        let sessions = normalize_sessions(
            &[
                json!({"id": "s1", "title": "Keynote", "capacity": 100, "rating": 4.5}),
                json!({"id": "s2", "title": "Panel", "capacity": "50", "rating": null}),
            ],
            &checkins,
        );
        assert_eq!(sessions[0].attendance_count, 2);
        assert_eq!(sessions[0].rating, Some(4.5));
        assert_eq!(sessions[1].attendance_count, 0);
        assert_eq!(sessions[1].capacity, 50);
        assert_eq!(sessions[1].rating, None);
    }

    #[test]
    fn test_normalize_meeting_topic_and_status() {
        let meeting = normalize_meeting(&json!({
            "id": "m1",
            "status": "CONFIRMED",
            "type": "",
            "purpose": "Investor intro",
        }));
        assert_eq!(meeting.status, MeetingStatus::Confirmed);
        assert_eq!(meeting.topic, "Investor intro");

        let unknown = normalize_meeting(&json!({"status": "whatever"}));
        assert_eq!(unknown.status, MeetingStatus::Pending);
        assert_eq!(unknown.topic, "");
    }

    #[test]
    fn test_normalize_feedback_ratings() {
        let nested = normalize_feedback_row(&json!({
            "overall_rating": 5,
            "nps_score": 0,
            "category_ratings": {"venue": 4, "content": null, "value": 9},
            "networking_rating": "3",
        }));
        assert_eq!(nested.overall_rating, Some(5));
        assert_eq!(nested.nps_score, Some(0));
        assert_eq!(nested.categories.venue, Some(4));
        assert_eq!(nested.categories.content, None);
        assert_eq!(nested.categories.value, None);
        assert_eq!(nested.categories.networking, Some(3));

        let empty = normalize_feedback_row(&json!({"overall_rating": 0, "nps_score": ""}));
        assert_eq!(empty.overall_rating, None);
        assert_eq!(empty.nps_score, None);
    }
}
