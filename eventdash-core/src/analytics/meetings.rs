//! B2B meeting analytics.
//!
//! Meeting "types" are free text typed by attendees, so the category breakdown
//! is a keyword heuristic with a fixed precedence. Anything unmatched lands in
//! [`MeetingCategory::Other`].

use std::collections::HashMap;

use serde::Serialize;

use super::metrics::percentage;
use crate::types::*;

/// Shown for meeting participants that do not resolve to an attendee.
pub const UNKNOWN_ATTENDEE: &str = "Unknown attendee";

/// Keywords per category, checked in [`MeetingCategory::ALL`] order.
const CATEGORY_KEYWORDS: &[(MeetingCategory, &[&str])] = &[
    (MeetingCategory::Partnership, &["partner", "collaborat", "alliance"]),
    (
        MeetingCategory::Sales,
        &["sale", "demo", "purchase", "buy", "client", "customer"],
    ),
    (
        MeetingCategory::Investment,
        &["invest", "funding", "fundraising", "capital"],
    ),
    (MeetingCategory::Networking, &["network", "intro", "connect"]),
];

/// Classify meeting text; first matching category wins.
pub fn classify_meeting(topic: &str) -> MeetingCategory {
    let topic = topic.trim().to_lowercase();
    if topic.is_empty() {
        return MeetingCategory::Other;
    }
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| topic.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(MeetingCategory::Other)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryShare {
    pub category: MeetingCategory,
    pub count: i64,
    pub percentage: i64,
}

/// Count per category, every category present, in precedence order.
pub fn meeting_type_breakdown(meetings: &[MeetingRow]) -> Vec<CategoryShare> {
    let mut counts: HashMap<MeetingCategory, i64> = HashMap::new();
    for meeting in meetings {
        *counts.entry(classify_meeting(&meeting.topic)).or_insert(0) += 1;
    }
    let total = meetings.len() as f64;
    MeetingCategory::ALL
        .iter()
        .map(|category| {
            let count = counts.get(category).copied().unwrap_or(0);
            CategoryShare {
                category: *category,
                count,
                percentage: percentage(count as f64, total),
            }
        })
        .collect()
}

/// An attendee ranked by meeting involvement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantRank {
    pub attendee_id: String,
    pub name: String,
    pub meetings: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingStats {
    pub total: i64,
    /// Count per status, in [`MeetingStatus::ALL`] order
    pub by_status: Vec<(MeetingStatus, i64)>,
    /// Confirmed or completed over total
    pub acceptance_rate: i64,
    pub completion_rate: i64,
    pub cancellation_rate: i64,
    pub unique_participants: i64,
    pub categories: Vec<CategoryShare>,
    pub top_participants: Vec<ParticipantRank>,
}

/// Resolve an attendee id to a display name, or the placeholder.
pub fn participant_name(attendees: &HashMap<&str, &AttendeeRow>, attendee_id: &str) -> String {
    attendees
        .get(attendee_id)
        .map(|a| a.display_name())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_ATTENDEE)
        .to_string()
}

pub fn meeting_stats(
    meetings: &[MeetingRow],
    attendees: &[AttendeeRow],
    top_n: usize,
) -> MeetingStats {
    let total = meetings.len() as i64;
    let status_count = |status: MeetingStatus| {
        meetings.iter().filter(|m| m.status == status).count() as i64
    };
    let by_status: Vec<(MeetingStatus, i64)> = MeetingStatus::ALL
        .iter()
        .map(|s| (*s, status_count(*s)))
        .collect();

    let confirmed = status_count(MeetingStatus::Confirmed);
    let completed = status_count(MeetingStatus::Completed);
    let cancelled = status_count(MeetingStatus::Cancelled);

    // Participant counts, first-seen order kept for stable ties
    let mut order: Vec<&str> = Vec::new();
    let mut involvement: HashMap<&str, i64> = HashMap::new();
    for meeting in meetings {
        for id in [&meeting.from_attendee_id, &meeting.to_attendee_id] {
            if id.is_empty() {
                continue;
            }
            let entry = involvement.entry(id.as_str()).or_insert_with(|| {
                order.push(id.as_str());
                0
            });
            *entry += 1;
        }
    }

    let by_id: HashMap<&str, &AttendeeRow> =
        attendees.iter().map(|a| (a.id.as_str(), a)).collect();

    let mut ranked: Vec<ParticipantRank> = order
        .iter()
        .map(|id| ParticipantRank {
            attendee_id: id.to_string(),
            name: participant_name(&by_id, id),
            meetings: involvement[id],
        })
        .collect();
    ranked.sort_by(|a, b| b.meetings.cmp(&a.meetings));
    let unique_participants = ranked.len() as i64;
    ranked.truncate(top_n);

    MeetingStats {
        total,
        by_status,
        acceptance_rate: percentage((confirmed + completed) as f64, total as f64),
        completion_rate: percentage(completed as f64, total as f64),
        cancellation_rate: percentage(cancelled as f64, total as f64),
        unique_participants,
        categories: meeting_type_breakdown(meetings),
        top_participants: ranked,
    }
}
