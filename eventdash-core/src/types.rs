//! Core domain types for eventdash
//!
//! These are the fixed-shape records produced by [`crate::normalize`] from raw
//! store rows. Every analytics function downstream works on these types only.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | The conference/fair being managed; every other row carries its `event_id` |
//! | **Attendee** | A registration for the event, checked in or not |
//! | **Session** | An agenda slot with a capacity; attendance comes from check-ins |
//! | **Check-in** | A scan of an attendee at a session or at a B2B meeting |
//! | **Meeting** | A B2B meeting requested by one attendee of another |
//! | **Partner** | An exhibitor or sponsor |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Event
// ============================================

/// The event a dashboard is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub id: String,
    pub name: String,
    /// Stored lifecycle status (`draft`, `published`, ...)
    pub status: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

// ============================================
// Tickets
// ============================================

/// A ticket type on sale for the event.
///
/// `quantity_sold <= quantity_total` is assumed, not enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketRow {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity_sold: i64,
    pub quantity_total: i64,
    /// Stored status; see [`TicketStatus::effective`] for the derived one
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Ticket availability as shown on the ticketing tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Draft,
    Paused,
    SoldOut,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Draft => "draft",
            TicketStatus::Paused => "paused",
            TicketStatus::SoldOut => "sold_out",
        }
    }

    /// Status inferred from the row's counters.
    ///
    /// A ticket with a positive capacity that has sold it out is `SoldOut`
    /// whatever the stored status says. The stored field may lag behind.
    pub fn effective(ticket: &TicketRow) -> Self {
        if ticket.quantity_total > 0 && ticket.quantity_sold >= ticket.quantity_total {
            return TicketStatus::SoldOut;
        }
        ticket.status.parse().unwrap_or(TicketStatus::Active)
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" | "on_sale" => Ok(TicketStatus::Active),
            "draft" => Ok(TicketStatus::Draft),
            "paused" | "hidden" => Ok(TicketStatus::Paused),
            "sold_out" | "soldout" => Ok(TicketStatus::SoldOut),
            _ => Err(format!("unknown ticket status: {}", s)),
        }
    }
}

// ============================================
// Attendees & check-ins
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendeeRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub checked_in: bool,
    pub check_in_at: Option<DateTime<Utc>>,
}

impl AttendeeRow {
    /// Either flag counts as presence.
    pub fn is_checked_in(&self) -> bool {
        self.checked_in || self.check_in_at.is_some()
    }

    /// Name to show in rankings, falling back to the email.
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else {
            &self.email
        }
    }
}

/// A check-in scan at a session or a B2B meeting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckinRow {
    pub id: String,
    pub attendee_id: String,
    pub session_id: Option<String>,
    pub meeting_id: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl CheckinRow {
    pub fn is_b2b(&self) -> bool {
        self.meeting_id.is_some()
    }

    pub fn is_session(&self) -> bool {
        !self.is_b2b() && self.session_id.is_some()
    }
}

// ============================================
// Agenda
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub title: String,
    pub capacity: i64,
    /// Number of session check-ins pointing at this session
    pub attendance_count: i64,
    pub rating: Option<f64>,
    pub starts_at: Option<DateTime<Utc>>,
}

// ============================================
// B2B meetings
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Scheduled,
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub const ALL: [MeetingStatus; 5] = [
        MeetingStatus::Scheduled,
        MeetingStatus::Pending,
        MeetingStatus::Confirmed,
        MeetingStatus::Completed,
        MeetingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::Pending => "pending",
            MeetingStatus::Confirmed => "confirmed",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for MeetingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MeetingStatus::Scheduled),
            "pending" | "requested" => Ok(MeetingStatus::Pending),
            "confirmed" | "accepted" => Ok(MeetingStatus::Confirmed),
            "completed" | "done" => Ok(MeetingStatus::Completed),
            "cancelled" | "canceled" | "declined" => Ok(MeetingStatus::Cancelled),
            _ => Err(format!("unknown meeting status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRow {
    pub id: String,
    pub from_attendee_id: String,
    pub to_attendee_id: String,
    pub status: MeetingStatus,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// Free text from `type`, `category`, `purpose` or `topic`
    pub topic: String,
}

/// Best-effort meeting taxonomy derived from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingCategory {
    Partnership,
    Sales,
    Investment,
    Networking,
    Other,
}

impl MeetingCategory {
    /// Precedence order used by the classifier.
    pub const ALL: [MeetingCategory; 5] = [
        MeetingCategory::Partnership,
        MeetingCategory::Sales,
        MeetingCategory::Investment,
        MeetingCategory::Networking,
        MeetingCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingCategory::Partnership => "partnership",
            MeetingCategory::Sales => "sales",
            MeetingCategory::Investment => "investment",
            MeetingCategory::Networking => "networking",
            MeetingCategory::Other => "other",
        }
    }
}

// ============================================
// Feedback
// ============================================

/// Per-category 1-5 ratings; any of them may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRatings {
    pub venue: Option<u8>,
    pub content: Option<u8>,
    pub networking: Option<u8>,
    pub organization: Option<u8>,
    pub value: Option<u8>,
}

/// Named rating field on [`CategoryRatings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingCategory {
    Venue,
    Content,
    Networking,
    Organization,
    Value,
}

impl RatingCategory {
    pub const ALL: [RatingCategory; 5] = [
        RatingCategory::Venue,
        RatingCategory::Content,
        RatingCategory::Networking,
        RatingCategory::Organization,
        RatingCategory::Value,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingCategory::Venue => "venue",
            RatingCategory::Content => "content",
            RatingCategory::Networking => "networking",
            RatingCategory::Organization => "organization",
            RatingCategory::Value => "value",
        }
    }
}

impl CategoryRatings {
    pub fn get(&self, category: RatingCategory) -> Option<u8> {
        match category {
            RatingCategory::Venue => self.venue,
            RatingCategory::Content => self.content,
            RatingCategory::Networking => self.networking,
            RatingCategory::Organization => self.organization,
            RatingCategory::Value => self.value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRow {
    /// 1-5 stars
    pub overall_rating: Option<u8>,
    /// 0-10
    pub nps_score: Option<u8>,
    pub categories: CategoryRatings,
    pub comment: Option<String>,
}

// ============================================
// Exhibitors & sponsors
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartnerRow {
    pub id: String,
    pub name: String,
    /// Sponsorship tier or booth package; empty when not set
    pub tier: String,
}

// ============================================
// Activity log
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRow {
    pub id: String,
    pub action: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_status_effective() {
        let mut ticket = TicketRow {
            quantity_sold: 10,
            quantity_total: 10,
            status: "active".to_string(),
            ..Default::default()
        };
        assert_eq!(TicketStatus::effective(&ticket), TicketStatus::SoldOut);

        ticket.quantity_sold = 9;
        assert_eq!(TicketStatus::effective(&ticket), TicketStatus::Active);

        ticket.status = "draft".to_string();
        assert_eq!(TicketStatus::effective(&ticket), TicketStatus::Draft);

        // Zero capacity never infers sold out
        ticket.quantity_total = 0;
        ticket.status = "garbage".to_string();
        assert_eq!(TicketStatus::effective(&ticket), TicketStatus::Active);
    }

    #[test]
    fn test_meeting_status_parse() {
        assert_eq!("accepted".parse(), Ok(MeetingStatus::Confirmed));
        assert_eq!("canceled".parse(), Ok(MeetingStatus::Cancelled));
        assert!("??".parse::<MeetingStatus>().is_err());
    }

    #[test]
    fn test_attendee_checked_in() {
        let mut attendee = AttendeeRow::default();
        assert!(!attendee.is_checked_in());
        attendee.check_in_at = Some(Utc::now());
        assert!(attendee.is_checked_in());
    }
}
