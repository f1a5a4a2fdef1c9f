//! Headline KPIs for the overview and reporting tabs.

use serde::Serialize;

use super::metrics::{self, RatingDistribution, TicketSalesLine};
use crate::types::*;

/// Everything the KPI cards show, recomputed from scratch on each call.
///
/// Percentages and scores are 0 both for a true zero and for "no rows". The
/// `*_responses` and `registered` fields carry the sample sizes so callers can
/// tell the two apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedStats {
    pub registered: i64,
    pub checked_in: i64,
    pub attendance_rate: i64,
    pub revenue: f64,
    pub tickets_sold: i64,
    pub tickets_available: i64,
    pub sell_through: i64,
    pub engagement_score: f64,
    pub nps: i64,
    pub nps_responses: i64,
    pub average_rating: f64,
    pub feedback_responses: i64,
    pub ticket_sales: Vec<TicketSalesLine>,
    pub rating_distribution: RatingDistribution,
    pub category_scores: Vec<(RatingCategory, i64)>,
}

/// Borrowed view over the normalized rows of one event.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventRows<'a> {
    pub tickets: &'a [TicketRow],
    pub attendees: &'a [AttendeeRow],
    pub checkins: &'a [CheckinRow],
    pub feedback: &'a [FeedbackRow],
}

impl AggregatedStats {
    pub fn compute(rows: EventRows<'_>) -> Self {
        Self {
            registered: rows.attendees.len() as i64,
            checked_in: metrics::checked_in_count(rows.attendees),
            attendance_rate: metrics::attendance_rate(rows.attendees),
            revenue: metrics::revenue(rows.tickets),
            tickets_sold: metrics::tickets_sold(rows.tickets),
            tickets_available: metrics::tickets_available(rows.tickets),
            sell_through: metrics::sell_through(rows.tickets),
            engagement_score: metrics::engagement_score(rows.checkins, rows.attendees.len()),
            nps: metrics::nps(rows.feedback),
            nps_responses: metrics::nps_response_count(rows.feedback) as i64,
            average_rating: metrics::average_rating(rows.feedback),
            feedback_responses: rows.feedback.len() as i64,
            ticket_sales: metrics::ticket_sales_breakdown(rows.tickets),
            rating_distribution: metrics::rating_distribution(rows.feedback),
            category_scores: metrics::category_scores(rows.feedback),
        }
    }

    /// Format revenue for display (e.g., "12.4K").
    pub fn revenue_display(&self) -> String {
        if self.revenue >= 1_000_000.0 {
            format!("{:.1}M", self.revenue / 1_000_000.0)
        } else if self.revenue >= 1_000.0 {
            format!("{:.1}K", self.revenue / 1_000.0)
        } else {
            format!("{:.2}", self.revenue)
        }
    }
}
