//! Metric calculators.
//!
//! Each function is pure and independent of the others. Missing or malformed
//! input has already been coerced to zero by the normalizer, and every ratio
//! guards its denominator: an empty collection yields 0, never NaN.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::*;

/// Round half up, matching `Math.round` (also for negative values).
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// `round(part / whole * 100)`, or 0 when `whole` is 0.
pub fn percentage(part: f64, whole: f64) -> i64 {
    if whole <= 0.0 {
        return 0;
    }
    round_half_up(part / whole * 100.0) as i64
}

// ============================================
// Attendance & tickets
// ============================================

pub fn checked_in_count(attendees: &[AttendeeRow]) -> i64 {
    attendees.iter().filter(|a| a.is_checked_in()).count() as i64
}

/// Percentage of registrants that checked in.
pub fn attendance_rate(attendees: &[AttendeeRow]) -> i64 {
    percentage(checked_in_count(attendees) as f64, attendees.len() as f64)
}

/// Σ price × quantity sold.
pub fn revenue(tickets: &[TicketRow]) -> f64 {
    tickets
        .iter()
        .map(|t| t.price * t.quantity_sold as f64)
        .sum()
}

pub fn tickets_sold(tickets: &[TicketRow]) -> i64 {
    tickets.iter().map(|t| t.quantity_sold).sum()
}

pub fn tickets_available(tickets: &[TicketRow]) -> i64 {
    tickets.iter().map(|t| t.quantity_total).sum()
}

/// Sold over available, in `[0, 100]`.
pub fn sell_through(tickets: &[TicketRow]) -> i64 {
    percentage(
        tickets_sold(tickets) as f64,
        tickets_available(tickets) as f64,
    )
    .clamp(0, 100)
}

/// One line of the ticket sales breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketSalesLine {
    pub name: String,
    pub sold: i64,
    pub total: i64,
    pub revenue: f64,
    /// Share of all tickets sold
    pub percentage: i64,
    pub status: TicketStatus,
}

/// Per-ticket sold/revenue with each ticket's share of the sold total.
pub fn ticket_sales_breakdown(tickets: &[TicketRow]) -> Vec<TicketSalesLine> {
    let total_sold = tickets_sold(tickets) as f64;
    tickets
        .iter()
        .map(|t| TicketSalesLine {
            name: t.name.clone(),
            sold: t.quantity_sold,
            total: t.quantity_total,
            revenue: t.price * t.quantity_sold as f64,
            percentage: percentage(t.quantity_sold as f64, total_sold),
            status: TicketStatus::effective(t),
        })
        .collect()
}

// ============================================
// Engagement
// ============================================

/// Check-ins per registrant on a 0-10 scale, one decimal, clamped at 10.
pub fn engagement_score(checkins: &[CheckinRow], registered: usize) -> f64 {
    if registered == 0 {
        return 0.0;
    }
    let session = checkins.iter().filter(|c| c.is_session()).count();
    let b2b = checkins.iter().filter(|c| c.is_b2b()).count();
    let per_attendee = (session + b2b) as f64 / registered as f64;
    (round_half_up(per_attendee * 10.0 * 10.0) / 10.0).min(10.0)
}

// ============================================
// Feedback
// ============================================

/// Net promoter score in `[-100, 100]`; 0 without any score.
pub fn nps(feedback: &[FeedbackRow]) -> i64 {
    let scores: Vec<u8> = feedback.iter().filter_map(|f| f.nps_score).collect();
    if scores.is_empty() {
        return 0;
    }
    let promoters = scores.iter().filter(|s| **s >= 9).count() as f64;
    let detractors = scores.iter().filter(|s| **s <= 6).count() as f64;
    round_half_up((promoters - detractors) / scores.len() as f64 * 100.0) as i64
}

pub fn nps_response_count(feedback: &[FeedbackRow]) -> usize {
    feedback.iter().filter(|f| f.nps_score.is_some()).count()
}

/// Average of one category as a percentage of the 5-point scale.
pub fn category_satisfaction(feedback: &[FeedbackRow], category: RatingCategory) -> i64 {
    let values: Vec<f64> = feedback
        .iter()
        .filter_map(|f| f.categories.get(category))
        .map(f64::from)
        .collect();
    if values.is_empty() {
        return 0;
    }
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    round_half_up(avg / 5.0 * 100.0) as i64
}

/// Satisfaction for every category, in [`RatingCategory::ALL`] order.
pub fn category_scores(feedback: &[FeedbackRow]) -> Vec<(RatingCategory, i64)> {
    RatingCategory::ALL
        .iter()
        .map(|c| (*c, category_satisfaction(feedback, *c)))
        .collect()
}

/// Mean overall rating, one decimal; 0 without ratings.
pub fn average_rating(feedback: &[FeedbackRow]) -> f64 {
    let ratings: Vec<f64> = feedback
        .iter()
        .filter_map(|f| f.overall_rating)
        .map(f64::from)
        .collect();
    if ratings.is_empty() {
        return 0.0;
    }
    round_half_up(ratings.iter().sum::<f64>() / ratings.len() as f64 * 10.0) / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingBucket {
    pub stars: u8,
    pub count: i64,
    pub percentage: i64,
}

/// Histogram of overall ratings, 5 stars first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingDistribution {
    pub total: i64,
    pub buckets: [RatingBucket; 5],
}

impl RatingDistribution {
    pub fn bucket(&self, stars: u8) -> Option<&RatingBucket> {
        self.buckets.iter().find(|b| b.stars == stars)
    }
}

pub fn rating_distribution(feedback: &[FeedbackRow]) -> RatingDistribution {
    let mut counts = [0i64; 5];
    for rating in feedback.iter().filter_map(|f| f.overall_rating) {
        if (1..=5).contains(&rating) {
            counts[usize::from(rating - 1)] += 1;
        }
    }
    let total: i64 = counts.iter().sum();
    let bucket = |stars: u8| {
        let count = counts[usize::from(stars - 1)];
        RatingBucket {
            stars,
            count,
            percentage: percentage(count as f64, total as f64),
        }
    };
    RatingDistribution {
        total,
        buckets: [bucket(5), bucket(4), bucket(3), bucket(2), bucket(1)],
    }
}

// ============================================
// Agenda
// ============================================

/// Attendance over capacity; 0 for sessions without a capacity.
pub fn session_fill_rate(session: &SessionRow) -> i64 {
    percentage(session.attendance_count as f64, session.capacity as f64)
}

/// Sessions by attendance, most attended first; ties keep input order.
pub fn top_sessions(sessions: &[SessionRow], limit: usize) -> Vec<&SessionRow> {
    let mut ranked: Vec<&SessionRow> = sessions.iter().collect();
    ranked.sort_by(|a, b| b.attendance_count.cmp(&a.attendance_count));
    ranked.truncate(limit);
    ranked
}

/// Mean of the session ratings that are set, one decimal.
pub fn average_session_rating(sessions: &[SessionRow]) -> f64 {
    let ratings: Vec<f64> = sessions.iter().filter_map(|s| s.rating).collect();
    if ratings.is_empty() {
        return 0.0;
    }
    round_half_up(ratings.iter().sum::<f64>() / ratings.len() as f64 * 10.0) / 10.0
}

// ============================================
// Partners
// ============================================

/// Count of partners per tier, largest first; blank tiers count as "standard".
pub fn tier_breakdown(partners: &[PartnerRow]) -> Vec<(String, i64)> {
    let mut counts: Vec<(String, i64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for partner in partners {
        let tier = if partner.tier.trim().is_empty() {
            "standard".to_string()
        } else {
            partner.tier.trim().to_lowercase()
        };
        match index.get(&tier) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(tier.clone(), counts.len());
                counts.push((tier, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
