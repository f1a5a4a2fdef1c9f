//! Dashboard tab loaders.
//!
//! Each tab issues one fixed batch of reads scoped to an event, normalizes
//! the rows and derives its figures. A failed read is logged and treated as
//! an empty table so the rest of the tab still renders.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::analytics::metrics::{self, TicketSalesLine};
use crate::analytics::{
    bucket_series, build_geometry, meeting_stats, resolve_window, AggregatedStats, ChartGeometry,
    DateRange, DateWindow, EventRows, MeetingStats, TimeSeriesBucket,
};
use crate::config::ChartConfig;
use crate::normalize;
use crate::store::{Direction, Query, RowStore, Table};
use crate::types::*;

/// Entries shown in ranked lists (top sessions, top participants).
const TOP_N: usize = 5;

/// Entries in the recent-activity feed.
const ACTIVITY_LIMIT: usize = 10;

/// Dashboard tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Overview,
    Ticketing,
    Agenda,
    Exhibitors,
    Reporting,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Ticketing => "ticketing",
            Tab::Agenda => "agenda",
            Tab::Exhibitors => "exhibitors",
            Tab::Reporting => "reporting",
        }
    }
}

impl std::str::FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview" => Ok(Tab::Overview),
            "ticketing" | "tickets" => Ok(Tab::Ticketing),
            "agenda" | "schedule" => Ok(Tab::Agenda),
            "exhibitors" | "sponsors" => Ok(Tab::Exhibitors),
            "reporting" | "report" => Ok(Tab::Reporting),
            _ => Err(format!("unknown tab: {}", s)),
        }
    }
}

/// Inputs shared by every loader besides the store and event.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub range: DateRange,
    /// "Today" for trailing windows
    pub today: NaiveDate,
    pub canvas: ChartConfig,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            range: DateRange::All,
            today: Utc::now().date_naive(),
            canvas: ChartConfig::default(),
        }
    }
}

// ============================================
// Fetching
// ============================================

/// Run the batch; failed reads become empty row sets.
fn fetch_all(store: &dyn RowStore, queries: &[Query]) -> Vec<Vec<Value>> {
    store
        .select_many(queries)
        .into_iter()
        .zip(queries)
        .map(|(result, query)| {
            result.unwrap_or_else(|e| {
                tracing::warn!(
                    table = query.table.as_str(),
                    error = %e,
                    "Read failed, using empty rows"
                );
                Vec::new()
            })
        })
        .collect()
}

/// Event row, or a placeholder carrying only the id when it cannot be read.
fn event_from(rows: &[Value], event_id: &str) -> (EventRow, bool) {
    match rows.first() {
        Some(row) => (normalize::normalize_event(row), true),
        None => {
            tracing::error!(event_id, "Event row missing");
            (
                EventRow {
                    id: event_id.to_string(),
                    ..Default::default()
                },
                false,
            )
        }
    }
}

fn event_query(event_id: &str) -> Query {
    Query::for_event(Table::Events, event_id).limit(1)
}

/// Shift the rows out of a fetched batch in query order.
struct Batch(std::vec::IntoIter<Vec<Value>>);

impl Batch {
    fn next(&mut self) -> Vec<Value> {
        self.0.next().unwrap_or_default()
    }
}

fn run(store: &dyn RowStore, queries: &[Query]) -> Batch {
    Batch(fetch_all(store, queries).into_iter())
}

// ============================================
// Overview
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct OverviewSnapshot {
    pub event: EventRow,
    pub event_found: bool,
    pub stats: AggregatedStats,
    pub session_count: i64,
    pub meeting_count: i64,
    pub exhibitor_count: i64,
    pub sponsor_count: i64,
    pub registrations: Vec<TimeSeriesBucket>,
    pub recent_activity: Vec<ActivityRow>,
}

pub fn load_overview(store: &dyn RowStore, event_id: &str, opts: &ViewOptions) -> OverviewSnapshot {
    let mut batch = run(
        store,
        &[
            event_query(event_id),
            Query::for_event(Table::Tickets, event_id),
            Query::for_event(Table::Attendees, event_id),
            Query::for_event(Table::Checkins, event_id),
            Query::for_event(Table::Feedback, event_id),
            Query::select(Table::Sessions, "id").eq("event_id", event_id),
            Query::select(Table::Meetings, "id").eq("event_id", event_id),
            Query::select(Table::Exhibitors, "id").eq("event_id", event_id),
            Query::select(Table::Sponsors, "id").eq("event_id", event_id),
            Query::for_event(Table::ActivityLog, event_id)
                .order("created_at", Direction::Desc)
                .limit(ACTIVITY_LIMIT),
        ],
    );

    let (event, event_found) = event_from(&batch.next(), event_id);
    let tickets = normalize::normalize_tickets(&batch.next());
    let attendees = normalize::normalize_attendees(&batch.next());
    let checkins = normalize::normalize_checkins(&batch.next());
    let feedback = normalize::normalize_feedback(&batch.next());
    let session_count = batch.next().len() as i64;
    let meeting_count = batch.next().len() as i64;
    let exhibitor_count = batch.next().len() as i64;
    let sponsor_count = batch.next().len() as i64;
    let recent_activity = normalize::normalize_activity(&batch.next());

    let stats = AggregatedStats::compute(EventRows {
        tickets: &tickets,
        attendees: &attendees,
        checkins: &checkins,
        feedback: &feedback,
    });
    let registered_at: Vec<_> = attendees.iter().filter_map(|a| a.created_at).collect();
    let window = resolve_window(Some(&event), &registered_at, opts.range, opts.today);

    OverviewSnapshot {
        event,
        event_found,
        stats,
        session_count,
        meeting_count,
        exhibitor_count,
        sponsor_count,
        registrations: bucket_series(&registered_at, window),
        recent_activity,
    }
}

// ============================================
// Ticketing
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct TicketingSnapshot {
    pub event: EventRow,
    pub event_found: bool,
    pub tickets: Vec<TicketSalesLine>,
    pub revenue: f64,
    pub sold: i64,
    pub available: i64,
    pub sell_through: i64,
    pub sold_out: i64,
}

pub fn load_ticketing(store: &dyn RowStore, event_id: &str) -> TicketingSnapshot {
    let mut batch = run(
        store,
        &[
            event_query(event_id),
            Query::for_event(Table::Tickets, event_id).order("created_at", Direction::Asc),
        ],
    );
    let (event, event_found) = event_from(&batch.next(), event_id);
    let tickets = normalize::normalize_tickets(&batch.next());
    let lines = metrics::ticket_sales_breakdown(&tickets);
    let sold_out = lines
        .iter()
        .filter(|l| l.status == TicketStatus::SoldOut)
        .count() as i64;

    TicketingSnapshot {
        event,
        event_found,
        revenue: metrics::revenue(&tickets),
        sold: metrics::tickets_sold(&tickets),
        available: metrics::tickets_available(&tickets),
        sell_through: metrics::sell_through(&tickets),
        sold_out,
        tickets: lines,
    }
}

// ============================================
// Agenda
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct SessionLine {
    pub session: SessionRow,
    pub fill_rate: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgendaSnapshot {
    pub event: EventRow,
    pub event_found: bool,
    /// Sessions in schedule order
    pub sessions: Vec<SessionLine>,
    pub total_attendance: i64,
    pub average_rating: f64,
    /// Ids of the most attended sessions
    pub top_sessions: Vec<String>,
}

pub fn load_agenda(store: &dyn RowStore, event_id: &str) -> AgendaSnapshot {
    let mut batch = run(
        store,
        &[
            event_query(event_id),
            Query::for_event(Table::Sessions, event_id).order("start_time", Direction::Asc),
            Query::for_event(Table::Checkins, event_id),
        ],
    );
    let (event, event_found) = event_from(&batch.next(), event_id);
    let session_rows = batch.next();
    let checkins = normalize::normalize_checkins(&batch.next());
    let sessions = normalize::normalize_sessions(&session_rows, &checkins);

    AgendaSnapshot {
        event,
        event_found,
        total_attendance: sessions.iter().map(|s| s.attendance_count).sum(),
        average_rating: metrics::average_session_rating(&sessions),
        top_sessions: metrics::top_sessions(&sessions, TOP_N)
            .into_iter()
            .map(|s| s.id.clone())
            .collect(),
        sessions: sessions
            .into_iter()
            .map(|session| SessionLine {
                fill_rate: metrics::session_fill_rate(&session),
                session,
            })
            .collect(),
    }
}

// ============================================
// Exhibitors & sponsors
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct ExhibitorsSnapshot {
    pub event: EventRow,
    pub event_found: bool,
    pub exhibitors: Vec<PartnerRow>,
    pub sponsors: Vec<PartnerRow>,
    pub sponsor_tiers: Vec<(String, i64)>,
    pub meetings: MeetingStats,
}

pub fn load_exhibitors(store: &dyn RowStore, event_id: &str) -> ExhibitorsSnapshot {
    let mut batch = run(
        store,
        &[
            event_query(event_id),
            Query::for_event(Table::Exhibitors, event_id).order("name", Direction::Asc),
            Query::for_event(Table::Sponsors, event_id).order("name", Direction::Asc),
            Query::for_event(Table::Meetings, event_id),
            Query::for_event(Table::Attendees, event_id),
        ],
    );
    let (event, event_found) = event_from(&batch.next(), event_id);
    let exhibitors = normalize::normalize_partners(&batch.next());
    let sponsors = normalize::normalize_partners(&batch.next());
    let meetings = normalize::normalize_meetings(&batch.next());
    let attendees = normalize::normalize_attendees(&batch.next());

    ExhibitorsSnapshot {
        event,
        event_found,
        sponsor_tiers: metrics::tier_breakdown(&sponsors),
        exhibitors,
        sponsors,
        meetings: meeting_stats(&meetings, &attendees, TOP_N),
    }
}

// ============================================
// Reporting
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    pub event: EventRow,
    pub event_found: bool,
    pub range: DateRange,
    pub window: DateWindow,
    pub stats: AggregatedStats,
    pub registrations: Vec<TimeSeriesBucket>,
    pub checkins: Vec<TimeSeriesBucket>,
    pub registrations_chart: ChartGeometry,
    pub checkins_chart: ChartGeometry,
    pub meetings: MeetingStats,
    pub session_average_rating: f64,
}

pub fn load_report(store: &dyn RowStore, event_id: &str, opts: &ViewOptions) -> ReportSnapshot {
    let mut batch = run(
        store,
        &[
            event_query(event_id),
            Query::for_event(Table::Tickets, event_id),
            Query::for_event(Table::Attendees, event_id),
            Query::for_event(Table::Checkins, event_id),
            Query::for_event(Table::Feedback, event_id),
            Query::for_event(Table::Meetings, event_id),
            Query::for_event(Table::Sessions, event_id),
        ],
    );

    let (event, event_found) = event_from(&batch.next(), event_id);
    let tickets = normalize::normalize_tickets(&batch.next());
    let attendees = normalize::normalize_attendees(&batch.next());
    let checkins = normalize::normalize_checkins(&batch.next());
    let feedback = normalize::normalize_feedback(&batch.next());
    let meetings = normalize::normalize_meetings(&batch.next());
    let sessions = normalize::normalize_sessions(&batch.next(), &checkins);

    let stats = AggregatedStats::compute(EventRows {
        tickets: &tickets,
        attendees: &attendees,
        checkins: &checkins,
        feedback: &feedback,
    });

    let registered_at: Vec<_> = attendees.iter().filter_map(|a| a.created_at).collect();
    let checked_in_at: Vec<_> = attendees
        .iter()
        .filter_map(|a| a.check_in_at)
        .chain(checkins.iter().filter_map(|c| c.checked_in_at))
        .collect();

    let mut observed = registered_at.clone();
    observed.extend(checked_in_at.iter().copied());
    let window = resolve_window(Some(&event), &observed, opts.range, opts.today);

    let registrations = bucket_series(&registered_at, window);
    let checkin_series = bucket_series(&checked_in_at, window);

    tracing::debug!(
        event_id,
        range = opts.range.as_str(),
        buckets = registrations.len(),
        "Report computed"
    );

    ReportSnapshot {
        event,
        event_found,
        range: opts.range,
        window,
        stats,
        registrations_chart: build_geometry(&registrations, &opts.canvas),
        checkins_chart: build_geometry(&checkin_series, &opts.canvas),
        registrations,
        checkins: checkin_series,
        meetings: meeting_stats(&meetings, &attendees, TOP_N),
        session_average_rating: metrics::average_session_rating(&sessions),
    }
}

/// Snapshot of whichever tab is active.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tab", rename_all = "snake_case")]
pub enum TabSnapshot {
    Overview(OverviewSnapshot),
    Ticketing(TicketingSnapshot),
    Agenda(AgendaSnapshot),
    Exhibitors(ExhibitorsSnapshot),
    Reporting(ReportSnapshot),
}

impl TabSnapshot {
    pub fn event_found(&self) -> bool {
        match self {
            TabSnapshot::Overview(s) => s.event_found,
            TabSnapshot::Ticketing(s) => s.event_found,
            TabSnapshot::Agenda(s) => s.event_found,
            TabSnapshot::Exhibitors(s) => s.event_found,
            TabSnapshot::Reporting(s) => s.event_found,
        }
    }
}

pub fn load_tab(store: &dyn RowStore, event_id: &str, tab: Tab, opts: &ViewOptions) -> TabSnapshot {
    match tab {
        Tab::Overview => TabSnapshot::Overview(load_overview(store, event_id, opts)),
        Tab::Ticketing => TabSnapshot::Ticketing(load_ticketing(store, event_id)),
        Tab::Agenda => TabSnapshot::Agenda(load_agenda(store, event_id)),
        Tab::Exhibitors => TabSnapshot::Exhibitors(load_exhibitors(store, event_id)),
        Tab::Reporting => TabSnapshot::Reporting(load_report(store, event_id, opts)),
    }
}
