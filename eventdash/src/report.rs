//! eventdash-report - print the analytics of one event
//!
//! Loads a dashboard tab for an event and prints its figures as text or JSON.
//! Optionally writes the registration trend chart as an SVG file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use eventdash_core::analytics::{render_svg, AggregatedStats, DateRange, MeetingStats, TimeSeriesBucket};
use eventdash_core::dashboard::{
    load_report, load_tab, AgendaSnapshot, ExhibitorsSnapshot, OverviewSnapshot, ReportSnapshot,
    Tab, TabSnapshot, TicketingSnapshot, ViewOptions,
};
use eventdash_core::{open_store, Config};

#[derive(Parser)]
#[command(name = "eventdash-report")]
#[command(about = "Show dashboard analytics for an event")]
#[command(version)]
struct Args {
    /// Event ID
    event_id: String,

    /// Dashboard tab: overview, ticketing, agenda, exhibitors or reporting
    #[arg(short, long, default_value = "overview")]
    tab: Tab,

    /// Date range for trend series: all, 7d, 30d or 90d
    #[arg(short, long, default_value = "all")]
    range: DateRange,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the registration trend chart to this SVG file
    #[arg(long)]
    svg: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        eventdash_core::logging::init(&config.logging).context("failed to initialize logging")?;

    // Open store
    let store = open_store(&config.store).context("failed to open store")?;

    let opts = ViewOptions {
        range: args.range,
        canvas: config.chart,
        ..Default::default()
    };

    tracing::debug!(
        event_id = %args.event_id,
        tab = args.tab.as_str(),
        range = args.range.as_str(),
        "Loading dashboard tab"
    );
    let snapshot = load_tab(store.as_ref(), &args.event_id, args.tab, &opts);
    if !snapshot.event_found() {
        anyhow::bail!("No event found with id '{}'", args.event_id);
    }

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_text(&snapshot);
    }

    if let Some(path) = args.svg {
        let series = match &snapshot {
            TabSnapshot::Reporting(report) => report.registrations.clone(),
            TabSnapshot::Overview(overview) => overview.registrations.clone(),
            _ => load_report(store.as_ref(), &args.event_id, &opts).registrations,
        };
        let svg = render_svg(&series, &config.chart, "Registrations");
        std::fs::write(&path, svg)
            .with_context(|| format!("failed to write {}", path.display()))?;
        if args.format == OutputFormat::Text {
            println!("\nChart written to {}", path.display());
        }
    }

    Ok(())
}

fn print_text(snapshot: &TabSnapshot) {
    match snapshot {
        TabSnapshot::Overview(s) => print_overview(s),
        TabSnapshot::Ticketing(s) => print_ticketing(s),
        TabSnapshot::Agenda(s) => print_agenda(s),
        TabSnapshot::Exhibitors(s) => print_exhibitors(s),
        TabSnapshot::Reporting(s) => print_report(s),
    }
}

fn print_header(name: &str, id: &str, tab: &str) {
    let title = if name.is_empty() { id } else { name };
    println!("{} ({})", title, tab);
    println!("{}", "=".repeat(title.len() + tab.len() + 3));
    println!();
}

fn print_kpis(stats: &AggregatedStats) {
    println!("Registered:      {}", stats.registered);
    println!(
        "Checked in:      {} ({}%)",
        stats.checked_in, stats.attendance_rate
    );
    println!("Revenue:         {}", stats.revenue_display());
    println!(
        "Tickets sold:    {} of {} ({}%)",
        stats.tickets_sold, stats.tickets_available, stats.sell_through
    );
    println!("Engagement:      {:.1}/10", stats.engagement_score);
    println!(
        "NPS:             {} ({} responses)",
        stats.nps, stats.nps_responses
    );
    println!(
        "Average rating:  {:.1} ({} responses)",
        stats.average_rating, stats.feedback_responses
    );
}

fn print_series(title: &str, series: &[TimeSeriesBucket]) {
    println!("{}:", title);
    let max = series.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    for bucket in series {
        let width = (bucket.count * 30 / max) as usize;
        println!("  {:>7}  {:<30} {}", bucket.label, "#".repeat(width), bucket.count);
    }
}

fn print_meetings(meetings: &MeetingStats) {
    println!("B2B meetings:    {}", meetings.total);
    if meetings.total == 0 {
        return;
    }
    println!(
        "  accepted {}%, completed {}%, cancelled {}%",
        meetings.acceptance_rate, meetings.completion_rate, meetings.cancellation_rate
    );
    for share in meetings.categories.iter().filter(|c| c.count > 0) {
        println!(
            "  {:<12} {:>3} ({}%)",
            share.category.as_str(),
            share.count,
            share.percentage
        );
    }
    if !meetings.top_participants.is_empty() {
        println!("  Most active:");
        for participant in &meetings.top_participants {
            println!("    {:<24} {}", participant.name, participant.meetings);
        }
    }
}

fn print_overview(s: &OverviewSnapshot) {
    print_header(&s.event.name, &s.event.id, "overview");
    print_kpis(&s.stats);
    println!();
    println!(
        "Sessions: {}  Meetings: {}  Exhibitors: {}  Sponsors: {}",
        s.session_count, s.meeting_count, s.exhibitor_count, s.sponsor_count
    );
    println!();
    print_series("Registrations", &s.registrations);

    if !s.recent_activity.is_empty() {
        println!();
        println!("Recent activity:");
        for entry in &s.recent_activity {
            let when = entry
                .created_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!("  {:<16}  {:<18} {}", when, entry.action, entry.description);
        }
    }
}

fn print_ticketing(s: &TicketingSnapshot) {
    print_header(&s.event.name, &s.event.id, "ticketing");
    println!(
        "Revenue: {:.2}  Sold: {} of {} ({}%)  Sold out: {}",
        s.revenue, s.sold, s.available, s.sell_through, s.sold_out
    );
    println!();
    for line in &s.tickets {
        println!(
            "  {:<24} {:>5}/{:<5} {:>10.2} {:>4}%  {}",
            line.name,
            line.sold,
            line.total,
            line.revenue,
            line.percentage,
            line.status.as_str()
        );
    }
}

fn print_agenda(s: &AgendaSnapshot) {
    print_header(&s.event.name, &s.event.id, "agenda");
    println!(
        "Sessions: {}  Attendance: {}  Average rating: {:.1}",
        s.sessions.len(),
        s.total_attendance,
        s.average_rating
    );
    println!();
    for line in &s.sessions {
        let when = line
            .session
            .starts_at
            .map(|ts| ts.format("%b %-d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "  {:<12} {:<28} {:>4}/{:<4} {:>3}%",
            when,
            line.session.title,
            line.session.attendance_count,
            line.session.capacity,
            line.fill_rate
        );
    }
}

fn print_exhibitors(s: &ExhibitorsSnapshot) {
    print_header(&s.event.name, &s.event.id, "exhibitors");
    println!("Exhibitors: {}", s.exhibitors.len());
    for exhibitor in &s.exhibitors {
        println!("  {}", exhibitor.name);
    }
    println!();
    println!("Sponsors: {}", s.sponsors.len());
    for (tier, count) in &s.sponsor_tiers {
        println!("  {:<12} {}", tier, count);
    }
    println!();
    print_meetings(&s.meetings);
}

fn print_report(s: &ReportSnapshot) {
    print_header(&s.event.name, &s.event.id, "reporting");
    println!(
        "Range: {} ({} to {})",
        s.range.as_str(),
        s.window.start,
        s.window.end
    );
    println!();
    print_kpis(&s.stats);
    println!();

    println!("Ratings:");
    for bucket in &s.stats.rating_distribution.buckets {
        println!(
            "  {} stars  {:>4} ({}%)",
            bucket.stars, bucket.count, bucket.percentage
        );
    }
    for (category, score) in &s.stats.category_scores {
        println!("  {:<14} {}%", category.as_str(), score);
    }
    println!();

    print_series("Registrations", &s.registrations);
    print_series("Check-ins", &s.checkins);
    println!();
    print_meetings(&s.meetings);
}
