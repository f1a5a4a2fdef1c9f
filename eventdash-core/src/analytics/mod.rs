//! Analytics module for eventdash
//!
//! Pure aggregation over normalized rows:
//! - Metric calculators (attendance, revenue, NPS, ratings)
//! - B2B meeting analytics
//! - Time bucketing for trend series
//! - Chart geometry for the virtual SVG canvas
//! - Headline KPI aggregation
//!
//! Nothing in here performs I/O or fails. Calculators degrade to 0 on empty
//! or malformed input.

pub mod bucketing;
pub mod chart;
pub mod meetings;
pub mod metrics;
pub mod stats;

pub use bucketing::{bucket_series, resolve_window, DateRange, DateWindow, TimeSeriesBucket};
pub use chart::{build_geometry, render_svg, ChartGeometry, Point};
pub use meetings::{classify_meeting, meeting_stats, MeetingStats, UNKNOWN_ATTENDEE};
pub use metrics::{RatingDistribution, TicketSalesLine};
pub use stats::{AggregatedStats, EventRows};
