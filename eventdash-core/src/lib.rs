//! # eventdash-core
//!
//! Core library for eventdash - analytics for event organizers.
//!
//! This library provides:
//! - Row store access (local SQLite or a PostgREST endpoint)
//! - Normalization of loosely-typed rows into records
//! - KPI, feedback, meeting and time-series aggregation
//! - Chart geometry and CSV export
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Store:** raw JSON rows keyed by event, read through [`RowStore`]
//! - **Records:** normalized rows with defaults filled in ([`normalize`])
//! - **Derived:** metrics and series recomputed on every load ([`analytics`], [`dashboard`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use eventdash_core::dashboard::{load_report, ViewOptions};
//! use eventdash_core::{open_store, Config};
//!
//! let config = Config::load().expect("failed to load config");
//! let store = open_store(&config.store).expect("failed to open store");
//!
//! let report = load_report(store.as_ref(), "event-id", &ViewOptions::default());
//! println!("{} registered", report.stats.registered);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use store::{open_store, Database, Query, RemoteStore, RowStore, Table};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod logging;
pub mod normalize;
pub mod store;
pub mod types;
