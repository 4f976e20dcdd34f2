//! Data ingestion and storage
//!
//! SQLite event store, CSV import, team directory and lineup sources.

pub mod database;
pub mod import;
pub mod lineup;
pub mod teams;

pub use database::{Database, DatabaseStats, RosterEntry, DEFAULT_EVENT_TABLE, REQUIRED_COLUMNS};
pub use import::{import_roster_csv, import_statcast_csv, ImportSummary};
pub use lineup::{GameLineups, JsonLineupFile, Lineup, LineupSource, StaticLineups};
pub use teams::TeamDirectory;
