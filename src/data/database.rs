//! SQLite access to the historical event table

use crate::{
    EventOutcome, GameId, InningHalf, MatchupError, PlateAppearance, PlayerId, Result,
};
use chrono::NaiveDate;
use rusqlite::types::{Type, Value};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Columns the pipeline cannot run without
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "game_date",
    "game_pk",
    "pitcher",
    "batter",
    "events",
    "home_team",
    "away_team",
    "post_home_score",
    "post_away_score",
];

/// Columns used for ordering and team resolution when present
const OPTIONAL_COLUMNS: [&str; 3] = ["at_bat_number", "pitch_number", "inning_topbot"];

pub const DEFAULT_EVENT_TABLE: &str = "statcast_data";

/// A player's team for one season
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub player: PlayerId,
    pub season: i32,
    pub team: String,
}

/// Database connection and operations
pub struct Database {
    conn: Connection,
    table: String,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_table(path, DEFAULT_EVENT_TABLE)
    }

    /// Open a database whose event table has a non-default name
    pub fn open_with_table<P: AsRef<Path>>(path: P, table: &str) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, table)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, DEFAULT_EVENT_TABLE)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(MatchupError::Config(format!(
                "Invalid event table name: {:?}",
                table
            )));
        }
        let db = Database {
            conn,
            table: table.to_string(),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Create the event and roster tables if they do not exist yet.
    /// An existing event table is left as is and validated on read.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                game_date TEXT NOT NULL,
                game_pk INTEGER NOT NULL,
                pitcher INTEGER NOT NULL,
                batter INTEGER NOT NULL,
                events TEXT,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                post_home_score INTEGER,
                post_away_score INTEGER,
                at_bat_number INTEGER,
                pitch_number INTEGER,
                inning_topbot TEXT
            );

            CREATE TABLE IF NOT EXISTS rosters (
                player_id INTEGER NOT NULL,
                season INTEGER NOT NULL,
                team TEXT NOT NULL,
                PRIMARY KEY (player_id, season)
            );
            "#,
            table = self.table
        ))?;

        if self.validate_schema().is_ok() {
            self.conn.execute_batch(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_game ON {table}(game_pk);
                 CREATE INDEX IF NOT EXISTS idx_{table}_matchup ON {table}(pitcher, batter);",
                table = self.table
            ))?;
        }
        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column names of the event table
    pub fn columns(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", self.table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Check the event table for required columns; returns which optional
    /// columns are available
    pub fn validate_schema(&self) -> Result<[bool; 3]> {
        let columns = self.columns()?;
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !columns.iter().any(|have| have == *c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MatchupError::Schema {
                table: self.table.clone(),
                missing,
            });
        }
        Ok(OPTIONAL_COLUMNS.map(|c| columns.iter().any(|have| have == c)))
    }

    // ==================== Event Operations ====================

    /// Insert events (used by CSV import and tests)
    pub fn insert_events(&self, events: &[PlateAppearance]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (game_date, game_pk, pitcher, batter, events, home_team, away_team,
                                 post_home_score, post_away_score, at_bat_number, pitch_number, inning_topbot)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                self.table
            ))?;
            for event in events {
                stmt.execute(params![
                    event.game_date.format("%Y-%m-%d").to_string(),
                    event.game_pk.0,
                    event.pitcher.0,
                    event.batter.0,
                    event.outcome.as_ref().map(|o| o.label().to_string()),
                    event.home_team,
                    event.away_team,
                    event.post_home_score,
                    event.post_away_score,
                    event.at_bat_number,
                    event.pitch_number,
                    event.inning_half.map(|h| h.code()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(events.len())
    }

    /// All events in chronological order
    pub fn load_events(&self) -> Result<Vec<PlateAppearance>> {
        self.query_events(None)
    }

    /// Events with a game date inside the inclusive range
    pub fn load_events_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PlateAppearance>> {
        self.query_events(Some((start, end)))
    }

    fn query_events(&self, range: Option<(NaiveDate, NaiveDate)>) -> Result<Vec<PlateAppearance>> {
        let [has_at_bat, has_pitch, has_half] = self.validate_schema()?;
        let optional = |present: bool, column: &str| {
            if present {
                column.to_string()
            } else {
                format!("NULL AS {}", column)
            }
        };

        let mut sql = format!(
            "SELECT rowid, game_date, game_pk, pitcher, batter, events, home_team, away_team,
                    post_home_score, post_away_score, {}, {}, {}
             FROM {}",
            optional(has_at_bat, "at_bat_number"),
            optional(has_pitch, "pitch_number"),
            optional(has_half, "inning_topbot"),
            self.table
        );
        if range.is_some() {
            sql.push_str(" WHERE substr(game_date, 1, 10) BETWEEN ?1 AND ?2");
        }
        sql.push_str(" ORDER BY substr(game_date, 1, 10), game_pk, at_bat_number, pitch_number, rowid");

        let mut stmt = self.conn.prepare(&sql)?;
        let events = match range {
            Some((start, end)) => stmt
                .query_map(
                    params![
                        start.format("%Y-%m-%d").to_string(),
                        end.format("%Y-%m-%d").to_string()
                    ],
                    Self::row_to_event,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], Self::row_to_event)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        Ok(events)
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<PlateAppearance> {
        let date_str = required_text(row, 1, "game_date")?;
        let date_part = date_str.get(..10).unwrap_or(&date_str);
        let game_date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

        let outcome = optional_text(row, 5)?
            .filter(|s| !s.trim().is_empty())
            .map(|s| EventOutcome::from_label(&s));

        Ok(PlateAppearance {
            row_id: row.get(0)?,
            game_pk: GameId(required_int(row, 2, "game_pk")?),
            game_date,
            pitcher: PlayerId(required_int(row, 3, "pitcher")?),
            batter: PlayerId(required_int(row, 4, "batter")?),
            outcome,
            home_team: required_text(row, 6, "home_team")?,
            away_team: required_text(row, 7, "away_team")?,
            post_home_score: optional_count(row, 8)?,
            post_away_score: optional_count(row, 9)?,
            at_bat_number: optional_count(row, 10)?,
            pitch_number: optional_count(row, 11)?,
            inning_half: optional_text(row, 12)?.and_then(|s| InningHalf::from_code(&s)),
        })
    }

    // ==================== Roster Operations ====================

    pub fn upsert_roster_entry(&self, entry: &RosterEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rosters (player_id, season, team) VALUES (?1, ?2, ?3)
             ON CONFLICT(player_id, season) DO UPDATE SET team = excluded.team",
            params![entry.player.0, entry.season, entry.team],
        )?;
        Ok(())
    }

    pub fn upsert_roster_entries(&self, entries: &[RosterEntry]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for entry in entries {
            self.upsert_roster_entry(entry)?;
        }
        tx.commit()?;
        Ok(entries.len())
    }

    pub fn load_rosters(&self) -> Result<Vec<RosterEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT player_id, season, team FROM rosters ORDER BY season, player_id")?;
        let entries = stmt
            .query_map([], |row| {
                Ok(RosterEntry {
                    player: PlayerId(row.get(0)?),
                    season: row.get(1)?,
                    team: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        self.validate_schema()?;
        let (event_count, outcome_count, game_count, pitcher_count, batter_count): (
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = self.conn.query_row(
            &format!(
                "SELECT COUNT(*), COUNT(events), COUNT(DISTINCT game_pk),
                        COUNT(DISTINCT pitcher), COUNT(DISTINCT batter)
                 FROM {}",
                self.table
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?;

        let (min_date, max_date): (Option<String>, Option<String>) = self
            .conn
            .query_row(
                &format!(
                    "SELECT MIN(substr(game_date, 1, 10)), MAX(substr(game_date, 1, 10)) FROM {}",
                    self.table
                ),
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .unwrap_or((None, None));

        let roster_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM rosters", [], |row| row.get(0))?;

        let parse = |s: Option<String>| s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());
        Ok(DatabaseStats {
            event_count: event_count as usize,
            outcome_count: outcome_count as usize,
            game_count: game_count as usize,
            pitcher_count: pitcher_count as usize,
            batter_count: batter_count as usize,
            roster_count: roster_count as usize,
            earliest_game: parse(min_date),
            latest_game: parse(max_date),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub event_count: usize,
    /// Rows with a non-null `events` value
    pub outcome_count: usize,
    pub game_count: usize,
    pub pitcher_count: usize,
    pub batter_count: usize,
    pub roster_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}

// Tables written by dataframe tools store integers as REAL and ids as TEXT
// often enough that columns are read loosely.

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Real(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.fract() == 0.0).map(|f| f as i64),
        _ => None,
    }
}

fn required_int(row: &rusqlite::Row, idx: usize, column: &str) -> rusqlite::Result<i64> {
    let value: Value = row.get(idx)?;
    value_to_i64(&value)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(idx, column.to_string(), value.data_type()))
}

fn optional_count(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<u32>> {
    let value: Value = row.get(idx)?;
    Ok(value_to_i64(&value).and_then(|v| u32::try_from(v).ok()))
}

fn required_text(row: &rusqlite::Row, idx: usize, column: &str) -> rusqlite::Result<String> {
    optional_text(row, idx)?
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(idx, column.to_string(), Type::Null))
}

fn optional_text(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<String>> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Text(s) => Some(s),
        Value::Integer(i) => Some(i.to_string()),
        _ => None,
    })
}
