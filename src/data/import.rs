//! CSV ingestion of statcast exports and season rosters

use crate::data::database::{Database, RosterEntry, REQUIRED_COLUMNS};
use crate::data::teams::TeamDirectory;
use crate::{EventOutcome, GameId, InningHalf, MatchupError, PlateAppearance, PlayerId, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Rows are inserted in batches of this size
const BATCH_SIZE: usize = 5_000;

#[derive(Debug, Deserialize)]
struct StatcastRecord {
    game_date: String,
    game_pk: i64,
    pitcher: i64,
    batter: i64,
    events: Option<String>,
    home_team: String,
    away_team: String,
    post_home_score: Option<f64>,
    post_away_score: Option<f64>,
    #[serde(default)]
    at_bat_number: Option<f64>,
    #[serde(default)]
    pitch_number: Option<f64>,
    #[serde(default)]
    inning_topbot: Option<String>,
}

impl StatcastRecord {
    fn into_event(self, line: u64) -> Result<PlateAppearance> {
        let date_part = self.game_date.get(..10).unwrap_or(&self.game_date);
        let game_date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
            MatchupError::Parse(format!("line {}: bad game_date {:?}: {}", line, self.game_date, e))
        })?;
        let count = |v: Option<f64>| v.filter(|v| *v >= 0.0).map(|v| v as u32);

        Ok(PlateAppearance {
            row_id: 0,
            game_pk: GameId(self.game_pk),
            game_date,
            pitcher: PlayerId(self.pitcher),
            batter: PlayerId(self.batter),
            home_team: self.home_team,
            away_team: self.away_team,
            outcome: self
                .events
                .filter(|s| !s.trim().is_empty())
                .map(|s| EventOutcome::from_label(&s)),
            post_home_score: count(self.post_home_score),
            post_away_score: count(self.post_away_score),
            at_bat_number: count(self.at_bat_number),
            pitch_number: count(self.pitch_number),
            inning_half: self.inning_topbot.as_deref().and_then(InningHalf::from_code),
        })
    }
}

/// Outcome of a CSV import
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Import a statcast CSV export into the event table
pub fn import_statcast_csv<P: AsRef<Path>>(db: &Database, path: P) -> Result<ImportSummary> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let summary = import_statcast_reader(db, BufReader::new(file), &path.display().to_string())?;
    log::info!(
        "Imported {} events from {} ({} skipped)",
        summary.inserted,
        path.display(),
        summary.skipped
    );
    Ok(summary)
}

/// Import statcast rows from any reader; `source` names it in errors
pub fn import_statcast_reader<R: Read>(db: &Database, reader: R, source: &str) -> Result<ImportSummary> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(MatchupError::Schema {
            table: source.to_string(),
            missing,
        });
    }

    let mut summary = ImportSummary::default();
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    for (i, record) in rdr.deserialize::<StatcastRecord>().enumerate() {
        let line = i as u64 + 2;
        match record.map_err(MatchupError::from).and_then(|r| r.into_event(line)) {
            Ok(event) => batch.push(event),
            Err(e) => {
                log::debug!("Skipping {} line {}: {}", source, line, e);
                summary.skipped += 1;
            }
        }
        if batch.len() >= BATCH_SIZE {
            summary.inserted += db.insert_events(&batch)?;
            batch.clear();
        }
    }
    summary.inserted += db.insert_events(&batch)?;
    Ok(summary)
}

#[derive(Debug, Deserialize)]
struct RosterRecord {
    player_id: i64,
    season: i32,
    team: String,
}

/// Read a `player_id,season,team` CSV; team names are normalized to abbreviations
pub fn read_roster_csv<R: Read>(reader: R, teams: &TeamDirectory) -> Result<Vec<RosterEntry>> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let mut entries = Vec::new();
    for record in rdr.deserialize::<RosterRecord>() {
        let record = record?;
        entries.push(RosterEntry {
            player: PlayerId(record.player_id),
            season: record.season,
            team: teams.normalize(&record.team),
        });
    }
    Ok(entries)
}

/// Import a roster CSV into the roster table
pub fn import_roster_csv<P: AsRef<Path>>(db: &Database, path: P, teams: &TeamDirectory) -> Result<usize> {
    let file = File::open(path.as_ref())?;
    let entries = read_roster_csv(BufReader::new(file), teams)?;
    let count = db.upsert_roster_entries(&entries)?;
    log::info!("Imported {} roster entries from {}", count, path.as_ref().display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATCAST: &str = "\
pitch_type,game_date,game_pk,pitcher,batter,events,home_team,away_team,post_home_score,post_away_score,at_bat_number,pitch_number,inning_topbot
FF,2023-06-01,717465,543037,646240,,NYY,BOS,0,0,1,1,Top
SL,2023-06-01,717465,543037,646240,single,NYY,BOS,0,0,1,2,Top
CH,2023-06-01,717465,519242,592450,home_run,NYY,BOS,1,0,2,1,Bot
FF,not-a-date,717465,519242,592450,walk,NYY,BOS,1,0,3,1,Bot
";

    #[test]
    fn test_import_statcast_rows() {
        let db = Database::in_memory().unwrap();
        let summary = import_statcast_reader(&db, STATCAST.as_bytes(), "test.csv").unwrap();
        assert_eq!(summary.inserted, 3);
        assert_eq!(summary.skipped, 1);

        let events = db.load_events().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].outcome, None);
        assert_eq!(events[1].outcome, Some(EventOutcome::Single));
        assert_eq!(events[2].inning_half, Some(InningHalf::Bottom));
        assert_eq!(events[2].post_home_score, Some(1));
    }

    #[test]
    fn test_missing_csv_columns() {
        let db = Database::in_memory().unwrap();
        let csv = "game_date,game_pk,pitcher,batter\n2023-06-01,1,2,3\n";
        match import_statcast_reader(&db, csv.as_bytes(), "partial.csv") {
            Err(MatchupError::Schema { table, missing }) => {
                assert_eq!(table, "partial.csv");
                assert!(missing.contains(&"events".to_string()));
                assert!(missing.contains(&"post_away_score".to_string()));
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_roster_csv_normalizes_teams() {
        let csv = "player_id,season,team\n543037,2023,New York Yankees\n519242,2023,BOS\n";
        let entries = read_roster_csv(csv.as_bytes(), &TeamDirectory::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].team, "NYY");
        assert_eq!(entries[1].team, "BOS");
    }
}
