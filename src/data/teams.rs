//! Team name to abbreviation directory
//!
//! The mapping changes over time (relocations, renames), so it is a loadable
//! resource keyed by season rather than a constant.

use crate::{MatchupError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Season the built-in table describes
pub const DEFAULT_SEASON: i32 = 2024;

const DEFAULT_TEAMS: [(&str, &str); 30] = [
    ("Arizona Diamondbacks", "ARI"),
    ("Atlanta Braves", "ATL"),
    ("Baltimore Orioles", "BAL"),
    ("Boston Red Sox", "BOS"),
    ("Chicago Cubs", "CHC"),
    ("Cincinnati Reds", "CIN"),
    ("Cleveland Guardians", "CLE"),
    ("Colorado Rockies", "COL"),
    ("Chicago White Sox", "CHW"),
    ("Detroit Tigers", "DET"),
    ("Houston Astros", "HOU"),
    ("Kansas City Royals", "KC"),
    ("Los Angeles Angels", "LAA"),
    ("Los Angeles Dodgers", "LAD"),
    ("Miami Marlins", "MIA"),
    ("Milwaukee Brewers", "MIL"),
    ("Minnesota Twins", "MIN"),
    ("New York Mets", "NYM"),
    ("New York Yankees", "NYY"),
    ("Oakland Athletics", "OAK"),
    ("Philadelphia Phillies", "PHI"),
    ("Pittsburgh Pirates", "PIT"),
    ("San Diego Padres", "SD"),
    ("Seattle Mariners", "SEA"),
    ("San Francisco Giants", "SF"),
    ("St. Louis Cardinals", "STL"),
    ("Tampa Bay Rays", "TB"),
    ("Texas Rangers", "TEX"),
    ("Toronto Blue Jays", "TOR"),
    ("Washington Nationals", "WSN"),
];

// Statcast spells a few clubs differently from schedule sources
const DEFAULT_ALIASES: [(&str, &str); 4] = [("AZ", "ARI"), ("CWS", "CHW"), ("WSH", "WSN"), ("ATH", "OAK")];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDirectory {
    pub season: i32,
    /// Full team name -> abbreviation
    pub teams: BTreeMap<String, String>,
    /// Alternate abbreviation -> abbreviation
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl Default for TeamDirectory {
    fn default() -> Self {
        TeamDirectory {
            season: DEFAULT_SEASON,
            teams: DEFAULT_TEAMS
                .iter()
                .map(|(name, abbr)| (name.to_string(), abbr.to_string()))
                .collect(),
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(alias, abbr)| (alias.to_string(), abbr.to_string()))
                .collect(),
        }
    }
}

impl TeamDirectory {
    /// Load a directory from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let directory: TeamDirectory =
            toml::from_str(&content).map_err(|e| MatchupError::Config(e.to_string()))?;
        if directory.teams.is_empty() {
            return Err(MatchupError::Config("Team directory has no teams".to_string()));
        }
        Ok(directory)
    }

    /// The configured directory, or the built-in one when no path is set
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| MatchupError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Abbreviation for a full name, an abbreviation or an alias (case-insensitive)
    pub fn abbreviation(&self, team: &str) -> Option<&str> {
        let team = team.trim();
        if let Some((_, abbr)) = self
            .teams
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(team))
        {
            return Some(abbr);
        }
        if let Some(abbr) = self.teams.values().find(|abbr| abbr.eq_ignore_ascii_case(team)) {
            return Some(abbr);
        }
        self.aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(team))
            .map(|(_, abbr)| abbr.as_str())
    }

    /// Full name for an abbreviation or alias
    pub fn name(&self, team: &str) -> Option<&str> {
        let abbr = self.abbreviation(team)?;
        self.teams
            .iter()
            .find(|(_, a)| a.as_str() == abbr)
            .map(|(name, _)| name.as_str())
    }

    /// Abbreviation when the team is known, otherwise the input as given
    pub fn normalize(&self, team: &str) -> String {
        self.abbreviation(team)
            .map(str::to_string)
            .unwrap_or_else(|| team.trim().to_string())
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directory() {
        let teams = TeamDirectory::default();
        assert_eq!(teams.len(), 30);
        assert_eq!(teams.season, 2024);
        assert_eq!(teams.abbreviation("New York Yankees"), Some("NYY"));
        assert_eq!(teams.abbreviation("st. louis cardinals"), Some("STL"));
        assert_eq!(teams.abbreviation("kc"), Some("KC"));
        assert_eq!(teams.abbreviation("Montreal Expos"), None);
    }

    #[test]
    fn test_aliases_and_names() {
        let teams = TeamDirectory::default();
        assert_eq!(teams.abbreviation("CWS"), Some("CHW"));
        assert_eq!(teams.name("WSH"), Some("Washington Nationals"));
        assert_eq!(teams.normalize(" Boston Red Sox "), "BOS");
        assert_eq!(teams.normalize("MON"), "MON");
    }

    #[test]
    fn test_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teams.toml");

        let mut teams = TeamDirectory::default();
        teams.season = 2025;
        teams
            .teams
            .insert("Athletics".to_string(), "ATH".to_string());
        teams.save(&path).unwrap();

        let loaded = TeamDirectory::load(&path).unwrap();
        assert_eq!(loaded, teams);
        assert_eq!(loaded.abbreviation("Athletics"), Some("ATH"));
    }
}
