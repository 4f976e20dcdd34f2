//! Event classification
//!
//! Maps statcast `events` labels onto hit / walk / strikeout / at-bat facets.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Outcome of a plate appearance as recorded in the `events` column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventOutcome {
    Single,
    Double,
    Triple,
    HomeRun,
    Walk,
    Strikeout,
    FieldOut,
    FieldersChoice,
    GroundedIntoDoublePlay,
    ForceOut,
    /// Any label outside the enumeration (hit_by_pitch, sac_fly, ...)
    Other(String),
}

impl EventOutcome {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "single" => EventOutcome::Single,
            "double" => EventOutcome::Double,
            "triple" => EventOutcome::Triple,
            "home_run" => EventOutcome::HomeRun,
            "walk" => EventOutcome::Walk,
            "strikeout" => EventOutcome::Strikeout,
            "field_out" => EventOutcome::FieldOut,
            "fielders_choice" => EventOutcome::FieldersChoice,
            "grounded_into_double_play" => EventOutcome::GroundedIntoDoublePlay,
            "force_out" => EventOutcome::ForceOut,
            other => EventOutcome::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EventOutcome::Single => "single",
            EventOutcome::Double => "double",
            EventOutcome::Triple => "triple",
            EventOutcome::HomeRun => "home_run",
            EventOutcome::Walk => "walk",
            EventOutcome::Strikeout => "strikeout",
            EventOutcome::FieldOut => "field_out",
            EventOutcome::FieldersChoice => "fielders_choice",
            EventOutcome::GroundedIntoDoublePlay => "grounded_into_double_play",
            EventOutcome::ForceOut => "force_out",
            EventOutcome::Other(label) => label,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(
            self,
            EventOutcome::Single | EventOutcome::Double | EventOutcome::Triple | EventOutcome::HomeRun
        )
    }

    pub fn is_walk(&self) -> bool {
        matches!(self, EventOutcome::Walk)
    }

    pub fn is_strikeout(&self) -> bool {
        matches!(self, EventOutcome::Strikeout)
    }

    pub fn is_home_run(&self) -> bool {
        matches!(self, EventOutcome::HomeRun)
    }

    pub fn is_at_bat(&self) -> bool {
        self.is_hit()
            || matches!(
                self,
                EventOutcome::FieldOut
                    | EventOutcome::Strikeout
                    | EventOutcome::FieldersChoice
                    | EventOutcome::GroundedIntoDoublePlay
                    | EventOutcome::ForceOut
            )
    }

    /// Base value of the hit type; zero for anything that is not a hit
    pub fn base_value(&self) -> u32 {
        match self {
            EventOutcome::Single => 1,
            EventOutcome::Double => 2,
            EventOutcome::Triple => 3,
            EventOutcome::HomeRun => 4,
            _ => 0,
        }
    }
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for EventOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for EventOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(EventOutcome::from_label(&label))
    }
}

/// Boolean facets of one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFacets {
    pub is_hit: bool,
    pub is_walk: bool,
    pub is_strikeout: bool,
    pub is_at_bat: bool,
    pub is_home_run: bool,
}

impl EventFacets {
    /// Classify an optional outcome; missing outcomes are false on every facet
    pub fn classify(outcome: Option<&EventOutcome>) -> Self {
        match outcome {
            Some(o) => EventFacets {
                is_hit: o.is_hit(),
                is_walk: o.is_walk(),
                is_strikeout: o.is_strikeout(),
                is_at_bat: o.is_at_bat(),
                is_home_run: o.is_home_run(),
            },
            None => EventFacets::default(),
        }
    }
}

/// Total bases for an outcome: base value times the hit indicator
pub fn total_bases(outcome: Option<&EventOutcome>) -> u32 {
    match outcome {
        Some(o) if o.is_hit() => o.base_value(),
        _ => 0,
    }
}
