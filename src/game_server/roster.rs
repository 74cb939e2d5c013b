//! Roster - serializable race setup
//!
//! A `RaceSetup` is everything needed to build a race: track, lanes, terrain,
//! rule parameters, an optional RNG seed and the horses. It round-trips
//! through JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RaceError, Result};
use crate::game_server::horse::Horse;
use crate::game_server::race::{Race, RaceConfig, SimulationRules};
use crate::game_server::terrain::Terrain;

const DEFAULT_NAMES: [&str; 6] = ["Thunder", "Lightning", "Storm", "Blaze", "Comet", "Rocket"];
const DEFAULT_CONFIDENCE: [f64; 6] = [0.7, 0.8, 0.6, 0.75, 0.85, 0.65];

/// One horse in a setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorseEntry {
    pub name: String,
    /// Defaults to the upper-cased first letter of the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<char>,
    pub confidence: f64,
    /// 1-based lane; defaults to the entry's position in the roster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<usize>,
}

impl HorseEntry {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            symbol: None,
            confidence,
            lane: None,
        }
    }

    pub fn symbol(&self) -> char {
        self.symbol
            .or_else(|| self.name.chars().next().map(|c| c.to_ascii_uppercase()))
            .unwrap_or('?')
    }

    pub fn to_horse(&self) -> Horse {
        Horse::new(self.symbol(), self.name.clone(), self.confidence)
    }

    fn from_lane(lane: usize, horse: &Horse) -> Self {
        Self {
            name: horse.name().to_string(),
            symbol: Some(horse.symbol()),
            confidence: horse.confidence(),
            lane: Some(lane),
        }
    }
}

/// Full race setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSetup {
    pub track_length: u32,
    pub lane_count: usize,
    #[serde(default)]
    pub terrain: Terrain,
    #[serde(default)]
    pub rules: SimulationRules,
    /// Seed for reproducible runs; entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Horses in lane order starting at lane 1
    pub horses: Vec<HorseEntry>,
}

impl Default for RaceSetup {
    fn default() -> Self {
        let config = RaceConfig::default();
        Self {
            track_length: config.track_length,
            lane_count: config.lane_count,
            terrain: config.terrain,
            rules: config.rules,
            seed: None,
            horses: default_roster(config.lane_count),
        }
    }
}

/// The stock field, cycled to fill `lane_count` lanes
pub fn default_roster(lane_count: usize) -> Vec<HorseEntry> {
    (0..lane_count)
        .map(|i| {
            HorseEntry::new(
                DEFAULT_NAMES[i % DEFAULT_NAMES.len()],
                DEFAULT_CONFIDENCE[i % DEFAULT_CONFIDENCE.len()],
            )
        })
        .collect()
}

impl RaceSetup {
    /// Stock roster on a track of the given size
    pub fn with_default_roster(track_length: u32, lane_count: usize) -> Self {
        Self {
            track_length,
            lane_count,
            horses: default_roster(lane_count),
            ..Default::default()
        }
    }

    /// Capture the configuration of an existing race
    pub fn from_race(race: &Race) -> Self {
        let config = race.config();
        let horses = race
            .horses()
            .map(|(lane, horse)| HorseEntry::from_lane(lane, horse))
            .collect();
        Self {
            track_length: config.track_length,
            lane_count: config.lane_count,
            terrain: config.terrain,
            rules: config.rules,
            seed: None,
            horses,
        }
    }

    pub fn race_config(&self) -> RaceConfig {
        RaceConfig {
            track_length: self.track_length,
            lane_count: self.lane_count,
            terrain: self.terrain,
            rules: self.rules,
        }
    }

    /// Build the race, placing entry `i` in lane `i + 1` unless it names a lane.
    ///
    /// Horses that do not fit a lane are reported and left out.
    pub fn build_race(&self) -> Result<Race> {
        let mut race = Race::new(self.race_config())?;
        for (index, entry) in self.horses.iter().enumerate() {
            race.add_horse(entry.to_horse(), entry.lane.unwrap_or(index + 1));
        }
        Ok(race)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let setup: Self = serde_json::from_str(json)?;
        setup.race_config().validate()?;
        Ok(setup)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw).map_err(|err| match err {
            RaceError::Json(json) => {
                RaceError::Config(format!("{}: {}", path.display(), json))
            }
            other => other,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
