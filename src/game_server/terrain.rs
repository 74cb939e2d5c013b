//! Terrain - track surface modifiers
//!
//! Muddy and icy tracks can trip or slip a horse, costing it confidence and
//! stalling it for a few ticks. Surfaces also scale the periodic confidence
//! nudge a horse earns while moving.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::RaceError;
use crate::game_server::horse::Horse;

/// Track surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    #[default]
    Normal,
    Muddy,
    Icy,
}

/// Kind of terrain mishap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MishapKind {
    Slip,
    Trip,
}

/// A terrain mishap and its cost
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mishap {
    pub kind: MishapKind,
    pub confidence_loss: f64,
    pub stall_ticks: u32,
}

impl Terrain {
    /// Constants
    const MISHAP_PROBABILITY: f64 = 0.005;
    const SLIP_CONFIDENCE_LOSS: f64 = 0.2;
    const TRIP_CONFIDENCE_LOSS: f64 = 0.15;
    const STALL_TICKS: u32 = 5;
    /// A mishap never drops confidence below this, nor raises it up to it
    pub const MISHAP_CONFIDENCE_FLOOR: f64 = 0.01;

    /// Scale applied to the moving confidence nudge
    pub fn nudge_factor(self) -> f64 {
        match self {
            Terrain::Normal => 1.0,
            Terrain::Muddy => 0.5,
            Terrain::Icy => 0.25,
        }
    }

    /// The mishap this surface can cause, if any
    pub fn hazard(self) -> Option<Mishap> {
        match self {
            Terrain::Normal => None,
            Terrain::Muddy => Some(Mishap {
                kind: MishapKind::Trip,
                confidence_loss: Self::TRIP_CONFIDENCE_LOSS,
                stall_ticks: Self::STALL_TICKS,
            }),
            Terrain::Icy => Some(Mishap {
                kind: MishapKind::Slip,
                confidence_loss: Self::SLIP_CONFIDENCE_LOSS,
                stall_ticks: Self::STALL_TICKS,
            }),
        }
    }

    /// Roll for a mishap. Normal terrain takes no draw.
    pub fn roll_mishap<R: Rng + ?Sized>(self, rng: &mut R) -> Option<Mishap> {
        let hazard = self.hazard()?;
        let roll: f64 = rng.gen();
        (roll < Self::MISHAP_PROBABILITY).then_some(hazard)
    }

    /// Apply a mishap's confidence cost to a horse
    pub fn apply_mishap(mishap: &Mishap, horse: &mut Horse) {
        let reduced = horse.confidence() - mishap.confidence_loss;
        let floor = Self::MISHAP_CONFIDENCE_FLOOR.min(horse.confidence());
        horse.set_confidence(reduced.max(floor));
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terrain::Normal => write!(f, "Normal"),
            Terrain::Muddy => write!(f, "Muddy"),
            Terrain::Icy => write!(f, "Icy"),
        }
    }
}

impl FromStr for Terrain {
    type Err = RaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Terrain::Normal),
            "muddy" => Ok(Terrain::Muddy),
            "icy" => Ok(Terrain::Icy),
            other => Err(RaceError::Config(format!("unknown terrain '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_parse_terrain() {
        assert_eq!("Normal".parse::<Terrain>().unwrap(), Terrain::Normal);
        assert_eq!(" muddy ".parse::<Terrain>().unwrap(), Terrain::Muddy);
        assert_eq!("ICY".parse::<Terrain>().unwrap(), Terrain::Icy);
        assert!("lava".parse::<Terrain>().is_err());
    }

    #[test]
    fn test_normal_terrain_never_rolls() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(Terrain::Normal.roll_mishap(&mut rng), None);
    }

    #[test]
    fn test_hazards() {
        let mut rng = StepRng::new(0, 0);
        let slip = Terrain::Icy.roll_mishap(&mut rng).unwrap();
        assert_eq!(slip.kind, MishapKind::Slip);
        assert_eq!(slip.stall_ticks, 5);

        let trip = Terrain::Muddy.roll_mishap(&mut rng).unwrap();
        assert_eq!(trip.kind, MishapKind::Trip);
        assert_eq!(trip.confidence_loss, 0.15);
    }

    #[test]
    fn test_high_roll_avoids_mishap() {
        let mut rng = StepRng::new(u64::MAX, 0);
        assert_eq!(Terrain::Icy.roll_mishap(&mut rng), None);
    }

    #[test]
    fn test_apply_mishap_respects_floor() {
        let mut horse = Horse::new('I', "Ice", 0.1);
        let slip = Terrain::Icy.hazard().unwrap();
        Terrain::apply_mishap(&slip, &mut horse);
        assert_eq!(horse.confidence(), Terrain::MISHAP_CONFIDENCE_FLOOR);
    }

    #[test]
    fn test_apply_mishap_never_raises_confidence() {
        let slip = Terrain::Icy.hazard().unwrap();

        let mut frozen = Horse::new('F', "Frozen", 0.0);
        Terrain::apply_mishap(&slip, &mut frozen);
        assert_eq!(frozen.confidence(), 0.0);

        let mut timid = Horse::new('T', "Timid", 0.005);
        Terrain::apply_mishap(&slip, &mut timid);
        assert_eq!(timid.confidence(), 0.005);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Terrain::Icy).unwrap(), "\"icy\"");
        let parsed: Terrain = serde_json::from_str("\"muddy\"").unwrap();
        assert_eq!(parsed, Terrain::Muddy);
    }
}
