//! Horse - Individual horse state and per-tick behavior
//!
//! Each horse has a name, a display symbol, a distance along the track and a
//! confidence value. Confidence is both the chance of moving forward on a tick
//! and (squared) a factor in the chance of falling.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::game_server::race::SimulationRules;
use crate::game_server::terrain::Terrain;

/// Clamp a confidence value into `[0, 1]`; NaN becomes 0
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_confidence)
}

/// Complete state for a single horse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Horse {
    /// Horse name
    name: String,
    /// Glyph drawn on the track
    symbol: char,
    /// Whole track units covered in the current attempt
    #[serde(default)]
    distance_travelled: u32,
    /// Out of the current attempt
    #[serde(default)]
    fallen: bool,
    /// Always within `[0, 1]`
    #[serde(deserialize_with = "deserialize_confidence")]
    confidence: f64,
}

impl Horse {
    /// Create a horse at the starting line. Out-of-range confidence is clamped.
    pub fn new(symbol: char, name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            symbol,
            distance_travelled: 0,
            fallen: false,
            confidence: clamp_confidence(confidence),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> char {
        self.symbol
    }

    pub fn distance_travelled(&self) -> u32 {
        self.distance_travelled
    }

    pub fn has_fallen(&self) -> bool {
        self.fallen
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = clamp_confidence(confidence);
    }

    pub fn increase_confidence(&mut self, amount: f64) {
        self.set_confidence(self.confidence + amount);
    }

    pub fn decrease_confidence(&mut self, amount: f64) {
        self.set_confidence(self.confidence - amount);
    }

    /// Step one unit forward, optionally gaining a little confidence
    pub fn move_forward(&mut self, confidence_bonus: f64) {
        self.distance_travelled = self.distance_travelled.saturating_add(1);
        if confidence_bonus != 0.0 {
            self.increase_confidence(confidence_bonus);
        }
    }

    /// Go down for the rest of the attempt and lose `penalty` confidence
    pub fn fall(&mut self, penalty: f64) {
        self.fallen = true;
        self.decrease_confidence(penalty);
    }

    /// Return to the starting line. Confidence carries over to the next attempt.
    pub fn go_back_to_start(&mut self) {
        self.distance_travelled = 0;
        self.fallen = false;
    }
}

/// What happened to a horse during one stride
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrideOutcome {
    pub advanced: bool,
    pub fell: bool,
}

/// Horse movement logic
pub struct Stride;

impl Stride {
    /// Advance a single horse by one tick.
    ///
    /// A fallen horse is skipped and consumes no random draws. Otherwise two
    /// independent draws are always taken, the advance draw first and the fall
    /// draw second, so a seeded generator replays identically.
    pub fn advance_tick<R: Rng + ?Sized>(
        horse: &mut Horse,
        rules: &SimulationRules,
        terrain: Terrain,
        rng: &mut R,
    ) -> StrideOutcome {
        let mut outcome = StrideOutcome::default();
        if horse.fallen {
            return outcome;
        }

        let advance_roll: f64 = rng.gen();
        if advance_roll < horse.confidence {
            horse.move_forward(rules.advance_confidence_bonus);
            outcome.advanced = true;

            if rules.confidence_nudge > 0.0
                && rules.nudge_interval > 0
                && horse.distance_travelled % rules.nudge_interval == 0
            {
                horse.increase_confidence(rules.confidence_nudge * terrain.nudge_factor());
            }
        }

        let fall_roll: f64 = rng.gen();
        if fall_roll < Self::fall_probability(horse.confidence, rules.fall_coefficient) {
            horse.fall(rules.fall_penalty);
            outcome.fell = true;
        }

        outcome
    }

    /// Chance of falling on one tick
    pub fn fall_probability(confidence: f64, coefficient: f64) -> f64 {
        coefficient * confidence * confidence
    }
}

/// Compact horse state for renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorseSnapshot {
    /// 1-based lane number
    pub lane: usize,
    pub name: String,
    pub symbol: char,
    pub distance: u32,
    pub fallen: bool,
    pub confidence: f64,
    pub stalled: bool,
}

impl HorseSnapshot {
    pub fn new(lane: usize, horse: &Horse, stalled: bool) -> Self {
        Self {
            lane,
            name: horse.name.clone(),
            symbol: horse.symbol,
            distance: horse.distance_travelled,
            fallen: horse.fallen,
            confidence: horse.confidence,
            stalled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rules(fall_coefficient: f64) -> SimulationRules {
        SimulationRules {
            fall_coefficient,
            ..SimulationRules::default()
        }
    }

    #[test]
    fn test_new_clamps_confidence() {
        assert_eq!(Horse::new('A', "A", 1.5).confidence(), 1.0);
        assert_eq!(Horse::new('A', "A", -0.3).confidence(), 0.0);
        assert_eq!(Horse::new('A', "A", f64::NAN).confidence(), 0.0);
        assert_eq!(Horse::new('A', "A", 0.42).confidence(), 0.42);
    }

    #[test]
    fn test_mutators_clamp() {
        let mut horse = Horse::new('A', "A", 0.95);
        horse.increase_confidence(0.2);
        assert_eq!(horse.confidence(), 1.0);
        horse.decrease_confidence(3.0);
        assert_eq!(horse.confidence(), 0.0);
        horse.set_confidence(7.0);
        assert_eq!(horse.confidence(), 1.0);
    }

    #[test]
    fn test_fall_applies_penalty_with_floor() {
        let mut horse = Horse::new('A', "A", 0.05);
        horse.fall(0.1);
        assert!(horse.has_fallen());
        assert_eq!(horse.confidence(), 0.0);
    }

    #[test]
    fn test_go_back_to_start_keeps_confidence() {
        let mut horse = Horse::new('A', "A", 0.6);
        horse.move_forward(0.0);
        horse.move_forward(0.0);
        horse.fall(0.1);
        let confidence = horse.confidence();

        horse.go_back_to_start();
        assert_eq!(horse.distance_travelled(), 0);
        assert!(!horse.has_fallen());
        assert_eq!(horse.confidence(), confidence);
    }

    #[test]
    fn test_move_forward_bonus() {
        let mut horse = Horse::new('A', "A", 0.995);
        horse.move_forward(0.01);
        assert_eq!(horse.distance_travelled(), 1);
        assert_eq!(horse.confidence(), 1.0);
    }

    #[test]
    fn test_full_confidence_always_advances() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut horse = Horse::new('A', "A", 1.0);
        for tick in 1..=50 {
            let outcome = Stride::advance_tick(&mut horse, &rules(0.0), Terrain::Normal, &mut rng);
            assert!(outcome.advanced);
            assert!(!outcome.fell);
            assert_eq!(horse.distance_travelled(), tick);
        }
    }

    #[test]
    fn test_zero_confidence_never_moves_or_falls() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut horse = Horse::new('Z', "Zero", 0.0);
        for _ in 0..1_000 {
            Stride::advance_tick(&mut horse, &rules(1.0), Terrain::Normal, &mut rng);
        }
        assert_eq!(horse.distance_travelled(), 0);
        assert!(!horse.has_fallen());
    }

    #[test]
    fn test_fallen_horse_is_skipped() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut horse = Horse::new('A', "A", 0.8);
        horse.fall(0.1);
        let before = horse.clone();
        let outcome = Stride::advance_tick(&mut horse, &rules(0.1), Terrain::Normal, &mut rng);
        assert_eq!(outcome, StrideOutcome::default());
        assert_eq!(horse, before);
    }

    #[test]
    fn test_certain_fall_costs_confidence() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut horse = Horse::new('A', "A", 1.0);
        let outcome = Stride::advance_tick(&mut horse, &rules(1.0), Terrain::Normal, &mut rng);
        assert!(outcome.fell);
        assert!(horse.has_fallen());
        assert!((horse.confidence() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_terrain_nudge_scaled() {
        // Every draw is 0.0, so any horse with positive confidence advances
        let mut rng = StepRng::new(0, 0);
        let rules = SimulationRules {
            fall_coefficient: 0.0,
            confidence_nudge: 0.1,
            nudge_interval: 2,
            ..SimulationRules::default()
        };
        let mut horse = Horse::new('M', "Mudlark", 0.5);

        Stride::advance_tick(&mut horse, &rules, Terrain::Muddy, &mut rng);
        assert_eq!(horse.distance_travelled(), 1);
        assert_eq!(horse.confidence(), 0.5);

        Stride::advance_tick(&mut horse, &rules, Terrain::Muddy, &mut rng);
        assert_eq!(horse.distance_travelled(), 2);
        assert!((horse.confidence() - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_deserialize_clamps_confidence() {
        let horse: Horse =
            serde_json::from_str(r#"{"name":"Comet","symbol":"C","confidence":4.2}"#).unwrap();
        assert_eq!(horse.confidence(), 1.0);
        assert_eq!(horse.distance_travelled(), 0);
        assert!(!horse.has_fallen());
    }

    #[test]
    fn test_snapshot_from_horse() {
        let mut horse = Horse::new('B', "Blaze", 0.75);
        horse.move_forward(0.0);
        let snap = HorseSnapshot::new(2, &horse, false);
        assert_eq!(snap.lane, 2);
        assert_eq!(snap.name, "Blaze");
        assert_eq!(snap.distance, 1);
        assert!(!snap.fallen);
    }
}
