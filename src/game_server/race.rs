//! Race - Race configuration and state management
//!
//! Owns the lanes, drives every horse one tick at a time, and detects the
//! finish (a horse reaching the end of the track) or a wipe-out (every horse
//! down).

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{validate_lane_count, validate_track_length, RaceError, Result};
use crate::game_server::horse::{Horse, HorseSnapshot, Stride};
use crate::game_server::terrain::{MishapKind, Terrain};

/// Tunable probabilities and penalties of the movement rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationRules {
    /// Fall chance per tick is `fall_coefficient * confidence^2`
    pub fall_coefficient: f64,
    /// Confidence lost on a fall
    pub fall_penalty: f64,
    /// Confidence gained on every forward step
    pub advance_confidence_bonus: f64,
    /// Confidence gained every `nudge_interval` units, scaled by terrain
    pub confidence_nudge: f64,
    pub nudge_interval: u32,
}

impl Default for SimulationRules {
    fn default() -> Self {
        Self {
            fall_coefficient: 0.1,
            fall_penalty: 0.1,
            advance_confidence_bonus: 0.0,
            confidence_nudge: 0.0,
            nudge_interval: 10,
        }
    }
}

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Track length in whole units
    pub track_length: u32,
    /// Number of lanes (2-6)
    pub lane_count: usize,
    /// Track surface
    #[serde(default)]
    pub terrain: Terrain,
    /// Movement rule parameters
    #[serde(default)]
    pub rules: SimulationRules,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            track_length: 20,
            lane_count: 4,
            terrain: Terrain::Normal,
            rules: SimulationRules::default(),
        }
    }
}

impl RaceConfig {
    pub fn validate(&self) -> Result<()> {
        validate_track_length(self.track_length)?;
        validate_lane_count(self.lane_count)
    }
}

/// Race status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    Running,
    Finished,
}

/// How a race ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceOutcome {
    /// First horse over the line in lane order
    Winner { lane: usize, name: String },
    /// Every horse went down
    AllFallen,
    /// A bounded run gave up before either of the above
    TickLimitReached,
}

impl RaceOutcome {
    pub fn winning_lane(&self) -> Option<usize> {
        match self {
            RaceOutcome::Winner { lane, .. } => Some(*lane),
            _ => None,
        }
    }
}

/// Notable things that happened during an attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceEvent {
    Fell { tick: u32, lane: usize, name: String },
    Mishap { tick: u32, lane: usize, name: String, kind: MishapKind },
    Finished { tick: u32, outcome: RaceOutcome },
}

/// True iff every occupied lane holds a fallen horse.
///
/// Vacuously true when no lane is occupied; callers must not read that as a
/// finished race.
pub fn all_fallen(lanes: &[Option<Horse>]) -> bool {
    lanes.iter().flatten().all(Horse::has_fallen)
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct Race {
    /// Race configuration
    config: RaceConfig,
    /// Current race status
    status: RaceStatus,
    /// One slot per lane, lane 1 first
    lanes: Vec<Option<Horse>>,
    /// Ticks each lane still has to sit out after a mishap
    stall_ticks: Vec<u32>,
    /// Ticks elapsed in the current attempt
    ticks: u32,
    /// Set once the race is finished
    outcome: Option<RaceOutcome>,
    /// Event log for the current attempt
    events: Vec<RaceEvent>,
}

impl Race {
    /// Create a new race with the given configuration
    pub fn new(config: RaceConfig) -> Result<Self> {
        config.validate()?;
        let lane_count = config.lane_count;
        Ok(Self {
            config,
            status: RaceStatus::Running,
            lanes: vec![None; lane_count],
            stall_ticks: vec![0; lane_count],
            ticks: 0,
            outcome: None,
            events: Vec::new(),
        })
    }

    /// Create a race on normal terrain with default rules
    pub fn with_track(track_length: u32, lane_count: usize) -> Result<Self> {
        Self::new(RaceConfig {
            track_length,
            lane_count,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn track_length(&self) -> u32 {
        self.config.track_length
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn status(&self) -> RaceStatus {
        self.status
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn outcome(&self) -> Option<&RaceOutcome> {
        self.outcome.as_ref()
    }

    pub fn events(&self) -> &[RaceEvent] {
        &self.events
    }

    pub fn lanes(&self) -> &[Option<Horse>] {
        &self.lanes
    }

    /// Horse in a 1-based lane
    pub fn horse(&self, lane: usize) -> Option<&Horse> {
        lane.checked_sub(1)
            .and_then(|index| self.lanes.get(index))
            .and_then(Option::as_ref)
    }

    /// Mutable horse in a 1-based lane
    pub fn horse_mut(&mut self, lane: usize) -> Option<&mut Horse> {
        lane.checked_sub(1)
            .and_then(|index| self.lanes.get_mut(index))
            .and_then(Option::as_mut)
    }

    /// Occupied lanes with their 1-based lane numbers
    pub fn horses(&self) -> impl Iterator<Item = (usize, &Horse)> {
        self.lanes
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|horse| (index + 1, horse)))
    }

    pub fn has_horses(&self) -> bool {
        self.lanes.iter().any(Option::is_some)
    }

    /// Put a horse in a 1-based lane.
    ///
    /// An out-of-range lane is reported and ignored; returns whether the horse
    /// was placed.
    pub fn add_horse(&mut self, horse: Horse, lane: usize) -> bool {
        if lane < 1 || lane > self.lanes.len() {
            log::warn!(
                "Can't add {} to lane {}, only {} lanes available",
                horse.name(),
                lane,
                self.lanes.len()
            );
            return false;
        }

        let slot = &mut self.lanes[lane - 1];
        if let Some(previous) = slot.as_ref() {
            log::info!("{} replaces {} in lane {}", horse.name(), previous.name(), lane);
        }
        *slot = Some(horse);
        true
    }

    /// Return every horse to the start and the race to `Running`.
    /// Confidence is left alone.
    pub fn reset(&mut self) {
        for horse in self.lanes.iter_mut().flatten() {
            horse.go_back_to_start();
        }
        self.stall_ticks.iter_mut().for_each(|stall| *stall = 0);
        self.status = RaceStatus::Running;
        self.ticks = 0;
        self.outcome = None;
        self.events.clear();
    }

    /// Has a horse reached or passed the finish line?
    pub fn is_race_won_by(&self, horse: &Horse) -> bool {
        horse.distance_travelled() >= self.config.track_length
    }

    /// First horse over the line in lane order.
    ///
    /// Horses that cross on the same tick are not ranked any further; the lower
    /// lane simply wins.
    pub fn winner(&self) -> Option<(usize, &Horse)> {
        self.horses().find(|(_, horse)| self.is_race_won_by(horse))
    }

    /// Move every occupied lane forward one tick, then check for the end.
    ///
    /// A finished race is left untouched and reports its stored outcome.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<RaceOutcome> {
        if let Some(outcome) = self.check_termination() {
            return Some(outcome);
        }

        self.ticks += 1;
        let tick = self.ticks;
        let terrain = self.config.terrain;
        let rules = self.config.rules;

        let lanes = self.lanes.iter_mut().zip(self.stall_ticks.iter_mut());
        for (index, (slot, stall)) in lanes.enumerate() {
            let Some(horse) = slot else {
                continue;
            };
            if *stall > 0 {
                *stall -= 1;
                continue;
            }
            if horse.has_fallen() {
                continue;
            }

            let stride = Stride::advance_tick(horse, &rules, terrain, rng);
            if stride.fell {
                log::debug!("{} fell in lane {} on tick {}", horse.name(), index + 1, tick);
                self.events.push(RaceEvent::Fell {
                    tick,
                    lane: index + 1,
                    name: horse.name().to_string(),
                });
                continue;
            }

            if let Some(mishap) = terrain.roll_mishap(rng) {
                Terrain::apply_mishap(&mishap, horse);
                *stall = mishap.stall_ticks;
                log::debug!("{} hit a {:?} in lane {} on tick {}", horse.name(), mishap.kind, index + 1, tick);
                self.events.push(RaceEvent::Mishap {
                    tick,
                    lane: index + 1,
                    name: horse.name().to_string(),
                    kind: mishap.kind,
                });
            }
        }

        self.check_termination()
    }

    /// Evaluate the end conditions without moving anyone.
    ///
    /// Finishes the race when a horse has crossed the line or every attached
    /// horse is down. A race with no horses never finishes here.
    pub fn check_termination(&mut self) -> Option<RaceOutcome> {
        if let Some(outcome) = &self.outcome {
            return Some(outcome.clone());
        }

        let outcome = if let Some((lane, horse)) = self.winner() {
            RaceOutcome::Winner {
                lane,
                name: horse.name().to_string(),
            }
        } else if self.has_horses() && all_fallen(&self.lanes) {
            RaceOutcome::AllFallen
        } else {
            return None;
        };

        self.finish(outcome.clone());
        Some(outcome)
    }

    fn finish(&mut self, outcome: RaceOutcome) {
        match &outcome {
            RaceOutcome::Winner { lane, name } => {
                log::info!("{} wins from lane {} after {} ticks", name, lane, self.ticks)
            }
            _ => log::info!("All horses fell after {} ticks", self.ticks),
        }
        self.events.push(RaceEvent::Finished {
            tick: self.ticks,
            outcome: outcome.clone(),
        });
        self.status = RaceStatus::Finished;
        self.outcome = Some(outcome);
    }

    /// Reset every horse and race until someone wins or everyone falls.
    ///
    /// Does not return if no horse can ever finish or fall (for example when
    /// every confidence is 0); use [`Race::run_to_completion_bounded`] when
    /// that is possible.
    pub fn run_to_completion<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<RaceOutcome> {
        self.ensure_horses()?;
        self.reset();
        log::info!("Race started over {} units", self.config.track_length);
        Ok(self.drive(rng, None))
    }

    /// Like [`Race::run_to_completion`] but gives up after `max_ticks`
    pub fn run_to_completion_bounded<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        max_ticks: u32,
    ) -> Result<RaceOutcome> {
        self.ensure_horses()?;
        self.reset();
        log::info!("Race started over {} units (limit {} ticks)", self.config.track_length, max_ticks);
        Ok(self.drive(rng, Some(max_ticks)))
    }

    /// Race from the current state without resetting anyone.
    ///
    /// End conditions are checked before the first tick, so a field that is
    /// already down finishes with zero ticks.
    pub fn continue_to_completion<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        max_ticks: Option<u32>,
    ) -> Result<RaceOutcome> {
        self.ensure_horses()?;
        Ok(self.drive(rng, max_ticks))
    }

    fn ensure_horses(&self) -> Result<()> {
        if self.has_horses() {
            Ok(())
        } else {
            Err(RaceError::NoHorses)
        }
    }

    fn drive<R: Rng + ?Sized>(&mut self, rng: &mut R, max_ticks: Option<u32>) -> RaceOutcome {
        loop {
            if let Some(outcome) = self.check_termination() {
                return outcome;
            }
            if max_ticks.is_some_and(|limit| self.ticks >= limit) {
                log::warn!("Race stopped at the {} tick limit", self.ticks);
                return RaceOutcome::TickLimitReached;
            }
            if let Some(outcome) = self.tick(rng) {
                return outcome;
            }
        }
    }

    /// Get compact snapshot for renderers
    pub fn get_snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            status: self.status,
            track_length: self.config.track_length,
            terrain: self.config.terrain,
            ticks: self.ticks,
            horses: self
                .horses()
                .map(|(lane, horse)| HorseSnapshot::new(lane, horse, self.stall_ticks[lane - 1] > 0))
                .collect(),
            outcome: self.outcome.clone(),
            last_event: self.events.last().cloned(),
        }
    }
}

/// Read-only view of a race for drawing a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub status: RaceStatus,
    pub track_length: u32,
    pub terrain: Terrain,
    pub ticks: u32,
    /// Occupied lanes only, in lane order
    pub horses: Vec<HorseSnapshot>,
    pub outcome: Option<RaceOutcome>,
    pub last_event: Option<RaceEvent>,
}
