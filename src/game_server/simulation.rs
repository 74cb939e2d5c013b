//! Simulation - race session driver
//!
//! Owns the race, the random number generator and an optional bet, and
//! provides the tick-by-tick interface a presentation layer drives from a
//! timer or a loop.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{RaceError, Result};
use crate::game_server::betting::{Bet, BetResult};
use crate::game_server::race::{Race, RaceOutcome, RaceSnapshot};
use crate::game_server::roster::RaceSetup;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Ready,
    Racing,
    Results,
}

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub ticks: u32,
    pub avg_tick_time_ms: f32,
    pub horse_count: u32,
    pub seed: u64,
    pub session_state: SessionState,
}

/// Main race server
pub struct RaceServer {
    /// Current session state
    state: SessionState,
    /// Active race (if any)
    race: Option<Race>,
    /// Generator every tick draws from
    rng: StdRng,
    /// Seed the generator was created from
    seed: u64,
    /// Wager placed before the start
    bet: Option<Bet>,
    /// Recent tick durations for averaging
    tick_times: Vec<f32>,
    /// Whether ticks advance the race
    running: bool,
}

impl RaceServer {
    const TICK_WINDOW: usize = 60;

    /// Create a new race server
    pub fn new() -> Self {
        let seed = rand::random();
        Self {
            state: SessionState::Idle,
            race: None,
            rng: StdRng::seed_from_u64(seed),
            seed,
            bet: None,
            tick_times: Vec::with_capacity(Self::TICK_WINDOW),
            running: false,
        }
    }

    /// Build a race from a setup. Reseeds from the setup's seed when given.
    pub fn init_race(&mut self, setup: &RaceSetup) -> Result<()> {
        let race = setup.build_race()?;
        self.seed = setup.seed.unwrap_or_else(rand::random);
        self.rng = StdRng::seed_from_u64(self.seed);

        log::info!(
            "Race initialized: {} units, {} lanes, {} terrain, seed {}",
            race.track_length(),
            race.lane_count(),
            race.config().terrain,
            self.seed
        );

        self.race = Some(race);
        self.bet = None;
        self.tick_times.clear();
        self.running = false;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Place a bet before the race starts
    pub fn place_bet(&mut self, lane: usize, amount: f64) -> Result<&Bet> {
        if self.state != SessionState::Ready {
            return Err(RaceError::InvalidBet("betting is closed".to_string()));
        }
        let race = self.race.as_ref().ok_or(RaceError::NoHorses)?;
        let bet = Bet::place(race, lane, amount)?;
        Ok(self.bet.insert(bet))
    }

    /// Reset the horses and start ticking
    pub fn start_race(&mut self) -> Result<()> {
        let race = self.race.as_mut().ok_or(RaceError::NoHorses)?;
        if !race.has_horses() {
            return Err(RaceError::NoHorses);
        }
        race.reset();
        self.state = SessionState::Racing;
        self.running = true;
        log::info!("Race started");
        Ok(())
    }

    /// Perform a single simulation tick
    pub fn tick(&mut self) -> Option<RaceSnapshot> {
        if !self.running {
            return self.get_snapshot();
        }

        let tick_start = Instant::now();

        if let Some(race) = &mut self.race {
            if race.tick(&mut self.rng).is_some() {
                self.state = SessionState::Results;
                self.running = false;
            }
        }

        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > Self::TICK_WINDOW {
            self.tick_times.remove(0);
        }

        self.get_snapshot()
    }

    /// Get current race snapshot
    pub fn get_snapshot(&self) -> Option<RaceSnapshot> {
        self.race.as_ref().map(Race::get_snapshot)
    }

    pub fn outcome(&self) -> Option<&RaceOutcome> {
        self.race.as_ref().and_then(Race::outcome)
    }

    pub fn race(&self) -> Option<&Race> {
        self.race.as_ref()
    }

    pub fn race_mut(&mut self) -> Option<&mut Race> {
        self.race.as_mut()
    }

    pub fn bet(&self) -> Option<&Bet> {
        self.bet.as_ref()
    }

    /// Settle the bet against the finished race
    pub fn settle_bet(&self) -> Option<BetResult> {
        let bet = self.bet.as_ref()?;
        let outcome = self.outcome()?;
        Some(bet.settle(outcome))
    }

    pub fn ticks(&self) -> u32 {
        self.race.as_ref().map(Race::ticks).unwrap_or(0)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Get server statistics
    pub fn get_stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        ServerStats {
            ticks: self.ticks(),
            avg_tick_time_ms: avg_tick_time,
            horse_count: self
                .race
                .as_ref()
                .map(|r| r.horses().count() as u32)
                .unwrap_or(0),
            seed: self.seed,
            session_state: self.state,
        }
    }

    /// Get current session state
    pub fn get_state(&self) -> SessionState {
        self.state
    }

    /// Put the same horses back on the line for another race.
    /// Confidence earned or lost in earlier races carries over.
    pub fn replay(&mut self) -> Result<()> {
        let race = self.race.as_mut().ok_or(RaceError::NoHorses)?;
        race.reset();
        self.bet = None;
        self.running = false;
        self.tick_times.clear();
        self.state = SessionState::Ready;
        log::info!("Race reset for a replay");
        Ok(())
    }

    /// Reset to idle state
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.race = None;
        self.bet = None;
        self.running = false;
        self.tick_times.clear();
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        if self.state == SessionState::Racing {
            self.running = true;
        }
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for RaceServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Race server behind a single lock; the tick driver is the only writer
pub type SharedRaceServer = Arc<Mutex<RaceServer>>;

/// Create a new shared race server
pub fn create_shared_server() -> SharedRaceServer {
    Arc::new(Mutex::new(RaceServer::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_server::race::SimulationRules;
    use crate::game_server::roster::HorseEntry;

    fn sure_setup() -> RaceSetup {
        RaceSetup {
            track_length: 4,
            lane_count: 2,
            rules: SimulationRules {
                fall_coefficient: 0.0,
                ..SimulationRules::default()
            },
            seed: Some(42),
            horses: vec![HorseEntry::new("Sure", 1.0), HorseEntry::new("Slow", 0.0)],
            ..RaceSetup::default()
        }
    }

    fn drive(server: &mut RaceServer) {
        while server.is_running() {
            server.tick();
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut server = RaceServer::new();
        assert_eq!(server.get_state(), SessionState::Idle);
        assert!(server.tick().is_none());

        server.init_race(&sure_setup()).unwrap();
        assert_eq!(server.get_state(), SessionState::Ready);
        assert_eq!(server.seed(), 42);

        server.start_race().unwrap();
        assert_eq!(server.get_state(), SessionState::Racing);
        drive(&mut server);

        assert_eq!(server.get_state(), SessionState::Results);
        assert_eq!(server.ticks(), 4);
        assert_eq!(server.outcome().and_then(RaceOutcome::winning_lane), Some(1));
        let stats = server.get_stats();
        assert_eq!(stats.horse_count, 2);
        assert_eq!(stats.ticks, 4);
    }

    #[test]
    fn test_start_without_race_fails() {
        let mut server = RaceServer::new();
        assert!(matches!(server.start_race(), Err(RaceError::NoHorses)));
    }

    #[test]
    fn test_pause_and_resume() {
        let mut server = RaceServer::new();
        server.init_race(&sure_setup()).unwrap();
        server.start_race().unwrap();
        server.tick();
        server.pause();
        let snap = server.tick().unwrap();
        assert_eq!(snap.ticks, 1);

        server.resume();
        assert_eq!(server.tick().unwrap().ticks, 2);
    }

    #[test]
    fn test_bet_lifecycle() {
        let mut server = RaceServer::new();
        server.init_race(&sure_setup()).unwrap();
        let bet = server.place_bet(1, 50.0).unwrap();
        assert_eq!(bet.odds, 1.0);

        server.start_race().unwrap();
        assert!(server.place_bet(1, 10.0).is_err());
        drive(&mut server);
        assert_eq!(server.settle_bet(), Some(BetResult::Won { payout: 50.0 }));
    }

    #[test]
    fn test_replay_keeps_confidence() {
        let mut setup = sure_setup();
        setup.rules.fall_coefficient = 1.0;
        setup.horses = vec![HorseEntry::new("Wobbly", 1.0), HorseEntry::new("Shaky", 0.5)];

        let mut server = RaceServer::new();
        server.init_race(&setup).unwrap();
        server.start_race().unwrap();
        drive(&mut server);
        let before: Vec<f64> = server
            .race()
            .unwrap()
            .horses()
            .map(|(_, h)| h.confidence())
            .collect();

        server.replay().unwrap();
        assert_eq!(server.get_state(), SessionState::Ready);
        let race = server.race().unwrap();
        let after: Vec<f64> = race.horses().map(|(_, h)| h.confidence()).collect();
        assert_eq!(before, after);
        assert!(race.horses().all(|(_, h)| !h.has_fallen() && h.distance_travelled() == 0));
    }

    #[test]
    fn test_shared_server() {
        let shared = create_shared_server();
        let mut server = shared.lock().unwrap();
        server.init_race(&sure_setup()).unwrap();
        assert_eq!(server.get_stats().session_state, SessionState::Ready);
    }
}
