//! Horse Race - lane-based horse race simulator
//!
//! Provides the simulation core (horses, lanes, the per-tick movement and fall
//! rule, finish detection) and a session server that front ends drive one tick
//! at a time.
//!
//! # Example
//!
//! ```
//! use horse_race::{Horse, Race};
//! use rand::SeedableRng;
//!
//! let mut race = Race::with_track(10, 2).unwrap();
//! race.add_horse(Horse::new('T', "Thunder", 0.7), 1);
//! race.add_horse(Horse::new('L', "Lightning", 0.8), 2);
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let outcome = race.run_to_completion_bounded(&mut rng, 10_000).unwrap();
//! println!("{outcome:?}");
//! ```

pub mod error;
pub mod game_server;

pub use error::{RaceError, Result};
pub use game_server::{
    Bet, BetResult, ConsoleRenderer, Horse, HorseEntry, Race, RaceConfig, RaceOutcome, RaceServer,
    RaceSetup, RaceSnapshot, RaceStatus, Renderer, SimulationRules, Terrain,
};

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence over `default_level`. Calling this twice is
/// harmless.
pub fn init_logging(default_level: log::LevelFilter) {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level.as_str()),
    )
    .format_timestamp(None)
    .try_init();
}
