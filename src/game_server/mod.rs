//! Game Server Module
//!
//! The horse race simulation core plus the pieces a front end drives it with:
//! setup files, betting, frame rendering and a tick-driven session server.

pub mod betting;
pub mod horse;
pub mod race;
pub mod render;
pub mod roster;
pub mod simulation;
pub mod terrain;

pub use betting::{odds_for, Bet, BetResult};
pub use horse::{Horse, HorseSnapshot, Stride, StrideOutcome};
pub use race::{all_fallen, Race, RaceConfig, RaceEvent, RaceOutcome, RaceSnapshot, RaceStatus, SimulationRules};
pub use render::{ConsoleRenderer, Renderer};
pub use roster::{default_roster, HorseEntry, RaceSetup};
pub use simulation::{RaceServer, SessionState, ServerStats, SharedRaceServer};
pub use terrain::{Mishap, MishapKind, Terrain};
