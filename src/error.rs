//! Error types for race setup and betting.
//!
//! Nothing on the tick path returns an error; everything here is raised while
//! building a race, loading a setup file, or placing a wager.

use thiserror::Error;

/// Smallest number of lanes a race can be built with
pub const MIN_LANES: usize = 2;
/// Largest number of lanes a race can be built with
pub const MAX_LANES: usize = 6;

#[derive(Debug, Error)]
pub enum RaceError {
    #[error("need between 2 and 6 lanes, got {0}")]
    InvalidLaneCount(usize),

    #[error("track length must be at least 1")]
    InvalidTrackLength,

    #[error("race has no horses in any lane")]
    NoHorses,

    #[error("invalid bet: {0}")]
    InvalidBet(String),

    #[error("invalid race setup: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RaceError>;

/// Validate a lane count against the supported range
pub fn validate_lane_count(count: usize) -> Result<()> {
    if !(MIN_LANES..=MAX_LANES).contains(&count) {
        return Err(RaceError::InvalidLaneCount(count));
    }
    Ok(())
}

/// Validate a track length
pub fn validate_track_length(length: u32) -> Result<()> {
    if length == 0 {
        return Err(RaceError::InvalidTrackLength);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_lane_count_valid() {
        for count in MIN_LANES..=MAX_LANES {
            assert!(validate_lane_count(count).is_ok());
        }
    }

    #[test]
    fn test_validate_lane_count_invalid() {
        assert!(matches!(validate_lane_count(0), Err(RaceError::InvalidLaneCount(0))));
        assert!(matches!(validate_lane_count(1), Err(RaceError::InvalidLaneCount(1))));
        assert!(matches!(validate_lane_count(7), Err(RaceError::InvalidLaneCount(7))));
    }

    #[test]
    fn test_validate_track_length() {
        assert!(validate_track_length(1).is_ok());
        assert!(matches!(validate_track_length(0), Err(RaceError::InvalidTrackLength)));
    }

    #[test]
    fn test_error_display() {
        let err = RaceError::InvalidLaneCount(9);
        assert_eq!(err.to_string(), "need between 2 and 6 lanes, got 9");
        let err = RaceError::InvalidBet("amount must be positive".to_string());
        assert!(err.to_string().contains("invalid bet"));
    }
}
