//! Betting - a single wager on one lane
//!
//! Odds are fixed when the bet is placed at `1 / confidence` of the chosen
//! horse. Settlement only reads the race outcome.

use serde::{Deserialize, Serialize};

use crate::error::{RaceError, Result};
use crate::game_server::race::{Race, RaceOutcome};

/// Decimal odds for a horse with the given confidence
pub fn odds_for(confidence: f64) -> Result<f64> {
    if !(confidence > 0.0 && confidence <= 1.0) {
        return Err(RaceError::InvalidBet(format!(
            "no odds for confidence {confidence:.2}"
        )));
    }
    Ok(1.0 / confidence)
}

/// A wager on the horse in one lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    /// 1-based lane
    pub lane: usize,
    pub horse_name: String,
    pub amount: f64,
    pub odds: f64,
}

/// Settled bet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BetResult {
    Won { payout: f64 },
    Lost { stake: f64 },
}

impl Bet {
    /// Place a bet on a lane of a race that has not started yet
    pub fn place(race: &Race, lane: usize, amount: f64) -> Result<Self> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(RaceError::InvalidBet(format!(
                "amount must be a positive number, got {amount}"
            )));
        }
        let horse = race
            .horse(lane)
            .ok_or_else(|| RaceError::InvalidBet(format!("no horse in lane {lane}")))?;
        let odds = odds_for(horse.confidence())?;

        log::info!(
            "Bet of {:.2} on {} (lane {}) at odds {:.2}",
            amount,
            horse.name(),
            lane,
            odds
        );
        Ok(Self {
            lane,
            horse_name: horse.name().to_string(),
            amount,
            odds,
        })
    }

    pub fn potential_payout(&self) -> f64 {
        self.amount * self.odds
    }

    pub fn settle(&self, outcome: &RaceOutcome) -> BetResult {
        if outcome.winning_lane() == Some(self.lane) {
            BetResult::Won {
                payout: self.potential_payout(),
            }
        } else {
            BetResult::Lost { stake: self.amount }
        }
    }
}
