//! Tug-of-war duel between two players.
//!
//! Progress starts at the midpoint. Each input from the attacker pulls it up
//! by `step * difficulty`, each input from the defender pulls it down by the
//! same amount. Reaching 1 means the attacker wins, reaching 0 means the
//! defender wins. Difficulty is fixed at the start of the duel as the ratio of
//! the attacker's level to the defender's.

use arena_shared::DuelState;

const START_PROGRESS: f64 = 0.5;

/// Absorbs float drift so `0.5 + 5 * 0.1` still counts as reaching 1.
const PROGRESS_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Attacker,
    Defender,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DuelResolution {
    Continuing { progress: f64 },
    AttackerWon,
    DefenderWon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDuel {
    pub attacker: String,
    pub defender: String,
    progress: f64,
    difficulty: f64,
}

impl ActiveDuel {
    /// Levels are at least 1 by the player invariant; the `max` only guards
    /// against a caller passing raw zeros.
    pub fn new(attacker: String, defender: String, attacker_level: u32, defender_level: u32) -> Self {
        let difficulty = attacker_level.max(1) as f64 / defender_level.max(1) as f64;
        Self {
            attacker,
            defender,
            progress: START_PROGRESS,
            difficulty,
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    pub fn side_of(&self, player_id: &str) -> Option<Side> {
        if self.attacker == player_id {
            Some(Side::Attacker)
        } else if self.defender == player_id {
            Some(Side::Defender)
        } else {
            None
        }
    }

    pub fn involves(&self, player_id: &str) -> bool {
        self.side_of(player_id).is_some()
    }

    /// Applies one input from `side`, scaled by `step`.
    pub fn push(&mut self, side: Side, step: f64) -> DuelResolution {
        let delta = step * self.difficulty;
        let moved = match side {
            Side::Attacker => self.progress + delta,
            Side::Defender => self.progress - delta,
        };
        self.progress = moved.clamp(0.0, 1.0);

        if moved >= 1.0 - PROGRESS_EPSILON {
            self.progress = 1.0;
            DuelResolution::AttackerWon
        } else if moved <= PROGRESS_EPSILON {
            self.progress = 0.0;
            DuelResolution::DefenderWon
        } else {
            DuelResolution::Continuing {
                progress: self.progress,
            }
        }
    }

    pub fn view(&self) -> DuelState {
        DuelState {
            attacker_id: self.attacker.clone(),
            defender_id: self.defender.clone(),
            progress: self.progress,
        }
    }
}
