use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalKey;
use crate::opening::OpeningIdentity;

/// Result of a game from the tracked player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

/// Aggregate statistics for one canonical position.
///
/// `total_games == wins + losses + draws` always holds, and `win_rate` is
/// recomputed on every recorded result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionNode {
    key: CanonicalKey,
    total_games: u32,
    wins: u32,
    losses: u32,
    draws: u32,
    win_rate: f64,
    avg_opponent_rating: f64,
    rated_games: u32,
    opening: Option<OpeningIdentity>,
    game_indices: Vec<usize>,
}

impl PositionNode {
    pub fn new(key: CanonicalKey) -> Self {
        Self {
            key,
            total_games: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            win_rate: 0.0,
            avg_opponent_rating: 0.0,
            rated_games: 0,
            opening: None,
            game_indices: Vec::new(),
        }
    }

    /// Record one game passing through this position.
    ///
    /// A rating of 0 means unrated and leaves the average untouched. The
    /// opening identity is only taken if none is set yet.
    pub fn record_result(
        &mut self,
        game_index: usize,
        outcome: Outcome,
        opponent_rating: u32,
        opening: Option<&OpeningIdentity>,
    ) {
        self.game_indices.push(game_index);
        self.total_games += 1;
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Draw => self.draws += 1,
        }
        self.win_rate = win_rate(self.wins, self.total_games);

        if opponent_rating > 0 {
            self.rated_games += 1;
            self.avg_opponent_rating +=
                (opponent_rating as f64 - self.avg_opponent_rating) / self.rated_games as f64;
        }

        if self.opening.is_none() {
            self.opening = opening.cloned();
        }
    }

    /// Whether `game_index` was the last game recorded here.
    pub(crate) fn last_game_is(&self, game_index: usize) -> bool {
        self.game_indices.last() == Some(&game_index)
    }

    pub fn key(&self) -> &CanonicalKey {
        &self.key
    }

    pub fn total_games(&self) -> u32 {
        self.total_games
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    pub fn draws(&self) -> u32 {
        self.draws
    }

    /// Percentage of games won, 0-100.
    pub fn win_rate(&self) -> f64 {
        self.win_rate
    }

    /// Mean rating of rated opponents, 0 if none were rated.
    pub fn avg_opponent_rating(&self) -> f64 {
        self.avg_opponent_rating
    }

    pub fn opening(&self) -> Option<&OpeningIdentity> {
        self.opening.as_ref()
    }

    pub fn game_indices(&self) -> &[usize] {
        &self.game_indices
    }
}

/// 100 * wins / games, or 0 with no games.
pub fn win_rate(wins: u32, games: u32) -> f64 {
    if games > 0 {
        wins as f64 * 100.0 / games as f64
    } else {
        0.0
    }
}
