use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalKey;

/// Composite index key for a transition between two positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: CanonicalKey,
    pub to: CanonicalKey,
}

/// Aggregate record of every game that moved from one position to another.
///
/// Different plies that connect the same pair of positions share one edge;
/// the SAN is the one seen first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEdge {
    from: CanonicalKey,
    to: CanonicalKey,
    san: String,
    game_indices: Vec<usize>,
}

impl MoveEdge {
    pub fn new(from: CanonicalKey, to: CanonicalKey, san: impl Into<String>) -> Self {
        Self {
            from,
            to,
            san: san.into(),
            game_indices: Vec::new(),
        }
    }

    /// Append a game; a game already recorded last is not added twice.
    pub fn record(&mut self, game_index: usize) {
        if self.game_indices.last() != Some(&game_index) {
            self.game_indices.push(game_index);
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }

    pub fn from(&self) -> &CanonicalKey {
        &self.from
    }

    pub fn to(&self) -> &CanonicalKey {
        &self.to
    }

    pub fn san(&self) -> &str {
        &self.san
    }

    pub fn game_indices(&self) -> &[usize] {
        &self.game_indices
    }

    pub fn game_count(&self) -> usize {
        self.game_indices.len()
    }
}
