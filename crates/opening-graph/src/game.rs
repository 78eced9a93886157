use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::node::Outcome;
use crate::opening::OpeningIdentity;

/// The side the tracked player had in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    pub const BOTH: [PlayerColor; 2] = [PlayerColor::White, PlayerColor::Black];

    pub fn as_str(self) -> &'static str {
        match self {
            PlayerColor::White => "white",
            PlayerColor::Black => "black",
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" | "w" => Ok(PlayerColor::White),
            "black" | "b" => Ok(PlayerColor::Black),
            other => Err(format!("Color must be 'white' or 'black', got '{other}'")),
        }
    }
}

/// Caller-supplied data attached to a game. Stored and returned verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameMetadata(Vec<u8>);

impl GameMetadata {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        Self(serde_json::to_vec(value).unwrap_or_default())
    }

    /// Interpret the bytes as JSON, if they are.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        if self.0.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.0).ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One game as delivered by a game source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInput {
    pub moves: Vec<String>, // SAN notation
    pub outcome: Outcome,
    pub color: PlayerColor,
    #[serde(default)]
    pub opponent_rating: u32, // 0 = unknown
    #[serde(default)]
    pub opening_hint: Option<OpeningIdentity>,
    #[serde(default)]
    pub metadata: GameMetadata,
}

impl GameInput {
    pub fn new(moves: Vec<String>, outcome: Outcome, color: PlayerColor) -> Self {
        Self {
            moves,
            outcome,
            color,
            opponent_rating: 0,
            opening_hint: None,
            metadata: GameMetadata::default(),
        }
    }

    pub fn with_opponent_rating(mut self, rating: u32) -> Self {
        self.opponent_rating = rating;
        self
    }

    pub fn with_opening_hint(mut self, hint: OpeningIdentity) -> Self {
        self.opening_hint = Some(hint);
        self
    }

    pub fn with_metadata(mut self, metadata: GameMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An ingested game, addressed by its ordinal index within a color graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub index: usize,
    pub outcome: Outcome,
    pub opponent_rating: u32,
    pub opening: Option<OpeningIdentity>,
    pub metadata: GameMetadata,
}

/// Settings that shape a graph build. Changing them requires a full rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    /// Stop replaying each game after this many plies.
    pub max_plies: Option<usize>,
    /// Only ingest games played with this color.
    pub only_color: Option<PlayerColor>,
}

impl ImportSettings {
    pub fn accepts(&self, color: PlayerColor) -> bool {
        self.only_color.map_or(true, |only| only == color)
    }

    pub fn ply_limit(&self) -> usize {
        self.max_plies.unwrap_or(usize::MAX)
    }
}
