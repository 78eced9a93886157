#![allow(dead_code)]

use opening_graph::{GameInput, ImportSettings, LookupService, OpeningGraph, Outcome, PlayerColor};
use std::sync::Arc;

/// Build a game from space-separated SAN.
pub fn game(moves: &str, outcome: Outcome, color: PlayerColor) -> GameInput {
    GameInput::new(moves.split_whitespace().map(String::from).collect(), outcome, color)
}

pub fn rated(moves: &str, outcome: Outcome, color: PlayerColor, rating: u32) -> GameInput {
    game(moves, outcome, color).with_opponent_rating(rating)
}

/// Split "e4 e5 Nf3" into a move list.
pub fn line(moves: &str) -> Vec<String> {
    moves.split_whitespace().map(String::from).collect()
}

pub fn lookup() -> Arc<LookupService> {
    Arc::new(LookupService::builtin())
}

pub async fn build(owner: &str, games: Vec<GameInput>) -> OpeningGraph {
    OpeningGraph::build(owner, lookup(), ImportSettings::default(), games, 2).await
}
