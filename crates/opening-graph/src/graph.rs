//! Both color graphs of one player, plus the read-only query surface.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::canonical::{self, CanonicalKey};
use crate::color_graph::ColorGraph;
use crate::edge::MoveEdge;
use crate::game::{GameInput, GameRecord, ImportSettings, PlayerColor};
use crate::node::{self, Outcome, PositionNode};
use crate::opening::{LookupService, OpeningIdentity};

/// An outgoing move annotated with its destination's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSummary {
    pub san: String,
    pub from_key: CanonicalKey,
    pub to_key: CanonicalKey,
    pub game_count: usize,
    pub total_games: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub win_rate: f64,
    pub avg_opponent_rating: f64,
    pub opening: Option<OpeningIdentity>,
}

impl MoveSummary {
    fn new(edge: &MoveEdge, dest: Option<&PositionNode>) -> Self {
        Self {
            san: edge.san().to_string(),
            from_key: edge.from().clone(),
            to_key: edge.to().clone(),
            game_count: edge.game_count(),
            total_games: dest.map_or(0, PositionNode::total_games),
            wins: dest.map_or(0, PositionNode::wins),
            losses: dest.map_or(0, PositionNode::losses),
            draws: dest.map_or(0, PositionNode::draws),
            win_rate: dest.map_or(0.0, PositionNode::win_rate),
            avg_opponent_rating: dest.map_or(0.0, PositionNode::avg_opponent_rating),
            opening: dest.and_then(PositionNode::opening).cloned(),
        }
    }
}

/// A [`MoveSummary`] tagged with the color graph it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildMove {
    pub color: PlayerColor,
    #[serde(flatten)]
    pub summary: MoveSummary,
}

/// Outcome counts of one color at a position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideStats {
    pub total_games: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub win_rate: f64,
    pub avg_opponent_rating: f64,
}

impl From<&PositionNode> for SideStats {
    fn from(node: &PositionNode) -> Self {
        Self {
            total_games: node.total_games(),
            wins: node.wins(),
            losses: node.losses(),
            draws: node.draws(),
            win_rate: node.win_rate(),
            avg_opponent_rating: node.avg_opponent_rating(),
        }
    }
}

/// One position seen from both colors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedNode {
    pub key: CanonicalKey,
    pub opening: Option<OpeningIdentity>,
    pub white: Option<SideStats>,
    pub black: Option<SideStats>,
}

/// Position reached by replaying a move sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub fen: String,
    pub key: CanonicalKey,
}

/// Totals for one color graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorStats {
    pub games: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    pub win_rate: f64,
    pub positions: usize,
    pub edges: usize,
}

impl ColorStats {
    fn of(graph: &ColorGraph) -> Self {
        let count = |outcome: Outcome| graph.games().iter().filter(|g| g.outcome == outcome).count();
        let games = graph.game_count();
        let wins = count(Outcome::Win);

        Self {
            games,
            wins,
            losses: count(Outcome::Loss),
            draws: count(Outcome::Draw),
            win_rate: node::win_rate(wins as u32, games as u32),
            positions: graph.nodes().len(),
            edges: graph.edges().len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub owner: String,
    pub white: ColorStats,
    pub black: ColorStats,
}

/// A player's opening graph: one [`ColorGraph`] per color.
///
/// Ingestion is single-writer; callers serialize `add_game` calls. All
/// query methods are pure reads and return empty/`None` for positions that
/// were never visited.
#[derive(Debug, Clone)]
pub struct OpeningGraph {
    owner: String,
    settings: ImportSettings,
    created_at: DateTime<Utc>,
    white: ColorGraph,
    black: ColorGraph,
}

impl OpeningGraph {
    pub fn new(owner: impl Into<String>, lookup: Arc<LookupService>, settings: ImportSettings) -> Self {
        Self {
            owner: owner.into(),
            white: ColorGraph::new(PlayerColor::White, lookup.clone(), &settings),
            black: ColorGraph::new(PlayerColor::Black, lookup, &settings),
            settings,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn from_parts(
        owner: String,
        settings: ImportSettings,
        created_at: DateTime<Utc>,
        white: ColorGraph,
        black: ColorGraph,
    ) -> Self {
        Self {
            owner,
            settings,
            created_at,
            white,
            black,
        }
    }

    /// Build a graph from scratch.
    ///
    /// Waits for the opening table once, then ingests every game, yielding
    /// to the runtime every `yield_every` games. Dropping the future
    /// abandons the partial graph.
    pub async fn build<I>(
        owner: impl Into<String>,
        lookup: Arc<LookupService>,
        settings: ImportSettings,
        games: I,
        yield_every: usize,
    ) -> Self
    where
        I: IntoIterator<Item = GameInput>,
    {
        lookup.ensure_loaded().await;

        let mut graph = Self::new(owner, lookup, settings);
        let mut seen = 0usize;

        for game in games {
            graph.add_game(game);
            seen += 1;
            if yield_every > 0 && seen % yield_every == 0 {
                tokio::task::yield_now().await;
            }
        }

        let stats = graph.overall_stats();
        tracing::info!(
            owner = %graph.owner,
            seen,
            white_games = stats.white.games,
            black_games = stats.black.games,
            white_positions = stats.white.positions,
            black_positions = stats.black.positions,
            cached_openings = graph.white.lookup().cached_keys(),
            "Built opening graph"
        );

        graph
    }

    /// Route a game to its color graph. Games filtered out by the import
    /// settings, empty games and games offered before the opening table is
    /// loaded return `None`.
    pub fn add_game(&mut self, game: GameInput) -> Option<usize> {
        if !self.settings.accepts(game.color) {
            return None;
        }
        self.color_graph_mut(game.color).add_game(game)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn color_graph(&self, color: PlayerColor) -> &ColorGraph {
        match color {
            PlayerColor::White => &self.white,
            PlayerColor::Black => &self.black,
        }
    }

    fn color_graph_mut(&mut self, color: PlayerColor) -> &mut ColorGraph {
        match color {
            PlayerColor::White => &mut self.white,
            PlayerColor::Black => &mut self.black,
        }
    }

    /// Outgoing moves after `moves` in one color graph, most played first.
    /// Ties keep edge creation order.
    pub fn moves_from_position<S: AsRef<str>>(&self, moves: &[S], color: PlayerColor) -> Vec<MoveSummary> {
        let Some(key) = key_after(moves) else {
            return Vec::new();
        };

        let graph = self.color_graph(color);
        let mut summaries: Vec<MoveSummary> = graph
            .edges_from(&key)
            .map(|edge| MoveSummary::new(edge, graph.node(edge.to())))
            .collect();

        // Sort by game count (most played first)
        summaries.sort_by(|a, b| b.game_count.cmp(&a.game_count));
        summaries
    }

    /// First moves of one color graph.
    pub fn root_moves(&self, color: PlayerColor) -> Vec<MoveSummary> {
        self.moves_from_position::<&str>(&[], color)
    }

    /// Replay `moves` from the initial position. Any illegal move yields
    /// `None`, never a partial position.
    pub fn position_after_moves<S: AsRef<str>>(&self, moves: &[S]) -> Option<PositionView> {
        let pos = canonical::replay(moves).ok()?;
        Some(PositionView {
            fen: canonical::full_fen(&pos),
            key: canonical::canonicalize(&pos),
        })
    }

    /// White's moves followed by black's, each tagged with its color.
    pub fn child_positions<S: AsRef<str>>(&self, moves: &[S]) -> Vec<ChildMove> {
        PlayerColor::BOTH
            .iter()
            .flat_map(|&color| {
                self.moves_from_position(moves, color)
                    .into_iter()
                    .map(move |summary| ChildMove { color, summary })
            })
            .collect()
    }

    /// Both colors' view of one position. The opening identity comes from
    /// white if it has one, else black.
    pub fn node(&self, key: &CanonicalKey) -> Option<MergedNode> {
        let white = self.white.node(key);
        let black = self.black.node(key);
        if white.is_none() && black.is_none() {
            return None;
        }

        let opening = white
            .and_then(PositionNode::opening)
            .or_else(|| black.and_then(PositionNode::opening))
            .cloned();

        Some(MergedNode {
            key: key.clone(),
            opening,
            white: white.map(SideStats::from),
            black: black.map(SideStats::from),
        })
    }

    /// Game records that passed through the position after `moves`.
    pub fn games_for_position<S: AsRef<str>>(&self, moves: &[S], color: PlayerColor) -> Vec<&GameRecord> {
        let Some(key) = key_after(moves) else {
            return Vec::new();
        };

        let graph = self.color_graph(color);
        graph
            .node(&key)
            .map(|node| {
                node.game_indices()
                    .iter()
                    .filter_map(|&idx| graph.game(idx))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn overall_stats(&self) -> OverallStats {
        OverallStats {
            owner: self.owner.clone(),
            white: ColorStats::of(&self.white),
            black: ColorStats::of(&self.black),
        }
    }
}

fn key_after<S: AsRef<str>>(moves: &[S]) -> Option<CanonicalKey> {
    canonical::replay(moves).ok().map(|pos| canonical::canonicalize(&pos))
}
