//! Position/move graph for the games of one color.

use shakmaty::Chess;
use std::collections::HashMap;
use std::sync::Arc;

use crate::canonical::{self, CanonicalKey};
use crate::edge::{EdgeKey, MoveEdge};
use crate::game::{GameInput, GameRecord, ImportSettings, PlayerColor};
use crate::node::{Outcome, PositionNode};
use crate::opening::{LookupService, OpeningIdentity};

/// Nodes, edges and game records for games where the tracked player had
/// one color.
///
/// Nodes and edges live in insertion-ordered arenas with hash indexes on
/// top. The root is the standard initial position. Nothing is ever removed;
/// when inputs change the graph is rebuilt from scratch.
#[derive(Debug, Clone)]
pub struct ColorGraph {
    color: PlayerColor,
    lookup: Arc<LookupService>,
    max_plies: usize,
    nodes: Vec<PositionNode>,
    node_index: HashMap<CanonicalKey, usize>,
    edges: Vec<MoveEdge>,
    edge_index: HashMap<EdgeKey, usize>,
    outgoing: HashMap<CanonicalKey, Vec<usize>>,
    games: Vec<GameRecord>,
}

impl ColorGraph {
    pub fn new(color: PlayerColor, lookup: Arc<LookupService>, settings: &ImportSettings) -> Self {
        Self {
            color,
            lookup,
            max_plies: settings.ply_limit(),
            nodes: Vec::new(),
            node_index: HashMap::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
            outgoing: HashMap::new(),
            games: Vec::new(),
        }
    }

    /// Rebuild a graph from previously serialized parts.
    pub(crate) fn from_parts(
        color: PlayerColor,
        lookup: Arc<LookupService>,
        settings: &ImportSettings,
        nodes: Vec<PositionNode>,
        edges: Vec<MoveEdge>,
        games: Vec<GameRecord>,
    ) -> Self {
        let mut graph = Self::new(color, lookup, settings);

        for node in nodes {
            graph.node_index.insert(node.key().clone(), graph.nodes.len());
            graph.nodes.push(node);
        }
        for edge in edges {
            let idx = graph.edges.len();
            graph.outgoing.entry(edge.from().clone()).or_default().push(idx);
            graph.edge_index.insert(edge.key(), idx);
            graph.edges.push(edge);
        }
        graph.games = games;

        graph
    }

    /// Replay one game into the graph.
    ///
    /// Returns the game's index, or `None` for an empty move list or while
    /// the opening table is still unloaded (identities resolved against an
    /// empty table would stick). A move that fails to parse or apply stops
    /// the replay at that ply; plies before it stay recorded.
    pub fn add_game(&mut self, game: GameInput) -> Option<usize> {
        if game.moves.is_empty() {
            return None;
        }
        if !self.lookup.is_loaded() {
            tracing::warn!(color = %self.color, "Opening table not loaded; game not ingested");
            return None;
        }

        let index = self.games.len();
        self.games.push(GameRecord {
            index,
            outcome: game.outcome,
            opponent_rating: game.opponent_rating,
            opening: game.opening_hint.clone(),
            metadata: game.metadata,
        });

        let root = CanonicalKey::starting();
        self.record_visit(&root, index, game.outcome, game.opponent_rating, None);

        let mut pos = Chess::default();
        let mut prev_key = root;
        let mut deepest_opening: Option<OpeningIdentity> = None;

        for (ply, san) in game.moves.iter().take(self.max_plies).enumerate() {
            let (next, san) = match canonical::play_san(&pos, ply, san) {
                Ok(played) => played,
                Err(e) => {
                    tracing::debug!(
                        color = %self.color,
                        game = index,
                        error = %e,
                        "Replay halted"
                    );
                    break;
                }
            };

            let key = canonical::canonicalize(&next);
            let opening = self.resolve_opening(&key, &prev_key, ply, &san);

            self.record_visit(&key, index, game.outcome, game.opponent_rating, Some(&opening));
            self.record_edge(&prev_key, &key, &san, index);

            deepest_opening = self.node(&key).and_then(|n| n.opening().cloned());
            pos = next;
            prev_key = key;
        }

        if game.opening_hint.is_none() {
            self.games[index].opening = deepest_opening;
        }

        Some(index)
    }

    /// Opening identity for a freshly reached position.
    ///
    /// Exact table match first, then the predecessor's identity, then the
    /// first-move name for ply 0, then "Unknown Opening". A node that
    /// already has an identity keeps it.
    fn resolve_opening(
        &self,
        key: &CanonicalKey,
        prev_key: &CanonicalKey,
        ply: usize,
        san: &str,
    ) -> OpeningIdentity {
        if let Some(existing) = self.node(key).and_then(PositionNode::opening) {
            return existing.clone();
        }

        if let Some(exact) = self.lookup.lookup(key) {
            return exact;
        }

        if ply > 0 {
            if let Some(inherited) = self.node(prev_key).and_then(PositionNode::opening) {
                return inherited.clone();
            }
        } else {
            return OpeningIdentity::first_move(san);
        }

        OpeningIdentity::unknown()
    }

    /// Get-or-create the node for `key` and record the game into it once.
    fn record_visit(
        &mut self,
        key: &CanonicalKey,
        game_index: usize,
        outcome: Outcome,
        opponent_rating: u32,
        opening: Option<&OpeningIdentity>,
    ) {
        let idx = match self.node_index.get(key) {
            Some(&idx) => idx,
            None => {
                let idx = self.nodes.len();
                self.nodes.push(PositionNode::new(key.clone()));
                self.node_index.insert(key.clone(), idx);
                idx
            }
        };

        let node = &mut self.nodes[idx];
        // A game that revisits a position (repetition) counts once.
        if !node.last_game_is(game_index) {
            node.record_result(game_index, outcome, opponent_rating, opening);
        }
    }

    fn record_edge(&mut self, from: &CanonicalKey, to: &CanonicalKey, san: &str, game_index: usize) {
        let key = EdgeKey {
            from: from.clone(),
            to: to.clone(),
        };

        let idx = match self.edge_index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.edges.len();
                self.edges.push(MoveEdge::new(from.clone(), to.clone(), san));
                self.outgoing.entry(from.clone()).or_default().push(idx);
                self.edge_index.insert(key, idx);
                idx
            }
        };

        self.edges[idx].record(game_index);
    }

    pub fn color(&self) -> PlayerColor {
        self.color
    }

    pub fn lookup(&self) -> &Arc<LookupService> {
        &self.lookup
    }

    pub fn node(&self, key: &CanonicalKey) -> Option<&PositionNode> {
        self.node_index.get(key).map(|&idx| &self.nodes[idx])
    }

    /// The initial-position node, once at least one game was ingested.
    pub fn root(&self) -> Option<&PositionNode> {
        self.node(&CanonicalKey::starting())
    }

    pub fn edge(&self, from: &CanonicalKey, to: &CanonicalKey) -> Option<&MoveEdge> {
        let key = EdgeKey {
            from: from.clone(),
            to: to.clone(),
        };
        self.edge_index.get(&key).map(|&idx| &self.edges[idx])
    }

    /// Outgoing edges of a position in creation order.
    pub fn edges_from<'a>(&'a self, key: &CanonicalKey) -> impl Iterator<Item = &'a MoveEdge> + 'a {
        self.outgoing
            .get(key)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.edges[idx])
    }

    pub fn nodes(&self) -> &[PositionNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[MoveEdge] {
        &self.edges
    }

    pub fn games(&self) -> &[GameRecord] {
        &self.games
    }

    pub fn game(&self, index: usize) -> Option<&GameRecord> {
        self.games.get(index)
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }
}
