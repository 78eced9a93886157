//! Binary storage format for [`OpeningGraph`].
//!
//! Layout: 4-byte magic, little-endian `u32` format version, then a bincode
//! payload holding flat node, edge and game-record lists per color.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::color_graph::ColorGraph;
use crate::edge::MoveEdge;
use crate::error::CodecError;
use crate::game::{GameRecord, ImportSettings, PlayerColor};
use crate::graph::OpeningGraph;
use crate::node::PositionNode;
use crate::opening::LookupService;

pub const MAGIC: &[u8; 4] = b"OGRF";
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

#[derive(Serialize)]
struct GraphPayloadRef<'a> {
    owner: &'a str,
    created_at: DateTime<Utc>,
    settings: &'a ImportSettings,
    white: ColorGraphRef<'a>,
    black: ColorGraphRef<'a>,
}

#[derive(Serialize)]
struct ColorGraphRef<'a> {
    color: PlayerColor,
    nodes: &'a [PositionNode],
    edges: &'a [MoveEdge],
    games: &'a [GameRecord],
}

impl<'a> From<&'a ColorGraph> for ColorGraphRef<'a> {
    fn from(graph: &'a ColorGraph) -> Self {
        Self {
            color: graph.color(),
            nodes: graph.nodes(),
            edges: graph.edges(),
            games: graph.games(),
        }
    }
}

// Field order must match the borrowed forms above.
#[derive(Deserialize)]
struct GraphPayload {
    owner: String,
    created_at: DateTime<Utc>,
    settings: ImportSettings,
    white: ColorGraphRecord,
    black: ColorGraphRecord,
}

#[derive(Deserialize)]
struct ColorGraphRecord {
    color: PlayerColor,
    nodes: Vec<PositionNode>,
    edges: Vec<MoveEdge>,
    games: Vec<GameRecord>,
}

impl ColorGraphRecord {
    fn into_graph(self, lookup: Arc<LookupService>, settings: &ImportSettings) -> ColorGraph {
        ColorGraph::from_parts(self.color, lookup, settings, self.nodes, self.edges, self.games)
    }
}

/// Serialize a graph for storage.
pub fn encode(graph: &OpeningGraph) -> Result<Vec<u8>, CodecError> {
    let payload = GraphPayloadRef {
        owner: graph.owner(),
        created_at: graph.created_at(),
        settings: graph.settings(),
        white: graph.color_graph(PlayerColor::White).into(),
        black: graph.color_graph(PlayerColor::Black).into(),
    };

    let mut bytes = Vec::with_capacity(HEADER_LEN);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bincode::serialize_into(&mut bytes, &payload)?;
    Ok(bytes)
}

/// Read the format version from a payload header without decoding it.
pub fn peek_version(bytes: &[u8]) -> Result<u32, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated(bytes.len()));
    }
    if &bytes[..4] != MAGIC {
        return Err(CodecError::BadMagic);
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..HEADER_LEN]);
    Ok(u32::from_le_bytes(version))
}

/// Restore a graph. The new graph resolves further openings through
/// `lookup`. An unknown version is rejected before the payload is read.
pub fn decode(bytes: &[u8], lookup: Arc<LookupService>) -> Result<OpeningGraph, CodecError> {
    let version = peek_version(bytes)?;
    if version != FORMAT_VERSION {
        tracing::warn!(found = version, expected = FORMAT_VERSION, "Rejecting graph payload");
        return Err(CodecError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let payload: GraphPayload = bincode::deserialize(&bytes[HEADER_LEN..])?;
    let white = payload.white.into_graph(lookup.clone(), &payload.settings);
    let black = payload.black.into_graph(lookup, &payload.settings);

    Ok(OpeningGraph::from_parts(
        payload.owner,
        payload.settings,
        payload.created_at,
        white,
        black,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameInput, GameMetadata};
    use crate::node::Outcome;

    fn sample() -> OpeningGraph {
        let mut graph = OpeningGraph::new("dave", Arc::new(LookupService::builtin()), ImportSettings::default());
        let games = [
            (vec!["e4", "c5", "Nf3"], Outcome::Win, PlayerColor::White, 1700),
            (vec!["e4", "e5", "Nf3", "Nc6", "Bc4"], Outcome::Draw, PlayerColor::White, 0),
            (vec!["d4", "Nf6", "c4"], Outcome::Loss, PlayerColor::Black, 2100),
        ];
        for (moves, outcome, color, rating) in games {
            let input = GameInput::new(moves.into_iter().map(String::from).collect(), outcome, color)
                .with_opponent_rating(rating)
                .with_metadata(GameMetadata::from_json(&serde_json::json!({"link": "x"})));
            graph.add_game(input);
        }
        graph
    }

    #[test]
    fn test_roundtrip_preserves_payload() {
        let graph = sample();
        let bytes = encode(&graph).unwrap();
        let restored = decode(&bytes, Arc::new(LookupService::builtin())).unwrap();

        assert_eq!(restored.overall_stats(), graph.overall_stats());
        assert_eq!(restored.settings(), graph.settings());
        for color in PlayerColor::BOTH {
            let (a, b) = (graph.color_graph(color), restored.color_graph(color));
            assert_eq!(a.nodes(), b.nodes());
            assert_eq!(a.edges(), b.edges());
            assert_eq!(a.games(), b.games());
        }
        assert_eq!(
            restored.root_moves(PlayerColor::White),
            graph.root_moves(PlayerColor::White)
        );
    }

    #[test]
    fn test_restored_graph_accepts_more_games() {
        let graph = sample();
        let mut restored = decode(&encode(&graph).unwrap(), Arc::new(LookupService::builtin())).unwrap();

        let idx = restored.add_game(GameInput::new(vec!["e4".into()], Outcome::Win, PlayerColor::White));
        assert_eq!(idx, Some(2));
        assert_eq!(restored.root_moves(PlayerColor::White)[0].game_count, 3);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());

        let err = decode(&bytes, Arc::new(LookupService::builtin())).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedVersion { found: 99, expected: FORMAT_VERSION }
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let lookup = Arc::new(LookupService::builtin());
        assert!(matches!(decode(b"OG", lookup.clone()), Err(CodecError::Truncated(2))));
        assert!(matches!(decode(b"NOPE\x01\0\0\0", lookup.clone()), Err(CodecError::BadMagic)));

        let mut bytes = encode(&sample()).unwrap();
        bytes.truncate(20);
        assert!(matches!(decode(&bytes, lookup), Err(CodecError::Payload(_))));
    }
}
