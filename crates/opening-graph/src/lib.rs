//! Opening graph engine.
//!
//! Replays a player's games into per-color graphs of canonical positions,
//! aggregates outcomes per position and per move, names openings, and
//! serializes the result for storage.

pub mod canonical;
pub mod codec;
pub mod color_graph;
pub mod edge;
pub mod error;
pub mod game;
pub mod graph;
pub mod node;
pub mod opening;
pub mod pgn;

pub use canonical::{canonicalize, CanonicalKey};
pub use color_graph::ColorGraph;
pub use edge::{EdgeKey, MoveEdge};
pub use error::{CodecError, OpeningDbError, ReplayError};
pub use game::{GameInput, GameMetadata, GameRecord, ImportSettings, PlayerColor};
pub use graph::{ChildMove, ColorStats, MergedNode, MoveSummary, OpeningGraph, OverallStats, PositionView, SideStats};
pub use node::{Outcome, PositionNode};
pub use opening::{LookupService, OpeningEntry, OpeningIdentity, OpeningTable};
