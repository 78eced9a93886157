pub mod health;
pub mod opening_graph;

use axum::{routing::{get, post}, Router};

use crate::store::GraphStore;

/// All routes, generic over the graph store backend.
pub fn router<S: GraphStore>() -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/opening-graph/{owner}/import", post(opening_graph::import_games::<S>))
        .route("/api/opening-graph/{owner}/stats", get(opening_graph::get_stats::<S>))
        .route("/api/opening-graph/{owner}/root-moves", get(opening_graph::get_root_moves::<S>))
        .route("/api/opening-graph/{owner}/children", get(opening_graph::get_children::<S>))
        .route("/api/opening-graph/{owner}/moves", get(opening_graph::get_moves::<S>))
        .route("/api/opening-graph/{owner}/position", get(opening_graph::get_position::<S>))
        .route("/api/opening-graph/{owner}/games", get(opening_graph::get_games::<S>))
        .route("/api/opening-graph/{owner}/node", get(opening_graph::get_node::<S>))
}
