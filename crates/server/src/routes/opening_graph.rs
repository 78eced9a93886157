use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use opening_graph::{
    codec, pgn, CanonicalKey, GameInput, GameMetadata, GameRecord, LookupService, OpeningGraph,
    OpeningIdentity, Outcome, PlayerColor,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::store::GraphStore;

#[derive(Deserialize)]
pub struct PositionQuery {
    /// Comma or space separated SAN moves from the initial position.
    pub moves: Option<String>,
    pub color: Option<String>,
}

impl PositionQuery {
    fn move_list(&self) -> Vec<String> {
        self.moves
            .as_deref()
            .unwrap_or("")
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    fn required_color(&self) -> Result<PlayerColor, AppError> {
        self.color
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Color must be 'white' or 'black'".into()))?
            .parse()
            .map_err(AppError::BadRequest)
    }
}

#[derive(Deserialize)]
pub struct NodeQuery {
    pub key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportGame {
    pub moves: Vec<String>,
    pub outcome: Outcome,
    pub color: PlayerColor,
    pub opponent_rating: Option<u32>,
    pub opening: Option<OpeningIdentity>,
    pub metadata: Option<JsonValue>,
}

impl From<ImportGame> for GameInput {
    fn from(game: ImportGame) -> Self {
        let mut input = GameInput::new(game.moves, game.outcome, game.color)
            .with_opponent_rating(game.opponent_rating.unwrap_or(0));
        if let Some(hint) = game.opening {
            input = input.with_opening_hint(hint);
        }
        if let Some(meta) = game.metadata {
            input = input.with_metadata(GameMetadata::from_json(&meta));
        }
        input
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    /// PGN collection, read from `player`'s point of view.
    pub pgn: Option<String>,
    pub player: Option<String>,
    pub games: Option<Vec<ImportGame>>,
    pub max_plies: Option<usize>,
    pub only_color: Option<PlayerColor>,
}

/// Load and decode an owner's graph. A missing owner is a 404.
async fn load_graph<S: GraphStore>(
    store: &S,
    lookup: &Arc<LookupService>,
    owner: &str,
) -> Result<OpeningGraph, AppError> {
    let bytes = store
        .get(owner)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No opening graph for '{owner}'")))?;

    lookup.ensure_loaded().await;
    Ok(codec::decode(&bytes, lookup.clone())?)
}

fn game_to_json(record: &GameRecord) -> JsonValue {
    serde_json::json!({
        "index": record.index,
        "outcome": record.outcome,
        "opponentRating": record.opponent_rating,
        "opening": record.opening,
        "metadata": record.metadata.to_json(),
    })
}

/// POST /api/opening-graph/{owner}/import
/// Rebuilds the owner's graph from scratch and stores it.
pub async fn import_games<S: GraphStore>(
    Extension(store): Extension<S>,
    Extension(lookup): Extension<Arc<LookupService>>,
    Extension(config): Extension<Config>,
    Path(owner): Path<String>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let mut games: Vec<GameInput> = Vec::new();

    if let Some(text) = req.pgn.as_deref() {
        let player = req
            .player
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("'player' is required with 'pgn'".into()))?;
        games.extend(pgn::parse_games(text, player));
    }
    if let Some(list) = req.games {
        games.extend(list.into_iter().map(GameInput::from));
    }
    if games.is_empty() {
        return Err(AppError::BadRequest("No games to import".into()));
    }

    let mut settings = config.import_settings();
    if req.max_plies.is_some() {
        settings.max_plies = req.max_plies;
    }
    settings.only_color = req.only_color;

    let submitted = games.len();
    let graph = OpeningGraph::build(
        owner.clone(),
        lookup,
        settings,
        games,
        config.import_yield_every,
    )
    .await;

    let bytes = codec::encode(&graph)?;
    store.put(&owner, &bytes).await?;
    tracing::info!(owner = %owner, submitted, bytes = bytes.len(), "Stored opening graph");

    Ok(Json(serde_json::json!({
        "submitted": submitted,
        "stats": graph.overall_stats(),
    })))
}

/// GET /api/opening-graph/{owner}/stats
pub async fn get_stats<S: GraphStore>(
    Extension(store): Extension<S>,
    Extension(lookup): Extension<Arc<LookupService>>,
    Path(owner): Path<String>,
) -> Result<Json<JsonValue>, AppError> {
    let graph = load_graph(&store, &lookup, &owner).await?;
    Ok(Json(serde_json::json!(graph.overall_stats())))
}

/// GET /api/opening-graph/{owner}/root-moves?color=white
pub async fn get_root_moves<S: GraphStore>(
    Extension(store): Extension<S>,
    Extension(lookup): Extension<Arc<LookupService>>,
    Path(owner): Path<String>,
    Query(q): Query<PositionQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let color = q.required_color()?;
    let graph = load_graph(&store, &lookup, &owner).await?;

    Ok(Json(serde_json::json!({
        "color": color,
        "moves": graph.root_moves(color),
    })))
}

/// GET /api/opening-graph/{owner}/children?moves=e4,e5
pub async fn get_children<S: GraphStore>(
    Extension(store): Extension<S>,
    Extension(lookup): Extension<Arc<LookupService>>,
    Path(owner): Path<String>,
    Query(q): Query<PositionQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let moves = q.move_list();
    let graph = load_graph(&store, &lookup, &owner).await?;

    Ok(Json(serde_json::json!({
        "moves": moves,
        "children": graph.child_positions(&moves),
    })))
}

/// GET /api/opening-graph/{owner}/moves?moves=e4&color=black
pub async fn get_moves<S: GraphStore>(
    Extension(store): Extension<S>,
    Extension(lookup): Extension<Arc<LookupService>>,
    Path(owner): Path<String>,
    Query(q): Query<PositionQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let color = q.required_color()?;
    let moves = q.move_list();
    let graph = load_graph(&store, &lookup, &owner).await?;

    Ok(Json(serde_json::json!({
        "color": color,
        "moves": moves,
        "children": graph.moves_from_position(&moves, color),
    })))
}

/// GET /api/opening-graph/{owner}/position?moves=e4,e5
/// `position` is null when the sequence contains an illegal move.
pub async fn get_position<S: GraphStore>(
    Extension(store): Extension<S>,
    Extension(lookup): Extension<Arc<LookupService>>,
    Path(owner): Path<String>,
    Query(q): Query<PositionQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let moves = q.move_list();
    let graph = load_graph(&store, &lookup, &owner).await?;
    let position = graph.position_after_moves(&moves);
    let node = position.as_ref().and_then(|p| graph.node(&p.key));

    Ok(Json(serde_json::json!({
        "moves": moves,
        "position": position,
        "node": node,
    })))
}

/// GET /api/opening-graph/{owner}/games?moves=e4&color=white
pub async fn get_games<S: GraphStore>(
    Extension(store): Extension<S>,
    Extension(lookup): Extension<Arc<LookupService>>,
    Path(owner): Path<String>,
    Query(q): Query<PositionQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let color = q.required_color()?;
    let moves = q.move_list();
    let graph = load_graph(&store, &lookup, &owner).await?;

    let games: Vec<JsonValue> = graph
        .games_for_position(&moves, color)
        .into_iter()
        .map(game_to_json)
        .collect();

    Ok(Json(serde_json::json!({
        "color": color,
        "moves": moves,
        "total": games.len(),
        "games": games,
    })))
}

/// GET /api/opening-graph/{owner}/node?key=<canonical fen>
pub async fn get_node<S: GraphStore>(
    Extension(store): Extension<S>,
    Extension(lookup): Extension<Arc<LookupService>>,
    Path(owner): Path<String>,
    Query(q): Query<NodeQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let graph = load_graph(&store, &lookup, &owner).await?;
    let key = CanonicalKey::from_fen(&q.key);

    Ok(Json(serde_json::json!({
        "key": key,
        "node": graph.node(&key),
    })))
}
