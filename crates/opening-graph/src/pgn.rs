//! PGN game source.
//!
//! Turns a PGN collection into [`GameInput`]s from the point of view of one
//! tracked player. Headers are read with regexes; movetext goes through
//! `pgn-reader` so comments and (nested) variations never reach the main line.

use pgn_reader::{Reader, SanPlus, Skip, Visitor};
use regex::Regex;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::LazyLock;

use crate::canonical::STARTING_FEN;
use crate::game::{GameInput, GameMetadata, PlayerColor};
use crate::node::Outcome;
use crate::opening::OpeningIdentity;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).expect("valid header regex"));
static GAME_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\[Event\s").expect("valid event regex"));

/// Headers consumed by the parser rather than passed through as metadata.
const CONSUMED_HEADERS: &[&str] = &["White", "Black", "Result", "WhiteElo", "BlackElo", "SetUp", "FEN"];

/// Parse every game in `pgn` that `player` took part in.
///
/// Games by other players, games with an unfinished result and games
/// from a non-standard start position are skipped.
pub fn parse_games(pgn: &str, player: &str) -> Vec<GameInput> {
    split_games(pgn)
        .into_iter()
        .filter_map(|game| parse_game(game, player))
        .collect()
}

/// Split a PGN collection at each `[Event` header.
pub fn split_games(pgn: &str) -> Vec<&str> {
    let starts: Vec<usize> = GAME_START_RE.find_iter(pgn).map(|m| m.start()).collect();
    if starts.is_empty() {
        return if pgn.trim().is_empty() { Vec::new() } else { vec![pgn] };
    }

    let mut games = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(pgn.len());
        games.push(&pgn[start..end]);
    }
    games
}

/// Parse a single PGN game for `player`.
pub fn parse_game(pgn: &str, player: &str) -> Option<GameInput> {
    let headers: BTreeMap<String, String> = HEADER_RE
        .captures_iter(pgn)
        .map(|cap| (cap[1].to_string(), cap[2].to_string()))
        .collect();

    // Filter non-standard positions
    if headers.get("SetUp").map(String::as_str) == Some("1") {
        if let Some(fen) = headers.get("FEN") {
            if fen != STARTING_FEN {
                return None;
            }
        }
    }

    let color = if header_is(&headers, "White", player) {
        PlayerColor::White
    } else if header_is(&headers, "Black", player) {
        PlayerColor::Black
    } else {
        return None;
    };

    let outcome = match (headers.get("Result").map(String::as_str)?, color) {
        ("1-0", PlayerColor::White) | ("0-1", PlayerColor::Black) => Outcome::Win,
        ("0-1", PlayerColor::White) | ("1-0", PlayerColor::Black) => Outcome::Loss,
        ("1/2-1/2", _) => Outcome::Draw,
        _ => return None,
    };

    let opponent_elo = match color {
        PlayerColor::White => "BlackElo",
        PlayerColor::Black => "WhiteElo",
    };
    let opponent_rating = headers
        .get(opponent_elo)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let moves = extract_moves(pgn);
    if moves.is_empty() {
        return None;
    }

    let mut game = GameInput::new(moves, outcome, color)
        .with_opponent_rating(opponent_rating)
        .with_metadata(metadata(&headers));
    if let Some(hint) = opening_hint(&headers) {
        game = game.with_opening_hint(hint);
    }
    Some(game)
}

fn header_is(headers: &BTreeMap<String, String>, name: &str, player: &str) -> bool {
    headers
        .get(name)
        .is_some_and(|v| v.eq_ignore_ascii_case(player.trim()))
}

/// Opening hint from the `Opening`/`ECO` headers, if the game names one.
fn opening_hint(headers: &BTreeMap<String, String>) -> Option<OpeningIdentity> {
    let name = headers.get("Opening").filter(|n| !n.is_empty())?;
    Some(OpeningIdentity {
        eco: headers.get("ECO").filter(|e| !e.is_empty()).cloned(),
        name: name.clone(),
        representative_moves: None,
    })
}

/// Every header the parser didn't consume, as a JSON object.
fn metadata(headers: &BTreeMap<String, String>) -> GameMetadata {
    let passthrough: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .filter(|(k, _)| !CONSUMED_HEADERS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
    GameMetadata::from_json(&serde_json::Value::Object(passthrough))
}

/// Collects the main line's SAN tokens, skipping variations.
struct MainLine;

impl Visitor for MainLine {
    type Tags = ();
    type Movetext = Vec<String>;
    type Output = Vec<String>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, ()> {
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: ()) -> ControlFlow<Self::Output, Vec<String>> {
        ControlFlow::Continue(Vec::new())
    }

    fn begin_variation(&mut self, _moves: &mut Vec<String>) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, moves: &mut Vec<String>, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        moves.push(san_plus.to_string());
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, moves: Vec<String>) -> Self::Output {
        moves
    }
}

/// Main-line SAN moves of the first game in `pgn`. Headers, `{}` and `;`
/// comments, NAGs and variations are dropped.
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let mut reader = Reader::new(pgn.as_bytes());
    match reader.read_game(&mut MainLine) {
        Ok(Some(moves)) => moves,
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable movetext");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GAMES: &str = r#"[Event "Rated Blitz"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]
[WhiteElo "1500"]
[BlackElo "1600"]
[ECO "C50"]
[Opening "Italian Game"]
[Link "https://example.org/1"]

1. e4 e5 2. Nf3 {book} Nc6 (2... d6) 3. Bc4 1-0

[Event "Rated Blitz"]
[White "Carol"]
[Black "alice"]
[Result "1/2-1/2"]
[WhiteElo "?"]

1. d4 d5 2. c4 1/2-1/2
"#;

    #[test]
    fn test_parse_games_from_player_view() {
        let games = parse_games(TWO_GAMES, "ALICE");
        assert_eq!(games.len(), 2);

        let first = &games[0];
        assert_eq!(first.color, PlayerColor::White);
        assert_eq!(first.outcome, Outcome::Win);
        assert_eq!(first.opponent_rating, 1600);
        assert_eq!(first.moves, vec!["e4", "e5", "Nf3", "Nc6", "Bc4"]);
        let hint = first.opening_hint.as_ref().unwrap();
        assert_eq!(hint.eco.as_deref(), Some("C50"));
        assert_eq!(hint.name, "Italian Game");

        let meta = first.metadata.to_json().unwrap();
        assert_eq!(meta["Link"], "https://example.org/1");
        assert!(meta.get("WhiteElo").is_none());

        let second = &games[1];
        assert_eq!(second.color, PlayerColor::Black);
        assert_eq!(second.outcome, Outcome::Draw);
        assert_eq!(second.opponent_rating, 0);
        assert!(second.opening_hint.is_none());
    }

    #[test]
    fn test_skips_other_players_and_unfinished_games() {
        assert!(parse_games(TWO_GAMES, "dave").is_empty());

        let unfinished = "[White \"Alice\"]\n[Black \"Bob\"]\n[Result \"*\"]\n\n1. e4 *";
        assert!(parse_game(unfinished, "alice").is_none());
    }

    #[test]
    fn test_skips_custom_start_position() {
        let pgn = r#"[White "Alice"]
[Black "Bob"]
[Result "1-0"]
[SetUp "1"]
[FEN "8/8/8/8/8/8/8/K6k w - - 0 1"]

1. Ka2 1-0"#;
        assert!(parse_game(pgn, "alice").is_none());
    }

    #[test]
    fn test_single_game_without_event_header() {
        let pgn = "[White \"Alice\"]\n[Black \"Bob\"]\n[Result \"0-1\"]\n\n1. f3 e5 2. g4 Qh4# 0-1";
        let games = parse_games(pgn, "alice");
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].outcome, Outcome::Loss);
        assert_eq!(games[0].moves.last().map(String::as_str), Some("Qh4#"));
    }

    #[test]
    fn test_nested_variations_stay_off_main_line() {
        let moves = extract_moves("1. e4 e5 (1... c5 2. Nf3 (2. c3 d5) d6) 2. Nf3 Nc6 3. Bb5 1-0");
        assert_eq!(moves, vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);
    }

    #[test]
    fn test_line_comments_and_nags_are_ignored() {
        let moves = extract_moves("1. e4 ; also d4 is fine\ne5 $1 2. Nf3 {a comment} Nc6 *");
        assert_eq!(moves, vec!["e4", "e5", "Nf3", "Nc6"]);
    }

    #[test]
    fn test_extract_moves_castling_and_promotion() {
        let moves = extract_moves("1. e4 e5 2. O-O-O O-O 3. exd8=Q+ 1-0");
        assert_eq!(moves, vec!["e4", "e5", "O-O-O", "O-O", "exd8=Q+"]);
    }
}
