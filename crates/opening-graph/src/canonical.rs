//! Position canonicalization and legality-checked move replay.

use serde::{Deserialize, Serialize};
use shakmaty::{
    fen::Fen,
    san::{San, SanPlus},
    Chess, EnPassantMode, Position,
};
use std::fmt;

use crate::error::ReplayError;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A FEN with the halfmove clock and fullmove number stripped.
///
/// Two positions that differ only in their move counters share one key,
/// which is what merges transpositions onto a single node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn from_fen(fen: &str) -> Self {
        Self(normalize_fen(fen))
    }

    pub fn from_position(pos: &Chess) -> Self {
        Self::from_fen(&full_fen(pos))
    }

    /// Key of the standard initial position.
    pub fn starting() -> Self {
        Self::from_fen(STARTING_FEN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips move counters from FEN, keeping only position + side + castling + ep.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Canonical key of a position.
pub fn canonicalize(pos: &Chess) -> CanonicalKey {
    CanonicalKey::from_position(pos)
}

/// Full FEN (with counters) of a position.
pub fn full_fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Apply a single SAN move to `pos`.
///
/// Returns the resulting position and the move's normalized SAN (check
/// suffixes and annotation glyphs removed). `ply` is only used for error
/// reporting.
pub fn play_san(pos: &Chess, ply: usize, san_text: &str) -> Result<(Chess, String), ReplayError> {
    let trimmed = san_text.trim();

    let san_plus: SanPlus = trimmed.parse().map_err(|e| ReplayError::InvalidSan {
        ply,
        san: trimmed.to_string(),
        reason: format!("{e}"),
    })?;

    let mv = san_plus.san.to_move(pos).map_err(|e| ReplayError::IllegalMove {
        ply,
        san: trimmed.to_string(),
        reason: format!("{e}"),
    })?;

    let normalized = San::from_move(pos, mv.clone()).to_string();

    let mut next = pos.clone();
    next.play_unchecked(mv);

    Ok((next, normalized))
}

/// Replay a move sequence from the standard initial position.
pub fn replay<S: AsRef<str>>(moves: &[S]) -> Result<Chess, ReplayError> {
    let mut pos = Chess::default();
    for (ply, san) in moves.iter().enumerate() {
        let (next, _) = play_san(&pos, ply, san.as_ref())?;
        pos = next;
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fen() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        let normalized = normalize_fen(fen);
        assert_eq!(normalized, "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq -");
    }

    #[test]
    fn test_keys_ignore_move_counters() {
        let a = CanonicalKey::from_fen("8/8/8/8/8/8/8/K6k w - - 0 1");
        let b = CanonicalKey::from_fen("8/8/8/8/8/8/8/K6k w - - 37 92");
        assert_eq!(a, b);

        let other_side = CanonicalKey::from_fen("8/8/8/8/8/8/8/K6k b - - 0 1");
        assert_ne!(a, other_side);
    }

    #[test]
    fn test_starting_key_matches_default_position() {
        assert_eq!(canonicalize(&Chess::default()), CanonicalKey::starting());
    }

    #[test]
    fn test_transposition_reaches_same_key() {
        let a = replay(&["Nf3", "Nf6", "g3"]).unwrap();
        let b = replay(&["g3", "Nf6", "Nf3"]).unwrap();
        assert_eq!(canonicalize(&a), canonicalize(&b));
        assert_eq!(canonicalize(&a).as_str().split(' ').count(), 4);
    }

    #[test]
    fn test_play_san_normalizes_check_suffix() {
        let pos = replay(&["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6"]).unwrap();
        let (_, san) = play_san(&pos, 6, "Qxf7#").unwrap();
        assert_eq!(san, "Qxf7");
    }

    #[test]
    fn test_replay_castling_and_en_passant() {
        let pos = replay(&["e4", "Nf6", "e5", "d5", "exd6", "e6", "Nf3", "Be7", "Bc4", "O-O", "O-O"]).unwrap();
        let key = canonicalize(&pos);
        assert_eq!(
            key.as_str(),
            "rnbq1rk1/ppp1bppp/3Ppn2/8/2B5/5N2/PPPP1PPP/RNBQ1RK1 b - -"
        );
    }

    #[test]
    fn test_replay_rejects_illegal_move() {
        let err = replay(&["e4", "e5", "Ke3"]).unwrap_err();
        assert!(matches!(err, ReplayError::IllegalMove { ply: 2, .. }));

        let err = replay(&["e4", "XYZ"]).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidSan { ply: 1, .. }));
    }
}
