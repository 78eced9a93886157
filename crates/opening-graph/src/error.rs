//! Engine error types

use thiserror::Error;

/// A move that could not be replayed. Truncates ingestion of one game.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Invalid SAN '{san}' at ply {ply}: {reason}")]
    InvalidSan {
        ply: usize,
        san: String,
        reason: String,
    },

    #[error("Illegal move '{san}' at ply {ply}: {reason}")]
    IllegalMove {
        ply: usize,
        san: String,
        reason: String,
    },
}

/// Failure to load an opening table file.
#[derive(Error, Debug)]
pub enum OpeningDbError {
    #[error("Opening table I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Opening table decode error: {0}")]
    Decode(#[from] bincode::Error),
}

/// Failure to encode or decode a serialized opening graph.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Payload truncated: {0} bytes")]
    Truncated(usize),

    #[error("Not an opening graph payload")]
    BadMagic,

    #[error("Unsupported graph format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Graph payload error: {0}")]
    Payload(#[from] bincode::Error),
}
