//! Opening identities, the ECO/name table, and the shared lookup service.
//!
//! The table is loaded from a bincode file once per [`LookupService`]. Every
//! graph built against the same service shares the table and its memoized
//! key lookups. Use `cargo run --bin build-openings` to generate the file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::OnceCell;

use crate::canonical::{self, CanonicalKey};
use crate::error::{OpeningDbError, ReplayError};

pub const UNKNOWN_OPENING: &str = "Unknown Opening";
pub const UNCOMMON_OPENING: &str = "Uncommon Opening";

/// Default path to the binary opening table.
pub const OPENING_DB_PATH: &str = "data/openings.bin";

/// Names for the first ply when nothing better is known.
const FIRST_MOVE_NAMES: &[(&str, &str)] = &[
    ("e4", "King's Pawn Game"),
    ("d4", "Queen's Pawn Game"),
    ("c4", "English Opening"),
    ("Nf3", "Zukertort Opening"),
    ("f4", "Bird's Opening"),
    ("g3", "Hungarian Opening"),
    ("b3", "Nimzo-Larsen Attack"),
    ("b4", "Polish Opening"),
];

/// Table used when the opening file can't be loaded: (eco, name, moves).
const BUILTIN_OPENINGS: &[(&str, &str, &str)] = &[
    ("B20", "Sicilian Defense", "e4 c5"),
    ("C00", "French Defense", "e4 e6"),
    ("C50", "Italian Game", "e4 e5 Nf3 Nc6 Bc4"),
    ("C60", "Ruy Lopez", "e4 e5 Nf3 Nc6 Bb5"),
    ("D06", "Queen's Gambit", "d4 d5 c4"),
];

/// The (ECO, name) pair associated with a position.
///
/// Fallback identities carry no ECO code. [`OpeningIdentity::unknown`] is
/// the explicit "nothing matched" value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningIdentity {
    pub eco: Option<String>,
    pub name: String,
    pub representative_moves: Option<String>,
}

impl OpeningIdentity {
    pub fn new(eco: impl Into<String>, name: impl Into<String>, moves: impl Into<String>) -> Self {
        Self {
            eco: Some(eco.into()),
            name: name.into(),
            representative_moves: Some(moves.into()),
        }
    }

    pub fn unknown() -> Self {
        Self {
            eco: None,
            name: UNKNOWN_OPENING.to_string(),
            representative_moves: None,
        }
    }

    /// Fallback name for a game's first ply.
    pub fn first_move(san: &str) -> Self {
        let name = FIRST_MOVE_NAMES
            .iter()
            .find(|(mv, _)| *mv == san)
            .map(|(_, name)| *name)
            .unwrap_or(UNCOMMON_OPENING);

        Self {
            eco: None,
            name: name.to_string(),
            representative_moves: Some(san.to_string()),
        }
    }
}

/// One row of the opening table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningEntry {
    pub eco: String,
    pub name: String,
    pub moves: String,
}

impl OpeningEntry {
    pub fn identity(&self) -> OpeningIdentity {
        OpeningIdentity::new(&self.eco, &self.name, &self.moves)
    }
}

/// Canonical key -> opening entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpeningTable {
    entries: HashMap<CanonicalKey, OpeningEntry>,
}

impl OpeningTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The small table of common openings used when no file is available.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (eco, name, moves) in BUILTIN_OPENINGS {
            if let Err(e) = table.insert_line(eco, name, moves) {
                tracing::error!(eco, error = %e, "Built-in opening line does not replay");
            }
        }
        table
    }

    /// Insert an entry. An existing entry for the same key is kept.
    pub fn insert(&mut self, key: CanonicalKey, entry: OpeningEntry) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    /// Replay a space-separated SAN line and insert its final position.
    pub fn insert_line(&mut self, eco: &str, name: &str, moves: &str) -> Result<bool, ReplayError> {
        let sans: Vec<&str> = moves.split_whitespace().collect();
        let pos = canonical::replay(&sans)?;
        Ok(self.insert(
            canonical::canonicalize(&pos),
            OpeningEntry {
                eco: eco.to_string(),
                name: name.to_string(),
                moves: moves.to_string(),
            },
        ))
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&OpeningEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load the table from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OpeningDbError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let table: OpeningTable = bincode::deserialize_from(reader)?;
        Ok(table)
    }

    /// Save the table to a binary file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), OpeningDbError> {
        let file = File::create(path)?;
        bincode::serialize_into(file, self)?;
        Ok(())
    }
}

/// Shared, lazily loaded opening lookup.
///
/// `ensure_loaded` runs the load at most once; concurrent first callers
/// await the same in-flight load. After that, lookups are synchronous and
/// memoized per key (misses included).
#[derive(Debug)]
pub struct LookupService {
    path: Option<PathBuf>,
    table: OnceCell<OpeningTable>,
    cache: RwLock<HashMap<CanonicalKey, Option<OpeningIdentity>>>,
}

impl LookupService {
    /// Service backed by a table file, loaded on first `ensure_loaded`.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            table: OnceCell::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Service with an already loaded table.
    pub fn with_table(table: OpeningTable) -> Self {
        Self {
            path: None,
            table: OnceCell::new_with(Some(table)),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Service using only the built-in table.
    pub fn builtin() -> Self {
        Self::with_table(OpeningTable::builtin())
    }

    /// Load the table if it hasn't been loaded yet.
    ///
    /// A missing or corrupt file falls back to the built-in table.
    pub async fn ensure_loaded(&self) -> &OpeningTable {
        self.table
            .get_or_init(|| async {
                let Some(path) = self.path.clone() else {
                    return OpeningTable::builtin();
                };

                let loaded = tokio::task::spawn_blocking({
                    let path = path.clone();
                    move || OpeningTable::load(path)
                })
                .await;

                match loaded {
                    Ok(Ok(table)) => {
                        tracing::info!(
                            path = %path.display(),
                            entries = table.len(),
                            "Loaded opening table"
                        );
                        table
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("Failed to load opening table from {}: {}", path.display(), e);
                        tracing::warn!("Falling back to built-in opening table");
                        OpeningTable::builtin()
                    }
                    Err(e) => {
                        tracing::warn!("Opening table load task failed: {}", e);
                        OpeningTable::builtin()
                    }
                }
            })
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.table.initialized()
    }

    /// Exact lookup of a canonical key.
    ///
    /// Before the table is loaded every key misses; those misses are not
    /// memoized.
    pub fn lookup(&self, key: &CanonicalKey) -> Option<OpeningIdentity> {
        let table = self.table.get()?;

        if let Ok(cache) = self.cache.read() {
            if let Some(hit) = cache.get(key) {
                return hit.clone();
            }
        }

        let resolved = table.get(key).map(OpeningEntry::identity);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.clone(), resolved.clone());
        }
        resolved
    }

    /// Number of memoized keys.
    pub fn cached_keys(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}
