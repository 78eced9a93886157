//! Build the opening name table from ECO TSV files.
//!
//! Each file has a header row followed by `eco<TAB>name<TAB>pgn` rows (the
//! layout of the lichess chess-openings dataset). Every line is replayed and
//! its final position keyed to the (ECO, name) pair. The first row to reach
//! a position wins.
//!
//! Usage: cargo run --release --bin build-openings -- <tsv_dir> [--out data/openings.bin]

use opening_graph::canonical::{self, play_san};
use opening_graph::opening::{OpeningEntry, OpeningTable, OPENING_DB_PATH};
use pgn_reader::{Reader, SanPlus, Visitor};
use shakmaty::Chess;
use std::env;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Instant;

/// State during movetext parsing.
struct LineState {
    board: Chess,
    sans: Vec<String>,
    error: Option<String>,
}

/// Visitor that replays one opening line.
struct LineReplayer;

impl Visitor for LineReplayer {
    type Tags = ();
    type Movetext = LineState;
    type Output = Result<(Chess, Vec<String>), String>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, ()> {
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: ()) -> ControlFlow<Self::Output, LineState> {
        ControlFlow::Continue(LineState {
            board: Chess::default(),
            sans: Vec::new(),
            error: None,
        })
    }

    fn san(&mut self, state: &mut LineState, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        if state.error.is_some() {
            return ControlFlow::Continue(());
        }

        match play_san(&state.board, state.sans.len(), &san_plus.san.to_string()) {
            Ok((next, san)) => {
                state.board = next;
                state.sans.push(san);
            }
            Err(e) => state.error = Some(e.to_string()),
        }
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, state: LineState) -> Self::Output {
        match state.error {
            Some(e) => Err(e),
            None => Ok((state.board, state.sans)),
        }
    }
}

/// Replay a PGN movetext fragment like `1. e4 e5 2. Nf3`.
fn replay_line(pgn: &str) -> Result<(Chess, Vec<String>), String> {
    let mut reader = Reader::new(pgn.as_bytes());
    match reader.read_game(&mut LineReplayer) {
        Ok(Some(result)) => result,
        Ok(None) => Err("empty line".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[derive(Default)]
struct BuildStats {
    rows: u64,
    inserted: u64,
    duplicates: u64,
    rejected: u64,
}

fn ingest_file(path: &Path, table: &mut OpeningTable, stats: &mut BuildStats) -> anyhow::Result<()> {
    let reader = BufReader::new(File::open(path)?);

    // Skip header row
    for line in reader.lines().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stats.rows += 1;

        let mut cols = line.splitn(3, '\t');
        let (Some(eco), Some(name), Some(pgn)) = (cols.next(), cols.next(), cols.next()) else {
            eprintln!("  Skipping malformed row: {line}");
            stats.rejected += 1;
            continue;
        };

        let (board, sans) = match replay_line(pgn) {
            Ok(replayed) => replayed,
            Err(e) => {
                eprintln!("  Skipping {eco} {name}: {e}");
                stats.rejected += 1;
                continue;
            }
        };

        let entry = OpeningEntry {
            eco: eco.trim().to_string(),
            name: name.trim().to_string(),
            moves: sans.join(" "),
        };
        if table.insert(canonical::canonicalize(&board), entry) {
            stats.inserted += 1;
        } else {
            stats.duplicates += 1;
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <tsv_dir> [--out PATH]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --release --bin build-openings -- ../chess-openings/");
        std::process::exit(1);
    }

    let tsv_dir = &args[1];
    let mut out_path = OPENING_DB_PATH.to_string();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--out" => {
                if let Some(path) = args.get(i + 1) {
                    out_path = path.clone();
                }
                i += 2;
            }
            _ => i += 1,
        }
    }

    let pattern = format!("{}/*.tsv", tsv_dir);
    let mut tsv_files: Vec<_> = glob::glob(&pattern)?.filter_map(|p| p.ok()).collect();
    tsv_files.sort();

    if tsv_files.is_empty() {
        eprintln!("No TSV files found in {}", tsv_dir);
        std::process::exit(1);
    }

    println!("Found {} TSV files", tsv_files.len());

    let mut table = OpeningTable::new();
    let mut stats = BuildStats::default();
    let start = Instant::now();

    for path in &tsv_files {
        println!("Processing {}...", path.display());
        ingest_file(path, &mut table, &mut stats)?;
    }

    println!();
    println!("Parsing complete in {:.1}s", start.elapsed().as_secs_f64());
    println!("  Rows: {}", stats.rows);
    println!("  Inserted: {}", stats.inserted);
    println!("  Duplicate positions: {}", stats.duplicates);
    println!("  Rejected: {}", stats.rejected);

    // Ensure output directory exists
    if let Some(parent) = Path::new(&out_path).parent() {
        fs::create_dir_all(parent)?;
    }

    println!();
    println!("Writing to {}...", out_path);
    table.save(&out_path)?;

    let file_size = fs::metadata(&out_path)?.len();
    println!("Done! {} positions, {} KB", table.len(), file_size / 1024);

    Ok(())
}
