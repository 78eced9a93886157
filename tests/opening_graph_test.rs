//! End-to-end tests: ingest whole game collections, query the graph, and
//! round-trip it through the storage codec.

mod common;

use common::{build, game, line, lookup, rated};
use opening_graph::{codec, pgn, CanonicalKey, CodecError, ImportSettings, OpeningGraph, Outcome, PlayerColor};

const PGN: &str = r#"[Event "Casual"]
[White "tester"]
[Black "Opponent1"]
[Result "1-0"]
[BlackElo "1450"]
[Site "https://example.org/g/1"]

1. e4 c5 2. Nf3 d6 3. d4 cxd4 1-0

[Event "Casual"]
[White "Opponent2"]
[Black "Tester"]
[Result "1-0"]
[WhiteElo "1700"]

1. d4 d5 2. c4 e6 1-0

[Event "Casual"]
[White "tester"]
[Black "Opponent3"]
[Result "1/2-1/2"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 1/2-1/2
"#;

#[tokio::test]
async fn test_root_counts_every_ingested_game() {
    let g = build(
        "alice",
        vec![
            game("e4 e5 Nf3", Outcome::Win, PlayerColor::White),
            game("e4 c5", Outcome::Loss, PlayerColor::White),
            game("d4 d5 c4", Outcome::Draw, PlayerColor::White),
            game("", Outcome::Win, PlayerColor::White),
            game("e4 e5", Outcome::Loss, PlayerColor::Black),
        ],
    )
    .await;

    let white = g.color_graph(PlayerColor::White);
    let root = white.root().unwrap();
    assert_eq!(root.total_games(), 3);
    assert_eq!((root.wins(), root.losses(), root.draws()), (1, 1, 1));

    let first_moves: usize = g.root_moves(PlayerColor::White).iter().map(|m| m.game_count).sum();
    assert_eq!(first_moves, 3);

    let stats = g.overall_stats();
    assert_eq!(stats.white.games, 3);
    assert_eq!(stats.black.games, 1);
    assert_eq!(stats.black.losses, 1);
}

#[tokio::test]
async fn test_every_node_keeps_counts_consistent() {
    let g = build(
        "alice",
        vec![
            rated("e4 e5 Nf3 Nc6 Bb5", Outcome::Win, PlayerColor::White, 1500),
            game("e4 c5 Nf3 d6", Outcome::Loss, PlayerColor::White),
            game("e4 e5 Nf3 Nf6", Outcome::Draw, PlayerColor::White),
            game("Nf3 Nf6 Ng1 Ng8 Nf3", Outcome::Win, PlayerColor::White),
            rated("d4 d5 c4 e6", Outcome::Loss, PlayerColor::Black, 1900),
            game("c4 e6 d4 d5", Outcome::Win, PlayerColor::Black),
            game("e4 e5 Ke3", Outcome::Draw, PlayerColor::Black),
        ],
    )
    .await;

    for color in PlayerColor::BOTH {
        let graph = g.color_graph(color);
        assert!(!graph.nodes().is_empty());

        for node in graph.nodes() {
            let total = node.total_games();
            assert_eq!(total, node.wins() + node.losses() + node.draws(), "{}", node.key());
            assert!(total > 0);
            assert_eq!(node.win_rate(), node.wins() as f64 * 100.0 / total as f64);
            assert!(node.total_games() as usize <= graph.game_count());
        }

        let root = graph.root().unwrap();
        assert_eq!(root.total_games() as usize, graph.game_count());
    }
}

#[tokio::test]
async fn test_transpositions_share_one_node() {
    let g = build(
        "alice",
        vec![
            game("d4 Nf6 c4 e6", Outcome::Win, PlayerColor::White),
            game("c4 e6 d4 Nf6", Outcome::Loss, PlayerColor::White),
        ],
    )
    .await;

    let a = g.position_after_moves(&line("d4 Nf6 c4 e6")).unwrap();
    let b = g.position_after_moves(&line("c4 e6 d4 Nf6")).unwrap();
    assert_eq!(a.key, b.key);
    assert_ne!(a.fen, b.fen);

    let node = g.color_graph(PlayerColor::White).node(&a.key).unwrap();
    assert_eq!(node.total_games(), 2);
    assert_eq!(node.win_rate(), 50.0);

    // Two distinct edges lead into it
    let incoming = g
        .color_graph(PlayerColor::White)
        .edges()
        .iter()
        .filter(|e| e.to() == &a.key)
        .count();
    assert_eq!(incoming, 2);
}

#[tokio::test]
async fn test_move_statistics_and_ratings() {
    let g = build(
        "alice",
        vec![
            rated("e4 e5", Outcome::Win, PlayerColor::White, 1400),
            rated("e4 c5", Outcome::Loss, PlayerColor::White, 1800),
            game("e4 c5", Outcome::Win, PlayerColor::White),
            rated("d4", Outcome::Draw, PlayerColor::White, 2000),
        ],
    )
    .await;

    let root = g.root_moves(PlayerColor::White);
    assert_eq!(root[0].san, "e4");
    assert_eq!(root[0].game_count, 3);
    assert_eq!(root[0].avg_opponent_rating, 1600.0);
    assert_eq!(root[1].san, "d4");

    let after_e4 = g.moves_from_position(&line("e4"), PlayerColor::White);
    assert_eq!(after_e4[0].san, "c5");
    assert_eq!(after_e4[0].game_count, 2);
    assert_eq!(after_e4[0].win_rate, 50.0);
    assert_eq!(after_e4[0].avg_opponent_rating, 1800.0);
    assert_eq!(after_e4[0].opening.as_ref().unwrap().name, "Sicilian Defense");

    assert!(g.moves_from_position(&line("e4 e5 Qh5"), PlayerColor::White).is_empty());
    assert!(g.moves_from_position(&line("e4 Ke7 Ke2"), PlayerColor::White).is_empty());
}

#[tokio::test]
async fn test_pgn_import_end_to_end() {
    let games = pgn::parse_games(PGN, "tester");
    assert_eq!(games.len(), 3);

    let g = build("tester", games).await;
    let stats = g.overall_stats();
    assert_eq!(stats.white.games, 2);
    assert_eq!(stats.black.games, 1);
    assert_eq!(stats.black.losses, 1);

    let sicilian = g.games_for_position(&line("e4 c5"), PlayerColor::White);
    assert_eq!(sicilian.len(), 1);
    assert_eq!(sicilian[0].opponent_rating, 1450);
    let meta = sicilian[0].metadata.to_json().unwrap();
    assert_eq!(meta["Site"], "https://example.org/g/1");

    let ruy = g.position_after_moves(&line("e4 e5 Nf3 Nc6 Bb5")).unwrap();
    let node = g.node(&ruy.key).unwrap();
    assert_eq!(node.opening.unwrap().eco.as_deref(), Some("C60"));
    assert!(node.black.is_none());

    // One-past-the-book positions keep the last named opening
    let after_a6 = g.position_after_moves(&line("e4 e5 Nf3 Nc6 Bb5 a6")).unwrap();
    assert_eq!(g.node(&after_a6.key).unwrap().opening.unwrap().name, "Ruy Lopez");
}

#[tokio::test]
async fn test_codec_round_trip_preserves_queries() {
    let original = build("tester", pgn::parse_games(PGN, "tester")).await;
    let bytes = codec::encode(&original).unwrap();
    assert_eq!(codec::peek_version(&bytes).unwrap(), codec::FORMAT_VERSION);

    let restored = codec::decode(&bytes, lookup()).unwrap();
    assert_eq!(restored.owner(), "tester");
    assert_eq!(restored.overall_stats(), original.overall_stats());

    for color in PlayerColor::BOTH {
        assert_eq!(restored.root_moves(color), original.root_moves(color));
        assert_eq!(
            restored.moves_from_position(&line("e4"), color),
            original.moves_from_position(&line("e4"), color)
        );
    }
    assert_eq!(
        restored.node(&CanonicalKey::starting()),
        original.node(&CanonicalKey::starting())
    );
}

#[tokio::test]
async fn test_codec_rejects_other_versions() {
    let g = OpeningGraph::new("bob", lookup(), ImportSettings::default());
    let mut bytes = codec::encode(&g).unwrap();
    bytes[4..8].copy_from_slice(&(codec::FORMAT_VERSION + 1).to_le_bytes());

    match codec::decode(&bytes, lookup()) {
        Err(CodecError::UnsupportedVersion { found, expected }) => {
            assert_eq!(found, codec::FORMAT_VERSION + 1);
            assert_eq!(expected, codec::FORMAT_VERSION);
        }
        other => panic!("expected version error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_only_color_and_ply_limit() {
    let settings = ImportSettings {
        max_plies: Some(2),
        only_color: Some(PlayerColor::Black),
    };
    let g = OpeningGraph::build(
        "carol",
        lookup(),
        settings,
        vec![
            game("e4 e5 Nf3 Nc6", Outcome::Win, PlayerColor::Black),
            game("d4 d5", Outcome::Win, PlayerColor::White),
        ],
        0,
    )
    .await;

    assert_eq!(g.overall_stats().white.games, 0);
    let black = g.color_graph(PlayerColor::Black);
    assert_eq!(black.game_count(), 1);
    // Root plus two plies
    assert_eq!(black.nodes().len(), 3);
    assert!(g.moves_from_position(&line("e4 e5"), PlayerColor::Black).is_empty());
}
