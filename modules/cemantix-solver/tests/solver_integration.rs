// End-to-end: the full solver against the simulated game with a file-backed store.

use std::sync::Arc;
use std::time::Duration;

use cemantix_sim::{EmbeddingTable, HiddenWordGame};
use cemantix_solver::infra::{RetryPolicy, Vocabulary};
use cemantix_solver::sim_adapter::similarity_model;
use cemantix_solver::store::FileFeedbackStore;
use cemantix_solver::traits::FeedbackStore;
use cemantix_solver::{ExplorerConfig, Solver, StrategistConfig};

fn table() -> Arc<EmbeddingTable> {
    Arc::new(
        EmbeddingTable::from_pairs([
            ("chat", vec![1.0, 0.0, 0.0]),
            ("chats", vec![0.98, 0.05, 0.1]),
            ("félin", vec![0.95, 0.3, 0.0]),
            ("chaton", vec![0.9, 0.1, 0.4]),
            ("tigre", vec![0.8, 0.5, 0.2]),
            ("chien", vec![0.5, 0.8, 0.0]),
            ("loup", vec![0.3, 0.9, 0.1]),
            ("avion", vec![-0.8, 0.1, 0.5]),
            ("train", vec![-0.6, -0.2, 0.7]),
            ("table", vec![0.0, -0.5, 0.8]),
            ("nuage", vec![-0.3, 0.3, -0.9]),
        ])
        .unwrap(),
    )
}

fn explorer_config() -> ExplorerConfig {
    ExplorerConfig {
        publish_every: 1,
        hold_interval: Duration::from_millis(5),
        guess_delay: Duration::from_millis(1),
        retry: RetryPolicy::immediate(3),
        seed: Some(17),
        ..ExplorerConfig::default()
    }
}

fn strategist_config() -> StrategistConfig {
    StrategistConfig {
        empty_batch_backoff: Duration::from_millis(2),
        max_backoff: Duration::from_millis(10),
        guess_delay: Duration::ZERO,
        retry: RetryPolicy::immediate(3),
        seed: Some(23),
        ..StrategistConfig::default()
    }
}

/// Explorers never see the hidden word; only the strategist can reach it.
fn explorer_vocabulary() -> Arc<Vocabulary> {
    Arc::new(Vocabulary::from_words([
        "félin", "chaton", "tigre", "chien", "loup", "avion", "train", "table", "nuage",
    ]))
}

fn lexicon() -> Arc<Vocabulary> {
    let mut words: Vec<String> = table().words().to_vec();
    words.sort();
    Arc::new(Vocabulary::from_words(words))
}

#[tokio::test]
async fn solver_finds_the_hidden_word() {
    let dir = tempfile::tempdir().unwrap();
    let table = table();
    let game = HiddenWordGame::new(table.clone(), "chat").unwrap();
    let store = Arc::new(FileFeedbackStore::open(dir.path()).await.unwrap());

    let solver = Solver::new(
        Arc::new(game),
        store.clone(),
        similarity_model(table),
        explorer_vocabulary(),
        lexicon(),
    )
    .with_explorers(2)
    .with_explorer_config(explorer_config())
    .with_strategist_config(strategist_config());

    let report = tokio::time::timeout(Duration::from_secs(20), solver.run())
        .await
        .expect("solver should finish")
        .unwrap();

    assert_eq!(report.solution.word.as_deref(), Some("chat"));
    assert_eq!(report.explorers.len(), 2);
    assert!(report.solution.guesses >= 1);

    // Every worker cleaned up after itself.
    assert!(store.aggregate().await.is_empty());
    assert!(store.tried().await.unwrap().is_empty());
}

#[tokio::test]
async fn explorer_finding_the_word_hands_it_to_the_strategist() {
    let dir = tempfile::tempdir().unwrap();
    let table = table();
    let game = HiddenWordGame::new(table.clone(), "nuage").unwrap();
    let store = Arc::new(FileFeedbackStore::open(dir.path()).await.unwrap());

    // The strategist's model knows nothing, so the word can only arrive
    // through an explorer's published feedback.
    let empty_model = Arc::new(EmbeddingTable::from_pairs(Vec::<(String, Vec<f32>)>::new()).unwrap());

    let solver = Solver::new(
        Arc::new(game),
        store.clone(),
        similarity_model(empty_model),
        explorer_vocabulary(),
        Arc::new(Vocabulary::default()),
    )
    .with_explorers(1)
    .with_explorer_config(explorer_config())
    .with_strategist_config(strategist_config());

    let report = tokio::time::timeout(Duration::from_secs(20), solver.run())
        .await
        .expect("solver should finish")
        .unwrap();

    assert_eq!(report.solution.word.as_deref(), Some("nuage"));
    assert_eq!(report.solution.found_by, Some(cemantix_common::SourceId(1)));
}
