use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cemantix_common::Config;
use cemantix_sim::{EmbeddingTable, HiddenWordGame};
use cemantix_solver::infra::Vocabulary;
use cemantix_solver::sim_adapter::similarity_model;
use cemantix_solver::store::FileFeedbackStore;
use cemantix_solver::{ExplorerConfig, Solver, StrategistConfig};

#[derive(Parser)]
#[command(name = "cemantix", about = "Cooperative solver for the cemantix word game")]
struct Cli {
    /// Number of explorer workers
    #[arg(long)]
    explorers: Option<usize>,

    /// Word list explorers draw from
    #[arg(long)]
    vocabulary: Option<PathBuf>,

    /// Sorted lexicon used for spelling variants
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// word2vec text model
    #[arg(long)]
    model: Option<PathBuf>,

    /// Directory for shared feedback files
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Hidden word for the simulated game (random if omitted)
    #[arg(long)]
    target: Option<String>,

    /// Seed for every random choice
    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(n) = self.explorers {
            config.explorers = n;
        }
        if let Some(path) = &self.vocabulary {
            config.vocabulary_path = path.clone();
        }
        if let Some(path) = &self.lexicon {
            config.lexicon_path = path.clone();
        }
        if let Some(path) = &self.model {
            config.model_path = Some(path.clone());
        }
        if let Some(dir) = &self.store_dir {
            config.store_dir = dir.clone();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "cemantix=info",
        1 => "cemantix=debug",
        _ => "cemantix=trace",
    };
    let filter = EnvFilter::from_default_env().add_directive(level.parse()?);
    if cli.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    config.validate()?;
    config.log_summary();

    let model_path = config
        .model_path
        .clone()
        .ok_or_else(|| anyhow!("No embedding model: set CEMANTIX_MODEL or pass --model"))?;
    let table = tokio::task::spawn_blocking(move || EmbeddingTable::load(&model_path))
        .await
        .context("Model loading task failed")??;
    let table = Arc::new(table);

    let vocabulary = Arc::new(Vocabulary::load(&config.vocabulary_path).await?);
    let lexicon = Arc::new(Vocabulary::load(&config.lexicon_path).await?);

    let game = match &cli.target {
        Some(word) => HiddenWordGame::new(table.clone(), word)?,
        None => {
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            HiddenWordGame::random(table.clone(), vocabulary.words(), &mut rng)?
        }
    };
    info!(target_len = game.target().chars().count(), "Hidden word chosen");

    let store = FileFeedbackStore::open(&config.store_dir).await?;

    let explorer_config = ExplorerConfig {
        publish_every: config.publish_every,
        filler_word: config.filler_word.clone(),
        seed: config.seed,
        ..ExplorerConfig::default()
    };
    let mut strategist_config = StrategistConfig {
        filler_word: config.filler_word.clone(),
        seed: config.seed,
        ..StrategistConfig::default()
    };
    strategist_config.generator.max_neighbors = config.max_neighbors;

    let report = Solver::new(
        Arc::new(game),
        Arc::new(store),
        similarity_model(table),
        vocabulary,
        lexicon,
    )
    .with_explorers(config.explorers)
    .with_explorer_config(explorer_config)
    .with_strategist_config(strategist_config)
    .run()
    .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
