//! Candidate generation: aggregated feedback in, ranked guesses out.
//!
//! Blends three sources of candidates, in priority order:
//! 1. semantic neighbours of the best words (basic, randomized, best-match),
//! 2. lexical variants of very close words.
//! A known winner short-circuits everything.

pub mod lexical;
pub mod resample;

use std::sync::{Arc, LazyLock};

use rand::Rng;
use regex::Regex;
use tracing::debug;

use cemantix_common::{AggregatedView, CandidateBatch, TriedSet};

use crate::infra::Vocabulary;
use crate::traits::SimilarityModel;

pub use lexical::lexical_neighbors;
pub use resample::resample;

/// Letters, whitespace and hyphens only.
static VALID_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s-]+$").expect("valid word regex"));

pub fn is_valid_word(word: &str) -> bool {
    VALID_WORD.is_match(word)
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Close words at or above this score also get lexical expansion.
    pub very_close_threshold: f64,
    /// Ceiling on neighbours per similarity query.
    pub max_neighbors: usize,
    /// Base retention probability for randomized resampling.
    pub retention_probability: f64,
    /// How many top close words form the "best few" exemplar set.
    pub best_match_count: usize,
    /// Lexicon lines scanned on each side of a very close word.
    pub lexical_window: usize,
    pub lexical_max_distance: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            very_close_threshold: 51.90,
            max_neighbors: 50,
            retention_probability: 0.75,
            best_match_count: 5,
            lexical_window: 10,
            lexical_max_distance: 2,
        }
    }
}

pub struct CandidateGenerator {
    model: Arc<dyn SimilarityModel>,
    lexicon: Arc<Vocabulary>,
    config: GeneratorConfig,
}

impl CandidateGenerator {
    pub fn new(model: Arc<dyn SimilarityModel>, lexicon: Arc<Vocabulary>, config: GeneratorConfig) -> Self {
        Self {
            model,
            lexicon,
            config,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Next guesses for cycle `try_count`, best first, never repeating a tried word.
    pub fn generate<R: Rng>(
        &self,
        view: &AggregatedView,
        tried: &TriedSet,
        try_count: u64,
        rng: &mut R,
    ) -> CandidateBatch {
        // A winner we already submitted is stale; keep generating.
        if let Some(winner) = view.winner() {
            if tried.contains(&winner.word) {
                debug!(word = winner.word.as_str(), source = %winner.source, "Ignoring tried winner");
            } else {
                debug!(word = winner.word.as_str(), source = %winner.source, "Winner already known");
                return CandidateBatch::singleton(winner.word.clone());
            }
        }

        let close = view.close_words();
        if close.len() == 1 && view.far.is_empty() {
            return self.finish(close, tried);
        }

        let lexical: Vec<String> = view
            .close
            .iter()
            .filter(|r| r.score >= self.config.very_close_threshold)
            .flat_map(|r| {
                lexical_neighbors(
                    &r.word,
                    &self.lexicon,
                    self.config.lexical_window,
                    self.config.lexical_max_distance,
                )
            })
            .collect();

        let mut ranked = self.semantic(view, try_count, rng);
        ranked.extend(lexical);
        self.finish(ranked, tried)
    }

    fn semantic<R: Rng>(&self, view: &AggregatedView, try_count: u64, rng: &mut R) -> Vec<String> {
        let close = view.close_words();
        if close.len() <= 1 {
            return close;
        }

        let top_n = usize::try_from(try_count)
            .unwrap_or(usize::MAX)
            .min(self.config.max_neighbors);
        let far = view.far_words();
        let cluster = view.top_cluster();
        let p = self.config.retention_probability;

        let mut basic = self.neighbors(&cluster, &far, top_n);
        basic.extend(self.neighbors(&cluster, &[], top_n));

        let mut randomized = self.neighbors(&resample(&close, p, rng), &[], top_n);
        let positive = resample(&close, p, rng);
        let negative = resample(&far, p, rng);
        randomized.extend(self.neighbors(&positive, &negative, top_n));
        randomized.extend(self.neighbors(&resample(&cluster, p, rng), &[], top_n));

        let best = &close[..1];
        let best_few = &close[..self.config.best_match_count.min(close.len())];
        let mut best_match = self.neighbors(best, &far, top_n);
        best_match.extend(self.neighbors(best, &[], top_n));
        best_match.extend(self.neighbors(best_few, &far, top_n));
        best_match.extend(self.neighbors(best_few, &[], top_n));

        debug!(
            try_count,
            top_n,
            cluster = cluster.len(),
            basic = basic.len(),
            randomized = randomized.len(),
            best_match = best_match.len(),
            "Semantic candidates"
        );

        let mut out = basic;
        out.extend(randomized);
        out.extend(best_match);
        out
    }

    /// Nearest neighbours with unknown exemplars dropped. No positives, no query.
    fn neighbors(&self, positive: &[String], negative: &[String], top_n: usize) -> Vec<String> {
        if top_n == 0 {
            return Vec::new();
        }
        let positive: Vec<String> = positive
            .iter()
            .filter(|w| self.model.contains(w))
            .cloned()
            .collect();
        if positive.is_empty() {
            return Vec::new();
        }
        let negative: Vec<String> = negative
            .iter()
            .filter(|w| self.model.contains(w))
            .cloned()
            .collect();
        self.model.most_similar(&positive, &negative, top_n)
    }

    fn finish(&self, ranked: Vec<String>, tried: &TriedSet) -> CandidateBatch {
        CandidateBatch::from_ranked(ranked.into_iter().filter(|w| is_valid_word(w)), tried)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cemantix_common::{ScoreRecord, SourceId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::testing::MockModel;

    fn rec(word: &str, score: f64) -> ScoreRecord {
        ScoreRecord::new(word, score, SourceId(1)).unwrap()
    }

    fn view(close: &[(&str, f64)], far: &[(&str, f64)]) -> AggregatedView {
        AggregatedView::merge(
            close.iter().map(|(w, s)| rec(w, *s)),
            far.iter().map(|(w, s)| rec(w, *s)),
        )
    }

    fn generator(model: Arc<MockModel>, lexicon: &[&str]) -> CandidateGenerator {
        CandidateGenerator::new(model, Arc::new(Vocabulary::from_words(lexicon)), GeneratorConfig::default())
    }

    #[test]
    fn winning_score_short_circuits() {
        let model = Arc::new(MockModel::new(&["chat", "chien"], &["félin"]));
        let gen = generator(model.clone(), &[]);
        let v = view(&[("chat", 100.0)], &[]);

        let batch = gen.generate(&v, &TriedSet::new(), 10, &mut StdRng::seed_from_u64(1));

        assert_eq!(batch.words(), &["chat".to_string()]);
        assert!(model.queries().is_empty());
    }

    #[test]
    fn winner_among_other_close_words_is_the_only_candidate() {
        let model = Arc::new(MockModel::new(&["chat", "chien"], &["félin"]));
        let gen = generator(model, &[]);
        let v = view(&[("chien", 70.0), ("chat", 100.0)], &[("avion", -10.0)]);

        let batch = gen.generate(&v, &TriedSet::new(), 10, &mut StdRng::seed_from_u64(1));

        assert_eq!(batch.words(), &["chat".to_string()]);
    }

    #[test]
    fn tried_winner_falls_back_to_normal_generation() {
        let model = Arc::new(MockModel::new(&["chat", "chien"], &["félin"]));
        let gen = generator(model.clone(), &[]);
        let v = view(&[("chat", 100.0), ("chien", 40.0)], &[("avion", -10.0)]);
        let mut tried = TriedSet::new();
        tried.insert("chat");

        let batch = gen.generate(&v, &tried, 10, &mut StdRng::seed_from_u64(1));

        assert!(!batch.contains("chat"));
        assert!(batch.contains("félin"));
        assert!(!model.queries().is_empty());
    }

    #[test]
    fn lone_tried_winner_yields_empty_batch() {
        let model = Arc::new(MockModel::new(&["chat"], &["félin"]));
        let gen = generator(model, &[]);
        let mut tried = TriedSet::new();
        tried.insert("Chat");

        let batch = gen.generate(&view(&[("chat", 100.0)], &[]), &tried, 10, &mut StdRng::seed_from_u64(1));

        assert!(batch.is_empty());
    }

    #[test]
    fn single_close_word_without_far_words_is_returned_as_is() {
        let model = Arc::new(MockModel::new(&["chien"], &["loup"]));
        let gen = generator(model.clone(), &[]);
        let v = view(&[("chien", 30.0)], &[]);

        let batch = gen.generate(&v, &TriedSet::new(), 5, &mut StdRng::seed_from_u64(1));

        assert_eq!(batch.words(), &["chien".to_string()]);
        assert!(model.queries().is_empty());
    }

    #[test]
    fn queries_best_words_against_far_words() {
        let model = Arc::new(MockModel::new(&["chien", "loup", "chat", "avion"], &["renard", "félin"]));
        let gen = generator(model.clone(), &[]);
        let v = view(&[("chien", 80.0), ("loup", 60.0), ("chat", 55.0)], &[("avion", -40.0)]);
        let mut tried = TriedSet::new();
        tried.insert("renard");

        let batch = gen.generate(&v, &tried, 3, &mut StdRng::seed_from_u64(9));

        let queries = model.queries();
        let best_query = queries.iter().find(|q| {
            let mut pos = q.positive.clone();
            pos.sort();
            pos == vec!["chat", "chien", "loup"] && q.negative == vec!["avion"]
        });
        assert!(best_query.is_some(), "no best-words query in {queries:?}");
        assert!(!batch.contains("renard"));
        assert!(batch.contains("félin"));
    }

    #[test]
    fn basic_group_comes_first() {
        let model = Arc::new(
            MockModel::new(&["chien", "loup", "avion"], &[])
                .respond_to(&["chien", "loup"], &["avion"], &["meute"])
                .respond_to(&["chien"], &[], &["niche"]),
        );
        let gen = generator(model, &[]);
        let v = view(&[("chien", 50.0), ("loup", 45.0)], &[("avion", -40.0)]);

        let batch = gen.generate(&v, &TriedSet::new(), 50, &mut StdRng::seed_from_u64(2));

        assert_eq!(batch.words().first().map(String::as_str), Some("meute"));
        assert!(batch.contains("niche"));
    }

    #[test]
    fn neighbour_count_is_capped_by_try_count_and_ceiling() {
        let model = Arc::new(MockModel::new(&["chien", "loup"], &["a", "b", "c"]));
        let gen = generator(model.clone(), &[]);
        let v = view(&[("chien", 50.0), ("loup", 45.0)], &[]);

        gen.generate(&v, &TriedSet::new(), 2, &mut StdRng::seed_from_u64(2));
        assert!(model.queries().iter().all(|q| q.top_n == 2));

        gen.generate(&v, &TriedSet::new(), 10_000, &mut StdRng::seed_from_u64(2));
        assert!(model.queries().iter().any(|q| q.top_n == 50));
    }

    #[test]
    fn unknown_exemplars_are_dropped_before_querying() {
        let model = Arc::new(MockModel::new(&["chien"], &["loup"]));
        let gen = generator(model.clone(), &[]);
        let v = view(&[("chien", 50.0), ("inconnu", 48.0)], &[("nulpart", -30.0)]);

        gen.generate(&v, &TriedSet::new(), 10, &mut StdRng::seed_from_u64(4));

        let queries = model.queries();
        assert!(!queries.is_empty());
        for q in &queries {
            assert!(!q.positive.iter().any(|w| w == "inconnu"));
            assert!(q.negative.is_empty());
        }
    }

    #[test]
    fn all_unknown_exemplars_contribute_nothing() {
        let model = Arc::new(MockModel::new(&[], &["loup"]));
        let gen = generator(model.clone(), &[]);
        let v = view(&[("inconnu", 50.0), ("absent", 48.0)], &[("nulpart", -30.0)]);

        let batch = gen.generate(&v, &TriedSet::new(), 10, &mut StdRng::seed_from_u64(4));

        assert!(batch.is_empty());
        assert!(model.queries().is_empty());
    }

    #[test]
    fn very_close_words_add_lexical_variants_last() {
        let model = Arc::new(MockModel::new(&["chat", "loup"], &["félin"]));
        let gen = generator(model, &["chat", "chats", "chatte", "loup"]);
        let v = view(&[("chat", 60.0), ("loup", 30.0)], &[]);

        let batch = gen.generate(&v, &TriedSet::new(), 10, &mut StdRng::seed_from_u64(5));

        assert_eq!(batch.words().first().map(String::as_str), Some("félin"));
        let tail: Vec<_> = batch.words().iter().rev().take(2).rev().cloned().collect();
        assert_eq!(tail, vec!["chats", "chatte"]);
    }

    #[test]
    fn batch_never_contains_tried_or_duplicate_words() {
        let model = Arc::new(MockModel::new(
            &["chien", "loup", "renard", "avion"],
            &["Meute", "meute", "niche", "Niche", "croc"],
        ));
        let gen = generator(model, &[]);
        let v = view(&[("chien", 50.0), ("loup", 45.0), ("renard", 20.0)], &[("avion", -10.0)]);
        let mut tried = TriedSet::new();
        tried.insert("CROC");

        for seed in 0..20 {
            let batch = gen.generate(&v, &tried, 20, &mut StdRng::seed_from_u64(seed));
            let mut seen = std::collections::HashSet::new();
            for w in batch.words() {
                assert!(!tried.contains(w));
                assert!(seen.insert(w.to_lowercase()), "duplicate {w}");
            }
        }
    }

    #[test]
    fn malformed_tokens_are_filtered() {
        let model = Arc::new(MockModel::new(&["chien", "loup"], &["l'ami", "porte-clé", "x2", "grand père", "élan"]));
        let gen = generator(model, &[]);
        let v = view(&[("chien", 50.0), ("loup", 45.0)], &[]);

        let batch = gen.generate(&v, &TriedSet::new(), 10, &mut StdRng::seed_from_u64(6));

        assert!(batch.contains("porte-clé"));
        assert!(batch.contains("grand père"));
        assert!(batch.contains("élan"));
        assert!(!batch.contains("l'ami"));
        assert!(!batch.contains("x2"));
    }

    #[test]
    fn validity_check_accepts_letters_spaces_and_hyphens() {
        assert!(is_valid_word("arc-en-ciel"));
        assert!(is_valid_word("pomme de terre"));
        assert!(is_valid_word("œuvre"));
        assert!(!is_valid_word("</td>"));
        assert!(!is_valid_word("123"));
        assert!(!is_valid_word(""));
    }
}
