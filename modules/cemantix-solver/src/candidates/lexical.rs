use crate::infra::Vocabulary;

/// Spelling/inflection variants of `word`: entries within `window` lines of it
/// in the lexicon whose Levenshtein distance is at most `max_distance`.
///
/// Scans outward from the word's position (one line below, one above, two
/// below, ...). A word missing from the lexicon has no variants.
pub fn lexical_neighbors(word: &str, lexicon: &Vocabulary, window: usize, max_distance: usize) -> Vec<String> {
    let Some(mid) = lexicon.position(word) else {
        return Vec::new();
    };
    let words = lexicon.words();

    let mut out = Vec::new();
    for offset in 1..=window {
        let below = mid.checked_sub(offset);
        let above = Some(mid + offset).filter(|i| *i < words.len());
        for idx in [below, above].into_iter().flatten() {
            let candidate = &words[idx];
            if candidate != word && strsim::levenshtein(word, candidate) <= max_distance {
                out.push(candidate.clone());
            }
        }
    }
    out
}
