//! In-memory word vectors with a gensim-style `most_similar` query.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

/// Unit-normalized word vectors, indexed by word.
pub struct EmbeddingTable {
    words: Vec<String>,
    index: HashMap<String, usize>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
}

impl EmbeddingTable {
    /// Build a table from `(word, vector)` pairs. Zero vectors are dropped;
    /// the first occurrence of a duplicated word wins.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut table = Self {
            words: Vec::new(),
            index: HashMap::new(),
            vectors: Vec::new(),
            dim: 0,
        };
        for (word, vector) in pairs {
            let word = word.into();
            if table.dim == 0 {
                table.dim = vector.len();
            }
            if vector.len() != table.dim {
                bail!(
                    "Vector for {word:?} has {} dimensions, expected {}",
                    vector.len(),
                    table.dim
                );
            }
            table.push(word, vector);
        }
        Ok(table)
    }

    /// Read the word2vec text format: an optional `<count> <dim>` header, then
    /// one `word v1 .. vd` line per entry. Lines with the wrong arity are skipped
    /// and invalid UTF-8 is replaced rather than rejected.
    pub fn read_word2vec_text<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut table = Self {
            words: Vec::new(),
            index: HashMap::new(),
            vectors: Vec::new(),
            dim: 0,
        };
        let mut buf = Vec::new();
        let mut first = true;
        let mut skipped = 0usize;

        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).context("Failed to read vector line")?;
            if n == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let values: Vec<&str> = parts.collect();

            if first {
                first = false;
                if values.len() == 1 {
                    if let (Ok(_), Ok(dim)) = (word.parse::<usize>(), values[0].parse::<usize>()) {
                        table.dim = dim;
                        continue;
                    }
                }
            }

            let vector: Option<Vec<f32>> = values.iter().map(|v| v.parse().ok()).collect();
            let Some(vector) = vector else {
                skipped += 1;
                continue;
            };
            if table.dim == 0 {
                table.dim = vector.len();
            }
            if vector.len() != table.dim || table.dim == 0 {
                skipped += 1;
                continue;
            }
            table.push(word.to_string(), vector);
        }

        if skipped > 0 {
            warn!(skipped, "Skipped malformed vector lines");
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open embedding model {}", path.display()))?;
        let table = Self::read_word2vec_text(BufReader::new(file))?;
        info!(
            path = %path.display(),
            words = table.len(),
            dim = table.dim,
            "Loaded embedding model"
        );
        Ok(table)
    }

    fn push(&mut self, word: String, vector: Vec<f32>) {
        if self.index.contains_key(&word) {
            return;
        }
        let Some(unit) = normalized(vector) else {
            return;
        };
        self.index.insert(word.clone(), self.words.len());
        self.words.push(word);
        self.vectors.push(unit);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Cosine similarity between two known words.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        let va = &self.vectors[*self.index.get(a)?];
        let vb = &self.vectors[*self.index.get(b)?];
        Some(dot(va, vb))
    }

    /// Words nearest to the mean of `positive` minus `negative`, best first.
    /// Unknown words are ignored; the query words themselves are never returned.
    pub fn most_similar(&self, positive: &[&str], negative: &[&str], top_n: usize) -> Vec<(String, f32)> {
        if top_n == 0 {
            return Vec::new();
        }

        let mut mean = vec![0.0f32; self.dim];
        let mut used = Vec::new();
        for (words, sign) in [(positive, 1.0f32), (negative, -1.0f32)] {
            for w in words {
                if let Some(&i) = self.index.get(*w) {
                    for (m, v) in mean.iter_mut().zip(&self.vectors[i]) {
                        *m += sign * v;
                    }
                    used.push(i);
                }
            }
        }
        if used.is_empty() {
            return Vec::new();
        }
        let Some(query) = normalized(mean) else {
            return Vec::new();
        };

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|(i, _)| !used.contains(i))
            .map(|(i, v)| (i, dot(&query, v)))
            .collect();

        let keep = top_n.min(scored.len());
        if keep == 0 {
            return Vec::new();
        }
        if keep < scored.len() {
            scored.select_nth_unstable_by(keep - 1, |a, b| b.1.total_cmp(&a.1));
            scored.truncate(keep);
        }
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .map(|(i, s)| (self.words[i].clone(), s))
            .collect()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalized(mut v: Vec<f32>) -> Option<Vec<f32>> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    for x in &mut v {
        *x /= norm;
    }
    Some(v)
}
