//! File-backed feedback store.
//!
//! Layout under the root directory:
//!
//! ```text
//! close/close_{source}.txt   word:score, best first
//! far/far_{source}.txt       word:score, most negative first
//! tried.txt                  one word per line, append-only
//! ```
//!
//! Writers replace a file by writing a uniquely named sibling and renaming it
//! over the target. Readers never block: a file that cannot be read is
//! skipped for that call. Opening a store deletes snapshots left by earlier
//! runs.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cemantix_common::codec::{parse_records, render_records, EMPTY_STORE};
use cemantix_common::{AggregatedView, FeedbackSnapshot, ScoreRecord, SourceId};

use crate::traits::FeedbackStore;

const CLOSE_DIR: &str = "close";
const FAR_DIR: &str = "far";
const TRIED_FILE: &str = "tried.txt";

#[derive(Debug, Clone, Copy)]
enum Category {
    Close,
    Far,
}

impl Category {
    fn dir(self) -> &'static str {
        match self {
            Category::Close => CLOSE_DIR,
            Category::Far => FAR_DIR,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Category::Close => "close_",
            Category::Far => "far_",
        }
    }
}

pub struct FileFeedbackStore {
    root: PathBuf,
}

impl FileFeedbackStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [CLOSE_DIR, FAR_DIR] {
            let path = root.join(dir);
            tokio::fs::create_dir_all(&path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
        }
        let store = Self { root };

        let mut purged = 0;
        for category in [Category::Close, Category::Far] {
            for (_, path) in store.list(category).await {
                Self::remove_file(&path).await?;
                purged += 1;
            }
        }
        info!(root = %store.root.display(), purged, "Opened feedback store");
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, category: Category, source: SourceId) -> PathBuf {
        self.root
            .join(category.dir())
            .join(format!("{}{}.txt", category.prefix(), source))
    }

    fn tried_path(&self) -> PathBuf {
        self.root.join(TRIED_FILE)
    }

    async fn write_replace(path: &Path, contents: &str) -> Result<()> {
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, contents)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
        }
        Ok(())
    }

    async fn remove_file(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// Every `{prefix}{source}.txt` file in a category directory.
    async fn list(&self, category: Category) -> Vec<(SourceId, PathBuf)> {
        let dir = self.root.join(category.dir());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Feedback directory unreadable");
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if let Some(source) = source_from_path(&path, category.prefix()) {
                        found.push((source, path));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Stopped listing feedback directory");
                    break;
                }
            }
        }
        found.sort();
        found
    }

    async fn read_category(&self, category: Category) -> Vec<ScoreRecord> {
        let mut records = Vec::new();
        for (source, path) in self.list(category).await {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => records.extend(parse_records(&text, source)),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable snapshot");
                }
            }
        }
        records
    }
}

fn source_from_path(path: &Path, prefix: &str) -> Option<SourceId> {
    if path.extension()? != "txt" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let id = stem.strip_prefix(prefix)?.parse().ok()?;
    Some(SourceId(id))
}

#[async_trait]
impl FeedbackStore for FileFeedbackStore {
    async fn publish(&self, source: SourceId, snapshot: &FeedbackSnapshot) -> Result<()> {
        Self::write_replace(&self.path(Category::Close, source), &render_records(&snapshot.close)).await?;
        Self::write_replace(&self.path(Category::Far, source), &render_records(&snapshot.far)).await?;
        debug!(
            source = %source,
            close = snapshot.close.len(),
            far = snapshot.far.len(),
            "Published snapshot"
        );
        Ok(())
    }

    async fn aggregate(&self) -> AggregatedView {
        let close = self.read_category(Category::Close).await;
        let far = self.read_category(Category::Far).await;
        AggregatedView::merge(close, far)
    }

    async fn reset_all(&self) -> Result<()> {
        let mut failed = 0;
        for category in [Category::Close, Category::Far] {
            for (_, path) in self.list(category).await {
                if let Err(e) = Self::write_replace(&path, EMPTY_STORE).await {
                    warn!(path = %path.display(), error = %e, "Failed to reset snapshot");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            bail!("Failed to reset {failed} snapshot files");
        }
        info!(root = %self.root.display(), "Reset all snapshots");
        Ok(())
    }

    async fn remove(&self, source: SourceId) -> Result<()> {
        Self::remove_file(&self.path(Category::Close, source)).await?;
        Self::remove_file(&self.path(Category::Far, source)).await?;
        Ok(())
    }

    async fn record_tried(&self, words: &[String]) -> Result<()> {
        if words.is_empty() {
            return Ok(());
        }
        let path = self.tried_path();
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut out = String::new();
        for w in words {
            out.push_str(w);
            out.push('\n');
        }
        file.write_all(out.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn tried(&self) -> Result<Vec<String>> {
        match tokio::fs::read_to_string(self.tried_path()).await {
            Ok(text) => Ok(text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).context("Failed to read tried log"),
        }
    }

    async fn remove_tried(&self) -> Result<()> {
        Self::remove_file(&self.tried_path()).await
    }
}
