// WHY: Run metrics live apart from the pipeline so the CLI, tests, and any
// external caller can consume the same serializable shapes

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Per-chapter processing statistics
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileStats {
    /// Chapter path relative to the manuscript root where possible
    pub path: String,
    /// Number of characters processed
    pub chars_processed: u64,
    /// Number of mentions found
    pub mentions_found: u64,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Mention detection time in milliseconds (subset of processing_time_ms)
    pub detection_time_ms: u64,
    /// Throughput in characters per second
    pub chars_per_sec: f64,
    /// Processing status (success, skipped, failed)
    pub status: String,
    /// Error message if processing failed
    pub error: Option<String>,
}

impl FileStats {
    pub fn skipped(path: String) -> Self {
        Self {
            path,
            chars_processed: 0,
            mentions_found: 0,
            processing_time_ms: 0,
            detection_time_ms: 0,
            chars_per_sec: 0.0,
            status: "skipped".to_string(),
            error: None,
        }
    }

    pub fn failed(path: String, processing_time_ms: u64, error: String) -> Self {
        Self {
            path,
            chars_processed: 0,
            mentions_found: 0,
            processing_time_ms,
            detection_time_ms: 0,
            chars_per_sec: 0.0,
            status: "failed".to_string(),
            error: Some(error),
        }
    }
}

/// Mention count for one character within one chapter
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChapterCount {
    pub title: String,
    pub count: u64,
}

/// Per-character appearance totals across all processed chapters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AppearanceTally {
    pub name: String,
    pub total: u64,
    /// Chapters where the character appears; zero-count chapters are omitted
    pub chapters: Vec<ChapterCount>,
}

/// Accumulates per-chapter mention counts into appearance tallies
#[derive(Debug, Default)]
pub struct TallyBuilder {
    // name -> chapters seen so far, in recording order
    counts: BTreeMap<String, Vec<ChapterCount>>,
}

impl TallyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one chapter's per-character mention counts.
    pub fn record_chapter<'a, I>(&mut self, title: &str, counts: I)
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        for (name, count) in counts {
            if count == 0 {
                continue;
            }
            self.counts.entry(name.to_string()).or_default().push(ChapterCount {
                title: title.to_string(),
                count,
            });
        }
    }

    /// Produce tallies sorted by total descending, name ascending as tie-break
    /// so equal totals order the same on every run.
    pub fn finish(self) -> Vec<AppearanceTally> {
        let mut tallies: Vec<AppearanceTally> = self
            .counts
            .into_iter()
            .map(|(name, chapters)| AppearanceTally {
                name,
                total: chapters.iter().map(|c| c.count).sum(),
                chapters,
            })
            .collect();

        tallies.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
        tallies
    }
}

/// Aggregate statistics for one CLI run
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunStats {
    pub files_processed: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub total_mentions: u64,
    pub elapsed_ms: u64,
    pub file_stats: Vec<FileStats>,
    pub appearances: Vec<AppearanceTally>,
}

impl RunStats {
    /// Write the run stats as pretty-printed JSON.
    pub async fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(())
    }
}
