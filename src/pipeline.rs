// WHY: Batch processing functionality for the CLI and external use
// Kept apart from main.rs so benchmarks and integration tests drive the same path

use crate::incremental;
use crate::mention_detector::{line_fragments, MentionBorrowed, MentionDetector};
use crate::reader::{ChapterReader, ReaderConfig};
use crate::stats::FileStats;
use anyhow::Result;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};

/// Configuration for batch chapter processing
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Abort the run if any chapter fails
    pub fail_fast: bool,
    /// Use memory-mapped reads instead of async buffered
    pub use_mmap: bool,
    /// Number of chapters processed concurrently
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            use_mmap: false,
            concurrency: num_cpus::get().max(1),
        }
    }
}

/// Result of processing one chapter
#[derive(Debug, Clone)]
pub struct ChapterOutcome {
    pub path: PathBuf,
    pub stats: FileStats,
    /// Per-character mention counts for this chapter
    pub counts: Vec<(String, u64)>,
}

impl ChapterOutcome {
    pub fn succeeded(&self) -> bool {
        self.stats.status == "success"
    }
}

/// Process chapters concurrently: read, detect mentions, write the mention
/// file, and collect per-chapter stats and per-character counts.
///
/// Outcomes are returned in input order regardless of completion order, so
/// downstream stats output is deterministic run to run.
pub async fn process_files_parallel(
    files: &[PathBuf],
    detector: Arc<MentionDetector>,
    config: &PipelineConfig,
    progress: Option<ProgressBar>,
) -> Result<Vec<ChapterOutcome>> {
    let concurrency = config.concurrency.max(1);
    info!(
        "Processing {} chapters with concurrency {}",
        files.len(),
        concurrency
    );

    // WHY: per-file read errors are contained here and surfaced as failed
    // outcomes; fail_fast is applied at the run level below
    let reader_config = ReaderConfig {
        fail_fast: false,
        buffer_size: 8192,
        use_mmap: config.use_mmap,
    };

    let outcomes: Vec<ChapterOutcome> = stream::iter(files.iter().cloned())
        .map(|path| {
            let detector = Arc::clone(&detector);
            let reader_config = reader_config.clone();
            let progress = progress.clone();
            async move {
                let outcome = process_chapter(&path, detector, reader_config).await;
                if let Some(bar) = &progress {
                    bar.inc(1);
                }
                outcome
            }
        })
        // WHY: buffered (not buffer_unordered) preserves input order
        .buffered(concurrency)
        .collect()
        .await;

    if config.fail_fast {
        if let Some(failed) = outcomes.iter().find(|o| o.stats.status == "failed") {
            anyhow::bail!(
                "Processing failed for {}: {}",
                failed.stats.path,
                failed.stats.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(outcomes)
}

/// Process a single chapter file
async fn process_chapter(
    path: &Path,
    detector: Arc<MentionDetector>,
    reader_config: ReaderConfig,
) -> ChapterOutcome {
    let started = Instant::now();
    let reader = ChapterReader::new(reader_config);
    let path_str = path.display().to_string();

    let (content, read_stats) = match reader.read_chapter(path).await {
        Ok(pair) => pair,
        Err(e) => {
            return failed_outcome(path, started, e.to_string());
        }
    };

    if let Some(error) = read_stats.read_error {
        return failed_outcome(path, started, error);
    }

    // Each non-empty line is one fragment at its absolute character offset
    let fragments = line_fragments(&content);

    let detect_start = Instant::now();
    let mentions = detector.detect_in_fragments(&fragments);
    let detection_time_ms = detect_start.elapsed().as_millis() as u64;

    let aux_path = incremental::generate_mentions_file_path(path);
    if let Err(e) = write_mentions_file(&aux_path, &mentions).await {
        warn!("Failed to write mention file for {}: {}", path.display(), e);
        return failed_outcome(path, started, e.to_string());
    }

    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for mention in &mentions {
        *counts.entry(mention.name).or_default() += 1;
    }

    let processing_time_ms = started.elapsed().as_millis() as u64;
    let chars_per_sec = if processing_time_ms > 0 {
        read_stats.chars_read as f64 / (processing_time_ms as f64 / 1000.0)
    } else {
        0.0
    };

    ChapterOutcome {
        path: path.to_path_buf(),
        stats: FileStats {
            path: path_str,
            chars_processed: read_stats.chars_read,
            mentions_found: mentions.len() as u64,
            processing_time_ms,
            detection_time_ms,
            chars_per_sec,
            status: "success".to_string(),
            error: None,
        },
        counts: counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect(),
    }
}

fn failed_outcome(path: &Path, started: Instant, error: String) -> ChapterOutcome {
    ChapterOutcome {
        path: path.to_path_buf(),
        stats: FileStats::failed(
            path.display().to_string(),
            started.elapsed().as_millis() as u64,
            error,
        ),
        counts: Vec::new(),
    }
}

/// Write a chapter's mention file with borrowed mention data
/// WHY: Zero-allocation async I/O; one `{index}\t{name}\t({start},{end})` line per mention
pub async fn write_mentions_file(
    aux_path: &Path,
    mentions: &[MentionBorrowed<'_>],
) -> Result<()> {
    let file = tokio::fs::File::create(aux_path).await?;
    let mut writer = BufWriter::new(file);

    for (index, mention) in mentions.iter().enumerate() {
        let line = incremental::format_mention_line(index, mention.name, &mention.span);
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;
    Ok(())
}
