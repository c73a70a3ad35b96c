use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use dramatis::discovery;
use dramatis::pipeline::{self, PipelineConfig};
use dramatis::restart_log::{should_process_file, RestartLog};
use dramatis::stats::{FileStats, RunStats, TallyBuilder};
use dramatis::{MentionDetector, NameRoster};

#[derive(Parser, Debug)]
#[command(name = "dramatis")]
#[command(about = "Character mention extractor for novel manuscripts")]
#[command(version)]
struct Args {
    /// Root directory to scan for chapter *.txt files
    root_dir: PathBuf,

    /// Character roster file: one name per line, # lines are comments
    #[arg(long)]
    roster: PathBuf,

    /// Overwrite even chapters with complete mention files
    #[arg(long)]
    overwrite_all: bool,

    /// Abort on first error
    #[arg(long)]
    fail_fast: bool,

    /// Use memory-mapped I/O instead of async buffered
    #[arg(long)]
    use_mmap: bool,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,

    /// Stats output file path
    #[arg(long, default_value = "run_stats.json")]
    stats_out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Structured JSON logs so batch runs can be inspected after the fact
    tracing_subscriber::fmt()
        .with_target(false)
        .json()
        .init();

    let args = Args::parse();
    let run_start = Instant::now();

    info!("Starting dramatis");
    info!(?args, "Parsed CLI arguments");

    // Bail on unusable inputs before any discovery work starts
    if !args.root_dir.exists() {
        anyhow::bail!("Root directory does not exist: {}", args.root_dir.display());
    }

    if !args.root_dir.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", args.root_dir.display());
    }

    let roster = NameRoster::load_async(&args.roster).await?;
    if roster.is_empty() {
        anyhow::bail!(
            "Roster has no usable names (need length >= 2 characters): {}",
            args.roster.display()
        );
    }
    info!("Loaded roster with {} names from {}", roster.len(), args.roster.display());

    // Discover chapter files
    let discovery_config = discovery::DiscoveryConfig {
        fail_fast: args.fail_fast,
    };

    info!("Starting chapter discovery in: {}", args.root_dir.display());
    let candidates = discovery::collect_chapters(&args.root_dir, discovery_config).await?;

    // WHY: a roster kept inside the manuscript tree is itself a *.txt file;
    // it must never be processed as a chapter
    let roster_canonical = std::fs::canonicalize(&args.roster).ok();
    let valid_files: Vec<PathBuf> = candidates
        .iter()
        .filter(|c| c.error.is_none())
        .map(|c| c.path.clone())
        .filter(|path| match (&roster_canonical, std::fs::canonicalize(path).ok()) {
            (Some(roster_path), Some(chapter_path)) => chapter_path != *roster_path,
            _ => true,
        })
        .collect();

    let invalid_count = candidates.len() - valid_files.len();
    info!(
        "Chapter discovery completed: {} usable, {} excluded",
        valid_files.len(),
        invalid_count
    );

    println!("dramatis v{} - chapter discovery complete", env!("CARGO_PKG_VERSION"));
    println!("Found {} chapter files under {}", valid_files.len(), args.root_dir.display());

    // Partition into chapters to process vs already-complete ones
    let mut restart_log = RestartLog::load(&args.root_dir).await;
    let (to_process, skipped): (Vec<PathBuf>, Vec<PathBuf>) = valid_files
        .into_iter()
        .partition(|path| should_process_file(path, &restart_log, args.overwrite_all));

    if !skipped.is_empty() {
        info!("Skipping {} chapters with complete mention files", skipped.len());
    }

    let progress = if args.no_progress || to_process.is_empty() {
        None
    } else {
        let bar = ProgressBar::new(to_process.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message("processing chapters");
        Some(bar)
    };

    // Process chapters
    let detector = Arc::new(MentionDetector::new(roster));
    let pipeline_config = PipelineConfig {
        fail_fast: args.fail_fast,
        use_mmap: args.use_mmap,
        ..Default::default()
    };

    let outcomes =
        pipeline::process_files_parallel(&to_process, Arc::clone(&detector), &pipeline_config, progress.clone())
            .await?;

    if let Some(bar) = progress {
        bar.finish_with_message("done");
    }

    // Record completions and build run stats
    let mut tally = TallyBuilder::new();
    let mut file_stats: Vec<FileStats> = Vec::new();
    let mut files_processed = 0u64;
    let mut files_failed = 0u64;
    let mut total_mentions = 0u64;

    for outcome in &outcomes {
        if outcome.succeeded() {
            files_processed += 1;
            total_mentions += outcome.stats.mentions_found;
            restart_log.mark_completed(&outcome.path);

            let title = outcome
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string();
            tally.record_chapter(&title, outcome.counts.iter().map(|(n, c)| (n.as_str(), *c)));
        } else {
            files_failed += 1;
        }
        file_stats.push(outcome.stats.clone());
    }

    for path in &skipped {
        file_stats.push(FileStats::skipped(path.display().to_string()));
    }

    restart_log.save(&args.root_dir).await?;

    let appearances = tally.finish();
    let run_stats = RunStats {
        files_processed,
        files_skipped: skipped.len() as u64,
        files_failed,
        total_mentions,
        elapsed_ms: run_start.elapsed().as_millis() as u64,
        file_stats,
        appearances,
    };

    run_stats.write_json(&args.stats_out).await?;
    info!("Run stats written to {}", args.stats_out.display());

    println!("Chapter processing complete:");
    println!("  Processed: {files_processed} chapters");
    println!("  Skipped (already complete): {}", run_stats.files_skipped);
    if files_failed > 0 {
        println!("  Failed: {files_failed} chapters");
    }
    println!("  Total mentions: {total_mentions}");

    if !run_stats.appearances.is_empty() {
        println!("Top characters:");
        for tally in run_stats.appearances.iter().take(5) {
            println!(
                "  {} - {} mentions across {} chapters",
                tally.name,
                tally.total,
                tally.chapters.len()
            );
        }
    }

    info!(
        "dramatis run completed: {} processed, {} skipped, {} failed",
        files_processed, run_stats.files_skipped, files_failed
    );

    Ok(())
}
