// WHY: Re-runs over a large manuscript should only touch chapters whose
// output is missing; the log records what is already done

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Completion log for incremental reprocessing.
///
/// Each successfully processed chapter is recorded with the unix time it
/// completed. The log lives at `.dramatis_restart.json` under the manuscript
/// root and is consulted on the next run to skip finished chapters.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct RestartLog {
    /// Completed chapter path -> completion time (unix seconds)
    completed: BTreeMap<String, u64>,
}

impl RestartLog {
    fn log_path(root_dir: &Path) -> PathBuf {
        root_dir.join(".dramatis_restart.json")
    }

    /// Load the log for a manuscript root. A missing or unreadable log
    /// yields an empty one so a first run needs no setup.
    pub async fn load(root_dir: &Path) -> Self {
        match fs::read_to_string(Self::log_path(root_dir)).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Persist the log under the manuscript root.
    pub async fn save(&self, root_dir: &Path) -> Result<()> {
        let log_path = Self::log_path(root_dir);
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&log_path, serde_json::to_string_pretty(self)?).await?;
        Ok(())
    }

    pub fn is_completed(&self, file_path: &Path) -> bool {
        self.completed.contains_key(file_path.to_string_lossy().as_ref())
    }

    pub fn mark_completed(&mut self, file_path: &Path) {
        self.completed
            .insert(file_path.to_string_lossy().into_owned(), unix_now());
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Forget all completions, forcing a full reprocess on the next run.
    pub fn clear(&mut self) {
        self.completed.clear();
    }

    /// Drop entries whose chapter or mention file has gone missing since the
    /// log was written, returning the paths that were pruned.
    pub async fn verify_completed_files(&mut self) -> Result<Vec<PathBuf>> {
        let mut stale = Vec::new();
        self.completed.retain(|path_str, _| {
            let path = Path::new(path_str);
            let intact = path.exists()
                && crate::incremental::generate_mentions_file_path(path).exists();
            if !intact {
                stale.push(PathBuf::from(path_str));
            }
            intact
        });
        Ok(stale)
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Decide whether a chapter needs processing this run.
///
/// A chapter is skipped only when the log records it as complete AND its
/// mention file is still on disk; `overwrite_all` bypasses both checks.
pub fn should_process_file(file_path: &Path, restart_log: &RestartLog, overwrite_all: bool) -> bool {
    if overwrite_all {
        return true;
    }

    if restart_log.is_completed(file_path) {
        let aux_path = crate::incremental::generate_mentions_file_path(file_path);
        if aux_path.exists() {
            return false;
        }
    }

    true
}
