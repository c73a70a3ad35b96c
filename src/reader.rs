use anyhow::Result;
use memmap2::Mmap;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

/// Configuration for chapter reading behavior
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
    /// Buffer size for async reading (default: 8KB)
    pub buffer_size: usize,
    /// Use memory-mapped I/O instead of async buffered reads
    pub use_mmap: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            buffer_size: 8192,
            use_mmap: false,
        }
    }
}

/// Statistics for chapter reading operations
#[derive(Debug, Clone)]
pub struct ReadStats {
    pub file_path: String,
    pub chars_read: u64,
    pub bytes_read: u64,
    pub duration_ms: u64,
    pub read_error: Option<String>,
}

impl ReadStats {
    fn failed(path: &Path, started: std::time::Instant, error: String) -> Self {
        Self {
            file_path: path.display().to_string(),
            chars_read: 0,
            bytes_read: 0,
            duration_ms: started.elapsed().as_millis() as u64,
            read_error: Some(error),
        }
    }
}

/// Reads whole chapter files as UTF-8 text
/// WHY: mention detection needs the full document; line-at-a-time streaming
/// would lose the character offsets the span output is expressed in
pub struct ChapterReader {
    config: ReaderConfig,
}

impl ChapterReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read a chapter's full content, choosing the I/O path from config.
    pub async fn read_chapter<P: AsRef<Path>>(&self, file_path: P) -> Result<(String, ReadStats)> {
        if self.config.use_mmap {
            self.read_chapter_mmap(file_path.as_ref())
        } else {
            self.read_chapter_buffered(file_path.as_ref()).await
        }
    }

    /// Read chapter content with async buffered I/O
    async fn read_chapter_buffered(&self, path: &Path) -> Result<(String, ReadStats)> {
        let start_time = std::time::Instant::now();

        debug!("Starting async read of chapter: {}", path.display());

        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                let error_msg = format!("Failed to open chapter {}: {}", path.display(), e);
                warn!("{}", error_msg);

                if self.config.fail_fast {
                    return Err(anyhow::anyhow!(error_msg));
                }
                return Ok((String::new(), ReadStats::failed(path, start_time, error_msg)));
            }
        };

        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut content = String::new();

        if let Err(e) = reader.read_to_string(&mut content).await {
            let error_msg = format!("UTF-8 decoding error in {}: {}", path.display(), e);
            warn!("{}", error_msg);

            if self.config.fail_fast {
                return Err(anyhow::anyhow!(error_msg));
            }
            return Ok((String::new(), ReadStats::failed(path, start_time, error_msg)));
        }

        Ok(self.finish_read(path, content, start_time))
    }

    /// Read chapter content through a memory map
    /// WHY: avoids double-buffering for large chapters; selected by the `--use-mmap` flag
    fn read_chapter_mmap(&self, path: &Path) -> Result<(String, ReadStats)> {
        let start_time = std::time::Instant::now();

        debug!("Starting mmap read of chapter: {}", path.display());

        let result = (|| -> std::io::Result<String> {
            let file = std::fs::File::open(path)?;
            let metadata = file.metadata()?;
            // Mapping a zero-length file is invalid on some platforms
            if metadata.len() == 0 {
                return Ok(String::new());
            }
            let mmap = unsafe { Mmap::map(&file)? };
            std::str::from_utf8(&mmap)
                .map(str::to_string)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })();

        match result {
            Ok(content) => Ok(self.finish_read(path, content, start_time)),
            Err(e) => {
                let error_msg = format!("Failed to mmap chapter {}: {}", path.display(), e);
                warn!("{}", error_msg);

                if self.config.fail_fast {
                    return Err(anyhow::anyhow!(error_msg));
                }
                Ok((String::new(), ReadStats::failed(path, start_time, error_msg)))
            }
        }
    }

    fn finish_read(
        &self,
        path: &Path,
        content: String,
        start_time: std::time::Instant,
    ) -> (String, ReadStats) {
        let duration = start_time.elapsed();
        let stats = ReadStats {
            file_path: path.display().to_string(),
            chars_read: content.chars().count() as u64,
            bytes_read: content.len() as u64,
            duration_ms: duration.as_millis() as u64,
            read_error: None,
        };

        info!(
            "Successfully read {}: {} chars, {} bytes in {}ms",
            path.display(),
            stats.chars_read,
            stats.bytes_read,
            stats.duration_ms
        );

        (content, stats)
    }

    /// Read multiple chapters with per-file error containment
    pub async fn read_chapters_batch<P: AsRef<Path>>(
        &self,
        file_paths: &[P],
    ) -> Result<Vec<(String, ReadStats)>> {
        info!("Starting batch read of {} chapters", file_paths.len());

        let mut results = Vec::new();

        // One chapter at a time keeps memory bounded for large chapter sets
        for file_path in file_paths {
            match self.read_chapter(file_path).await {
                Ok(result) => {
                    results.push(result);
                }
                Err(e) => {
                    if self.config.fail_fast {
                        return Err(e);
                    } else {
                        warn!("Failed to read chapter {}: {}", file_path.as_ref().display(), e);
                        let stats = ReadStats::failed(
                            file_path.as_ref(),
                            std::time::Instant::now(),
                            e.to_string(),
                        );
                        results.push((String::new(), stats));
                    }
                }
            }
        }

        info!("Completed batch read of {} chapters", results.len());
        Ok(results)
    }
}

/// Convenience function for reading a single chapter with default configuration
/// WHY: Simplifies common use case for integration tests and external callers
pub async fn read_chapter_async<P: AsRef<Path>>(file_path: P) -> Result<String> {
    let reader = ChapterReader::new(ReaderConfig::default());
    let (content, _stats) = reader.read_chapter(file_path).await?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::fs;

    async fn create_test_file(dir: &Path, name: &str, content: &str) -> Result<std::path::PathBuf> {
        let file_path = dir.join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&file_path, content).await?;
        Ok(file_path)
    }

    #[tokio::test]
    async fn test_read_valid_chapter() {
        let temp_dir = TempDir::new().unwrap();
        let reader = ChapterReader::new(ReaderConfig::default());

        let content = "张三在门口。\n李四走了过来。";
        let file_path = create_test_file(temp_dir.path(), "chapter-01.txt", content).await.unwrap();

        let (read_content, stats) = reader.read_chapter(&file_path).await.unwrap();

        assert_eq!(read_content, content);
        assert_eq!(stats.chars_read, content.chars().count() as u64);
        assert_eq!(stats.bytes_read, content.len() as u64);
        assert!(stats.read_error.is_none());
    }

    #[tokio::test]
    async fn test_read_empty_chapter() {
        let temp_dir = TempDir::new().unwrap();
        let reader = ChapterReader::new(ReaderConfig::default());

        let file_path = create_test_file(temp_dir.path(), "empty.txt", "").await.unwrap();

        let (content, stats) = reader.read_chapter(&file_path).await.unwrap();

        assert_eq!(content, "");
        assert_eq!(stats.chars_read, 0);
        assert_eq!(stats.bytes_read, 0);
        assert!(stats.read_error.is_none());
    }

    #[tokio::test]
    async fn test_read_nonexistent_chapter() {
        let temp_dir = TempDir::new().unwrap();
        let reader = ChapterReader::new(ReaderConfig { fail_fast: false, ..Default::default() });

        let file_path = temp_dir.path().join("nonexistent.txt");

        let (content, stats) = reader.read_chapter(&file_path).await.unwrap();

        assert_eq!(content, "");
        assert!(stats.read_error.is_some());
    }

    #[tokio::test]
    async fn test_read_nonexistent_chapter_fail_fast() {
        let temp_dir = TempDir::new().unwrap();
        let reader = ChapterReader::new(ReaderConfig { fail_fast: true, ..Default::default() });

        let file_path = temp_dir.path().join("nonexistent.txt");

        let result = reader.read_chapter(&file_path).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_per_file_error() {
        let temp_dir = TempDir::new().unwrap();
        let reader = ChapterReader::new(ReaderConfig::default());

        let file_path = temp_dir.path().join("broken.txt");
        std::fs::write(&file_path, [0xFF, 0xFE, 0xFD]).unwrap();

        let (content, stats) = reader.read_chapter(&file_path).await.unwrap();
        assert_eq!(content, "");
        assert!(stats.read_error.is_some());
    }

    #[tokio::test]
    async fn test_mmap_matches_buffered() {
        let temp_dir = TempDir::new().unwrap();
        let content = "第一章\n张三在门口等着李四。\n";
        let file_path = create_test_file(temp_dir.path(), "chapter-01.txt", content).await.unwrap();

        let buffered = ChapterReader::new(ReaderConfig::default());
        let mmapped = ChapterReader::new(ReaderConfig { use_mmap: true, ..Default::default() });

        let (buffered_content, buffered_stats) = buffered.read_chapter(&file_path).await.unwrap();
        let (mmap_content, mmap_stats) = mmapped.read_chapter(&file_path).await.unwrap();

        assert_eq!(buffered_content, mmap_content);
        assert_eq!(buffered_stats.chars_read, mmap_stats.chars_read);
        assert_eq!(buffered_stats.bytes_read, mmap_stats.bytes_read);
    }

    #[tokio::test]
    async fn test_mmap_empty_chapter() {
        let temp_dir = TempDir::new().unwrap();
        let reader = ChapterReader::new(ReaderConfig { use_mmap: true, ..Default::default() });

        let file_path = create_test_file(temp_dir.path(), "empty.txt", "").await.unwrap();

        let (content, stats) = reader.read_chapter(&file_path).await.unwrap();
        assert_eq!(content, "");
        assert!(stats.read_error.is_none());
    }

    #[tokio::test]
    async fn test_read_chapters_batch() {
        let temp_dir = TempDir::new().unwrap();
        let reader = ChapterReader::new(ReaderConfig::default());

        let file1 = create_test_file(temp_dir.path(), "chapter-01.txt", "第一章\n正文").await.unwrap();
        let file2 = create_test_file(temp_dir.path(), "chapter-02.txt", "第二章").await.unwrap();

        let file_paths = vec![&file1, &file2];
        let results = reader.read_chapters_batch(&file_paths).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "第一章\n正文");
        assert_eq!(results[1].0, "第二章");
        assert!(results[0].1.read_error.is_none());
        assert!(results[1].1.read_error.is_none());
    }
}
