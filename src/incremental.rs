// WHY: Aux-file and cache path conventions live in one place so the
// pipeline, restart log, and tests all agree on where output goes

use crate::mention_detector::Span;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Generate mention file path from chapter file path
/// WHY: Aux output lives next to its chapter so a manuscript tree stays self-contained
pub fn generate_mentions_file_path(source_path: &Path) -> PathBuf {
    let mut aux_path = source_path.to_path_buf();
    let file_stem = aux_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    aux_path.set_file_name(format!("{file_stem}_mentions.tsv"));
    aux_path
}

/// Check if a mention file exists for the given chapter file
pub fn mentions_file_exists<P: AsRef<Path>>(source_path: P) -> bool {
    let aux_path = generate_mentions_file_path(source_path.as_ref());
    aux_path.exists()
}

/// Read mention file content for given chapter file
///
/// # Example
/// ```no_run
/// use dramatis::incremental::read_mentions_file;
/// let content = read_mentions_file("path/to/chapter-01.txt").expect("Failed to read mention file");
/// ```
pub fn read_mentions_file<P: AsRef<Path>>(source_path: P) -> Result<String, io::Error> {
    let aux_path = generate_mentions_file_path(source_path.as_ref());
    fs::read_to_string(aux_path)
}

/// Async variant of [`read_mentions_file`] for use inside the pipeline.
pub async fn read_mentions_file_async<P: AsRef<Path>>(source_path: P) -> Result<String, io::Error> {
    let aux_path = generate_mentions_file_path(source_path.as_ref());
    tokio::fs::read_to_string(aux_path).await
}

/// Format one mention as an output line: `{index}\t{name}\t({start},{end})`
/// with offsets in document character coordinates.
pub fn format_mention_line(index: usize, name: &str, span: &Span) -> String {
    format!("{}\t{}\t({},{})", index, name, span.start, span.end)
}

/// Create a complete mention file (with trailing newline) for given chapter
///
/// # Example
/// ```no_run
/// use dramatis::incremental::create_complete_mentions_file;
/// let content = "0\t张三\t(0,2)\n";
/// create_complete_mentions_file("path/to/chapter-01.txt", content).expect("Failed to create mention file");
/// ```
pub fn create_complete_mentions_file<P: AsRef<Path>>(
    source_path: P,
    content: &str,
) -> Result<PathBuf, io::Error> {
    let aux_path = generate_mentions_file_path(source_path.as_ref());
    // A complete mention file always ends with a newline
    let content_with_newline = if content.ends_with('\n') || content.is_empty() {
        content.to_string()
    } else {
        format!("{}\n", content)
    };
    fs::write(&aux_path, content_with_newline)?;
    Ok(aux_path)
}

/// Generate cache file path for given manuscript root
pub fn generate_cache_path<P: AsRef<Path>>(root_dir: P) -> PathBuf {
    root_dir.as_ref().join(".dramatis_cache.json")
}

/// Check if cache file exists in given directory
pub fn cache_exists<P: AsRef<Path>>(root_dir: P) -> bool {
    generate_cache_path(root_dir).exists()
}

/// Read cache file content from given directory
pub fn read_cache<P: AsRef<Path>>(root_dir: P) -> Result<String, io::Error> {
    let cache_path = generate_cache_path(root_dir);
    fs::read_to_string(cache_path)
}

/// Async variant of [`read_cache`] for use inside the pipeline.
pub async fn read_cache_async<P: AsRef<Path>>(root_dir: P) -> Result<String, io::Error> {
    let cache_path = generate_cache_path(root_dir);
    tokio::fs::read_to_string(cache_path).await
}
