// WHY: Centralized roster handling so the scanner never re-derives ordering
// The scanner's longest-match policy depends on the order maintained here

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Names shorter than this many characters are excluded from matching
/// to avoid over-triggering on single characters.
pub const MIN_NAME_CHARS: usize = 2;

/// One roster name with its character length cached for span arithmetic.
#[derive(Debug, Clone)]
pub(crate) struct RosterEntry {
    pub text: String,
    pub char_len: usize,
}

/// Deduplicated set of known character names, held in the order the scanner
/// consumes them: character length descending, equal lengths in input order.
#[derive(Debug, Clone, Default)]
pub struct NameRoster {
    entries: Vec<RosterEntry>,
}

impl NameRoster {
    /// Build a roster from any collection of name strings.
    ///
    /// Names are trimmed; blanks, names shorter than `MIN_NAME_CHARS`
    /// characters, and duplicates (first occurrence wins) are dropped.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut entries: Vec<RosterEntry> = Vec::new();

        for name in names {
            let name = name.into();
            let trimmed = name.trim();
            let char_len = trimmed.chars().count();
            if char_len < MIN_NAME_CHARS {
                continue;
            }
            if !seen.insert(trimmed.to_string()) {
                continue;
            }
            entries.push(RosterEntry {
                text: trimmed.to_string(),
                char_len,
            });
        }

        // WHY: stable sort keeps input order for equal-length names, which
        // fixes the winner when two names start at the same offset
        entries.sort_by(|a, b| b.char_len.cmp(&a.char_len));

        Self { entries }
    }

    /// Parse a roster file body: one name per line, `#` lines are comments.
    pub fn from_lines(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Load a roster file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read roster file: {}", path.as_ref().display()))?;
        Ok(Self::from_lines(&content))
    }

    /// Load a roster file from disk without blocking the runtime.
    pub async fn load_async<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read roster file: {}", path.as_ref().display()))?;
        Ok(Self::from_lines(&content))
    }

    /// Entries in scan order (length descending, stable).
    pub(crate) fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Names in scan order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_names_excluded() {
        let roster = NameRoster::new(["明", "李明", "x", ""]);
        let names: Vec<_> = roster.names().collect();
        assert_eq!(names, vec!["李明"]);
    }

    #[test]
    fn test_length_descending_stable_order() {
        let roster = NameRoster::new(["张三", "欧阳修远", "李四", "王五六"]);
        let names: Vec<_> = roster.names().collect();
        // Equal-length names keep their input relative order
        assert_eq!(names, vec!["欧阳修远", "王五六", "张三", "李四"]);
    }

    #[test]
    fn test_duplicates_first_occurrence_wins() {
        let roster = NameRoster::new(["张三", "李四", "张三"]);
        assert_eq!(roster.len(), 2);
        let names: Vec<_> = roster.names().collect();
        assert_eq!(names, vec!["张三", "李四"]);
    }

    #[test]
    fn test_names_are_trimmed() {
        let roster = NameRoster::new(["  张三  ", "\t李四"]);
        let names: Vec<_> = roster.names().collect();
        assert_eq!(names, vec!["张三", "李四"]);
    }

    #[test]
    fn test_from_lines_skips_comments_and_blanks() {
        let content = "# main cast\n张三\n\n李四\n  # not a name\n";
        let roster = NameRoster::from_lines(content);
        let names: Vec<_> = roster.names().collect();
        assert_eq!(names, vec!["张三", "李四"]);
    }

    #[test]
    fn test_empty_roster() {
        let roster = NameRoster::new(Vec::<String>::new());
        assert!(roster.is_empty());
        assert_eq!(roster.len(), 0);
    }

    #[test]
    fn test_char_length_not_byte_length() {
        // "李明" is 6 bytes but 2 characters; it must survive the filter
        let roster = NameRoster::new(["李明"]);
        assert_eq!(roster.len(), 1);
        // "é" is 2 bytes but 1 character; it must not
        let roster = NameRoster::new(["é"]);
        assert!(roster.is_empty());
    }
}
