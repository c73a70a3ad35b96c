// WHY: The matching pass lives apart from the public detector types so the
// byte/char bookkeeping stays contained and unit-testable

use super::roster::NameRoster;
use super::{Fragment, MentionBorrowed, Span};

// Type-safe position wrappers to prevent byte/char confusion

/// 0-based byte position in fragment text
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct BytePos(pub usize);

/// 0-based character position in fragment text
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct CharPos(pub usize);

/// Byte offset of every character in a fragment, plus an end sentinel.
/// WHY: built once per fragment so byte-to-char conversion is O(log n)
/// instead of rescanning the prefix for every candidate match.
pub struct CharIndex {
    byte_starts: Vec<usize>,
}

impl CharIndex {
    pub fn new(text: &str) -> Self {
        let mut byte_starts: Vec<usize> = text.char_indices().map(|(byte, _)| byte).collect();
        byte_starts.push(text.len());
        Self { byte_starts }
    }

    /// Number of characters in the indexed text.
    pub fn char_count(&self) -> usize {
        self.byte_starts.len() - 1
    }

    /// Character position containing the given byte offset.
    pub fn char_of(&self, byte: BytePos) -> CharPos {
        match self.byte_starts.binary_search(&byte.0) {
            Ok(idx) => CharPos(idx),
            Err(idx) => CharPos(idx - 1),
        }
    }

    /// Byte offset of a character position. The end sentinel is addressable
    /// so a cursor can step one past the final character.
    pub fn byte_of(&self, ch: CharPos) -> BytePos {
        BytePos(self.byte_starts[ch.0])
    }
}

/// Run the longest-match-first, first-occurrence-wins pass over one fragment,
/// appending accepted mentions in document coordinates to `out`.
///
/// Accepted spans are tracked per fragment: a candidate is rejected when its
/// `[start, end)` interval intersects any span already accepted here. After
/// every candidate, accepted or not, the search resumes one character past
/// the candidate start so occurrences beginning immediately after are still
/// considered.
pub(crate) fn scan_fragment<'r>(
    roster: &'r NameRoster,
    fragment: &Fragment<'_>,
    out: &mut Vec<MentionBorrowed<'r>>,
) {
    if fragment.text.is_empty() || roster.is_empty() {
        return;
    }

    let index = CharIndex::new(fragment.text);
    let mut accepted: Vec<Span> = Vec::new();

    for entry in roster.entries() {
        let name = entry.text.as_str();
        let mut cursor = BytePos(0);

        while let Some(rel) = fragment.text[cursor.0..].find(name) {
            let start = index.char_of(BytePos(cursor.0 + rel));
            let span = Span {
                start: fragment.base + start.0,
                end: fragment.base + start.0 + entry.char_len,
            };

            if !accepted.iter().any(|prior| prior.overlaps(&span)) {
                accepted.push(span);
                out.push(MentionBorrowed { name, span });
            }

            cursor = index.byte_of(CharPos(start.0 + 1));
        }
    }
}
