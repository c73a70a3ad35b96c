// WHY: Detector entry points expose both borrowed and owned mentions.
// Borrowed mentions reference roster names directly; owned copies suit async
// call sites that outlive the detector borrow

pub mod roster;
pub mod scanner;

pub use roster::{NameRoster, MIN_NAME_CHARS};

/// Half-open interval `[start, end)` in 0-based character offsets,
/// document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Length of the span in characters.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two half-open intervals intersect.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A contiguous run of plain text at a known character base offset inside a
/// larger document.
#[derive(Debug, Clone, Copy)]
pub struct Fragment<'a> {
    pub text: &'a str,
    pub base: usize,
}

impl<'a> Fragment<'a> {
    pub fn new(text: &'a str, base: usize) -> Self {
        Self { text, base }
    }
}

/// Split a document into one fragment per non-empty line, each at its
/// absolute character offset. Line terminators count toward the offsets of
/// later fragments but are never part of a fragment's text.
pub fn line_fragments(text: &str) -> Vec<Fragment<'_>> {
    let mut fragments = Vec::new();
    let mut base = 0usize;

    for line in text.split_inclusive('\n') {
        let stripped = line.strip_suffix('\n').unwrap_or(line);
        let stripped = stripped.strip_suffix('\r').unwrap_or(stripped);
        if !stripped.is_empty() {
            fragments.push(Fragment::new(stripped, base));
        }
        base += line.chars().count();
    }

    fragments
}

/// Borrowed variant - zero allocation, `name` references the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MentionBorrowed<'r> {
    pub name: &'r str,
    pub span: Span,
}

impl<'r> MentionBorrowed<'r> {
    /// Copy into the owned variant.
    pub fn to_owned(&self) -> MentionOwned {
        MentionOwned {
            name: self.name.to_string(),
            span: self.span,
        }
    }
}

/// Owned variant - convenience for async I/O scenarios
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionOwned {
    pub name: String,
    pub span: Span,
}

/// Finds character-name mentions in prose.
///
/// The detector is a pure function of its inputs: it holds the roster as an
/// injected read-only dependency, never mutates it, and returns a fresh
/// mention list on every call. Re-running it over changed text or a changed
/// roster is the caller's responsibility.
pub struct MentionDetector {
    roster: NameRoster,
}

impl MentionDetector {
    pub fn new(roster: NameRoster) -> Self {
        Self { roster }
    }

    pub fn roster(&self) -> &NameRoster {
        &self.roster
    }

    /// Detect mentions in a single body of text (base offset 0).
    pub fn detect<'r>(&'r self, text: &str) -> Vec<MentionBorrowed<'r>> {
        self.detect_in_fragments(&[Fragment::new(text, 0)])
    }

    /// Detect mentions across an ordered sequence of fragments, returning
    /// spans in absolute document coordinates, sorted by start, pairwise
    /// disjoint.
    pub fn detect_in_fragments<'r>(&'r self, fragments: &[Fragment<'_>]) -> Vec<MentionBorrowed<'r>> {
        let mut mentions = Vec::new();
        for fragment in fragments {
            scanner::scan_fragment(&self.roster, fragment, &mut mentions);
        }
        mentions.sort_by_key(|mention| mention.span.start);
        mentions
    }

    /// Owned counterpart of [`detect`](Self::detect).
    pub fn detect_owned(&self, text: &str) -> Vec<MentionOwned> {
        self.detect(text).iter().map(MentionBorrowed::to_owned).collect()
    }

    /// Owned counterpart of [`detect_in_fragments`](Self::detect_in_fragments).
    pub fn detect_in_fragments_owned(&self, fragments: &[Fragment<'_>]) -> Vec<MentionOwned> {
        self.detect_in_fragments(fragments)
            .iter()
            .map(MentionBorrowed::to_owned)
            .collect()
    }
}
