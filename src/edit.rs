use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Byte range `[start, end)` inside a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check `0 <= start <= end <= text_len` and that both ends fall on char
    /// boundaries of `text`.
    pub fn check(&self, text: &str) -> Result<(), EditError> {
        if self.start > self.end
            || self.end > text.len()
            || !text.is_char_boundary(self.start)
            || !text.is_char_boundary(self.end)
        {
            return Err(EditError::InvalidByteRange {
                byte_start: self.start,
                byte_end: self.end,
                text_len: text.len(),
            });
        }
        Ok(())
    }
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

/// A verified byte-span replacement against an in-memory text.
///
/// Rules never touch the target file. Every rewrite they compute is an
/// `Edit`, and [`apply_edits`] turns a batch of them into a fresh string.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until passed to apply_edits()"]
pub struct Edit {
    pub span: Span,
    pub new_text: String,
    pub expected_before: EditVerification,
}

impl Edit {
    pub fn new(span: Span, new_text: impl Into<String>, expected_before: &str) -> Self {
        Self {
            span,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    fn validate(&self, text: &str) -> Result<(), EditError> {
        self.span.check(text)?;
        let current = &text[self.span.start..self.span.end];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.span.start,
                byte_end: self.span.end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at [{byte_start}, {byte_end})")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in text of length {text_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        text_len: usize,
    },

    #[error("Overlapping edits at [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Apply a batch of edits to `text`, producing a new string.
///
/// Edits are sorted by start descending and spliced bottom-to-top so earlier
/// offsets stay valid. All edits are validated before any splicing happens.
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(text.to_string());
    }

    for edit in &edits {
        edit.validate(text)?;
    }

    edits.sort_by(|a, b| b.span.start.cmp(&a.span.start));

    // Sorted descending: the earlier edit's end must not pass the later start
    for window in edits.windows(2) {
        let (later, earlier) = (&window[0], &window[1]);
        if earlier.span.end > later.span.start {
            return Err(EditError::Overlap {
                first_start: earlier.span.start,
                first_end: earlier.span.end,
                second_start: later.span.start,
                second_end: later.span.end,
            });
        }
    }

    let mut out = text.to_string();
    for edit in &edits {
        out.replace_range(edit.span.start..edit.span.end, &edit.new_text);
    }
    Ok(out)
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write lands or the target is left as it was.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    // Keep the target's permissions across the rename
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(temp.path(), meta.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;

    Ok(())
}
