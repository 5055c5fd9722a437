//! Patch executor - applies one file's ordered edit list
//!
//! The executor:
//! - Reads the target once as UTF-8 text
//! - Applies each edit against the current in-memory buffer
//! - Writes the buffer back only if at least one edit matched
//! - Reports every outcome as a value, never as an error

use crate::edit::{PatchOperation, TargetFile};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

/// Minimum similarity for a line to be offered as a drift hint.
const NEAREST_LINE_THRESHOLD: f64 = 0.6;

/// Result of attempting a single edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// Anchor found and the edit was applied to the buffer
    Patched,
    /// Anchor absent from the current buffer
    SkippedNoAnchor,
    /// Guard evaluated true; edit treated as already present
    SkippedAlreadyPresent,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Patched => write!(f, "patched"),
            OperationStatus::SkippedNoAnchor => write!(f, "anchor not found"),
            OperationStatus::SkippedAlreadyPresent => write!(f, "already present"),
        }
    }
}

/// Per-edit record inside a [`FileOutcome`].
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// Position of the edit in the file's list
    pub index: usize,
    pub name: String,
    pub status: OperationStatus,
    /// Closest line to a missing anchor, for spotting drifted configuration
    pub nearest: Option<NearestLine>,
}

/// A line of the buffer that resembles an anchor which was not found.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestLine {
    /// 1-based line number in the buffer at the time of the miss
    pub line_number: usize,
    pub text: String,
    pub similarity: f64,
}

/// Final status of one target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// At least one edit applied and the file was rewritten
    Patched,
    /// No edit applied and at least one anchor was missing
    SkippedNoAnchor,
    /// Every edit was prevented by its guard
    SkippedAlreadyPresent,
    /// The file does not exist or could not be read as UTF-8 text
    MissingFile,
    /// Edits applied in memory but the write-back failed
    WriteFailed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Patched => write!(f, "patched"),
            FileStatus::SkippedNoAnchor => write!(f, "skipped (no anchor matched)"),
            FileStatus::SkippedAlreadyPresent => write!(f, "skipped (already present)"),
            FileStatus::MissingFile => write!(f, "missing"),
            FileStatus::WriteFailed => write!(f, "write failed"),
        }
    }
}

/// Everything that happened to one target file.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "FileOutcome should be reported"]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    pub operations: Vec<OperationResult>,
    /// xxh3 of the bytes read, when the read succeeded
    pub original_hash: Option<u64>,
    /// xxh3 of the bytes written, when a write succeeded
    pub final_hash: Option<u64>,
    /// Underlying I/O error text for `MissingFile` / `WriteFailed`
    pub detail: Option<String>,
}

impl FileOutcome {
    fn missing(path: &Path, detail: String) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::MissingFile,
            operations: Vec::new(),
            original_hash: None,
            final_hash: None,
            detail: Some(detail),
        }
    }

    pub fn count(&self, status: OperationStatus) -> usize {
        self.operations
            .iter()
            .filter(|op| op.status == status)
            .count()
    }

    /// Written back, but at least one edit found no anchor.
    pub fn is_partial(&self) -> bool {
        self.status == FileStatus::Patched && self.count(OperationStatus::SkippedNoAnchor) > 0
    }

    /// True when the file on disk was modified by this run.
    pub fn was_written(&self) -> bool {
        self.status == FileStatus::Patched
    }
}

/// xxh3-64 of a file's bytes.
pub fn content_hash(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// Apply a single edit to `buffer` in place.
pub fn apply_operation(buffer: &mut String, op: &PatchOperation) -> OperationStatus {
    if let Some(guard) = &op.guard {
        if guard.holds(buffer) {
            return OperationStatus::SkippedAlreadyPresent;
        }
    }

    // Only the first occurrence is touched; duplicates are left alone.
    let Some(start) = buffer.find(op.anchor.as_str()) else {
        return OperationStatus::SkippedNoAnchor;
    };
    let end = start + op.anchor.len();
    buffer.replace_range(start..end, &op.spliced_text());

    OperationStatus::Patched
}

/// Apply an ordered edit list to in-memory text.
///
/// Returns the resulting text and one result per edit. Pure: no filesystem access.
pub fn apply_to_text(text: &str, edits: &[PatchOperation]) -> (String, Vec<OperationResult>) {
    let mut buffer = text.to_string();
    let mut results = Vec::with_capacity(edits.len());

    for (index, op) in edits.iter().enumerate() {
        let status = apply_operation(&mut buffer, op);
        let nearest = match status {
            OperationStatus::SkippedNoAnchor => nearest_line(&buffer, &op.anchor),
            _ => None,
        };
        debug!(edit = %op.display_name(index), mode = %op.mode, %status, "edit evaluated");
        results.push(OperationResult {
            index,
            name: op.display_name(index),
            status,
            nearest,
        });
    }

    (buffer, results)
}

/// Apply `edits` to the file at `path`.
///
/// At most one read and one write. The write is a plain overwrite.
pub fn apply(path: &Path, edits: &[PatchOperation]) -> FileOutcome {
    let original = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "target file unavailable");
            return FileOutcome::missing(path, err.to_string());
        }
    };
    let original_hash = content_hash(original.as_bytes());

    let (patched, operations) = apply_to_text(&original, edits);
    let any_patched = operations
        .iter()
        .any(|op| op.status == OperationStatus::Patched);

    let mut outcome = FileOutcome {
        path: path.to_path_buf(),
        status: FileStatus::SkippedNoAnchor,
        operations,
        original_hash: Some(original_hash),
        final_hash: None,
        detail: None,
    };

    if !any_patched {
        let all_guarded = !outcome.operations.is_empty()
            && outcome
                .operations
                .iter()
                .all(|op| op.status == OperationStatus::SkippedAlreadyPresent);
        if all_guarded {
            outcome.status = FileStatus::SkippedAlreadyPresent;
        }
        return outcome;
    }

    match fs::write(path, patched.as_bytes()) {
        Ok(()) => {
            let final_hash = content_hash(patched.as_bytes());
            info!(
                path = %path.display(),
                patched = outcome.count(OperationStatus::Patched),
                "file rewritten"
            );
            outcome.status = FileStatus::Patched;
            outcome.final_hash = Some(final_hash);
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "write-back failed");
            outcome.status = FileStatus::WriteFailed;
            outcome.detail = Some(err.to_string());
        }
    }

    outcome
}

/// Convenience wrapper for a [`TargetFile`].
pub fn apply_target(target: &TargetFile) -> FileOutcome {
    apply(&target.path, &target.edits)
}

/// Find the buffer line most similar to the anchor's first non-blank line.
fn nearest_line(buffer: &str, anchor: &str) -> Option<NearestLine> {
    let needle = anchor.lines().map(str::trim).find(|line| !line.is_empty())?;

    buffer
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let similarity = strsim::normalized_levenshtein(line.trim(), needle);
            (idx, line, similarity)
        })
        .filter(|(_, _, similarity)| *similarity >= NEAREST_LINE_THRESHOLD)
        .max_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(idx, line, similarity)| NearestLine {
            line_number: idx + 1,
            text: line.trim().to_string(),
            similarity,
        })
}
