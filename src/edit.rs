use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// The fundamental edit primitive: a literal anchor and the text that supersedes it.
///
/// Operations are plain data. Nothing is checked at construction time; an
/// anchor that does not exist in the target only shows up when the executor
/// fails to find it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[must_use = "PatchOperation does nothing until handed to the executor"]
pub struct PatchOperation {
    /// Literal text locating the edit (no pattern syntax)
    pub anchor: String,
    /// Replacement for the anchor, or the text spliced next to it for inserts
    pub replacement: String,
    /// How the replacement relates to the matched anchor
    #[serde(default)]
    pub mode: EditMode,
    /// Skip the edit when this predicate holds against the current text
    #[serde(default)]
    pub guard: Option<Guard>,
    /// Human-readable name used in reports
    #[serde(default)]
    pub label: Option<String>,
}

/// Where the replacement text goes relative to the first anchor occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditMode {
    /// Matched span is fully superseded by the replacement
    #[default]
    ReplaceFirst,
    /// Replacement is inserted immediately before the anchor
    InsertBefore,
    /// Replacement is inserted immediately after the anchor
    InsertAfter,
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditMode::ReplaceFirst => write!(f, "replace-first"),
            EditMode::InsertBefore => write!(f, "insert-before"),
            EditMode::InsertAfter => write!(f, "insert-after"),
        }
    }
}

/// Predicate over the current file text. When it evaluates true the edit is
/// skipped as already present.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    /// True when the marker occurs anywhere in the text
    Contains(String),
    /// True when the marker does not occur in the text
    Lacks(String),
    /// True when any nested guard is true
    Any(Vec<Guard>),
}

impl Guard {
    /// Evaluate the guard against `text`.
    pub fn holds(&self, text: &str) -> bool {
        match self {
            Guard::Contains(marker) => text.contains(marker.as_str()),
            Guard::Lacks(marker) => !text.contains(marker.as_str()),
            Guard::Any(guards) => guards.iter().any(|guard| guard.holds(text)),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Contains(marker) => write!(f, "unless contains {:?}", marker),
            Guard::Lacks(marker) => write!(f, "unless lacks {:?}", marker),
            Guard::Any(guards) => {
                for (idx, guard) in guards.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{guard}")?;
                }
                Ok(())
            }
        }
    }
}

/// Whether re-running an edit against its own output is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// A guard re-derives "already done" from the file content
    Idempotent,
    /// No guard; safety depends on the anchor vanishing after the edit
    NonIdempotent,
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditKind::Idempotent => write!(f, "idempotent"),
            EditKind::NonIdempotent => write!(f, "non-idempotent"),
        }
    }
}

impl PatchOperation {
    fn new(anchor: impl Into<String>, replacement: impl Into<String>, mode: EditMode) -> Self {
        Self {
            anchor: anchor.into(),
            replacement: replacement.into(),
            mode,
            guard: None,
            label: None,
        }
    }

    /// Replace the first occurrence of `anchor` with `replacement`.
    pub fn replace_first(anchor: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self::new(anchor, replacement, EditMode::ReplaceFirst)
    }

    /// Insert `text` immediately before the first occurrence of `anchor`.
    pub fn insert_before(anchor: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(anchor, text, EditMode::InsertBefore)
    }

    /// Insert `text` immediately after the first occurrence of `anchor`.
    pub fn insert_after(anchor: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(anchor, text, EditMode::InsertAfter)
    }

    /// Attach a guard. A second call replaces the first guard.
    pub fn guarded_by(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Shorthand for `guarded_by(Guard::Contains(marker))`.
    pub fn unless_contains(self, marker: impl Into<String>) -> Self {
        self.guarded_by(Guard::Contains(marker.into()))
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind(&self) -> EditKind {
        if self.guard.is_some() {
            EditKind::Idempotent
        } else {
            EditKind::NonIdempotent
        }
    }

    /// True when the anchor survives in the text this edit produces, so a
    /// guard-less second pass would match again.
    ///
    /// Heuristic: only the edit's own text is inspected. An anchor re-formed
    /// across the splice boundary with the surrounding file content (anchor
    /// `ab`, replacement `a`, file text `b` right after the match) is not
    /// detected.
    pub fn rematches_after_apply(&self) -> bool {
        match self.mode {
            EditMode::ReplaceFirst => self.replacement.contains(self.anchor.as_str()),
            EditMode::InsertBefore | EditMode::InsertAfter => true,
        }
    }

    /// Guard-less edit whose anchor survives: running twice corrupts the file.
    pub fn is_rerun_unsafe(&self) -> bool {
        self.kind() == EditKind::NonIdempotent && self.rematches_after_apply()
    }

    /// Text that takes the place of the matched anchor span.
    pub fn spliced_text(&self) -> String {
        match self.mode {
            EditMode::ReplaceFirst => self.replacement.clone(),
            EditMode::InsertBefore => format!("{}{}", self.replacement, self.anchor),
            EditMode::InsertAfter => format!("{}{}", self.anchor, self.replacement),
        }
    }

    /// Label for reports, falling back to the 1-based position in the file's list.
    pub fn display_name(&self, index: usize) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("edit #{}", index + 1),
        }
    }
}

/// A file on disk and the ordered edits it receives in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    pub path: PathBuf,
    /// Applied in declaration order; later anchors may depend on earlier edits
    pub edits: Vec<PatchOperation>,
}

impl TargetFile {
    pub fn new(path: impl Into<PathBuf>, edits: Vec<PatchOperation>) -> Self {
        Self {
            path: path.into(),
            edits,
        }
    }
}
