//! Anchor Patcher: literal anchor-based source patching
//!
//! Applies ordered "anchor → replacement" edits to a fixed set of text files
//! and reports, per file and per edit, what was patched, what was skipped
//! and which files were missing.
//!
//! # Architecture
//!
//! - [`PatchOperation`] / [`TargetFile`]: plain data describing the edits.
//! - [`executor::apply`]: one read, in-memory edits in declaration order,
//!   at most one write.
//! - [`report::run`]: drives every target, never stops early, prints a summary.
//!
//! # Re-running
//!
//! Whether an edit is already applied is re-derived from file content on every
//! run through its [`Guard`]. Guarded edits are idempotent; guard-less edits are
//! only safe when their anchor disappears after replacement.
//!
//! # Example
//!
//! ```no_run
//! use anchor_patcher::{report, PatchOperation, TargetFile};
//!
//! let target = TargetFile::new(
//!     "app/admin/page.tsx",
//!     vec![PatchOperation::replace_first("'users';", "'users' | 'admins';")
//!         .unless_contains("'admins'")],
//! );
//!
//! let summary = report::run(&[target]);
//! println!("{summary}");
//! ```

pub mod config;
pub mod edit;
pub mod executor;
pub mod report;

// Re-exports
pub use config::{builtin_set, builtin_sets, load_from_path, load_from_str, ConfigError, PatchSet};
pub use edit::{EditKind, EditMode, Guard, PatchOperation, TargetFile};
pub use executor::{
    apply, apply_to_text, content_hash, FileOutcome, FileStatus, OperationResult,
    OperationStatus,
};
pub use report::{run, run_to, RunSummary};
