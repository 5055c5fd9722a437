//! Run reporter - drives a whole patch run and summarizes it
//!
//! Every target is processed, in order, regardless of what happened to the
//! previous ones. Missing files and unmatched anchors are reported, not
//! treated as run failures.

use crate::edit::TargetFile;
use crate::executor::{self, FileOutcome, FileStatus, OperationStatus};
use colored::Colorize;
use std::fmt;
use std::io::{self, Write};
use tracing::{debug, warn};

/// Aggregated outcomes of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
}

impl RunSummary {
    pub fn patched(&self) -> usize {
        self.count_where(|status| status == FileStatus::Patched)
    }

    pub fn skipped(&self) -> usize {
        self.count_where(|status| {
            matches!(
                status,
                FileStatus::SkippedNoAnchor | FileStatus::SkippedAlreadyPresent
            )
        })
    }

    pub fn missing(&self) -> usize {
        self.count_where(|status| status == FileStatus::MissingFile)
    }

    pub fn failed(&self) -> usize {
        self.count_where(|status| status == FileStatus::WriteFailed)
    }

    /// Files that were written but had at least one unmatched anchor.
    pub fn partial(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_partial()).count()
    }

    /// Process exit code for this run.
    ///
    /// Skipped and missing files still count as success; only a failed
    /// write-back is an error.
    pub fn exit_code(&self) -> i32 {
        if self.failed() > 0 {
            1
        } else {
            0
        }
    }

    fn count_where(&self, pred: impl Fn(FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o.status)).count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} patched, {} skipped, {} missing",
            self.patched(),
            self.skipped(),
            self.missing()
        )?;
        if self.failed() > 0 {
            write!(f, ", {} failed", self.failed())?;
        }
        Ok(())
    }
}

/// Run every target and print the report to stdout.
pub fn run(targets: &[TargetFile]) -> RunSummary {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_to(targets, &mut out)
}

/// Run every target, writing the report to `out`.
///
/// A failing writer stops the report but never the run.
pub fn run_to(targets: &[TargetFile], out: &mut impl Write) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut reporting = true;

    for target in targets {
        let outcome = executor::apply_target(target);
        debug!(
            path = %outcome.path.display(),
            status = %outcome.status,
            original_hash = ?outcome.original_hash,
            final_hash = ?outcome.final_hash,
            "target processed"
        );
        if reporting {
            if let Err(err) = write_outcome(out, &outcome) {
                warn!(error = %err, "report output failed, continuing run silently");
                reporting = false;
            }
        }
        summary.outcomes.push(outcome);
    }

    if reporting {
        if let Err(err) = write_summary(out, &summary) {
            warn!(error = %err, "report output failed");
        }
    }
    summary
}

/// One status line for the file, plus per-edit lines when they add information.
pub fn write_outcome(out: &mut impl Write, outcome: &FileOutcome) -> io::Result<()> {
    let path = outcome.path.display();
    match outcome.status {
        FileStatus::Patched if outcome.is_partial() => writeln!(
            out,
            "{} {}: partially patched ({} of {} edits)",
            "◐".yellow(),
            path,
            outcome.count(OperationStatus::Patched),
            outcome.operations.len()
        )?,
        FileStatus::Patched => writeln!(out, "{} {}: patched", "✓".green(), path)?,
        FileStatus::SkippedNoAnchor => {
            writeln!(out, "{} {}: skipped (no anchor matched)", "⊘".cyan(), path)?
        }
        FileStatus::SkippedAlreadyPresent => {
            writeln!(out, "{} {}: skipped (already present)", "⊙".yellow(), path)?
        }
        FileStatus::MissingFile => writeln!(out, "{} {}: file not found", "✗".red(), path)?,
        FileStatus::WriteFailed => writeln!(
            out,
            "{} {}: write failed - {}",
            "✗".red(),
            path,
            outcome.detail.as_deref().unwrap_or("unknown error")
        )?,
    }

    if outcome.operations.len() > 1 || outcome.is_partial() {
        for op in &outcome.operations {
            let marker = match op.status {
                OperationStatus::Patched => "✓".green(),
                OperationStatus::SkippedNoAnchor => "⊘".cyan(),
                OperationStatus::SkippedAlreadyPresent => "⊙".yellow(),
            };
            writeln!(out, "    {} {}: {}", marker, op.name, op.status)?;
            if let Some(hint) = &op.nearest {
                writeln!(
                    out,
                    "      {}",
                    format!(
                        "nearest line {} ({:.0}% similar): {}",
                        hint.line_number,
                        hint.similarity * 100.0,
                        hint.text
                    )
                    .dimmed()
                )?;
            }
        }
    }

    Ok(())
}

pub fn write_summary(out: &mut impl Write, summary: &RunSummary) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "Summary:".bold())?;
    writeln!(out, "  {} patched", format!("{}", summary.patched()).green())?;
    writeln!(out, "  {} skipped", format!("{}", summary.skipped()).cyan())?;
    writeln!(out, "  {} missing", format!("{}", summary.missing()).red())?;
    if summary.partial() > 0 {
        writeln!(
            out,
            "  {} partially patched",
            format!("{}", summary.partial()).yellow()
        )?;
    }
    if summary.failed() > 0 {
        writeln!(out, "  {} failed", format!("{}", summary.failed()).red())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::PatchOperation;
    use std::fs;

    fn render(targets: &[TargetFile]) -> (RunSummary, String) {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        let summary = run_to(targets, &mut buf);
        (summary, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_run_continues_past_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.ts");
        fs::write(&present, "let a = 1;").unwrap();

        let targets = vec![
            TargetFile::new(
                dir.path().join("missing.ts"),
                vec![PatchOperation::replace_first("a", "b")],
            ),
            TargetFile::new(
                &present,
                vec![PatchOperation::replace_first("a = 1", "a = 2")],
            ),
        ];

        let (summary, output) = render(&targets);
        assert_eq!(summary.missing(), 1);
        assert_eq!(summary.patched(), 1);
        assert_eq!(summary.exit_code(), 0);
        assert!(output.contains("missing.ts: file not found"));
        assert!(output.contains("present.ts: patched"));
        assert!(output.contains("1 missing"));
        assert_eq!(fs::read_to_string(&present).unwrap(), "let a = 2;");
    }

    #[test]
    fn test_partial_file_lists_each_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.tsx");
        fs::write(&path, "import A from 'a';\n").unwrap();

        let targets = vec![TargetFile::new(
            &path,
            vec![
                PatchOperation::replace_first("import B from 'b';", "x").labeled("stale"),
                PatchOperation::replace_first("import A from 'a';", "import A2 from 'a';")
                    .labeled("fresh"),
            ],
        )];

        let (summary, output) = render(&targets);
        assert_eq!(summary.partial(), 1);
        assert!(output.contains("partially patched (1 of 2 edits)"));
        assert!(output.contains("stale: anchor not found"));
        assert!(output.contains("fresh: patched"));
        assert!(output.contains("nearest line 1"));
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary::default();
        assert_eq!(summary.to_string(), "0 patched, 0 skipped, 0 missing");
        assert_eq!(summary.exit_code(), 0);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failing_writer_does_not_stop_run() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.ts");
        let second = dir.path().join("second.ts");
        fs::write(&first, "one").unwrap();
        fs::write(&second, "two").unwrap();

        let targets = vec![
            TargetFile::new(&first, vec![PatchOperation::replace_first("one", "ONE")]),
            TargetFile::new(&second, vec![PatchOperation::replace_first("two", "TWO")]),
        ];

        let summary = run_to(&targets, &mut BrokenPipe);
        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(summary.patched(), 2);
        assert_eq!(fs::read_to_string(&first).unwrap(), "ONE");
        assert_eq!(fs::read_to_string(&second).unwrap(), "TWO");
    }

    // procfs entries without a write handler reject writes even for root
    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_sets_exit_code_and_run_continues() {
        if fs::read_to_string("/proc/version").is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let later = dir.path().join("later.ts");
        fs::write(&later, "let a = 1;").unwrap();

        let targets = vec![
            TargetFile::new(
                "/proc/version",
                vec![PatchOperation::replace_first("Linux version", "Patched version")],
            ),
            TargetFile::new(&later, vec![PatchOperation::replace_first("1", "2")]),
        ];

        let (summary, output) = render(&targets);
        assert_eq!(summary.outcomes[0].status, FileStatus::WriteFailed);
        assert!(summary.outcomes[0].detail.is_some());
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.patched(), 1);
        assert_eq!(summary.exit_code(), 1);
        assert!(summary.to_string().ends_with(", 1 failed"));
        assert!(output.contains("/proc/version: write failed - "));
        assert!(output.contains("1 failed"));
        assert_eq!(fs::read_to_string(&later).unwrap(), "let a = 2;");
    }
}
