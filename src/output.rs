//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! 001 beach.png (4.1 MB)
//!     Source: photos/2024/beach.png
//! 002 dunes.jpg (2.3 MB)
//!     Source: photos/2024/dunes.jpg
//!
//! 2 images, 6.4 MB
//! ```
//!
//! ## Compress
//!
//! ```text
//! Compressing 12 images (6.4 MB) with 4 workers
//! [  3/12]  25%  6.4 MB → 310.2 KB
//!     Could not open "broken.jpg" (unexpected end of file)
//!     Warning: Compressed "dunes.jpg" but could not remove the original (permission denied)
//! [ 11/12]  92%  6.4 MB → 1.1 MB
//! Completed: 11 compressed, 1 failed, saved 81.7%
//! ```
//!
//! Savings compare each completed output against its own source; failed and
//! skipped images do not count on either side.
//!
//! # Architecture
//!
//! Each `format_*` function returns `Vec<String>` for testability and has a
//! `print_*` wrapper that writes to stdout. Format functions are pure: no
//! I/O, no side effects.

use crate::pipeline::{PipelineEvent, ProgressSnapshot, RunStatus, RunSummary};
use crate::types::SourceEntry;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count using 1024-based units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the discovered entries, paths shown relative to `root` when possible.
pub fn format_scan_output(entries: &[SourceEntry], root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let mut total = 0;

    for (i, entry) in entries.iter().enumerate() {
        let size = entry.original_size.unwrap_or(0);
        total += size;
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            file_name(entry.path()),
            format_bytes(size)
        ));
        let shown = entry.path().strip_prefix(root).unwrap_or(entry.path());
        lines.push(format!("{}Source: {}", indent(1), shown.display()));
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{}, {}",
        plural(entries.len(), "image"),
        format_bytes(total)
    ));
    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(entries: &[SourceEntry], root: &Path) {
    for line in format_scan_output(entries, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Pipeline output
// ============================================================================

/// One-line progress bar: counter, percentage and the byte totals so far.
pub fn format_progress(snapshot: &ProgressSnapshot) -> String {
    let width = snapshot.total.to_string().len().max(3);
    format!(
        "[{:>width$}/{}] {:>3}%  {} \u{2192} {}",
        snapshot.completed,
        snapshot.total,
        (snapshot.fraction * 100.0).round() as u32,
        format_bytes(snapshot.original_total_bytes),
        format_bytes(snapshot.compressed_total_bytes),
    )
}

/// Final line of a run.
pub fn format_summary(summary: &RunSummary) -> String {
    let status = match summary.status {
        RunStatus::Completed => "Completed",
        RunStatus::Cancelled => "Cancelled",
    };
    let mut line = format!(
        "{status}: {} compressed",
        summary.progress.completed
    );
    if summary.failed > 0 {
        line.push_str(&format!(", {} failed", summary.failed));
    }
    if summary.skipped > 0 {
        line.push_str(&format!(", {} skipped", summary.skipped));
    }
    if let Some(saved) = summary.progress.savings_percent() {
        line.push_str(&format!(", saved {saved:.1}%"));
    }
    line
}

/// Format a single pipeline event as display lines.
pub fn format_pipeline_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::Started {
            total,
            workers,
            original_total_bytes,
        } => vec![format!(
            "Compressing {} ({}) with {}",
            plural(*total, "image"),
            format_bytes(*original_total_bytes),
            plural(*workers, "worker")
        )],
        PipelineEvent::Progress(snapshot) => vec![format_progress(snapshot)],
        PipelineEvent::ItemFailed(err) if err.is_warning() => {
            vec![format!("{}Warning: {}", indent(1), err)]
        }
        PipelineEvent::ItemFailed(err) => vec![format!("{}{}", indent(1), err)],
        PipelineEvent::Finished(summary) => vec![format_summary(summary)],
    }
}

/// Print a pipeline event to stdout.
pub fn print_pipeline_event(event: &PipelineEvent) {
    for line in format_pipeline_event(event) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ErrorKind, ItemError};

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads_to_three() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn format_bytes_small() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
    }

    #[test]
    fn format_bytes_scaled() {
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "image"), "1 image");
        assert_eq!(plural(0, "image"), "0 images");
        assert_eq!(plural(4, "worker"), "4 workers");
    }

    // =========================================================================
    // Scan output tests
    // =========================================================================

    #[test]
    fn scan_output_lists_entries_relative_to_root() {
        let mut a = SourceEntry::new("/photos/2024/beach.png");
        a.original_size = Some(2048);
        let mut b = SourceEntry::new("/photos/dunes.jpg");
        b.original_size = Some(1024);

        let lines = format_scan_output(&[a, b], Path::new("/photos"));
        assert_eq!(
            lines,
            vec![
                "001 beach.png (2.0 KB)",
                "    Source: 2024/beach.png",
                "002 dunes.jpg (1.0 KB)",
                "    Source: dunes.jpg",
                "",
                "2 images, 3.0 KB",
            ]
        );
    }

    #[test]
    fn scan_output_empty() {
        let lines = format_scan_output(&[], Path::new("/photos"));
        assert_eq!(lines, vec!["0 images, 0 B"]);
    }

    // =========================================================================
    // Pipeline event tests
    // =========================================================================

    fn snapshot(completed: usize, total: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            fraction: completed as f64 / total as f64,
            completed,
            total,
            original_total_bytes: 4096,
            compressed_total_bytes: 1024,
            completed_original_bytes: 4096,
            per_entry_compressed: Vec::new(),
        }
    }

    #[test]
    fn started_line() {
        let lines = format_pipeline_event(&PipelineEvent::Started {
            total: 12,
            workers: 1,
            original_total_bytes: 2048,
        });
        assert_eq!(lines, vec!["Compressing 12 images (2.0 KB) with 1 worker"]);
    }

    #[test]
    fn progress_line() {
        let lines = format_pipeline_event(&PipelineEvent::Progress(snapshot(3, 12)));
        assert_eq!(lines, vec!["[  3/12]  25%  4.0 KB \u{2192} 1.0 KB"]);
    }

    #[test]
    fn item_failure_is_indented() {
        let err = ItemError::new(
            0,
            Path::new("/x/broken.jpg"),
            ErrorKind::LoadFailed,
            "unexpected end of file",
        );
        let lines = format_pipeline_event(&PipelineEvent::ItemFailed(err));
        assert_eq!(
            lines,
            vec!["    Could not open \"broken.jpg\" (unexpected end of file)"]
        );
    }

    #[test]
    fn delete_failure_is_rendered_as_warning() {
        let err = ItemError::new(
            4,
            Path::new("/x/dunes.jpg"),
            ErrorKind::DeleteFailed,
            "permission denied",
        );
        let lines = format_pipeline_event(&PipelineEvent::ItemFailed(err));
        assert_eq!(
            lines,
            vec![
                "    Warning: Compressed \"dunes.jpg\" but could not remove the original (permission denied)"
            ]
        );
    }

    #[test]
    fn summary_savings_only_count_completed_sources() {
        let summary = RunSummary {
            status: RunStatus::Completed,
            progress: ProgressSnapshot {
                fraction: 0.5,
                completed: 1,
                total: 2,
                original_total_bytes: 2000,
                compressed_total_bytes: 900,
                completed_original_bytes: 1000,
                per_entry_compressed: vec![Some(900), None],
            },
            failed: 1,
            skipped: 0,
        };
        assert_eq!(
            format_summary(&summary),
            "Completed: 1 compressed, 1 failed, saved 10.0%"
        );
    }

    #[test]
    fn summary_line_completed() {
        let summary = RunSummary {
            status: RunStatus::Completed,
            progress: snapshot(11, 12),
            failed: 1,
            skipped: 0,
        };
        assert_eq!(
            format_summary(&summary),
            "Completed: 11 compressed, 1 failed, saved 75.0%"
        );
    }

    #[test]
    fn summary_line_cancelled_without_savings() {
        let summary = RunSummary {
            status: RunStatus::Cancelled,
            progress: ProgressSnapshot {
                total: 5,
                ..Default::default()
            },
            failed: 0,
            skipped: 5,
        };
        assert_eq!(format_summary(&summary), "Cancelled: 0 compressed, 5 skipped");
    }
}
