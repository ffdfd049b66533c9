//! CLI output formatting.
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.
//!
//! ```text
//! ==> Built 14 pages → dist
//!     blog/first-post/ ← blog/first-post.md
//!     index.html
//!
//! Failed
//!     drafts/wip.md: unknown processor: no-such-stage
//!
//! 14 written, 2 ignored, 1 failed
//! ```

use crate::pipeline::BuildReport;

/// Format the end-of-build summary.
pub fn format_build_report(report: &BuildReport, output_dir: &str) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "==> Built {} page{} → {output_dir}",
        report.written.len(),
        if report.written.len() == 1 { "" } else { "s" },
    ));
    for path in &report.written {
        lines.push(format!("    {path}"));
    }

    if !report.failed.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        for (path, err) in &report.failed {
            lines.push(format!("    {path}: {err}"));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{} written, {} ignored, {} failed",
        report.written.len(),
        report.ignored,
        report.failed.len()
    ));
    lines
}

pub fn print_build_report(report: &BuildReport, output_dir: &str) {
    for line in format_build_report(report, output_dir) {
        println!("{line}");
    }
}

/// Format the `processors` listing: name, padded, then description.
pub fn format_processor_list(entries: &[(&str, &'static str)]) -> Vec<String> {
    let width = entries.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|(name, desc)| format!("{name:width$}  {desc}"))
        .collect()
}

pub fn print_processor_list(entries: &[(&str, &'static str)]) {
    for line in format_processor_list(entries) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineError;

    fn report() -> BuildReport {
        BuildReport {
            written: vec!["index.html".into(), "blog/post/index.html".into()],
            ignored: 1,
            failed: vec![(
                "bad.md".into(),
                PipelineError::UnknownProcessor("nope".into()),
            )],
        }
    }

    #[test]
    fn build_report_lists_written_pages() {
        let lines = format_build_report(&report(), "dist");
        assert_eq!(lines[0], "==> Built 2 pages → dist");
        assert!(lines.contains(&"    index.html".to_string()));
        assert!(lines.contains(&"    blog/post/index.html".to_string()));
    }

    #[test]
    fn build_report_shows_failures_with_causes() {
        let lines = format_build_report(&report(), "dist");
        assert!(lines.contains(&"Failed".to_string()));
        assert!(
            lines
                .iter()
                .any(|l| l.contains("bad.md") && l.contains("unknown processor"))
        );
    }

    #[test]
    fn build_report_summary_line() {
        let lines = format_build_report(&report(), "dist");
        assert_eq!(lines.last().unwrap(), "2 written, 1 ignored, 1 failed");
    }

    #[test]
    fn singular_page_count() {
        let r = BuildReport {
            written: vec!["a.html".into()],
            ..Default::default()
        };
        assert_eq!(format_build_report(&r, "out")[0], "==> Built 1 page → out");
    }

    #[test]
    fn processor_list_aligns_names() {
        let lines = format_processor_list(&[("md", "a"), ("template", "b")]);
        assert_eq!(lines[0], "md        a");
        assert_eq!(lines[1], "template  b");
    }
}
