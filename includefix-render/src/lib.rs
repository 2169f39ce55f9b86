//! Rendering helpers (markdown) for human-readable artifacts.

use includefix_types::report::{PatchStatus, ReconcileReport, RunStatus, UnresolvedReason};

pub fn render_report_md(report: &ReconcileReport) -> String {
    let mut out = String::new();
    out.push_str("# includefix report\n\n");
    out.push_str(&format!("- Status: `{}`\n", status_label(report.status)));
    if report.run.dry_run {
        out.push_str("- Dry run: no files were written\n");
    }
    out.push_str(&format!(
        "- Files: {} scanned, {} changed, {} written\n",
        report.counts.files_scanned, report.counts.files_changed, report.counts.files_written
    ));
    out.push_str(&format!(
        "- Headers: {} discovered ({} duplicates, {} ambiguous, {} consolidated)\n",
        report.counts.headers_discovered,
        report.counts.duplicate_headers,
        report.counts.ambiguous_names,
        report.counts.headers_consolidated
    ));
    out.push_str(&format!(
        "- Unresolved references: {}\n",
        report.counts.unresolved_references
    ));
    out.push_str(&format!(
        "- Build config: `{}`\n",
        patch_label(report.patch.status)
    ));
    if let Some(halted) = &report.halted {
        out.push_str(&format!("- Halted: {}\n", halted));
    }
    out.push('\n');

    if !report.ambiguities.is_empty() {
        out.push_str("## Ambiguous headers\n\n");
        for ambiguity in &report.ambiguities {
            out.push_str(&format!("### {}\n\n", ambiguity.name));
            for candidate in &ambiguity.candidates {
                out.push_str(&format!(
                    "- `{}` sha256 `{}`\n",
                    candidate.path, candidate.sha256
                ));
            }
            out.push('\n');
        }
    }

    if !report.unresolved.is_empty() {
        out.push_str("## Unresolved references\n\n");
        for reference in &report.unresolved {
            out.push_str(&format!(
                "- `{}:{}` `\"{}\"` ({})\n",
                reference.file,
                reference.line,
                reference.reference,
                reason_label(reference.reason)
            ));
        }
        out.push('\n');
    }

    if !report.missing.is_empty() {
        out.push_str("## Missing headers\n\n");
        for name in &report.missing {
            out.push_str(&format!("- `{}`\n", name));
        }
        out.push('\n');
    }

    if !report.files.is_empty() {
        out.push_str("## Files\n\n");
        for file in &report.files {
            let mark = if file.written {
                "written"
            } else if file.error.is_some() {
                "failed"
            } else {
                "pending"
            };
            out.push_str(&format!("- `{}` {}\n", file.path, mark));
            if let Some(error) = &file.error {
                out.push_str(&format!("  - error: {}\n", error));
            }
        }
        out.push('\n');
    }

    out
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Success => "success",
        RunStatus::Partial => "partial",
        RunStatus::Failed => "failed",
    }
}

fn patch_label(status: PatchStatus) -> &'static str {
    match status {
        PatchStatus::Skipped => "skipped",
        PatchStatus::Patched => "patched",
        PatchStatus::AlreadyCanonical => "already canonical",
        PatchStatus::TargetNotFound => "target not found",
        PatchStatus::TargetAmbiguous => "target ambiguous",
    }
}

fn reason_label(reason: UnresolvedReason) -> &'static str {
    match reason {
        UnresolvedReason::AmbiguousHeader => "ambiguous header",
        UnresolvedReason::MissingHeader => "missing header",
        UnresolvedReason::UnrecognizedShape => "unrecognized shape",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use includefix_types::report::{
        AmbiguityRecord, HeaderCandidate, ReconcileReport, RunInfo, ToolInfo, UnresolvedReference,
    };

    fn report() -> ReconcileReport {
        ReconcileReport::new(
            ToolInfo {
                name: "includefix".to_string(),
                version: Some("1.0.0".to_string()),
                commit: None,
            },
            RunInfo {
                run_id: "r".to_string(),
                started_at: None,
                ended_at: None,
                dry_run: false,
            },
        )
    }

    #[test]
    fn clean_report_renders_summary_only() {
        let md = render_report_md(&report());
        assert!(md.starts_with("# includefix report"));
        assert!(md.contains("- Status: `success`"));
        assert!(!md.contains("## Ambiguous headers"));
        assert!(!md.contains("## Unresolved references"));
    }

    #[test]
    fn sections_appear_when_populated() {
        let mut report = report();
        report.status = RunStatus::Partial;
        report.ambiguities.push(AmbiguityRecord {
            name: "Graphics.h".to_string(),
            candidates: vec![HeaderCandidate {
                path: "/a/Graphics.h".to_string(),
                sha256: "aa".to_string(),
            }],
        });
        report.unresolved.push(UnresolvedReference {
            file: "src/Game.cpp".to_string(),
            line: 3,
            reference: "Core/Input.h".to_string(),
            reason: UnresolvedReason::MissingHeader,
        });
        report.missing.push("Input.h".to_string());

        let md = render_report_md(&report);
        assert!(md.contains("- Status: `partial`"));
        assert!(md.contains("### Graphics.h"));
        assert!(md.contains("`src/Game.cpp:3` `\"Core/Input.h\"` (missing header)"));
        assert!(md.contains("## Missing headers"));
    }

    #[test]
    fn dry_run_is_called_out() {
        let mut report = report();
        report.run.dry_run = true;
        let md = render_report_md(&report);
        assert!(md.contains("Dry run"));
    }
}
