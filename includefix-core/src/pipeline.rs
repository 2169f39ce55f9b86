//! The reconcile pipeline, extracted from the CLI.
//!
//! Sequencing: header discovery (sequential, then frozen) → optional header
//! consolidation → parallel tree rewrite → build-config patch → report
//! assembly. Data flows one way: the registry and rule set are inputs to
//! rewriting, rewrite results feed the report, nothing flows back.

use crate::ports::WritePort;
use crate::settings::ReconcileSettings;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use fs_err as fs;
use includefix_edit::{
    BuildConfigOutcome, HaltError, PersistMode, ReconcileError, TreeOutcome, WalkOptions,
    patch_build_config, render_patch, rewrite_tree,
};
use includefix_engine::RuleSet;
use includefix_registry::{DiscoveryOptions, HeaderRegistry};
use includefix_render::render_report_md;
use includefix_types::report::{
    AmbiguityRecord, FileRecord, HeaderCandidate, PatchRecord, ReconcileReport, RunInfo,
    RunStatus, ToolInfo, UnresolvedReason, UnresolvedReference,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of `run_reconcile`.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub report: ReconcileReport,
    pub patch: String,
    pub status: RunStatus,
}

/// Run the full reconcile pipeline.
///
/// File-local problems (ambiguity, missing headers, write failures) land in
/// the report; `Err` is reserved for global conditions — an empty registry,
/// an unreadable source root, pool setup failure.
pub fn run_reconcile(
    settings: &ReconcileSettings,
    tool: ToolInfo,
) -> Result<ReconcileOutcome, ReconcileError> {
    let started_at = Utc::now();
    let run = RunInfo {
        run_id: Uuid::new_v4().to_string(),
        started_at: Some(started_at),
        ended_at: None,
        dry_run: settings.dry_run,
    };
    let mut report = ReconcileReport::new(tool, run);

    // Discovery: sequential, frozen before anything is rewritten.
    let discovery = DiscoveryOptions {
        roots: settings.include_roots.clone(),
        header_suffixes: settings.header_suffixes.clone(),
        expected: if settings.expected_headers.is_empty() {
            None
        } else {
            Some(settings.expected_headers.iter().cloned().collect())
        },
    };
    let registry = HeaderRegistry::discover(&discovery).map_err(ReconcileError::Runtime)?;
    if registry.is_empty() {
        return Err(HaltError::EmptyRegistry.into());
    }

    report.counts.headers_discovered = (registry.len() + registry.ambiguous().len()) as u64;
    report.counts.duplicate_headers = registry.duplicates().len() as u64;
    report.counts.ambiguous_names = registry.ambiguous().len() as u64;
    report.ambiguities = registry
        .ambiguous()
        .iter()
        .map(|(name, candidates)| AmbiguityRecord {
            name: name.clone(),
            candidates: candidates
                .iter()
                .map(|entry| HeaderCandidate {
                    path: entry.path.to_string(),
                    sha256: entry.sha256.clone(),
                })
                .collect(),
        })
        .collect();

    // Under strict mode, discovery ambiguity blocks any rewriting at all.
    if settings.mode == PersistMode::Strict && !registry.ambiguous().is_empty() {
        let first = registry
            .ambiguous()
            .keys()
            .next()
            .cloned()
            .unwrap_or_default();
        let halt = HaltError::AmbiguousDiscovery {
            count: report.counts.ambiguous_names,
            first,
        };
        warn!("{halt}");
        report.halted = Some(halt.to_string());
        report.status = RunStatus::Failed;
        report.run.ended_at = Some(Utc::now());
        return Ok(ReconcileOutcome {
            status: report.status,
            patch: String::new(),
            report,
        });
    }

    let include_root = settings
        .canonical_include_root()
        .ok_or_else(|| anyhow::anyhow!("at least one include root is required"))?
        .clone();

    if settings.consolidate {
        report.counts.headers_consolidated =
            consolidate_headers(&registry, &include_root, settings.dry_run)
                .map_err(ReconcileError::Runtime)?;
    }

    // Rewrite pass over the source tree.
    let rules = RuleSet::builtin(settings.root_prefixes.clone());
    let walk_opts = WalkOptions {
        source_suffixes: settings.source_suffixes.clone(),
        skip_dirs: skip_dirs_for(settings),
        mode: settings.mode,
        dry_run: settings.dry_run,
        jobs: settings.jobs,
        backup_dir: settings
            .backups_enabled
            .then(|| settings.out_dir.join("backups")),
    };
    let tree = rewrite_tree(&settings.source_root, &rules, &registry, &walk_opts)?;
    fill_report_from_tree(&mut report, &tree);

    // The patcher runs after all file rewriting completes.
    let mut before = tree.before;
    let mut after = tree.after;
    report.patch = match (&settings.build_config, tree.halted.is_none()) {
        (Some(config), true) => {
            let outcome = patch_build_config(config, &include_root, settings.dry_run)
                .map_err(ReconcileError::Runtime)?;
            record_patch(&settings.source_root, outcome, &mut before, &mut after)
        }
        _ => PatchRecord::default(),
    };

    let patch = render_patch(&before, &after);

    report.status = overall_status(&report);
    report.run.ended_at = Some(Utc::now());
    info!(
        status = ?report.status,
        files_changed = report.counts.files_changed,
        unresolved = report.counts.unresolved_references,
        "reconcile complete"
    );

    Ok(ReconcileOutcome {
        status: report.status,
        patch,
        report,
    })
}

/// Write all reconcile artifacts to the output directory.
pub fn write_reconcile_artifacts(
    outcome: &ReconcileOutcome,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    let report_json =
        serde_json::to_string_pretty(&outcome.report).context("serialize report")?;
    writer.write_file(&out_dir.join("report.json"), report_json.as_bytes())?;

    let report_md = render_report_md(&outcome.report);
    writer.write_file(&out_dir.join("report.md"), report_md.as_bytes())?;

    writer.write_file(&out_dir.join("patch.diff"), outcome.patch.as_bytes())?;

    Ok(())
}

/// Copy canonical headers that live outside the include root into it.
/// Ambiguous names never take part. Returns the number of copies performed
/// (or that would be performed under dry-run).
fn consolidate_headers(
    registry: &HeaderRegistry,
    include_root: &Utf8Path,
    dry_run: bool,
) -> anyhow::Result<u64> {
    let mut copied = 0;
    for entry in registry.canonical() {
        let target = include_root.join(&entry.name);
        if entry.path.starts_with(include_root) || target.is_file() {
            continue;
        }
        // Compare against the canonicalized root too: discovery stores
        // resolved paths, settings may hold a relative spelling.
        if include_root
            .canonicalize_utf8()
            .map(|root| entry.path.starts_with(&root))
            .unwrap_or(false)
        {
            continue;
        }
        debug!(name = %entry.name, from = %entry.path, "consolidating header into include root");
        if !dry_run {
            fs::create_dir_all(include_root)
                .with_context(|| format!("create {}", include_root))?;
            fs::copy(&entry.path, &target)
                .with_context(|| format!("copy {} to {}", entry.path, target))?;
        }
        copied += 1;
    }
    Ok(copied)
}

/// Skip the artifacts directory when it lives inside the source tree, so the
/// tool never rescans its own output.
fn skip_dirs_for(settings: &ReconcileSettings) -> Vec<String> {
    let mut skip = settings.skip_dirs.clone();
    if let Ok(rel) = settings.out_dir.strip_prefix(&settings.source_root)
        && let Some(first) = rel.components().next()
    {
        let name = first.as_str().to_string();
        if !skip.contains(&name) {
            skip.push(name);
        }
    }
    skip
}

fn fill_report_from_tree(report: &mut ReconcileReport, tree: &TreeOutcome) {
    report.counts.files_scanned = tree.summary.files_scanned;
    report.counts.files_changed = tree.summary.files_changed;
    report.counts.files_written = tree.summary.files_written;
    report.counts.unresolved_references = tree.summary.unresolved_references;
    report.counts.write_failures = tree.summary.write_failures;
    report.halted = tree.halted.clone();

    let mut missing = BTreeSet::new();
    for file in &tree.files {
        for record in &file.records {
            let includefix_engine::ReferenceOutcome::Unresolved { reason } = &record.outcome
            else {
                continue;
            };
            let reason = *reason;
            if reason == UnresolvedReason::MissingHeader {
                missing.insert(base_name(&record.reference).to_string());
            }
            report.unresolved.push(UnresolvedReference {
                file: file.path.to_string(),
                line: record.line,
                reference: record.reference.clone(),
                reason,
            });
        }

        if file.changed || file.error.is_some() {
            report.files.push(FileRecord {
                path: file.path.to_string(),
                written: file.written,
                sha256_before: file.sha256_before.clone(),
                sha256_after: file.sha256_after.clone(),
                backup_path: file.backup_path.as_ref().map(|p| p.to_string()),
                error: file.error.clone(),
            });
        }
    }
    report.counts.missing_names = missing.len() as u64;
    report.missing = missing.into_iter().collect();
}

fn record_patch(
    source_root: &Utf8Path,
    outcome: BuildConfigOutcome,
    before: &mut BTreeMap<Utf8PathBuf, String>,
    after: &mut BTreeMap<Utf8PathBuf, String>,
) -> PatchRecord {
    if let Some((old, new)) = outcome.texts {
        let key = outcome
            .path
            .strip_prefix(source_root)
            .unwrap_or(outcome.path.as_path())
            .to_path_buf();
        before.insert(key.clone(), old);
        after.insert(key, new);
    }
    PatchRecord {
        path: Some(outcome.path.to_string()),
        status: outcome.status,
        detail: outcome.detail,
    }
}

fn overall_status(report: &ReconcileReport) -> RunStatus {
    if report.halted.is_some() {
        return RunStatus::Failed;
    }
    let troubled = report.counts.unresolved_references
        + report.counts.write_failures
        + report.counts.ambiguous_names
        + report.counts.missing_names;
    if troubled > 0 {
        return RunStatus::Partial;
    }
    // Patch warnings alone stay SUCCESS; they are reported, not failures.
    RunStatus::Success
}

fn base_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}
