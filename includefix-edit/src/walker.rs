//! Source-tree enumeration and parallel rewriting.
//!
//! Files are independent: the registry and rule set are frozen before the
//! walk starts and shared by read-only reference, so the per-file rewrite
//! fans out over a bounded rayon pool without locking. Strict-mode
//! cancellation is cooperative; writes already committed stay committed.

use crate::error::{HaltError, ReconcileError};
use crate::sha256_hex;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use includefix_engine::{ReferenceOutcome, ReferenceRecord, RuleSet, rewrite_source};
use includefix_registry::HeaderRegistry;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Persistence policy on unresolved references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistMode {
    /// Abort the whole run on the first unresolved reference.
    Strict,
    /// Write what resolved; accumulate unresolved references in the report.
    #[default]
    BestEffort,
}

#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// File suffixes enumerated as rewrite candidates (without the dot).
    pub source_suffixes: Vec<String>,

    /// Directory names never descended into. Hidden directories are always
    /// skipped.
    pub skip_dirs: Vec<String>,

    pub mode: PersistMode,

    /// Run the full rewrite but suppress every filesystem write.
    pub dry_run: bool,

    /// Worker count for the rewrite pool. `None` uses the rayon default.
    pub jobs: Option<usize>,

    /// Mirror originals of overwritten files into this directory.
    pub backup_dir: Option<Utf8PathBuf>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            source_suffixes: default_source_suffixes(),
            skip_dirs: default_skip_dirs(),
            mode: PersistMode::default(),
            dry_run: false,
            jobs: None,
            backup_dir: None,
        }
    }
}

/// Source suffixes reconciled by default. Headers are included so stale
/// references between headers are repaired too.
pub fn default_source_suffixes() -> Vec<String> {
    ["cpp", "cc", "cxx", "c", "h", "hpp", "hh"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn default_skip_dirs() -> Vec<String> {
    vec!["build".to_string()]
}

/// Result of processing one source file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Path relative to the source root.
    pub path: Utf8PathBuf,
    pub changed: bool,
    pub written: bool,

    pub sha256_before: Option<String>,
    pub sha256_after: Option<String>,
    pub backup_path: Option<Utf8PathBuf>,

    pub records: Vec<ReferenceRecord>,

    /// I/O failure while reading or persisting; other files are unaffected.
    pub error: Option<String>,
}

impl FileOutcome {
    fn untouched(path: Utf8PathBuf) -> Self {
        Self {
            path,
            changed: false,
            written: false,
            sha256_before: None,
            sha256_after: None,
            backup_path: None,
            records: vec![],
            error: None,
        }
    }

    pub fn unresolved_count(&self) -> u64 {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, ReferenceOutcome::Unresolved { .. }))
            .count() as u64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub files_scanned: u64,
    pub files_changed: u64,
    pub files_written: u64,
    pub unresolved_references: u64,
    pub write_failures: u64,
}

#[derive(Debug, Clone)]
pub struct TreeOutcome {
    /// Original text of changed files, keyed by root-relative path.
    pub before: BTreeMap<Utf8PathBuf, String>,
    /// Rewritten text of changed files.
    pub after: BTreeMap<Utf8PathBuf, String>,

    pub files: Vec<FileOutcome>,
    pub summary: WalkSummary,

    /// Strict-mode stop description, if the walk was cut short.
    pub halted: Option<String>,
}

/// One processed file plus the changed texts needed for the diff preview.
struct ProcessedFile {
    outcome: FileOutcome,
    texts: Option<(String, String)>,
}

/// Enumerate `source_root`, rewrite every matching file, and persist
/// according to the options. File-local problems land in the outcome;
/// only walk-level faults (unreadable root, pool setup) are errors.
pub fn rewrite_tree(
    source_root: &Utf8Path,
    rules: &RuleSet,
    registry: &HeaderRegistry,
    opts: &WalkOptions,
) -> Result<TreeOutcome, ReconcileError> {
    if !source_root.is_dir() {
        return Err(ReconcileError::Runtime(anyhow::anyhow!(
            "source root {source_root} is not a directory"
        )));
    }

    let targets = enumerate(source_root, opts)?;
    debug!(files = targets.len(), "enumerated rewrite candidates");

    let cancelled = AtomicBool::new(false);
    let process = |target: &(Utf8PathBuf, Utf8PathBuf)| -> ProcessedFile {
        let (abs, rel) = target;
        if cancelled.load(Ordering::Relaxed) {
            return ProcessedFile {
                outcome: FileOutcome::untouched(rel.clone()),
                texts: None,
            };
        }
        let processed = process_file(abs, rel, rules, registry, opts);
        if opts.mode == PersistMode::Strict && processed.outcome.unresolved_count() > 0 {
            cancelled.store(true, Ordering::Relaxed);
        }
        processed
    };

    let results: Vec<ProcessedFile> = match opts.jobs {
        Some(jobs) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .context("build rewrite worker pool")?;
            pool.install(|| targets.par_iter().map(process).collect())
        }
        None => targets.par_iter().map(process).collect(),
    };

    let mut files = Vec::with_capacity(results.len());
    let mut before = BTreeMap::new();
    let mut after = BTreeMap::new();
    for processed in results {
        if let Some((old, new)) = processed.texts {
            before.insert(processed.outcome.path.clone(), old);
            after.insert(processed.outcome.path.clone(), new);
        }
        files.push(processed.outcome);
    }

    let mut summary = WalkSummary {
        files_scanned: files.len() as u64,
        ..WalkSummary::default()
    };
    for outcome in &files {
        summary.unresolved_references += outcome.unresolved_count();
        if outcome.changed {
            summary.files_changed += 1;
        }
        if outcome.written {
            summary.files_written += 1;
        }
        if outcome.error.is_some() {
            summary.write_failures += 1;
        }
    }

    let halted = match opts.mode {
        PersistMode::Strict => first_unresolved(&files).map(|(file, record)| {
            HaltError::UnresolvedReference {
                file: file.to_string(),
                line: record.line,
                reference: record.reference.clone(),
            }
            .to_string()
        }),
        PersistMode::BestEffort => None,
    };

    Ok(TreeOutcome {
        before,
        after,
        files,
        summary,
        halted,
    })
}

/// Matching files under the root as (absolute, root-relative) pairs, in
/// walk order (sorted by file name at every level).
fn enumerate(
    source_root: &Utf8Path,
    opts: &WalkOptions,
) -> Result<Vec<(Utf8PathBuf, Utf8PathBuf)>, ReconcileError> {
    let mut targets = Vec::new();
    let walk = WalkDir::new(source_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') && !opts.skip_dirs.iter().any(|d| d == name.as_ref())
        });

    for entry in walk {
        let entry = entry
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| format!("walk {}", source_root))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let abs = Utf8PathBuf::from_path_buf(entry.path().to_path_buf())
            .map_err(|p| anyhow::anyhow!("non-UTF-8 path: {}", p.display()))?;
        let Some(suffix) = abs.extension() else {
            continue;
        };
        if !opts.source_suffixes.iter().any(|s| s == suffix) {
            continue;
        }
        let rel = abs
            .strip_prefix(source_root)
            .unwrap_or(abs.as_path())
            .to_path_buf();
        targets.push((abs, rel));
    }

    Ok(targets)
}

fn process_file(
    abs: &Utf8Path,
    rel: &Utf8Path,
    rules: &RuleSet,
    registry: &HeaderRegistry,
    opts: &WalkOptions,
) -> ProcessedFile {
    let mut outcome = FileOutcome::untouched(rel.to_path_buf());

    let original = match fs::read_to_string(abs) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %rel, error = %err, "failed to read source file");
            outcome.error = Some(format!("read {abs}: {err}"));
            return ProcessedFile {
                outcome,
                texts: None,
            };
        }
    };

    let rewritten = rewrite_source(&original, rules, registry);
    outcome.records = rewritten.records;
    if !rewritten.changed {
        return ProcessedFile {
            outcome,
            texts: None,
        };
    }

    outcome.changed = true;
    outcome.sha256_before = Some(sha256_hex(original.as_bytes()));
    outcome.sha256_after = Some(sha256_hex(rewritten.text.as_bytes()));

    let blocked_by_strict =
        opts.mode == PersistMode::Strict && outcome.unresolved_count() > 0;

    if !opts.dry_run && !blocked_by_strict {
        match persist(abs, rel, &original, &rewritten.text, opts) {
            Ok(backup_path) => {
                outcome.written = true;
                outcome.backup_path = backup_path;
            }
            Err(err) => {
                warn!(path = %rel, error = %err, "failed to persist rewritten file");
                outcome.error = Some(format!("{err:#}"));
            }
        }
    }

    ProcessedFile {
        outcome,
        texts: Some((original, rewritten.text)),
    }
}

/// Write the rewritten text, mirroring the original into the backup
/// directory first when one is configured.
fn persist(
    abs: &Utf8Path,
    rel: &Utf8Path,
    original: &str,
    rewritten: &str,
    opts: &WalkOptions,
) -> anyhow::Result<Option<Utf8PathBuf>> {
    let mut backup_path = None;
    if let Some(backup_dir) = &opts.backup_dir {
        let target = backup_dir.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
        }
        fs::write(&target, original).with_context(|| format!("write backup {}", target))?;
        backup_path = Some(target);
    }
    fs::write(abs, rewritten).with_context(|| format!("write {}", abs))?;
    Ok(backup_path)
}

fn first_unresolved<'a>(
    files: &'a [FileOutcome],
) -> Option<(&'a Utf8Path, &'a ReferenceRecord)> {
    files
        .iter()
        .flat_map(|f| {
            f.records
                .iter()
                .filter(|r| matches!(r.outcome, ReferenceOutcome::Unresolved { .. }))
                .map(move |r| (f.path.as_path(), r))
        })
        .min_by(|(pa, ra), (pb, rb)| pa.cmp(pb).then(ra.line.cmp(&rb.line)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use includefix_registry::{DiscoveryOptions, HeaderRegistry};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn utf8(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 temp path")
    }

    fn write(root: &Utf8Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write fixture");
    }

    fn read(root: &Utf8Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).expect("read back")
    }

    /// A small tree in the shape the tool is built for: headers scattered
    /// between `include/` and `src/`, sources using three reference styles.
    fn fixture(root: &Utf8Path) {
        write(root, "include/Graphics.h", "#pragma once\n");
        write(root, "include/UFO.h", "#pragma once\n#include \"Graphics.h\"\n");
        write(
            root,
            "src/Game.cpp",
            "#include \"../include/Graphics.h\"\n#include <vector>\n",
        );
        write(
            root,
            "src/Entity/UFO.cpp",
            "#include \"../UFO.h\"\n#include \"include/Graphics.h\"\n",
        );
        write(root, "src/notes.txt", "#include \"../UFO.h\"\n");
        write(root, "build/gen.cpp", "#include \"../UFO.h\"\n");
    }

    fn registry(root: &Utf8Path) -> HeaderRegistry {
        HeaderRegistry::discover(&DiscoveryOptions::new(vec![root.join("include")]))
            .expect("discover")
    }

    fn walk(root: &Utf8Path, opts: &WalkOptions) -> TreeOutcome {
        rewrite_tree(&root.join("src"), &RuleSet::default(), &registry(root), opts)
            .expect("rewrite tree")
    }

    #[test]
    fn rewrites_and_persists_changed_files() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8(&temp);
        fixture(&root);

        let outcome = walk(&root, &WalkOptions::default());

        assert_eq!(outcome.summary.files_scanned, 2);
        assert_eq!(outcome.summary.files_changed, 2);
        assert_eq!(outcome.summary.files_written, 2);
        assert_eq!(outcome.summary.unresolved_references, 0);
        assert_eq!(
            read(&root, "src/Game.cpp"),
            "#include \"Graphics.h\"\n#include <vector>\n"
        );
        assert_eq!(
            read(&root, "src/Entity/UFO.cpp"),
            "#include \"UFO.h\"\n#include \"Graphics.h\"\n"
        );
    }

    #[test]
    fn non_source_files_and_skip_dirs_are_ignored() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8(&temp);
        fixture(&root);

        walk(&root, &WalkOptions::default());

        assert_eq!(read(&root, "src/notes.txt"), "#include \"../UFO.h\"\n");

        let full = rewrite_tree(
            &root,
            &RuleSet::default(),
            &registry(&root),
            &WalkOptions::default(),
        )
        .expect("rewrite whole tree");
        assert_eq!(read(&root, "build/gen.cpp"), "#include \"../UFO.h\"\n");
        assert!(full.files.iter().all(|f| !f.path.starts_with("build")));
    }

    #[test]
    fn second_walk_reaches_the_fixed_point() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8(&temp);
        fixture(&root);

        walk(&root, &WalkOptions::default());
        let second = walk(&root, &WalkOptions::default());

        assert_eq!(second.summary.files_changed, 0);
        assert_eq!(second.summary.files_written, 0);
        assert_eq!(second.summary.unresolved_references, 0);
        assert!(second.before.is_empty());
    }

    #[test]
    fn dry_run_reports_without_touching_disk() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8(&temp);
        fixture(&root);

        let opts = WalkOptions {
            dry_run: true,
            ..WalkOptions::default()
        };
        let outcome = walk(&root, &opts);

        assert_eq!(outcome.summary.files_changed, 2);
        assert_eq!(outcome.summary.files_written, 0);
        assert_eq!(
            read(&root, "src/Game.cpp"),
            "#include \"../include/Graphics.h\"\n#include <vector>\n"
        );
        // The preview still shows what would change.
        assert_eq!(outcome.before.len(), 2);
    }

    #[test]
    fn best_effort_writes_resolved_files_and_records_the_rest() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8(&temp);
        fixture(&root);
        write(
            &root,
            "src/Broken.cpp",
            "#include \"Core/Missing.h\"\n#include \"../UFO.h\"\n",
        );

        let outcome = walk(&root, &WalkOptions::default());

        assert_eq!(outcome.summary.unresolved_references, 1);
        assert_eq!(outcome.summary.files_written, 3);
        // The resolvable reference in the troubled file is still repaired.
        assert_eq!(
            read(&root, "src/Broken.cpp"),
            "#include \"Core/Missing.h\"\n#include \"UFO.h\"\n"
        );
        assert!(outcome.halted.is_none());
    }

    #[test]
    fn strict_mode_halts_and_leaves_troubled_files_unwritten() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8(&temp);
        fixture(&root);
        write(
            &root,
            "src/Broken.cpp",
            "#include \"Core/Missing.h\"\n#include \"../UFO.h\"\n",
        );

        let opts = WalkOptions {
            mode: PersistMode::Strict,
            ..WalkOptions::default()
        };
        let outcome = walk(&root, &opts);

        let halted = outcome.halted.expect("strict walk halts");
        assert!(halted.contains("Core/Missing.h"));
        assert_eq!(
            read(&root, "src/Broken.cpp"),
            "#include \"Core/Missing.h\"\n#include \"../UFO.h\"\n"
        );
    }

    #[test]
    fn backups_mirror_originals() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8(&temp);
        fixture(&root);

        let backup_dir = root.join("backups");
        let opts = WalkOptions {
            backup_dir: Some(backup_dir.clone()),
            ..WalkOptions::default()
        };
        let outcome = walk(&root, &opts);

        assert_eq!(outcome.summary.files_written, 2);
        assert_eq!(
            fs::read_to_string(backup_dir.join("Game.cpp")).expect("backup exists"),
            "#include \"../include/Graphics.h\"\n#include <vector>\n"
        );
    }

    #[test]
    fn missing_source_root_is_a_runtime_error() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8(&temp);

        let err = rewrite_tree(
            &root.join("no-such-dir"),
            &RuleSet::default(),
            &HeaderRegistry::default(),
            &WalkOptions::default(),
        )
        .expect_err("missing root fails");
        assert!(!err.is_halt());
    }

    #[test]
    fn single_worker_pool_is_deterministic() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8(&temp);
        fixture(&root);

        let opts = WalkOptions {
            jobs: Some(1),
            dry_run: true,
            ..WalkOptions::default()
        };
        let first = walk(&root, &opts);
        let second = walk(&root, &opts);

        let changed = |o: &TreeOutcome| {
            o.files
                .iter()
                .filter(|f| f.changed)
                .map(|f| f.path.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(changed(&first), changed(&second));
        assert_eq!(first.after, second.after);
    }
}
