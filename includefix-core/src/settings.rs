//! Clap-free settings for the reconcile pipeline.

use camino::Utf8PathBuf;
use includefix_edit::{PersistMode, default_skip_dirs, default_source_suffixes};
use includefix_registry::default_header_suffixes;

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Root of the tree whose references are rewritten.
    pub source_root: Utf8PathBuf,

    /// Candidate roots for header discovery, highest priority first.
    /// The first entry is the canonical include root.
    pub include_roots: Vec<Utf8PathBuf>,

    /// Build configuration to patch. `None` skips the patch step.
    pub build_config: Option<Utf8PathBuf>,

    /// Output directory for artifacts (report.json, report.md, patch.diff).
    pub out_dir: Utf8PathBuf,

    pub mode: PersistMode,
    pub dry_run: bool,

    /// Copy canonical headers that live outside the include root into it.
    pub consolidate: bool,

    /// Worker count for the rewrite pool. `None` uses the rayon default.
    pub jobs: Option<usize>,

    // Discovery
    pub header_suffixes: Vec<String>,
    /// Restrict discovery to these base names; empty means unconstrained.
    pub expected_headers: Vec<String>,

    // Rewriting
    pub source_suffixes: Vec<String>,
    pub skip_dirs: Vec<String>,
    /// Tree prefixes recognized by the root-prefixed rule.
    pub root_prefixes: Vec<String>,

    // Backups
    pub backups_enabled: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            source_root: Utf8PathBuf::from("."),
            include_roots: vec![Utf8PathBuf::from("include")],
            build_config: None,
            out_dir: Utf8PathBuf::from("artifacts/includefix"),
            mode: PersistMode::default(),
            dry_run: false,
            consolidate: true,
            jobs: None,
            header_suffixes: default_header_suffixes(),
            expected_headers: Vec::new(),
            source_suffixes: default_source_suffixes(),
            skip_dirs: default_skip_dirs(),
            root_prefixes: includefix_engine::default_root_prefixes(),
            backups_enabled: false,
        }
    }
}

impl ReconcileSettings {
    /// The canonical include root: the highest-priority candidate root.
    pub fn canonical_include_root(&self) -> Option<&Utf8PathBuf> {
        self.include_roots.first()
    }
}
