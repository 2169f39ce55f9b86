//! Apply engine for include reconciliation.
//!
//! Responsibilities:
//! - Enumerate source files and fan the rewriter out over them.
//! - Persist rewritten files (write-only-if-changed, backups, dry-run).
//! - Patch the build configuration's include-path declaration.
//! - Generate a unified diff preview of everything that changed.

mod cmake;
mod error;
mod walker;

pub use cmake::{BuildConfigOutcome, patch_build_config, patch_declaration};
pub use error::{HaltError, ReconcileError, ReconcileResult};
pub use walker::{
    FileOutcome, PersistMode, TreeOutcome, WalkOptions, WalkSummary, default_skip_dirs,
    default_source_suffixes, rewrite_tree,
};

use camino::Utf8PathBuf;
use diffy::PatchFormatter;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Unified diff over every changed file, `diff --git` style.
pub fn render_patch(
    before: &BTreeMap<Utf8PathBuf, String>,
    after: &BTreeMap<Utf8PathBuf, String>,
) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, old) in before {
        let new = after.get(path).unwrap_or(old);
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

        let patch = diffy::create_patch(old, new);
        out.push_str(&format!("{}", formatter.fmt_patch(&patch)));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
