//! Build-configuration patching.
//!
//! The include-search-path declaration is located by a fixed textual shape,
//! never parsed structurally. Exactly one matching declaration is patched;
//! zero or several leave the file untouched with a warning — the patcher
//! never guesses and never injects an unrelated declaration.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use includefix_types::report::PatchStatus;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static INCLUDE_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"target_include_directories\s*\([^)]*\)").unwrap());

/// Result of one build-configuration patch attempt.
#[derive(Debug, Clone)]
pub struct BuildConfigOutcome {
    pub path: Utf8PathBuf,
    pub status: PatchStatus,

    /// Human-readable note for warnings.
    pub detail: Option<String>,

    /// Original and patched text, present when the declaration was rewritten.
    pub texts: Option<(String, String)>,

    pub written: bool,
}

/// Rewrite the single include-path declaration in `text` to point only at
/// `include_dir`. Pure; the caller decides whether to persist.
pub fn patch_declaration(text: &str, include_dir: &str) -> (String, PatchStatus) {
    let matches: Vec<_> = INCLUDE_DECLARATION.find_iter(text).collect();
    match matches.len() {
        0 => (text.to_string(), PatchStatus::TargetNotFound),
        1 => {
            let span = matches[0].range();
            let declaration = canonical_declaration(include_dir);
            if &text[span.clone()] == declaration {
                (text.to_string(), PatchStatus::AlreadyCanonical)
            } else {
                let mut patched = String::with_capacity(text.len());
                patched.push_str(&text[..span.start]);
                patched.push_str(&declaration);
                patched.push_str(&text[span.end..]);
                (patched, PatchStatus::Patched)
            }
        }
        _ => (text.to_string(), PatchStatus::TargetAmbiguous),
    }
}

fn canonical_declaration(include_dir: &str) -> String {
    format!("target_include_directories(${{PROJECT_NAME}} PRIVATE\n    {include_dir}\n)")
}

/// Patch the build configuration on disk. A missing file or an unexpected
/// declaration count is a warning, not an error.
pub fn patch_build_config(
    path: &Utf8Path,
    include_root: &Utf8Path,
    dry_run: bool,
) -> anyhow::Result<BuildConfigOutcome> {
    if !path.is_file() {
        warn!(path = %path, "build configuration not found, skipping patch");
        return Ok(BuildConfigOutcome {
            path: path.to_path_buf(),
            status: PatchStatus::TargetNotFound,
            detail: Some("build configuration file not found".to_string()),
            texts: None,
            written: false,
        });
    }

    let text = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
    let include_dir = display_dir(path, include_root);
    let (patched, status) = patch_declaration(&text, &include_dir);

    let mut outcome = BuildConfigOutcome {
        path: path.to_path_buf(),
        status,
        detail: None,
        texts: None,
        written: false,
    };

    match status {
        PatchStatus::Patched => {
            if !dry_run {
                fs::write(path, &patched).with_context(|| format!("write {}", path))?;
                outcome.written = true;
            }
            debug!(path = %path, include_dir = %include_dir, "patched include-path declaration");
            outcome.texts = Some((text, patched));
        }
        PatchStatus::AlreadyCanonical => {
            debug!(path = %path, "include-path declaration already canonical");
        }
        PatchStatus::TargetNotFound => {
            warn!(path = %path, "no include-path declaration matches the expected shape");
            outcome.detail = Some("no matching declaration found".to_string());
        }
        PatchStatus::TargetAmbiguous => {
            warn!(path = %path, "multiple include-path declarations found, refusing to choose");
            outcome.detail = Some("multiple candidate declarations found".to_string());
        }
        PatchStatus::Skipped => {}
    }

    Ok(outcome)
}

/// How the include root is spelled inside the declaration: relative to the
/// build configuration's directory when possible, literal otherwise.
fn display_dir(config_path: &Utf8Path, include_root: &Utf8Path) -> String {
    let config_dir = config_path.parent().unwrap_or(Utf8Path::new("."));
    match include_root.strip_prefix(config_dir) {
        Ok(rel) if !rel.as_str().is_empty() => {
            format!("${{CMAKE_CURRENT_SOURCE_DIR}}/{rel}")
        }
        _ => include_root.to_string(),
    }
}
