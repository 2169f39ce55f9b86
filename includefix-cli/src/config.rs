//! Configuration file loading for includefix.
//!
//! Discovers and loads `includefix.toml` from the source root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "includefix.toml";

/// Top-level configuration from includefix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IncludefixConfig {
    /// Header discovery settings.
    pub discovery: DiscoverySection,

    /// Rewrite and persistence settings.
    pub rewrite: RewriteSection,

    /// Backup settings.
    pub backups: BackupsSection,
}

/// Discovery section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// Candidate roots, highest priority first, relative to the source root.
    pub include_roots: Vec<Utf8PathBuf>,

    /// Header suffixes (without the dot).
    pub header_suffixes: Vec<String>,

    /// Restrict discovery to these base names.
    pub expected: Vec<String>,
}

/// Rewrite section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RewriteSection {
    /// Persistence mode: "strict" or "best-effort".
    pub mode: Option<String>,

    /// Source suffixes enumerated for rewriting (without the dot).
    pub source_suffixes: Vec<String>,

    /// Directory names never descended into.
    pub skip_dirs: Vec<String>,

    /// Tree prefixes recognized by the root-prefixed rule.
    pub root_prefixes: Vec<String>,

    /// Worker count for the rewrite pool.
    pub jobs: Option<usize>,
}

/// Backups section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BackupsSection {
    /// Whether to mirror originals of overwritten files into the out dir.
    pub enabled: bool,
}

/// Discover the includefix.toml config file.
///
/// Searches for `includefix.toml` in the source root directory.
/// Returns `None` if no config file is found.
pub fn discover_config(source_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = source_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse an includefix.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<IncludefixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<IncludefixConfig> {
    let config: IncludefixConfig = toml::from_str(contents).context("invalid TOML")?;
    if let Some(mode) = &config.rewrite.mode {
        parse_mode(mode)?;
    }
    Ok(config)
}

/// Load config from the source root, or return default if not found.
pub fn load_or_default(source_root: &Utf8Path) -> anyhow::Result<IncludefixConfig> {
    match discover_config(source_root) {
        Some(path) => load_config(&path),
        None => Ok(IncludefixConfig::default()),
    }
}

pub fn parse_mode(mode: &str) -> anyhow::Result<includefix_edit::PersistMode> {
    match mode {
        "strict" => Ok(includefix_edit::PersistMode::Strict),
        "best-effort" => Ok(includefix_edit::PersistMode::BestEffort),
        other => anyhow::bail!("invalid mode '{}': expected 'strict' or 'best-effort'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use includefix_edit::PersistMode;
    use tempfile::TempDir;

    #[test]
    fn parse_example_config() {
        let contents = r#"
[discovery]
include_roots = ["include", "src", "src/Entity"]
header_suffixes = ["h", "hpp"]
expected = ["Graphics.h", "UFO.h"]

[rewrite]
mode = "strict"
source_suffixes = ["cpp", "h"]
skip_dirs = ["build", "third_party"]
root_prefixes = ["src", "include"]
jobs = 4

[backups]
enabled = true
"#;

        let config = parse_config(contents).expect("parse config");
        assert_eq!(config.discovery.include_roots.len(), 3);
        assert_eq!(config.discovery.expected.len(), 2);
        assert_eq!(config.rewrite.mode.as_deref(), Some("strict"));
        assert_eq!(config.rewrite.jobs, Some(4));
        assert!(config.backups.enabled);
    }

    #[test]
    fn parse_minimal_config() {
        let config = parse_config("[discovery]\ninclude_roots = [\"include\"]\n")
            .expect("parse config");
        assert_eq!(config.discovery.include_roots.len(), 1);
        assert!(config.rewrite.mode.is_none());
        assert!(!config.backups.enabled);
    }

    #[test]
    fn parse_empty_config() {
        let config = parse_config("").expect("parse config");
        assert!(config.discovery.include_roots.is_empty());
        assert!(config.rewrite.source_suffixes.is_empty());
    }

    #[test]
    fn invalid_mode_is_rejected() {
        let err = parse_config("[rewrite]\nmode = \"yolo\"\n").expect_err("invalid mode");
        assert!(format!("{err:#}").contains("invalid mode"));
    }

    #[test]
    fn parse_mode_values() {
        assert_eq!(parse_mode("strict").expect("strict"), PersistMode::Strict);
        assert_eq!(
            parse_mode("best-effort").expect("best-effort"),
            PersistMode::BestEffort
        );
        assert!(parse_mode("other").is_err());
    }

    #[test]
    fn discover_config_some_and_none() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        assert!(discover_config(&root).is_none());

        std::fs::write(root.join(CONFIG_FILE_NAME), "").expect("write config");
        assert!(discover_config(&root).is_some());
    }

    #[test]
    fn load_or_default_returns_default_when_missing() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let config = load_or_default(&root).expect("load default");
        assert!(config.discovery.include_roots.is_empty());
        assert!(!config.backups.enabled);
    }
}
