//! Header discovery: builds the canonical name-to-location mapping.
//!
//! Candidate roots are scanned in priority order and every header file is
//! fingerprinted (sha256). The first sighting of a name wins; a later
//! sighting with identical content is a duplicate, a later sighting with
//! different content makes the name ambiguous. Ambiguous names are removed
//! from the usable mapping and surface in the report — they are never
//! silently resolved by scan order.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::glob;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Options for a discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Candidate roots, highest priority first.
    pub roots: Vec<Utf8PathBuf>,

    /// File suffixes treated as headers (without the dot).
    pub header_suffixes: Vec<String>,

    /// Restrict discovery to these base names. `None` takes every header.
    pub expected: Option<BTreeSet<String>>,
}

impl DiscoveryOptions {
    pub fn new(roots: Vec<Utf8PathBuf>) -> Self {
        Self {
            roots,
            header_suffixes: default_header_suffixes(),
            expected: None,
        }
    }
}

pub fn default_header_suffixes() -> Vec<String> {
    vec!["h".to_string(), "hpp".to_string(), "hh".to_string()]
}

/// One discovered header file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    /// Base name, e.g. `Graphics.h`.
    pub name: String,
    /// Absolute path of the file.
    pub path: Utf8PathBuf,
    /// Candidate root the file was found under.
    pub root: Utf8PathBuf,
    /// Hex sha256 of the file contents.
    pub sha256: String,
}

/// Outcome of looking a base name up in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Exactly one content was discovered for this name.
    Canonical(&'a HeaderEntry),
    /// Conflicting contents share this name; unusable until resolved.
    Ambiguous,
    /// The name was not discovered under any candidate root.
    Unknown,
}

/// Immutable name-to-canonical-location mapping built by [`HeaderRegistry::discover`].
#[derive(Debug, Clone, Default)]
pub struct HeaderRegistry {
    canonical: BTreeMap<String, HeaderEntry>,
    ambiguous: BTreeMap<String, Vec<HeaderEntry>>,
    duplicates: Vec<HeaderEntry>,
}

impl HeaderRegistry {
    /// Scan the candidate roots and build the mapping.
    ///
    /// Missing roots are skipped (trees under repair often lack some of the
    /// conventional locations). Within a root, paths are processed in
    /// lexicographic order so the first-sighting rule is deterministic.
    pub fn discover(opts: &DiscoveryOptions) -> anyhow::Result<Self> {
        let mut registry = HeaderRegistry::default();

        for root in &opts.roots {
            if !root.is_dir() {
                debug!(root = %root, "candidate root missing, skipping");
                continue;
            }
            let root = root
                .canonicalize_utf8()
                .with_context(|| format!("canonicalize candidate root {}", root))?;

            let mut found = Vec::new();
            for suffix in &opts.header_suffixes {
                let pattern = root.join(format!("**/*.{suffix}"));
                for entry in
                    glob(pattern.as_str()).with_context(|| format!("glob {}", pattern))?
                {
                    let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
                    let path = Utf8PathBuf::from_path_buf(path)
                        .map_err(|p| anyhow::anyhow!("non-UTF-8 path: {}", p.display()))?;
                    if path.is_file() {
                        found.push(path);
                    }
                }
            }
            // Deterministic order matters.
            found.sort();

            for path in found {
                registry.sight(&root, &path, opts)?;
            }
        }

        debug!(
            canonical = registry.canonical.len(),
            ambiguous = registry.ambiguous.len(),
            duplicates = registry.duplicates.len(),
            "discovery complete"
        );
        Ok(registry)
    }

    /// Build a registry from pre-discovered entries, applying the same
    /// first-sighting and collision rules as a filesystem scan. Intended for
    /// embedding and tests.
    pub fn from_entries(entries: impl IntoIterator<Item = HeaderEntry>) -> Self {
        let mut registry = HeaderRegistry::default();
        for entry in entries {
            registry.insert_entry(entry);
        }
        registry
    }

    fn sight(
        &mut self,
        root: &Utf8Path,
        path: &Utf8Path,
        opts: &DiscoveryOptions,
    ) -> anyhow::Result<()> {
        let Some(name) = path.file_name() else {
            return Ok(());
        };
        if let Some(expected) = &opts.expected
            && !expected.contains(name)
        {
            return Ok(());
        }

        let bytes = fs::read(path).with_context(|| format!("read {}", path))?;
        self.insert_entry(HeaderEntry {
            name: name.to_string(),
            path: path.to_path_buf(),
            root: root.to_path_buf(),
            sha256: sha256_hex(&bytes),
        });
        Ok(())
    }

    fn insert_entry(&mut self, entry: HeaderEntry) {
        let name = entry.name.clone();

        if let Some(sightings) = self.ambiguous.get_mut(&name) {
            if sightings.iter().all(|s| s.path != entry.path) {
                sightings.push(entry);
            }
            return;
        }

        match self.canonical.remove(&name) {
            None => {
                self.canonical.insert(name, entry);
            }
            // The same file reached through overlapping roots is not a sighting.
            Some(existing) if existing.path == entry.path => {
                self.canonical.insert(name, existing);
            }
            Some(existing) if existing.sha256 == entry.sha256 => {
                debug!(name = %name, path = %entry.path, "duplicate header, keeping first sighting");
                self.canonical.insert(name, existing);
                self.duplicates.push(entry);
            }
            Some(existing) => {
                warn!(name = %name, "conflicting contents share a header name");
                self.ambiguous.insert(name, vec![existing, entry]);
            }
        }
    }

    pub fn resolve(&self, name: &str) -> Resolution<'_> {
        if let Some(entry) = self.canonical.get(name) {
            return Resolution::Canonical(entry);
        }
        if self.ambiguous.contains_key(name) {
            return Resolution::Ambiguous;
        }
        Resolution::Unknown
    }

    /// Canonical entries, ordered by name.
    pub fn canonical(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.canonical.values()
    }

    /// Names with conflicting contents, with every sighted candidate.
    pub fn ambiguous(&self) -> &BTreeMap<String, Vec<HeaderEntry>> {
        &self.ambiguous
    }

    /// Later sightings that matched an already-canonical fingerprint.
    pub fn duplicates(&self) -> &[HeaderEntry] {
        &self.duplicates
    }

    /// True when discovery produced neither canonical nor ambiguous names.
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty() && self.ambiguous.is_empty()
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
